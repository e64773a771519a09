use clap::{Args, Parser, Subcommand};
use ticket_invoice_engine::db_types::Provider;

mod formatting;
mod import;
mod invoicing;

#[derive(Parser, Debug)]
#[command(version, about = "Operator tooling for the LiveTix reconciliation and invoicing migration")]
pub struct Arguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the database migrations against LTX_DATABASE_URL
    Migrate,
    #[command(subcommand)]
    /// Import new payments from a payment gateway
    Import(ImportCommand),
    #[command(subcommand)]
    /// List and inspect imported payments
    Payments(PaymentsCommand),
    /// Show how a payment would match against the open registrations, without building an invoice
    #[command(name = "match")]
    Match {
        #[arg(required = true, index = 1)]
        payment_id: String,
    },
    /// Initialize a sequence counter. Defaults to the current month's invoice-number sequence.
    InitCounter {
        /// Counter name, e.g. invoice_number:2506
        #[arg(index = 1)]
        name: Option<String>,
        /// Starting value for a newly created counter
        #[arg(short, long)]
        start: Option<i64>,
    },
    /// Preview the draft invoice for a payment without persisting anything
    Preview {
        #[arg(required = true, index = 1)]
        payment_id: String,
    },
    /// Finalize the invoice for a payment. Requires the match to clear the auto-approval threshold.
    Finalize {
        #[arg(required = true, index = 1)]
        payment_id: String,
    },
    /// Decline a payment so that it drops out of the reconciliation queue
    Decline {
        #[arg(required = true, index = 1)]
        payment_id: String,
        #[arg(short, long, default_value = "declined by operator")]
        reason: String,
    },
    #[command(subcommand)]
    /// Inspect issued invoices
    Invoices(InvoicesCommand),
}

#[derive(Debug, Subcommand)]
pub enum ImportCommand {
    /// Import payments from the Square Payments API
    Square(ImportParams),
    /// Import payment intents from the Stripe API
    Stripe(ImportParams),
}

#[derive(Debug, Args)]
pub struct ImportParams {
    /// Resume from this pagination cursor instead of the start of the listing
    #[arg(short, long)]
    pub cursor: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum PaymentsCommand {
    /// List imported payments, optionally filtered
    List {
        /// Only show payments from this provider (square, stripe, manual)
        #[arg(short, long, value_parser = parse_provider)]
        provider: Option<Provider>,
        /// Filter on whether an invoice has been issued
        #[arg(short, long)]
        invoiced: Option<bool>,
        /// Filter on the declined flag
        #[arg(short, long)]
        declined: Option<bool>,
        /// Print the raw records as JSON instead of a table
        #[arg(short, long, default_value_t = false)]
        json: bool,
    },
    /// Show the payments still waiting to be invoiced
    Queue,
}

#[derive(Debug, Subcommand)]
pub enum InvoicesCommand {
    /// Fetch an invoice by its customer or supplier number, with its transaction rows
    Get {
        #[arg(required = true, index = 1)]
        number: String,
    },
}

fn parse_provider(s: &str) -> Result<Provider, String> {
    s.parse().map_err(|e| format!("{e}"))
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    let result = match cli.command {
        Command::Migrate => invoicing::run_migrations().await,
        Command::Import(cmd) => import::handle_import_command(cmd).await,
        Command::Payments(cmd) => invoicing::handle_payments_command(cmd).await,
        Command::Match { payment_id } => invoicing::match_payment(payment_id).await,
        Command::InitCounter { name, start } => invoicing::init_counter(name, start).await,
        Command::Preview { payment_id } => invoicing::preview_payment(payment_id).await,
        Command::Finalize { payment_id } => invoicing::finalize_payment(payment_id).await,
        Command::Decline { payment_id, reason } => invoicing::decline_payment(payment_id, reason).await,
        Command::Invoices(cmd) => invoicing::handle_invoices_command(cmd).await,
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
