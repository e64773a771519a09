use anyhow::Result;
use gateway_tools::{SquareApi, SquareConfig, StripeApi, StripeConfig};
use ticket_invoice_engine::{import_new_payments, ImportError, PaymentGateway, SqliteDatabase};

use crate::{ImportCommand, ImportParams};

pub async fn handle_import_command(cmd: ImportCommand) -> Result<()> {
    match cmd {
        ImportCommand::Square(params) => {
            let gateway = SquareApi::new(SquareConfig::new_from_env_or_default())?;
            run_import(gateway, params).await
        },
        ImportCommand::Stripe(params) => {
            let gateway = StripeApi::new(StripeConfig::new_from_env_or_default())?;
            run_import(gateway, params).await
        },
    }
}

async fn run_import<G: PaymentGateway>(gateway: G, params: ImportParams) -> Result<()> {
    let db = SqliteDatabase::new(5).await?;
    match import_new_payments(&db, &gateway, params.cursor.as_deref()).await {
        Ok(summary) => {
            println!(
                "{} import complete. {} new payments, {} skipped.",
                gateway.provider(),
                summary.imported,
                summary.skipped
            );
            Ok(())
        },
        Err(ImportError::Gateway { source, resume_cursor }) => {
            if let Some(cursor) = &resume_cursor {
                eprintln!("Pages fetched so far are committed. Resume with --cursor {cursor}");
            }
            Err(source.into())
        },
        Err(ImportError::Database(e)) => Err(e.into()),
    }
}
