//! REST clients for the payment gateways the LiveTix migration imports from.
//!
//! Each client implements [`ticket_invoice_engine::PaymentGateway`], translating the provider's wire format into
//! the engine's record shape and its pagination scheme into the engine's opaque cursor. The engine never sees a
//! provider SDK type.

pub mod config;
pub mod data_objects;

mod square;
mod stripe;

pub use config::{SquareConfig, StripeConfig};
pub use square::SquareApi;
pub use stripe::StripeApi;
