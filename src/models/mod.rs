//! Domain models shared across the reporter.

pub mod balance;
pub mod exchange;
pub mod position;

pub use balance::BalanceSummary;
pub use exchange::ExchangeId;
pub use position::{NotionalBasis, Position, Side};
