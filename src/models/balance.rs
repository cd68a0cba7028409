//! # models::balance
//!
//! [`BalanceSummary`] is the account-level snapshot printed at the top of every
//! report. Each exchange adapter extracts it from its own native payload.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BalanceSummary {
    pub wallet_balance: f64,
    /// Margin balance (Binance), total equity (Bybit) or account equity (Bitget).
    pub margin_balance: f64,
    pub unrealized_pnl: f64,
}

impl BalanceSummary {
    /// The value reported whenever a balance cannot be fetched or parsed.
    pub const fn zero() -> Self {
        Self {
            wallet_balance: 0.0,
            margin_balance: 0.0,
            unrealized_pnl: 0.0,
        }
    }
}
