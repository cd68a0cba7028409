//! # models::exchange
//!
//! [`ExchangeId`] names the venues the reporter knows how to read, and accepts
//! the two-letter aliases used on the command line and in `REPORT_EXCHANGES`.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExchangeId {
    Binance,
    Bybit,
    Bitget,
}

impl ExchangeId {
    /// Order of a full multi-exchange pass.
    pub const ALL: [ExchangeId; 3] = [ExchangeId::Binance, ExchangeId::Bybit, ExchangeId::Bitget];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Binance => "binance",
            ExchangeId::Bybit   => "bybit",
            ExchangeId::Bitget  => "bitget",
        }
    }

    /// Upper-case name used as the heading of every report.
    pub fn heading(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported exchange: '{0}'. Use binance|bybit|bitget (or bn|bb|bg)")]
pub struct UnknownExchange(pub String);

impl FromStr for ExchangeId {
    type Err = UnknownExchange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binance" | "bn" => Ok(ExchangeId::Binance),
            "bybit"   | "bb" => Ok(ExchangeId::Bybit),
            "bitget"  | "bg" => Ok(ExchangeId::Bitget),
            _ => Err(UnknownExchange(s.to_string())),
        }
    }
}
