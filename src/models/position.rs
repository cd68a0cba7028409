//! # models::position
//!
//! Defines [`Position`], one open perpetual-futures position as reported by an
//! exchange adapter, already mapped to the common shape the aggregator reads.
//!
//! Positions are ephemeral: fetched fresh on every cycle and never stored.

// ─── Side ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

// ─── NotionalBasis ────────────────────────────────────────────────────────────

/// How an exchange's native notional relates to unrealized PnL.
///
/// Most venues report notional at mark price, which already carries the PnL.
/// Bybit's `positionValue` is entry-based, so the PnL has to be folded back in
/// before positions from different venues are comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotionalBasis {
    IncludesPnl,
    ExcludesPnl,
}

// ─── Position ─────────────────────────────────────────────────────────────────

/// Only non-zero-size entries reach this type; adapters drop flat slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    /// Instrument identifier exactly as the adapter emits it, e.g. `"BTCUSDT"`.
    pub symbol:         String,
    pub side:           Side,
    /// Dollar notional; `None` when the exchange did not report one.
    pub notional:       Option<f64>,
    pub unrealized_pnl: f64,
}

impl Position {
    /// Signed contribution of this position to its symbol's net notional.
    ///
    /// Long is positive and short is negative. Under
    /// [`NotionalBasis::ExcludesPnl`] the PnL is folded in:
    /// long → `|n| + pnl`, short → `-(|n| - pnl)`.
    pub fn signed_notional(&self, basis: NotionalBasis) -> Option<f64> {
        let abs = self.notional?.abs();
        let pnl = self.unrealized_pnl;

        Some(match (basis, self.side) {
            (NotionalBasis::IncludesPnl, Side::Long)  => abs,
            (NotionalBasis::IncludesPnl, Side::Short) => -abs,
            (NotionalBasis::ExcludesPnl, Side::Long)  => abs + pnl,
            (NotionalBasis::ExcludesPnl, Side::Short) => -(abs - pnl),
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
