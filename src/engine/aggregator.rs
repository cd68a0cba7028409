//! # engine::aggregator
//!
//! **Exposure Aggregator** — positions in, long/short summary out.
//!
//! ```text
//! positions
//!     │
//!     ├─ [1] drop excluded symbols and positions without notional
//!     │      fold each position into its symbol's net notional and PnL
//!     │
//!     ├─ [2] raw totals        Σ positive nets  /  Σ |negative nets|
//!     │
//!     ├─ [3] effective totals  same split, BTC* symbols at half weight
//!     │
//!     ├─ [4] ratio             eff_long / eff_short, ∞ or 0 when eff_short = 0
//!     │
//!     └─ [5] overall PnL       Σ per-symbol PnL
//! ```
//!
//! A symbol lands in the long or short bucket by the sign of its *net*
//! notional, never by the side of any single position.
//!
//! Pure: no I/O, no clock, and the per-symbol maps are ordered, so identical
//! input always yields an identical [`ExposureSummary`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::models::{NotionalBasis, Position};

/// Precious-metal and BTC-dominance index contracts under every symbol
/// spelling the adapters emit.
pub const DEFAULT_EXCLUDED: [&str; 6] = [
    "PAXGUSDT",
    "BTCDOMUSDT",
    "PAXG/USDT",
    "BTCDOM/USDT",
    "PAXG/USDT:USDT",
    "BTCDOM/USDT:USDT",
];

// ─── Rules ────────────────────────────────────────────────────────────────────

/// Fixed parameters of the aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureRules {
    /// Symbols ignored entirely
    pub excluded:           BTreeSet<String>,
    /// Symbols starting with this prefix count at `reduced_weight`
    pub half_weight_prefix: String,
    pub reduced_weight:     f64,
    /// How the source exchange's notional relates to PnL
    pub basis:              NotionalBasis,
}

impl ExposureRules {
    pub fn new(basis: NotionalBasis) -> Self {
        Self {
            excluded:           DEFAULT_EXCLUDED.iter().map(|s| s.to_string()).collect(),
            half_weight_prefix: "BTC".to_string(),
            reduced_weight:     0.5,
            basis,
        }
    }

    pub fn is_excluded(&self, symbol: &str) -> bool {
        self.excluded.contains(symbol)
    }

    /// Weight applied to a symbol's net notional in the effective totals.
    pub fn weight(&self, symbol: &str) -> f64 {
        if symbol.starts_with(&self.half_weight_prefix) {
            self.reduced_weight
        } else {
            1.0
        }
    }
}

impl Default for ExposureRules {
    fn default() -> Self {
        Self::new(NotionalBasis::IncludesPnl)
    }
}

// ─── Result ───────────────────────────────────────────────────────────────────

/// Effective long / effective short.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LongShortRatio {
    Finite(f64),
    /// Long exposure with no short exposure at all
    Infinite,
}

impl LongShortRatio {
    pub fn from_totals(effective_long: f64, effective_short: f64) -> Self {
        if effective_short > 0.0 {
            LongShortRatio::Finite(effective_long / effective_short)
        } else if effective_long > 0.0 {
            LongShortRatio::Infinite
        } else {
            LongShortRatio::Finite(0.0)
        }
    }
}

/// One row of the per-symbol breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolExposure {
    pub symbol:       String,
    pub net_notional: f64,
    pub pnl:          f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExposureSummary {
    pub raw_long_total:        f64,
    pub raw_short_total:       f64,
    pub effective_long_total:  f64,
    pub effective_short_total: f64,
    pub ratio:                 LongShortRatio,
    /// Signed net notional per symbol, keyed by the adapter's symbol
    pub symbol_notional:       BTreeMap<String, f64>,
    pub symbol_pnl:            BTreeMap<String, f64>,
    pub overall_pnl:           f64,
}

impl ExposureSummary {
    fn breakdown(&self) -> impl Iterator<Item = SymbolExposure> + '_ {
        self.symbol_notional.iter().map(|(symbol, &net)| SymbolExposure {
            symbol:       symbol.clone(),
            net_notional: net,
            pnl:          self.symbol_pnl.get(symbol).copied().unwrap_or(0.0),
        })
    }

    /// Symbols with positive net notional, largest first.
    pub fn long_legs(&self) -> Vec<SymbolExposure> {
        let mut legs: Vec<_> = self.breakdown().filter(|e| e.net_notional > 0.0).collect();
        legs.sort_by(|a, b| b.net_notional.total_cmp(&a.net_notional));
        legs
    }

    /// Every other symbol (a fully netted-out symbol shows here), largest
    /// magnitude first.
    pub fn short_legs(&self) -> Vec<SymbolExposure> {
        let mut legs: Vec<_> = self.breakdown().filter(|e| e.net_notional <= 0.0).collect();
        legs.sort_by(|a, b| b.net_notional.abs().total_cmp(&a.net_notional.abs()));
        legs
    }
}

// ─── Main Aggregation ─────────────────────────────────────────────────────────

pub fn aggregate(positions: &[Position], rules: &ExposureRules) -> ExposureSummary {
    // ── [1] Net per symbol ────────────────────────────────────────────────────
    let mut symbol_notional: BTreeMap<String, f64> = BTreeMap::new();
    let mut symbol_pnl: BTreeMap<String, f64> = BTreeMap::new();

    for pos in positions {
        if rules.is_excluded(&pos.symbol) {
            debug!(symbol = %pos.symbol, "Excluded symbol skipped");
            continue;
        }
        let Some(signed) = pos.signed_notional(rules.basis) else {
            debug!(symbol = %pos.symbol, "Position without notional skipped");
            continue;
        };

        *symbol_notional.entry(pos.symbol.clone()).or_insert(0.0) += signed;
        *symbol_pnl.entry(pos.symbol.clone()).or_insert(0.0) += pos.unrealized_pnl;
    }

    // ── [2] + [3] Raw and weighted totals ─────────────────────────────────────
    let mut raw_long_total = 0.0;
    let mut raw_short_total = 0.0;
    let mut effective_long_total = 0.0;
    let mut effective_short_total = 0.0;

    for (symbol, &net) in &symbol_notional {
        let weight = rules.weight(symbol);
        if net > 0.0 {
            raw_long_total += net;
            effective_long_total += net * weight;
        } else if net < 0.0 {
            raw_short_total += net.abs();
            effective_short_total += net.abs() * weight;
        }
    }

    // ── [4] Ratio ─────────────────────────────────────────────────────────────
    let ratio = LongShortRatio::from_totals(effective_long_total, effective_short_total);

    // ── [5] Overall PnL ───────────────────────────────────────────────────────
    let overall_pnl = symbol_pnl.values().sum();

    ExposureSummary {
        raw_long_total,
        raw_short_total,
        effective_long_total,
        effective_short_total,
        ratio,
        symbol_notional,
        symbol_pnl,
        overall_pnl,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
