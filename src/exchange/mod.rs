//! # exchange — position and balance snapshots from derivatives venues
//!
//! Every venue sits behind [`ExchangeAdapter`]. The adapter maps the native
//! REST payloads to [`Position`] and [`BalanceSummary`]; nothing outside this
//! module knows an exchange's field names.
//!
//! ## Failure policy
//! A reporting tool must always produce output. [`positions_or_empty`] and
//! [`balance_or_zero`] log any [`ExchangeError`] and degrade to an empty list
//! or a zero balance so the cycle carries on.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::config::Config;
use crate::error::ExchangeError;
use crate::models::{BalanceSummary, ExchangeId, NotionalBasis, Position};

pub mod binance;
pub mod bitget;
pub mod bybit;
pub mod signing;

pub use binance::BinanceAdapter;
pub use bitget::BitgetAdapter;
pub use bybit::BybitAdapter;

// ─── Adapter Contract ─────────────────────────────────────────────────────────

#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    fn id(&self) -> ExchangeId;

    /// Whether this venue's notional already carries unrealized PnL.
    fn notional_basis(&self) -> NotionalBasis {
        NotionalBasis::IncludesPnl
    }

    /// Open positions with non-zero contract size.
    async fn fetch_positions(&self) -> Result<Vec<Position>, ExchangeError>;

    async fn fetch_balance(&self) -> Result<BalanceSummary, ExchangeError>;
}

/// Select the adapter for `id`, once, at the start of its cycle.
pub fn build_adapter(
    id: ExchangeId,
    config: &Config,
    client: &reqwest::Client,
) -> Result<Box<dyn ExchangeAdapter>, ExchangeError> {
    let settings = config.exchange(id);
    Ok(match id {
        ExchangeId::Binance => Box::new(BinanceAdapter::new(client.clone(), settings)?),
        ExchangeId::Bybit   => Box::new(BybitAdapter::new(client.clone(), settings)?),
        ExchangeId::Bitget  => Box::new(BitgetAdapter::new(client.clone(), settings)?),
    })
}

// ─── Fail-to-empty Boundary ───────────────────────────────────────────────────

pub async fn positions_or_empty(adapter: &dyn ExchangeAdapter) -> Vec<Position> {
    match adapter.fetch_positions().await {
        Ok(positions) => positions,
        Err(e) => {
            warn!(exchange = %adapter.id(), error = %e, "Error fetching positions — treating as none");
            Vec::new()
        }
    }
}

pub async fn balance_or_zero(adapter: &dyn ExchangeAdapter) -> BalanceSummary {
    match adapter.fetch_balance().await {
        Ok(balance) => balance,
        Err(e) => {
            warn!(exchange = %adapter.id(), error = %e, "Error fetching account balance — reporting zero");
            BalanceSummary::zero()
        }
    }
}

// ─── Shared HTTP Helpers ──────────────────────────────────────────────────────

/// Send a prepared request and decode the JSON body into `T`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    exchange: ExchangeId,
    request: reqwest::RequestBuilder,
) -> Result<T, ExchangeError> {
    let resp = request
        .send()
        .await
        .map_err(|source| ExchangeError::Transport { exchange, source })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ExchangeError::Http { exchange, status, body });
    }

    let text = resp
        .text()
        .await
        .map_err(|source| ExchangeError::Transport { exchange, source })?;

    serde_json::from_str(&text).map_err(|e| ExchangeError::Malformed {
        exchange,
        detail: e.to_string(),
    })
}

/// Venues send decimals as strings; blank or absent means "not reported".
pub(crate) fn parse_num(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse().ok()
}

/// Same as [`parse_num`] with the "read as zero" fallback balance fields use.
pub(crate) fn num_or_zero(raw: Option<&str>) -> f64 {
    parse_num(raw).unwrap_or(0.0)
}
