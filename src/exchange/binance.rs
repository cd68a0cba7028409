//! # exchange::binance — USDⓈ-M futures
//!
//! Signed `GET` requests: `timestamp` + `recvWindow` in the query, then
//! `signature` = hex HMAC-SHA256 of that query. Key goes in `X-MBX-APIKEY`.
//!
//! | Data      | Endpoint                 | Fields                                              |
//! |-----------|--------------------------|-----------------------------------------------------|
//! | positions | `GET /fapi/v2/positionRisk` | `positionAmt`, `positionSide`, `notional`, `unRealizedProfit` |
//! | balance   | `GET /fapi/v2/account`   | `totalWalletBalance`, `totalMarginBalance`, `totalUnrealizedProfit` |

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use super::{num_or_zero, parse_num, send_json, signing, ExchangeAdapter};
use crate::config::ExchangeSettings;
use crate::error::ExchangeError;
use crate::models::{BalanceSummary, ExchangeId, Position, Side};

const RECV_WINDOW: u64 = 5000;

// ─── Wire Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRisk {
    pub symbol:             String,
    #[serde(default)]
    pub position_amt:       Option<String>,
    /// `BOTH` in one-way mode, `LONG`/`SHORT` in hedge mode
    #[serde(default)]
    pub position_side:      Option<String>,
    #[serde(default)]
    pub notional:           Option<String>,
    #[serde(default, rename = "unRealizedProfit")]
    pub unrealized_profit:  Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    #[serde(default)]
    pub total_wallet_balance:    Option<String>,
    #[serde(default)]
    pub total_unrealized_profit: Option<String>,
    #[serde(default)]
    pub total_margin_balance:    Option<String>,
}

// ─── Mapping ──────────────────────────────────────────────────────────────────

/// Map one `positionRisk` row. Flat rows (zero amount) yield `None`.
pub fn map_position(raw: PositionRisk) -> Option<Position> {
    let amount = parse_num(raw.position_amt.as_deref()).unwrap_or(0.0);
    if amount == 0.0 {
        return None;
    }

    let side = match raw.position_side.as_deref() {
        Some("LONG")  => Side::Long,
        Some("SHORT") => Side::Short,
        _ if amount > 0.0 => Side::Long,
        _ => Side::Short,
    };

    Some(Position {
        symbol:         raw.symbol,
        side,
        notional:       parse_num(raw.notional.as_deref()),
        unrealized_pnl: num_or_zero(raw.unrealized_profit.as_deref()),
    })
}

pub fn extract_balance(raw: &AccountInfo) -> BalanceSummary {
    BalanceSummary {
        wallet_balance: num_or_zero(raw.total_wallet_balance.as_deref()),
        margin_balance: num_or_zero(raw.total_margin_balance.as_deref()),
        unrealized_pnl: num_or_zero(raw.total_unrealized_profit.as_deref()),
    }
}

// ─── Adapter ──────────────────────────────────────────────────────────────────

pub struct BinanceAdapter {
    client:     reqwest::Client,
    base_url:   String,
    api_key:    String,
    api_secret: SecretString,
}

impl BinanceAdapter {
    pub fn new(client: reqwest::Client, settings: &ExchangeSettings) -> Result<Self, ExchangeError> {
        let creds = settings
            .credentials
            .as_ref()
            .ok_or(ExchangeError::MissingCredentials(ExchangeId::Binance))?;

        Ok(Self {
            client,
            base_url:   settings.base_url.trim_end_matches('/').to_string(),
            api_key:    creds.api_key.clone(),
            api_secret: creds.api_secret.clone(),
        })
    }

    async fn signed_get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ExchangeError> {
        let query = format!("recvWindow={RECV_WINDOW}&timestamp={}", signing::timestamp_ms());
        let signature = signing::sign_hex(self.api_secret.expose_secret(), &query)?;
        let url = format!("{}{path}?{query}&signature={signature}", self.base_url);

        debug!(path, "Binance signed GET");

        send_json(
            ExchangeId::Binance,
            self.client.get(&url).header("X-MBX-APIKEY", &self.api_key),
        )
        .await
    }
}

#[async_trait]
impl ExchangeAdapter for BinanceAdapter {
    fn id(&self) -> ExchangeId {
        ExchangeId::Binance
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        let rows: Vec<PositionRisk> = self.signed_get("/fapi/v2/positionRisk").await?;
        Ok(rows.into_iter().filter_map(map_position).collect())
    }

    async fn fetch_balance(&self) -> Result<BalanceSummary, ExchangeError> {
        let account: AccountInfo = self.signed_get("/fapi/v2/account").await?;
        Ok(extract_balance(&account))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
