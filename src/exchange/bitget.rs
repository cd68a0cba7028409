//! # exchange::bitget — v2 mix API, USDT-margined futures
//!
//! Auth headers: `ACCESS-KEY`, `ACCESS-TIMESTAMP` (ms), `ACCESS-PASSPHRASE`
//! and `ACCESS-SIGN` = base64 HMAC-SHA256 of
//! `timestamp + "GET" + path + "?" + query`.
//!
//! Bitget has no notional field on a position; it is derived as
//! `total × markPrice`, which is mark-valued and so already carries the PnL.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{num_or_zero, parse_num, send_json, signing, ExchangeAdapter};
use crate::config::ExchangeSettings;
use crate::error::ExchangeError;
use crate::models::{BalanceSummary, ExchangeId, Position, Side};

const PRODUCT_TYPE: &str = "USDT-FUTURES";
const MARGIN_COIN: &str = "USDT";
const SUCCESS_CODE: &str = "00000";

// ─── Wire Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: String,
    #[serde(default)]
    pub msg:  String,
    #[serde(default)]
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRow {
    pub symbol:        String,
    /// `long` or `short`
    #[serde(default)]
    pub hold_side:     String,
    #[serde(default)]
    pub total:         Option<String>,
    #[serde(default)]
    pub mark_price:    Option<String>,
    #[serde(default, rename = "unrealizedPL")]
    pub unrealized_pl: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRow {
    #[serde(default)]
    pub margin_coin:    String,
    #[serde(default)]
    pub available:      Option<String>,
    #[serde(default)]
    pub locked:         Option<String>,
    #[serde(default)]
    pub account_equity: Option<String>,
    #[serde(default, rename = "unrealizedPL")]
    pub unrealized_pl:  Option<String>,
}

// ─── Mapping ──────────────────────────────────────────────────────────────────

pub fn map_position(raw: PositionRow) -> Option<Position> {
    let side = match raw.hold_side.as_str() {
        "long"  => Side::Long,
        "short" => Side::Short,
        _ => return None,
    };

    let total = parse_num(raw.total.as_deref()).unwrap_or(0.0).abs();
    if total == 0.0 {
        return None;
    }

    let notional = parse_num(raw.mark_price.as_deref()).map(|mark| total * mark);

    Some(Position {
        symbol:         raw.symbol,
        side,
        notional,
        unrealized_pnl: num_or_zero(raw.unrealized_pl.as_deref()),
    })
}

/// USDT entry: wallet = `available + locked`, margin = `accountEquity`
/// (falls back to wallet). No USDT entry yields zero.
pub fn extract_balance(rows: &[AccountRow]) -> BalanceSummary {
    let Some(usdt) = rows.iter().find(|r| r.margin_coin == MARGIN_COIN) else {
        return BalanceSummary::zero();
    };

    let wallet = num_or_zero(usdt.available.as_deref()) + num_or_zero(usdt.locked.as_deref());

    BalanceSummary {
        wallet_balance: wallet,
        margin_balance: parse_num(usdt.account_equity.as_deref()).unwrap_or(wallet),
        unrealized_pnl: num_or_zero(usdt.unrealized_pl.as_deref()),
    }
}

// ─── Adapter ──────────────────────────────────────────────────────────────────

pub struct BitgetAdapter {
    client:     reqwest::Client,
    base_url:   String,
    api_key:    String,
    api_secret: SecretString,
    passphrase: SecretString,
}

impl BitgetAdapter {
    pub fn new(client: reqwest::Client, settings: &ExchangeSettings) -> Result<Self, ExchangeError> {
        let creds = settings
            .credentials
            .as_ref()
            .ok_or(ExchangeError::MissingCredentials(ExchangeId::Bitget))?;
        let passphrase = creds
            .passphrase
            .clone()
            .ok_or(ExchangeError::MissingCredentials(ExchangeId::Bitget))?;

        Ok(Self {
            client,
            base_url:   settings.base_url.trim_end_matches('/').to_string(),
            api_key:    creds.api_key.clone(),
            api_secret: creds.api_secret.clone(),
            passphrase,
        })
    }

    async fn signed_get<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<Vec<T>, ExchangeError> {
        let timestamp = signing::timestamp_ms();
        let prehash = format!("{timestamp}GET{path}?{query}");
        let signature = signing::sign_base64(self.api_secret.expose_secret(), &prehash)?;
        let url = format!("{}{path}?{query}", self.base_url);

        debug!(path, query, "Bitget signed GET");

        let envelope: Envelope<Vec<T>> = send_json(
            ExchangeId::Bitget,
            self.client
                .get(&url)
                .header("ACCESS-KEY", &self.api_key)
                .header("ACCESS-SIGN", signature)
                .header("ACCESS-TIMESTAMP", &timestamp)
                .header("ACCESS-PASSPHRASE", self.passphrase.expose_secret())
                .header("locale", "en-US"),
        )
        .await?;

        if envelope.code != SUCCESS_CODE {
            return Err(ExchangeError::Api {
                exchange: ExchangeId::Bitget,
                code:     envelope.code,
                message:  envelope.msg,
            });
        }

        Ok(envelope.data.unwrap_or_default())
    }
}

#[async_trait]
impl ExchangeAdapter for BitgetAdapter {
    fn id(&self) -> ExchangeId {
        ExchangeId::Bitget
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        let query = format!("productType={PRODUCT_TYPE}&marginCoin={MARGIN_COIN}");
        let rows: Vec<PositionRow> = self.signed_get("/api/v2/mix/position/all-position", &query).await?;
        Ok(rows.into_iter().filter_map(map_position).collect())
    }

    async fn fetch_balance(&self) -> Result<BalanceSummary, ExchangeError> {
        let query = format!("productType={PRODUCT_TYPE}");
        let rows: Vec<AccountRow> = self.signed_get("/api/v2/mix/account/accounts", &query).await?;
        Ok(extract_balance(&rows))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
