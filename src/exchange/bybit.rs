//! # exchange::bybit — v5 unified account, linear perpetuals
//!
//! Auth headers: `X-BAPI-API-KEY`, `X-BAPI-TIMESTAMP`, `X-BAPI-RECV-WINDOW`
//! and `X-BAPI-SIGN` = hex HMAC-SHA256 of `timestamp + key + recvWindow + query`.
//!
//! Bybit's `positionValue` is valued at entry, so it excludes unrealized PnL;
//! this adapter reports [`NotionalBasis::ExcludesPnl`] and the aggregator folds
//! the PnL back in.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{num_or_zero, parse_num, send_json, signing, ExchangeAdapter};
use crate::config::ExchangeSettings;
use crate::error::ExchangeError;
use crate::models::{BalanceSummary, ExchangeId, NotionalBasis, Position, Side};

const RECV_WINDOW: &str = "5000";
const PAGE_LIMIT: u32 = 200;
/// Upper bound on cursor pages per fetch
const MAX_PAGES: usize = 10;

// ─── Wire Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg:  String,
    #[serde(default)]
    pub result:   Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionPage {
    #[serde(default)]
    pub list:             Vec<PositionInfo>,
    #[serde(default)]
    pub next_page_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionInfo {
    pub symbol:         String,
    /// `Buy`, `Sell`, or empty for a flat one-way slot
    #[serde(default)]
    pub side:           String,
    #[serde(default)]
    pub size:           Option<String>,
    #[serde(default)]
    pub position_value: Option<String>,
    #[serde(default)]
    pub unrealised_pnl: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WalletPage {
    #[serde(default)]
    pub list: Vec<WalletAccount>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    #[serde(default)]
    pub total_equity:         Option<String>,
    #[serde(default)]
    pub total_wallet_balance: Option<String>,
    #[serde(default, rename = "totalPerpUPL")]
    pub total_perp_upl:       Option<String>,
}

// ─── Mapping ──────────────────────────────────────────────────────────────────

pub fn map_position(raw: PositionInfo) -> Option<Position> {
    let side = match raw.side.as_str() {
        "Buy"  => Side::Long,
        "Sell" => Side::Short,
        _ => return None,
    };

    let size = parse_num(raw.size.as_deref()).unwrap_or(0.0);
    if size == 0.0 {
        return None;
    }

    Some(Position {
        symbol:         raw.symbol,
        side,
        notional:       parse_num(raw.position_value.as_deref()),
        unrealized_pnl: num_or_zero(raw.unrealised_pnl.as_deref()),
    })
}

/// First unified account: margin = `totalEquity`, pnl = `totalPerpUPL`.
pub fn extract_balance(raw: &WalletPage) -> BalanceSummary {
    match raw.list.first() {
        Some(account) => BalanceSummary {
            wallet_balance: num_or_zero(account.total_wallet_balance.as_deref()),
            margin_balance: num_or_zero(account.total_equity.as_deref()),
            unrealized_pnl: num_or_zero(account.total_perp_upl.as_deref()),
        },
        None => BalanceSummary::zero(),
    }
}

// ─── Adapter ──────────────────────────────────────────────────────────────────

pub struct BybitAdapter {
    client:     reqwest::Client,
    base_url:   String,
    api_key:    String,
    api_secret: SecretString,
}

impl BybitAdapter {
    pub fn new(client: reqwest::Client, settings: &ExchangeSettings) -> Result<Self, ExchangeError> {
        let creds = settings
            .credentials
            .as_ref()
            .ok_or(ExchangeError::MissingCredentials(ExchangeId::Bybit))?;

        Ok(Self {
            client,
            base_url:   settings.base_url.trim_end_matches('/').to_string(),
            api_key:    creds.api_key.clone(),
            api_secret: creds.api_secret.clone(),
        })
    }

    async fn signed_get<T: DeserializeOwned + Default>(&self, path: &str, query: &str) -> Result<T, ExchangeError> {
        let timestamp = signing::timestamp_ms();
        let payload = format!("{timestamp}{}{RECV_WINDOW}{query}", self.api_key);
        let signature = signing::sign_hex(self.api_secret.expose_secret(), &payload)?;
        let url = format!("{}{path}?{query}", self.base_url);

        debug!(path, query, "Bybit signed GET");

        let envelope: Envelope<T> = send_json(
            ExchangeId::Bybit,
            self.client
                .get(&url)
                .header("X-BAPI-API-KEY", &self.api_key)
                .header("X-BAPI-TIMESTAMP", &timestamp)
                .header("X-BAPI-RECV-WINDOW", RECV_WINDOW)
                .header("X-BAPI-SIGN", signature),
        )
        .await?;

        if envelope.ret_code != 0 {
            return Err(ExchangeError::Api {
                exchange: ExchangeId::Bybit,
                code:     envelope.ret_code.to_string(),
                message:  envelope.ret_msg,
            });
        }

        Ok(envelope.result.unwrap_or_default())
    }
}

#[async_trait]
impl ExchangeAdapter for BybitAdapter {
    fn id(&self) -> ExchangeId {
        ExchangeId::Bybit
    }

    fn notional_basis(&self) -> NotionalBasis {
        NotionalBasis::ExcludesPnl
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        let mut positions = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut query = format!("category=linear&limit={PAGE_LIMIT}&settleCoin=USDT");
            if let Some(c) = &cursor {
                query.push_str(&format!("&cursor={c}"));
            }

            let page: PositionPage = self.signed_get("/v5/position/list", &query).await?;
            positions.extend(page.list.into_iter().filter_map(map_position));

            match page.next_page_cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(positions)
    }

    async fn fetch_balance(&self) -> Result<BalanceSummary, ExchangeError> {
        let page: WalletPage = self
            .signed_get("/v5/account/wallet-balance", "accountType=UNIFIED")
            .await?;
        Ok(extract_balance(&page))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::ApiCredentials;

    fn adapter(base_url: String) -> BybitAdapter {
        let settings = ExchangeSettings {
            credentials: Some(ApiCredentials {
                api_key:    "bb-key".into(),
                api_secret: SecretString::from("bb-secret".to_string()),
                passphrase: None,
            }),
            base_url,
        };
        BybitAdapter::new(reqwest::Client::new(), &settings).unwrap()
    }

    fn info(v: serde_json::Value) -> PositionInfo {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_map_sides() {
        let long = map_position(info(json!({
            "symbol": "SOLUSDT", "side": "Buy", "size": "10", "positionValue": "1500", "unrealisedPnl": "20"
        })))
        .unwrap();
        assert_eq!(long.side, Side::Long);
        assert_eq!(long.notional, Some(1500.0));

        let short = map_position(info(json!({
            "symbol": "SOLUSDT", "side": "Sell", "size": "4", "positionValue": "600", "unrealisedPnl": "-5"
        })))
        .unwrap();
        assert_eq!(short.side, Side::Short);
        assert_eq!(short.unrealized_pnl, -5.0);
    }

    #[test]
    fn test_flat_or_sideless_dropped() {
        assert!(map_position(info(json!({ "symbol": "ADAUSDT", "side": "", "size": "0" }))).is_none());
        assert!(map_position(info(json!({ "symbol": "ADAUSDT", "side": "Buy", "size": "0" }))).is_none());
    }

    #[test]
    fn test_extract_balance_uses_first_account() {
        let page: WalletPage = serde_json::from_value(json!({
            "list": [{ "totalEquity": "5100.25", "totalWalletBalance": "5000", "totalPerpUPL": "100.25" }]
        }))
        .unwrap();
        assert_eq!(
            extract_balance(&page),
            BalanceSummary { wallet_balance: 5000.0, margin_balance: 5100.25, unrealized_pnl: 100.25 }
        );
        assert_eq!(extract_balance(&WalletPage::default()), BalanceSummary::zero());
    }

    #[tokio::test]
    async fn test_fetch_positions_follows_cursor() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v5/position/list"))
            .and(query_param("cursor", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "retCode": 0, "retMsg": "OK",
                "result": { "list": [
                    { "symbol": "ETHUSDT", "side": "Sell", "size": "1", "positionValue": "3000", "unrealisedPnl": "10" }
                ], "nextPageCursor": "" }
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v5/position/list"))
            .and(query_param("category", "linear"))
            .and(header("X-BAPI-API-KEY", "bb-key"))
            .and(header_exists("X-BAPI-SIGN"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "retCode": 0, "retMsg": "OK",
                "result": { "list": [
                    { "symbol": "BTCUSDT", "side": "Buy", "size": "0.05", "positionValue": "3250", "unrealisedPnl": "12" }
                ], "nextPageCursor": "page2" }
            })))
            .mount(&server)
            .await;

        let positions = adapter(server.uri()).fetch_positions().await.unwrap();
        let symbols: Vec<&str> = positions.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[tokio::test]
    async fn test_nonzero_ret_code_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v5/account/wallet-balance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "retCode": 10003, "retMsg": "API key is invalid.", "result": {}
            })))
            .mount(&server)
            .await;

        let err = adapter(server.uri()).fetch_balance().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Api { ref code, .. } if code == "10003"));
    }
}
