//! # config — read Config from environment variables
//!
//! Loaded once in `main` and passed by reference to every adapter and the
//! notifier. Never mutated after load.

use std::time::Duration;

use anyhow::Context;
use secrecy::SecretString;

use crate::models::ExchangeId;
use crate::scheduler::Scheduler;

pub const BINANCE_DEFAULT_URL:  &str = "https://fapi.binance.com";
pub const BYBIT_DEFAULT_URL:    &str = "https://api.bybit.com";
pub const BITGET_DEFAULT_URL:   &str = "https://api.bitget.com";
pub const TELEGRAM_DEFAULT_URL: &str = "https://api.telegram.org";

/// API key triple for one exchange. Bitget is the only venue that needs the
/// passphrase.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_key:    String,
    pub api_secret: SecretString,
    pub passphrase: Option<SecretString>,
}

/// Settings for one exchange: credentials (if any were supplied) and REST base.
#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    pub credentials: Option<ApiCredentials>,
    pub base_url:    String,
}

#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub bot_token: SecretString,
    pub chat_id:   String,
    pub api_url:   String,
}

/// Everything the reporter needs
#[derive(Debug, Clone)]
pub struct Config {
    pub binance:         ExchangeSettings,
    pub bybit:           ExchangeSettings,
    pub bitget:          ExchangeSettings,
    /// `None` when no bot token / chat id is set; chat delivery is then skipped
    pub telegram:        Option<TelegramSettings>,
    pub http_timeout:    Duration,
    /// Pause after each exchange in a multi-exchange pass
    pub exchange_delay:  Duration,
    /// Daemon cadence (`REPORT_INTERVAL_MIN`), aligned to the wall-clock hour
    pub schedule:        Scheduler,
    /// Exchanges visited by a daemon pass, in order
    pub report_exchanges: Vec<ExchangeId>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let credentials = |key: &str, secret: &str, passphrase: Option<&str>| {
            let api_key = get(key)?;
            let api_secret = get(secret)?;
            Some(ApiCredentials {
                api_key,
                api_secret: SecretString::from(api_secret),
                passphrase: passphrase.and_then(|p| get(p)).map(SecretString::from),
            })
        };

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramSettings {
                bot_token: SecretString::from(token),
                chat_id,
                api_url:   get("TELEGRAM_API_URL").unwrap_or_else(|| TELEGRAM_DEFAULT_URL.to_string()),
            }),
            _ => None,
        };

        let timeout_secs: u64 = get("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .context("HTTP_TIMEOUT_SECS must be a number")?;

        let delay_secs: u64 = get("EXCHANGE_DELAY_SECS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .context("EXCHANGE_DELAY_SECS must be a number")?;

        let report_interval: u32 = get("REPORT_INTERVAL_MIN")
            .unwrap_or_else(|| "60".to_string())
            .parse()
            .context("REPORT_INTERVAL_MIN must be a number")?;
        let schedule = Scheduler::every_minutes(report_interval).context("Invalid REPORT_INTERVAL_MIN")?;

        let report_exchanges = match get("REPORT_EXCHANGES") {
            Some(list) => list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.parse::<ExchangeId>())
                .collect::<Result<Vec<_>, _>>()
                .context("REPORT_EXCHANGES contains an unknown exchange")?,
            None => ExchangeId::ALL.to_vec(),
        };

        Ok(Self {
            binance: ExchangeSettings {
                credentials: credentials("BINANCE_API_KEY", "BINANCE_API_SECRET", None),
                base_url:    get("BINANCE_BASE_URL").unwrap_or_else(|| BINANCE_DEFAULT_URL.to_string()),
            },
            bybit: ExchangeSettings {
                credentials: credentials("BYBIT_API_KEY", "BYBIT_API_SECRET", None),
                base_url:    get("BYBIT_BASE_URL").unwrap_or_else(|| BYBIT_DEFAULT_URL.to_string()),
            },
            bitget: ExchangeSettings {
                credentials: credentials("BITGET_API_KEY", "BITGET_API_SECRET", Some("BITGET_PASSPHRASE")),
                base_url:    get("BITGET_BASE_URL").unwrap_or_else(|| BITGET_DEFAULT_URL.to_string()),
            },
            telegram,
            http_timeout:   Duration::from_secs(timeout_secs),
            exchange_delay: Duration::from_secs(delay_secs),
            schedule,
            report_exchanges,
        })
    }

    pub fn exchange(&self, id: ExchangeId) -> &ExchangeSettings {
        match id {
            ExchangeId::Binance => &self.binance,
            ExchangeId::Bybit   => &self.bybit,
            ExchangeId::Bitget  => &self.bitget,
        }
    }
}
