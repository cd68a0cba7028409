//! # perp-ratio — Perpetual Futures Long/Short Exposure Reporter
//!
//! Pulls open USDT-margined perpetual positions from Binance, Bybit or
//! Bitget, nets them per symbol, and reports the weighted long/short ratio.
//!
//! ## Modes
//! ```text
//! one-shot (default):  perp-ratio -e bb            → stdout report
//!                      perp-ratio -e bb --notify   → stdout + Telegram
//! daemon:              perp-ratio --daemon         → every REPORT_INTERVAL_MIN,
//!                                                    all REPORT_EXCHANGES → Telegram
//! ```
//!
//! ## Environment Variables
//!
//! | Variable               | Default                  | Description                        |
//! |------------------------|--------------------------|------------------------------------|
//! | `BINANCE_API_KEY/SECRET` | —                      | Binance USDⓈ-M credentials         |
//! | `BYBIT_API_KEY/SECRET` | —                        | Bybit v5 unified credentials       |
//! | `BITGET_API_KEY/SECRET/PASSPHRASE` | —            | Bitget v2 mix credentials          |
//! | `TELEGRAM_BOT_TOKEN`   | —                        | Bot token (chat delivery optional) |
//! | `TELEGRAM_CHAT_ID`     | —                        | Target chat                        |
//! | `HTTP_TIMEOUT_SECS`    | `10`                     | Per-request timeout                |
//! | `EXCHANGE_DELAY_SECS`  | `5`                      | Pause between exchanges (daemon)   |
//! | `REPORT_INTERVAL_MIN`  | `60`                     | Daemon cadence, divides 60         |
//! | `REPORT_EXCHANGES`     | `binance,bybit,bitget`   | Exchanges visited by the daemon    |
//! | `RUST_LOG`             | `perp_ratio=info`        | Tracing filter                     |

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod engine;
mod error;
mod exchange;
mod models;
mod notifier;
mod report;
mod runner;
mod scheduler;

use config::Config;
use models::ExchangeId;
use notifier::{DisabledNotifier, Notifier, TelegramNotifier};

// ─── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "perp-ratio")]
#[command(about = "Calculate long/short ratio for perpetual positions", long_about = None)]
struct Cli {
    /// Exchange to fetch positions from. Aliases: bn=binance, bb=bybit, bg=bitget
    #[arg(short, long, default_value = "binance")]
    exchange: ExchangeId,

    /// Run continuously and send scheduled reports to Telegram
    #[arg(long)]
    daemon: bool,

    /// Also send the one-shot report to Telegram
    #[arg(long)]
    notify: bool,
}

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env (optional — real env vars win in deployment) ────────────
    dotenvy::dotenv().ok();

    // ── 2. Initialise structured logging ─────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env()
            .add_directive("perp_ratio=info".parse()?)
            .add_directive("reqwest=warn".parse()?))
        .init();

    let cli = Cli::parse();

    // ── 3. Config + shared HTTP client ───────────────────────────────────────
    let config = Config::from_env().context("Failed to load config")?;
    let client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let notifier: Box<dyn Notifier> = match &config.telegram {
        Some(settings) => Box::new(TelegramNotifier::new(client.clone(), settings.clone())),
        None => {
            if cli.daemon || cli.notify {
                warn!("TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set — chat delivery disabled");
            }
            Box::new(DisabledNotifier)
        }
    };

    let scheduler = config.schedule;
    let (config, client, notifier) = (&config, &client, notifier.as_ref());

    // ── 4. One-shot ──────────────────────────────────────────────────────────
    if !cli.daemon {
        let notify = cli.notify.then_some(notifier);
        let target = cli.exchange;
        scheduler
            .run_now(move || async move {
                runner::run_once(target, |id| exchange::build_adapter(id, config, client), notify).await;
            })
            .await;
        return Ok(());
    }

    // ── 5. Daemon ────────────────────────────────────────────────────────────
    info!(
        r#"

  ╔═══════════════════════════════════════════════╗
  ║        PERP-RATIO — Exposure Reporter         ║
  ║        Binance · Bybit · Bitget → Telegram    ║
  ╚═══════════════════════════════════════════════╝"#
    );

    info!(
        interval_min = scheduler.interval_min(),
        exchanges    = ?config.report_exchanges,
        "Starting daemon mode"
    );

    scheduler
        .run_forever(move || async move {
            runner::run_configured(config, client, notifier).await;
        })
        .await;

    Ok(())
}
