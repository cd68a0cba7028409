//! # runner — one reporting cycle
//!
//! ```text
//! adapter ──▶ positions_or_empty ─┐
//!         └─▶ balance_or_zero ────┼─▶ aggregate ─▶ Report ─▶ stdout
//!                                 │                       └─▶ Notifier
//! ```
//!
//! [`run_exchange`] does one exchange. [`run_all`] walks a list of exchanges
//! in order with a pause between them. A failure on one exchange becomes an
//! error message for that exchange and the pass moves on.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::engine::{aggregate, ExposureRules};
use crate::error::ExchangeError;
use crate::exchange::{balance_or_zero, build_adapter, positions_or_empty, ExchangeAdapter};
use crate::models::ExchangeId;
use crate::notifier::{Delivery, Notifier};
use crate::report::{render_console, render_error, render_telegram, Report};

/// What happened to one exchange during a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    Reported(Delivery),
    /// Adapter returned no open positions; nothing was sent
    NoResults,
    Failed { error: String, delivery: Delivery },
}

// ─── Single Exchange ──────────────────────────────────────────────────────────

/// Fetch, aggregate and build the report without printing it.
pub async fn collect_report(adapter: &dyn ExchangeAdapter) -> Option<Report> {
    let exchange = adapter.id();

    info!(%exchange, "Fetching positions");
    let positions = positions_or_empty(adapter).await;

    info!(%exchange, "Fetching account balance");
    let balance = balance_or_zero(adapter).await;

    if positions.is_empty() {
        info!(%exchange, "No positions found");
        return None;
    }

    info!(%exchange, count = positions.len(), "Found positions");

    let rules = ExposureRules::new(adapter.notional_basis());
    let exposure = aggregate(&positions, &rules);

    Some(Report {
        exchange,
        position_count: positions.len(),
        balance,
        exposure,
        rules,
    })
}

/// [`collect_report`], then print the console rendering to stdout.
pub async fn run_exchange(adapter: &dyn ExchangeAdapter) -> Option<Report> {
    let report = collect_report(adapter).await?;
    println!("{}", render_console(&report));
    Some(report)
}

/// One-shot mode: report a single exchange, optionally forwarding it to chat.
pub async fn run_once<F>(id: ExchangeId, make_adapter: F, notifier: Option<&dyn Notifier>) -> ExchangeOutcome
where
    F: FnOnce(ExchangeId) -> Result<Box<dyn ExchangeAdapter>, ExchangeError>,
{
    let adapter = match make_adapter(id) {
        Ok(adapter) => adapter,
        Err(e) => {
            eprintln!("Error: {e}");
            let delivery = match notifier {
                Some(n) => n.send(&render_error(id, &e.to_string())).await,
                None => Delivery::Skipped,
            };
            return ExchangeOutcome::Failed { error: e.to_string(), delivery };
        }
    };

    match (run_exchange(adapter.as_ref()).await, notifier) {
        (Some(report), Some(n)) => ExchangeOutcome::Reported(n.send(&render_telegram(&report)).await),
        (Some(_), None) => ExchangeOutcome::Reported(Delivery::Skipped),
        (None, _) => ExchangeOutcome::NoResults,
    }
}

// ─── Multi-Exchange Pass ──────────────────────────────────────────────────────

/// Report every exchange in `exchanges`, in order, sleeping `delay` between
/// exchanges (not after the last).
pub async fn run_all<F>(
    exchanges: &[ExchangeId],
    delay: Duration,
    notifier: &dyn Notifier,
    mut make_adapter: F,
) -> Vec<(ExchangeId, ExchangeOutcome)>
where
    F: FnMut(ExchangeId) -> Result<Box<dyn ExchangeAdapter>, ExchangeError>,
{
    info!(exchanges = ?exchanges, "Starting scheduled analysis for all exchanges");

    let mut outcomes = Vec::with_capacity(exchanges.len());

    for (i, &id) in exchanges.iter().enumerate() {
        let outcome = match make_adapter(id) {
            Ok(adapter) => match run_exchange(adapter.as_ref()).await {
                Some(report) => {
                    let delivery = notifier.send(&render_telegram(&report)).await;
                    info!(exchange = %id, ?delivery, "Analyzed and sent report");
                    ExchangeOutcome::Reported(delivery)
                }
                None => {
                    warn!(exchange = %id, "No results");
                    ExchangeOutcome::NoResults
                }
            },
            Err(e) => {
                error!(exchange = %id, error = %e, "Error analyzing exchange");
                let delivery = notifier.send(&render_error(id, &e.to_string())).await;
                info!(exchange = %id, ?delivery, "Sent error report");
                ExchangeOutcome::Failed { error: e.to_string(), delivery }
            }
        };
        outcomes.push((id, outcome));

        if i + 1 < exchanges.len() && !delay.is_zero() {
            info!(delay_secs = delay.as_secs(), "Waiting before processing next exchange");
            tokio::time::sleep(delay).await;
        }
    }

    outcomes
}

/// [`run_all`] over the configured exchange list with real adapters.
pub async fn run_configured(
    config: &Config,
    client: &reqwest::Client,
    notifier: &dyn Notifier,
) -> Vec<(ExchangeId, ExchangeOutcome)> {
    run_all(&config.report_exchanges, config.exchange_delay, notifier, |id| {
        build_adapter(id, config, client)
    })
    .await
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Instant;

    use async_trait::async_trait;

    use super::*;
    use crate::engine::LongShortRatio;
    use crate::exchange::testing::FakeAdapter;
    use crate::models::{BalanceSummary, NotionalBasis, Position, Side};

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) -> Delivery {
            self.sent.lock().unwrap().push(text.to_string());
            Delivery::Sent
        }
    }

    fn pos(symbol: &str, side: Side, notional: f64, pnl: f64) -> Position {
        Position {
            symbol:         symbol.to_string(),
            side,
            notional:       Some(notional),
            unrealized_pnl: pnl,
        }
    }

    fn balance() -> BalanceSummary {
        BalanceSummary { wallet_balance: 1000.0, margin_balance: 1010.0, unrealized_pnl: 10.0 }
    }

    fn book() -> Vec<Position> {
        vec![
            pos("ETHUSDT", Side::Long, 3000.0, 20.0),
            pos("BTCUSDT", Side::Short, 2000.0, -10.0),
        ]
    }

    fn fake(id: ExchangeId) -> Result<Box<dyn ExchangeAdapter>, ExchangeError> {
        Ok(Box::new(FakeAdapter::ok(id, book(), balance())))
    }

    #[tokio::test]
    async fn test_collect_report() {
        let adapter = FakeAdapter::ok(ExchangeId::Binance, book(), balance());
        let report = collect_report(&adapter).await.unwrap();

        assert_eq!(report.exchange, ExchangeId::Binance);
        assert_eq!(report.position_count, 2);
        assert_eq!(report.balance, balance());
        assert_eq!(report.exposure.effective_long_total, 3000.0);
        assert_eq!(report.exposure.effective_short_total, 1000.0);
        assert_eq!(report.exposure.ratio, LongShortRatio::Finite(3.0));
    }

    #[tokio::test]
    async fn test_no_positions_gives_none() {
        let adapter = FakeAdapter::ok(ExchangeId::Bitget, vec![], balance());
        assert!(collect_report(&adapter).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_gives_none() {
        let adapter = FakeAdapter::failing(ExchangeId::Bybit);
        assert!(run_exchange(&adapter).await.is_none());
    }

    #[tokio::test]
    async fn test_rules_follow_adapter_basis() {
        let mut adapter = FakeAdapter::ok(ExchangeId::Bybit, vec![pos("SOLUSDT", Side::Long, 1500.0, 20.0)], balance());
        adapter.basis = NotionalBasis::ExcludesPnl;

        let report = collect_report(&adapter).await.unwrap();
        assert_eq!(report.rules.basis, NotionalBasis::ExcludesPnl);
        assert_eq!(report.exposure.symbol_notional["SOLUSDT"], 1520.0);
    }

    #[tokio::test]
    async fn test_run_all_sends_one_message_per_exchange() {
        let notifier = RecordingNotifier::default();
        let outcomes = run_all(&ExchangeId::ALL, Duration::ZERO, &notifier, fake).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|(_, o)| *o == ExchangeOutcome::Reported(Delivery::Sent)));

        let messages = notifier.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].starts_with("*BINANCE - Perpetual Positions Analysis*"));
        assert!(messages[1].starts_with("*BYBIT - Perpetual Positions Analysis*"));
        assert!(messages[2].starts_with("*BITGET - Perpetual Positions Analysis*"));
    }

    #[tokio::test]
    async fn test_run_all_continues_past_failure() {
        let notifier = RecordingNotifier::default();
        let outcomes = run_all(&ExchangeId::ALL, Duration::ZERO, &notifier, |id| match id {
            ExchangeId::Bybit => Err(ExchangeError::MissingCredentials(id)),
            ExchangeId::Bitget => Ok(Box::new(FakeAdapter::ok(id, vec![], balance())) as Box<dyn ExchangeAdapter>),
            _ => fake(id),
        })
        .await;

        assert_eq!(outcomes[0].1, ExchangeOutcome::Reported(Delivery::Sent));
        assert!(matches!(outcomes[1].1, ExchangeOutcome::Failed { .. }));
        assert_eq!(outcomes[2].1, ExchangeOutcome::NoResults);

        // no message for an exchange without results
        let messages = notifier.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].starts_with("*BYBIT - Error*\n\nFailed to fetch positions: "));
    }

    #[tokio::test]
    async fn test_run_all_waits_between_exchanges() {
        let notifier = RecordingNotifier::default();
        let started = Instant::now();
        run_all(&[ExchangeId::Binance, ExchangeId::Bybit], Duration::from_millis(200), &notifier, fake).await;

        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_run_all_no_wait_after_last_exchange() {
        let notifier = RecordingNotifier::default();
        let started = Instant::now();
        run_all(&[ExchangeId::Bitget], Duration::from_secs(30), &notifier, fake).await;

        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_run_once_without_notifier() {
        let outcome = run_once(ExchangeId::Binance, fake, None).await;
        assert_eq!(outcome, ExchangeOutcome::Reported(Delivery::Skipped));
    }

    #[tokio::test]
    async fn test_run_once_reports_build_error() {
        let notifier = RecordingNotifier::default();
        let outcome = run_once(
            ExchangeId::Bitget,
            |id| Err(ExchangeError::MissingCredentials(id)),
            Some(&notifier as &dyn Notifier),
        )
        .await;

        assert!(matches!(outcome, ExchangeOutcome::Failed { delivery: Delivery::Sent, .. }));
        assert!(notifier.messages()[0].starts_with("*BITGET - Error*"));
    }
}
