//! # report — render an exposure summary as text
//!
//! Two renderings of the same [`Report`] with the same sections and ordering:
//! - [`render_console`] — plain text with ANSI colours for stdout
//! - [`render_telegram`] — Telegram `Markdown` for the chat notifier
//!
//! Symbols are shown through [`display_symbol`], which drops the settlement
//! suffix. The summary's map keys are never rewritten.

use std::fmt::Write as _;

use crate::engine::{ExposureRules, ExposureSummary, LongShortRatio, SymbolExposure};
use crate::models::{BalanceSummary, ExchangeId};

const GREEN:  &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";
const CYAN:   &str = "\x1b[96m";
const RED:    &str = "\x1b[91m";
const RESET:  &str = "\x1b[0m";

const SETTLEMENT_SUFFIXES: [&str; 2] = [":USDT", ":USDC"];

// ─── Report ───────────────────────────────────────────────────────────────────

/// Everything one exchange cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub exchange:       ExchangeId,
    /// Positions returned by the adapter, before exclusions
    pub position_count: usize,
    pub balance:        BalanceSummary,
    pub exposure:       ExposureSummary,
    pub rules:          ExposureRules,
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// `"ETH/USDT:USDT"` → `"ETH/USDT"`. Display only.
pub fn display_symbol(symbol: &str) -> &str {
    for suffix in SETTLEMENT_SUFFIXES {
        if let Some((head, _)) = symbol.split_once(suffix) {
            return head;
        }
    }
    symbol
}

/// Two decimals with thousands separators: `-1234567.891` → `"-1,234,567.89"`.
pub fn group_thousands(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (sign, digits) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}{grouped}.{frac_part}")
}

fn usd(value: f64) -> String {
    format!("${}", group_thousands(value))
}

fn pnl_colour(value: f64) -> &'static str {
    if value >= 0.0 { GREEN } else { RED }
}

fn excluded_tickers(rules: &ExposureRules) -> String {
    rules
        .excluded
        .iter()
        .filter(|s| !s.contains('/'))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ─── Console ──────────────────────────────────────────────────────────────────

pub fn render_console(report: &Report) -> String {
    let s = &report.exposure;
    let b = &report.balance;
    let heavy = "=".repeat(60);
    let light = "-".repeat(40);
    let mut out = String::new();

    // writeln! into a String cannot fail
    let _ = writeln!(out, "\n{heavy}");
    let _ = writeln!(out, "PERPETUAL POSITIONS LONG/SHORT RATIO ANALYSIS");
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "Exchange: {}", report.exchange.heading());
    let _ = writeln!(out, "Total positions analyzed: {}", report.position_count);
    let _ = writeln!(out, "Excluded tickers: {}", excluded_tickers(&report.rules));
    let _ = writeln!(out, "{} weight factor: {}", report.rules.half_weight_prefix, report.rules.reduced_weight);

    let _ = writeln!(out, "\n{light}\nACCOUNT BALANCE\n{light}");
    let _ = writeln!(out, "Wallet Balance:        {}", usd(b.wallet_balance));
    let _ = writeln!(out, "{CYAN}Margin Balance:        {}{RESET}", usd(b.margin_balance));
    let _ = writeln!(out, "{}Unrealized PNL:        {}{RESET}", pnl_colour(b.unrealized_pnl), usd(b.unrealized_pnl));

    let _ = writeln!(out, "\n{light}\nOVERALL NOTIONAL VALUES\n{light}");
    let _ = writeln!(out, "Raw Long Total:        {}", usd(s.raw_long_total));
    let _ = writeln!(out, "Raw Short Total:       {}", usd(s.raw_short_total));
    let _ = writeln!(out, "Effective Long Total:  {}", usd(s.effective_long_total));
    let _ = writeln!(out, "Effective Short Total: {}", usd(s.effective_short_total));
    let _ = writeln!(out, "{}Overall PNL:           {}{RESET}", pnl_colour(s.overall_pnl), usd(s.overall_pnl));

    let _ = writeln!(out, "\n{light}\nLONG/SHORT RATIO\n{light}");
    match s.ratio {
        LongShortRatio::Infinite => {
            let _ = writeln!(out, "{YELLOW}Long/Short Ratio: ∞ (no short positions){RESET}");
        }
        LongShortRatio::Finite(r) => {
            let _ = writeln!(out, "{YELLOW}Long/Short Ratio: {r:.4}{RESET}");
        }
    }

    let _ = writeln!(out, "\n{light}\nPOSITION BREAKDOWN BY SYMBOL\n{light}");

    let console_leg = |out: &mut String, leg: &SymbolExposure, label: &str| {
        let _ = writeln!(
            out,
            "  {:<15} {label} ${:>12} | PNL: {}${:>9}{RESET}",
            display_symbol(&leg.symbol),
            group_thousands(leg.net_notional.abs()),
            pnl_colour(leg.pnl),
            group_thousands(leg.pnl),
        );
    };

    let longs = s.long_legs();
    let shorts = s.short_legs();

    if !longs.is_empty() {
        let _ = writeln!(out, "LONG POSITIONS:");
        for leg in &longs {
            console_leg(&mut out, leg, "LONG ");
        }
    }
    if !shorts.is_empty() {
        if !longs.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "SHORT POSITIONS:");
        for leg in &shorts {
            console_leg(&mut out, leg, "SHORT");
        }
    }

    out
}

// ─── Telegram ─────────────────────────────────────────────────────────────────

pub fn render_telegram(report: &Report) -> String {
    let s = &report.exposure;
    let b = &report.balance;
    let mut msg = String::new();

    let _ = write!(msg, "*{} - Perpetual Positions Analysis*\n\n", report.exchange.heading());

    msg.push_str("*Account Balance:*\n");
    let _ = writeln!(msg, "Wallet Balance: {}", usd(b.wallet_balance));
    let _ = writeln!(msg, "*Margin Balance: {}*", usd(b.margin_balance));
    let _ = write!(msg, "*Unrealized PNL: {}*\n\n", usd(b.unrealized_pnl));

    msg.push_str("*Overall Stats:*\n");
    let _ = writeln!(msg, "Raw Long: {}", usd(s.raw_long_total));
    let _ = writeln!(msg, "Raw Short: {}", usd(s.raw_short_total));
    let _ = writeln!(msg, "Effective Long: {}", usd(s.effective_long_total));
    let _ = writeln!(msg, "Effective Short: {}", usd(s.effective_short_total));
    let _ = writeln!(msg, "Overall PNL: {}", usd(s.overall_pnl));

    match s.ratio {
        LongShortRatio::Infinite => msg.push_str("*Long/Short Ratio: ∞*\n\n"),
        LongShortRatio::Finite(r) => {
            let _ = write!(msg, "*Long/Short Ratio: {r:.4}*\n\n");
        }
    }

    let chat_leg = |msg: &mut String, leg: &SymbolExposure| {
        let _ = writeln!(
            msg,
            "`{:<12}` ${:>10} | PNL: ${:>8}",
            display_symbol(&leg.symbol),
            group_thousands(leg.net_notional.abs()),
            group_thousands(leg.pnl),
        );
    };

    let longs = s.long_legs();
    if !longs.is_empty() {
        msg.push_str("*Long Positions:*\n");
        for leg in &longs {
            chat_leg(&mut msg, leg);
        }
        msg.push('\n');
    }

    let shorts = s.short_legs();
    if !shorts.is_empty() {
        msg.push_str("*Short Positions:*\n");
        for leg in &shorts {
            chat_leg(&mut msg, leg);
        }
    }

    msg
}

/// Chat message sent in place of a report when an exchange cycle fails.
pub fn render_error(exchange: ExchangeId, error: &str) -> String {
    format!("*{} - Error*\n\nFailed to fetch positions: {error}", exchange.heading())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::aggregate;
    use crate::models::{Position, Side};

    fn pos(symbol: &str, side: Side, notional: f64, pnl: f64) -> Position {
        Position {
            symbol:         symbol.to_string(),
            side,
            notional:       Some(notional),
            unrealized_pnl: pnl,
        }
    }

    fn report(positions: &[Position]) -> Report {
        let rules = ExposureRules::default();
        Report {
            exchange:       ExchangeId::Binance,
            position_count: positions.len(),
            balance:        BalanceSummary { wallet_balance: 12345.678, margin_balance: 12400.0, unrealized_pnl: -54.32 },
            exposure:       aggregate(positions, &rules),
            rules,
        }
    }

    #[test]
    fn test_display_symbol_strips_settlement() {
        assert_eq!(display_symbol("ETH/USDT:USDT"), "ETH/USDT");
        assert_eq!(display_symbol("BTC/USDC:USDC"), "BTC/USDC");
        assert_eq!(display_symbol("SOLUSDT"), "SOLUSDT");
    }

    #[test]
    fn test_display_only_key_unchanged() {
        let r = report(&[pos("ETH/USDT:USDT", Side::Long, 100.0, 1.0)]);
        assert!(r.exposure.symbol_notional.contains_key("ETH/USDT:USDT"));
        assert!(!r.exposure.symbol_notional.contains_key("ETH/USDT"));

        let console = render_console(&r);
        let chat = render_telegram(&r);
        assert!(console.contains("  ETH/USDT        LONG "));
        assert!(!console.contains("ETH/USDT:USDT"));
        assert!(chat.contains("`ETH/USDT    `"));
        assert!(!chat.contains(":USDT"));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0.0), "0.00");
        assert_eq!(group_thousands(999.999), "1,000.00");
        assert_eq!(group_thousands(1234567.891), "1,234,567.89");
        assert_eq!(group_thousands(-54.32), "-54.32");
        assert_eq!(group_thousands(-12345.6), "-12,345.60");
    }

    #[test]
    fn test_console_sections_and_values() {
        let r = report(&[
            pos("BTCUSDT", Side::Long, 1000.0, 12.5),
            pos("ETHUSDT", Side::Short, 250.0, -3.0),
        ]);
        let out = render_console(&r);

        let order = [
            "PERPETUAL POSITIONS LONG/SHORT RATIO ANALYSIS",
            "ACCOUNT BALANCE",
            "OVERALL NOTIONAL VALUES",
            "\nLONG/SHORT RATIO\n",
            "POSITION BREAKDOWN BY SYMBOL",
            "LONG POSITIONS:",
            "SHORT POSITIONS:",
        ];
        let idx: Vec<usize> = order.iter().map(|h| out.find(h).unwrap()).collect();
        assert!(idx.windows(2).all(|w| w[0] < w[1]));

        assert!(out.contains("Exchange: BINANCE"));
        assert!(out.contains("Excluded tickers: BTCDOMUSDT, PAXGUSDT"));
        assert!(out.contains("BTC weight factor: 0.5"));
        assert!(out.contains("Wallet Balance:        $12,345.68"));
        assert!(out.contains("Effective Long Total:  $500.00"));
        assert!(out.contains("Long/Short Ratio: 2.0000"));
        assert!(out.contains(&format!("  BTCUSDT         LONG  $    1,000.00 | PNL: {GREEN}$    12.50{RESET}")));
        assert!(out.contains(&format!("  ETHUSDT         SHORT $      250.00 | PNL: {RED}$    -3.00{RESET}")));
    }

    #[test]
    fn test_console_infinite_ratio() {
        let out = render_console(&report(&[pos("SOLUSDT", Side::Long, 10.0, 0.0)]));
        assert!(out.contains("Long/Short Ratio: ∞ (no short positions)"));
        assert!(!out.contains("SHORT POSITIONS:"));
    }

    #[test]
    fn test_telegram_layout() {
        let r = report(&[
            pos("SOLUSDT", Side::Long, 300.0, 4.0),
            pos("ETHUSDT", Side::Long, 900.0, -1.0),
            pos("DOGEUSDT", Side::Short, 150.0, 2.0),
        ]);
        let msg = render_telegram(&r);

        assert!(msg.starts_with("*BINANCE - Perpetual Positions Analysis*\n\n*Account Balance:*\n"));
        assert!(msg.contains("*Margin Balance: $12,400.00*\n"));
        assert!(msg.contains("*Unrealized PNL: $-54.32*\n\n"));
        assert!(msg.contains("*Long/Short Ratio: 8.0000*\n\n"));

        let eth = msg.find("`ETHUSDT     ` $    900.00 | PNL: $   -1.00").unwrap();
        let sol = msg.find("`SOLUSDT     ` $    300.00 | PNL: $    4.00").unwrap();
        let doge = msg.find("`DOGEUSDT    ` $    150.00 | PNL: $    2.00").unwrap();
        assert!(eth < sol && sol < doge);
        assert!(msg.contains("\n\n*Short Positions:*\n"));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            render_error(ExchangeId::Bitget, "bitget credentials are not configured"),
            "*BITGET - Error*\n\nFailed to fetch positions: bitget credentials are not configured"
        );
    }
}
