//! Plain-text reports and CSV export.
//!
//! - [`format_alert`]: one live signal, as sent by the monitor
//! - [`format_backtest`]: replay summary with recent signals and statistics
//! - [`format_optimization`]: ranking plus the commands to act on the best
//! - [`format_task_list`]: the task store contents
//! - [`write_ranking_csv`]: optimization ranking as CSV

use std::fmt::Write as _;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;

use sigwatch_core::backtest::BacktestReport;
use sigwatch_core::domain::{Period, Signal};
use sigwatch_core::indicators::IndicatorSnapshot;
use sigwatch_core::signals::IndicatorSpec;

use crate::optimizer::OptimizationReport;
use crate::store::MonitorTask;

/// Signals listed at the end of a backtest report.
pub const RECENT_SIGNALS: usize = 20;

fn fmt_time(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

fn fmt_date(ts: Option<NaiveDateTime>) -> String {
    ts.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Spec as CLI arguments: `--indicator MACD_DIV --param window=3`.
pub fn spec_args(spec: &IndicatorSpec) -> String {
    let canonical = spec.to_string();
    let mut tokens = canonical.split_whitespace();
    let mut out = format!("--indicator {}", tokens.next().unwrap_or_default());
    for param in tokens {
        let _ = write!(out, " --param {param}");
    }
    out
}

fn signal_marker(signal: &Signal) -> &'static str {
    if signal.is_buy() {
        "BUY "
    } else {
        "SELL"
    }
}

fn write_snapshot(out: &mut String, snapshot: &IndicatorSnapshot) {
    let lines = snapshot.lines();
    if lines.is_empty() {
        out.push_str("  (not enough history)\n");
        return;
    }
    for chunk in lines.chunks(4) {
        let row: Vec<String> = chunk.iter().map(|(name, v)| format!("{name}={v:.3}")).collect();
        let _ = writeln!(out, "  {}", row.join("  "));
    }
}

/// Alert for a newly observed signal.
pub fn format_alert(
    symbol: &str,
    period: Period,
    spec: &IndicatorSpec,
    signal: &Signal,
    snapshot: &IndicatorSnapshot,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {symbol} {} {}", signal_marker(signal), period.label(), spec.kind());
    let _ = writeln!(out, "signal:  {} ({})", signal.kind.label(), signal.kind.code());
    let _ = writeln!(out, "price:   {:.4}", signal.price);
    let _ = writeln!(out, "time:    {}", fmt_time(signal.timestamp));
    if let Some(window) = spec.window() {
        let _ = writeln!(out, "window:  {window}");
    }
    out.push_str("indicators:\n");
    write_snapshot(&mut out, snapshot);
    out
}

/// Backtest summary: range, recent signals, statistics, current state.
pub fn format_backtest(
    symbol: &str,
    period: Period,
    spec: &IndicatorSpec,
    report: &BacktestReport,
    snapshot: &IndicatorSnapshot,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{symbol} {} {spec} backtest", period.label());
    let _ = writeln!(
        out,
        "range: {} ~ {} ({} bars)",
        fmt_date(report.start),
        report.end.map(fmt_time).unwrap_or_else(|| "-".to_string()),
        report.bar_count
    );
    if let Some(window) = spec.window() {
        let _ = writeln!(out, "divergences: {} (window={window})", report.divergences);
    }
    out.push('\n');

    if report.signals.is_empty() {
        out.push_str("no signals\n");
    } else {
        let shown = report.signals.len().min(RECENT_SIGNALS);
        let _ = writeln!(out, "last {shown} of {} signals:", report.signals.len());
        for s in &report.signals[report.signals.len() - shown..] {
            let _ = writeln!(
                out,
                "  {} {:<20} {}  {:.4}",
                signal_marker(s),
                s.kind.code(),
                fmt_time(s.timestamp),
                s.price
            );
        }

        let stats = &report.stats;
        out.push_str("\nstatistics (buy on bullish, sell on bearish):\n");
        let _ = writeln!(out, "  trades:       {}", stats.trades);
        let _ = writeln!(
            out,
            "  win rate:     {:.1}% ({} won / {} lost)",
            stats.win_rate, stats.wins, stats.losses
        );
        let _ = writeln!(out, "  avg return:   {:.2}%", stats.avg_return);
        let _ = writeln!(out, "  total return: {:.2}%", stats.total_return);
        if let Some(open) = &stats.open_position {
            let _ = writeln!(
                out,
                "  open since {} at {:.4}, marked {:.4} ({:+.2}%)",
                fmt_time(open.entry_time),
                open.entry_price,
                open.mark_price,
                open.unrealized_pct
            );
        }
    }

    out.push_str("\ncurrent state:\n");
    write_snapshot(&mut out, snapshot);
    out
}

/// Ranking with the best combination and the commands to use it.
pub fn format_optimization(report: &OptimizationReport) -> String {
    let mut out = String::new();
    let symbol = &report.symbol;
    let _ = writeln!(out, "{symbol} strategy optimization");
    let _ = writeln!(out, "data from: {}", fmt_date(Some(report.common_start)));
    let periods: Vec<String> = report
        .periods
        .iter()
        .map(|p| format!("{}({})", p.period, p.bars))
        .collect();
    let _ = writeln!(out, "periods:   {}", periods.join(" "));
    let _ = writeln!(out, "evaluated: {} combinations", report.evaluated);
    out.push_str("\nranked by total return:\n");

    for (i, r) in report.ranked.iter().enumerate() {
        let _ = writeln!(out, "{:>2}. {} {}", i + 1, r.period.label(), r.spec);
        let _ = writeln!(
            out,
            "    win rate {:.1}%  trades {}  total {:.2}%",
            r.stats.win_rate, r.stats.trades, r.stats.total_return
        );
    }

    if let Some(best) = report.best() {
        let args = format!("--symbol {symbol} --period {} {}", best.period, spec_args(&best.spec));
        let _ = writeln!(out, "\nrecommended: {} {}", best.period.label(), best.spec);
        let _ = writeln!(out, "  sigwatch backtest {args}");
        let _ = writeln!(out, "  sigwatch task add {args}");
    }
    out
}

pub fn format_task_list(tasks: &[MonitorTask]) -> String {
    if tasks.is_empty() {
        return "no tasks\n".to_string();
    }
    let mut out = String::new();
    for (i, t) in tasks.iter().enumerate() {
        let status = if t.enabled { "on " } else { "off" };
        let last = t
            .last_signal
            .map(|k| k.code())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "{}. [{status}] {} {} {}", i + 1, t.symbol, t.period.label(), t.spec);
        let _ = writeln!(out, "   id: {}  to: {}  last: {last}", t.id, t.destination);
    }
    out
}

#[derive(Serialize)]
struct RankingRow<'a> {
    rank: usize,
    period: &'a str,
    indicator: String,
    trades: usize,
    wins: usize,
    win_rate: f64,
    avg_return: f64,
    total_return: f64,
    bars: usize,
}

/// Write the ranking as CSV, one row per ranked combination.
pub fn write_ranking_csv(report: &OptimizationReport, path: &Path) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    for (i, r) in report.ranked.iter().enumerate() {
        wtr.serialize(RankingRow {
            rank: i + 1,
            period: r.period.code(),
            indicator: r.spec.to_string(),
            trades: r.stats.trades,
            wins: r.stats.wins,
            win_rate: r.stats.win_rate,
            avg_return: r.stats.avg_return,
            total_return: r.stats.total_return,
            bars: r.bar_count,
        })?;
    }
    wtr.flush()?;
    Ok(())
}
