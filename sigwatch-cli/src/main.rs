//! Sigwatch CLI — signal checks, backtests, optimization and monitoring.
//!
//! Commands:
//! - `signal` — classify the newest bar of one symbol/period/indicator
//! - `backtest` — replay an indicator over the full history
//! - `optimize` — rank every period × indicator × window combination
//! - `task add|remove|list` — manage monitored tasks
//! - `monitor` — poll every enabled task, once or on an interval

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sigwatch_core::backtest::BacktestEngine;
use sigwatch_core::domain::{IndicatorKind, Period};
use sigwatch_core::indicators::IndicatorSnapshot;
use sigwatch_core::signals::{IndicatorSpec, SignalClassifier};
use sigwatch_runner::report::{format_alert, format_backtest, format_optimization, format_task_list, write_ranking_csv};
use sigwatch_runner::{
    CsvDataProvider, JsonTaskStore, MarketDataProvider, Monitor, MonitorTask, SigwatchConfig,
    StdoutNotifier, StrategyOptimizer, SyntheticProvider, TaskStore,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sigwatch",
    about = "Sigwatch — indicator signal monitor and strategy backtester"
)]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of `<symbol>_<period>.csv` files (overrides the config).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use deterministic synthetic bars instead of CSV files.
    #[arg(long, global = true, default_value_t = false)]
    synthetic: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Symbol, period and indicator with `key=value` overrides.
#[derive(Args)]
struct Target {
    #[arg(long)]
    symbol: String,

    /// 1min, 5min, 15min, 30min, 60min, 120min, 240min or daily.
    #[arg(long)]
    period: Period,

    /// MACD, KDJ, MA, RSI, MACD_DIV, KDJ_DIV, MACD_COMBO or KDJ_COMBO.
    #[arg(long)]
    indicator: String,

    /// Indicator parameter, e.g. `--param window=3`. Repeatable.
    #[arg(long = "param")]
    params: Vec<String>,
}

impl Target {
    fn spec(&self) -> Result<IndicatorSpec> {
        let canonical = std::iter::once(self.indicator.as_str())
            .chain(self.params.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        canonical
            .parse::<IndicatorSpec>()
            .with_context(|| format!("invalid indicator '{canonical}'"))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the newest bar.
    Signal(Target),
    /// Replay an indicator over the full history and report trade statistics.
    Backtest {
        #[command(flatten)]
        target: Target,

        /// Print the full report as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Rank period × indicator × window combinations for one symbol.
    Optimize {
        #[arg(long)]
        symbol: String,

        /// Also write the ranking to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Print the full report as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Monitored task management.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Poll every enabled task and send new signals.
    Monitor {
        /// Run a single pass and exit.
        #[arg(long, default_value_t = false)]
        once: bool,
    },
    /// List supported periods and indicators.
    Types,
}

#[derive(Subcommand)]
enum TaskAction {
    /// Add a task.
    Add {
        #[command(flatten)]
        target: Target,

        /// Alert destination passed to the notifier.
        #[arg(long, default_value = "stdout")]
        to: String,
    },
    /// Remove a task by id.
    Remove { id: String },
    /// List tasks.
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut config = match &cli.config {
        Some(path) => SigwatchConfig::from_file(path)?,
        None => SigwatchConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.monitor.data_dir = dir.clone();
    }
    let provider = make_provider(&config, cli.synthetic);

    match cli.command {
        Commands::Signal(target) => run_signal(&config, provider.as_ref(), &target),
        Commands::Backtest { target, json } => run_backtest(&config, provider.as_ref(), &target, json),
        Commands::Optimize { symbol, csv, json } => {
            run_optimize(&config, provider.as_ref(), &symbol, csv, json)
        }
        Commands::Task { action } => run_task(&config, action),
        Commands::Monitor { once } => run_monitor(&config, provider, once),
        Commands::Types => {
            print_types();
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn make_provider(config: &SigwatchConfig, synthetic: bool) -> Box<dyn MarketDataProvider> {
    if synthetic {
        Box::new(SyntheticProvider::default())
    } else {
        Box::new(CsvDataProvider::new(config.monitor.data_dir.clone()))
    }
}

fn run_signal(config: &SigwatchConfig, provider: &dyn MarketDataProvider, target: &Target) -> Result<()> {
    let spec = target.spec()?;
    let classifier = SignalClassifier::new(spec, config.classifier)?;
    let series = provider.fetch(&target.symbol, target.period)?;
    let bars = series.bars();
    let snapshot = IndicatorSnapshot::latest(bars);

    match classifier.classify(bars) {
        Some(signal) => print!(
            "{}",
            format_alert(&target.symbol, target.period, &spec, &signal, &snapshot)
        ),
        None => {
            let at = series
                .end()
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!("{} {} {spec}: no signal on the bar at {at}", target.symbol, target.period);
            for (name, value) in snapshot.lines() {
                println!("  {name:<5} {value:.4}");
            }
        }
    }
    Ok(())
}

fn run_backtest(
    config: &SigwatchConfig,
    provider: &dyn MarketDataProvider,
    target: &Target,
    json: bool,
) -> Result<()> {
    let spec = target.spec()?;
    let classifier = SignalClassifier::new(spec, config.classifier)?;
    let series = provider.fetch(&target.symbol, target.period)?;
    let bars = series.bars();

    let report = BacktestEngine::new(classifier).run(bars);
    info!(
        symbol = %target.symbol,
        period = %target.period,
        indicator = %spec,
        signals = report.signals.len(),
        trades = report.stats.trades,
        "backtest complete"
    );
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print!(
        "{}",
        format_backtest(&target.symbol, target.period, &spec, &report, &IndicatorSnapshot::latest(bars))
    );
    Ok(())
}

fn run_optimize(
    config: &SigwatchConfig,
    provider: &dyn MarketDataProvider,
    symbol: &str,
    csv: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let optimizer = StrategyOptimizer::new(config.optimizer.clone(), config.classifier);
    let report = optimizer.optimize(symbol, provider)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_optimization(&report));
    }

    if let Some(path) = csv {
        write_ranking_csv(&report, &path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("ranking saved to: {}", path.display());
    }
    Ok(())
}

fn run_task(config: &SigwatchConfig, action: TaskAction) -> Result<()> {
    let mut store = JsonTaskStore::open(&config.monitor.store_path)?;
    match action {
        TaskAction::Add { target, to } => {
            let spec = target.spec()?;
            let task = MonitorTask::new(&target.symbol, target.period, spec, &to);
            let id = task.id.clone();
            store.add(task)?;
            println!("added {id} ({spec})");
        }
        TaskAction::Remove { id } => {
            let task = store.remove(&id)?;
            println!("removed {} ({} {} {})", task.id, task.symbol, task.period, task.spec);
        }
        TaskAction::List => print!("{}", format_task_list(&store.list())),
    }
    Ok(())
}

fn run_monitor(config: &SigwatchConfig, provider: Box<dyn MarketDataProvider>, once: bool) -> Result<()> {
    let mut store = JsonTaskStore::open(&config.monitor.store_path)?;
    let monitor = Monitor::new(provider, StdoutNotifier, config.classifier, &config.monitor);
    let interval = Duration::from_secs(config.monitor.poll_interval_secs);

    info!(
        store = %store.path().display(),
        interval_secs = config.monitor.poll_interval_secs,
        once,
        "starting monitor"
    );
    monitor.run(&mut store, interval, once.then_some(1));
    Ok(())
}

fn print_types() {
    println!("periods:");
    for p in Period::ALL {
        println!("  {:<7} {}", p.code(), p.label());
    }
    println!("\nindicators:");
    for k in IndicatorKind::ALL {
        println!("  {:<11} {}", k.name(), k.description());
    }
}
