//! SwingScan CLI: backtest, screen, and config-driven runs.
//!
//! Commands:
//! - `backtest`: scan one ticker's history and report forward-gain hits
//! - `screen`: check whether the rule holds on the latest bar of a watch list
//! - `run`: backtest every ticker in a TOML config file

mod logging;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use swingscan_core::components::rule::RulePreset;
use swingscan_core::data::pacing::FREE_TIER_INTERVAL;
use swingscan_core::engine::TailPolicy;
use swingscan_runner::config::{ProviderKind, RuleSection};
use swingscan_runner::export::{save_artifacts, save_screen_artifacts};
use swingscan_runner::{execute_backtest, execute_screen, BacktestRun, RunConfig, ScreenRun};

#[derive(Parser)]
#[command(
    name = "swingscan",
    about = "SwingScan: EMA/MACD/RSI entry scan with forward-gain backtests",
    version
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    /// Also append logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Where bars come from. Flags left unset keep the config's values.
#[derive(Args, Clone, Default)]
struct SourceArgs {
    /// Read `{TICKER}.csv` files from this directory instead of Polygon.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Use deterministic synthetic bars (developer mode).
    #[arg(long, default_value_t = false, conflicts_with = "csv_dir")]
    synthetic: bool,

    /// Environment variable holding the Polygon API key [default: POLYGON_API_KEY].
    #[arg(long)]
    api_key_env: Option<String>,

    /// Minimum seconds between provider requests.
    #[arg(long)]
    min_request_interval: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest the entry rule on one ticker.
    Backtest {
        #[arg(long)]
        ticker: String,

        /// Start date (YYYY-MM-DD). Defaults to 2023-01-01.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Rule preset: swing (EMA 8/21/50) or trend (EMA 20/50/200).
        #[arg(long, default_value = "swing")]
        preset: String,

        /// Target gain as a fraction (0.03 = 3%).
        #[arg(long, default_value_t = 0.03)]
        target_gain: f64,

        #[arg(long, default_value_t = 14)]
        max_hold_days: u32,

        /// Tail handling: full (only full hold windows) or truncate.
        #[arg(long, default_value = "full")]
        tail: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Check the rule on the latest bar of each ticker.
    Screen {
        /// TOML config with the watch list.
        #[arg(long, conflicts_with = "tickers")]
        config: Option<PathBuf>,

        /// Tickers to screen.
        #[arg(long, num_args = 1.., value_delimiter = ',')]
        tickers: Vec<String>,

        /// Rule preset (overrides the config) [default: trend].
        #[arg(long)]
        preset: Option<String>,

        #[command(flatten)]
        source: SourceArgs,

        /// Write screen.json and screen.md here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Backtest every ticker in a TOML config.
    Run {
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        /// Output directory for artifacts (overrides the config).
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_json, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Backtest {
            ticker,
            start,
            end,
            preset,
            target_gain,
            max_hold_days,
            tail,
            source,
            output_dir,
        } => {
            let mut config = RunConfig::for_tickers(vec![ticker.trim().to_uppercase()]);
            if let Some(start) = parse_date(start.as_deref())? {
                config.start = start;
            }
            config.end = parse_date(end.as_deref())?;
            config.rule = RuleSection::from_preset(preset.parse::<RulePreset>()?);
            config.backtest.target_gain = target_gain;
            config.backtest.max_hold_days = max_hold_days;
            config.backtest.tail_policy = tail.parse::<TailPolicy>()?;
            apply_source(&mut config, &source);
            config.validate()?;
            run_backtest_cmd(&config, &output_dir)
        }
        Commands::Screen {
            config,
            tickers,
            preset,
            source,
            output_dir,
        } => {
            let config = screen_config(config.as_deref(), &tickers, preset.as_deref(), &source)?;
            run_screen_cmd(&config, output_dir)
        }
        Commands::Run {
            config,
            source,
            output_dir,
        } => {
            let config = run_config(&config, &source)?;
            let output_dir = output_dir
                .or_else(|| config.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("results"));
            run_backtest_cmd(&config, &output_dir)
        }
    }
}

/// Screen config from a file or a ticker list, with CLI flags layered on top.
fn screen_config(
    path: Option<&Path>,
    tickers: &[String],
    preset: Option<&str>,
    source: &SourceArgs,
) -> Result<RunConfig> {
    let mut config = match path {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            if tickers.is_empty() {
                bail!("one of --config or --tickers is required");
            }
            let tickers = tickers.iter().map(|t| t.trim().to_uppercase()).collect();
            let mut config = RunConfig::for_tickers(tickers);
            config.start = chrono::Local::now().date_naive() - chrono::Duration::days(350);
            config.rule = RuleSection::from_preset(RulePreset::Trend);
            // watch lists hit the free-tier limit quickly
            config.provider.min_request_interval_secs = FREE_TIER_INTERVAL.as_secs();
            config
        }
    };
    if let Some(preset) = preset {
        config.rule = RuleSection::from_preset(preset.parse::<RulePreset>()?);
    }
    apply_source(&mut config, source);
    if path.is_none() && config.provider.kind != ProviderKind::Polygon && source.min_request_interval.is_none() {
        config.provider.min_request_interval_secs = 0;
    }
    config.validate()?;
    Ok(config)
}

fn run_config(path: &Path, source: &SourceArgs) -> Result<RunConfig> {
    let mut config = RunConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    apply_source(&mut config, source);
    config.validate()?;
    Ok(config)
}

fn parse_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
    })
    .transpose()
}

/// Overlay the source flags the user actually passed onto `config.provider`.
fn apply_source(config: &mut RunConfig, source: &SourceArgs) {
    let provider = &mut config.provider;
    if let Some(var) = &source.api_key_env {
        provider.api_key_env = var.clone();
    }
    if source.synthetic {
        provider.kind = ProviderKind::Synthetic;
    } else if let Some(dir) = &source.csv_dir {
        provider.kind = ProviderKind::Csv;
        provider.csv_dir = Some(dir.clone());
    }
    if let Some(secs) = source.min_request_interval {
        provider.min_request_interval_secs = secs;
    }
}

fn run_backtest_cmd(config: &RunConfig, output_dir: &Path) -> Result<()> {
    tracing::debug!(?config, "resolved run config");
    let (run, loaded) = execute_backtest(config)?;
    print_backtest_summary(&run);

    let run_dir = save_artifacts(&run, &loaded.series(), output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_screen_cmd(config: &RunConfig, output_dir: Option<PathBuf>) -> Result<()> {
    tracing::debug!(?config, "resolved run config");
    let (run, loaded) = execute_screen(config)?;
    print_screen_summary(&run);

    if let Some(dir) = output_dir {
        let run_dir = save_screen_artifacts(&run, &loaded.series(), &dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn print_backtest_summary(run: &BacktestRun) {
    println!();
    println!(
        "=== Backtest: {} to {} (target +{:.1}% in {} days) ===",
        run.start_date,
        run.end_date,
        run.config.target_gain * 100.0,
        run.config.max_hold_days
    );
    if run.has_synthetic {
        println!("  ** SYNTHETIC DATA **");
    }
    println!();

    for r in &run.results {
        println!("{} ({} bars)", r.ticker, r.report.bar_count);
        println!("  {:<12} {:>12} {:>6} {:>12}", "Entry Date", "Entry Price", "Hit", "Days to Hit");
        for o in &r.report.outcomes {
            let days = o.hit_day().map(|d| d.to_string()).unwrap_or_else(|| "-".into());
            println!(
                "  {:<12} {:>12.2} {:>6} {:>12}",
                o.signal.entry_date.to_string(),
                o.signal.entry_price,
                if o.hit { "yes" } else { "no" },
                days
            );
        }
        let s = &r.report.summary;
        println!(
            "  Signals: {}  Hits: {}  Success rate: {:.1}%",
            s.total_signals,
            s.hits,
            s.success_rate * 100.0
        );
        println!();
    }

    for f in &run.failures {
        eprintln!("Skipped {}: {}", f.ticker, f.reason);
    }
}

fn print_screen_summary(run: &ScreenRun) {
    println!();
    println!(
        "{:<8} {:<12} {:>10} {:>10} {:>10} {:>10} {:>8}  Qualified",
        "Ticker", "Date", "Close", "EMA Fast", "EMA Mid", "EMA Slow", "RSI"
    );
    for s in &run.snapshots {
        let x = &s.inputs;
        println!(
            "{:<8} {:<12} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>8.1}  {}",
            s.ticker,
            s.date.to_string(),
            x.close,
            x.ema_fast,
            x.ema_mid,
            x.ema_slow,
            x.rsi,
            if s.qualified { "yes" } else { "" }
        );
    }
    println!();

    let qualified = run.qualified();
    if qualified.is_empty() {
        println!("No tickers met the entry rule.");
    } else {
        println!("Tickers meeting the entry rule: {}", qualified.join(", "));
    }
    for f in &run.failures {
        eprintln!("Skipped {}: {}", f.ticker, f.reason);
    }
}
