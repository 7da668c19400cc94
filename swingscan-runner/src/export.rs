//! Reporting and export: JSON, CSV, and Markdown artifacts.
//!
//! - **JSON**: full run serialization with schema versioning
//! - **CSV**: per-ticker signal tape, and a chart table (close, EMA stack,
//!   MACD, signal markers) for an external chart renderer
//! - **Markdown**: human-readable run summary and screen table
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use swingscan_core::components::rule::EntryRule;
use swingscan_core::domain::Series;
use swingscan_core::engine::{compute_indicators, ScanReport, ScreenMatch};

use crate::runner::{BacktestRun, ScreenRun, SCHEMA_VERSION};

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(run: &BacktestRun) -> Result<String> {
    serde_json::to_string_pretty(run).context("failed to serialize BacktestRun to JSON")
}

/// Deserialize a `BacktestRun`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestRun> {
    let run: BacktestRun =
        serde_json::from_str(json).context("failed to deserialize BacktestRun from JSON")?;
    if run.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            run.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(run)
}

pub fn export_screen_json(run: &ScreenRun) -> Result<String> {
    serde_json::to_string_pretty(run).context("failed to serialize ScreenRun to JSON")
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Signal tape: one row per signal.
///
/// Columns: date, entry_price, hit, days_to_hit. `days_to_hit` is blank when
/// the target was not reached.
pub fn export_signals_csv(report: &ScanReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "entry_price", "hit", "days_to_hit"])?;
    for o in &report.outcomes {
        wtr.write_record([
            &o.signal.entry_date.to_string(),
            &format!("{:.4}", o.signal.entry_price),
            &o.hit.to_string(),
            &o.hit_day().map(|d| d.to_string()).unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Chart table for a backtest: entry bars carry a 1 in the `signal` column.
///
/// Columns: date, close, ema_fast, ema_mid, ema_slow, macd, macd_signal,
/// signal. Indicator cells are blank during warm-up.
pub fn export_chart_csv(series: &Series, rule: &EntryRule, report: &ScanReport) -> Result<String> {
    let entries: Vec<usize> = report.outcomes.iter().map(|o| o.signal.entry_index).collect();
    chart_csv(series, rule, &entries)
}

/// Chart table for a screened ticker. The latest bar is marked when it qualifies.
pub fn export_screen_chart_csv(series: &Series, rule: &EntryRule, snapshot: &ScreenMatch) -> Result<String> {
    let entries: Vec<usize> = match series.len().checked_sub(1) {
        Some(last) if snapshot.qualified => vec![last],
        _ => Vec::new(),
    };
    chart_csv(series, rule, &entries)
}

fn chart_csv(series: &Series, rule: &EntryRule, entries: &[usize]) -> Result<String> {
    // EMA stack, MACD line, MACD signal
    let specs = rule.required_indicators();
    let indicators = compute_indicators(series.bars(), &specs[..5]);
    let columns: Vec<&[f64]> = specs[..5]
        .iter()
        .map(|spec| indicators.get_series(&spec.name()).unwrap_or(&[]))
        .collect();

    let mut marked = vec![false; series.len()];
    for &i in entries {
        if let Some(m) = marked.get_mut(i) {
            *m = true;
        }
    }

    let cell = |values: &[f64], i: usize| match values.get(i) {
        Some(v) if v.is_finite() => format!("{v:.4}"),
        _ => String::new(),
    };

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "close",
        "ema_fast",
        "ema_mid",
        "ema_slow",
        "macd",
        "macd_signal",
        "signal",
    ])?;
    for (i, bar) in series.bars().iter().enumerate() {
        let mut record = vec![bar.date.to_string(), format!("{:.4}", bar.close)];
        record.extend(columns.iter().map(|values| cell(values, i)));
        record.push(u8::from(marked[i]).to_string());
        wtr.write_record(&record)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Markdown ───────────────────────────────────────────────────────

pub fn generate_report(run: &BacktestRun) -> String {
    let mut md = String::with_capacity(2048);
    let rule = &run.config.rule;

    md.push_str("# Backtest Report\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Period | {} to {} |\n", run.start_date, run.end_date));
    md.push_str(&format!(
        "| Rule | close > EMA{} > EMA{} > EMA{}, MACD({},{},{}) > signal, {} < RSI{} < {} |\n",
        rule.fast,
        rule.mid,
        rule.slow,
        rule.macd_fast,
        rule.macd_slow,
        rule.macd_signal,
        rule.rsi_low,
        rule.rsi_period,
        rule.rsi_high
    ));
    md.push_str(&format!(
        "| Target | +{:.1}% within {} days ({}) |\n",
        run.config.target_gain * 100.0,
        run.config.max_hold_days,
        run.config.tail_policy
    ));
    md.push_str(&format!("| Run ID | {} |\n", run.run_id));
    if run.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Results\n\n");
    md.push_str("| Ticker | Bars | Signals | Hits | Success Rate |\n");
    md.push_str("| --- | ---: | ---: | ---: | ---: |\n");
    for r in &run.results {
        let s = &r.report.summary;
        md.push_str(&format!(
            "| {} | {} | {} | {} | {:.1}% |\n",
            s.ticker,
            r.report.bar_count,
            s.total_signals,
            s.hits,
            s.success_rate * 100.0
        ));
    }
    md.push('\n');

    if !run.failures.is_empty() {
        md.push_str("## Failed Tickers\n\n");
        for f in &run.failures {
            md.push_str(&format!("- {}: {}\n", f.ticker, f.reason));
        }
        md.push('\n');
    }

    md
}

pub fn generate_screen_report(run: &ScreenRun) -> String {
    let mut md = String::with_capacity(1024);
    md.push_str("# Screen\n\n");
    md.push_str("| Ticker | Date | Close | EMA Fast | EMA Mid | EMA Slow | MACD | Signal | RSI | Qualified |\n");
    md.push_str("| --- | --- | ---: | ---: | ---: | ---: | ---: | ---: | ---: | :---: |\n");
    for s in &run.snapshots {
        let x = &s.inputs;
        md.push_str(&format!(
            "| {} | {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.3} | {:.3} | {:.1} | {} |\n",
            s.ticker,
            s.date,
            x.close,
            x.ema_fast,
            x.ema_mid,
            x.ema_slow,
            x.macd,
            x.macd_signal,
            x.rsi,
            if s.qualified { "yes" } else { "" }
        ));
    }
    md.push('\n');

    let qualified = run.qualified();
    if qualified.is_empty() {
        md.push_str("No tickers qualified.\n");
    } else {
        md.push_str(&format!("Qualified: {}\n", qualified.join(", ")));
    }
    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for a backtest run.
///
/// Creates `run_{timestamp}_{run id prefix}/` under `output_dir` containing:
/// - `manifest.json`: the full `BacktestRun`
/// - `report.md`: Markdown summary
/// - `{TICKER}_signals.csv` and `{TICKER}_chart.csv` per ticker
///
/// `series` supplies bars for the chart tables; tickers without bars get no
/// chart file.
pub fn save_artifacts(run: &BacktestRun, series: &[Series], output_dir: &Path) -> Result<PathBuf> {
    let id: String = run.run_id.chars().take(8).collect();
    let stem = format!("run_{}_{id}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = create_run_dir(output_dir, &stem)?;

    write(&run_dir.join("manifest.json"), &export_json(run)?)?;
    write(&run_dir.join("report.md"), &generate_report(run))?;

    for result in &run.results {
        let signals = export_signals_csv(&result.report)?;
        write(&run_dir.join(format!("{}_signals.csv", result.ticker)), &signals)?;

        if let Some(s) = series.iter().find(|s| s.ticker == result.ticker) {
            let chart = export_chart_csv(s, &run.config.rule, &result.report)?;
            write(&run_dir.join(format!("{}_chart.csv", result.ticker)), &chart)?;
        }
    }

    Ok(run_dir)
}

/// Save a screen under `output_dir`: `screen.json`, `screen.md`, and a
/// `{TICKER}_chart.csv` for every qualified ticker found in `series`.
pub fn save_screen_artifacts(run: &ScreenRun, series: &[Series], output_dir: &Path) -> Result<PathBuf> {
    let stem = format!("screen_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = create_run_dir(output_dir, &stem)?;
    write(&run_dir.join("screen.json"), &export_screen_json(run)?)?;
    write(&run_dir.join("screen.md"), &generate_screen_report(run))?;

    for snapshot in run.snapshots.iter().filter(|s| s.qualified) {
        if let Some(s) = series.iter().find(|s| s.ticker == snapshot.ticker) {
            let chart = export_screen_chart_csv(s, &run.rule, snapshot)?;
            write(&run_dir.join(format!("{}_chart.csv", snapshot.ticker)), &chart)?;
        }
    }
    Ok(run_dir)
}

/// Create a fresh directory `{stem}` under `output_dir`, appending `_2`, `_3`, ...
/// when an earlier run already took the name.
fn create_run_dir(output_dir: &Path, stem: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    let mut n = 1u32;
    loop {
        let name = if n == 1 { stem.to_string() } else { format!("{stem}_{n}") };
        let dir = output_dir.join(name);
        match std::fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => {
                return Err(e).with_context(|| format!("failed to create artifact dir: {}", dir.display()))
            }
        }
    }
}

/// Load a `BacktestRun` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestRun> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
