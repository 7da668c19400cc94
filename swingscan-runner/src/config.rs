//! TOML run configuration: tickers, date range, rule, backtest and provider.
//!
//! ```toml
//! tickers = ["AAPL", "MSFT"]
//! start = "2023-01-01"
//!
//! [rule]
//! preset = "trend"
//! rsi_high = 75.0
//!
//! [backtest]
//! target_gain = 0.03
//! max_hold_days = 14
//! tail_policy = "full_window"
//!
//! [provider]
//! kind = "polygon"
//! min_request_interval_secs = 12
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use swingscan_core::components::rule::{EntryRule, RuleError, RulePreset};
use swingscan_core::engine::{BacktestConfig, TailPolicy};
use thiserror::Error;

pub const DEFAULT_API_KEY_ENV: &str = "POLYGON_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Backtest(#[from] swingscan_core::engine::ConfigError),

    #[error("no tickers configured")]
    NoTickers,

    #[error("end date {end} is before start date {start}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("provider kind 'csv' needs csv_dir")]
    MissingCsvDir,
}

fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

/// Full run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub tickers: Vec<String>,
    #[serde(default = "default_start")]
    pub start: NaiveDate,
    /// Inclusive; today when absent.
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub rule: RuleSection,
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub provider: ProviderSection,
}

/// Preset plus optional per-field overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSection {
    #[serde(default)]
    pub preset: RulePreset,
    pub fast: Option<usize>,
    pub mid: Option<usize>,
    pub slow: Option<usize>,
    pub rsi_period: Option<usize>,
    pub rsi_low: Option<f64>,
    pub rsi_high: Option<f64>,
    pub macd_fast: Option<usize>,
    pub macd_slow: Option<usize>,
    pub macd_signal: Option<usize>,
}

impl RuleSection {
    pub fn from_preset(preset: RulePreset) -> Self {
        Self {
            preset,
            ..Self::default()
        }
    }

    /// Resolve the preset and apply overrides.
    pub fn build(&self) -> Result<EntryRule, RuleError> {
        let mut rule = self.preset.rule();
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field { rule.$field = v; })*
            };
        }
        apply!(fast, mid, slow, rsi_period, rsi_low, rsi_high, macd_fast, macd_slow, macd_signal);
        rule.validate()?;
        Ok(rule)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    #[serde(default = "BacktestSection::default_target_gain")]
    pub target_gain: f64,
    #[serde(default = "BacktestSection::default_max_hold_days")]
    pub max_hold_days: u32,
    #[serde(default)]
    pub tail_policy: TailPolicy,
}

impl BacktestSection {
    fn default_target_gain() -> f64 {
        0.03
    }

    fn default_max_hold_days() -> u32 {
        14
    }
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            target_gain: Self::default_target_gain(),
            max_hold_days: Self::default_max_hold_days(),
            tail_policy: TailPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Polygon,
    Csv,
    /// Deterministic random walks; developer mode only.
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSection {
    #[serde(default)]
    pub kind: ProviderKind,
    /// Environment variable holding the Polygon API key.
    #[serde(default = "ProviderSection::default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub csv_dir: Option<PathBuf>,
    /// Minimum spacing between provider requests; 0 disables pacing.
    #[serde(default)]
    pub min_request_interval_secs: u64,
}

impl ProviderSection {
    fn default_api_key_env() -> String {
        DEFAULT_API_KEY_ENV.to_string()
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_secs(self.min_request_interval_secs)
    }
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_key_env: Self::default_api_key_env(),
            csv_dir: None,
            min_request_interval_secs: 0,
        }
    }
}

impl RunConfig {
    /// Config for an ad-hoc ticker list with every section at its default.
    pub fn for_tickers(tickers: Vec<String>) -> Self {
        Self {
            tickers,
            start: default_start(),
            end: None,
            rule: RuleSection::default(),
            backtest: BacktestSection::default(),
            provider: ProviderSection::default(),
            output_dir: None,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: RunConfig = toml::from_str(content)?;
        let mut seen = std::collections::HashSet::new();
        config.tickers = config
            .tickers
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| seen.insert(t.clone()))
            .collect();
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tickers.is_empty() {
            return Err(ConfigError::NoTickers);
        }
        if let Some(end) = self.end {
            if end < self.start {
                return Err(ConfigError::InvertedRange {
                    start: self.start,
                    end,
                });
            }
        }
        if self.provider.kind == ProviderKind::Csv && self.provider.csv_dir.is_none() {
            return Err(ConfigError::MissingCsvDir);
        }
        self.backtest_config()?;
        Ok(())
    }

    pub fn end_or_today(&self) -> NaiveDate {
        self.end.unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn entry_rule(&self) -> Result<EntryRule, RuleError> {
        self.rule.build()
    }

    pub fn backtest_config(&self) -> Result<BacktestConfig, ConfigError> {
        let config = BacktestConfig {
            rule: self.entry_rule()?,
            target_gain: self.backtest.target_gain,
            max_hold_days: self.backtest.max_hold_days,
            tail_policy: self.backtest.tail_policy,
        };
        config.validate()?;
        Ok(config)
    }

    /// Deterministic content hash of the configuration.
    pub fn run_id(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
