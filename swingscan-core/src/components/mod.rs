//! Pluggable pieces of the pipeline: indicators and the entry rule.

pub mod indicator;
pub mod rule;

pub use indicator::{Indicator, IndicatorSet};
pub use rule::{EntryRule, RuleError};
