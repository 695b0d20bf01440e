//! Timing-offset conversion to milliseconds.
//!
//! The unit set is closed: {ms, s, min, h, d, wk}. Calendar-aware units
//! (month, year) are not supported since their length is ambiguous without a
//! reference date. Unknown units fail fast as a configuration error rather
//! than silently defaulting.

use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while converting a timing offset.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum DurationError {
    #[error("unknown duration unit: {unit:?}")]
    #[diagnostic(
        code(reportflow::duration::unknown_unit),
        help("Supported units are ms, s, min, h, d, wk.")
    )]
    UnknownUnit { unit: String },

    #[error("duration overflow: {value} {unit} exceeds the millisecond range")]
    #[diagnostic(code(reportflow::duration::overflow))]
    Overflow { value: u64, unit: String },
}

/// A unit of the closed timing-offset set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimingUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl TimingUnit {
    /// Multiplier from one unit to milliseconds. Exact integer arithmetic,
    /// chained 1000 * 60 * 60 * 24 * 7.
    #[must_use]
    pub fn factor_ms(self) -> u64 {
        match self {
            TimingUnit::Milliseconds => 1,
            TimingUnit::Seconds => 1_000,
            TimingUnit::Minutes => 60 * 1_000,
            TimingUnit::Hours => 60 * 60 * 1_000,
            TimingUnit::Days => 24 * 60 * 60 * 1_000,
            TimingUnit::Weeks => 7 * 24 * 60 * 60 * 1_000,
        }
    }

    /// The wire symbol for this unit.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            TimingUnit::Milliseconds => "ms",
            TimingUnit::Seconds => "s",
            TimingUnit::Minutes => "min",
            TimingUnit::Hours => "h",
            TimingUnit::Days => "d",
            TimingUnit::Weeks => "wk",
        }
    }
}

impl FromStr for TimingUnit {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ms" => Ok(TimingUnit::Milliseconds),
            "s" => Ok(TimingUnit::Seconds),
            "min" => Ok(TimingUnit::Minutes),
            "h" => Ok(TimingUnit::Hours),
            "d" => Ok(TimingUnit::Days),
            "wk" => Ok(TimingUnit::Weeks),
            other => Err(DurationError::UnknownUnit {
                unit: other.to_string(),
            }),
        }
    }
}

/// Convert a `(value, unit symbol)` pair into milliseconds.
pub fn to_millis(value: u64, unit: &str) -> Result<u64, DurationError> {
    let parsed: TimingUnit = unit.parse()?;
    value
        .checked_mul(parsed.factor_ms())
        .ok_or_else(|| DurationError::Overflow {
            value,
            unit: unit.to_string(),
        })
}
