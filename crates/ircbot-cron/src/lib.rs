//! ircbot-cron: Calendar-interval job scheduling.
//!
//! A job fires on every scheduler tick whose local wall-clock time matches
//! all six fields of its [`IntervalSpec`]. There is no last-run bookkeeping,
//! so a job can fire more than once within a matching second.

pub mod scheduler;

use std::fmt;
use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDateTime, Timelike};
use thiserror::Error;

use ircbot_types::Session;

pub use scheduler::CronScheduler;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronError {
    #[error("Cron job \"{0}\" has already been registered")]
    DuplicateJob(String),
    #[error("Invalid {field} value {value:?}: {reason}")]
    InvalidField {
        field: TimeField,
        value: String,
        reason: String,
    },
    #[error("Unknown interval field {0:?}")]
    UnknownField(String),
}

/// Work performed when a job's interval matches.
pub trait CronTask: Send + Sync {
    fn run(&self, session: &mut Session) -> anyhow::Result<()>;
}

impl<F> CronTask for F
where
    F: Fn(&mut Session) -> anyhow::Result<()> + Send + Sync,
{
    fn run(&self, session: &mut Session) -> anyhow::Result<()> {
        self(session)
    }
}

// ──────────────────── Interval Fields ────────────────────

/// One calendar component of an interval, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl TimeField {
    pub const ALL: [TimeField; 6] = [
        TimeField::Year,
        TimeField::Month,
        TimeField::Day,
        TimeField::Hour,
        TimeField::Minute,
        TimeField::Second,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Four-digit year, 1-based month and day, 24-hour clock.
    pub fn value_of(self, now: &NaiveDateTime) -> i64 {
        match self {
            TimeField::Year => i64::from(now.year()),
            TimeField::Month => i64::from(now.month()),
            TimeField::Day => i64::from(now.day()),
            TimeField::Hour => i64::from(now.hour()),
            TimeField::Minute => i64::from(now.minute()),
            TimeField::Second => i64::from(now.second()),
        }
    }

    fn valid_range(self) -> RangeInclusive<i64> {
        match self {
            TimeField::Year => 0..=9999,
            TimeField::Month => 1..=12,
            TimeField::Day => 1..=31,
            TimeField::Hour => 0..=23,
            TimeField::Minute | TimeField::Second => 0..=59,
        }
    }
}

impl fmt::Display for TimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeField::Year => "year",
            TimeField::Month => "month",
            TimeField::Day => "day",
            TimeField::Hour => "hour",
            TimeField::Minute => "minute",
            TimeField::Second => "second",
        };
        f.write_str(name)
    }
}

/// Matcher for a single field: wildcard or an explicit set of values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldMatch {
    #[default]
    Any,
    Values(Vec<i64>),
}

impl FieldMatch {
    /// Parse `*` or a comma-separated list of integers such as `"00,30"`.
    pub fn parse(field: TimeField, raw: &str) -> Result<Self, CronError> {
        let raw = raw.trim();
        if raw == "*" {
            return Ok(FieldMatch::Any);
        }

        let invalid = |reason: &str| CronError::InvalidField {
            field,
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut values = Vec::new();
        for part in raw.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid("empty entry"));
            }
            let value: i64 = part.parse().map_err(|_| invalid("not an integer"))?;
            if !field.valid_range().contains(&value) {
                return Err(invalid("out of range"));
            }
            if !values.contains(&value) {
                values.push(value);
            }
        }
        Ok(FieldMatch::Values(values))
    }

    pub fn matches(&self, value: i64) -> bool {
        match self {
            FieldMatch::Any => true,
            FieldMatch::Values(values) => values.contains(&value),
        }
    }
}

/// Six-field calendar interval. Unset fields are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSpec {
    fields: [FieldMatch; 6],
}

impl IntervalSpec {
    /// Interval matching every second.
    pub fn every_second() -> Self {
        Self::default()
    }

    /// Set `field` from its textual form (`*` or `"0,30"`).
    pub fn with(mut self, field: TimeField, raw: &str) -> Result<Self, CronError> {
        self.fields[field.index()] = FieldMatch::parse(field, raw)?;
        Ok(self)
    }

    /// Build from `(field name, value)` pairs such as `[("second", "00,30")]`.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, CronError> {
        let mut spec = Self::default();
        for (name, raw) in pairs {
            let field = TimeField::ALL
                .into_iter()
                .find(|f| f.to_string().eq_ignore_ascii_case(name.trim()))
                .ok_or_else(|| CronError::UnknownField(name.to_string()))?;
            spec = spec.with(field, raw)?;
        }
        Ok(spec)
    }

    pub fn field(&self, field: TimeField) -> &FieldMatch {
        &self.fields[field.index()]
    }

    /// Whether every field matches `now`, checked year through second and
    /// stopping at the first mismatch.
    pub fn matches_at(&self, now: &NaiveDateTime) -> bool {
        TimeField::ALL
            .into_iter()
            .all(|field| self.fields[field.index()].matches(field.value_of(now)))
    }
}
