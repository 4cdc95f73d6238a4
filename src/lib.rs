//! Occurrence sequences for RFC 5545 recurrence rules and cron
//! expressions.
//!
//! Both families parse once into an immutable value and then hand out lazy,
//! independent iterators of [`jiff::civil::DateTime`]s. Nothing here sleeps or
//! fires timers; it only computes when something would happen.
//!
//! # Examples
//!
//! ```
//! use jiff::civil::date;
//! use recur::RecurrenceRule;
//!
//! let rule: RecurrenceRule = "FREQ=MONTHLY;COUNT=3;BYDAY=1FR".parse().unwrap();
//! let start = date(1997, 9, 5).at(9, 0, 0, 0);
//! let fridays: Vec<_> = rule.occurrences(start).collect();
//! assert_eq!(fridays[1], date(1997, 10, 3).at(9, 0, 0, 0));
//! assert_eq!(rule.to_string(), "FREQ=MONTHLY;COUNT=3;BYDAY=1FR");
//! ```
//!
//! ```
//! use jiff::civil::date;
//! use recur::CronExpression;
//!
//! let cron: CronExpression = "*/15 9-17 * * MON-FRI".parse().unwrap();
//! let next = cron.next_from(date(2024, 1, 6).at(12, 0, 0, 0));
//! assert_eq!(next, Some(date(2024, 1, 8).at(9, 0, 0, 0)));
//! ```

pub mod ast;
pub mod builder;
pub mod cron;
pub mod cron_eval;
pub mod display;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use ast::{
    ByDaySelector, DayFilters, Frequency, Month, MonthlyFilters, RecurrenceRule, RuleKind,
    Termination, TimeFilters, Weekday, WeeklyFilters, YearlyFilters,
};
pub use builder::RuleBuilder;
pub use cron::{CronExpression, CronField, CronValue};
pub use cron_eval::{CronOccurrences, SearchLimits};
pub use error::{ScheduleError, Span};
pub use eval::{BoundedOccurrences, Occurrences};

use jiff::civil::DateTime;
#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

// --- RecurrenceRule convenience methods ---

impl RecurrenceRule {
    /// Parse RRULE text such as `FREQ=WEEKLY;BYDAY=MO,WE`.
    pub fn parse(input: &str) -> Result<Self, ScheduleError> {
        parser::parse(input)
    }

    /// Like [`parse`](Self::parse), discarding the error.
    pub fn try_parse(input: &str) -> Option<Self> {
        parser::parse(input).ok()
    }

    /// Canonical RRULE text; equal to `to_string()`.
    pub fn text(&self) -> String {
        self.to_string()
    }

    /// Occurrences at or after `start`, honoring `COUNT` and `UNTIL`.
    pub fn occurrences(&self, start: DateTime) -> Occurrences<'_> {
        Occurrences::new(self, start)
    }

    /// Occurrences of the rule anchored at `from`, up to and including `to`.
    pub fn between(&self, from: DateTime, to: DateTime) -> BoundedOccurrences<'_> {
        BoundedOccurrences::new(self, from, to)
    }

    /// The first `n` occurrences at or after `start`.
    pub fn next_n(&self, start: DateTime, n: usize) -> Vec<DateTime> {
        self.occurrences(start).take(n).collect()
    }
}

impl FromStr for RecurrenceRule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// --- CronExpression convenience methods ---

impl CronExpression {
    /// Parse 5, 6 or 7 cron fields, or an alias like `@daily`.
    pub fn parse(input: &str) -> Result<Self, ScheduleError> {
        cron::parse(input)
    }

    pub fn try_parse(input: &str) -> Option<Self> {
        cron::parse(input).ok()
    }

    /// Canonical cron text; equal to `to_string()`.
    pub fn text(&self) -> String {
        self.to_string()
    }

    /// Matches at or after `start`, with default [`SearchLimits`].
    pub fn occurrences(&self, start: DateTime) -> CronOccurrences<'_> {
        CronOccurrences::new(self, start, SearchLimits::default())
    }

    pub fn occurrences_with_limits(
        &self,
        start: DateTime,
        limits: SearchLimits,
    ) -> CronOccurrences<'_> {
        CronOccurrences::new(self, start, limits)
    }

    /// The first match at or after `start`, if one exists before the year
    /// ceiling.
    pub fn next_from(&self, start: DateTime) -> Option<DateTime> {
        cron_eval::next_occurrence(self, start, SearchLimits::default())
    }

    /// True if `datetime` satisfies every field.
    pub fn matches(&self, datetime: DateTime) -> bool {
        cron_eval::matches(self, datetime)
    }
}

impl FromStr for CronExpression {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// --- serde ---

#[cfg(feature = "serde")]
impl Serialize for RecurrenceRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;

        map.serialize_entry("frequency", &self.frequency())?;
        map.serialize_entry("interval", &self.interval)?;
        let termination = match self.termination {
            Some(Termination::Count(n)) => serde_json::json!({ "count": n }),
            Some(Termination::Until(dt)) => serde_json::json!({ "until": dt.to_string() }),
            None => serde_json::Value::Null,
        };
        map.serialize_entry("termination", &termination)?;
        map.serialize_entry("week_start", &self.week_start)?;

        let kind = &self.kind;
        map.serialize_entry("by_month", kind.months())?;
        map.serialize_entry("by_year_day", kind.year_days())?;
        map.serialize_entry("by_month_day", kind.month_days())?;
        map.serialize_entry("by_day", &kind.week_days())?;
        map.serialize_entry("by_hour", &kind.time().hours)?;
        map.serialize_entry("by_minute", &kind.time().minutes)?;
        map.serialize_entry("by_second", &kind.time().seconds)?;
        map.serialize_entry("by_set_pos", &self.by_set_positions)?;
        map.serialize_entry("text", &self.to_string())?;

        map.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for RecurrenceRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RecurrenceRule::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "serde")]
impl Serialize for CronExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;

        map.serialize_entry("seconds", &self.seconds)?;
        map.serialize_entry("minutes", &self.minutes)?;
        map.serialize_entry("hours", &self.hours)?;
        map.serialize_entry("days_of_month", &self.days_of_month)?;
        map.serialize_entry("months", &self.months)?;
        map.serialize_entry("days_of_week", &self.days_of_week)?;
        map.serialize_entry("years", &self.years)?;
        map.serialize_entry("has_seconds", &self.has_seconds)?;
        map.serialize_entry("has_year", &self.has_year)?;
        map.serialize_entry("text", &self.to_string())?;

        map.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for CronExpression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CronExpression::parse(&s).map_err(serde::de::Error::custom)
    }
}
