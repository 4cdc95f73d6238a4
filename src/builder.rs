//! Programmatic construction of [`RecurrenceRule`]s.
//!
//! The text parser and the builder share the same range checks; the parser
//! reports failures as format errors with a span, the builder as argument
//! errors.

use jiff::civil::DateTime;

use crate::ast::*;
use crate::error::ScheduleError;

/// Allowed numeric range for one rule part.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RangeCheck {
    pub name: &'static str,
    pub min: i32,
    pub max: i32,
    pub allow_zero: bool,
}

impl RangeCheck {
    pub fn check(&self, value: i32) -> Result<(), String> {
        if value < self.min || value > self.max || (value == 0 && !self.allow_zero) {
            let expected = if self.allow_zero || self.min > 0 {
                format!("{}..{}", self.min, self.max)
            } else {
                format!("±1..{}", self.max)
            };
            return Err(format!(
                "{} value out of range: {value} (expected {expected})",
                self.name
            ));
        }
        Ok(())
    }
}

pub(crate) const BY_MONTH: RangeCheck = RangeCheck {
    name: "BYMONTH",
    min: 1,
    max: 12,
    allow_zero: false,
};
pub(crate) const BY_YEAR_DAY: RangeCheck = RangeCheck {
    name: "BYYEARDAY",
    min: -366,
    max: 366,
    allow_zero: false,
};
pub(crate) const BY_MONTH_DAY: RangeCheck = RangeCheck {
    name: "BYMONTHDAY",
    min: -31,
    max: 31,
    allow_zero: false,
};
pub(crate) const BY_HOUR: RangeCheck = RangeCheck {
    name: "BYHOUR",
    min: 0,
    max: 23,
    allow_zero: true,
};
pub(crate) const BY_MINUTE: RangeCheck = RangeCheck {
    name: "BYMINUTE",
    min: 0,
    max: 59,
    allow_zero: true,
};
// 60 is a leap second.
pub(crate) const BY_SECOND: RangeCheck = RangeCheck {
    name: "BYSECOND",
    min: 0,
    max: 60,
    allow_zero: true,
};
pub(crate) const BY_SET_POS: RangeCheck = RangeCheck {
    name: "BYSETPOS",
    min: -366,
    max: 366,
    allow_zero: false,
};
pub(crate) const BY_DAY_ORDINAL: RangeCheck = RangeCheck {
    name: "BYDAY ordinal",
    min: -53,
    max: 53,
    allow_zero: false,
};

fn check_all<T: Copy + Into<i32>>(check: RangeCheck, values: &[T]) -> Result<(), String> {
    values.iter().try_for_each(|&v| check.check(v.into()))
}

/// Chained builder for a [`RecurrenceRule`].
///
/// ```
/// use recur::{ByDaySelector, Frequency, RecurrenceRule, Weekday};
///
/// let rule = RecurrenceRule::builder(Frequency::Monthly)
///     .count(10)
///     .by_week_days([ByDaySelector::nth(Weekday::Friday, 1)])
///     .build()
///     .unwrap();
/// assert_eq!(rule.to_string(), "FREQ=MONTHLY;COUNT=10;BYDAY=1FR");
/// ```
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    frequency: Frequency,
    interval: u32,
    count: Option<u32>,
    until: Option<DateTime>,
    week_start: Weekday,
    months: Vec<Month>,
    year_days: Vec<i16>,
    month_days: Vec<i8>,
    week_days: Vec<ByDaySelector>,
    time: TimeFilters,
    set_positions: Vec<i16>,
}

impl RecurrenceRule {
    /// Start building a rule of the given frequency.
    pub fn builder(frequency: Frequency) -> RuleBuilder {
        RuleBuilder::new(frequency)
    }
}

impl RuleBuilder {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            count: None,
            until: None,
            week_start: Weekday::Monday,
            months: Vec::new(),
            year_days: Vec::new(),
            month_days: Vec::new(),
            week_days: Vec::new(),
            time: TimeFilters::default(),
            set_positions: Vec::new(),
        }
    }

    pub fn interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Inclusive end. `UNTIL` has whole-second precision, so any sub-second
    /// part is truncated.
    pub fn until(mut self, until: DateTime) -> Self {
        self.until = Some(until.with().subsec_nanosecond(0).build().unwrap_or(until));
        self
    }

    pub fn week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn by_months(mut self, months: impl IntoIterator<Item = Month>) -> Self {
        self.months = months.into_iter().collect();
        self
    }

    pub fn by_year_days(mut self, days: impl IntoIterator<Item = i16>) -> Self {
        self.year_days = days.into_iter().collect();
        self
    }

    pub fn by_month_days(mut self, days: impl IntoIterator<Item = i8>) -> Self {
        self.month_days = days.into_iter().collect();
        self
    }

    pub fn by_week_days(mut self, days: impl IntoIterator<Item = ByDaySelector>) -> Self {
        self.week_days = days.into_iter().collect();
        self
    }

    pub fn by_hours(mut self, hours: impl IntoIterator<Item = u8>) -> Self {
        self.time.hours = hours.into_iter().collect();
        self
    }

    pub fn by_minutes(mut self, minutes: impl IntoIterator<Item = u8>) -> Self {
        self.time.minutes = minutes.into_iter().collect();
        self
    }

    pub fn by_seconds(mut self, seconds: impl IntoIterator<Item = u8>) -> Self {
        self.time.seconds = seconds.into_iter().collect();
        self
    }

    pub fn by_set_positions(mut self, positions: impl IntoIterator<Item = i16>) -> Self {
        self.set_positions = positions.into_iter().collect();
        self
    }

    /// Validate and produce the rule.
    pub fn build(self) -> Result<RecurrenceRule, ScheduleError> {
        self.validate().map_err(ScheduleError::argument)?;

        let termination = match (self.count, self.until) {
            (Some(n), None) => Some(Termination::Count(n)),
            (None, Some(dt)) => Some(Termination::Until(dt)),
            _ => None,
        };

        let plain_days = || -> Vec<Weekday> { self.week_days.iter().map(|s| s.weekday).collect() };
        let day_filters = || DayFilters {
            months: self.months.clone(),
            month_days: self.month_days.clone(),
            week_days: plain_days(),
            time: self.time.clone(),
        };

        let kind = match self.frequency {
            Frequency::Secondly => RuleKind::Secondly(day_filters()),
            Frequency::Minutely => RuleKind::Minutely(day_filters()),
            Frequency::Hourly => RuleKind::Hourly(day_filters()),
            Frequency::Daily => RuleKind::Daily(day_filters()),
            Frequency::Weekly => RuleKind::Weekly(WeeklyFilters {
                months: self.months.clone(),
                week_days: plain_days(),
                time: self.time.clone(),
            }),
            Frequency::Monthly => RuleKind::Monthly(MonthlyFilters {
                months: self.months.clone(),
                month_days: self.month_days.clone(),
                week_days: self.week_days.clone(),
                time: self.time.clone(),
            }),
            Frequency::Yearly => RuleKind::Yearly(YearlyFilters {
                months: self.months.clone(),
                year_days: self.year_days.clone(),
                month_days: self.month_days.clone(),
                week_days: self.week_days.clone(),
                time: self.time.clone(),
            }),
        };

        Ok(RecurrenceRule {
            interval: self.interval,
            termination,
            week_start: self.week_start,
            by_set_positions: self.set_positions,
            kind,
        })
    }

    fn validate(&self) -> Result<(), String> {
        if self.interval == 0 {
            return Err("INTERVAL must be at least 1".into());
        }
        if self.count.is_some() && self.until.is_some() {
            return Err("UNTIL and COUNT are mutually exclusive".into());
        }
        if !self.year_days.is_empty() && self.frequency != Frequency::Yearly {
            return Err(format!(
                "BYYEARDAY is not allowed with FREQ={}",
                self.frequency.as_str()
            ));
        }
        if !self.month_days.is_empty() && self.frequency == Frequency::Weekly {
            return Err("BYMONTHDAY is not allowed with FREQ=WEEKLY".into());
        }
        if !self.frequency.allows_ordinal_weekdays()
            && self.week_days.iter().any(|s| s.ordinal.is_some())
        {
            return Err(format!(
                "BYDAY ordinals are not allowed with FREQ={}",
                self.frequency.as_str()
            ));
        }

        check_all(BY_YEAR_DAY, &self.year_days)?;
        check_all(BY_MONTH_DAY, &self.month_days)?;
        check_all(BY_HOUR, &self.time.hours)?;
        check_all(BY_MINUTE, &self.time.minutes)?;
        check_all(BY_SECOND, &self.time.seconds)?;
        check_all(BY_SET_POS, &self.set_positions)?;
        for selector in &self.week_days {
            if let Some(n) = selector.ordinal {
                BY_DAY_ORDINAL.check(n.into())?;
            }
        }
        Ok(())
    }
}
