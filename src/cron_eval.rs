use jiff::civil::{Date, DateTime};
use jiff::SignedDuration;

use crate::ast::Weekday;
use crate::cron::{CronExpression, CronField, CronValue};

/// Earliest year a cron search will consider.
pub const MIN_YEAR: i32 = 1970;
/// Latest year a cron search will consider; nothing is produced past it.
pub const MAX_YEAR: i32 = 2099;

/// Bounds on a single next-occurrence search.
///
/// Each field adjustment (skip a day, jump to the next matching hour, roll
/// over a month, ...) counts as one step. A search that runs out of steps
/// reports no occurrence, which ends a [`CronOccurrences`] sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_steps: u32,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self { max_steps: 100_000 }
    }
}

impl SearchLimits {
    pub fn new(max_steps: u32) -> Self {
        Self { max_steps }
    }
}

/// Mutable calendar position. Components may briefly run past their range
/// (e.g. day 32); the search loop rolls them over before use.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    year: i32,
    month: i32,
    day: i32,
    hour: i32,
    minute: i32,
    second: i32,
}

impl Cursor {
    fn at_or_after(dt: DateTime) -> Self {
        let mut c = Self {
            year: dt.year().into(),
            month: dt.month().into(),
            day: dt.day().into(),
            hour: dt.hour().into(),
            minute: dt.minute().into(),
            second: dt.second().into(),
        };
        if dt.subsec_nanosecond() > 0 {
            c.second += 1;
            if c.second > 59 {
                c.next_minute();
            }
        }
        if c.year < MIN_YEAR {
            c = Self::start_of_year(MIN_YEAR);
        }
        c
    }

    fn start_of_year(year: i32) -> Self {
        Self {
            year,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    fn set_year(&mut self, year: i32) {
        *self = Self::start_of_year(year);
    }

    fn set_month(&mut self, month: i32) {
        self.month = month;
        self.day = 1;
        self.reset_time();
    }

    fn set_hour(&mut self, hour: i32) {
        self.hour = hour;
        self.minute = 0;
        self.second = 0;
    }

    fn set_minute(&mut self, minute: i32) {
        self.minute = minute;
        self.second = 0;
    }

    fn reset_time(&mut self) {
        self.hour = 0;
        self.minute = 0;
        self.second = 0;
    }

    fn next_year(&mut self) {
        self.set_year(self.year + 1);
    }

    fn next_month(&mut self) {
        if self.month >= 12 {
            self.next_year();
        } else {
            self.set_month(self.month + 1);
        }
    }

    fn next_day(&mut self) {
        self.day += 1;
        self.reset_time();
    }

    fn next_hour(&mut self) {
        if self.hour >= 23 {
            self.next_day();
        } else {
            self.set_hour(self.hour + 1);
        }
    }

    fn next_minute(&mut self) {
        if self.minute >= 59 {
            self.next_hour();
        } else {
            self.set_minute(self.minute + 1);
        }
    }

    fn to_datetime(self) -> Option<DateTime> {
        DateTime::new(
            i16::try_from(self.year).ok()?,
            i8::try_from(self.month).ok()?,
            i8::try_from(self.day).ok()?,
            i8::try_from(self.hour).ok()?,
            i8::try_from(self.minute).ok()?,
            i8::try_from(self.second).ok()?,
            0,
        )
        .ok()
    }
}

/// Find the first instant at or after `from` that the expression accepts.
///
/// Walks coarsest to finest (year, month, day, hour, minute, second). A
/// field that cannot match within its unit rolls the next coarser unit and
/// resets the finer ones. Returns `None` past [`MAX_YEAR`] or when `limits`
/// run out.
pub(crate) fn next_occurrence(
    expr: &CronExpression,
    from: DateTime,
    limits: SearchLimits,
) -> Option<DateTime> {
    let mut c = Cursor::at_or_after(from);

    for _ in 0..limits.max_steps {
        if c.year > MAX_YEAR {
            return None;
        }

        let year = expr.years.next_at_or_after(c.year, MAX_YEAR)?;
        if year != c.year {
            c.set_year(year);
            continue;
        }

        match expr.months.next_at_or_after(c.month, 12) {
            Some(m) if m == c.month => {}
            Some(m) => {
                c.set_month(m);
                continue;
            }
            None => {
                tracing::trace!(year = c.year, "no matching month left, rolling year");
                c.next_year();
                continue;
            }
        }

        let dim = days_in_month(c.year, c.month);
        if c.day > dim {
            c.next_month();
            continue;
        }
        if !day_matches(expr, c.year, c.month, c.day, dim) {
            c.next_day();
            continue;
        }

        match expr.hours.next_at_or_after(c.hour, 23) {
            Some(h) if h == c.hour => {}
            Some(h) => {
                c.set_hour(h);
                continue;
            }
            None => {
                c.next_day();
                continue;
            }
        }

        match expr.minutes.next_at_or_after(c.minute, 59) {
            Some(m) if m == c.minute => {}
            Some(m) => {
                c.set_minute(m);
                continue;
            }
            None => {
                c.next_hour();
                continue;
            }
        }

        match expr.seconds.next_at_or_after(c.second, 59) {
            Some(s) if s == c.second => return c.to_datetime(),
            Some(s) => c.second = s,
            None => c.next_minute(),
        }
    }

    tracing::warn!(
        max_steps = limits.max_steps,
        %from,
        "cron search exhausted its step limit"
    );
    None
}

/// True if `dt` (ignoring sub-second precision) satisfies every field.
pub(crate) fn matches(expr: &CronExpression, dt: DateTime) -> bool {
    let year = i32::from(dt.year());
    let month = i32::from(dt.month());
    let day = i32::from(dt.day());
    (MIN_YEAR..=MAX_YEAR).contains(&year)
        && expr.years.contains(year)
        && expr.months.contains(month)
        && day_matches(expr, year, month, day, days_in_month(year, month))
        && expr.hours.contains(dt.hour().into())
        && expr.minutes.contains(dt.minute().into())
        && expr.seconds.contains(dt.second().into())
}

/// Day-of-month and day-of-week must both accept the day.
fn day_matches(expr: &CronExpression, year: i32, month: i32, day: i32, dim: i32) -> bool {
    let Some(date) = civil_date(year, month, day) else {
        return false;
    };
    month_day_matches(&expr.days_of_month, date, dim)
        && week_day_matches(&expr.days_of_week, date, dim)
}

fn month_day_matches(field: &CronField, date: Date, dim: i32) -> bool {
    let CronField::Values(values) = field else {
        return true;
    };
    let day = i32::from(date.day());
    values.iter().any(|value| match *value {
        CronValue::Value(n) => i32::from(n) == day,
        CronValue::Last => day == dim,
        CronValue::LastMinus(n) => day == dim - i32::from(n),
        CronValue::LastWeekday => last_weekday_of_month(date, dim) == Some(day),
        CronValue::NearestWeekday(n) => nearest_weekday(date, i32::from(n), dim) == Some(day),
        CronValue::LastOfWeekday(_) | CronValue::NthOfWeekday(..) => false,
    })
}

fn week_day_matches(field: &CronField, date: Date, dim: i32) -> bool {
    let CronField::Values(values) = field else {
        return true;
    };
    let weekday = Weekday::from_jiff(date.weekday());
    let day = i32::from(date.day());
    values.iter().any(|value| match *value {
        CronValue::Value(n) => u16::from(weekday.cron_number()) == n,
        CronValue::LastOfWeekday(wd) => wd == weekday && day + 7 > dim,
        CronValue::NthOfWeekday(wd, n) => wd == weekday && (day - 1) / 7 + 1 == i32::from(n),
        _ => false,
    })
}

fn civil_date(year: i32, month: i32, day: i32) -> Option<Date> {
    Date::new(
        i16::try_from(year).ok()?,
        i8::try_from(month).ok()?,
        i8::try_from(day).ok()?,
    )
    .ok()
}

fn days_in_month(year: i32, month: i32) -> i32 {
    civil_date(year, month, 1).map_or(0, |d| d.days_in_month().into())
}

fn is_weekend(date: Date) -> bool {
    matches!(
        date.weekday(),
        jiff::civil::Weekday::Saturday | jiff::civil::Weekday::Sunday
    )
}

/// Day number of the last Mon-Fri in the month containing `date`.
fn last_weekday_of_month(date: Date, dim: i32) -> Option<i32> {
    let mut day = dim;
    while day > 0 {
        let candidate = date.with().day(i8::try_from(day).ok()?).build().ok()?;
        if !is_weekend(candidate) {
            return Some(day);
        }
        day -= 1;
    }
    None
}

/// Day number of the weekday nearest to `target` without leaving the month.
/// `None` if the month has no such day.
fn nearest_weekday(date: Date, target: i32, dim: i32) -> Option<i32> {
    if target > dim {
        return None;
    }
    let anchor = date.with().day(i8::try_from(target).ok()?).build().ok()?;
    let day = match anchor.weekday() {
        jiff::civil::Weekday::Saturday if target == 1 => target + 2,
        jiff::civil::Weekday::Saturday => target - 1,
        jiff::civil::Weekday::Sunday if target == dim => target - 2,
        jiff::civil::Weekday::Sunday => target + 1,
        _ => target,
    };
    Some(day)
}

/// Lazy sequence of cron matches, starting at (and including) the start.
///
/// Each item re-runs a bounded single-shot search one second past the
/// previous match. The sequence ends at the year ceiling or when a search
/// exhausts its [`SearchLimits`].
#[derive(Debug, Clone)]
pub struct CronOccurrences<'a> {
    expr: &'a CronExpression,
    cursor: Option<DateTime>,
    limits: SearchLimits,
}

impl<'a> CronOccurrences<'a> {
    pub(crate) fn new(expr: &'a CronExpression, start: DateTime, limits: SearchLimits) -> Self {
        Self {
            expr,
            cursor: Some(start),
            limits,
        }
    }
}

impl Iterator for CronOccurrences<'_> {
    type Item = DateTime;

    fn next(&mut self) -> Option<DateTime> {
        let from = self.cursor.take()?;
        let found = next_occurrence(self.expr, from, self.limits)?;
        self.cursor = found.checked_add(SignedDuration::from_secs(1)).ok();
        Some(found)
    }
}

impl std::iter::FusedIterator for CronOccurrences<'_> {}
