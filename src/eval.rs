use std::collections::{BTreeSet, VecDeque};

use jiff::civil::{Date, DateTime, Time};
use jiff::SignedDuration;

use crate::ast::*;

// ---------------------------------------------------------------------------
// Calendar helpers
// ---------------------------------------------------------------------------

fn days_after(date: Date, n: i64) -> Option<Date> {
    date.checked_add(jiff::Span::new().try_days(n).ok()?).ok()
}

fn months_after(date: Date, n: i64) -> Option<Date> {
    date.checked_add(jiff::Span::new().try_months(n).ok()?).ok()
}

fn years_after(date: Date, n: i64) -> Option<Date> {
    date.checked_add(jiff::Span::new().try_years(n).ok()?).ok()
}

fn midnight(date: Date) -> DateTime {
    date.to_datetime(Time::midnight())
}

/// Every day of the month containing `date`.
fn days_of_month(date: Date) -> Vec<Date> {
    let first = date.first_of_month();
    (1..=first.days_in_month())
        .filter_map(|d| first.with().day(d).build().ok())
        .collect()
}

/// Every day of `year`.
fn days_of_year(year: i16) -> Vec<Date> {
    (1..=12)
        .filter_map(|m| Date::new(year, m, 1).ok())
        .flat_map(days_of_month)
        .collect()
}

/// Resolve a signed month day (`-1` = last) against a month length.
fn resolve_month_day(month_day: i8, days_in_month: i8) -> Option<i8> {
    let day = if month_day > 0 {
        month_day
    } else {
        days_in_month + month_day + 1
    };
    (1..=days_in_month).contains(&day).then_some(day)
}

fn month_day_matches(date: Date, month_days: &[i8]) -> bool {
    month_days.is_empty()
        || month_days
            .iter()
            .any(|&md| resolve_month_day(md, date.days_in_month()) == Some(date.day()))
}

fn month_matches(date: Date, months: &[Month]) -> bool {
    months.is_empty() || months.iter().any(|m| m.number() as i8 == date.month())
}

fn weekday_matches(date: Date, week_days: &[Weekday]) -> bool {
    week_days.is_empty() || week_days.contains(&Weekday::from_jiff(date.weekday()))
}

/// Apply one `BYDAY` selector to an ordered run of days (a month or a year).
fn select_weekdays(days: &[Date], selector: ByDaySelector) -> Vec<Date> {
    let target = selector.weekday.to_jiff();
    let matching: Vec<Date> = days.iter().copied().filter(|d| d.weekday() == target).collect();
    match selector.ordinal {
        None => matching,
        Some(n) if n > 0 => matching.get(n as usize - 1).copied().into_iter().collect(),
        Some(n) => matching
            .len()
            .checked_sub(n.unsigned_abs() as usize)
            .and_then(|i| matching.get(i).copied())
            .into_iter()
            .collect(),
    }
}

/// Expand candidate days into timestamps using the time lists. Missing lists
/// fall back to the start's own component; second 60 is dropped.
fn expand_times(
    dates: impl IntoIterator<Item = Date>,
    time: &TimeFilters,
    start: DateTime,
) -> Vec<DateTime> {
    let own = |list: &[u8], fallback: i8| -> Vec<i8> {
        if list.is_empty() {
            vec![fallback]
        } else {
            list.iter().map(|&v| v as i8).collect()
        }
    };
    let hours = own(&time.hours, start.hour());
    let minutes = own(&time.minutes, start.minute());
    let seconds = own(&time.seconds, start.second());
    let nanos = start.subsec_nanosecond();

    let mut out = Vec::new();
    for date in dates {
        for &h in &hours {
            for &m in &minutes {
                for &s in &seconds {
                    if let Ok(t) = Time::new(h, m, s, nanos) {
                        out.push(date.to_datetime(t));
                    }
                }
            }
        }
    }
    out
}

/// Sort, dedupe and apply `BYSETPOS` to one period's candidates.
fn select_positions(mut candidates: Vec<DateTime>, positions: &[i16]) -> Vec<DateTime> {
    candidates.sort();
    candidates.dedup();
    if positions.is_empty() {
        return candidates;
    }
    let len = candidates.len() as i64;
    let mut picked: Vec<DateTime> = positions
        .iter()
        .filter_map(|&p| {
            let idx = if p > 0 { i64::from(p) - 1 } else { len + i64::from(p) };
            (0..len).contains(&idx).then(|| candidates[idx as usize])
        })
        .collect();
    picked.sort();
    picked.dedup();
    picked
}

// ---------------------------------------------------------------------------
// Per-frequency period expansion
// ---------------------------------------------------------------------------

/// One evaluated period of a rule.
struct Step {
    /// Nothing in this period or later is earlier than this.
    floor: DateTime,
    /// Ascending, deduplicated, set-position filtered, all `>= start`.
    candidates: Vec<DateTime>,
    next_period: i64,
}

impl Step {
    fn empty(floor: DateTime, next_period: i64) -> Self {
        Self {
            floor,
            candidates: Vec::new(),
            next_period,
        }
    }
}

/// Evaluate period number `period` of the rule anchored at `start`.
/// `None` means calendar arithmetic left the supported range.
fn step(rule: &RecurrenceRule, start: DateTime, period: i64) -> Option<Step> {
    let interval = i64::from(rule.interval);
    let mut step = match &rule.kind {
        RuleKind::Secondly(f) => sub_daily(f, Frequency::Secondly, interval, start, period)?,
        RuleKind::Minutely(f) => sub_daily(f, Frequency::Minutely, interval, start, period)?,
        RuleKind::Hourly(f) => sub_daily(f, Frequency::Hourly, interval, start, period)?,
        RuleKind::Daily(f) => daily(f, interval, start, period)?,
        RuleKind::Weekly(f) => weekly(f, rule.week_start, interval, start, period)?,
        RuleKind::Monthly(f) => monthly(f, interval, start, period)?,
        RuleKind::Yearly(f) => yearly(f, interval, start, period)?,
    };
    step.candidates = select_positions(step.candidates, &rule.by_set_positions);
    step.candidates.retain(|dt| *dt >= start);
    Some(step)
}

/// Seconds past midnight.
fn second_of_day(dt: DateTime) -> i64 {
    i64::from(dt.hour()) * 3600 + i64::from(dt.minute()) * 60 + i64::from(dt.second())
}

/// The filter list sorted, or every value below `end` when it is empty.
/// Values at or past `end` (second 60) never match.
fn allowed(list: &[u8], end: u8) -> Vec<i64> {
    let mut values: Vec<i64> = if list.is_empty() {
        (0..end).map(i64::from).collect()
    } else {
        list.iter().filter(|&&v| v < end).map(|&v| i64::from(v)).collect()
    };
    values.sort_unstable();
    values.dedup();
    values
}

/// First time of day, in seconds past midnight and ascending order, at which
/// a tick of `freq` passes the time filters and `accept` holds. Units finer
/// than the frequency are pinned to `start`'s.
fn first_tick_time(
    time: &TimeFilters,
    freq: Frequency,
    start: DateTime,
    mut accept: impl FnMut(i64) -> bool,
) -> Option<i64> {
    let hours = allowed(&time.hours, 24);
    let (minutes, seconds) = match freq {
        Frequency::Hourly => (
            vec![i64::from(start.minute())],
            vec![i64::from(start.second())],
        ),
        Frequency::Minutely => (allowed(&time.minutes, 60), vec![i64::from(start.second())]),
        _ => (allowed(&time.minutes, 60), allowed(&time.seconds, 60)),
    };
    for h in &hours {
        for m in &minutes {
            for s in &seconds {
                let t = h * 3600 + m * 60 + s;
                if accept(t) {
                    return Some(t);
                }
            }
        }
    }
    None
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Seconds between ticks of a sub-daily rule.
fn tick_seconds(freq: Frequency, interval: i64) -> Option<i64> {
    let unit: i64 = match freq {
        Frequency::Hourly => 3600,
        Frequency::Minutely => 60,
        Frequency::Secondly => 1,
        _ => return None,
    };
    unit.checked_mul(interval)
}

/// Whether the rule can never produce an occurrence from `start` because of
/// its time filters alone.
///
/// A `BYSECOND` list holding only 60 matches nothing. A sub-daily rule's
/// ticks only reach the times of day `start + k * gcd(step, 1 day)`; when
/// none of those passes the filters, iterating would walk tick by tick to
/// the end of the calendar.
fn never_matches(rule: &RecurrenceRule, start: DateTime) -> bool {
    let time = rule.kind.time();
    if !time.seconds.is_empty() && time.seconds.iter().all(|&s| s >= 60) {
        return true;
    }
    let freq = rule.frequency();
    let Some(step_secs) = tick_seconds(freq, i64::from(rule.interval)) else {
        return false;
    };
    let reach = gcd(step_secs, 86_400);
    let origin = second_of_day(start);
    first_tick_time(time, freq, start, |t| (t - origin).rem_euclid(reach) == 0).is_none()
}

/// Secondly, minutely and hourly rules: one tick per period.
///
/// Filters at or above the frequency's unit limit the tick. A rejected tick
/// jumps straight to the first tick in phase with a permitted time of day,
/// or past the rejected day or month. Hourly expands minutes and seconds,
/// minutely expands seconds.
fn sub_daily(
    f: &DayFilters,
    freq: Frequency,
    interval: i64,
    start: DateTime,
    period: i64,
) -> Option<Step> {
    let step_secs = tick_seconds(freq, interval)?;
    let offset = SignedDuration::from_secs(period.checked_mul(step_secs)?);
    let tick = start.checked_add(offset).ok()?;
    let date = tick.date();

    let skip_to = |boundary: DateTime| -> Option<Step> {
        let gap = tick.duration_until(boundary).as_nanos();
        let step_nanos = i128::from(step_secs) * 1_000_000_000;
        let ticks = ((gap + step_nanos - 1) / step_nanos).max(1);
        Some(Step::empty(tick, period.checked_add(i64::try_from(ticks).ok()?)?))
    };

    if !month_matches(date, &f.months) {
        return skip_to(midnight(months_after(date.first_of_month(), 1)?));
    }
    if !month_day_matches(date, &f.month_days) || !weekday_matches(date, &f.week_days) {
        return skip_to(midnight(days_after(date, 1)?));
    }

    let time = &f.time;
    let now = second_of_day(tick);
    match first_tick_time(time, freq, start, |t| t >= now && (t - now) % step_secs == 0) {
        None => return skip_to(midnight(days_after(date, 1)?)),
        Some(t) if t > now => {
            return skip_to(tick.checked_add(SignedDuration::from_secs(t - now)).ok()?)
        }
        Some(_) => {}
    }

    let candidates = match freq {
        Frequency::Hourly => {
            let limits = TimeFilters {
                hours: vec![tick.hour() as u8],
                ..time.clone()
            };
            expand_times([date], &limits, tick)
        }
        Frequency::Minutely => {
            let limits = TimeFilters {
                hours: vec![tick.hour() as u8],
                minutes: vec![tick.minute() as u8],
                seconds: time.seconds.clone(),
            };
            expand_times([date], &limits, tick)
        }
        _ => vec![tick],
    };

    Some(Step {
        floor: tick,
        candidates,
        next_period: period.checked_add(1)?,
    })
}

fn daily(f: &DayFilters, interval: i64, start: DateTime, period: i64) -> Option<Step> {
    let date = days_after(start.date(), period.checked_mul(interval)?)?;
    let floor = midnight(date);

    if !month_matches(date, &f.months) {
        let remaining = i64::from(date.days_in_month() - date.day()) + 1;
        let jump = (remaining + interval - 1) / interval;
        return Some(Step::empty(floor, period.checked_add(jump)?));
    }

    let next_period = period.checked_add(1)?;
    if !month_day_matches(date, &f.month_days) || !weekday_matches(date, &f.week_days) {
        return Some(Step::empty(floor, next_period));
    }

    Some(Step {
        floor,
        candidates: expand_times([date], &f.time, start),
        next_period,
    })
}

fn weekly(
    f: &WeeklyFilters,
    week_start: Weekday,
    interval: i64,
    start: DateTime,
    period: i64,
) -> Option<Step> {
    let start_day = Weekday::from_jiff(start.date().weekday());
    let first_week = days_after(start.date(), -i64::from(start_day.days_since(week_start)))?;
    let anchor = days_after(first_week, period.checked_mul(interval)?.checked_mul(7)?)?;

    let offsets: BTreeSet<u8> = if f.week_days.is_empty() {
        BTreeSet::from([start_day.days_since(week_start)])
    } else {
        f.week_days.iter().map(|d| d.days_since(week_start)).collect()
    };

    let dates: Vec<Date> = offsets
        .into_iter()
        .filter_map(|o| days_after(anchor, o.into()))
        .filter(|d| month_matches(*d, &f.months))
        .collect();

    Some(Step {
        floor: midnight(anchor),
        candidates: expand_times(dates, &f.time, start),
        next_period: period.checked_add(1)?,
    })
}

fn monthly(f: &MonthlyFilters, interval: i64, start: DateTime, period: i64) -> Option<Step> {
    let months = period.checked_mul(interval)?;
    let first = months_after(start.date().first_of_month(), months)?;
    let floor = midnight(first);
    let next_period = period.checked_add(1)?;

    if !month_matches(first, &f.months) {
        return Some(Step::empty(floor, next_period));
    }

    let dates: Vec<Date> = if f.month_days.is_empty() && f.week_days.is_empty() {
        vec![months_after(start.date(), months)?]
    } else {
        let days = days_of_month(first);
        let by_month_day: Option<BTreeSet<Date>> = (!f.month_days.is_empty()).then(|| {
            days.iter()
                .copied()
                .filter(|d| month_day_matches(*d, &f.month_days))
                .collect()
        });
        let by_week_day: Option<BTreeSet<Date>> = (!f.week_days.is_empty()).then(|| {
            f.week_days
                .iter()
                .flat_map(|s| select_weekdays(&days, *s))
                .collect()
        });
        intersect([by_month_day, by_week_day])
    };

    Some(Step {
        floor,
        candidates: expand_times(dates, &f.time, start),
        next_period,
    })
}

/// Yearly rules. Ordinal `BYDAY` counts within each month when `BYMONTH`
/// is present and within the whole year otherwise.
fn yearly(f: &YearlyFilters, interval: i64, start: DateTime, period: i64) -> Option<Step> {
    let years = period.checked_mul(interval)?;
    let year = i16::try_from(i64::from(start.year()).checked_add(years)?).ok()?;
    let jan1 = Date::new(year, 1, 1).ok()?;
    let floor = midnight(jan1);
    let next_period = period.checked_add(1)?;

    let no_day_filters =
        f.year_days.is_empty() && f.month_days.is_empty() && f.week_days.is_empty();

    let dates: Vec<Date> = if no_day_filters && f.months.is_empty() {
        vec![years_after(start.date(), years)?]
    } else if no_day_filters {
        f.months
            .iter()
            .filter_map(|m| Date::new(year, m.number() as i8, start.day()).ok())
            .collect()
    } else {
        let in_scope: Vec<Date> = if f.months.is_empty() {
            days_of_year(year)
        } else {
            f.months
                .iter()
                .filter_map(|m| Date::new(year, m.number() as i8, 1).ok())
                .flat_map(days_of_month)
                .collect()
        };

        let by_year_day: Option<BTreeSet<Date>> = (!f.year_days.is_empty()).then(|| {
            let len = jan1.days_in_year();
            f.year_days
                .iter()
                .filter_map(|&yd| {
                    let ordinal = if yd > 0 { yd } else { len + yd + 1 };
                    if !(1..=len).contains(&ordinal) {
                        return None;
                    }
                    days_after(jan1, i64::from(ordinal) - 1)
                })
                .filter(|d| month_matches(*d, &f.months))
                .collect()
        });
        let by_month_day: Option<BTreeSet<Date>> = (!f.month_days.is_empty()).then(|| {
            in_scope
                .iter()
                .copied()
                .filter(|d| month_day_matches(*d, &f.month_days))
                .collect()
        });
        let by_week_day: Option<BTreeSet<Date>> = (!f.week_days.is_empty()).then(|| {
            if f.months.is_empty() {
                f.week_days
                    .iter()
                    .flat_map(|s| select_weekdays(&in_scope, *s))
                    .collect()
            } else {
                f.months
                    .iter()
                    .filter_map(|m| Date::new(year, m.number() as i8, 1).ok())
                    .flat_map(|first| {
                        let days = days_of_month(first);
                        f.week_days
                            .iter()
                            .flat_map(|s| select_weekdays(&days, *s))
                            .collect::<Vec<_>>()
                    })
                    .collect()
            }
        });
        intersect([by_year_day, by_month_day, by_week_day])
    };

    Some(Step {
        floor,
        candidates: expand_times(dates, &f.time, start),
        next_period,
    })
}

/// Intersect the configured day sets; an unconfigured set places no limit.
fn intersect<const N: usize>(sets: [Option<BTreeSet<Date>>; N]) -> Vec<Date> {
    let mut configured = sets.into_iter().flatten();
    let Some(first) = configured.next() else {
        return Vec::new();
    };
    configured
        .fold(first, |acc, set| acc.intersection(&set).copied().collect())
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// Iterators
// ---------------------------------------------------------------------------

/// Lazy, strictly increasing sequence of a rule's occurrences at or after a
/// start timestamp.
///
/// Each call to [`RecurrenceRule::occurrences`](crate::RecurrenceRule::occurrences)
/// starts a fresh sequence; dropping the iterator is the only cancellation
/// needed. Unbounded rules yield until the calendar's upper limit.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    rule: &'a RecurrenceRule,
    start: DateTime,
    period: i64,
    pending: VecDeque<DateTime>,
    emitted: u32,
    done: bool,
}

impl<'a> Occurrences<'a> {
    pub(crate) fn new(rule: &'a RecurrenceRule, start: DateTime) -> Self {
        let done = never_matches(rule, start);
        if done {
            tracing::debug!(%rule, %start, "time filters are unreachable from start");
        }
        Self {
            rule,
            start,
            period: 0,
            pending: VecDeque::new(),
            emitted: 0,
            done,
        }
    }

    fn finish(&mut self) -> Option<DateTime> {
        self.done = true;
        self.pending.clear();
        None
    }
}

impl Iterator for Occurrences<'_> {
    type Item = DateTime;

    fn next(&mut self) -> Option<DateTime> {
        if self.done {
            return None;
        }
        let count = self.rule.count();
        if count.is_some_and(|n| self.emitted >= n) {
            return self.finish();
        }
        let until = self.rule.until();

        loop {
            if let Some(dt) = self.pending.pop_front() {
                if until.is_some_and(|u| dt > u) {
                    return self.finish();
                }
                if count.is_some() {
                    self.emitted += 1;
                }
                return Some(dt);
            }

            let Some(step) = step(self.rule, self.start, self.period) else {
                tracing::trace!(period = self.period, "rule left the supported date range");
                return self.finish();
            };
            if until.is_some_and(|u| step.floor > u) {
                return self.finish();
            }
            self.pending.extend(step.candidates);
            self.period = step.next_period;
        }
    }
}

impl std::iter::FusedIterator for Occurrences<'_> {}

/// Occurrences within `from..=to`.
#[derive(Debug, Clone)]
pub struct BoundedOccurrences<'a> {
    inner: Occurrences<'a>,
    to: DateTime,
}

impl<'a> BoundedOccurrences<'a> {
    pub(crate) fn new(rule: &'a RecurrenceRule, from: DateTime, to: DateTime) -> Self {
        Self {
            inner: Occurrences::new(rule, from),
            to,
        }
    }
}

impl Iterator for BoundedOccurrences<'_> {
    type Item = DateTime;

    fn next(&mut self) -> Option<DateTime> {
        match self.inner.next() {
            Some(dt) if dt <= self.to => Some(dt),
            Some(_) => {
                self.inner.finish();
                None
            }
            None => None,
        }
    }
}

impl std::iter::FusedIterator for BoundedOccurrences<'_> {}
