use std::collections::BTreeSet;

use crate::ast::{parse_month_name, parse_weekday_name, Weekday};
use crate::error::{ScheduleError, Span};

/// A parsed cron expression.
///
/// Five fields (`min hour dom month dow`) leave seconds fixed at 0 and the
/// year unrestricted; six fields prepend seconds; seven append a year.
/// `has_seconds` and `has_year` only matter for rendering the text back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    pub(crate) seconds: CronField,
    pub(crate) minutes: CronField,
    pub(crate) hours: CronField,
    pub(crate) days_of_month: CronField,
    pub(crate) months: CronField,
    pub(crate) days_of_week: CronField,
    pub(crate) years: CronField,
    pub(crate) has_seconds: bool,
    pub(crate) has_year: bool,
}

impl CronExpression {
    pub fn seconds(&self) -> &CronField {
        &self.seconds
    }

    pub fn minutes(&self) -> &CronField {
        &self.minutes
    }

    pub fn hours(&self) -> &CronField {
        &self.hours
    }

    pub fn days_of_month(&self) -> &CronField {
        &self.days_of_month
    }

    pub fn months(&self) -> &CronField {
        &self.months
    }

    pub fn days_of_week(&self) -> &CronField {
        &self.days_of_week
    }

    pub fn years(&self) -> &CronField {
        &self.years
    }

    pub fn has_seconds(&self) -> bool {
        self.has_seconds
    }

    pub fn has_year(&self) -> bool {
        self.has_year
    }
}

/// One cron field: either `*` or an explicit set of matchers.
///
/// Plain values are kept sorted and deduplicated; special day tokens follow
/// in the order they were written. A field whose values cover its whole
/// range is stored as `All`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CronField {
    All,
    Values(Vec<CronValue>),
}

impl CronField {
    /// True if the plain value `v` is accepted. Day specials never match here.
    pub(crate) fn contains(&self, v: i32) -> bool {
        match self {
            Self::All => true,
            Self::Values(values) => values
                .iter()
                .any(|x| matches!(x, CronValue::Value(n) if i32::from(*n) == v)),
        }
    }

    /// Smallest accepted plain value in `v..=max`.
    pub(crate) fn next_at_or_after(&self, v: i32, max: i32) -> Option<i32> {
        match self {
            Self::All => (v <= max).then_some(v),
            Self::Values(values) => values
                .iter()
                .filter_map(|x| match x {
                    CronValue::Value(n) => Some(i32::from(*n)),
                    _ => None,
                })
                .filter(|&n| n >= v && n <= max)
                .min(),
        }
    }

    pub(crate) fn plain_values(&self) -> impl Iterator<Item = u16> + '_ {
        let values: &[CronValue] = match self {
            Self::All => &[],
            Self::Values(values) => values,
        };
        values.iter().filter_map(|x| match x {
            CronValue::Value(n) => Some(*n),
            _ => None,
        })
    }

    pub(crate) fn specials(&self) -> impl Iterator<Item = &CronValue> + '_ {
        let values: &[CronValue] = match self {
            Self::All => &[],
            Self::Values(values) => values,
        };
        values.iter().filter(|x| !matches!(x, CronValue::Value(_)))
    }
}

/// A single matcher within a cron field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CronValue {
    /// A plain number. Day-of-week values are stored 0..=6 (Sunday = 0).
    Value(u16),
    /// `L` in day-of-month: the last day.
    Last,
    /// `L-n` in day-of-month: `n` days before the last day.
    LastMinus(u8),
    /// `LW` in day-of-month: the last weekday (Mon-Fri).
    LastWeekday,
    /// `nW` in day-of-month: the weekday nearest to day `n`, within the month.
    NearestWeekday(u8),
    /// `nL` in day-of-week: the last such weekday of the month.
    LastOfWeekday(Weekday),
    /// `n#m` in day-of-week: the `m`-th such weekday of the month.
    NthOfWeekday(Weekday, u8),
}

/// Which field a token belongs to, with its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Second,
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
    Year,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::DayOfMonth => "day-of-month",
            Self::Month => "month",
            Self::DayOfWeek => "day-of-week",
            Self::Year => "year",
        }
    }

    pub fn min(self) -> u16 {
        match self {
            Self::Second | Self::Minute | Self::Hour | Self::DayOfWeek => 0,
            Self::DayOfMonth | Self::Month => 1,
            Self::Year => 1970,
        }
    }

    /// Largest value accepted in text.
    pub fn max(self) -> u16 {
        match self {
            Self::Second | Self::Minute => 59,
            Self::Hour => 23,
            Self::DayOfMonth => 31,
            Self::Month => 12,
            Self::DayOfWeek => 7,
            Self::Year => 2099,
        }
    }

    /// Largest stored value; day-of-week 7 folds onto 0.
    pub fn stored_max(self) -> u16 {
        match self {
            Self::DayOfWeek => 6,
            other => other.max(),
        }
    }

    fn allows_question(self) -> bool {
        matches!(self, Self::DayOfMonth | Self::DayOfWeek)
    }

    fn normalize(self, v: u16) -> u16 {
        match self {
            Self::DayOfWeek => v % 7,
            _ => v,
        }
    }
}

const ALIASES: &[(&[&str], &str)] = &[
    (&["@yearly", "@annually"], "0 0 1 1 *"),
    (&["@monthly"], "0 0 1 * *"),
    (&["@weekly"], "0 0 * * 0"),
    (&["@daily", "@midnight"], "0 0 * * *"),
    (&["@hourly"], "0 * * * *"),
];

/// Parse cron text (5, 6 or 7 fields, or an `@` alias).
pub fn parse(input: &str) -> Result<CronExpression, ScheduleError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ScheduleError::argument("cron expression is empty"));
    }

    if trimmed.starts_with('@') {
        let lower = trimmed.to_ascii_lowercase();
        let expansion = ALIASES
            .iter()
            .find(|(names, _)| names.contains(&lower.as_str()))
            .map(|(_, text)| *text)
            .ok_or_else(|| {
                reject(
                    format!("unknown cron alias '{trimmed}'"),
                    Span::new(0, input.len()),
                    input,
                )
            })?;
        return parse_fields(expansion);
    }

    parse_fields(input)
}

fn reject(message: String, span: Span, input: &str) -> ScheduleError {
    tracing::debug!(%span, %message, "rejecting cron expression");
    ScheduleError::cron(message, span, input)
}

fn parse_fields(input: &str) -> Result<CronExpression, ScheduleError> {
    let fields: Vec<(&str, Span)> = input
        .split_whitespace()
        .map(|field| {
            let start = field.as_ptr() as usize - input.as_ptr() as usize;
            (field, Span::new(start, start + field.len()))
        })
        .collect();

    let kinds: &[FieldKind] = match fields.len() {
        5 => &[
            FieldKind::Minute,
            FieldKind::Hour,
            FieldKind::DayOfMonth,
            FieldKind::Month,
            FieldKind::DayOfWeek,
        ],
        6 => &[
            FieldKind::Second,
            FieldKind::Minute,
            FieldKind::Hour,
            FieldKind::DayOfMonth,
            FieldKind::Month,
            FieldKind::DayOfWeek,
        ],
        7 => &[
            FieldKind::Second,
            FieldKind::Minute,
            FieldKind::Hour,
            FieldKind::DayOfMonth,
            FieldKind::Month,
            FieldKind::DayOfWeek,
            FieldKind::Year,
        ],
        n => {
            return Err(reject(
                format!("expected 5, 6 or 7 fields, got {n}"),
                Span::new(0, input.len()),
                input,
            ));
        }
    };

    let mut expr = CronExpression {
        seconds: CronField::Values(vec![CronValue::Value(0)]),
        minutes: CronField::All,
        hours: CronField::All,
        days_of_month: CronField::All,
        months: CronField::All,
        days_of_week: CronField::All,
        years: CronField::All,
        has_seconds: fields.len() >= 6,
        has_year: fields.len() == 7,
    };

    for (&(text, span), &kind) in fields.iter().zip(kinds) {
        let field = FieldParser { kind, span, input }.parse(text)?;
        match kind {
            FieldKind::Second => expr.seconds = field,
            FieldKind::Minute => expr.minutes = field,
            FieldKind::Hour => expr.hours = field,
            FieldKind::DayOfMonth => expr.days_of_month = field,
            FieldKind::Month => expr.months = field,
            FieldKind::DayOfWeek => expr.days_of_week = field,
            FieldKind::Year => expr.years = field,
        }
    }
    Ok(expr)
}

struct FieldParser<'a> {
    kind: FieldKind,
    span: Span,
    input: &'a str,
}

impl FieldParser<'_> {
    fn error(&self, message: String) -> ScheduleError {
        reject(message, self.span, self.input)
    }

    fn parse(&self, text: &str) -> Result<CronField, ScheduleError> {
        if text == "*" {
            return Ok(CronField::All);
        }
        if text == "?" {
            if self.kind.allows_question() {
                return Ok(CronField::All);
            }
            return Err(self.error(format!(
                "'?' is not allowed in the {} field",
                self.kind.name()
            )));
        }

        let mut plain = BTreeSet::new();
        let mut specials: Vec<CronValue> = Vec::new();

        for part in text.split(',') {
            if part.is_empty() {
                return Err(self.error(format!("empty list item in '{text}'")));
            }
            let upper = part.to_ascii_uppercase();
            if let Some(special) = self.parse_special(&upper)? {
                if !specials.contains(&special) {
                    specials.push(special);
                }
                continue;
            }

            let (range, step) = match upper.split_once('/') {
                Some((range, step)) => (range, Some(self.parse_step(step)?)),
                None => (upper.as_str(), None),
            };
            let (lo, hi) = if range == "*" {
                (self.kind.min(), self.kind.stored_max())
            } else if let Some((a, b)) = range.split_once('-') {
                let (lo, hi) = (self.parse_value(a)?, self.parse_value(b)?);
                if lo > hi {
                    return Err(self.error(format!("range must ascend: {part}")));
                }
                (lo, hi)
            } else {
                let v = self.parse_value(range)?;
                match step {
                    Some(_) => (v, self.kind.stored_max().max(v)),
                    None => (v, v),
                }
            };

            let step = usize::from(step.unwrap_or(1));
            for v in (lo..=hi).step_by(step) {
                plain.insert(self.kind.normalize(v));
            }
        }

        let full = (self.kind.min()..=self.kind.stored_max()).all(|v| plain.contains(&v));
        if full && specials.is_empty() {
            return Ok(CronField::All);
        }

        let mut values: Vec<CronValue> = plain.into_iter().map(CronValue::Value).collect();
        values.extend(specials);
        Ok(CronField::Values(values))
    }

    fn parse_step(&self, text: &str) -> Result<u16, ScheduleError> {
        match text.parse::<u16>() {
            Ok(0) => Err(self.error("step must be at least 1".into())),
            Ok(n) => Ok(n),
            Err(_) => Err(self.error(format!("invalid step '{text}'"))),
        }
    }

    fn parse_value(&self, text: &str) -> Result<u16, ScheduleError> {
        let named = match self.kind {
            FieldKind::Month => parse_month_name(text).map(|m| u16::from(m.number())),
            FieldKind::DayOfWeek => parse_weekday_name(text).map(|d| u16::from(d.cron_number())),
            _ => None,
        };
        if let Some(v) = named {
            return Ok(v);
        }

        let v: u16 = text.parse().map_err(|_| {
            self.error(format!("invalid {} value '{text}'", self.kind.name()))
        })?;
        if v < self.kind.min() || v > self.kind.max() {
            return Err(self.error(format!(
                "{} value out of range: {v} (expected {}-{})",
                self.kind.name(),
                self.kind.min(),
                self.kind.max()
            )));
        }
        Ok(v)
    }

    fn parse_weekday(&self, text: &str) -> Result<Weekday, ScheduleError> {
        let n = self.parse_value(text)?;
        u8::try_from(n)
            .ok()
            .and_then(Weekday::from_cron_number)
            .ok_or_else(|| self.error(format!("invalid day-of-week value '{text}'")))
    }

    /// Day tokens: `L`, `LW`, `L-n`, `nW` in day-of-month; `nL`, `n#m` in
    /// day-of-week. `None` means the token is not special.
    fn parse_special(&self, token: &str) -> Result<Option<CronValue>, ScheduleError> {
        match self.kind {
            FieldKind::DayOfMonth => {
                if token == "L" {
                    return Ok(Some(CronValue::Last));
                }
                if token == "LW" {
                    return Ok(Some(CronValue::LastWeekday));
                }
                if let Some(offset) = token.strip_prefix("L-") {
                    return match offset.parse::<u8>() {
                        Ok(0) => Ok(Some(CronValue::Last)),
                        Ok(n) if n <= 30 => Ok(Some(CronValue::LastMinus(n))),
                        _ => Err(self.error(format!(
                            "invalid last-day offset '{offset}' (expected 0-30)"
                        ))),
                    };
                }
                if let Some(day) = token.strip_suffix('W') {
                    let day = self.parse_value(day)?;
                    // parse_value bounds day to 1..=31.
                    return Ok(Some(CronValue::NearestWeekday(day as u8)));
                }
                Ok(None)
            }
            FieldKind::DayOfWeek => {
                if let Some((day, nth)) = token.split_once('#') {
                    let weekday = self.parse_weekday(day)?;
                    return match nth.parse::<u8>() {
                        Ok(n @ 1..=5) => Ok(Some(CronValue::NthOfWeekday(weekday, n))),
                        _ => Err(self.error(format!(
                            "invalid weekday occurrence '{nth}' (expected 1-5)"
                        ))),
                    };
                }
                if token.len() > 1 {
                    if let Some(day) = token.strip_suffix('L') {
                        return Ok(Some(CronValue::LastOfWeekday(self.parse_weekday(day)?)));
                    }
                }
                if token == "L" {
                    return Err(self.error("'L' alone is not supported in day-of-week".into()));
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}
