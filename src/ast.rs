use jiff::civil::DateTime;

/// A parsed recurrence rule: frequency payload plus the shared modifiers.
///
/// Rules are values. They are built once (by [`RecurrenceRule::parse`] or
/// [`RecurrenceRule::builder`]) and never change afterwards, so a rule can be
/// shared freely between threads while each caller pulls its own
/// [`Occurrences`](crate::eval::Occurrences).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub(crate) interval: u32,
    pub(crate) termination: Option<Termination>,
    pub(crate) week_start: Weekday,
    pub(crate) by_set_positions: Vec<i16>,
    pub(crate) kind: RuleKind,
}

impl RecurrenceRule {
    pub fn frequency(&self) -> Frequency {
        self.kind.frequency()
    }

    /// Step multiplier applied to the base frequency (always >= 1).
    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    /// Maximum number of occurrences, if the rule is bounded by `COUNT`.
    pub fn count(&self) -> Option<u32> {
        match self.termination {
            Some(Termination::Count(n)) => Some(n),
            _ => None,
        }
    }

    /// Inclusive end of the rule, if bounded by `UNTIL`.
    pub fn until(&self) -> Option<DateTime> {
        match self.termination {
            Some(Termination::Until(dt)) => Some(dt),
            _ => None,
        }
    }

    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    pub fn by_set_positions(&self) -> &[i16] {
        &self.by_set_positions
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }
}

/// How a rule ends. Absent means the rule is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Stop after this many occurrences.
    Count(u32),
    /// Stop after the last occurrence that is `<=` this timestamp.
    Until(DateTime),
}

/// The frequency-specific half of a rule.
///
/// Each variant carries only the filters that make sense for it, so e.g. a
/// weekly rule cannot hold `BYYEARDAY` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    Secondly(DayFilters),
    Minutely(DayFilters),
    Hourly(DayFilters),
    Daily(DayFilters),
    Weekly(WeeklyFilters),
    Monthly(MonthlyFilters),
    Yearly(YearlyFilters),
}

impl RuleKind {
    pub fn frequency(&self) -> Frequency {
        match self {
            Self::Secondly(_) => Frequency::Secondly,
            Self::Minutely(_) => Frequency::Minutely,
            Self::Hourly(_) => Frequency::Hourly,
            Self::Daily(_) => Frequency::Daily,
            Self::Weekly(_) => Frequency::Weekly,
            Self::Monthly(_) => Frequency::Monthly,
            Self::Yearly(_) => Frequency::Yearly,
        }
    }

    pub fn months(&self) -> &[Month] {
        match self {
            Self::Secondly(f) | Self::Minutely(f) | Self::Hourly(f) | Self::Daily(f) => &f.months,
            Self::Weekly(f) => &f.months,
            Self::Monthly(f) => &f.months,
            Self::Yearly(f) => &f.months,
        }
    }

    pub fn month_days(&self) -> &[i8] {
        match self {
            Self::Secondly(f) | Self::Minutely(f) | Self::Hourly(f) | Self::Daily(f) => {
                &f.month_days
            }
            Self::Weekly(_) => &[],
            Self::Monthly(f) => &f.month_days,
            Self::Yearly(f) => &f.month_days,
        }
    }

    pub fn year_days(&self) -> &[i16] {
        match self {
            Self::Yearly(f) => &f.year_days,
            _ => &[],
        }
    }

    /// `BYDAY` entries as selectors; plain weekdays have no ordinal.
    pub fn week_days(&self) -> Vec<ByDaySelector> {
        match self {
            Self::Secondly(f) | Self::Minutely(f) | Self::Hourly(f) | Self::Daily(f) => {
                f.week_days.iter().copied().map(ByDaySelector::every).collect()
            }
            Self::Weekly(f) => f.week_days.iter().copied().map(ByDaySelector::every).collect(),
            Self::Monthly(f) => f.week_days.clone(),
            Self::Yearly(f) => f.week_days.clone(),
        }
    }

    pub fn time(&self) -> &TimeFilters {
        match self {
            Self::Secondly(f) | Self::Minutely(f) | Self::Hourly(f) | Self::Daily(f) => &f.time,
            Self::Weekly(f) => &f.time,
            Self::Monthly(f) => &f.time,
            Self::Yearly(f) => &f.time,
        }
    }
}

/// `BYHOUR` / `BYMINUTE` / `BYSECOND` lists.
///
/// Whether a list limits or expands depends on the frequency: on daily and
/// coarser rules all three expand each candidate day, on sub-daily rules the
/// lists at or above the frequency's own unit limit instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeFilters {
    pub hours: Vec<u8>,
    pub minutes: Vec<u8>,
    pub seconds: Vec<u8>,
}

impl TimeFilters {
    pub fn is_empty(&self) -> bool {
        self.hours.is_empty() && self.minutes.is_empty() && self.seconds.is_empty()
    }
}

/// Filters for secondly, minutely, hourly and daily rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayFilters {
    pub months: Vec<Month>,
    pub month_days: Vec<i8>,
    pub week_days: Vec<Weekday>,
    pub time: TimeFilters,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyFilters {
    pub months: Vec<Month>,
    pub week_days: Vec<Weekday>,
    pub time: TimeFilters,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthlyFilters {
    pub months: Vec<Month>,
    pub month_days: Vec<i8>,
    pub week_days: Vec<ByDaySelector>,
    pub time: TimeFilters,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearlyFilters {
    pub months: Vec<Month>,
    pub year_days: Vec<i16>,
    pub month_days: Vec<i8>,
    pub week_days: Vec<ByDaySelector>,
    pub time: TimeFilters,
}

/// Recurrence frequency (`FREQ`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Secondly => "SECONDLY",
            Self::Minutely => "MINUTELY",
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// True for the frequencies whose `BYDAY` may carry an ordinal.
    pub fn allows_ordinal_weekdays(self) -> bool {
        matches!(self, Self::Monthly | Self::Yearly)
    }
}

pub fn parse_frequency(s: &str) -> Option<Frequency> {
    match s.to_ascii_uppercase().as_str() {
        "SECONDLY" => Some(Frequency::Secondly),
        "MINUTELY" => Some(Frequency::Minutely),
        "HOURLY" => Some(Frequency::Hourly),
        "DAILY" => Some(Frequency::Daily),
        "WEEKLY" => Some(Frequency::Weekly),
        "MONTHLY" => Some(Frequency::Monthly),
        "YEARLY" => Some(Frequency::Yearly),
        _ => None,
    }
}

/// A `BYDAY` entry: a weekday plus an optional ordinal within the period.
///
/// `ordinal: None` selects every such weekday, `Some(2)` the second one and
/// `Some(-1)` the last one. Equality and hashing are by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ByDaySelector {
    pub weekday: Weekday,
    pub ordinal: Option<i8>,
}

impl ByDaySelector {
    pub fn every(weekday: Weekday) -> Self {
        Self {
            weekday,
            ordinal: None,
        }
    }

    pub fn nth(weekday: Weekday, ordinal: i8) -> Self {
        Self {
            weekday,
            ordinal: Some(ordinal),
        }
    }
}

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Two-letter RFC 5545 token.
    pub fn rrule_token(self) -> &'static str {
        match self {
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
            Self::Sunday => "SU",
        }
    }

    pub fn to_jiff(self) -> jiff::civil::Weekday {
        match self {
            Self::Monday => jiff::civil::Weekday::Monday,
            Self::Tuesday => jiff::civil::Weekday::Tuesday,
            Self::Wednesday => jiff::civil::Weekday::Wednesday,
            Self::Thursday => jiff::civil::Weekday::Thursday,
            Self::Friday => jiff::civil::Weekday::Friday,
            Self::Saturday => jiff::civil::Weekday::Saturday,
            Self::Sunday => jiff::civil::Weekday::Sunday,
        }
    }

    pub fn from_jiff(wd: jiff::civil::Weekday) -> Self {
        match wd {
            jiff::civil::Weekday::Monday => Self::Monday,
            jiff::civil::Weekday::Tuesday => Self::Tuesday,
            jiff::civil::Weekday::Wednesday => Self::Wednesday,
            jiff::civil::Weekday::Thursday => Self::Thursday,
            jiff::civil::Weekday::Friday => Self::Friday,
            jiff::civil::Weekday::Saturday => Self::Saturday,
            jiff::civil::Weekday::Sunday => Self::Sunday,
        }
    }

    /// ISO 8601 day number: Monday=1, Sunday=7.
    pub fn number(self) -> u8 {
        match self {
            Self::Monday => 1,
            Self::Tuesday => 2,
            Self::Wednesday => 3,
            Self::Thursday => 4,
            Self::Friday => 5,
            Self::Saturday => 6,
            Self::Sunday => 7,
        }
    }

    /// Cron day number: Sunday=0, Saturday=6.
    pub fn cron_number(self) -> u8 {
        self.number() % 7
    }

    /// Accepts 0..=7, where both 0 and 7 are Sunday.
    pub fn from_cron_number(n: u8) -> Option<Self> {
        match n {
            0 | 7 => Some(Self::Sunday),
            1 => Some(Self::Monday),
            2 => Some(Self::Tuesday),
            3 => Some(Self::Wednesday),
            4 => Some(Self::Thursday),
            5 => Some(Self::Friday),
            6 => Some(Self::Saturday),
            _ => None,
        }
    }

    /// Days from `start` forward to `self` (0..=6).
    pub fn days_since(self, start: Weekday) -> u8 {
        (self.number() + 7 - start.number()) % 7
    }
}

/// Parse a two-letter RFC 5545 weekday token (`MO`, `TU`, ...).
pub fn parse_rrule_weekday(s: &str) -> Option<Weekday> {
    match s.to_ascii_uppercase().as_str() {
        "MO" => Some(Weekday::Monday),
        "TU" => Some(Weekday::Tuesday),
        "WE" => Some(Weekday::Wednesday),
        "TH" => Some(Weekday::Thursday),
        "FR" => Some(Weekday::Friday),
        "SA" => Some(Weekday::Saturday),
        "SU" => Some(Weekday::Sunday),
        _ => None,
    }
}

/// Parse a three-letter cron weekday name (`SUN`..`SAT`).
pub fn parse_weekday_name(s: &str) -> Option<Weekday> {
    match s.to_ascii_uppercase().as_str() {
        "MON" => Some(Weekday::Monday),
        "TUE" => Some(Weekday::Tuesday),
        "WED" => Some(Weekday::Wednesday),
        "THU" => Some(Weekday::Thursday),
        "FRI" => Some(Weekday::Friday),
        "SAT" => Some(Weekday::Saturday),
        "SUN" => Some(Weekday::Sunday),
        _ => None,
    }
}

/// Month of the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    /// Three-letter upper-case name as used in cron text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::January => "JAN",
            Self::February => "FEB",
            Self::March => "MAR",
            Self::April => "APR",
            Self::May => "MAY",
            Self::June => "JUN",
            Self::July => "JUL",
            Self::August => "AUG",
            Self::September => "SEP",
            Self::October => "OCT",
            Self::November => "NOV",
            Self::December => "DEC",
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::January => 1,
            Self::February => 2,
            Self::March => 3,
            Self::April => 4,
            Self::May => 5,
            Self::June => 6,
            Self::July => 7,
            Self::August => 8,
            Self::September => 9,
            Self::October => 10,
            Self::November => 11,
            Self::December => 12,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::January),
            2 => Some(Self::February),
            3 => Some(Self::March),
            4 => Some(Self::April),
            5 => Some(Self::May),
            6 => Some(Self::June),
            7 => Some(Self::July),
            8 => Some(Self::August),
            9 => Some(Self::September),
            10 => Some(Self::October),
            11 => Some(Self::November),
            12 => Some(Self::December),
            _ => None,
        }
    }
}

/// Parse a three-letter month name (`JAN`..`DEC`), case-insensitively.
pub fn parse_month_name(s: &str) -> Option<Month> {
    match s.to_ascii_uppercase().as_str() {
        "JAN" => Some(Month::January),
        "FEB" => Some(Month::February),
        "MAR" => Some(Month::March),
        "APR" => Some(Month::April),
        "MAY" => Some(Month::May),
        "JUN" => Some(Month::June),
        "JUL" => Some(Month::July),
        "AUG" => Some(Month::August),
        "SEP" => Some(Month::September),
        "OCT" => Some(Month::October),
        "NOV" => Some(Month::November),
        "DEC" => Some(Month::December),
        _ => None,
    }
}
