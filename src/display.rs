use std::fmt;

use crate::ast::*;
use crate::cron::{CronExpression, CronField, CronValue, FieldKind};

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency().as_str())?;

        if self.interval != 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        match self.termination {
            Some(Termination::Until(until)) => {
                write!(f, ";UNTIL={}", until.strftime("%Y%m%dT%H%M%S"))?
            }
            Some(Termination::Count(n)) => write!(f, ";COUNT={n}")?,
            None => {}
        }
        if self.week_start != Weekday::Monday {
            write!(f, ";WKST={}", self.week_start.rrule_token())?;
        }

        let kind = &self.kind;
        write_list(f, "BYMONTH", kind.months().iter().map(|m| m.number()))?;
        write_list(f, "BYYEARDAY", kind.year_days().iter())?;
        write_list(f, "BYMONTHDAY", kind.month_days().iter())?;
        write_list(f, "BYDAY", kind.week_days().iter())?;
        let time = kind.time();
        write_list(f, "BYHOUR", time.hours.iter())?;
        write_list(f, "BYMINUTE", time.minutes.iter())?;
        write_list(f, "BYSECOND", time.seconds.iter())?;
        write_list(f, "BYSETPOS", self.by_set_positions.iter())?;
        Ok(())
    }
}

fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    let mut items = items.peekable();
    if items.peek().is_none() {
        return Ok(());
    }
    write!(f, ";{name}=")?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for ByDaySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{n}")?;
        }
        write!(f, "{}", self.weekday.rrule_token())
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rrule_token())
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- cron ---

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_seconds {
            write_field(f, &self.seconds, FieldKind::Second)?;
            f.write_str(" ")?;
        }
        write_field(f, &self.minutes, FieldKind::Minute)?;
        f.write_str(" ")?;
        write_field(f, &self.hours, FieldKind::Hour)?;
        f.write_str(" ")?;
        write_field(f, &self.days_of_month, FieldKind::DayOfMonth)?;
        f.write_str(" ")?;
        write_field(f, &self.months, FieldKind::Month)?;
        f.write_str(" ")?;
        write_field(f, &self.days_of_week, FieldKind::DayOfWeek)?;
        if self.has_year {
            f.write_str(" ")?;
            write_field(f, &self.years, FieldKind::Year)?;
        }
        Ok(())
    }
}

/// Canonical field text: `*`, `*/n` for a full-range progression, otherwise
/// a list with consecutive runs of three or more collapsed to `a-b`, and any
/// special day tokens last.
fn write_field(f: &mut fmt::Formatter<'_>, field: &CronField, kind: FieldKind) -> fmt::Result {
    if *field == CronField::All {
        return f.write_str("*");
    }

    let plain: Vec<u16> = field.plain_values().collect();
    let mut parts: Vec<String> = Vec::new();

    if let Some(step) = full_range_step(&plain, kind) {
        parts.push(format!("*/{step}"));
    } else {
        let mut i = 0;
        while i < plain.len() {
            let mut j = i;
            while j + 1 < plain.len() && plain[j + 1] == plain[j] + 1 {
                j += 1;
            }
            if j - i >= 2 {
                parts.push(format!("{}-{}", plain[i], plain[j]));
            } else {
                parts.extend(plain[i..=j].iter().map(u16::to_string));
            }
            i = j + 1;
        }
    }

    parts.extend(field.specials().map(|v| v.to_string()));
    f.write_str(&parts.join(","))
}

/// The `n` for which `values` is exactly `min, min+n, min+2n, ...` up to the
/// field maximum, if any.
fn full_range_step(values: &[u16], kind: FieldKind) -> Option<u16> {
    let [first, second, ..] = values else {
        return None;
    };
    if *first != kind.min() {
        return None;
    }
    let step = second - first;
    if step < 2 {
        return None;
    }
    let expected = (kind.min()..=kind.stored_max()).step_by(usize::from(step));
    values.iter().copied().eq(expected).then_some(step)
}

impl fmt::Display for CronValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(n) => write!(f, "{n}"),
            Self::Last => f.write_str("L"),
            Self::LastMinus(n) => write!(f, "L-{n}"),
            Self::LastWeekday => f.write_str("LW"),
            Self::NearestWeekday(n) => write!(f, "{n}W"),
            Self::LastOfWeekday(wd) => write!(f, "{}L", wd.cron_number()),
            Self::NthOfWeekday(wd, n) => write!(f, "{}#{n}", wd.cron_number()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{cron, parser};

    fn rrule(input: &str) -> String {
        parser::parse(input).unwrap().to_string()
    }

    fn cron_text(input: &str) -> String {
        cron::parse(input).unwrap().to_string()
    }

    #[test]
    fn test_rrule_canonical_order() {
        assert_eq!(
            rrule("BYSETPOS=-1;BYDAY=MO,TU,WE,TH,FR;COUNT=3;FREQ=MONTHLY"),
            "FREQ=MONTHLY;COUNT=3;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1"
        );
        assert_eq!(
            rrule("freq=yearly;bysecond=0;byminute=30;byhour=9;bymonthday=1;byyearday=100;bymonth=3;wkst=su;interval=2"),
            "FREQ=YEARLY;INTERVAL=2;WKST=SU;BYMONTH=3;BYYEARDAY=100;BYMONTHDAY=1;BYHOUR=9;BYMINUTE=30;BYSECOND=0"
        );
    }

    #[test]
    fn test_rrule_omits_defaults() {
        assert_eq!(rrule("FREQ=DAILY;INTERVAL=1;WKST=MO"), "FREQ=DAILY");
    }

    #[test]
    fn test_rrule_until_format() {
        assert_eq!(
            rrule("FREQ=WEEKLY;UNTIL=1997-12-24T09:30:00Z"),
            "FREQ=WEEKLY;UNTIL=19971224T093000"
        );
        assert_eq!(
            rrule("FREQ=WEEKLY;UNTIL=19971224"),
            "FREQ=WEEKLY;UNTIL=19971224T000000"
        );
    }

    #[test]
    fn test_rrule_by_day_ordinals() {
        assert_eq!(
            rrule("FREQ=YEARLY;BYDAY=+20MO,-1SU"),
            "FREQ=YEARLY;BYDAY=20MO,-1SU"
        );
    }

    #[test]
    fn test_cron_canonical_form() {
        assert_eq!(cron_text("* * * * *"), "* * * * *");
        assert_eq!(cron_text("0,1,2,3,10 */6 * JAN-MAR MON-FRI"), "0-3,10 */6 * 1-3 1-5");
        assert_eq!(cron_text("0 0 ? * 7"), "0 0 * * 0");
        assert_eq!(cron_text("5,6 0 * * *"), "5,6 0 * * *");
        assert_eq!(cron_text("0 0 l,15w * *"), "0 0 L,15W * *");
        assert_eq!(cron_text("0 0 * * fri#3,5L"), "0 0 * * 5#3,5L");
        assert_eq!(cron_text("0/15 * * * * * 2030"), "*/15 * * * * * 2030");
        assert_eq!(cron_text("@hourly"), "0 * * * *");
    }

    #[test]
    fn test_cron_text_is_stable() {
        for input in [
            "*/7 1-5,9 L-3 */2 1#1",
            "0 0 12 LW * ?",
            "10-40/10 * * * SUN,SAT",
        ] {
            let once = cron_text(input);
            assert_eq!(cron_text(&once), once, "{input}");
        }
    }
}
