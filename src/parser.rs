// Parser for RFC 5545 RRULE text (`KEY=VALUE;KEY=VALUE`).
//
// Validation happens here so that a rule that reaches evaluation is always
// well formed: duplicate keys, UNTIL together with COUNT, unknown keys,
// out-of-range values and malformed BYDAY tokens are all rejected.

use std::collections::HashMap;

use crate::ast::*;
use crate::builder::{self, RangeCheck, RuleBuilder};
use crate::error::{ScheduleError, Span};
use crate::lexer::{self, Lexer, Property};

const PREFIX: &str = "RRULE:";

struct Parser<'a> {
    properties: &'a [Property],
    input: &'a str,
}

impl<'a> Parser<'a> {
    fn new(properties: &'a [Property], input: &'a str) -> Self {
        Self { properties, input }
    }

    fn error(&self, message: String, span: Span) -> ScheduleError {
        tracing::debug!(%span, %message, "rejecting rrule");
        ScheduleError::rule(message, span, self.input)
    }

    fn whole_span(&self) -> Span {
        Span::new(0, self.input.len())
    }

    fn parse_rule(&self) -> Result<RecurrenceRule, ScheduleError> {
        self.check_duplicates()?;

        let freq = self
            .properties
            .iter()
            .find(|p| p.name == "FREQ")
            .ok_or_else(|| self.error("missing FREQ".into(), self.whole_span()))?;
        let frequency = parse_frequency(&freq.value)
            .ok_or_else(|| self.error(format!("unknown FREQ '{}'", freq.value), freq.span))?;

        let mut builder = RuleBuilder::new(frequency);
        let mut count_span = None;
        let mut until_span = None;

        for prop in self.properties {
            builder = match prop.name.as_str() {
                "FREQ" => builder,
                "INTERVAL" => {
                    let interval: u32 = self.parse_number(prop)?;
                    if interval == 0 {
                        return Err(self.error("INTERVAL must be at least 1".into(), prop.span));
                    }
                    builder.interval(interval)
                }
                "COUNT" => {
                    count_span = Some(prop.span);
                    builder.count(self.parse_number(prop)?)
                }
                "UNTIL" => {
                    until_span = Some(prop.span);
                    let until = lexer::parse_timestamp(&prop.value).ok_or_else(|| {
                        self.error(format!("invalid UNTIL timestamp '{}'", prop.value), prop.span)
                    })?;
                    builder.until(until)
                }
                "WKST" => builder.week_start(self.parse_weekday(prop, &prop.value)?),
                "BYMONTH" => {
                    let months: Vec<u8> = self.parse_list(prop, builder::BY_MONTH)?;
                    builder.by_months(months.into_iter().filter_map(Month::from_number))
                }
                "BYYEARDAY" => {
                    self.require(prop, frequency == Frequency::Yearly)?;
                    builder.by_year_days(self.parse_list::<i16>(prop, builder::BY_YEAR_DAY)?)
                }
                "BYMONTHDAY" => {
                    self.require(prop, frequency != Frequency::Weekly)?;
                    builder.by_month_days(self.parse_list::<i8>(prop, builder::BY_MONTH_DAY)?)
                }
                "BYDAY" => builder.by_week_days(self.parse_by_day(prop, frequency)?),
                "BYHOUR" => builder.by_hours(self.parse_list::<u8>(prop, builder::BY_HOUR)?),
                "BYMINUTE" => builder.by_minutes(self.parse_list::<u8>(prop, builder::BY_MINUTE)?),
                "BYSECOND" => builder.by_seconds(self.parse_list::<u8>(prop, builder::BY_SECOND)?),
                "BYSETPOS" => builder.by_set_positions(self.parse_list::<i16>(prop, builder::BY_SET_POS)?),
                other => {
                    return Err(self.error(format!("unknown property '{other}'"), prop.span));
                }
            };
        }

        if let (Some(a), Some(b)) = (count_span, until_span) {
            let span = if a.start > b.start { a } else { b };
            return Err(self.error("UNTIL and COUNT are mutually exclusive".into(), span));
        }

        // Every check `build` performs has already been made above with a
        // span; anything left is reported against the whole rule.
        builder
            .build()
            .map_err(|e| self.error(e.to_string(), self.whole_span()))
    }

    fn check_duplicates(&self) -> Result<(), ScheduleError> {
        let mut seen: HashMap<&str, Span> = HashMap::new();
        for prop in self.properties {
            if seen.insert(prop.name.as_str(), prop.span).is_some() {
                return Err(self.error(format!("duplicate property '{}'", prop.name), prop.span));
            }
        }
        Ok(())
    }

    fn require(&self, prop: &Property, allowed: bool) -> Result<(), ScheduleError> {
        if allowed {
            return Ok(());
        }
        let freq = self
            .properties
            .iter()
            .find(|p| p.name == "FREQ")
            .map(|p| p.value.to_ascii_uppercase())
            .unwrap_or_default();
        Err(self.error(
            format!("{} is not allowed with FREQ={freq}", prop.name),
            prop.span,
        ))
    }

    fn parse_number<T: std::str::FromStr>(&self, prop: &Property) -> Result<T, ScheduleError> {
        prop.value.parse().map_err(|_| {
            self.error(
                format!("invalid {} value '{}'", prop.name, prop.value),
                prop.span,
            )
        })
    }

    fn parse_list<T: TryFrom<i32>>(
        &self,
        prop: &Property,
        check: RangeCheck,
    ) -> Result<Vec<T>, ScheduleError> {
        prop.value
            .split(',')
            .map(|item| {
                let item = item.trim();
                let value: i32 = item.parse().map_err(|_| {
                    self.error(format!("invalid {} value '{item}'", prop.name), prop.span)
                })?;
                check.check(value).map_err(|m| self.error(m, prop.span))?;
                T::try_from(value).map_err(|_| {
                    self.error(format!("invalid {} value '{item}'", prop.name), prop.span)
                })
            })
            .collect()
    }

    fn parse_weekday(&self, prop: &Property, token: &str) -> Result<Weekday, ScheduleError> {
        parse_rrule_weekday(token).ok_or_else(|| {
            self.error(
                format!("invalid weekday '{token}' in {} (expected MO..SU)", prop.name),
                prop.span,
            )
        })
    }

    fn parse_by_day(
        &self,
        prop: &Property,
        frequency: Frequency,
    ) -> Result<Vec<ByDaySelector>, ScheduleError> {
        prop.value
            .split(',')
            .map(|item| {
                let item = item.trim();
                if item.len() < 2 || !item.is_ascii() {
                    return Err(self.error(format!("invalid BYDAY value '{item}'"), prop.span));
                }
                let (ordinal, day) = item.split_at(item.len() - 2);
                let weekday = self.parse_weekday(prop, day)?;
                if ordinal.is_empty() {
                    return Ok(ByDaySelector::every(weekday));
                }

                let n: i32 = ordinal.parse().map_err(|_| {
                    self.error(format!("invalid BYDAY value '{item}'"), prop.span)
                })?;
                builder::BY_DAY_ORDINAL
                    .check(n)
                    .map_err(|m| self.error(m, prop.span))?;
                if !frequency.allows_ordinal_weekdays() {
                    return Err(self.error(
                        format!(
                            "BYDAY ordinals are not allowed with FREQ={}",
                            frequency.as_str()
                        ),
                        prop.span,
                    ));
                }
                // BY_DAY_ORDINAL keeps n within i8.
                Ok(ByDaySelector::nth(weekday, n as i8))
            })
            .collect()
    }
}

/// Parse RRULE text into a rule.
pub fn parse(input: &str) -> Result<RecurrenceRule, ScheduleError> {
    if input.trim().is_empty() {
        return Err(ScheduleError::argument("rule text is empty"));
    }

    let offset = input
        .get(..PREFIX.len())
        .filter(|p| p.eq_ignore_ascii_case(PREFIX))
        .map_or(0, str::len);
    let body = &input[offset..];

    let mut properties = Lexer::new(body)
        .tokenize()
        .map_err(|e| relocate(e, offset, input))?;
    for prop in &mut properties {
        prop.span = prop.span.offset(offset);
    }
    if properties.is_empty() {
        return Err(ScheduleError::rule("missing FREQ", Span::new(0, input.len()), input));
    }

    Parser::new(&properties, input).parse_rule()
}

/// Re-anchor a lexer error produced on the prefix-less body.
fn relocate(err: ScheduleError, offset: usize, input: &str) -> ScheduleError {
    match err {
        ScheduleError::Rule { message, span, .. } => {
            ScheduleError::rule(message, span.offset(offset), input)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err_message(input: &str) -> String {
        parse(input).unwrap_err().to_string()
    }

    #[test]
    fn test_parse_daily_count() {
        let rule = parse("FREQ=DAILY;COUNT=3").unwrap();
        assert_eq!(rule.frequency(), Frequency::Daily);
        assert_eq!(rule.count(), Some(3));
        assert_eq!(rule.interval(), 1);
    }

    #[test]
    fn test_parse_case_insensitive_with_prefix() {
        let rule = parse("rrule:freq=weekly;byday=mo,we;wkst=su").unwrap();
        assert_eq!(rule.frequency(), Frequency::Weekly);
        assert_eq!(rule.week_start(), Weekday::Sunday);
        assert_eq!(
            rule.kind().week_days(),
            vec![
                ByDaySelector::every(Weekday::Monday),
                ByDaySelector::every(Weekday::Wednesday)
            ]
        );
    }

    #[test]
    fn test_parse_monthly_ordinals() {
        let rule = parse("FREQ=MONTHLY;BYDAY=1FR,-1SU,+2MO").unwrap();
        assert_eq!(
            rule.kind().week_days(),
            vec![
                ByDaySelector::nth(Weekday::Friday, 1),
                ByDaySelector::nth(Weekday::Sunday, -1),
                ByDaySelector::nth(Weekday::Monday, 2),
            ]
        );
    }

    #[test]
    fn test_parse_until_forms() {
        let expected: jiff::civil::DateTime = "1997-12-24T00:00:00".parse().unwrap();
        for text in [
            "FREQ=DAILY;UNTIL=19971224T000000Z",
            "FREQ=DAILY;UNTIL=1997-12-24T00:00:00",
            "FREQ=DAILY;UNTIL=19971224",
        ] {
            assert_eq!(parse(text).unwrap().until(), Some(expected), "{text}");
        }
    }

    #[test]
    fn test_parse_all_frequencies() {
        for freq in [
            "SECONDLY", "MINUTELY", "HOURLY", "DAILY", "WEEKLY", "MONTHLY", "YEARLY",
        ] {
            let rule = parse(&format!("FREQ={freq}")).unwrap();
            assert_eq!(rule.frequency().as_str(), freq);
        }
    }

    #[test]
    fn test_duplicate_property() {
        let err = parse("FREQ=DAILY;COUNT=2;COUNT=3").unwrap_err();
        assert_eq!(err.to_string(), "duplicate property 'COUNT'");
        assert_eq!(err.span(), Some(Span::new(19, 26)));
    }

    #[test]
    fn test_until_and_count() {
        assert_eq!(
            err_message("FREQ=DAILY;UNTIL=19971224T000000Z;COUNT=3"),
            "UNTIL and COUNT are mutually exclusive"
        );
    }

    #[test]
    fn test_missing_and_unknown_freq() {
        assert_eq!(err_message("COUNT=3"), "missing FREQ");
        assert_eq!(err_message("FREQ=FORTNIGHTLY"), "unknown FREQ 'FORTNIGHTLY'");
    }

    #[test]
    fn test_unknown_property() {
        assert_eq!(
            err_message("FREQ=DAILY;BYWHATEVER=1"),
            "unknown property 'BYWHATEVER'"
        );
    }

    #[test]
    fn test_out_of_range_values() {
        assert!(err_message("FREQ=MONTHLY;BYMONTHDAY=32").contains("BYMONTHDAY value out of range"));
        assert!(err_message("FREQ=MONTHLY;BYMONTHDAY=0").contains("BYMONTHDAY"));
        assert!(err_message("FREQ=DAILY;BYSECOND=61").contains("BYSECOND"));
        assert!(err_message("FREQ=DAILY;BYHOUR=24").contains("BYHOUR"));
        assert!(err_message("FREQ=DAILY;BYMINUTE=60").contains("BYMINUTE"));
        assert!(err_message("FREQ=YEARLY;BYMONTH=13").contains("BYMONTH"));
        assert!(err_message("FREQ=YEARLY;BYYEARDAY=367").contains("BYYEARDAY"));
        assert!(err_message("FREQ=DAILY;INTERVAL=0").contains("INTERVAL"));
        assert!(parse("FREQ=DAILY;BYSECOND=60").is_ok());
    }

    #[test]
    fn test_malformed_by_day() {
        assert!(err_message("FREQ=WEEKLY;BYDAY=XX").contains("invalid weekday"));
        assert!(err_message("FREQ=MONTHLY;BYDAY=ZFR").contains("invalid BYDAY"));
        assert!(err_message("FREQ=MONTHLY;BYDAY=F").contains("invalid BYDAY"));
        assert!(err_message("FREQ=MONTHLY;BYDAY=0FR").contains("ordinal"));
        assert!(err_message("FREQ=WEEKLY;BYDAY=2MO").contains("not allowed"));
    }

    #[test]
    fn test_frequency_specific_properties() {
        assert!(err_message("FREQ=MONTHLY;BYYEARDAY=1").contains("not allowed with FREQ=MONTHLY"));
        assert!(err_message("FREQ=WEEKLY;BYMONTHDAY=1").contains("not allowed with FREQ=WEEKLY"));
        assert!(parse("FREQ=YEARLY;BYYEARDAY=1,-1").is_ok());
    }

    #[test]
    fn test_empty_input_is_argument_error() {
        assert!(matches!(parse("  "), Err(ScheduleError::Argument { .. })));
    }

    #[test]
    fn test_prefix_spans_point_into_full_input() {
        let err = parse("RRULE:FREQ=DAILY;FOO=1").unwrap_err();
        assert_eq!(err.span(), Some(Span::new(17, 22)));
    }

    #[test]
    fn test_bad_timestamp() {
        assert!(err_message("FREQ=DAILY;UNTIL=soon").contains("invalid UNTIL"));
    }
}
