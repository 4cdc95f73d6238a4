#![no_main]
use libfuzzer_sys::fuzz_target;
use recur::{CronExpression, RecurrenceRule};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(rule) = RecurrenceRule::parse(s) {
        let displayed = rule.to_string();
        let reparsed = RecurrenceRule::parse(&displayed).expect("display output must be parseable");
        assert_eq!(reparsed, rule, "rrule roundtrip changed the rule");
    }

    if let Ok(cron) = CronExpression::parse(s) {
        let displayed = cron.to_string();
        let reparsed = CronExpression::parse(&displayed).expect("display output must be parseable");
        assert_eq!(reparsed, cron, "cron roundtrip changed the expression");

        let start = jiff::civil::date(2026, 1, 1).at(0, 0, 0, 0);
        if let Some(next) = cron.next_from(start) {
            assert!(next >= start && cron.matches(next), "next_from returned a non-match");
        }
    }
});
