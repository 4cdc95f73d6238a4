//! Iterator behavior of `occurrences()`, `between()` and the cron sequence.
//!
//! These cover what the conformance fixtures cannot: laziness, early
//! termination, std::iter combinators and sharing a parsed value across
//! threads.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use jiff::civil::{date, DateTime, Weekday};
use recur::{CronExpression, RecurrenceRule, SearchLimits};

fn at(y: i16, m: i8, d: i8, h: i8, min: i8) -> DateTime {
    date(y, m, d).at(h, min, 0, 0)
}

fn daily() -> RecurrenceRule {
    RecurrenceRule::parse("FREQ=DAILY;BYHOUR=9;BYMINUTE=0;BYSECOND=0").unwrap()
}

// =============================================================================
// Laziness
// =============================================================================

#[test]
fn occurrences_is_lazy() {
    // Unbounded; creating the iterator must not evaluate anything.
    let rule = RecurrenceRule::parse("FREQ=SECONDLY").unwrap();
    let iter = rule.occurrences(at(2026, 2, 1, 0, 0));
    let first: Vec<_> = iter.take(1).collect();
    assert_eq!(first, vec![at(2026, 2, 1, 0, 0)]);
}

#[test]
fn between_is_lazy() {
    let rule = daily();
    let iter = rule.between(at(2026, 2, 1, 0, 0), at(2099, 12, 31, 23, 59));
    let first_three: Vec<_> = iter.take(3).collect();
    assert_eq!(first_three.len(), 3);
}

#[test]
fn cron_occurrences_is_lazy() {
    let cron = CronExpression::parse("* * * * * *").unwrap();
    let first: Vec<_> = cron.occurrences(at(2026, 2, 1, 0, 0)).take(2).collect();
    assert_eq!(
        first,
        vec![at(2026, 2, 1, 0, 0), date(2026, 2, 1).at(0, 0, 1, 0)]
    );
}

// =============================================================================
// Early termination
// =============================================================================

#[test]
fn occurrences_early_termination_with_take_while() {
    let rule = daily();
    let cutoff = at(2026, 2, 5, 0, 0);
    let results: Vec<_> = rule
        .occurrences(at(2026, 2, 1, 0, 0))
        .take_while(|dt| *dt < cutoff)
        .collect();
    // Feb 1, 2, 3, 4 at 09:00
    assert_eq!(results.len(), 4);
}

#[test]
fn occurrences_early_termination_with_find() {
    let rule = daily();
    let saturday = rule
        .occurrences(at(2026, 2, 1, 0, 0))
        .find(|dt| dt.weekday() == Weekday::Saturday)
        .unwrap();
    assert_eq!(saturday, at(2026, 2, 7, 9, 0));
}

#[test]
fn count_limited_rule_ends() {
    let rule = RecurrenceRule::parse("FREQ=WEEKLY;COUNT=4").unwrap();
    let mut iter = rule.occurrences(at(2026, 2, 1, 8, 0));
    assert_eq!(iter.by_ref().count(), 4);
    assert_eq!(iter.next(), None);
}

#[test]
fn until_limited_rule_ends() {
    let rule = RecurrenceRule::parse("FREQ=DAILY;UNTIL=20260203T080000").unwrap();
    let all: Vec<_> = rule.occurrences(at(2026, 2, 1, 8, 0)).collect();
    assert_eq!(
        all,
        vec![at(2026, 2, 1, 8, 0), at(2026, 2, 2, 8, 0), at(2026, 2, 3, 8, 0)]
    );
}

#[test]
fn cron_sequence_ends_at_year_ceiling() {
    let cron = CronExpression::parse("0 0 0 1 1 ? 2098-2099").unwrap();
    let all: Vec<_> = cron.occurrences(at(2026, 1, 1, 0, 0)).collect();
    assert_eq!(all, vec![at(2098, 1, 1, 0, 0), at(2099, 1, 1, 0, 0)]);
}

#[test]
fn cron_sequence_ends_when_search_limit_is_exhausted() {
    let cron = CronExpression::parse("0 0 30 2 *").unwrap();
    let mut iter = cron.occurrences_with_limits(at(2026, 1, 1, 0, 0), SearchLimits::new(10));
    assert_eq!(iter.next(), None);
    assert_eq!(iter.next(), None);
}

#[test]
fn unreachable_sub_daily_rules_end_promptly() {
    for text in [
        "FREQ=SECONDLY;BYSECOND=60",
        "FREQ=MINUTELY;INTERVAL=2;BYMINUTE=1",
        "FREQ=HOURLY;INTERVAL=2;BYHOUR=1,3,5",
    ] {
        let rule = RecurrenceRule::parse(text).unwrap();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(rule.occurrences(at(2024, 1, 1, 0, 0)).next());
        });
        let first = rx
            .recv_timeout(Duration::from_secs(5))
            .unwrap_or_else(|_| panic!("next() did not return for '{text}'"));
        assert_eq!(first, None, "{text}");
    }
}

#[test]
fn sparse_sub_daily_rule_finds_next_day() {
    let rule = RecurrenceRule::parse("FREQ=SECONDLY;BYHOUR=9;BYMINUTE=0;BYSECOND=0").unwrap();
    let got: Vec<_> = rule.occurrences(at(2024, 1, 1, 10, 0)).take(2).collect();
    assert_eq!(got, vec![at(2024, 1, 2, 9, 0), at(2024, 1, 3, 9, 0)]);
}

// =============================================================================
// Combinators
// =============================================================================

#[test]
fn occurrences_works_with_filter() {
    let weekends: Vec<_> = daily()
        .occurrences(at(2026, 2, 1, 0, 0))
        .take(14)
        .filter(|dt| matches!(dt.weekday(), Weekday::Saturday | Weekday::Sunday))
        .collect();
    // Feb 1 is a Sunday: Feb 1, 7, 8, 14
    assert_eq!(weekends.len(), 4);
}

#[test]
fn occurrences_works_with_map_and_skip() {
    let days: Vec<i8> = daily()
        .occurrences(at(2026, 2, 1, 0, 0))
        .skip(5)
        .take(3)
        .map(|dt| dt.day())
        .collect();
    assert_eq!(days, vec![6, 7, 8]);
}

#[test]
fn occurrences_zip_cron() {
    // Both describe every weekday at 09:00.
    let rule = RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;BYHOUR=9;BYMINUTE=0;BYSECOND=0")
        .unwrap();
    let cron = CronExpression::parse("0 9 * * MON-FRI").unwrap();
    let start = at(2026, 2, 1, 0, 0);
    for (a, b) in rule.occurrences(start).zip(cron.occurrences(start)).take(30) {
        assert_eq!(a, b);
    }
}

#[test]
fn between_works_with_count() {
    let count = daily()
        .between(at(2026, 2, 1, 0, 0), at(2026, 2, 10, 23, 59))
        .count();
    assert_eq!(count, 10);
}

#[test]
fn between_end_is_inclusive() {
    let rule = daily();
    let hits: Vec<_> = rule
        .between(at(2026, 2, 1, 0, 0), at(2026, 2, 3, 9, 0))
        .collect();
    assert_eq!(hits.last(), Some(&at(2026, 2, 3, 9, 0)));
    assert_eq!(hits.len(), 3);
}

#[test]
fn between_empty_when_to_precedes_from() {
    let rule = daily();
    assert_eq!(
        rule.between(at(2026, 2, 10, 0, 0), at(2026, 2, 1, 0, 0))
            .count(),
        0
    );
}

#[test]
fn next_n_matches_take() {
    let rule = daily();
    let start = at(2026, 2, 1, 0, 0);
    let via_take: Vec<_> = rule.occurrences(start).take(7).collect();
    assert_eq!(rule.next_n(start, 7), via_take);
}

// =============================================================================
// Independence and sharing
// =============================================================================

#[test]
fn iterators_are_independent() {
    let rule = daily();
    let start = at(2026, 2, 1, 0, 0);
    let mut a = rule.occurrences(start);
    let mut b = rule.occurrences(start);
    a.next();
    a.next();
    assert_eq!(b.next(), Some(at(2026, 2, 1, 9, 0)));
    assert_eq!(a.next(), Some(at(2026, 2, 3, 9, 0)));
}

#[test]
fn cloned_iterator_resumes_at_same_point() {
    let rule = RecurrenceRule::parse("FREQ=MONTHLY;BYDAY=-1FR").unwrap();
    let mut iter = rule.occurrences(at(2026, 1, 1, 12, 0));
    iter.next();
    let rest_a: Vec<_> = iter.clone().take(3).collect();
    let rest_b: Vec<_> = iter.take(3).collect();
    assert_eq!(rest_a, rest_b);
}

#[test]
fn parsed_values_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RecurrenceRule>();
    assert_send_sync::<CronExpression>();
    assert_send_sync::<recur::Occurrences<'static>>();
    assert_send_sync::<recur::CronOccurrences<'static>>();
}

#[test]
fn shared_rule_across_threads() {
    let rule = Arc::new(daily());
    let start = at(2026, 2, 1, 0, 0);
    let expected = rule.next_n(start, 20);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let rule = Arc::clone(&rule);
            thread::spawn(move || rule.next_n(start, 20))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn shared_cron_across_scoped_threads() {
    let cron = CronExpression::parse("*/10 * * * *").unwrap();
    let start = at(2026, 2, 1, 0, 0);
    let expected: Vec<_> = cron.occurrences(start).take(50).collect();

    thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| cron.occurrences(start).take(50).collect::<Vec<_>>()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
