//! RRULE walkthrough: parse, iterate, bound, display.

use jiff::civil::DateTime;
use recur::{ByDaySelector, Frequency, RecurrenceRule, Weekday};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse a rule; an "RRULE:" prefix is accepted
    let rule: RecurrenceRule = "RRULE:FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1".parse()?;
    println!("Parsed: {rule}");

    // Last workday of each month, starting from a fixed instant
    let start: DateTime = "2025-06-15T17:00:00".parse()?;
    println!("\nNext 5 occurrences from {start}:");
    for dt in rule.occurrences(start).take(5) {
        println!("  {dt}");
    }

    // A window, inclusive at both ends
    let to: DateTime = "2025-12-31T23:59:59".parse()?;
    println!("\nUntil year end: {}", rule.between(start, to).count());

    // Build the same kind of rule in code
    let rule = RecurrenceRule::builder(Frequency::Weekly)
        .interval(2)
        .count(4)
        .by_week_days([Weekday::Tuesday, Weekday::Thursday].map(ByDaySelector::every))
        .build()?;
    println!("\nBuilt: {rule}");
    for dt in rule.occurrences(start) {
        println!("  {dt}");
    }

    // Errors carry the offending span
    if let Err(e) = RecurrenceRule::parse("FREQ=DAILY;COUNT=3;UNTIL=20250101") {
        println!("\n{}", e.display_rich());
    }

    Ok(())
}
