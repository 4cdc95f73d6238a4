//! Cron walkthrough: fields, aliases, specials and the canonical form.

use jiff::civil::DateTime;
use recur::CronExpression;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let start: DateTime = "2024-01-06T12:00:00".parse()?;

    for text in [
        "*/15 9-17 * * MON-FRI",
        "@monthly",
        "0 0 12 LW * ?",
        "0 30 8 ? * 5L",
        "0 0 0 29 2 ? 2024-2040",
    ] {
        let cron = CronExpression::parse(text)?;
        println!("{text:<24} -> {cron}");
        for dt in cron.occurrences(start).take(3) {
            println!("  {dt}");
        }
    }

    let cron: CronExpression = "0 9 * * 1-5".parse()?;
    let monday: DateTime = "2024-01-08T09:00:00".parse()?;
    println!("\n{monday} matches '{cron}': {}", cron.matches(monday));

    Ok(())
}
