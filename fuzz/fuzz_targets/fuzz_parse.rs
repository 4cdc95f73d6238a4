#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Parsing never panics, only returns Ok or Err
        let _ = recur::RecurrenceRule::parse(s);
        let _ = recur::CronExpression::parse(s);
    }
});
