//! Conformance runner driven by tests/fixtures/conformance.json.
//!
//! Every case runs; failures are collected and reported together.

use jiff::civil::DateTime;
use recur::{CronExpression, RecurrenceRule};
use serde_json::Value;

static FIXTURES: &str = include_str!("fixtures/conformance.json");

fn fixtures() -> Value {
    serde_json::from_str(FIXTURES).expect("tests/fixtures/conformance.json is invalid JSON")
}

fn parse_datetime(s: &str) -> DateTime {
    s.parse::<DateTime>()
        .unwrap_or_else(|e| panic!("bad timestamp '{s}': {e}"))
}

fn cases<'a>(root: &'a Value, path: &[&str]) -> &'a [Value] {
    let mut node = root;
    for key in path {
        node = &node[key];
    }
    node.as_array()
        .unwrap_or_else(|| panic!("missing array at {}", path.join(".")))
        .as_slice()
}

fn case_name(case: &Value, section: &str, index: usize) -> String {
    match case["name"].as_str() {
        Some(n) => format!("{section}.{n}"),
        None => format!("{section}[{index}]"),
    }
}

// ---------------------------------------------------------------------------
// FailCollector: run all cases, report all failures at the end
// ---------------------------------------------------------------------------

struct FailCollector {
    failures: Vec<String>,
    pass: usize,
}

impl FailCollector {
    fn new() -> Self {
        Self {
            failures: Vec::new(),
            pass: 0,
        }
    }

    fn fail(&mut self, name: &str, msg: String) {
        self.failures.push(format!("  FAIL {name}: {msg}"));
    }

    fn pass(&mut self) {
        self.pass += 1;
    }

    fn finish(self, label: &str) {
        if self.failures.is_empty() {
            eprintln!("{label}: {}/{} passed", self.pass, self.pass);
        } else {
            let total = self.pass + self.failures.len();
            let msg = format!(
                "{label}: {}/{total} passed, {} failed:\n{}",
                self.pass,
                self.failures.len(),
                self.failures.join("\n")
            );
            panic!("{msg}");
        }
    }
}

/// Shared checks for both families: parse to canonical text, re-parse the
/// canonical text to itself.
fn check_roundtrip<T: ToString>(
    fc: &mut FailCollector,
    name: &str,
    input: &str,
    canonical: &str,
    parse: impl Fn(&str) -> Result<T, recur::ScheduleError>,
) {
    let displayed = match parse(input) {
        Ok(v) => v.to_string(),
        Err(e) => return fc.fail(name, format!("parse failed: {e}")),
    };
    if displayed != canonical {
        return fc.fail(name, format!("got '{displayed}', expected '{canonical}'"));
    }
    match parse(canonical) {
        Ok(v) if v.to_string() == canonical => fc.pass(),
        Ok(v) => fc.fail(name, format!("canonical not idempotent: '{}'", v.to_string())),
        Err(e) => fc.fail(name, format!("re-parse canonical failed: {e}")),
    }
}

fn check_sequence(
    fc: &mut FailCollector,
    name: &str,
    case: &Value,
    mut iter: impl Iterator<Item = DateTime>,
) {
    let expected: Vec<String> = case["expected"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    let got: Vec<String> = iter
        .by_ref()
        .take(expected.len())
        .map(|dt| dt.to_string())
        .collect();
    if got != expected {
        return fc.fail(name, format!("got {got:?}, expected {expected:?}"));
    }
    if case["exhausted"].as_bool().unwrap_or(false) {
        if let Some(extra) = iter.next() {
            return fc.fail(name, format!("expected end of sequence, got {extra}"));
        }
    }
    fc.pass();
}

// ===========================================================================
// RRULE
// ===========================================================================

#[test]
fn conformance_rrule_parse_roundtrip() {
    let root = fixtures();
    let mut fc = FailCollector::new();
    for (i, case) in cases(&root, &["rrule", "parse"]).iter().enumerate() {
        let name = case_name(case, "rrule.parse", i);
        let input = case["input"].as_str().unwrap();
        let canonical = case["canonical"].as_str().unwrap();
        check_roundtrip(&mut fc, &name, input, canonical, RecurrenceRule::parse);
    }
    fc.finish("rrule_parse_roundtrip");
}

#[test]
fn conformance_rrule_parse_errors() {
    let root = fixtures();
    let mut fc = FailCollector::new();
    for (i, case) in cases(&root, &["rrule", "parse_errors"]).iter().enumerate() {
        let name = case_name(case, "rrule.parse_errors", i);
        let input = case["input"].as_str().unwrap();
        match RecurrenceRule::parse(input) {
            Ok(rule) => fc.fail(&name, format!("should fail, got: {rule}")),
            Err(_) if RecurrenceRule::try_parse(input).is_some() => {
                fc.fail(&name, "try_parse disagrees with parse".into())
            }
            Err(_) => fc.pass(),
        }
    }
    fc.finish("rrule_parse_errors");
}

#[test]
fn conformance_rrule_eval() {
    let root = fixtures();
    let mut fc = FailCollector::new();
    for (i, case) in cases(&root, &["rrule", "eval"]).iter().enumerate() {
        let name = case_name(case, "rrule.eval", i);
        let rule = match RecurrenceRule::parse(case["rule"].as_str().unwrap()) {
            Ok(r) => r,
            Err(e) => {
                fc.fail(&name, format!("parse failed: {e}"));
                continue;
            }
        };
        let start = parse_datetime(case["start"].as_str().unwrap());
        check_sequence(&mut fc, &name, case, rule.occurrences(start));
    }
    fc.finish("rrule_eval");
}

// ===========================================================================
// Cron
// ===========================================================================

#[test]
fn conformance_cron_parse_roundtrip() {
    let root = fixtures();
    let mut fc = FailCollector::new();
    for (i, case) in cases(&root, &["cron", "parse"]).iter().enumerate() {
        let name = case_name(case, "cron.parse", i);
        let input = case["input"].as_str().unwrap();
        let canonical = case["canonical"].as_str().unwrap();
        check_roundtrip(&mut fc, &name, input, canonical, CronExpression::parse);
    }
    fc.finish("cron_parse_roundtrip");
}

#[test]
fn conformance_cron_parse_errors() {
    let root = fixtures();
    let mut fc = FailCollector::new();
    for (i, case) in cases(&root, &["cron", "parse_errors"]).iter().enumerate() {
        let name = case_name(case, "cron.parse_errors", i);
        let input = case["input"].as_str().unwrap();
        match CronExpression::parse(input) {
            Ok(expr) => fc.fail(&name, format!("should fail, got: {expr}")),
            Err(_) if CronExpression::try_parse(input).is_some() => {
                fc.fail(&name, "try_parse disagrees with parse".into())
            }
            Err(_) => fc.pass(),
        }
    }
    fc.finish("cron_parse_errors");
}

#[test]
fn conformance_cron_eval() {
    let root = fixtures();
    let mut fc = FailCollector::new();
    for (i, case) in cases(&root, &["cron", "eval"]).iter().enumerate() {
        let name = case_name(case, "cron.eval", i);
        let expr = match CronExpression::parse(case["expression"].as_str().unwrap()) {
            Ok(e) => e,
            Err(e) => {
                fc.fail(&name, format!("parse failed: {e}"));
                continue;
            }
        };
        let start = parse_datetime(case["start"].as_str().unwrap());
        check_sequence(&mut fc, &name, case, expr.occurrences(start));
    }
    fc.finish("cron_eval");
}
