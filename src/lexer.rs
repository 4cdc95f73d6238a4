use jiff::civil::DateTime;

use crate::error::{ScheduleError, Span};

/// One `KEY=VALUE` segment of an RRULE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Upper-cased key.
    pub name: String,
    pub value: String,
    /// Span of the whole segment.
    pub span: Span,
}

/// Splits RRULE text into properties, tracking byte offsets for diagnostics.
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Property>, ScheduleError> {
        let mut properties = Vec::new();
        while self.pos < self.bytes.len() {
            let start = self.pos;
            let end = self.segment_end();
            self.pos = end + 1;

            let raw = &self.input[start..end];
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let lead = raw.len() - raw.trim_start().len();
            let span = Span::new(start + lead, start + lead + trimmed.len());

            let Some((name, value)) = trimmed.split_once('=') else {
                return Err(ScheduleError::rule(
                    format!("expected KEY=VALUE, got '{trimmed}'"),
                    span,
                    self.input,
                ));
            };
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() {
                return Err(ScheduleError::rule(
                    "missing property name before '='",
                    span,
                    self.input,
                ));
            }
            if value.is_empty() {
                return Err(ScheduleError::rule(
                    format!("missing value for {}", name.to_ascii_uppercase()),
                    span,
                    self.input,
                ));
            }

            properties.push(Property {
                name: name.to_ascii_uppercase(),
                value: value.to_string(),
                span,
            });
        }
        Ok(properties)
    }

    fn segment_end(&self) -> usize {
        self.bytes[self.pos..]
            .iter()
            .position(|&b| b == b';')
            .map_or(self.bytes.len(), |i| self.pos + i)
    }
}

/// Read an `UNTIL` timestamp literal.
///
/// Accepts `yyyyMMddTHHmmss` and `yyyy-MM-ddTHH:mm:ss`, each with an optional
/// trailing `Z`, and their reduced-precision forms down to a bare date.
/// Missing time components are zero. Returns `None` for anything else,
/// including impossible dates.
pub fn parse_timestamp(s: &str) -> Option<DateTime> {
    let s = s.strip_suffix(['Z', 'z']).unwrap_or(s);
    let (date_part, time_part) = match s.split_once(['T', 't']) {
        Some((d, t)) => (d, Some(t)),
        None => (s, None),
    };

    let (year, month, day) = match date_part.len() {
        8 if all_digits(date_part) => (
            &date_part[0..4],
            &date_part[4..6],
            &date_part[6..8],
        ),
        10 if date_part.is_ascii()
            && date_part.as_bytes()[4] == b'-'
            && date_part.as_bytes()[7] == b'-' =>
        {
            let (y, m, d) = (&date_part[0..4], &date_part[5..7], &date_part[8..10]);
            if !(all_digits(y) && all_digits(m) && all_digits(d)) {
                return None;
            }
            (y, m, d)
        }
        _ => return None,
    };

    let mut clock = [0u8; 3];
    if let Some(t) = time_part {
        let extended = t.contains(':');
        let pieces: Vec<&str> = if extended {
            t.split(':').collect()
        } else {
            if t.len() % 2 != 0 {
                return None;
            }
            (0..t.len()).step_by(2).filter_map(|i| t.get(i..i + 2)).collect()
        };
        if pieces.is_empty() || pieces.len() > 3 {
            return None;
        }
        for (slot, piece) in clock.iter_mut().zip(&pieces) {
            if piece.len() != 2 || !all_digits(piece) {
                return None;
            }
            *slot = piece.parse().ok()?;
        }
    }

    let normalized = format!(
        "{year}-{month}-{day}T{:02}:{:02}:{:02}",
        clock[0], clock[1], clock[2]
    );
    normalized.parse().ok()
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(input: &str) -> Vec<String> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect()
    }

    #[test]
    fn test_tokenize_properties() {
        let props = Lexer::new("FREQ=DAILY;COUNT=3").tokenize().unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].name, "FREQ");
        assert_eq!(props[0].value, "DAILY");
        assert_eq!(props[0].span, Span::new(0, 10));
        assert_eq!(props[1].span, Span::new(11, 18));
    }

    #[test]
    fn test_tokenize_uppercases_keys_and_skips_empty_segments() {
        assert_eq!(names("freq=daily;;interval=2;"), vec!["FREQ", "INTERVAL"]);
    }

    #[test]
    fn test_tokenize_missing_equals() {
        let err = Lexer::new("FREQ=DAILY;COUNT").tokenize().unwrap_err();
        assert_eq!(err.span(), Some(Span::new(11, 16)));
    }

    #[test]
    fn test_tokenize_missing_value() {
        assert!(Lexer::new("FREQ=").tokenize().is_err());
        assert!(Lexer::new("=DAILY").tokenize().is_err());
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected: DateTime = "1997-12-24T00:00:00".parse().unwrap();
        assert_eq!(parse_timestamp("19971224T000000Z"), Some(expected));
        assert_eq!(parse_timestamp("19971224T000000"), Some(expected));
        assert_eq!(parse_timestamp("1997-12-24T00:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("19971224"), Some(expected));
        assert_eq!(parse_timestamp("1997-12-24"), Some(expected));

        let expected: DateTime = "1997-12-24T09:30:00".parse().unwrap();
        assert_eq!(parse_timestamp("19971224T0930"), Some(expected));
        assert_eq!(parse_timestamp("1997-12-24T09:30"), Some(expected));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("1997122"), None);
        assert_eq!(parse_timestamp("19971324"), None);
        assert_eq!(parse_timestamp("19970230T000000"), None);
        assert_eq!(parse_timestamp("19971224T25"), None);
        assert_eq!(parse_timestamp("19971224T093"), None);
        assert_eq!(parse_timestamp("tomorrow"), None);
    }
}
