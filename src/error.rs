use std::fmt;

/// Byte range within the input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Shift both ends right by `offset` bytes.
    pub fn offset(self, offset: usize) -> Self {
        Self::new(self.start + offset, self.end + offset)
    }
}

/// All errors produced by recur.
///
/// `Rule` and `Cron` are format errors: the text could not be turned into a
/// valid rule. `Argument` covers bad call-site input (blank text, builder
/// values out of range). Evaluation never fails once a rule exists.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScheduleError {
    Rule {
        message: String,
        span: Span,
        input: String,
    },

    Cron {
        message: String,
        span: Span,
        input: String,
    },

    Argument {
        message: String,
    },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule { message, .. } => write!(f, "{message}"),
            Self::Cron { message, .. } => write!(f, "{message}"),
            Self::Argument { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ScheduleError {}

impl ScheduleError {
    pub fn rule(message: impl Into<String>, span: Span, input: impl Into<String>) -> Self {
        Self::Rule {
            message: message.into(),
            span,
            input: input.into(),
        }
    }

    pub fn cron(message: impl Into<String>, span: Span, input: impl Into<String>) -> Self {
        Self::Cron {
            message: message.into(),
            span,
            input: input.into(),
        }
    }

    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    /// True for errors caused by malformed rule or cron text.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Rule { .. } | Self::Cron { .. })
    }

    /// The span of the offending token, if the error came from text.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Rule { span, .. } | Self::Cron { span, .. } => Some(*span),
            Self::Argument { .. } => None,
        }
    }

    /// Format a rich error with an underline below the offending token.
    pub fn display_rich(&self) -> String {
        match self {
            Self::Rule {
                message,
                span,
                input,
            }
            | Self::Cron {
                message,
                span,
                input,
            } => format_span_error("error", message, span, input),
            Self::Argument { message } => format!("error: {message}"),
        }
    }
}

fn format_span_error(prefix: &str, message: &str, span: &Span, input: &str) -> String {
    let mut out = format!("{prefix}: {message}\n");
    out.push_str(&format!("  {input}\n"));
    let padding = " ".repeat(span.start + 2);
    let underline = "^".repeat(span.end.saturating_sub(span.start).max(1));
    out.push_str(&padding);
    out.push_str(&underline);
    out
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
