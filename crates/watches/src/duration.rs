//! # Duration Parsing
//!
//! Parses duration strings in the format used by Kubernetes tooling and
//! operator flags: a sequence of decimal numbers, each with a unit suffix,
//! such as "300ms", "90s", "1m30s" or "1.5h".
//!
//! Supported units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`.
//! A bare `0` is accepted as zero.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

// Units are tried in order, so "ms" must come before "m" and "s"
static WHOLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+(?:\.\d+)?(?:ns|us|µs|ms|s|m|h))+$")
        .expect("Failed to compile duration pattern")
});

static COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<number>\d+(?:\.\d+)?)(?P<unit>ns|us|µs|ms|s|m|h)")
        .expect("Failed to compile duration component pattern")
});

/// Error returned when a duration string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration '{input}': {reason}")]
pub struct ParseDurationError {
    input: String,
    reason: String,
}

impl ParseDurationError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse a duration string such as "1m30s" into a `Duration`
pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(ParseDurationError::new(input, "duration cannot be empty"));
    }
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }
    if trimmed.starts_with('-') {
        return Err(ParseDurationError::new(input, "duration cannot be negative"));
    }

    if !WHOLE.is_match(trimmed) {
        return Err(ParseDurationError::new(
            input,
            "expected <number><unit> segments, e.g. '90s', '1m30s', '500ms'",
        ));
    }

    let mut total_secs = 0f64;
    for captures in COMPONENT.captures_iter(trimmed) {
        let number: f64 = captures["number"]
            .parse()
            .map_err(|e| ParseDurationError::new(input, format!("{e}")))?;
        let unit_secs = match &captures["unit"] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            other => {
                return Err(ParseDurationError::new(input, format!("unknown unit '{other}'")));
            }
        };
        total_secs += number * unit_secs;
    }

    Duration::try_from_secs_f64(total_secs)
        .map_err(|e| ParseDurationError::new(input, format!("{e}")))
}
