//! A small parser for Go's `time.ParseDuration` grammar
//! (`"300ms"`, `"1h30m"`, `"1m30s"`), used by the annotation decoder and
//! the CRD `TimeoutPolicy`/`SlowStartPolicy` fields.
//!
//! No crate in the corpus speaks this exact grammar (`humantime` accepts
//! a related but not identical compact form), so this is hand-rolled —
//! see DESIGN.md.

use std::time::Duration;

/// The effective value of a timeout field: a bounded duration, or
/// disabled. Both a malformed string and the literal `"infinite"` map to
/// `Disabled` — §4.2/§8 S7 record this as intentional parity with the
/// source behavior, not a bug to silently diverge from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Disabled,
    Duration(Duration),
}

impl Timeout {
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Timeout::Disabled => None,
            Timeout::Duration(d) => Some(*d),
        }
    }
}

/// Parses a Go-style duration string into a [`Timeout`].
///
/// `"infinite"` and any string that fails to parse both produce
/// `Timeout::Disabled` (see module docs). Use [`parse_strict`] when the
/// caller needs to distinguish the two for status reporting.
pub fn parse(s: &str) -> Timeout {
    match parse_strict(s) {
        Ok(d) => Timeout::Duration(d),
        Err(ParseError::Infinite) | Err(ParseError::Malformed) => Timeout::Disabled,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The literal sentinel `"infinite"`.
    Infinite,
    /// Anything else that didn't parse.
    Malformed,
}

/// Parses a Go-style duration string, keeping `"infinite"` and malformed
/// input distinguishable so callers that need to log them differently
/// (§9 open question) can.
pub fn parse_strict(s: &str) -> Result<Duration, ParseError> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("infinite") {
        return Err(ParseError::Infinite);
    }
    if s.is_empty() {
        return Err(ParseError::Malformed);
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    let mut saw_any = false;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or(ParseError::Malformed)?;
        if num_end == 0 {
            return Err(ParseError::Malformed);
        }
        let (num_str, after_num) = rest.split_at(num_end);
        let value: f64 = num_str.parse().map_err(|_| ParseError::Malformed)?;

        let unit_end = after_num
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_num.len());
        let (unit, remainder) = after_num.split_at(unit_end);

        let unit_secs: f64 = match unit {
            "ns" => 1e-9,
            "us" | "\u{b5}s" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(ParseError::Malformed),
        };

        total += Duration::from_secs_f64(value * unit_secs);
        saw_any = true;
        rest = remainder;
    }

    if saw_any {
        Ok(total)
    } else {
        Err(ParseError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_forms() {
        assert_eq!(
            parse_strict("1m30s").unwrap(),
            Duration::from_secs(90)
        );
        assert_eq!(parse_strict("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(
            parse_strict("1h30m").unwrap(),
            Duration::from_secs(5400)
        );
    }

    #[test]
    fn infinite_and_malformed_both_disable_but_are_distinguishable() {
        assert_eq!(parse_strict("infinite").unwrap_err(), ParseError::Infinite);
        assert_eq!(parse_strict("peanut").unwrap_err(), ParseError::Malformed);
        assert_eq!(parse("infinite"), Timeout::Disabled);
        assert_eq!(parse("peanut"), Timeout::Disabled);
    }

    #[test]
    fn request_timeout_scenario_s7() {
        assert_eq!(parse("1m30s"), Timeout::Duration(Duration::from_secs(90)));
    }
}
