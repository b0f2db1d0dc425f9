// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Parsing of event timestamps written with .NET style custom format strings
//! (`yyyy-MM-ddTHH:mm:ss.fffzzz` and friends), translated to `chrono` syntax.

use chrono::{DateTime, NaiveDateTime};

/// Parses `value` with the custom `format` and returns Unix epoch milliseconds.
///
/// Formats without an offset specifier are read as UTC. Sub-millisecond
/// precision is truncated.
pub fn parse_epoch_millis(value: &str, format: &str) -> Result<i64, String> {
    let pattern = translate_format(format)?;
    if pattern.has_offset {
        DateTime::parse_from_str(value, &pattern.strftime)
            .map(|dt| dt.timestamp_millis())
            .map_err(|e| format!("'{value}' does not match format '{format}': {e}"))
    } else {
        NaiveDateTime::parse_from_str(value, &pattern.strftime)
            .map(|dt| dt.and_utc().timestamp_millis())
            .map_err(|e| format!("'{value}' does not match format '{format}': {e}"))
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Pattern {
    strftime: String,
    has_offset: bool,
}

fn translate_format(format: &str) -> Result<Pattern, String> {
    if format.is_empty() {
        return Err("timestamp format is empty".to_string());
    }

    let chars: Vec<char> = format.chars().collect();
    let mut out = String::with_capacity(format.len() * 2);
    let mut has_offset = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&x| x == c).count();

        match c {
            'y' => {
                out.push_str(match run {
                    1 | 2 => "%y",
                    _ => "%Y",
                });
            }
            'M' => {
                out.push_str(match run {
                    1 | 2 => "%m",
                    3 => "%b",
                    _ => "%B",
                });
            }
            'd' => {
                out.push_str(match run {
                    1 | 2 => "%d",
                    3 => "%a",
                    _ => "%A",
                });
            }
            'H' => out.push_str("%H"),
            'h' => out.push_str("%I"),
            'm' => out.push_str("%M"),
            's' => out.push_str("%S"),
            't' => out.push_str("%p"),
            'f' | 'F' => {
                let dotted = out.ends_with('.');
                if dotted {
                    out.pop();
                }
                let spec = match (c, run, dotted) {
                    ('f', 3, true) => "%.3f",
                    ('f', 6, true) => "%.6f",
                    ('f', 9, true) => "%.9f",
                    (_, 1..=9, true) => "%.f",
                    ('f', 3, false) => "%3f",
                    ('f', 6, false) => "%6f",
                    ('f', 9, false) => "%9f",
                    _ => {
                        return Err(format!(
                            "unsupported fraction specifier '{}' in '{format}'",
                            c.to_string().repeat(run)
                        ))
                    }
                };
                out.push_str(spec);
            }
            'z' => {
                has_offset = true;
                out.push_str(match run {
                    1 | 2 => "%#z",
                    _ => "%:z",
                });
            }
            'K' => {
                has_offset = true;
                out.push_str("%:z");
            }
            '\'' | '"' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&x| x == c)
                    .ok_or_else(|| format!("unterminated quoted literal in '{format}'"))?;
                for &literal in &chars[i + 1..i + 1 + close] {
                    push_literal(&mut out, literal);
                }
                i += close + 2;
                continue;
            }
            '\\' => {
                let literal = chars
                    .get(i + 1)
                    .ok_or_else(|| format!("dangling escape in '{format}'"))?;
                push_literal(&mut out, *literal);
                i += 2;
                continue;
            }
            // A lone '%' only marks a single-letter specifier in .NET.
            '%' if run == 1 && i + 1 < chars.len() => {
                i += 1;
                continue;
            }
            other => {
                for _ in 0..run {
                    push_literal(&mut out, other);
                }
            }
        }
        i += run;
    }

    Ok(Pattern {
        strftime: out,
        has_offset,
    })
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_round_trip_format() {
        assert_eq!(
            translate_format("yyyy-MM-ddTHH:mm:ss.fffzzz").unwrap(),
            Pattern {
                strftime: "%Y-%m-%dT%H:%M:%S%.3f%:z".to_string(),
                has_offset: true,
            }
        );
    }

    #[test]
    fn translates_quoted_and_escaped_literals() {
        let pattern = translate_format(r"yyyy'T'HH\h 'at' %d").unwrap();
        assert_eq!(pattern.strftime, "%YT%Hh at %d");
        assert!(!pattern.has_offset);
    }

    #[test]
    fn parses_utc_instant_to_millis() {
        assert_eq!(
            parse_epoch_millis("2024-01-01T00:00:00.000+00:00", "yyyy-MM-ddTHH:mm:ss.fffzzz"),
            Ok(1_704_067_200_000)
        );
    }

    #[test]
    fn applies_offset() {
        assert_eq!(
            parse_epoch_millis("2024-01-01T03:00:00.250+03:00", "yyyy-MM-ddTHH:mm:ss.fffzzz"),
            Ok(1_704_067_200_250)
        );
    }

    #[test]
    fn truncates_sub_millisecond_precision() {
        assert_eq!(
            parse_epoch_millis(
                "2024-01-01T00:00:00.123999+00:00",
                "yyyy-MM-ddTHH:mm:ss.ffffffzzz"
            ),
            Ok(1_704_067_200_123)
        );
    }

    #[test]
    fn formats_without_offset_are_utc() {
        assert_eq!(
            parse_epoch_millis("2018-01-03 05:56:16", "yyyy-MM-dd HH:mm:ss"),
            Ok(1_514_958_976_000)
        );
    }

    #[test]
    fn twelve_hour_clock_with_designator() {
        assert_eq!(
            parse_epoch_millis("01/03/2018 05:56:16 PM", "MM/dd/yyyy hh:mm:ss tt"),
            parse_epoch_millis("2018-01-03 17:56:16", "yyyy-MM-dd HH:mm:ss")
        );
    }

    #[test]
    fn rejects_value_not_matching_format() {
        assert!(parse_epoch_millis("yesterday", "yyyy-MM-ddTHH:mm:ss.fffzzz").is_err());
        assert!(parse_epoch_millis("2024-01-01", "yyyy-MM-ddTHH:mm:ss.fffzzz").is_err());
    }

    #[test]
    fn rejects_unusable_formats() {
        assert!(parse_epoch_millis("2024", "").is_err());
        assert!(parse_epoch_millis("2024", "yyyy'unterminated").is_err());
        assert!(parse_epoch_millis("12", "ssff").is_err());
    }
}
