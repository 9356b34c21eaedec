use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, NaiveDate};
use std::fmt::Write;
use tracing::warn;

use super::error::WatermarkError;

pub const DEFAULT_DATE_FORMAT: &str = "MM/dd/yyyy";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Day(usize),
    Month(usize),
    Year(usize),
    Literal(String),
}

/// Format `date` with `pattern`.
///
/// Patterns containing `%` are strftime patterns. Everything else uses the
/// custom date tokens `d`..`dddd`, `M`..`MMMM` and `y`..`yyyyy`, with quoted
/// literals and `\` escapes.
pub fn format_date(date: NaiveDate, pattern: &str) -> Result<String, WatermarkError> {
    if pattern.is_empty() {
        return Err(WatermarkError::pattern(pattern, "pattern is empty"));
    }

    if pattern.contains('%') {
        return format_strftime(date, pattern);
    }

    let tokens = tokenize(pattern)?;
    let mut out = String::with_capacity(pattern.len() + 8);
    for token in &tokens {
        let written = match token {
            Token::Day(1) => write!(out, "{}", date.day()),
            Token::Day(2) => write!(out, "{:02}", date.day()),
            Token::Day(3) => write!(out, "{}", date.format("%a")),
            Token::Day(_) => write!(out, "{}", date.format("%A")),
            Token::Month(1) => write!(out, "{}", date.month()),
            Token::Month(2) => write!(out, "{:02}", date.month()),
            Token::Month(3) => write!(out, "{}", date.format("%b")),
            Token::Month(_) => write!(out, "{}", date.format("%B")),
            Token::Year(1) => write!(out, "{}", date.year().rem_euclid(100)),
            Token::Year(2) => write!(out, "{:02}", date.year().rem_euclid(100)),
            Token::Year(width) => write!(out, "{:0width$}", date.year(), width = *width),
            Token::Literal(text) => {
                out.push_str(text);
                Ok(())
            }
        };
        written.map_err(|_| WatermarkError::pattern(pattern, "formatting failed"))?;
    }
    Ok(out)
}

/// Format with `pattern`, substituting [`DEFAULT_DATE_FORMAT`] if it is invalid.
pub fn format_date_or_default(date: NaiveDate, pattern: &str) -> String {
    match format_date(date, pattern) {
        Ok(text) => text,
        Err(e) => {
            warn!("{}; using {:?}", e, DEFAULT_DATE_FORMAT);
            // The default pattern only uses numeric tokens
            format!("{:02}/{:02}/{:04}", date.month(), date.day(), date.year())
        }
    }
}

fn format_strftime(date: NaiveDate, pattern: &str) -> Result<String, WatermarkError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(WatermarkError::pattern(
            pattern,
            "unrecognized strftime specifier",
        ));
    }

    let mut out = String::new();
    write!(out, "{}", date.format_with_items(items.iter()))
        .map_err(|_| WatermarkError::pattern(pattern, "pattern uses fields a date does not have"))?;
    Ok(out)
}

fn tokenize(pattern: &str) -> Result<Vec<Token>, WatermarkError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    let flush = |literal: &mut String, tokens: &mut Vec<Token>| {
        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(literal)));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            'd' | 'M' | 'y' => {
                let mut run = 1;
                while chars.next_if_eq(&c).is_some() {
                    run += 1;
                }
                let (token, max) = match c {
                    'd' => (Token::Day(run), 4),
                    'M' => (Token::Month(run), 4),
                    _ => (Token::Year(run), 5),
                };
                if run > max {
                    return Err(WatermarkError::pattern(
                        pattern,
                        format!("'{}' repeated {} times", c, run),
                    ));
                }
                flush(&mut literal, &mut tokens);
                tokens.push(token);
            }
            '\'' | '"' => {
                let mut closed = false;
                for quoted in chars.by_ref() {
                    if quoted == c {
                        closed = true;
                        break;
                    }
                    literal.push(quoted);
                }
                if !closed {
                    return Err(WatermarkError::pattern(pattern, "unterminated quote"));
                }
            }
            '\\' => match chars.next() {
                Some(escaped) => literal.push(escaped),
                None => return Err(WatermarkError::pattern(pattern, "trailing backslash")),
            },
            c if c.is_ascii_alphabetic() => {
                return Err(WatermarkError::pattern(
                    pattern,
                    format!("unsupported field '{}'", c),
                ));
            }
            c => literal.push(c),
        }
    }
    flush(&mut literal, &mut tokens);

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_pattern() {
        assert_eq!(
            format_date(date(2024, 3, 5), "MM/dd/yyyy").unwrap(),
            "03/05/2024"
        );
    }

    #[test]
    fn test_unpadded_and_short_year() {
        assert_eq!(format_date(date(2024, 3, 5), "M/d/yy").unwrap(), "3/5/24");
        assert_eq!(format_date(date(2009, 11, 25), "d.M.y").unwrap(), "25.11.9");
    }

    #[test]
    fn test_named_fields() {
        let d = date(2024, 3, 5);
        assert_eq!(format_date(d, "MMMM d, yyyy").unwrap(), "March 5, 2024");
        assert_eq!(format_date(d, "ddd dd MMM yyyy").unwrap(), "Tue 05 Mar 2024");
        assert_eq!(format_date(d, "dddd").unwrap(), "Tuesday");
    }

    #[test]
    fn test_iso_like_and_wide_year() {
        let d = date(2024, 12, 31);
        assert_eq!(format_date(d, "yyyy-MM-dd").unwrap(), "2024-12-31");
        assert_eq!(format_date(d, "yyyyy").unwrap(), "02024");
        assert_eq!(format_date(date(987, 1, 1), "yyy").unwrap(), "987");
    }

    #[test]
    fn test_quoted_literals_and_escapes() {
        let d = date(2024, 3, 5);
        assert_eq!(
            format_date(d, "'Day' d 'of' MMMM").unwrap(),
            "Day 5 of March"
        );
        assert_eq!(format_date(d, "\"taken\" yyyy").unwrap(), "taken 2024");
        assert_eq!(format_date(d, "\\d\\a\\y d").unwrap(), "day 5");
    }

    #[test]
    fn test_strftime_dialect() {
        let d = date(2024, 3, 5);
        assert_eq!(format_date(d, "%Y-%m-%d").unwrap(), "2024-03-05");
        assert_eq!(format_date(d, "%d %B %Y").unwrap(), "05 March 2024");
    }

    #[test]
    fn test_invalid_patterns() {
        let d = date(2024, 3, 5);
        for pattern in [
            "",
            "'unterminated",
            "yyyy\\",
            "ddddd",
            "MMMMM",
            "yyyyyy",
            "HH:mm",
            "%Q",
            "%H:%M",
        ] {
            assert!(
                matches!(
                    format_date(d, pattern),
                    Err(WatermarkError::InvalidFormatPattern { .. })
                ),
                "{pattern:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_fallback_to_default_pattern() {
        let d = date(2024, 3, 5);
        assert_eq!(format_date_or_default(d, "HH:mm"), "03/05/2024");
        assert_eq!(format_date_or_default(d, "yyyy"), "2024");
        assert_eq!(
            format_date_or_default(d, DEFAULT_DATE_FORMAT),
            format_date(d, DEFAULT_DATE_FORMAT).unwrap()
        );
    }
}
