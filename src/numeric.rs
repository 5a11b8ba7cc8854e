//! Numeric canonicalization of statement cells.
//!
//! Statement tables print negative amounts in parentheses and group digits
//! with commas, spaces or non-breaking spaces. [`canonicalize()`] folds a
//! cell's text into a [`CellValue`]: `Null` for blanks and "not applicable"
//! dashes, `Number` for anything that parses once separators are removed,
//! and `Text` (the trimmed original) otherwise.

use std::fmt;

use serde::{Deserialize, Serialize};

const NON_BREAKING_SPACE: char = '\u{a0}';
const EN_DASH: &str = "\u{2013}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Re-applies the canonicalization rules. Numbers and nulls are fixed
    /// points; text is run through [`canonicalize()`] again.
    pub fn canonicalize(self) -> CellValue {
        match self {
            CellValue::Text(text) => canonicalize(Some(&text)),
            other => other,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(text) => text.clone(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn canonicalize(value: Option<&str>) -> CellValue {
    let Some(raw) = value else {
        return CellValue::Null;
    };
    let text = raw.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("nan") {
        return CellValue::Null;
    }
    if text == "-" || text == EN_DASH {
        return CellValue::Null;
    }

    if let Some(inner) = text
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return match parse_unsigned(inner) {
            Some(magnitude) => number(-magnitude),
            None => CellValue::Text(text.to_string()),
        };
    }

    match parse_magnitude(text) {
        Some(value) => number(value),
        None => CellValue::Text(text.to_string()),
    }
}

/// Interior of a parenthesised amount: a signed interior is not a magnitude.
fn parse_unsigned(text: &str) -> Option<f64> {
    if strip_separators(text).starts_with(['-', '+']) {
        return None;
    }
    parse_magnitude(text).filter(|n| n.is_sign_positive())
}

/// Folds negative zero into zero so every sink renders `(0)` as `0`.
fn number(value: f64) -> CellValue {
    CellValue::Number(if value == 0.0 { 0.0 } else { value })
}

/// Removes every comma, space and non-breaking space.
pub fn strip_separators(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(*c, ',' | ' ' | NON_BREAKING_SPACE))
        .collect()
}

fn parse_magnitude(text: &str) -> Option<f64> {
    let cleaned = strip_separators(text);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| !n.is_nan())
}

pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parentheses_negate_and_drop_grouping() {
        assert_eq!(canonicalize(Some("(1,234)")), CellValue::Number(-1234.0));
        assert_eq!(
            canonicalize(Some("( 12 500 )")),
            CellValue::Number(-12500.0)
        );
        assert_eq!(
            canonicalize(Some("(1\u{a0}020.5)")),
            CellValue::Number(-1020.5)
        );
    }

    #[test]
    fn grouped_digits_parse_as_numbers() {
        assert_eq!(canonicalize(Some("1 234")), CellValue::Number(1234.0));
        assert_eq!(canonicalize(Some("1,23,400")), CellValue::Number(123400.0));
        assert_eq!(canonicalize(Some("1 20 300")), CellValue::Number(120300.0));
        assert_eq!(canonicalize(Some("  42.75 ")), CellValue::Number(42.75));
    }

    #[test]
    fn sentinels_are_null() {
        assert_eq!(canonicalize(None), CellValue::Null);
        assert_eq!(canonicalize(Some("")), CellValue::Null);
        assert_eq!(canonicalize(Some("   ")), CellValue::Null);
        assert_eq!(canonicalize(Some("NaN")), CellValue::Null);
        assert_eq!(canonicalize(Some("-")), CellValue::Null);
        assert_eq!(canonicalize(Some("\u{2013}")), CellValue::Null);
    }

    #[test]
    fn unparseable_text_is_returned_trimmed() {
        assert_eq!(
            canonicalize(Some("N/A text")),
            CellValue::Text("N/A text".to_string())
        );
        assert_eq!(
            canonicalize(Some(" (see note 4) ")),
            CellValue::Text("(see note 4)".to_string())
        );
        assert_eq!(canonicalize(Some("()")), CellValue::Text("()".to_string()));
        assert_eq!(
            canonicalize(Some("(nan)")),
            CellValue::Text("(nan)".to_string())
        );
        assert_eq!(
            canonicalize(Some("(-5)")),
            CellValue::Text("(-5)".to_string())
        );
        assert_eq!(
            canonicalize(Some(" (+1,200) ")),
            CellValue::Text("(+1,200)".to_string())
        );
    }

    #[test]
    fn zero_is_never_signed() {
        for raw in ["(0)", "-0", "(0.00)", "0"] {
            let value = canonicalize(Some(raw));
            assert_eq!(value.as_display(), "0");
            assert!(value.as_number().is_some_and(|n| n.is_sign_positive()));
        }
    }

    #[test]
    fn leading_minus_is_ordinary_decimal_syntax() {
        assert_eq!(canonicalize(Some("-15")), CellValue::Number(-15.0));
        assert_eq!(
            canonicalize(Some("--15")),
            CellValue::Text("--15".to_string())
        );
    }

    #[test]
    fn recanonicalizing_is_a_no_op() {
        for raw in ["(1,234)", "1 234", "-", "", "Share capital"] {
            let once = canonicalize(Some(raw));
            assert_eq!(once.clone().canonicalize(), once);
        }
    }

    #[test]
    fn display_drops_trailing_zero_fraction() {
        assert_eq!(CellValue::Number(-100.0).as_display(), "-100");
        assert_eq!(CellValue::Number(12.5).as_display(), "12.5");
        assert_eq!(CellValue::Null.as_display(), "");
        assert_eq!(CellValue::Text("x".into()).to_string(), "x");
    }
}
