//! Evaluated values.
//!
//! A [`Value`] is what every expression reduces to. Rendering a value to
//! CSS text goes through an [`OutputStyle`] so the same value prints as
//! `0.5` in readable output and `.5` in compressed output.

use crate::format::OutputStyle;
use crate::types::color::Color;
use std::fmt;

/// Coarse classification of a value, as reported by type-test functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKind {
    Boolean,
    Number,
    Percent,
    Color,
    ColorAlpha,
    String,
    List,
}

/// How the items of a list are joined when rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Separator {
    Comma,
    Space,
    /// `name: value` pairs, as in media features.
    Colon,
    /// A literal `/` kept in shorthand properties such as `font`.
    Slash,
    /// Juxtaposed items without whitespace.
    None,
}

/// An evaluated value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    /// A number with an optional unit (empty for unitless numbers).
    Number { value: f64, unit: String },
    /// A percentage; `value` is the number before the `%` sign.
    Percent(f64),
    Color(Color),
    /// A string; unquoted keywords and escaped strings have no quote.
    Str { text: String, quote: Option<char> },
    List { items: Vec<Value>, sep: Separator },
}

impl Value {
    pub fn number(value: f64, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        if unit == "%" {
            Self::Percent(value)
        } else {
            Self::Number { value, unit }
        }
    }

    pub fn unitless(value: f64) -> Self {
        Self::Number {
            value,
            unit: String::new(),
        }
    }

    pub fn keyword(text: impl Into<String>) -> Self {
        Self::Str {
            text: text.into(),
            quote: None,
        }
    }

    pub fn quoted(text: impl Into<String>, quote: char) -> Self {
        Self::Str {
            text: text.into(),
            quote: Some(quote),
        }
    }

    pub fn list(items: Vec<Value>, sep: Separator) -> Self {
        Self::List { items, sep }
    }

    pub fn kind(&self) -> DataKind {
        match self {
            Self::Bool(_) => DataKind::Boolean,
            Self::Number { .. } => DataKind::Number,
            Self::Percent(_) => DataKind::Percent,
            Self::Color(color) if color.has_alpha => DataKind::ColorAlpha,
            Self::Color(_) => DataKind::Color,
            Self::Str { .. } => DataKind::String,
            Self::List { .. } => DataKind::List,
        }
    }

    /// Numeric value of numbers and percentages; booleans count as 1 or 0.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number { value, .. } | Self::Percent(value) => Some(*value),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Unit of a number, `%` for percentages, empty otherwise.
    pub fn unit(&self) -> &str {
        match self {
            Self::Number { unit, .. } => unit,
            Self::Percent(_) => "%",
            _ => "",
        }
    }

    /// Guard truthiness: only `true` itself is true.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Str { text, quote: None } => text == "true",
            Self::List { items, .. } if items.len() == 1 => items[0].as_bool(),
            _ => false,
        }
    }

    /// The color this value denotes, including color keywords.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(color) => Some(color.clone()),
            Self::Str { text, quote: None } if Color::is_keyword(text) => Color::parse(text).ok(),
            _ => None,
        }
    }

    pub fn is_keyword(&self) -> bool {
        matches!(self, Self::Str { quote: None, .. })
    }

    /// Items of a list; any other value is a one-item list.
    pub fn items(&self) -> &[Value] {
        match self {
            Self::List { items, .. } => items,
            other => std::slice::from_ref(other),
        }
    }

    /// Renders the value as CSS text.
    pub fn to_css(&self, style: &dyn OutputStyle) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number { value, unit } => style.number(*value, unit),
            Self::Percent(value) => style.number(*value, "%"),
            Self::Color(color) => style.color(color),
            Self::Str { text, quote: None } => text.clone(),
            Self::Str {
                text,
                quote: Some(q),
            } => format!("{q}{text}{q}"),
            Self::List { items, sep } => {
                let joiner = style.separator(*sep);
                items
                    .iter()
                    .map(|item| item.to_css(style))
                    .filter(|text| !text.is_empty() || *sep == Separator::None)
                    .collect::<Vec<_>>()
                    .join(joiner)
            }
        }
    }

    /// Renders the value with string quotes removed, as used by
    /// interpolation and string functions.
    pub fn to_unquoted(&self, style: &dyn OutputStyle) -> String {
        match self {
            Self::Str { text, .. } => text.clone(),
            Self::List { items, sep } => items
                .iter()
                .map(|item| item.to_unquoted(style))
                .collect::<Vec<_>>()
                .join(style.separator(*sep)),
            other => other.to_css(style),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css(&crate::format::Readable))
    }
}

/// Formats a number with at most eight decimals and no trailing zeros.
///
/// ```
/// use lesscss::types::value::format_number;
///
/// assert_eq!(format_number(10.0), "10");
/// assert_eq!(format_number(0.125), "0.125");
/// assert_eq!(format_number(1.0 / 3.0), "0.33333333");
/// assert_eq!(format_number(-0.0000000001), "0");
/// ```
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return if value.is_nan() {
            "NaN".to_string()
        } else if value > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };
    }
    let mut text = format!("{:.8}", value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Compressed, Readable};

    #[test]
    fn test_kind() {
        assert_eq!(Value::number(3.0, "px").kind(), DataKind::Number);
        assert_eq!(Value::number(3.0, "%").kind(), DataKind::Percent);
        assert_eq!(
            Value::Color(Color::rgba(0.0, 0.0, 0.0, 0.5)).kind(),
            DataKind::ColorAlpha
        );
        assert_eq!(Value::keyword("auto").kind(), DataKind::String);
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Bool(true).as_bool());
        assert!(Value::keyword("true").as_bool());
        assert!(!Value::quoted("true", '"').as_bool());
        assert!(!Value::unitless(1.0).as_bool());
    }

    #[test]
    fn test_list_rendering() {
        let list = Value::list(
            vec![
                Value::number(1.0, "px"),
                Value::keyword("solid"),
                Value::Color(Color::rgb(255.0, 0.0, 0.0)),
            ],
            Separator::Space,
        );
        assert_eq!(list.to_css(&Readable), "1px solid #ff0000");

        let fonts = Value::list(
            vec![Value::quoted("Helvetica Neue", '"'), Value::keyword("sans-serif")],
            Separator::Comma,
        );
        assert_eq!(fonts.to_css(&Readable), "\"Helvetica Neue\", sans-serif");
        assert_eq!(fonts.to_css(&Compressed), "\"Helvetica Neue\",sans-serif");
        assert_eq!(fonts.to_unquoted(&Readable), "Helvetica Neue, sans-serif");
    }

    #[test]
    fn test_compressed_numbers() {
        assert_eq!(Value::number(0.5, "em").to_css(&Readable), "0.5em");
        assert_eq!(Value::number(0.5, "em").to_css(&Compressed), ".5em");
        assert_eq!(Value::number(-0.25, "").to_css(&Compressed), "-.25");
    }
}
