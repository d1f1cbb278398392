//! Literal token parsers.
//!
//! These are small nom parsers for the leaf tokens of an expression:
//! numbers with units, identifiers and hex colors. The expression scanner
//! decides which one applies and runs it on the remaining input.

use crate::types::{Color, Value};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while1, take_while_m_n},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{map, map_res, not, opt, peek, recognize},
    sequence::{pair, preceded, terminated, tuple},
};

/// Parses a signed decimal number with an optional exponent.
pub fn parse_number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

/// Parses a unit suffix: `%` or a run of letters.
pub fn parse_unit(input: &str) -> IResult<&str, &str> {
    alt((tag("%"), take_while1(|c: char| c.is_ascii_alphabetic())))(input)
}

/// Parses a number and its optional unit into a value.
///
/// ```
/// use lesscss::parser::values::parse_dimension;
/// use lesscss::types::Value;
///
/// assert_eq!(parse_dimension("10px solid").unwrap(), (" solid", Value::number(10.0, "px")));
/// assert_eq!(parse_dimension("50%").unwrap().1, Value::Percent(50.0));
/// ```
pub fn parse_dimension(input: &str) -> IResult<&str, Value> {
    map(pair(parse_number, opt(parse_unit)), |(value, unit)| {
        Value::number(value, unit.unwrap_or(""))
    })(input)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

/// Parses a CSS identifier (letters, digits, dashes and underscores).
pub fn parse_ident(input: &str) -> IResult<&str, &str> {
    take_while1(is_ident_char)(input)
}

/// Parses a `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa` literal that is not
/// followed by further identifier characters.
pub fn parse_hex_color(input: &str) -> IResult<&str, Color> {
    let digits = take_while_m_n(3, 8, |c: char| c.is_ascii_hexdigit());
    map_res(
        recognize(preceded(
            char('#'),
            terminated(digits, not(peek(take_while1(is_ident_char)))),
        )),
        |text: &str| match text.len() - 1 {
            3 | 4 | 6 | 8 => Color::parse(text),
            _ => Err(crate::types::ColorParseError {
                message: format!("invalid hex color {text}"),
            }),
        },
    )(input)
}

/// Returns `true` if `input` starts with something [`parse_number`] accepts.
pub fn starts_number(input: &str) -> bool {
    let mut chars = input.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some('+' | '-') => match chars.next() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers() {
        assert_eq!(parse_number("42"), Ok(("", 42.0)));
        assert_eq!(parse_number("-1.5em"), Ok(("em", -1.5)));
        assert_eq!(parse_number(".5"), Ok(("", 0.5)));
        assert_eq!(parse_number("1e3"), Ok(("", 1000.0)));
        assert!(parse_number("px").is_err());
    }

    #[test]
    fn test_exponent_does_not_eat_em() {
        assert_eq!(parse_dimension("2em").unwrap().1, Value::number(2.0, "em"));
        assert_eq!(parse_dimension("1.5").unwrap().1, Value::unitless(1.5));
    }

    #[test]
    fn test_hex_colors() {
        let (rest, color) = parse_hex_color("#fff;").unwrap();
        assert_eq!(rest, ";");
        assert_eq!(color.to_hex(), "#ffffff");
        assert_eq!(color.original.as_deref(), Some("#fff"));
        assert!(parse_hex_color("#abcdex").is_err());
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#main").is_err());
    }

    #[test]
    fn test_starts_number() {
        assert!(starts_number("10px"));
        assert!(starts_number("-.5"));
        assert!(!starts_number("-webkit"));
        assert!(!starts_number(".class"));
    }
}
