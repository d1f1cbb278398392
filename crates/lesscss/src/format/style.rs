//! Output policies.
//!
//! The renderer produces the same block structure for both policies; an
//! [`OutputStyle`] only decides how individual pieces are spelled.

use crate::types::color::Color;
use crate::types::value::{Separator, format_number};

/// Spelling decisions shared by value rendering and block output.
pub trait OutputStyle {
    /// Compressed styles omit the last semicolon of each block.
    fn is_compressed(&self) -> bool;

    /// One level of indentation.
    fn indent_unit(&self) -> &'static str;

    /// Line terminator after statements and closing braces.
    fn newline(&self) -> &'static str;

    fn number(&self, value: f64, unit: &str) -> String;

    fn color(&self, color: &Color) -> String;

    fn separator(&self, sep: Separator) -> &'static str;

    /// Joins a selector list and opens its block.
    fn open_rule(&self, indent: &str, selectors: &[String]) -> String;

    /// Opens an at-rule block such as `@media screen`.
    fn open_at_rule(&self, indent: &str, prelude: &str) -> String;

    fn close_block(&self, indent: &str) -> String;

    /// A declaration; compressed styles leave the semicolon to the caller.
    fn property(&self, indent: &str, name: &str, value: &str, important: bool) -> String;

    /// A statement at-rule such as `@charset "utf-8";`.
    fn statement(&self, indent: &str, text: &str) -> String;

    /// A block comment, or `None` when the style drops it.
    fn comment(&self, indent: &str, text: &str) -> Option<String>;
}

/// Indented, one declaration per line.
#[derive(Clone, Copy, Debug, Default)]
pub struct Readable;

/// Whitespace-free output for production use.
#[derive(Clone, Copy, Debug, Default)]
pub struct Compressed;

fn color_function(color: &Color, separator: &str, alpha: String) -> String {
    let [r, g, b] = color.channels();
    format!("rgba({r}{separator}{g}{separator}{b}{separator}{alpha})")
}

impl OutputStyle for Readable {
    fn is_compressed(&self) -> bool {
        false
    }

    fn indent_unit(&self) -> &'static str {
        "  "
    }

    fn newline(&self) -> &'static str {
        "\n"
    }

    fn number(&self, value: f64, unit: &str) -> String {
        format!("{}{}", format_number(value), unit)
    }

    fn color(&self, color: &Color) -> String {
        if let Some(original) = &color.original {
            return original.clone();
        }
        if color.has_alpha && color.a < 1.0 {
            if color.a == 0.0 && color.channels() == [0, 0, 0] {
                return "transparent".to_string();
            }
            return color_function(color, ", ", format_number(color.a));
        }
        color.to_hex()
    }

    fn separator(&self, sep: Separator) -> &'static str {
        match sep {
            Separator::Comma => ", ",
            Separator::Space => " ",
            Separator::Colon => ": ",
            Separator::Slash => "/",
            Separator::None => "",
        }
    }

    fn open_rule(&self, indent: &str, selectors: &[String]) -> String {
        let joiner = format!(",\n{indent}");
        format!("{indent}{} {{\n", selectors.join(&joiner))
    }

    fn open_at_rule(&self, indent: &str, prelude: &str) -> String {
        format!("{indent}{prelude} {{\n")
    }

    fn close_block(&self, indent: &str) -> String {
        format!("{indent}}}\n")
    }

    fn property(&self, indent: &str, name: &str, value: &str, important: bool) -> String {
        let important = if important { " !important" } else { "" };
        format!("{indent}{name}: {value}{important};\n")
    }

    fn statement(&self, indent: &str, text: &str) -> String {
        format!("{indent}{text};\n")
    }

    fn comment(&self, indent: &str, text: &str) -> Option<String> {
        Some(format!("{indent}{text}\n"))
    }
}

impl OutputStyle for Compressed {
    fn is_compressed(&self) -> bool {
        true
    }

    fn indent_unit(&self) -> &'static str {
        ""
    }

    fn newline(&self) -> &'static str {
        ""
    }

    fn number(&self, value: f64, unit: &str) -> String {
        let text = format_number(value);
        let text = if let Some(rest) = text.strip_prefix("0.") {
            format!(".{rest}")
        } else if let Some(rest) = text.strip_prefix("-0.") {
            format!("-.{rest}")
        } else {
            text
        };
        format!("{text}{unit}")
    }

    fn color(&self, color: &Color) -> String {
        if let Some(original) = &color.original {
            if !original.starts_with('#') {
                return original.clone();
            }
        }
        if color.has_alpha && color.a < 1.0 {
            return color_function(color, ",", self.number(color.a, ""));
        }
        color.to_short_hex()
    }

    fn separator(&self, sep: Separator) -> &'static str {
        match sep {
            Separator::Comma => ",",
            Separator::Space => " ",
            Separator::Colon => ":",
            Separator::Slash => "/",
            Separator::None => "",
        }
    }

    fn open_rule(&self, _indent: &str, selectors: &[String]) -> String {
        format!("{}{{", selectors.join(","))
    }

    fn open_at_rule(&self, _indent: &str, prelude: &str) -> String {
        format!("{prelude}{{")
    }

    fn close_block(&self, _indent: &str) -> String {
        "}".to_string()
    }

    fn property(&self, _indent: &str, name: &str, value: &str, important: bool) -> String {
        let important = if important { "!important" } else { "" };
        format!("{name}:{value}{important}")
    }

    fn statement(&self, _indent: &str, text: &str) -> String {
        format!("{text};")
    }

    fn comment(&self, _indent: &str, text: &str) -> Option<String> {
        text.starts_with("/*!").then(|| text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readable_colors_keep_source_text() {
        let color = Color::parse("#FFF").unwrap();
        assert_eq!(Readable.color(&color), "#FFF");
        assert_eq!(Readable.color(&color.computed()), "#ffffff");
        assert_eq!(
            Readable.color(&Color::rgba(255.0, 0.0, 0.0, 0.5)),
            "rgba(255, 0, 0, 0.5)"
        );
    }

    #[test]
    fn test_compressed_colors() {
        assert_eq!(Compressed.color(&Color::parse("#ffffff").unwrap()), "#fff");
        assert_eq!(Compressed.color(&Color::parse("#123456").unwrap()), "#123456");
        assert_eq!(Compressed.color(&Color::parse("red").unwrap()), "red");
        assert_eq!(
            Compressed.color(&Color::rgba(0.0, 0.0, 0.0, 0.25)),
            "rgba(0,0,0,.25)"
        );
    }

    #[test]
    fn test_blocks() {
        let selectors = vec![".a".to_string(), ".b".to_string()];
        assert_eq!(Readable.open_rule("", &selectors), ".a,\n.b {\n");
        assert_eq!(Compressed.open_rule("", &selectors), ".a,.b{");
        assert_eq!(
            Readable.property("  ", "color", "red", true),
            "  color: red !important;\n"
        );
        assert_eq!(Compressed.comment("", "/* gone */"), None);
        assert_eq!(
            Compressed.comment("", "/*! kept */").as_deref(),
            Some("/*! kept */")
        );
    }
}
