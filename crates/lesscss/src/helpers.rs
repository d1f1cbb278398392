//! Boundaries to collaborators outside the compiler core: inline script
//! evaluation and image helper functions.

use crate::types::Value;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;

/// A value crossing the script evaluator boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptValue {
    Number(f64),
    Bool(bool),
    Str(String),
    List(Vec<ScriptValue>),
}

impl ScriptValue {
    pub(crate) fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(*b),
            Value::Number { value, .. } | Value::Percent(value) => Self::Number(*value),
            Value::Color(color) => Self::Str(color.to_hex()),
            Value::Str { text, .. } => Self::Str(text.clone()),
            Value::List { items, .. } => Self::List(items.iter().map(Self::from_value).collect()),
        }
    }

    /// Converts a script result back into a value; strings come back quoted
    /// unless the script literal was escaped.
    pub(crate) fn into_value(self, escaped: bool) -> Value {
        match self {
            Self::Number(n) => Value::unitless(n),
            Self::Bool(b) => Value::Bool(b),
            Self::Str(text) if escaped => Value::keyword(text),
            Self::Str(text) => Value::quoted(text, '"'),
            Self::List(items) => Value::list(
                items.into_iter().map(|item| item.into_value(escaped)).collect(),
                crate::types::Separator::Comma,
            ),
        }
    }
}

/// Evaluates backtick script literals such as `` `"hello".toUpperCase()` ``.
pub trait ScriptEvaluator {
    /// `bindings` maps every visible variable name (without `@`) to its value.
    fn evaluate(
        &self,
        script: &str,
        bindings: &IndexMap<String, ScriptValue>,
    ) -> Result<ScriptValue, String>;
}

/// Image helper functions whose results are spliced into the output.
pub trait HelperFunctions {
    /// Returns `None` if `name` is not handled, leaving the call in the
    /// output unchanged.
    fn call(&self, name: &str, args: &[Value]) -> Option<Result<String, String>>;
}

/// Helpers that need nothing beyond the compiler itself.
///
/// `svg-gradient` produces an inline base64 SVG image; `data-uri` leaves
/// the resource as a plain `url()` relative to the importing file;
/// `colorize-image` is not handled.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinHelpers;

impl HelperFunctions for BuiltinHelpers {
    fn call(&self, name: &str, args: &[Value]) -> Option<Result<String, String>> {
        match name {
            "svg-gradient" => Some(svg_gradient(args)),
            "data-uri" => Some(data_uri(args)),
            _ => None,
        }
    }
}

/// `data-uri([mime,] url)`, with the base path injected by the parser as
/// the first argument.
fn data_uri(args: &[Value]) -> Result<String, String> {
    let (base, rest) = args
        .split_first()
        .ok_or_else(|| "data-uri expects a url".to_string())?;
    let url = rest
        .last()
        .ok_or_else(|| "data-uri expects a url".to_string())?;
    let base = unquoted(base);
    let url = unquoted(url);
    let path = if url.starts_with('/') || url.contains("://") {
        url
    } else {
        format!("{base}{url}")
    };
    Ok(format!("url(\"{path}\")"))
}

fn unquoted(value: &Value) -> String {
    match value {
        Value::Str { text, .. } => text.clone(),
        other => other.to_string(),
    }
}

fn svg_gradient(args: &[Value]) -> Result<String, String> {
    const USAGE: &str = "svg-gradient expects a direction and at least two color stops";

    let (direction, stops) = args.split_first().ok_or_else(|| USAGE.to_string())?;
    if stops.len() < 2 {
        return Err(USAGE.to_string());
    }

    let direction = direction.to_string();
    let (element, geometry) = match direction.as_str() {
        "to bottom" => ("linearGradient", r#"x1="0%" y1="0%" x2="0%" y2="100%""#),
        "to right" => ("linearGradient", r#"x1="0%" y1="0%" x2="100%" y2="0%""#),
        "to bottom right" => ("linearGradient", r#"x1="0%" y1="0%" x2="100%" y2="100%""#),
        "to top right" => ("linearGradient", r#"x1="0%" y1="100%" x2="100%" y2="0%""#),
        "ellipse" | "ellipse at center" => (
            "radialGradient",
            r#"cx="50%" cy="50%" r="75%""#,
        ),
        other => return Err(format!("svg-gradient: unsupported direction `{other}`")),
    };

    let mut body = String::new();
    let last = stops.len() - 1;
    for (index, stop) in stops.iter().enumerate() {
        let items = stop.items();
        let color = items
            .first()
            .and_then(Value::as_color)
            .ok_or_else(|| format!("svg-gradient: `{stop}` is not a color stop"))?;
        let offset = match items.get(1) {
            Some(Value::Percent(p)) => *p,
            Some(Value::Number { value, .. }) => *value,
            Some(other) => return Err(format!("svg-gradient: invalid stop position `{other}`")),
            None if index == 0 => 0.0,
            None if index == last => 100.0,
            None => 100.0 * index as f64 / last as f64,
        };
        body.push_str(&format!(
            r#"<stop offset="{}%" stop-color="{}""#,
            crate::types::format_number(offset),
            color.to_hex()
        ));
        if color.has_alpha && color.a < 1.0 {
            body.push_str(&format!(
                r#" stop-opacity="{}""#,
                crate::types::format_number(color.a)
            ));
        }
        body.push_str("/>");
    }

    let svg = format!(
        concat!(
            r#"<?xml version="1.0" ?>"#,
            r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="100%" height="100%" viewBox="0 0 1 1" preserveAspectRatio="none">"#,
            r#"<{element} id="gradient" gradientUnits="userSpaceOnUse" {geometry}>{body}</{element}>"#,
            r#"<rect x="0" y="0" width="1" height="1" fill="url(#gradient)" /></svg>"#
        ),
        element = element,
        geometry = geometry,
        body = body
    );
    Ok(format!("url('data:image/svg+xml;base64,{}')", STANDARD.encode(svg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, Separator};

    #[test]
    fn test_svg_gradient_is_base64_svg() {
        let args = vec![
            Value::list(
                vec![Value::keyword("to"), Value::keyword("right")],
                Separator::Space,
            ),
            Value::Color(Color::rgb(255.0, 0.0, 0.0)),
            Value::Color(Color::rgb(0.0, 0.0, 255.0)),
        ];
        let result = BuiltinHelpers.call("svg-gradient", &args).unwrap().unwrap();
        assert!(result.starts_with("url('data:image/svg+xml;base64,"));

        let encoded = result
            .trim_start_matches("url('data:image/svg+xml;base64,")
            .trim_end_matches("')");
        let svg = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert!(svg.contains(r##"<stop offset="0%" stop-color="#ff0000"/>"##));
        assert!(svg.contains(r##"<stop offset="100%" stop-color="#0000ff"/>"##));
    }

    #[test]
    fn test_svg_gradient_rejects_single_stop() {
        let args = vec![
            Value::keyword("ellipse"),
            Value::Color(Color::rgb(255.0, 0.0, 0.0)),
        ];
        assert!(BuiltinHelpers.call("svg-gradient", &args).unwrap().is_err());
    }

    #[test]
    fn test_data_uri_passthrough() {
        let args = vec![Value::quoted("img/", '"'), Value::quoted("logo.png", '"')];
        assert_eq!(
            BuiltinHelpers.call("data-uri", &args),
            Some(Ok("url(\"img/logo.png\")".to_string()))
        );
        assert_eq!(BuiltinHelpers.call("colorize-image", &args), None);
    }

    #[test]
    fn test_script_values() {
        let value = Value::list(
            vec![Value::number(2.0, "px"), Value::quoted("a", '"')],
            Separator::Space,
        );
        assert_eq!(
            ScriptValue::from_value(&value),
            ScriptValue::List(vec![ScriptValue::Number(2.0), ScriptValue::Str("a".into())])
        );
        assert_eq!(
            ScriptValue::Str("x".into()).into_value(true),
            Value::keyword("x")
        );
    }
}
