//! Built-in functions.
//!
//! Calls are dispatched by lowercase name. A name that is not built in is
//! not an error: the call is printed back as a plain CSS function with its
//! arguments evaluated, since it may be a native CSS function.

use super::Evaluator;
use crate::error::{LessError, Result, SourcePosition};
use crate::parser::ast::Expr;
use crate::types::units::{Conversion, convert};
use crate::types::{Color, Separator, Value};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::f64::consts::PI;

/// Characters `escape()` leaves alone, besides alphanumerics.
const ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b'@')
    .remove(b'&')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'');

/// Characters kept by the uppercase `%()` placeholders.
const COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Functions that receive the importing file's directory as an injected
/// first argument.
const PATH_FUNCTIONS: &[&str] = &["data-uri", "colorize-image"];

pub(super) fn call(ev: &mut Evaluator<'_, '_>, name: &str, args: &[Expr], pos: &SourcePosition) -> Result<Value> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "default" => {
            return ev.default_guard.map(Value::Bool).ok_or_else(|| {
                LessError::syntax("default() is only available in mixin guards", pos.clone())
            });
        }
        "isruleset" => {
            let is_ruleset = match args.first() {
                Some(Expr::Variable { name, .. }) => ev.is_ruleset(name),
                _ => false,
            };
            return Ok(Value::Bool(is_ruleset));
        }
        "calc" => {
            let saved = std::mem::replace(&mut ev.literal_math, true);
            let values = args.iter().map(|arg| ev.eval(arg)).collect::<Result<Vec<_>>>();
            ev.literal_math = saved;
            return Ok(passthrough(ev, name, &values?));
        }
        _ => {}
    }

    let values = args.iter().map(|arg| ev.eval(arg)).collect::<Result<Vec<_>>>()?;
    let call = Call {
        name,
        values: &values,
        pos,
    };
    if let Some(value) = builtin(ev, &lower, &call)? {
        return Ok(value);
    }

    if matches!(lower.as_str(), "svg-gradient" | "data-uri" | "colorize-image") {
        match ev.options.helpers.call(&lower, &values) {
            Some(Ok(text)) => return Ok(Value::keyword(text)),
            Some(Err(message)) => {
                return Err(LessError::mismatch(format!("{name}(): {message}"), pos.clone()));
            }
            None => {}
        }
    }

    if PATH_FUNCTIONS.contains(&lower.as_str()) && !values.is_empty() {
        return Ok(passthrough(ev, name, &values[1..]));
    }
    Ok(passthrough(ev, name, &values))
}

fn passthrough(ev: &Evaluator<'_, '_>, name: &str, values: &[Value]) -> Value {
    let style = ev.style();
    let args: Vec<String> = values.iter().map(|value| value.to_css(style)).collect();
    Value::keyword(format!("{name}({})", args.join(style.separator(Separator::Comma))))
}

/// Evaluated arguments of one call, with typed accessors.
struct Call<'c> {
    name: &'c str,
    values: &'c [Value],
    pos: &'c SourcePosition,
}

impl<'c> Call<'c> {
    fn error(&self, message: impl std::fmt::Display) -> LessError {
        LessError::mismatch(format!("{}(): {message}", self.name), self.pos.clone())
    }

    fn get(&self, index: usize) -> Result<&'c Value> {
        self.values
            .get(index)
            .ok_or_else(|| self.error(format!("expected at least {} arguments", index + 1)))
    }

    fn opt(&self, index: usize) -> Option<&'c Value> {
        self.values.get(index)
    }

    fn number(&self, index: usize) -> Result<f64> {
        match self.get(index)? {
            Value::Number { value, .. } | Value::Percent(value) => Ok(*value),
            other => Err(self.error(format!("{other} is not a number"))),
        }
    }

    fn dimension(&self, index: usize) -> Result<(f64, &'c str)> {
        let value = self.get(index)?;
        Ok((self.number(index)?, value.unit()))
    }

    fn color(&self, index: usize) -> Result<Color> {
        let value = self.get(index)?;
        value.as_color().ok_or_else(|| self.error(format!("{value} is not a color")))
    }

    /// An amount such as `10%` or `10`, as a fraction.
    fn amount(&self, index: usize) -> Result<f64> {
        Ok(self.number(index)? / 100.0)
    }

    /// A fraction given either as a percentage or as a plain number.
    fn fraction(&self, index: usize) -> Result<f64> {
        match self.get(index)? {
            Value::Percent(value) => Ok(value / 100.0),
            _ => self.number(index),
        }
    }

    /// A color channel given as 0-255 or as a percentage.
    fn channel(&self, index: usize) -> Result<f64> {
        match self.get(index)? {
            Value::Percent(value) => Ok(value * 2.55),
            _ => self.number(index),
        }
    }

    /// Saturation or lightness: percentages, or plain numbers above one
    /// read as percentages.
    fn hsl_fraction(&self, index: usize) -> Result<f64> {
        match self.get(index)? {
            Value::Percent(value) => Ok(value / 100.0),
            _ => {
                let value = self.number(index)?;
                Ok(if value > 1.0 { value / 100.0 } else { value })
            }
        }
    }

    fn text(&self, index: usize, ev: &Evaluator<'_, '_>) -> Result<String> {
        Ok(self.get(index)?.to_unquoted(ev.style()))
    }

    fn is_relative(&self, index: usize) -> bool {
        matches!(self.opt(index), Some(Value::Str { text, .. }) if text == "relative")
    }
}

fn builtin(ev: &Evaluator<'_, '_>, name: &str, call: &Call<'_>) -> Result<Option<Value>> {
    let value = match name {
        // math
        "percentage" => Value::Percent(call.number(0)? * 100.0),
        "floor" => map_number(call, f64::floor)?,
        "ceil" => map_number(call, f64::ceil)?,
        "sqrt" => map_number(call, f64::sqrt)?,
        "abs" => map_number(call, f64::abs)?,
        "round" => {
            let places = match call.opt(1) {
                Some(_) => call.number(1)?.max(0.0),
                None => 0.0,
            };
            let factor = 10f64.powi(places as i32);
            map_number(call, |v| (v * factor).round() / factor)?
        }
        "pow" => {
            let (base, unit) = call.dimension(0)?;
            Value::number(base.powf(call.number(1)?), unit)
        }
        "mod" => {
            let (a, unit) = call.dimension(0)?;
            let b = call.number(1)?;
            if b == 0.0 {
                return Err(call.error("division by zero"));
            }
            Value::number(a % b, unit)
        }
        "min" | "max" => return extremum(call, name == "max"),
        "pi" => Value::unitless(PI),
        "sin" | "cos" | "tan" => {
            let radians = to_radians(call)?;
            Value::unitless(match name {
                "sin" => radians.sin(),
                "cos" => radians.cos(),
                _ => radians.tan(),
            })
        }
        "asin" | "acos" | "atan" => {
            let x = call.number(0)?;
            let radians = match name {
                "asin" => x.asin(),
                "acos" => x.acos(),
                _ => x.atan(),
            };
            Value::number(radians, "rad")
        }

        // color definition
        "rgb" => {
            if let Some(color) = single_color(call) {
                return Ok(Some(Value::Color(color)));
            }
            Value::Color(Color::rgb(call.channel(0)?, call.channel(1)?, call.channel(2)?))
        }
        "rgba" => {
            if call.values.len() == 2 {
                return Ok(Some(Value::Color(call.color(0)?.with_alpha(call.fraction(1)?))));
            }
            let alpha = call.fraction(3)?;
            Value::Color(Color::rgba(call.channel(0)?, call.channel(1)?, call.channel(2)?, alpha))
        }
        "argb" => Value::keyword(call.color(0)?.to_argb_hex()),
        "hsl" => Value::Color(opaque(Color::from_hsl(
            call.number(0)?,
            call.hsl_fraction(1)?,
            call.hsl_fraction(2)?,
            1.0,
        ))),
        "hsla" => Value::Color(Color::from_hsl(
            call.number(0)?,
            call.hsl_fraction(1)?,
            call.hsl_fraction(2)?,
            call.fraction(3)?,
        )),
        "hsv" => Value::Color(opaque(Color::from_hsv(
            call.number(0)?,
            call.hsl_fraction(1)?,
            call.hsl_fraction(2)?,
            1.0,
        ))),
        "hsva" => Value::Color(Color::from_hsv(
            call.number(0)?,
            call.hsl_fraction(1)?,
            call.hsl_fraction(2)?,
            call.fraction(3)?,
        )),

        // channels
        "hue" => Value::unitless(call.color(0)?.to_hsl().0),
        "saturation" => Value::Percent(call.color(0)?.to_hsl().1 * 100.0),
        "lightness" => Value::Percent(call.color(0)?.to_hsl().2 * 100.0),
        "hsvhue" => Value::unitless(call.color(0)?.to_hsv().0),
        "hsvsaturation" => Value::Percent(call.color(0)?.to_hsv().1 * 100.0),
        "hsvvalue" => Value::Percent(call.color(0)?.to_hsv().2 * 100.0),
        "red" => Value::unitless(call.color(0)?.r),
        "green" => Value::unitless(call.color(0)?.g),
        "blue" => Value::unitless(call.color(0)?.b),
        "alpha" => Value::unitless(call.color(0)?.a),
        "luma" => {
            let color = call.color(0)?;
            Value::Percent(color.luma() * color.a * 100.0)
        }
        "luminance" => {
            let color = call.color(0)?;
            let luminance = (0.2126 * color.r + 0.7152 * color.g + 0.0722 * color.b) / 255.0;
            Value::Percent(luminance * color.a * 100.0)
        }

        // color operations
        "saturate" => adjust_hsl(call, Channel::Saturation, 1.0)?,
        "desaturate" => adjust_hsl(call, Channel::Saturation, -1.0)?,
        "lighten" => adjust_hsl(call, Channel::Lightness, 1.0)?,
        "darken" => adjust_hsl(call, Channel::Lightness, -1.0)?,
        "spin" => {
            let color = call.color(0)?;
            let (h, s, l) = color.to_hsl();
            let hue = (h + call.number(1)?).rem_euclid(360.0);
            Value::Color(keep_alpha(&color, Color::from_hsl(hue, s, l, color.a)))
        }
        "fade" => Value::Color(call.color(0)?.with_alpha(call.amount(1)?)),
        "fadein" | "fadeout" => {
            let color = call.color(0)?;
            let mut amount = call.amount(1)?;
            if call.is_relative(2) {
                amount *= color.a;
            }
            let alpha = if name == "fadein" { color.a + amount } else { color.a - amount };
            Value::Color(color.with_alpha(alpha.clamp(0.0, 1.0)))
        }
        "greyscale" => {
            let color = call.color(0)?;
            let (h, _, l) = color.to_hsl();
            Value::Color(keep_alpha(&color, Color::from_hsl(h, 0.0, l, color.a)))
        }
        "mix" => {
            let weight = match call.opt(2) {
                Some(_) => call.amount(2)?,
                None => 0.5,
            };
            Value::Color(mix(&call.color(0)?, &call.color(1)?, weight))
        }
        "tint" => {
            let weight = call.opt(1).map(|_| call.amount(1)).transpose()?.unwrap_or(0.5);
            Value::Color(mix(&Color::rgb(255.0, 255.0, 255.0), &call.color(0)?, weight))
        }
        "shade" => {
            let weight = call.opt(1).map(|_| call.amount(1)).transpose()?.unwrap_or(0.5);
            Value::Color(mix(&Color::rgb(0.0, 0.0, 0.0), &call.color(0)?, weight))
        }
        "contrast" => {
            let Ok(color) = call.color(0) else {
                return Ok(None);
            };
            let mut dark = match call.opt(1) {
                Some(_) => call.color(1)?,
                None => Color::rgb(0.0, 0.0, 0.0),
            };
            let mut light = match call.opt(2) {
                Some(_) => call.color(2)?,
                None => Color::rgb(255.0, 255.0, 255.0),
            };
            if dark.luma() > light.luma() {
                std::mem::swap(&mut dark, &mut light);
            }
            let threshold = match call.opt(3) {
                Some(_) => call.fraction(3)?,
                None => 0.43,
            };
            Value::Color(if color.luma() < threshold { light } else { dark })
        }

        // units
        "unit" => {
            let value = call.number(0)?;
            let unit = match call.opt(1) {
                Some(_) => call.text(1, ev)?,
                None => String::new(),
            };
            Value::number(value, unit)
        }
        "get-unit" => Value::keyword(call.get(0)?.unit()),
        "convert" => {
            let (value, from) = call.dimension(0)?;
            let to = call.text(1, ev)?;
            match convert(value, from, &to) {
                Conversion::Converted(converted) => Value::number(converted, to),
                Conversion::Unrelated | Conversion::Incompatible => call.get(0)?.clone(),
            }
        }

        // lists
        "length" => Value::unitless(call.get(0)?.items().len() as f64),
        "extract" => {
            let items = call.get(0)?.items();
            let index = call.number(1)?;
            if index < 1.0 || index.fract() != 0.0 || index as usize > items.len() {
                return Err(call.error(format!("index {index} is out of range")));
            }
            items[index as usize - 1].clone()
        }

        // strings
        "e" => Value::keyword(call.text(0, ev)?),
        "escape" => Value::keyword(utf8_percent_encode(&call.text(0, ev)?, ESCAPE_SET).to_string()),
        "%" => format_string(call, ev)?,
        "replace" => {
            let subject = call.get(0)?;
            let pattern = call.text(1, ev)?;
            let replacement = call.text(2, ev)?;
            let global = match call.opt(3) {
                Some(_) => call.text(3, ev)?.contains('g'),
                None => false,
            };
            let text = subject.to_unquoted(ev.style());
            let replaced = if global {
                text.replace(&pattern, &replacement)
            } else {
                text.replacen(&pattern, &replacement, 1)
            };
            with_quote_of(subject, replaced)
        }

        // type tests
        "iscolor" => Value::Bool(call.get(0)?.as_color().is_some()),
        "isnumber" => Value::Bool(matches!(call.get(0)?, Value::Number { .. } | Value::Percent(_))),
        "isstring" => Value::Bool(matches!(call.get(0)?, Value::Str { quote: Some(_), .. })),
        "iskeyword" => Value::Bool(
            matches!(call.get(0)?, Value::Str { text, quote: None } if !Color::is_keyword(text) && !text.starts_with("url(")),
        ),
        "isurl" => Value::Bool(matches!(call.get(0)?, Value::Str { text, quote: None } if text.starts_with("url("))),
        "ispixel" => Value::Bool(has_unit(call.get(0)?, "px")),
        "isem" => Value::Bool(has_unit(call.get(0)?, "em")),
        "ispercentage" => Value::Bool(matches!(call.get(0)?, Value::Percent(_))),
        "isunit" => {
            let unit = call.text(1, ev)?;
            Value::Bool(has_unit(call.get(0)?, &unit))
        }

        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn map_number(call: &Call<'_>, f: impl Fn(f64) -> f64) -> Result<Value> {
    let (value, unit) = call.dimension(0)?;
    Ok(Value::number(f(value), unit))
}

fn has_unit(value: &Value, unit: &str) -> bool {
    match value {
        Value::Number { unit: own, .. } => own.eq_ignore_ascii_case(unit),
        Value::Percent(_) => unit == "%",
        _ => false,
    }
}

/// `rgb(#abc)` style calls with a single color argument.
fn single_color(call: &Call<'_>) -> Option<Color> {
    match call.values {
        [value] => value.as_color().map(|color| color.computed()),
        _ => None,
    }
}

fn opaque(mut color: Color) -> Color {
    color.has_alpha = false;
    color.a = 1.0;
    color
}

/// Carries the alpha significance of `source` over to a derived color.
fn keep_alpha(source: &Color, mut derived: Color) -> Color {
    derived.has_alpha = source.has_alpha;
    derived
}

#[derive(Clone, Copy)]
enum Channel {
    Saturation,
    Lightness,
}

/// Moves saturation or lightness by the amount in the second argument.
/// With `relative` the amount scales the current level instead.
fn adjust_hsl(call: &Call<'_>, channel: Channel, sign: f64) -> Result<Value> {
    let color = call.color(0)?;
    let (h, mut s, mut l) = color.to_hsl();
    let target = match channel {
        Channel::Saturation => &mut s,
        Channel::Lightness => &mut l,
    };
    let mut amount = call.amount(1)?;
    if call.is_relative(2) {
        amount *= *target;
    }
    *target = (*target + sign * amount).clamp(0.0, 1.0);
    Ok(Value::Color(keep_alpha(&color, Color::from_hsl(h, s, l, color.a))))
}

/// Weighted mix of two colors, taking alpha into account.
fn mix(first: &Color, second: &Color, weight: f64) -> Color {
    let w = weight * 2.0 - 1.0;
    let a = first.a - second.a;
    let w1 = (if w * a == -1.0 { w } else { (w + a) / (1.0 + w * a) } + 1.0) / 2.0;
    let w2 = 1.0 - w1;
    let alpha = first.a * weight + second.a * (1.0 - weight);
    let color = Color::rgba(
        first.r * w1 + second.r * w2,
        first.g * w1 + second.g * w2,
        first.b * w1 + second.b * w2,
        alpha,
    );
    if first.has_alpha || second.has_alpha { color } else { opaque(color) }
}

fn to_radians(call: &Call<'_>) -> Result<f64> {
    let (value, unit) = call.dimension(0)?;
    if unit.is_empty() || unit.eq_ignore_ascii_case("rad") {
        return Ok(value);
    }
    match convert(value, unit, "rad") {
        Conversion::Converted(radians) => Ok(radians),
        Conversion::Unrelated | Conversion::Incompatible => Err(call.error(format!("{unit} is not an angle"))),
    }
}

/// `min()`/`max()`; calls mixing unrelated units are left to the browser.
fn extremum(call: &Call<'_>, max: bool) -> Result<Option<Value>> {
    let mut best: Option<(&Value, f64)> = None;
    let unit = call
        .values
        .iter()
        .map(Value::unit)
        .find(|unit| !unit.is_empty())
        .unwrap_or("");
    for value in call.values {
        let (Value::Number { .. } | Value::Percent(_)) = value else {
            return Ok(None);
        };
        let raw = value.as_number().unwrap_or_default();
        let own = value.unit();
        let comparable = if own.is_empty() || unit.is_empty() || own.eq_ignore_ascii_case(unit) {
            raw
        } else {
            match convert(raw, own, unit) {
                Conversion::Converted(converted) => converted,
                Conversion::Unrelated | Conversion::Incompatible => return Ok(None),
            }
        };
        let better = match best {
            None => true,
            Some((_, current)) if max => comparable > current,
            Some((_, current)) => comparable < current,
        };
        if better {
            best = Some((value, comparable));
        }
    }
    match best {
        Some((value, _)) => Ok(Some(value.clone())),
        None => Err(call.error("expected at least one argument")),
    }
}

/// `%(format, args...)`: `%s` inserts text, `%d` and `%a` insert values;
/// uppercase placeholders URL-encode what they insert.
fn format_string(call: &Call<'_>, ev: &Evaluator<'_, '_>) -> Result<Value> {
    let template = call.get(0)?;
    let text = template.to_unquoted(ev.style());
    let mut args = call.values[1..].iter();
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            output.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                output.push('%');
            }
            Some(kind @ ('s' | 'S' | 'd' | 'D' | 'a' | 'A')) => {
                chars.next();
                let Some(arg) = args.next() else {
                    output.push('%');
                    output.push(kind);
                    continue;
                };
                let inserted = match kind.to_ascii_lowercase() {
                    's' => arg.to_unquoted(ev.style()),
                    _ => arg.to_css(ev.style()),
                };
                if kind.is_ascii_uppercase() {
                    output.extend(utf8_percent_encode(&inserted, COMPONENT_SET));
                } else {
                    output.push_str(&inserted);
                }
            }
            _ => output.push(c),
        }
    }
    Ok(with_quote_of(template, output))
}

fn with_quote_of(source: &Value, text: String) -> Value {
    match source {
        Value::Str { quote: Some(q), .. } => Value::quoted(text, *q),
        _ => Value::keyword(text),
    }
}
