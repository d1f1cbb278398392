//! Operators: lists, logic, comparisons and arithmetic.

use super::Evaluator;
use crate::error::{LessError, Result, SourcePosition};
use crate::format::OutputStyle;
use crate::parser::ast::{Expr, Operator};
use crate::types::units::{Conversion, convert};
use crate::types::{Color, Separator, Value};
use std::cmp::Ordering;

pub(super) fn evaluate(
    ev: &mut Evaluator<'_, '_>,
    op: Operator,
    operands: &[Expr],
    pos: &SourcePosition,
) -> Result<Value> {
    match op {
        Operator::Comma | Operator::Space | Operator::Concat | Operator::Colon => {
            let sep = match op {
                Operator::Comma => Separator::Comma,
                Operator::Space => Separator::Space,
                Operator::Colon => Separator::Colon,
                _ => Separator::None,
            };
            Ok(Value::list(eval_all(ev, operands)?, sep))
        }
        Operator::And => {
            for operand in operands {
                if !ev.eval(operand)?.as_bool() {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Operator::Or => {
            for operand in operands {
                if ev.eval(operand)?.as_bool() {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Operator::Not => {
            let value = match operands.first() {
                Some(operand) => ev.eval(operand)?.as_bool(),
                None => false,
            };
            Ok(Value::Bool(!value))
        }
        Operator::Eq | Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => {
            let [left, right] = operands else {
                return Err(LessError::syntax("comparison needs two operands", pos.clone()));
            };
            let left = ev.eval(left)?;
            let right = ev.eval(right)?;
            compare(op, &left, &right, ev.style(), pos).map(Value::Bool)
        }
        Operator::Div if ev.literal_slash => Ok(Value::list(eval_all(ev, operands)?, Separator::Slash)),
        Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => {
            if ev.literal_math {
                let style = ev.style();
                let parts: Vec<String> = eval_all(ev, operands)?.iter().map(|v| v.to_css(style)).collect();
                return Ok(Value::keyword(parts.join(&format!(" {} ", op.symbol()))));
            }
            let mut operands = operands.iter();
            let Some(first) = operands.next() else {
                return Err(LessError::syntax("operation without operands", pos.clone()));
            };
            let mut acc = ev.eval(first)?;
            for operand in operands {
                let rhs = ev.eval(operand)?;
                acc = arithmetic(op, acc, rhs, pos)?;
            }
            Ok(acc)
        }
    }
}

fn eval_all(ev: &mut Evaluator<'_, '_>, operands: &[Expr]) -> Result<Vec<Value>> {
    operands.iter().map(|operand| ev.eval(operand)).collect()
}

/// A one-item list behaves like its item.
fn unwrap_single(value: Value) -> Value {
    match value {
        Value::List { mut items, .. } if items.len() == 1 => items.remove(0),
        other => other,
    }
}

pub(super) fn negate(value: Value, pos: &SourcePosition) -> Result<Value> {
    match unwrap_single(value) {
        Value::Number { value, unit } => Ok(Value::Number { value: -value, unit }),
        Value::Percent(value) => Ok(Value::Percent(-value)),
        Value::Str { text, quote: None } => Ok(Value::keyword(format!("-{text}"))),
        other => Err(LessError::mismatch(format!("cannot negate {other}"), pos.clone())),
    }
}

/// Applies `+ - * /` to two values.
pub(crate) fn arithmetic(op: Operator, left: Value, right: Value, pos: &SourcePosition) -> Result<Value> {
    let left = unwrap_single(left);
    let right = unwrap_single(right);
    let left_color = color_operand(&left);
    let right_color = color_operand(&right);
    match (left_color, right_color) {
        (Some(a), Some(b)) => color_math(op, &a, &b, pos).map(Value::Color),
        (Some(a), None) => {
            let n = number_operand(&right, op, pos)?;
            color_math(op, &a, &Color::rgb(n, n, n), pos).map(Value::Color)
        }
        (None, Some(b)) => {
            let n = number_operand(&left, op, pos)?;
            color_math(op, &Color::rgb(n, n, n), &b, pos).map(Value::Color)
        }
        (None, None) => number_math(op, &left, &right, pos),
    }
}

fn color_operand(value: &Value) -> Option<Color> {
    match value {
        Value::Color(color) => Some(color.clone()),
        Value::Str { quote: None, .. } => value.as_color(),
        _ => None,
    }
}

fn number_operand(value: &Value, op: Operator, pos: &SourcePosition) -> Result<f64> {
    match value {
        Value::Number { value, .. } | Value::Percent(value) => Ok(*value),
        other => Err(LessError::mismatch(
            format!("operator {} cannot be applied to {other}", op.symbol()),
            pos.clone(),
        )),
    }
}

fn apply(op: Operator, a: f64, b: f64, pos: &SourcePosition) -> Result<f64> {
    match op {
        Operator::Add => Ok(a + b),
        Operator::Sub => Ok(a - b),
        Operator::Mul => Ok(a * b),
        Operator::Div if b == 0.0 => Err(LessError::mismatch("division by zero", pos.clone())),
        Operator::Div => Ok(a / b),
        other => Err(LessError::syntax(
            format!("{} is not an arithmetic operator", other.symbol()),
            pos.clone(),
        )),
    }
}

/// Per-channel math; the result is opaque unless both sides carry alpha.
fn color_math(op: Operator, a: &Color, b: &Color, pos: &SourcePosition) -> Result<Color> {
    let r = apply(op, a.r, b.r, pos)?.clamp(0.0, 255.0);
    let g = apply(op, a.g, b.g, pos)?.clamp(0.0, 255.0);
    let blue = apply(op, a.b, b.b, pos)?.clamp(0.0, 255.0);
    if a.has_alpha && b.has_alpha {
        Ok(Color::rgba(r, g, blue, a.a * (1.0 - b.a) + b.a))
    } else {
        Ok(Color::rgb(r, g, blue))
    }
}

fn number_math(op: Operator, left: &Value, right: &Value, pos: &SourcePosition) -> Result<Value> {
    let (Some(a), Some(mut b)) = (numeric(left), numeric(right)) else {
        return Err(LessError::mismatch(
            format!("operator {} cannot be applied to {left} and {right}", op.symbol()),
            pos.clone(),
        ));
    };
    let (left_unit, right_unit) = (left.unit(), right.unit());
    let unit = if left_unit.is_empty() { right_unit } else { left_unit };

    if matches!(op, Operator::Add | Operator::Sub)
        && !left_unit.is_empty()
        && !right_unit.is_empty()
        && !left_unit.eq_ignore_ascii_case(right_unit)
    {
        match convert(b, right_unit, left_unit) {
            Conversion::Converted(converted) => b = converted,
            Conversion::Incompatible => {
                log::debug!("{pos}: adding {right_unit} to {left_unit} without conversion");
            }
            Conversion::Unrelated => {}
        }
    }
    Ok(Value::number(apply(op, a, b, pos)?, unit))
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number { value, .. } | Value::Percent(value) => Some(*value),
        _ => None,
    }
}

/// Evaluates a comparison. Values that cannot be ordered compare false;
/// numbers in units of different groups are an error.
pub(crate) fn compare(
    op: Operator,
    left: &Value,
    right: &Value,
    style: &dyn OutputStyle,
    pos: &SourcePosition,
) -> Result<bool> {
    let left = unwrap_single(left.clone());
    let right = unwrap_single(right.clone());
    let ordering = match (&left, &right) {
        (Value::Number { .. } | Value::Percent(_), Value::Number { .. } | Value::Percent(_)) => {
            compare_numbers(&left, &right, pos)?
        }
        (Value::Color(a), other) | (other, Value::Color(a)) => match other.as_color() {
            Some(b) => {
                let (a, b) = (a.argb(), b.argb());
                if matches!(left, Value::Color(_)) {
                    Some(a.cmp(&b))
                } else {
                    Some(b.cmp(&a))
                }
            }
            None => None,
        },
        (Value::Str { text: a, .. }, Value::Str { text: b, .. }) => Some(a.cmp(b)),
        _ if op == Operator::Eq => {
            let same = left.to_unquoted(style) == right.to_unquoted(style);
            Some(if same { Ordering::Equal } else { Ordering::Less })
        }
        _ => None,
    };
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Le => ordering != Ordering::Greater,
        Operator::Ge => ordering != Ordering::Less,
        _ => false,
    })
}

fn compare_numbers(left: &Value, right: &Value, pos: &SourcePosition) -> Result<Option<Ordering>> {
    let (Some(a), Some(b)) = (numeric(left), numeric(right)) else {
        return Ok(None);
    };
    let (left_unit, right_unit) = (left.unit(), right.unit());
    let b = if !left_unit.is_empty() && !right_unit.is_empty() && !left_unit.eq_ignore_ascii_case(right_unit) {
        match convert(b, right_unit, left_unit) {
            Conversion::Converted(converted) => converted,
            Conversion::Unrelated => return Ok(None),
            Conversion::Incompatible => {
                return Err(LessError::mismatch(
                    format!("cannot compare {left_unit} with {right_unit}"),
                    pos.clone(),
                ));
            }
        }
    } else {
        b
    };
    Ok(a.partial_cmp(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Readable;

    fn pos() -> SourcePosition {
        SourcePosition::unknown()
    }

    fn color(text: &str) -> Value {
        Value::Color(Color::parse(text).unwrap())
    }

    #[test]
    fn test_color_arithmetic_clamps_channels() {
        let sum = arithmetic(Operator::Add, color("#000000"), color("#ffffff"), &pos()).unwrap();
        assert_eq!(sum.to_string(), "#ffffff");
        let doubled = arithmetic(Operator::Mul, color("#808080"), Value::unitless(2.0), &pos()).unwrap();
        assert_eq!(doubled.to_string(), "#ffffff");
        let diff = arithmetic(Operator::Sub, color("#334455"), Value::unitless(17.0), &pos()).unwrap();
        assert_eq!(diff.to_string(), "#223344");
    }

    #[test]
    fn test_alpha_is_kept_only_when_both_sides_have_it() {
        let a = Value::Color(Color::rgba(10.0, 10.0, 10.0, 0.5));
        let b = Value::Color(Color::rgba(10.0, 10.0, 10.0, 0.5));
        let Value::Color(mixed) = arithmetic(Operator::Add, a.clone(), b, &pos()).unwrap() else {
            panic!("expected a color");
        };
        assert!(mixed.has_alpha);
        assert!((mixed.a - 0.75).abs() < 1e-9);

        let Value::Color(opaque) = arithmetic(Operator::Add, a, color("#000"), &pos()).unwrap() else {
            panic!("expected a color");
        };
        assert!(!opaque.has_alpha);
    }

    #[test]
    fn test_unit_conversion_in_addition() {
        let sum = arithmetic(Operator::Add, Value::number(1.0, "in"), Value::number(96.0, "px"), &pos()).unwrap();
        assert_eq!(sum.to_string(), "2in");
        let sum = arithmetic(Operator::Add, Value::unitless(2.0), Value::number(3.0, "em"), &pos()).unwrap();
        assert_eq!(sum.to_string(), "5em");
        let mixed = arithmetic(Operator::Add, Value::number(1.0, "px"), Value::number(1.0, "s"), &pos()).unwrap();
        assert_eq!(mixed.to_string(), "2px");
    }

    #[test]
    fn test_multiplication_keeps_left_unit() {
        let product = arithmetic(Operator::Mul, Value::number(2.0, "px"), Value::number(3.0, "em"), &pos()).unwrap();
        assert_eq!(product.to_string(), "6px");
        let quotient = arithmetic(Operator::Div, Value::unitless(10.0), Value::number(4.0, "px"), &pos()).unwrap();
        assert_eq!(quotient.to_string(), "2.5px");
        let err = arithmetic(Operator::Div, Value::unitless(1.0), Value::unitless(0.0), &pos());
        assert!(err.is_err());
    }

    #[test]
    fn test_comparisons() {
        let check = |op, left: &Value, right: &Value| compare(op, left, right, &Readable, &pos()).unwrap();
        assert!(check(Operator::Gt, &Value::number(1.0, "in"), &Value::number(50.0, "px")));
        assert!(check(Operator::Le, &Value::number(10.0, "px"), &Value::number(10.0, "px")));
        assert!(!check(Operator::Lt, &Value::number(1.0, "px"), &Value::number(1.0, "em")));
        assert!(check(Operator::Eq, &color("red"), &color("#ff0000")));
        assert!(check(Operator::Eq, &Value::keyword("dark"), &Value::quoted("dark", '"')));
        assert!(check(Operator::Lt, &Value::keyword("apple"), &Value::keyword("banana")));
        assert!(check(Operator::Eq, &Value::quoted("1", '"'), &Value::unitless(1.0)));
    }

    #[test]
    fn test_comparing_unit_groups_fails() {
        let result = compare(Operator::Lt, &Value::number(1.0, "px"), &Value::number(1.0, "s"), &Readable, &pos());
        assert!(matches!(result, Err(LessError::TypeMismatch { .. })));
    }

    #[test]
    fn test_negate() {
        assert_eq!(negate(Value::number(2.0, "px"), &pos()).unwrap().to_string(), "-2px");
        assert_eq!(negate(Value::keyword("x"), &pos()).unwrap().to_string(), "-x");
        assert!(negate(Value::Bool(true), &pos()).is_err());
    }
}
