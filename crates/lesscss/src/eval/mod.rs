//! Expression evaluation.
//!
//! An [`Evaluator`] reduces parsed expressions to [`Value`]s against a
//! [`ScopeStack`]. Variables are evaluated lazily at their point of use,
//! with only the frames visible at their declaration, and memoized in the
//! declaring frame.

mod functions;
mod ops;
pub mod scope;

pub use scope::ScopeStack;

use crate::error::{LessError, Result, SourcePosition};
use crate::helpers::ScriptValue;
use crate::options::{CompileOptions, RewriteUrls};
use crate::parser::ast::{Expr, Operator};
use crate::types::Value;
use crate::format::OutputStyle;
use indexmap::IndexMap;
use scope::Found;

pub struct Evaluator<'e, 'a> {
    scope: &'e mut ScopeStack<'a>,
    options: &'a CompileOptions,
    style: &'a dyn OutputStyle,
    /// Number of frames visible to the expression being evaluated.
    limit: usize,
    /// Declarations currently being evaluated, as `(frame, name)`.
    resolving: Vec<(usize, String)>,
    /// `/` outside parentheses stays a separator.
    literal_slash: bool,
    /// Arithmetic is printed rather than computed, as inside `calc()`.
    literal_math: bool,
    /// Result of `default()` while evaluating a mixin guard.
    default_guard: Option<bool>,
    /// Nesting of the enclosing rules plus variables being resolved.
    depth: usize,
}

impl<'e, 'a> Evaluator<'e, 'a> {
    pub fn new(scope: &'e mut ScopeStack<'a>, options: &'a CompileOptions, style: &'a dyn OutputStyle) -> Self {
        let limit = scope.len();
        Self {
            scope,
            options,
            style,
            limit,
            resolving: Vec::new(),
            literal_slash: false,
            literal_math: false,
            default_guard: None,
            depth: 0,
        }
    }

    /// Starts counting nesting from `depth`, the depth of the caller.
    pub fn at_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_literal_slash(mut self, literal_slash: bool) -> Self {
        self.literal_slash = literal_slash;
        self
    }

    /// Makes `default()` available, evaluating to `value`.
    pub fn with_default(mut self, value: Option<bool>) -> Self {
        self.default_guard = value;
        self
    }

    pub fn style(&self) -> &'a dyn OutputStyle {
        self.style
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Quoted {
                text,
                quote,
                escaped,
                pos,
            } => {
                let text = self.interpolate(text, pos)?;
                Ok(if *escaped {
                    Value::keyword(text)
                } else {
                    Value::quoted(text, *quote)
                })
            }
            Expr::Interpolated { template, pos } => Ok(Value::keyword(self.interpolate(template, pos)?)),
            Expr::Variable { name, pos } => self.lookup(name, pos),
            Expr::VariableVariable { name, pos } => {
                let target = self.lookup(name, pos)?.to_unquoted(self.style);
                let target = target.strip_prefix('@').unwrap_or(&target).to_string();
                self.lookup(&target, pos)
            }
            Expr::Group(inner) => self.eval_group(inner),
            Expr::Negate(inner, pos) => {
                let value = self.eval(inner)?;
                ops::negate(value, pos)
            }
            Expr::Operation { op, operands, pos } => ops::evaluate(self, *op, operands, pos),
            Expr::Call { name, args, pos } => functions::call(self, name, args, pos),
            Expr::Url {
                content,
                import_dir,
                ..
            } => self.eval_url(content, import_dir),
            Expr::Script { source, escaped, pos } => self.eval_script(source, *escaped, pos),
        }
    }

    /// Runs `evaluate` one level deeper, failing past `max_recursion`.
    fn nested<T>(
        &mut self,
        name: impl FnOnce() -> String,
        pos: &SourcePosition,
        evaluate: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.depth >= self.options.max_recursion {
            return Err(LessError::RecursionLimit {
                name: name(),
                limit: self.options.max_recursion,
                pos: pos.clone(),
            });
        }
        self.depth += 1;
        let result = evaluate(self);
        self.depth -= 1;
        result
    }

    fn eval_group(&mut self, inner: &Expr) -> Result<Value> {
        let pos = inner.position().cloned().unwrap_or_else(SourcePosition::unknown);
        self.nested(|| "nested expression".to_string(), &pos, |evaluator| evaluator.eval_group_inner(inner))
    }

    fn eval_group_inner(&mut self, inner: &Expr) -> Result<Value> {
        if let Expr::Operation { op: Operator::Colon, .. } = inner {
            let value = self.eval(inner)?;
            return Ok(Value::keyword(format!("({})", value.to_css(self.style))));
        }
        if self.literal_math {
            let value = self.eval(inner)?;
            return Ok(Value::keyword(format!("({})", value.to_css(self.style))));
        }
        let saved = std::mem::replace(&mut self.literal_slash, false);
        let result = self.eval(inner);
        self.literal_slash = saved;
        result
    }

    /// Resolves `@name` in the visible frames.
    pub fn lookup(&mut self, name: &str, pos: &SourcePosition) -> Result<Value> {
        let Some((frame, found)) = self.scope.find(name, self.limit) else {
            return Err(LessError::UndefinedVariable {
                name: name.to_string(),
                pos: pos.clone(),
            });
        };
        let expr = match found {
            Found::Value(value) => return Ok(value),
            Found::Ruleset(_) => {
                return Err(LessError::mismatch(
                    format!("@{name} is a detached ruleset and can only be called"),
                    pos.clone(),
                ));
            }
            Found::Expr(expr) => expr,
        };

        let key = (frame, name.to_string());
        if self.resolving.contains(&key) {
            return Err(LessError::syntax(
                format!("recursive variable definition for @{name}"),
                pos.clone(),
            ));
        }
        self.resolving.push(key);
        let saved = (self.limit, self.literal_slash, self.literal_math);
        self.limit = frame + 1;
        self.literal_slash = false;
        self.literal_math = false;
        let result = self.nested(|| format!("@{name}"), pos, |evaluator| evaluator.eval(expr));
        (self.limit, self.literal_slash, self.literal_math) = saved;
        self.resolving.pop();

        let value = result?;
        self.scope.remember(frame, name, value.clone());
        Ok(value)
    }

    /// Returns `true` if `@name` is a detached ruleset.
    pub fn is_ruleset(&self, name: &str) -> bool {
        matches!(self.scope.find(name, self.limit), Some((_, Found::Ruleset(_))))
    }

    /// Replaces every `@{name}` in `template` with the unquoted value of
    /// the variable.
    pub fn interpolate(&mut self, template: &str, pos: &SourcePosition) -> Result<String> {
        let mut output = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("@{") {
            let Some(len) = rest[start + 2..].find('}') else {
                break;
            };
            output.push_str(&rest[..start]);
            let name = &rest[start + 2..start + 2 + len];
            let value = self.lookup(name, pos)?;
            output.push_str(&value.to_unquoted(self.style));
            rest = &rest[start + 3 + len..];
        }
        output.push_str(rest);
        Ok(output)
    }

    /// Like [`interpolate`](Self::interpolate), also replacing plain
    /// `@name` references, as allowed in media queries.
    pub fn interpolate_query(&mut self, query: &str, pos: &SourcePosition) -> Result<String> {
        let query = self.interpolate(query, pos)?;
        let mut output = String::with_capacity(query.len());
        let mut chars = query.char_indices().peekable();
        while let Some((index, c)) = chars.next() {
            if c != '@' {
                output.push(c);
                continue;
            }
            let name: String = query[index + 1..]
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
                .collect();
            if name.is_empty() {
                output.push(c);
                continue;
            }
            for _ in 0..name.chars().count() {
                chars.next();
            }
            let value = self.lookup(&name, pos)?;
            output.push_str(&value.to_css(self.style));
        }
        Ok(output)
    }

    fn eval_url(&mut self, content: &Expr, import_dir: &str) -> Result<Value> {
        let value = self.eval(content)?;
        let (text, quote) = match value {
            Value::Str { text, quote } => (text, quote),
            other => (other.to_css(self.style), None),
        };
        let text = rewrite_url(&text, import_dir, self.options.rewrite_urls);
        Ok(Value::keyword(match quote {
            Some(q) => format!("url({q}{text}{q})"),
            None => format!("url({text})"),
        }))
    }

    fn eval_script(&mut self, source: &str, escaped: bool, pos: &SourcePosition) -> Result<Value> {
        let Some(evaluator) = self.options.script.as_deref() else {
            return Err(LessError::Script {
                message: "no script evaluator is configured".to_string(),
                pos: pos.clone(),
            });
        };
        let source = self.interpolate(source, pos)?;
        let mut bindings = IndexMap::new();
        for name in self.scope.visible_names(self.limit) {
            if let Ok(value) = self.lookup(&name, pos) {
                bindings.insert(name, ScriptValue::from_value(&value));
            }
        }
        evaluator
            .evaluate(&source, &bindings)
            .map(|result| result.into_value(escaped))
            .map_err(|message| LessError::Script {
                message,
                pos: pos.clone(),
            })
    }
}

/// Prefixes a relative URL with the importing file's directory.
pub(crate) fn rewrite_url(url: &str, import_dir: &str, mode: RewriteUrls) -> String {
    if import_dir.is_empty() || url.is_empty() {
        return url.to_string();
    }
    let absolute = url.starts_with('/')
        || url.starts_with('#')
        || url.starts_with("data:")
        || url.starts_with('@')
        || url.contains("://");
    if absolute {
        return url.to_string();
    }
    match mode {
        RewriteUrls::Off => url.to_string(),
        RewriteUrls::Local if !url.starts_with("./") && !url.starts_with("../") => url.to_string(),
        RewriteUrls::Local | RewriteUrls::All => {
            let url = url.strip_prefix("./").unwrap_or(url);
            format!("{import_dir}{url}")
        }
    }
}
