//! Error types for LESS compilation.
//!
//! Every error carries the position it originated from. While an error
//! propagates out of nested rules, mixin expansions and imports, each level
//! may wrap it with [`LessError::Context`] so the final message reads like a
//! short backtrace.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Location of a parsed node in its source file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourcePosition {
    pub file: Option<Arc<str>>,
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(file: Option<Arc<str>>, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// A position for synthesized nodes that have no source.
    pub const fn unknown() -> Self {
        Self {
            file: None,
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 && self.column == 0 {
            return write!(f, "<unknown>");
        }
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// Errors that can occur while compiling a stylesheet.
///
/// # Examples
///
/// ```rust
/// use lesscss::{compile_str, LessError};
///
/// let err = compile_str(".a { .missing(); }").unwrap_err();
/// assert!(matches!(err.root(), LessError::UndefinedMixin { .. }));
/// ```
#[derive(Error, Debug)]
pub enum LessError {
    /// The parser found input it cannot make sense of.
    #[error("syntax error at {pos}: {message}")]
    Syntax { message: String, pos: SourcePosition },

    /// A variable was referenced but is not visible from the current scope.
    #[error("undefined variable @{name} at {pos}")]
    UndefinedVariable { name: String, pos: SourcePosition },

    /// A mixin call names something that was never defined.
    #[error("undefined mixin {name} at {pos}")]
    UndefinedMixin { name: String, pos: SourcePosition },

    /// Definitions with the mixin's name exist but none accepts the arguments.
    #[error("no definition of {name} accepts the given arguments at {pos}")]
    NoMatchingMixin { name: String, pos: SourcePosition },

    /// Operands that cannot be combined, such as `1px + 1s`.
    #[error("type mismatch at {pos}: {message}")]
    TypeMismatch { message: String, pos: SourcePosition },

    /// An import target could not be read.
    #[error("could not load import {path}")]
    Resource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Rules, mixins or variable references nested deeper than the
    /// configured limit.
    #[error("maximum recursion depth {limit} exceeded while expanding {name} at {pos}")]
    RecursionLimit {
        name: String,
        limit: usize,
        pos: SourcePosition,
    },

    /// The script evaluator is missing or rejected an inline script.
    #[error("script error at {pos}: {message}")]
    Script { message: String, pos: SourcePosition },

    /// An error raised inside the rule, mixin or import at `pos`.
    #[error("{source}\n    in {pos}")]
    Context {
        pos: SourcePosition,
        source: Box<LessError>,
    },
}

impl LessError {
    pub fn syntax(message: impl Into<String>, pos: SourcePosition) -> Self {
        Self::Syntax {
            message: message.into(),
            pos,
        }
    }

    pub fn mismatch(message: impl Into<String>, pos: SourcePosition) -> Self {
        Self::TypeMismatch {
            message: message.into(),
            pos,
        }
    }

    /// Wraps this error with the position of an enclosing construct.
    ///
    /// Consecutive wraps at the same position collapse into one.
    pub fn within(self, pos: &SourcePosition) -> Self {
        if pos.line == 0 {
            return self;
        }
        if let Self::Context { pos: inner, .. } = &self {
            if inner == pos {
                return self;
            }
        }
        Self::Context {
            pos: pos.clone(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context layers removed.
    pub fn root(&self) -> &LessError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// The position the innermost error was raised at, if it has one.
    pub fn position(&self) -> Option<&SourcePosition> {
        match self.root() {
            Self::Syntax { pos, .. }
            | Self::UndefinedVariable { pos, .. }
            | Self::UndefinedMixin { pos, .. }
            | Self::NoMatchingMixin { pos, .. }
            | Self::TypeMismatch { pos, .. }
            | Self::RecursionLimit { pos, .. }
            | Self::Script { pos, .. } => Some(pos),
            Self::Resource { .. } | Self::Context { .. } => None,
        }
    }
}

pub type Result<T, E = LessError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display() {
        let pos = SourcePosition::new(Some("main.less".into()), 3, 7);
        assert_eq!(pos.to_string(), "main.less:3:7");
        assert_eq!(SourcePosition::new(None, 2, 1).to_string(), "2:1");
        assert_eq!(SourcePosition::unknown().to_string(), "<unknown>");
    }

    #[test]
    fn test_context_wraps_and_unwraps() {
        let inner = LessError::syntax("unexpected `}`", SourcePosition::new(None, 4, 2));
        let outer = inner
            .within(&SourcePosition::new(None, 1, 1))
            .within(&SourcePosition::new(None, 1, 1));
        assert!(matches!(outer.root(), LessError::Syntax { .. }));
        assert_eq!(outer.position().map(|p| p.line), Some(4));
        let message = outer.to_string();
        assert!(message.contains("unexpected `}`"));
        assert_eq!(message.matches("in 1:1").count(), 1);
    }
}
