//! Expression tree produced by the expression parser.
//!
//! Expressions are immutable once parsed; evaluation results are cached by
//! the formatter's scope frames, never stored back into the tree.

use crate::error::SourcePosition;
use crate::types::Value;

/// Operators of n-ary operation nodes, from loosest to tightest binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    /// Guard disjunction (`,` or `or` between guard conditions).
    Or,
    /// Guard conjunction.
    And,
    /// Guard negation; always unary.
    Not,
    /// Comma separated list.
    Comma,
    /// Space separated list.
    Space,
    /// Juxtaposed operands without whitespace between them.
    Concat,
    /// `name: value` pair inside parentheses, as in media features.
    Colon,
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    /// Binding level used by the precedence-climbing parser.
    pub fn level(self) -> u8 {
        match self {
            Self::Or | Self::And | Self::Not => 0,
            Self::Comma => 1,
            Self::Space | Self::Concat => 2,
            Self::Colon => 3,
            Self::Eq | Self::Lt | Self::Gt | Self::Le | Self::Ge => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div => 6,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.level() == 4
    }

    /// List-building operators merge consecutive uses into one node.
    pub fn is_list(self) -> bool {
        matches!(self, Self::Comma | Self::Space | Self::Concat)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Not => "not",
            Self::Comma => ",",
            Self::Space => " ",
            Self::Concat => "",
            Self::Colon => ":",
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

/// A parsed value expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A literal that needs no evaluation.
    Literal(Value),
    /// A quoted string containing `@{name}` interpolations.
    Quoted {
        text: String,
        quote: char,
        escaped: bool,
        pos: SourcePosition,
    },
    /// An unquoted token containing `@{name}` interpolations.
    Interpolated { template: String, pos: SourcePosition },
    /// `@name`
    Variable { name: String, pos: SourcePosition },
    /// `@@name`: the variable whose name is the value of `@name`.
    VariableVariable { name: String, pos: SourcePosition },
    /// Parenthesized expression.
    Group(Box<Expr>),
    /// Unary minus.
    Negate(Box<Expr>, SourcePosition),
    Operation {
        op: Operator,
        operands: Vec<Expr>,
        pos: SourcePosition,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        pos: SourcePosition,
    },
    /// `url(...)`; `import_dir` is the directory of the importing file
    /// relative to the root stylesheet, used for URL rewriting.
    Url {
        content: Box<Expr>,
        import_dir: String,
        pos: SourcePosition,
    },
    /// Backtick script literal, handed to the script evaluator.
    Script {
        source: String,
        escaped: bool,
        pos: SourcePosition,
    },
}

impl Expr {
    pub fn keyword(text: impl Into<String>) -> Self {
        Self::Literal(Value::keyword(text))
    }

    pub fn position(&self) -> Option<&SourcePosition> {
        match self {
            Self::Literal(_) => None,
            Self::Group(inner) => inner.position(),
            Self::Quoted { pos, .. }
            | Self::Interpolated { pos, .. }
            | Self::Variable { pos, .. }
            | Self::VariableVariable { pos, .. }
            | Self::Negate(_, pos)
            | Self::Operation { pos, .. }
            | Self::Call { pos, .. }
            | Self::Url { pos, .. }
            | Self::Script { pos, .. } => Some(pos),
        }
    }

    /// Returns `true` if a `default()` call appears anywhere in the tree.
    pub fn uses_default(&self) -> bool {
        match self {
            Self::Call { name, args, .. } => {
                name.eq_ignore_ascii_case("default") || args.iter().any(Self::uses_default)
            }
            Self::Operation { operands, .. } => operands.iter().any(Self::uses_default),
            Self::Group(inner) | Self::Negate(inner, _) => inner.uses_default(),
            _ => false,
        }
    }
}

/// A mixin call argument.
#[derive(Clone, Debug, PartialEq)]
pub struct Arg {
    /// Set for named arguments (`@color: red`), without the `@`.
    pub name: Option<String>,
    pub value: Expr,
}

/// A mixin definition parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum Param {
    /// `@name` or `@name: default`.
    Named { name: String, default: Option<Expr> },
    /// `@rest...` or a bare `...`.
    Variadic { name: Option<String> },
    /// A literal the positional argument must equal, as in `.m(dark; @c)`.
    Pattern(Expr),
}
