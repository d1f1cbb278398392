//! # lesscss - LESS Stylesheet Compiler
//!
//! Compiles the LESS stylesheet language to plain CSS.
//!
//! LESS extends CSS with variables, nested rules, operations, functions,
//! mixins with parameters and guards, selector extension and imports. This
//! crate provides:
//!
//! - **Parsing**: Turn LESS source into a [`Stylesheet`] of unevaluated rules
//! - **Evaluation**: Lazy variables, expressions and the builtin function library
//! - **Output**: Flattened CSS, readable or compressed
//!
//! ## Quick Start
//!
//! ```rust
//! use lesscss::compile_str;
//!
//! let css = compile_str(
//!     r#"
//!     @accent: #336699;
//!     .button {
//!         color: @accent;
//!         &:hover { color: lighten(@accent, 10%); }
//!     }
//! "#,
//! )
//! .expect("valid LESS");
//! assert!(css.contains(".button:hover"));
//! ```
//!
//! ## Supported Features
//!
//! ### Values
//! - Numbers with units, converted within a unit group: `1in + 96px`
//! - Colors by hex, name and the `rgb()`/`hsl()` families
//! - Strings with `~"escaping"` and `@{var}` interpolation
//! - Comma and space separated lists
//!
//! ### Rules
//! - Nesting with `&` parent references
//! - Mixins: parameters, defaults, named arguments, `@rest...`, patterns,
//!   guards with `default()`, namespaces and `!important`
//! - Detached rulesets: `@r: { ... }` called as `@r();`
//! - `:extend(...)`, including `all`
//! - `@media` bubbling and merging of nested queries
//!
//! ### Imports
//! - Files resolved through an [`ImportResolver`]
//! - The `reference`, `inline`, `less`, `css`, `once`, `multiple` and
//!   `optional` options
//!
//! ## Modules
//!
//! - [`parser`]: Source reading and the rule tree
//! - [`eval`]: Scopes, operations and functions
//! - [`format`]: CSS output
//! - [`error`]: Error types with source positions

pub mod error;
pub mod eval;
pub mod extend;
pub mod format;
pub mod helpers;
pub mod import;
mod mixin;
pub mod options;
pub mod parser;
pub mod reader;
pub mod types;

use std::path::Path;

pub use error::{LessError, Result, SourcePosition};
pub use format::render;
pub use helpers::{BuiltinHelpers, HelperFunctions, ScriptEvaluator, ScriptValue};
pub use import::{FileResolver, ImportResolver, MemoryResolver, ResolvedImport};
pub use options::{CompileOptions, ImportOptions, RewriteUrls};
pub use parser::{ImportContext, Stylesheet, parse};

use eval::{Evaluator, ScopeStack};
use format::Readable;
use parser::{Parser, resolve_deferred_imports};

/// Compiles `source`, located at `path`, to CSS.
///
/// Imports are resolved relative to the directory of `path` by
/// `options.resolver`. The file itself counts as imported, so a cycle back
/// to it is ignored.
pub fn compile(path: &Path, source: &str, options: &CompileOptions) -> Result<String> {
    let context = ImportContext::for_file(path);
    let mut sheet = Stylesheet::new();
    sheet.imported.insert(import::normalize(path));
    let root = sheet.root();
    Parser::new(&mut sheet, options, context, source).parse_into(root)?;

    resolve_deferred_imports(&mut sheet, options, |sheet, target| {
        let mut scope = ScopeStack::new();
        scope.push_rule(sheet.globals());
        let value = Evaluator::new(&mut scope, options, &Readable).eval(target)?;
        Ok(value.to_unquoted(&Readable))
    })?;

    log::debug!("parsed {} rules from {}", sheet.len(), path.display());
    render(&sheet, options)
}

/// Reads and compiles the file at `path`.
pub fn compile_file(path: impl AsRef<Path>, options: &CompileOptions) -> Result<String> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| LessError::Resource {
        path: path.display().to_string(),
        source,
    })?;
    compile(path, &source, options)
}

/// Compiles `source` with `options`, resolving imports against the
/// current directory.
pub fn compile_with(source: &str, options: &CompileOptions) -> Result<String> {
    compile(Path::new(""), source, options)
}

/// Compiles `source` with the default options.
pub fn compile_str(source: &str) -> Result<String> {
    compile_with(source, &CompileOptions::default())
}
