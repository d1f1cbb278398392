//! Compilation options.

use crate::helpers::{BuiltinHelpers, HelperFunctions, ScriptEvaluator};
use crate::import::{FileResolver, ImportResolver};
use bitflags::bitflags;
use std::fmt;

/// Default bound on nesting: blocks, imports, mixin and detached-ruleset
/// activations and variable references together.
pub const DEFAULT_MAX_RECURSION: usize = 64;

/// Which `url(...)` references in imported files are rewritten to be
/// relative to the root stylesheet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RewriteUrls {
    #[default]
    Off,
    /// Only URLs starting with `./` or `../`.
    Local,
    /// Every relative URL.
    All,
}

impl std::str::FromStr for RewriteUrls {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "local" => Ok(Self::Local),
            "all" => Ok(Self::All),
            other => Err(format!("unknown rewrite-urls mode: {other}")),
        }
    }
}

bitflags! {
    /// Keywords accepted in `@import (...)` option lists.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ImportOptions: u8 {
        /// Rules are available to mixins and extends but not emitted.
        const REFERENCE = 1 << 0;
        /// Include the file verbatim without parsing it.
        const INLINE = 1 << 1;
        /// Treat the file as LESS whatever its extension.
        const LESS = 1 << 2;
        /// Keep the statement as a plain CSS `@import`.
        const CSS = 1 << 3;
        /// Import the file at most once (the default).
        const ONCE = 1 << 4;
        /// Import the file every time it is named.
        const MULTIPLE = 1 << 5;
        /// Skip the import silently if the file cannot be found.
        const OPTIONAL = 1 << 6;
    }
}

impl ImportOptions {
    /// Parses one option keyword; unknown keywords yield `None`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "reference" => Some(Self::REFERENCE),
            "inline" => Some(Self::INLINE),
            "less" => Some(Self::LESS),
            "css" => Some(Self::CSS),
            "once" => Some(Self::ONCE),
            "multiple" => Some(Self::MULTIPLE),
            "optional" => Some(Self::OPTIONAL),
            _ => None,
        }
    }
}

/// Options controlling a compilation.
///
/// # Examples
///
/// ```rust
/// use lesscss::{CompileOptions, RewriteUrls};
///
/// let options = CompileOptions::default()
///     .compress(true)
///     .rewrite_urls(RewriteUrls::Local)
///     .max_recursion(32);
/// assert!(options.compress);
/// ```
pub struct CompileOptions {
    /// Emit compressed output.
    pub compress: bool,
    pub rewrite_urls: RewriteUrls,
    /// Maximum nesting depth of rules, at-rule blocks, imports, mixin
    /// activations and variable references.
    pub max_recursion: usize,
    pub resolver: Box<dyn ImportResolver>,
    /// Evaluator for backtick script literals; scripts fail without one.
    pub script: Option<Box<dyn ScriptEvaluator>>,
    pub helpers: Box<dyn HelperFunctions>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            compress: false,
            rewrite_urls: RewriteUrls::Off,
            max_recursion: DEFAULT_MAX_RECURSION,
            resolver: Box::new(FileResolver),
            script: None,
            helpers: Box::new(BuiltinHelpers),
        }
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("compress", &self.compress)
            .field("rewrite_urls", &self.rewrite_urls)
            .field("max_recursion", &self.max_recursion)
            .field("script", &self.script.is_some())
            .finish_non_exhaustive()
    }
}

impl CompileOptions {
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn rewrite_urls(mut self, mode: RewriteUrls) -> Self {
        self.rewrite_urls = mode;
        self
    }

    pub fn max_recursion(mut self, limit: usize) -> Self {
        self.max_recursion = limit;
        self
    }

    pub fn resolver(mut self, resolver: impl ImportResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn script_evaluator(mut self, evaluator: impl ScriptEvaluator + 'static) -> Self {
        self.script = Some(Box::new(evaluator));
        self
    }

    pub fn helpers(mut self, helpers: impl HelperFunctions + 'static) -> Self {
        self.helpers = Box::new(helpers);
        self
    }
}
