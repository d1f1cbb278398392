//! The parsed rule tree.
//!
//! Rules live in an arena owned by [`Stylesheet`] and refer to each other
//! by [`RuleId`]. The synthetic root rule holds the top-level items and the
//! global variable table.

use crate::error::SourcePosition;
use crate::options::ImportOptions;
use crate::parser::ast::{Arg, Expr, Param};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Index of a rule in the stylesheet arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub usize);

/// The right-hand side of a variable declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum VariableValue {
    Expr(Expr),
    /// A detached ruleset, `@name: { ... }`.
    Ruleset(RuleId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableDef {
    pub value: VariableValue,
    pub pos: SourcePosition,
}

/// Variables declared directly in one rule, keyed by name without `@`.
///
/// Later declarations of the same name replace earlier ones.
pub type VariableTable = IndexMap<String, VariableDef>;

/// A ruleset, mixin definition, at-rule body or detached ruleset.
#[derive(Clone, Debug, Default)]
pub struct Rule {
    /// Selectors as written, possibly containing `&` and `@{var}`.
    pub selectors: Vec<String>,
    /// Present for mixin definitions, which never produce output directly.
    pub params: Option<Vec<Param>>,
    pub guard: Option<Expr>,
    pub body: Vec<RuleItem>,
    pub variables: VariableTable,
    pub pos: SourcePosition,
    /// Parsed from a `(reference)` import.
    pub reference: bool,
}

impl Rule {
    pub fn is_mixin_definition(&self) -> bool {
        self.params.is_some()
    }

    /// Returns `true` if a mixin call with `name` (such as `.m` or `#ns`)
    /// can refer to this rule.
    pub fn answers_to(&self, name: &str) -> bool {
        self.selectors.iter().any(|s| s.trim() == name)
    }

    /// Ids of rules nested directly in this rule's body.
    pub fn nested_rules(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.body.iter().filter_map(|item| match item {
            RuleItem::Rule(id) => Some(*id),
            _ => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    /// Property name, possibly containing `@{var}`.
    pub name: String,
    pub value: Expr,
    pub important: bool,
    /// Keep `/` literal outside parentheses, as in `font: 12px/1.5`.
    pub literal_slash: bool,
    pub pos: SourcePosition,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MixinCall {
    /// Namespace path, e.g. `["#ns", ".m"]` for `#ns > .m()`.
    pub path: Vec<String>,
    pub args: Vec<Arg>,
    pub important: bool,
    pub pos: SourcePosition,
}

impl MixinCall {
    pub fn display_name(&self) -> String {
        self.path.join(" > ")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Extend {
    pub target: String,
    pub all: bool,
    /// Restricts the extension to one selector of the enclosing rule, for
    /// extends written as selector suffixes (`.a:extend(.b)`).
    pub selector: Option<usize>,
    pub pos: SourcePosition,
}

/// A block at-rule such as `@media`, `@supports` or `@font-face`.
#[derive(Clone, Debug, PartialEq)]
pub struct AtBlock {
    /// Name without `@`, lowercase.
    pub name: String,
    /// Prelude as written, possibly containing variables.
    pub params: String,
    /// Arena rule holding the block's items and variables.
    pub block: RuleId,
    pub pos: SourcePosition,
}

/// An import whose file name contains `@{var}` and is resolved after
/// parsing against the global variables.
#[derive(Clone, Debug, PartialEq)]
pub struct DeferredImport {
    pub target: Expr,
    pub options: ImportOptions,
    pub context: ImportContext,
    pub pos: SourcePosition,
}

/// An entry of a rule body, in source order.
#[derive(Clone, Debug, PartialEq)]
pub enum RuleItem {
    Property(Property),
    Rule(RuleId),
    MixinCall(MixinCall),
    /// `@name();` calling a detached ruleset.
    DetachedCall { name: String, pos: SourcePosition },
    Comment(String),
    Media(AtBlock),
    Directive(AtBlock),
    /// A statement at-rule such as `@charset` or a CSS `@import`.
    AtRule {
        name: String,
        params: String,
        pos: SourcePosition,
    },
    Extend(Extend),
    /// Text from an `(inline)` import, emitted unchanged.
    Verbatim(String),
    DeferredImport(DeferredImport),
}

/// Where the text being parsed came from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportContext {
    /// Display name used in source positions.
    pub file: Option<Arc<str>>,
    /// Directory nested imports are resolved against.
    pub dir: PathBuf,
    /// Directory of this file relative to the root stylesheet, with a
    /// trailing `/`, or empty for the root itself.
    pub relative_dir: String,
    /// Rules parsed in this context are reference-only.
    pub reference: bool,
}

impl ImportContext {
    /// Context for a root stylesheet located at `path`.
    pub fn for_file(path: &std::path::Path) -> Self {
        let dir = path
            .parent()
            .map(std::path::Path::to_path_buf)
            .unwrap_or_default();
        let file = path
            .file_name()
            .map(|name| Arc::from(name.to_string_lossy().as_ref()));
        Self {
            file,
            dir,
            relative_dir: String::new(),
            reference: false,
        }
    }
}

/// The complete parse result.
#[derive(Debug)]
pub struct Stylesheet {
    rules: Vec<Rule>,
    root: RuleId,
    /// Top-level rules by each selector they can be called by.
    mixins: HashMap<String, Vec<RuleId>>,
    /// Locations already imported, for once-only imports.
    pub(crate) imported: HashSet<PathBuf>,
    /// Set once any extend is parsed, so rendering can skip the
    /// collection pass when there is nothing to collect.
    pub(crate) has_extends: bool,
}

impl Default for Stylesheet {
    fn default() -> Self {
        Self::new()
    }
}

impl Stylesheet {
    pub fn new() -> Self {
        Self {
            rules: vec![Rule::default()],
            root: RuleId(0),
            mixins: HashMap::new(),
            imported: HashSet::new(),
            has_extends: false,
        }
    }

    pub fn root(&self) -> RuleId {
        self.root
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    pub fn rule_mut(&mut self, id: RuleId) -> &mut Rule {
        &mut self.rules[id.0]
    }

    pub fn add_rule(&mut self, rule: Rule) -> RuleId {
        self.rules.push(rule);
        RuleId(self.rules.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.len() == 1 && self.rules[0].body.is_empty()
    }

    /// Global variables, declared at the top level.
    pub fn globals(&self) -> &VariableTable {
        &self.rule(self.root).variables
    }

    /// Records a top-level rule under every simple selector it has.
    pub(crate) fn register_mixin(&mut self, id: RuleId) {
        let names: Vec<String> = self
            .rule(id)
            .selectors
            .iter()
            .map(|s| s.trim())
            .filter(|s| is_callable_name(s))
            .map(str::to_string)
            .collect();
        for name in names {
            self.mixins.entry(name).or_default().push(id);
        }
    }

    /// Locations of unresolved deferred imports, as `(rule, item index)`
    /// pairs in arena order.
    pub(crate) fn deferred_imports(&self) -> Vec<(RuleId, usize)> {
        self.rules
            .iter()
            .enumerate()
            .flat_map(|(rule, r)| {
                r.body
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| matches!(item, RuleItem::DeferredImport(_)))
                    .map(move |(index, _)| (RuleId(rule), index))
            })
            .collect()
    }

    /// Top-level rules callable as `name`, in source order.
    pub fn global_mixins(&self, name: &str) -> &[RuleId] {
        self.mixins.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A selector a mixin call can name: `.class` or `#id` with no combinators.
pub fn is_callable_name(selector: &str) -> bool {
    let mut chars = selector.chars();
    matches!(chars.next(), Some('.' | '#'))
        && selector.len() > 1
        && chars.all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callable_names() {
        assert!(is_callable_name(".mixin"));
        assert!(is_callable_name("#ns"));
        assert!(!is_callable_name(".a .b"));
        assert!(!is_callable_name(".a:hover"));
        assert!(!is_callable_name("div"));
        assert!(!is_callable_name("."));
    }

    #[test]
    fn test_register_mixin() {
        let mut sheet = Stylesheet::new();
        let id = sheet.add_rule(Rule {
            selectors: vec![".a".into(), "div .b".into(), " .c ".into()],
            ..Default::default()
        });
        sheet.register_mixin(id);
        assert_eq!(sheet.global_mixins(".a"), &[id]);
        assert_eq!(sheet.global_mixins(".c"), &[id]);
        assert!(sheet.global_mixins(".b").is_empty());
    }
}
