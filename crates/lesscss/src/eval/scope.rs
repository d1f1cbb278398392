//! Variable scopes.
//!
//! The renderer pushes one frame per active rule: the root first, then each
//! nested rule, and for a mixin activation a frame of bound parameters
//! followed by the mixin body's own declarations. Lookups walk the stack
//! from the innermost visible frame outwards, so a variable declared later
//! in a rule still shadows an outer one (lazy loading).

use crate::parser::ast::Expr;
use crate::parser::stylesheet::{RuleId, VariableTable, VariableValue};
use crate::types::Value;
use indexmap::IndexMap;
use std::collections::HashMap;

enum Bindings<'a> {
    /// Declarations of a rule in the stylesheet, evaluated on demand.
    Rule(&'a VariableTable),
    /// Values bound when a mixin is called.
    Values(IndexMap<String, Value>),
}

struct Frame<'a> {
    bindings: Bindings<'a>,
    /// Values already computed for declarations of this frame.
    cache: HashMap<String, Value>,
}

/// What a name resolves to in some frame.
pub(crate) enum Found<'a> {
    Expr(&'a Expr),
    Value(Value),
    Ruleset(RuleId),
}

#[derive(Default)]
pub struct ScopeStack<'a> {
    frames: Vec<Frame<'a>>,
}

impl<'a> ScopeStack<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rule(&mut self, table: &'a VariableTable) {
        self.frames.push(Frame {
            bindings: Bindings::Rule(table),
            cache: HashMap::new(),
        });
    }

    pub fn push_values(&mut self, values: IndexMap<String, Value>) {
        self.frames.push(Frame {
            bindings: Bindings::Values(values),
            cache: HashMap::new(),
        });
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.frames.truncate(len);
    }

    /// Finds `name` in the frames below `limit`, innermost first.
    ///
    /// Returns the index of the frame that declares it.
    pub(crate) fn find(&self, name: &str, limit: usize) -> Option<(usize, Found<'a>)> {
        let limit = limit.min(self.frames.len());
        for index in (0..limit).rev() {
            let frame = &self.frames[index];
            if let Some(value) = frame.cache.get(name) {
                return Some((index, Found::Value(value.clone())));
            }
            match &frame.bindings {
                Bindings::Rule(table) => {
                    let table: &'a VariableTable = *table;
                    if let Some(def) = table.get(name) {
                        let found = match &def.value {
                            VariableValue::Expr(expr) => Found::Expr(expr),
                            VariableValue::Ruleset(id) => Found::Ruleset(*id),
                        };
                        return Some((index, found));
                    }
                }
                Bindings::Values(values) => {
                    if let Some(value) = values.get(name) {
                        return Some((index, Found::Value(value.clone())));
                    }
                }
            }
        }
        None
    }

    /// Stores the computed value of a declaration of frame `index`.
    pub fn remember(&mut self, index: usize, name: &str, value: Value) {
        if let Some(frame) = self.frames.get_mut(index) {
            frame.cache.insert(name.to_string(), value);
        }
    }

    /// Every name visible below `limit`, outermost declaration order, each
    /// listed once.
    pub fn visible_names(&self, limit: usize) -> Vec<String> {
        let limit = limit.min(self.frames.len());
        let mut names: Vec<String> = Vec::new();
        for frame in &self.frames[..limit] {
            let declared: Vec<&String> = match &frame.bindings {
                Bindings::Rule(table) => table.keys().collect(),
                Bindings::Values(values) => values.keys().collect(),
            };
            for name in declared {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourcePosition;
    use crate::parser::stylesheet::VariableDef;

    fn table(entries: &[(&str, &str)]) -> VariableTable {
        entries
            .iter()
            .map(|(name, value)| {
                let def = VariableDef {
                    value: VariableValue::Expr(Expr::keyword(*value)),
                    pos: SourcePosition::unknown(),
                };
                (name.to_string(), def)
            })
            .collect()
    }

    #[test]
    fn test_inner_frames_shadow_outer() {
        let outer = table(&[("a", "outer"), ("b", "only-outer")]);
        let inner = table(&[("a", "inner")]);
        let mut scope = ScopeStack::new();
        scope.push_rule(&outer);
        scope.push_rule(&inner);

        let (index, found) = scope.find("a", scope.len()).unwrap();
        assert_eq!(index, 1);
        assert!(matches!(found, Found::Expr(Expr::Literal(Value::Str { text, .. })) if text == "inner"));

        let (index, _) = scope.find("a", 1).unwrap();
        assert_eq!(index, 0);
        assert_eq!(scope.find("b", 2).unwrap().0, 0);
        assert!(scope.find("c", 2).is_none());
    }

    #[test]
    fn test_bound_values_and_cache() {
        let outer = table(&[("a", "x")]);
        let mut scope = ScopeStack::new();
        scope.push_rule(&outer);
        let mut values = IndexMap::new();
        values.insert("p".to_string(), Value::unitless(1.0));
        scope.push_values(values);

        assert!(matches!(scope.find("p", 2), Some((1, Found::Value(_)))));
        scope.remember(0, "a", Value::keyword("cached"));
        assert!(matches!(scope.find("a", 2), Some((0, Found::Value(v))) if v == Value::keyword("cached")));
        assert_eq!(scope.visible_names(2), vec!["a".to_string(), "p".to_string()]);

        scope.pop();
        assert_eq!(scope.len(), 1);
    }
}
