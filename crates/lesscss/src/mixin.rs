//! Mixin calls.
//!
//! A call is resolved in four steps: find the rules it names, bind the
//! call's arguments to each candidate's parameters, evaluate guards, and
//! expand every candidate that passed into the calling rule.
//!
//! Candidates are searched in the bodies of the rules being rendered,
//! innermost first, before the top-level rules. Candidates whose guard
//! uses `default()` are decided last: `default()` is true only when no
//! other candidate matched.

use crate::error::{LessError, Result, SourcePosition};
use crate::format::Renderer;
use crate::parser::ast::{Expr, Param};
use crate::parser::{MixinCall, Rule, RuleId};
use crate::types::{Separator, Value};
use indexmap::IndexMap;

/// A rule a call may expand, with the namespaces it was reached through.
#[derive(Clone, Debug)]
struct Candidate {
    rule: RuleId,
    namespaces: Vec<RuleId>,
}

/// Evaluated arguments, named or positional.
type Arguments = Vec<(Option<String>, Value)>;

type Bindings = IndexMap<String, Value>;

impl<'a> Renderer<'a> {
    pub(crate) fn call_mixin(&mut self, call: &MixinCall, selectors: &[String]) -> Result<()> {
        let name = call.display_name();
        let args = self.evaluate_arguments(call)?;
        let candidates = self.find_candidates(call)?;
        if candidates.is_empty() {
            return Err(LessError::UndefinedMixin {
                name,
                pos: call.pos.clone(),
            });
        }

        let sheet = self.sheet;
        let mut bound = Vec::new();
        let mut recursive = false;
        for candidate in candidates {
            let rule = sheet.rule(candidate.rule);
            if rule.guard.is_none() && self.active.contains(&candidate.rule) {
                log::debug!("{}: not expanding {name} inside itself", call.pos);
                recursive = true;
                continue;
            }
            if let Some(bindings) = self.bind_arguments(rule, &candidate, &args, &call.pos)? {
                bound.push((candidate, bindings));
            }
        }
        if bound.is_empty() {
            if recursive {
                return Ok(());
            }
            return Err(LessError::NoMatchingMixin {
                name,
                pos: call.pos.clone(),
            });
        }

        let mut selected = Vec::new();
        let mut deferred = Vec::new();
        for (order, (candidate, bindings)) in bound.into_iter().enumerate() {
            match &sheet.rule(candidate.rule).guard {
                None => selected.push((order, candidate, bindings)),
                Some(guard) if guard.uses_default() => deferred.push((order, candidate, bindings, guard)),
                Some(guard) => {
                    if self.check_guard(guard, &candidate, &bindings, None)? {
                        selected.push((order, candidate, bindings));
                    }
                }
            }
        }
        let nothing_matched = selected.is_empty();
        for (order, candidate, bindings, guard) in deferred {
            if self.check_guard(guard, &candidate, &bindings, Some(nothing_matched))? {
                selected.push((order, candidate, bindings));
            }
        }
        if selected.is_empty() {
            log::debug!("{}: every guard of {name} rejected the call", call.pos);
            return Ok(());
        }
        selected.sort_by_key(|(order, ..)| *order);

        for (_, candidate, bindings) in selected {
            self.expand(call, &candidate, bindings, selectors)?;
        }
        Ok(())
    }

    fn evaluate_arguments(&mut self, call: &MixinCall) -> Result<Arguments> {
        call.args
            .iter()
            .map(|arg| Ok((arg.name.clone(), self.evaluator().eval(&arg.value)?)))
            .collect()
    }

    fn find_candidates(&mut self, call: &MixinCall) -> Result<Vec<Candidate>> {
        let sheet = self.sheet;
        let Some((first, rest)) = call.path.split_first() else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        for &active in self.active.iter().rev() {
            found.extend(
                sheet
                    .rule(active)
                    .nested_rules()
                    .filter(|&id| sheet.rule(id).answers_to(first))
                    .map(|rule| Candidate {
                        rule,
                        namespaces: Vec::new(),
                    }),
            );
            if !found.is_empty() {
                break;
            }
        }
        if found.is_empty() {
            found.extend(sheet.global_mixins(first).iter().map(|&rule| Candidate {
                rule,
                namespaces: Vec::new(),
            }));
        }

        for segment in rest {
            let mut next = Vec::new();
            for candidate in found {
                let namespace = sheet.rule(candidate.rule);
                if let Some(guard) = &namespace.guard {
                    if !self.check_guard(guard, &candidate, &Bindings::new(), None)? {
                        continue;
                    }
                }
                let mut namespaces = candidate.namespaces.clone();
                namespaces.push(candidate.rule);
                next.extend(
                    namespace
                        .nested_rules()
                        .filter(|&id| sheet.rule(id).answers_to(segment))
                        .map(|rule| Candidate {
                            rule,
                            namespaces: namespaces.clone(),
                        }),
                );
            }
            found = next;
        }
        Ok(found)
    }

    /// Pushes the variables of `candidate`'s namespaces and `bindings`;
    /// returns the scope depth to truncate back to.
    fn enter_candidate(&mut self, candidate: &Candidate, bindings: Bindings) -> usize {
        let sheet = self.sheet;
        let mark = self.scope.len();
        for &namespace in &candidate.namespaces {
            self.scope.push_rule(&sheet.rule(namespace).variables);
        }
        self.scope.push_values(bindings);
        mark
    }

    /// Matches arguments to parameters. Returns `None` when the candidate
    /// does not accept them.
    fn bind_arguments(
        &mut self,
        rule: &Rule,
        candidate: &Candidate,
        args: &Arguments,
        pos: &SourcePosition,
    ) -> Result<Option<Bindings>> {
        let Some(params) = &rule.params else {
            return Ok(args.is_empty().then(Bindings::new));
        };

        let mut bound = Bindings::new();
        for (name, value) in args {
            let Some(name) = name else {
                continue;
            };
            let declared = params
                .iter()
                .any(|param| matches!(param, Param::Named { name: own, .. } if own == name));
            if !declared {
                return Ok(None);
            }
            bound.insert(name.clone(), value.clone());
        }
        let positional: Vec<&Value> = args
            .iter()
            .filter(|(name, _)| name.is_none())
            .map(|(_, value)| value)
            .collect();

        let mut next = 0;
        let mut arguments = Vec::new();
        let mut variadic = false;
        for param in params {
            match param {
                Param::Named { name, default } => {
                    if let Some(value) = bound.get(name) {
                        arguments.push(value.clone());
                    } else if let Some(value) = positional.get(next) {
                        next += 1;
                        bound.insert(name.clone(), (*value).clone());
                        arguments.push((*value).clone());
                    } else if let Some(default) = default {
                        let value = self.evaluate_default(default, candidate, &bound)?;
                        bound.insert(name.clone(), value.clone());
                        arguments.push(value);
                    } else {
                        return Ok(None);
                    }
                }
                Param::Pattern(pattern) => {
                    let Some(value) = positional.get(next) else {
                        return Ok(None);
                    };
                    let expected = self.evaluator().eval(pattern)?;
                    if expected.to_unquoted(self.style) != value.to_unquoted(self.style) {
                        return Ok(None);
                    }
                    next += 1;
                    arguments.push((*value).clone());
                }
                Param::Variadic { name } => {
                    variadic = true;
                    let rest: Vec<Value> = positional[next.min(positional.len())..]
                        .iter()
                        .map(|value| (*value).clone())
                        .collect();
                    next = positional.len();
                    arguments.extend(rest.iter().cloned());
                    if let Some(name) = name {
                        bound.insert(name.clone(), Value::list(rest, Separator::Space));
                    }
                }
            }
        }
        if next < positional.len() && !variadic {
            log::trace!("{pos}: too many arguments for {}", rule.selectors.join(", "));
            return Ok(None);
        }
        bound.insert("arguments".to_string(), Value::list(arguments, Separator::Space));
        Ok(Some(bound))
    }

    fn evaluate_default(&mut self, default: &Expr, candidate: &Candidate, bound: &Bindings) -> Result<Value> {
        let mark = self.enter_candidate(candidate, bound.clone());
        let result = self.evaluator().eval(default);
        self.scope.truncate(mark);
        result
    }

    fn check_guard(
        &mut self,
        guard: &Expr,
        candidate: &Candidate,
        bindings: &Bindings,
        default: Option<bool>,
    ) -> Result<bool> {
        let mark = self.enter_candidate(candidate, bindings.clone());
        let result = self.evaluator().with_default(default).eval(guard);
        self.scope.truncate(mark);
        Ok(result?.as_bool())
    }

    /// Renders the body of a matched candidate into the calling rule.
    fn expand(
        &mut self,
        call: &MixinCall,
        candidate: &Candidate,
        bindings: Bindings,
        selectors: &[String],
    ) -> Result<()> {
        self.descend(|| call.display_name(), &call.pos)?;
        let sheet = self.sheet;
        let mark = self.enter_candidate(candidate, bindings);
        self.scope.push_rule(&sheet.rule(candidate.rule).variables);
        let active = self.active.len();
        self.active.extend(candidate.namespaces.iter().copied());
        self.active.push(candidate.rule);
        if call.important {
            self.important += 1;
        }

        let result = self.render_body(candidate.rule, selectors);

        if call.important {
            self.important -= 1;
        }
        self.active.truncate(active);
        self.scope.truncate(mark);
        self.depth -= 1;
        result.map_err(|err| err.within(&call.pos))
    }
}

#[cfg(test)]
mod tests {
    use crate::options::CompileOptions;
    use crate::{LessError, compile_str, compile_with};

    #[test]
    fn test_parameters_and_defaults() {
        let css = compile_str(
            ".m(@a; @b: 2px) { width: @a; height: @b; }\n.x { .m(1px); }\n.y { .m(@b: 3px; @a: 4px); }",
        )
        .unwrap();
        assert_eq!(
            css,
            ".x {\n  width: 1px;\n  height: 2px;\n}\n.y {\n  width: 4px;\n  height: 3px;\n}\n"
        );
    }

    #[test]
    fn test_arguments_and_rest() {
        let css = compile_str(
            ".shadow(@x; @rest...) { box-shadow: @arguments; rest: @rest; }\n.a { .shadow(1px, 2px, 3px); }",
        )
        .unwrap();
        assert_eq!(css, ".a {\n  box-shadow: 1px 2px 3px;\n  rest: 2px 3px;\n}\n");
    }

    #[test]
    fn test_pattern_matching() {
        let css = compile_str(
            ".m(dark; @c) { color: darken(@c, 10%); }\n.m(light; @c) { color: lighten(@c, 10%); }\n.a { .m(light; #000); }",
        )
        .unwrap();
        assert_eq!(css, ".a {\n  color: #1a1a1a;\n}\n");
    }

    #[test]
    fn test_guards_and_default() {
        let source = "
            .m(@a) when (@a > 10) { big: @a; }
            .m(@a) when (default()) { small: @a; }
            .a { .m(20); }
            .b { .m(5); }
        ";
        let css = compile_str(source).unwrap();
        assert_eq!(css, ".a {\n  big: 20;\n}\n.b {\n  small: 5;\n}\n");
    }

    #[test]
    fn test_rejected_guards_expand_to_nothing() {
        let css = compile_str(".m(@a) when (@a > 10) { x: @a; }\n.a { .m(1); }").unwrap();
        assert_eq!(css, "");
    }

    #[test]
    fn test_arity_mismatch_is_an_error() {
        let err = compile_str(".m(@a) { x: @a; }\n.a { .m(1, 2); }").unwrap_err();
        assert!(matches!(err.root(), LessError::NoMatchingMixin { .. }));
    }

    #[test]
    fn test_namespaces() {
        let css = compile_str("#ns { .m() { color: red; } }\n.a { #ns > .m(); }\n.b { #ns.m(); }").unwrap();
        assert_eq!(css, ".a {\n  color: red;\n}\n.b {\n  color: red;\n}\n");
    }

    #[test]
    fn test_unguarded_self_call_is_skipped() {
        let css = compile_str(".a { color: red; .a; }").unwrap();
        assert_eq!(css, ".a {\n  color: red;\n}\n");
    }

    #[test]
    fn test_guarded_recursion_hits_the_limit() {
        let options = CompileOptions::default().max_recursion(8);
        let err = compile_with(".loop(@n) when (@n > 0) { .loop(@n + 1); }\n.a { .loop(1); }", &options)
            .unwrap_err();
        assert!(matches!(err.root(), LessError::RecursionLimit { limit: 8, .. }));
    }

    #[test]
    fn test_important_propagates() {
        let css = compile_str(".m() { color: red; }\n.a { .m() !important; }").unwrap();
        assert_eq!(css, ".a {\n  color: red !important;\n}\n");
    }
}
