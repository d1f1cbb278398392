//! LESS parser.
//!
//! The parser pulls marker-delimited segments from the
//! [`LookaheadReader`](crate::reader::LookaheadReader) and turns each into
//! a rule-body item:
//!
//! - A segment ending in `;` (or a trailing unterminated one) is a
//!   statement: variable declaration, `@import`, other at-rule, detached
//!   ruleset call, extend, mixin call or property.
//! - A segment ending in `{` opens a block: `@media`, other at-rule blocks,
//!   a detached ruleset, a mixin definition or an ordinary ruleset.
//! - A segment ending in `}` closes the current block.
//!
//! Values are handed to the [`expression`] parser; selector lists and mixin
//! headers to [`selectors`]. Nothing is evaluated here.

pub mod ast;
pub mod expression;
mod imports;
pub mod selectors;
pub mod stylesheet;
pub mod values;

use crate::error::{LessError, Result, SourcePosition};
use crate::options::CompileOptions;
use crate::reader::{LookaheadReader, Marker, Segment};
use ast::Expr;
use expression::{parse_expression, parse_guard};
use selectors::{
    find_top_level, parse_extend_targets, parse_params, parse_mixin_call, parse_selector_list,
    split_definition, split_guard, strip_important,
};
pub use imports::resolve_deferred_imports;
pub use stylesheet::{
    AtBlock, DeferredImport, Extend, ImportContext, MixinCall, Property, Rule, RuleId, RuleItem,
    Stylesheet, VariableDef, VariableValue,
};

/// Properties whose values keep a literal `/` outside parentheses.
static SLASH_PROPERTIES: phf::Set<&'static str> = phf::phf_set! {
    "font",
    "border-radius",
    "grid-area",
    "grid-row",
    "grid-column",
    "grid-template",
    "aspect-ratio",
};

/// Parses `source` into a new stylesheet.
pub fn parse(source: &str, context: ImportContext, options: &CompileOptions) -> Result<Stylesheet> {
    let mut sheet = Stylesheet::new();
    let root = sheet.root();
    Parser::new(&mut sheet, options, context, source).parse_into(root)?;
    Ok(sheet)
}

/// Returns `pos` moved past `prefix`.
pub(crate) fn advance_position(pos: &SourcePosition, prefix: &str) -> SourcePosition {
    let mut result = pos.clone();
    for c in prefix.chars() {
        if c == '\n' {
            result.line += 1;
            result.column = 1;
        } else {
            result.column += 1;
        }
    }
    result
}

/// Splits `@name rest` into the at-keyword and the remaining text.
fn split_at_keyword(text: &str) -> (&str, &str) {
    let body = &text[1..];
    let end = body
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(body.len());
    (&body[..end], &body[end..])
}

/// Parser for one source text, adding to a shared stylesheet.
pub struct Parser<'s, 't> {
    sheet: &'s mut Stylesheet,
    options: &'s CompileOptions,
    context: ImportContext,
    reader: LookaheadReader<'t>,
    /// Blocks and imports enclosing the text being parsed.
    depth: usize,
}

impl<'s, 't> Parser<'s, 't> {
    pub fn new(
        sheet: &'s mut Stylesheet,
        options: &'s CompileOptions,
        context: ImportContext,
        source: &'t str,
    ) -> Self {
        let reader = LookaheadReader::new(source, context.file.clone());
        Self {
            sheet,
            options,
            context,
            reader,
            depth: 0,
        }
    }

    /// Starts the parser `depth` blocks or imports deep.
    pub(crate) fn at_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Parses the whole source, appending its items to `target`.
    pub fn parse_into(mut self, target: RuleId) -> Result<()> {
        self.parse_body(target, false)
    }

    fn push(&mut self, target: RuleId, item: RuleItem) {
        self.sheet.rule_mut(target).body.push(item);
    }

    fn flush_comments(&mut self, target: RuleId) {
        let comments = self.reader.take_comments();
        if self.context.reference {
            return;
        }
        for comment in comments {
            self.push(target, RuleItem::Comment(comment));
        }
    }

    fn new_rule(&mut self, pos: &SourcePosition) -> RuleId {
        self.sheet.add_rule(Rule {
            pos: pos.clone(),
            reference: self.context.reference,
            ..Default::default()
        })
    }

    fn parse_body(&mut self, target: RuleId, closed: bool) -> Result<()> {
        loop {
            let segment = self.reader.next_segment()?;
            self.flush_comments(target);
            match segment.marker {
                Marker::EndOfInput => {
                    if closed {
                        return Err(LessError::syntax("missing closing `}`", segment.pos));
                    }
                    return Ok(());
                }
                Marker::CloseBrace => {
                    if !segment.is_blank() {
                        self.parse_statement(target, &segment)?;
                    }
                    if !closed {
                        return Err(LessError::syntax("unexpected `}`", segment.pos));
                    }
                    return Ok(());
                }
                Marker::Semicolon => self.parse_statement(target, &segment)?,
                Marker::OpenBrace => self.parse_block(target, &segment)?,
            }
        }
    }

    /// Parses the body of a block opened by `header`.
    fn parse_nested_body(&mut self, block: RuleId, header: &str, pos: &SourcePosition) -> Result<()> {
        if self.depth >= self.options.max_recursion {
            return Err(LessError::RecursionLimit {
                name: header.to_string(),
                limit: self.options.max_recursion,
                pos: pos.clone(),
            });
        }
        self.depth += 1;
        let result = self.parse_body(block, true);
        self.depth -= 1;
        result
    }

    fn parse_statement(&mut self, target: RuleId, segment: &Segment) -> Result<()> {
        let text = segment.text.trim();
        let pos = &segment.pos;
        if text.is_empty() {
            return Ok(());
        }
        if text.starts_with("@{") {
            return self.parse_property(target, text, pos);
        }
        if text.starts_with('@') {
            return self.parse_at_statement(target, text, pos);
        }
        if let Some(inner) = text
            .strip_prefix("&:extend(")
            .or_else(|| text.strip_prefix(":extend("))
        {
            let inner = inner.trim_end().strip_suffix(')').ok_or_else(|| {
                LessError::syntax("unclosed :extend(", pos.clone())
            })?;
            for (extend_target, all) in parse_extend_targets(inner) {
                self.sheet.has_extends = true;
                self.push(
                    target,
                    RuleItem::Extend(Extend {
                        target: extend_target,
                        all,
                        selector: None,
                        pos: pos.clone(),
                    }),
                );
            }
            return Ok(());
        }
        if text.starts_with('.') || text.starts_with('#') {
            if text.contains(":extend(") {
                // `.a:extend(.b);` declares an empty ruleset that only extends.
                let rule = self.parse_rule_header(text, pos)?;
                let id = self.sheet.add_rule(rule);
                self.push(target, RuleItem::Rule(id));
                return Ok(());
            }
            let call = parse_mixin_call(text, pos, &self.context)?;
            self.push(target, RuleItem::MixinCall(call));
            return Ok(());
        }
        self.parse_property(target, text, pos)
    }

    fn parse_at_statement(&mut self, target: RuleId, text: &str, pos: &SourcePosition) -> Result<()> {
        let (name, rest) = split_at_keyword(text);
        if name.is_empty() {
            return Err(LessError::syntax(format!("invalid at-rule `{text}`"), pos.clone()));
        }
        let after = rest.trim_start();

        if let Some(value) = after.strip_prefix(':') {
            let value_pos = advance_position(pos, &text[..text.len() - value.len()]);
            let value = value.trim();
            let expr = if value.is_empty() {
                Expr::keyword("")
            } else {
                parse_expression(value, &value_pos, &self.context)?
            };
            self.sheet.rule_mut(target).variables.insert(
                name.to_string(),
                VariableDef {
                    value: VariableValue::Expr(expr),
                    pos: pos.clone(),
                },
            );
            return Ok(());
        }

        if after.replace(char::is_whitespace, "") == "()" {
            self.push(
                target,
                RuleItem::DetachedCall {
                    name: name.to_string(),
                    pos: pos.clone(),
                },
            );
            return Ok(());
        }

        match name.to_ascii_lowercase().as_str() {
            "import" => self.parse_import(target, after.trim(), pos),
            "plugin" => {
                log::warn!("{pos}: @plugin is not supported, skipping {}", after.trim());
                Ok(())
            }
            lower => {
                let item = RuleItem::AtRule {
                    name: lower.to_string(),
                    params: after.trim().to_string(),
                    pos: pos.clone(),
                };
                self.push(target, item);
                Ok(())
            }
        }
    }

    fn parse_property(&mut self, target: RuleId, text: &str, pos: &SourcePosition) -> Result<()> {
        let colon = find_top_level(text, ':').ok_or_else(|| {
            LessError::syntax(format!("expected `:` in declaration `{text}`"), pos.clone())
        })?;
        let name = text[..colon].trim();
        if name.is_empty() {
            return Err(LessError::syntax("missing property name", pos.clone()));
        }

        let raw_value = &text[colon + 1..];
        let (value_text, important) = strip_important(raw_value);
        let leading = value_text.len() - value_text.trim_start().len();
        let value_pos = advance_position(pos, &text[..colon + 1 + leading]);
        let value_text = value_text.trim();

        let value = if name.starts_with("--") {
            Expr::keyword(value_text)
        } else if value_text.is_empty() {
            return Err(LessError::syntax(
                format!("missing value for property `{name}`"),
                pos.clone(),
            ));
        } else {
            parse_expression(value_text, &value_pos, &self.context)?
        };

        let property = Property {
            literal_slash: SLASH_PROPERTIES.contains(name.to_ascii_lowercase().as_str()),
            name: name.to_string(),
            value,
            important,
            pos: pos.clone(),
        };
        self.push(target, RuleItem::Property(property));
        Ok(())
    }

    fn parse_block(&mut self, target: RuleId, segment: &Segment) -> Result<()> {
        let header = segment.text.trim();
        let pos = &segment.pos;
        if header.is_empty() {
            return Err(LessError::syntax("missing selector before `{`", pos.clone()));
        }

        if header.starts_with('@') && !header.starts_with("@{") {
            let (name, rest) = split_at_keyword(header);
            let after = rest.trim_start();
            if let Some(extra) = after.strip_prefix(':') {
                if !extra.trim().is_empty() {
                    return Err(LessError::syntax(
                        format!("unexpected `{}` before detached ruleset", extra.trim()),
                        pos.clone(),
                    ));
                }
                let block = self.new_rule(pos);
                self.parse_nested_body(block, header, pos)?;
                self.sheet.rule_mut(target).variables.insert(
                    name.to_string(),
                    VariableDef {
                        value: VariableValue::Ruleset(block),
                        pos: pos.clone(),
                    },
                );
                return Ok(());
            }

            let name = name.to_ascii_lowercase();
            let block = self.new_rule(pos);
            self.parse_nested_body(block, header, pos)?;
            let at_block = AtBlock {
                params: after.trim().to_string(),
                block,
                pos: pos.clone(),
                name,
            };
            let item = if at_block.name == "media" {
                RuleItem::Media(at_block)
            } else {
                RuleItem::Directive(at_block)
            };
            self.push(target, item);
            return Ok(());
        }

        let rule = self.parse_rule_header(header, pos)?;
        let id = self.sheet.add_rule(rule);
        self.parse_nested_body(id, header, pos)?;
        if target == self.sheet.root() {
            self.sheet.register_mixin(id);
        }
        self.push(target, RuleItem::Rule(id));
        Ok(())
    }

    /// Builds an empty rule from a ruleset or mixin definition header.
    fn parse_rule_header(&mut self, header: &str, pos: &SourcePosition) -> Result<Rule> {
        if let Some(definition) = split_definition(header) {
            let params = parse_params(definition.params, pos, &self.context)?;
            let guard = if definition.rest.is_empty() {
                None
            } else if let Some(condition) = definition.rest.strip_prefix("when") {
                Some(parse_guard(condition.trim(), pos, &self.context)?)
            } else {
                return Err(LessError::syntax(
                    format!("unexpected `{}` after mixin parameters", definition.rest),
                    pos.clone(),
                ));
            };
            return Ok(Rule {
                selectors: vec![definition.name.to_string()],
                params: Some(params),
                guard,
                pos: pos.clone(),
                reference: self.context.reference,
                ..Default::default()
            });
        }

        let (selector_text, guard_text) = split_guard(header);
        let entries =
            parse_selector_list(selector_text).map_err(|message| LessError::syntax(message, pos.clone()))?;
        let guard = guard_text
            .map(|condition| parse_guard(condition, pos, &self.context))
            .transpose()?;

        let mut rule = Rule {
            selectors: entries.iter().map(|entry| entry.selector.clone()).collect(),
            guard,
            pos: pos.clone(),
            reference: self.context.reference,
            ..Default::default()
        };
        for (index, entry) in entries.into_iter().enumerate() {
            for (target, all) in entry.extends {
                self.sheet.has_extends = true;
                rule.body.push(RuleItem::Extend(Extend {
                    target,
                    all,
                    selector: Some(index),
                    pos: pos.clone(),
                }));
            }
        }
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{Operator, Param};
    use crate::types::Value;

    fn parse_str(source: &str) -> Stylesheet {
        parse(source, ImportContext::default(), &CompileOptions::default()).unwrap()
    }

    fn root_items(sheet: &Stylesheet) -> &[RuleItem] {
        &sheet.rule(sheet.root()).body
    }

    #[test]
    fn test_rules_and_properties() {
        let sheet = parse_str(".a, .b { color: red; .c { margin: 0 } }");
        let RuleItem::Rule(id) = root_items(&sheet)[0] else {
            panic!("expected a rule");
        };
        let rule = sheet.rule(id);
        assert_eq!(rule.selectors, vec![".a", ".b"]);
        assert!(matches!(&rule.body[0], RuleItem::Property(p) if p.name == "color"));
        assert!(matches!(rule.body[1], RuleItem::Rule(_)));
    }

    #[test]
    fn test_variables_are_stored_per_rule() {
        let sheet = parse_str("@a: 1px; .x { @b: 2px; width: @b; }");
        assert!(sheet.globals().contains_key("a"));
        let RuleItem::Rule(id) = root_items(&sheet)[0] else {
            panic!("expected a rule");
        };
        assert!(sheet.rule(id).variables.contains_key("b"));
        assert!(!sheet.globals().contains_key("b"));
    }

    #[test]
    fn test_mixin_definitions_are_registered() {
        let sheet = parse_str(".m(@a; @b: 2) when (@a > 1) { width: @a; } .plain { x: y; }");
        let id = sheet.global_mixins(".m")[0];
        let rule = sheet.rule(id);
        assert!(rule.is_mixin_definition());
        assert!(rule.guard.is_some());
        assert!(matches!(&rule.params.as_ref().unwrap()[1], Param::Named { default: Some(_), .. }));
        assert_eq!(sheet.global_mixins(".plain").len(), 1);
    }

    #[test]
    fn test_statements() {
        let sheet = parse_str(
            "@charset \"utf-8\";\n.a { .m(1; 2) !important; &:extend(.b all); @detached(); }",
        );
        assert!(matches!(&root_items(&sheet)[0], RuleItem::AtRule { name, .. } if name == "charset"));
        let RuleItem::Rule(id) = root_items(&sheet)[1] else {
            panic!("expected a rule");
        };
        let body = &sheet.rule(id).body;
        assert!(matches!(&body[0], RuleItem::MixinCall(call) if call.important && call.args.len() == 2));
        assert!(matches!(&body[1], RuleItem::Extend(e) if e.all && e.target == ".b"));
        assert!(matches!(&body[2], RuleItem::DetachedCall { name, .. } if name == "detached"));
        assert!(sheet.has_extends);
    }

    #[test]
    fn test_important_and_literal_slash() {
        let sheet = parse_str(".a { font: 12px/1.5 serif !important; }");
        let RuleItem::Rule(id) = root_items(&sheet)[0] else {
            panic!("expected a rule");
        };
        let RuleItem::Property(property) = &sheet.rule(id).body[0] else {
            panic!("expected a property");
        };
        assert!(property.important);
        assert!(property.literal_slash);
        assert!(matches!(
            &property.value,
            Expr::Operation { op: Operator::Space, .. }
        ));
    }

    #[test]
    fn test_media_and_detached_rulesets() {
        let sheet = parse_str("@r: { color: red; } @media screen { .a { b: c; } }");
        assert!(matches!(
            sheet.globals().get("r").map(|def| &def.value),
            Some(VariableValue::Ruleset(_))
        ));
        assert!(matches!(&root_items(&sheet)[0], RuleItem::Media(block) if block.params == "screen"));
    }

    #[test]
    fn test_comments_become_items() {
        let sheet = parse_str("/* header */\n.a { b: c; }");
        assert_eq!(root_items(&sheet)[0], RuleItem::Comment("/* header */".to_string()));
    }

    #[test]
    fn test_custom_properties_are_raw() {
        let sheet = parse_str(".a { --gap: 1px  2px; }");
        let RuleItem::Rule(id) = root_items(&sheet)[0] else {
            panic!("expected a rule");
        };
        let RuleItem::Property(property) = &sheet.rule(id).body[0] else {
            panic!("expected a property");
        };
        assert_eq!(property.value, Expr::Literal(Value::keyword("1px  2px")));
    }

    #[test]
    fn test_syntax_errors() {
        let options = CompileOptions::default();
        for source in [".a { color: red;", ".a { color }", "}", ".a { color: ; }"] {
            let result = parse(source, ImportContext::default(), &options);
            assert!(
                matches!(result, Err(LessError::Syntax { .. })),
                "{source} should fail"
            );
        }
    }

    #[test]
    fn test_positions_are_tracked() {
        let options = CompileOptions::default();
        let err = parse(".a {\n  color: (1 + ;\n}", ImportContext::default(), &options).unwrap_err();
        assert_eq!(err.position().map(|p| p.line), Some(2));
    }
}
