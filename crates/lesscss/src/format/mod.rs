//! CSS output.
//!
//! [`render`] walks the parsed rule tree depth-first, evaluating values
//! and expanding mixins as it goes. Nested rules are flattened: a rule's
//! declarations print as one block and the blocks nested in it follow.
//! Media queries bubble out of the rules they are nested in and combine
//! with enclosing queries.
//!
//! Stylesheets that use `:extend` are walked twice; the first walk only
//! collects the extends so that rules printed before an extend is seen
//! still pick it up.

mod output;
pub mod style;

pub use output::{Frame, Output};
pub use style::{Compressed, OutputStyle, Readable};

use crate::error::{LessError, Result, SourcePosition};
use crate::eval::scope::Found;
use crate::eval::{Evaluator, ScopeStack};
use crate::extend::{ExtendIndex, normalize};
use crate::options::CompileOptions;
use crate::parser::selectors::{normalize_whitespace, split_top_level};
use crate::parser::{AtBlock, Extend, Property, Rule, RuleId, RuleItem, Stylesheet};

/// At-rule blocks that wrap selectors like `@media` does, instead of
/// holding their own declarations.
const CONDITIONAL_BLOCKS: &[&str] = &["supports", "document", "-moz-document", "container", "layer"];

/// Renders a parsed stylesheet to CSS text.
pub fn render(sheet: &Stylesheet, options: &CompileOptions) -> Result<String> {
    let style: &dyn OutputStyle = if options.compress { &Compressed } else { &Readable };
    let mut extends = ExtendIndex::new();
    if sheet.has_extends {
        log::debug!("collecting extends");
        let mut collector = Renderer::new(sheet, options, style, Pass::Collect, extends);
        collector.run()?;
        extends = collector.extends;
    }
    let mut renderer = Renderer::new(sheet, options, style, Pass::Emit, extends);
    renderer.run()?;
    Ok(renderer.finish())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pass {
    /// Walk the tree only to record extends.
    Collect,
    Emit,
}

struct MediaContext {
    /// The `@media` block being rendered.
    block: RuleId,
    query: String,
    /// Indentation the block opens at.
    indent: String,
    /// Output of media blocks nested in this one, printed after it.
    bubbled: String,
}

pub(crate) struct Renderer<'a> {
    pub(crate) sheet: &'a Stylesheet,
    pub(crate) options: &'a CompileOptions,
    pub(crate) style: &'a dyn OutputStyle,
    pub(crate) scope: ScopeStack<'a>,
    /// Rules whose bodies are being rendered, innermost last.
    pub(crate) active: Vec<RuleId>,
    /// Nesting depth of rules, at-rule blocks and mixin expansions.
    pub(crate) depth: usize,
    /// Number of enclosing `!important` mixin calls.
    pub(crate) important: usize,
    pass: Pass,
    extends: ExtendIndex,
    output: Output,
    /// `@charset` and CSS `@import` statements, hoisted to the top.
    charset: Option<String>,
    imports: Vec<String>,
    /// Indentation of the block being opened.
    indent: String,
    /// Indentation of declarations in the innermost block.
    decl_indent: String,
    media: Vec<MediaContext>,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(
        sheet: &'a Stylesheet,
        options: &'a CompileOptions,
        style: &'a dyn OutputStyle,
        pass: Pass,
        extends: ExtendIndex,
    ) -> Self {
        Self {
            sheet,
            options,
            style,
            scope: ScopeStack::new(),
            active: Vec::new(),
            depth: 0,
            important: 0,
            pass,
            extends,
            output: Output::new(),
            charset: None,
            imports: Vec::new(),
            indent: String::new(),
            decl_indent: style.indent_unit().to_string(),
            media: Vec::new(),
        }
    }

    fn run(&mut self) -> Result<()> {
        let sheet = self.sheet;
        let root = sheet.root();
        self.scope.push_rule(&sheet.rule(root).variables);
        self.active.push(root);
        let result = self.render_body(root, &[]);
        self.active.pop();
        self.scope.pop();
        result
    }

    fn finish(self) -> String {
        let mut text = String::new();
        for statement in self.charset.iter().chain(&self.imports) {
            text.push_str(&self.style.statement("", statement));
        }
        text.push_str(&self.output.finish());
        text
    }

    pub(crate) fn evaluator(&mut self) -> Evaluator<'_, 'a> {
        Evaluator::new(&mut self.scope, self.options, self.style).at_depth(self.depth)
    }

    /// Enters one level of nesting, failing past `max_recursion`. Every
    /// successful call is paired with a `self.depth -= 1`.
    pub(crate) fn descend(&mut self, name: impl FnOnce() -> String, pos: &SourcePosition) -> Result<()> {
        if self.depth >= self.options.max_recursion {
            return Err(LessError::RecursionLimit {
                name: name(),
                limit: self.options.max_recursion,
                pos: pos.clone(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Renders the items of rule `id` into the current frame, with
    /// `selectors` as the parents of nested rules.
    pub(crate) fn render_body(&mut self, id: RuleId, selectors: &[String]) -> Result<()> {
        let sheet = self.sheet;
        for item in &sheet.rule(id).body {
            match item {
                RuleItem::Property(property) => self.render_property(property)?,
                RuleItem::Rule(child) => self.render_rule(*child, selectors)?,
                RuleItem::MixinCall(call) => self.call_mixin(call, selectors)?,
                RuleItem::DetachedCall { name, pos } => self.call_detached(name, pos, selectors)?,
                RuleItem::Comment(text) => self.render_comment(text),
                RuleItem::Media(block) => self.render_media(block, selectors)?,
                RuleItem::Directive(block) => self.render_directive(block, selectors)?,
                RuleItem::AtRule { name, params, pos } => self.render_at_rule(name, params, pos)?,
                RuleItem::Extend(extend) if extend.selector.is_none() => {
                    let extenders: Vec<&String> = selectors.iter().collect();
                    self.collect_extend(extend, &extenders)?;
                }
                RuleItem::Extend(_) => {}
                RuleItem::Verbatim(text) => self.output.append(text),
                RuleItem::DeferredImport(import) => {
                    log::warn!("{}: import was never resolved", import.pos);
                }
            }
        }
        Ok(())
    }

    fn render_property(&mut self, property: &Property) -> Result<()> {
        if self.output.at_root() {
            return Err(LessError::syntax(
                format!("property `{}` must be inside a selector block", property.name),
                property.pos.clone(),
            ));
        }
        let name = self.evaluator().interpolate(&property.name, &property.pos)?;
        let value = self
            .evaluator()
            .with_literal_slash(property.literal_slash)
            .eval(&property.value)?;
        let important = property.important || self.important > 0;
        let text = self
            .style
            .property(&self.decl_indent, &name, &value.to_css(self.style), important);
        self.output.declare(text);
        Ok(())
    }

    fn render_comment(&mut self, text: &str) {
        if self.output.at_root() {
            if let Some(comment) = self.style.comment(&self.indent, text) {
                self.output.append(&comment);
            }
        } else if let Some(comment) = self.style.comment(&self.decl_indent, text) {
            self.output.declare(comment);
        }
    }

    fn render_at_rule(&mut self, name: &str, params: &str, pos: &SourcePosition) -> Result<()> {
        let params = self.evaluator().interpolate(params, pos)?;
        let text = if params.is_empty() {
            format!("@{name}")
        } else {
            format!("@{name} {params}")
        };
        match name {
            "charset" => {
                if self.charset.is_none() {
                    self.charset = Some(text);
                }
            }
            "import" => {
                if !self.imports.contains(&text) {
                    self.imports.push(text);
                }
            }
            _ if self.output.at_root() => {
                let statement = self.style.statement(&self.indent, &text);
                self.output.append(&statement);
            }
            _ if self.style.is_compressed() => self.output.declare(text),
            _ => {
                let statement = self.style.statement(&self.decl_indent, &text);
                self.output.declare(statement);
            }
        }
        Ok(())
    }

    /// Renders a ruleset nested under `parents`.
    pub(crate) fn render_rule(&mut self, id: RuleId, parents: &[String]) -> Result<()> {
        let sheet = self.sheet;
        let rule = sheet.rule(id);
        if rule.is_mixin_definition() {
            return Ok(());
        }
        if let Some(guard) = &rule.guard {
            if !self.evaluator().eval(guard)?.as_bool() {
                return Ok(());
            }
        }

        let resolved = self.resolve_selectors(rule, parents)?;
        let selectors: Vec<String> = resolved.iter().map(|(_, s)| s.clone()).collect();
        for item in &rule.body {
            if let RuleItem::Extend(extend @ Extend { selector: Some(origin), .. }) = item {
                let extenders: Vec<&String> = resolved
                    .iter()
                    .filter(|(index, _)| index == origin)
                    .map(|(_, s)| s)
                    .collect();
                self.collect_extend(extend, &extenders)?;
            }
        }

        self.descend(|| selectors.join(", "), &rule.pos)?;
        let mark = self.scope.len();
        self.scope.push_rule(&rule.variables);
        self.active.push(id);
        self.output.push_frame();
        let decl_indent = format!("{}{}", self.indent, self.style.indent_unit());
        let saved_indent = std::mem::replace(&mut self.decl_indent, decl_indent);

        let result = self.render_body(id, &selectors);

        self.decl_indent = saved_indent;
        let frame = self.output.pop_frame();
        self.active.pop();
        self.scope.truncate(mark);
        self.depth -= 1;
        result?;

        let display = self.display_selectors(&selectors, rule.reference);
        self.output.close_rule(frame, self.style, &self.indent, &display);
        Ok(())
    }

    /// Interpolates and combines the selectors of `rule` with its parents,
    /// tagging each result with the index of the selector it came from.
    fn resolve_selectors(&mut self, rule: &Rule, parents: &[String]) -> Result<Vec<(usize, String)>> {
        let mut resolved = Vec::new();
        for (origin, selector) in rule.selectors.iter().enumerate() {
            let text = self.evaluator().interpolate(selector, &rule.pos)?;
            for part in split_top_level(&text, ',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                for combined in combine_selectors(part, parents) {
                    let combined = normalize(&combined);
                    if !resolved.iter().any(|(_, existing)| *existing == combined) {
                        resolved.push((origin, combined));
                    }
                }
            }
        }
        Ok(resolved)
    }

    /// The selectors a rule prints with once extends are applied.
    fn display_selectors(&self, selectors: &[String], reference: bool) -> Vec<String> {
        let media: Vec<RuleId> = self.media.iter().map(|context| context.block).collect();
        match (self.pass, reference) {
            (Pass::Collect, _) => selectors.to_vec(),
            (Pass::Emit, true) => self.extends.added(selectors, &media),
            (Pass::Emit, false) if self.extends.is_empty() => selectors.to_vec(),
            (Pass::Emit, false) => self.extends.apply(selectors, &media),
        }
    }

    fn collect_extend(&mut self, extend: &Extend, extenders: &[&String]) -> Result<()> {
        if self.pass != Pass::Collect {
            return Ok(());
        }
        let target = self.evaluator().interpolate(&extend.target, &extend.pos)?;
        let media = self.media.last().map(|context| context.block);
        for extender in extenders {
            log::trace!("{extender} extends {target}");
            self.extends.add(&target, extend.all, extender, media);
        }
        Ok(())
    }

    fn call_detached(&mut self, name: &str, pos: &SourcePosition, selectors: &[String]) -> Result<()> {
        let id = match self.scope.find(name, self.scope.len()) {
            Some((_, Found::Ruleset(id))) => id,
            Some(_) => {
                return Err(LessError::mismatch(
                    format!("@{name} is not a detached ruleset"),
                    pos.clone(),
                ));
            }
            None => {
                return Err(LessError::UndefinedVariable {
                    name: name.to_string(),
                    pos: pos.clone(),
                });
            }
        };
        self.descend(|| format!("@{name}"), pos)?;
        let sheet = self.sheet;
        let mark = self.scope.len();
        self.scope.push_rule(&sheet.rule(id).variables);
        self.active.push(id);
        let result = self.render_body(id, selectors);
        self.active.pop();
        self.scope.truncate(mark);
        self.depth -= 1;
        result.map_err(|err| err.within(pos))
    }

    /// Renders the items of an at-rule block. Declarations directly in
    /// the block belong to the enclosing selectors, if there are any.
    fn render_block_contents(&mut self, block: RuleId, selectors: &[String]) -> Result<()> {
        let sheet = self.sheet;
        let mark = self.scope.len();
        self.scope.push_rule(&sheet.rule(block).variables);
        let result = if selectors.is_empty() {
            self.render_body(block, selectors)
        } else {
            self.output.push_frame();
            let decl_indent = format!("{}{}", self.indent, self.style.indent_unit());
            let saved_indent = std::mem::replace(&mut self.decl_indent, decl_indent);
            let result = self.render_body(block, selectors);
            self.decl_indent = saved_indent;
            let frame = self.output.pop_frame();
            if result.is_ok() {
                let display = self.display_selectors(selectors, false);
                self.output.close_rule(frame, self.style, &self.indent, &display);
            }
            result
        };
        self.scope.truncate(mark);
        result
    }

    fn render_media(&mut self, block: &AtBlock, selectors: &[String]) -> Result<()> {
        let sheet = self.sheet;
        if sheet.rule(block.block).reference {
            return Ok(());
        }
        let query = self.evaluator().interpolate_query(&block.params, &block.pos)?;
        let query = normalize_whitespace(&query);
        self.descend(|| format!("@media {query}"), &block.pos)?;
        let (query, base_indent) = match self.media.last() {
            Some(outer) => (format!("{} and {query}", outer.query), outer.indent.clone()),
            None => (query, self.indent.clone()),
        };
        let inner_indent = format!("{base_indent}{}", self.style.indent_unit());

        let saved_indent = std::mem::replace(&mut self.indent, inner_indent.clone());
        let saved_decl_indent = std::mem::replace(&mut self.decl_indent, inner_indent);
        self.media.push(MediaContext {
            block: block.block,
            query: query.clone(),
            indent: base_indent.clone(),
            bubbled: String::new(),
        });
        self.output.push_frame();

        let result = self.render_block_contents(block.block, selectors);

        let frame = self.output.pop_frame();
        let context = self.media.pop();
        self.indent = saved_indent;
        self.decl_indent = saved_decl_indent;
        self.depth -= 1;
        result?;

        let mut text = Output::wrap_block(frame, self.style, &base_indent, &format!("@media {query}"))
            .unwrap_or_default();
        if let Some(context) = context {
            text.push_str(&context.bubbled);
        }
        match self.media.last_mut() {
            Some(outer) => outer.bubbled.push_str(&text),
            None => self.output.append(&text),
        }
        Ok(())
    }

    fn render_directive(&mut self, block: &AtBlock, selectors: &[String]) -> Result<()> {
        let sheet = self.sheet;
        if sheet.rule(block.block).reference {
            return Ok(());
        }
        let params = self.evaluator().interpolate_query(&block.params, &block.pos)?;
        let params = normalize_whitespace(&params);
        let prelude = if params.is_empty() {
            format!("@{}", block.name)
        } else {
            format!("@{} {params}", block.name)
        };
        let conditional = CONDITIONAL_BLOCKS.contains(&block.name.as_str());
        self.descend(|| prelude.clone(), &block.pos)?;

        let base_indent = self.indent.clone();
        let inner_indent = format!("{base_indent}{}", self.style.indent_unit());
        let saved_indent = std::mem::replace(&mut self.indent, inner_indent.clone());
        let saved_decl_indent = std::mem::replace(&mut self.decl_indent, inner_indent);
        // Media nested in a directive stays inside it.
        let saved_media = std::mem::take(&mut self.media);
        self.output.push_frame();

        let parents: &[String] = if conditional { selectors } else { &[] };
        let result = self.render_block_contents(block.block, parents);

        let frame = self.output.pop_frame();
        self.media = saved_media;
        self.indent = saved_indent;
        self.decl_indent = saved_decl_indent;
        self.depth -= 1;
        result?;

        if let Some(text) = Output::wrap_block(frame, self.style, &base_indent, &prelude) {
            self.output.append(&text);
        }
        Ok(())
    }
}

/// Combines one selector with its parents: `&` is replaced by each
/// parent, otherwise the selector becomes a descendant of every parent.
pub fn combine_selectors(selector: &str, parents: &[String]) -> Vec<String> {
    if parents.is_empty() {
        return vec![selector.replace('&', "").trim().to_string()];
    }
    if !selector.contains('&') {
        return parents
            .iter()
            .map(|parent| format!("{parent} {selector}"))
            .collect();
    }
    let mut pieces = selector.split('&');
    let mut results = vec![pieces.next().unwrap_or_default().to_string()];
    for piece in pieces {
        results = results
            .iter()
            .flat_map(|prefix| {
                parents
                    .iter()
                    .map(move |parent| format!("{prefix}{parent}{piece}"))
            })
            .collect();
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parents(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_descendant_combination() {
        assert_eq!(
            combine_selectors(".b", &parents(&[".a", ".c"])),
            vec![".a .b", ".c .b"]
        );
        assert_eq!(combine_selectors(".b", &[]), vec![".b"]);
    }

    #[test]
    fn test_parent_reference() {
        assert_eq!(combine_selectors("&:hover", &parents(&[".a"])), vec![".a:hover"]);
        assert_eq!(combine_selectors("&-title", &parents(&[".card"])), vec![".card-title"]);
        assert_eq!(combine_selectors(".x &", &parents(&[".a"])), vec![".x .a"]);
        assert_eq!(
            combine_selectors("& + &", &parents(&[".a", ".b"])),
            vec![".a + .a", ".a + .b", ".b + .a", ".b + .b"]
        );
    }
}
