//! `@import` statements.
//!
//! LESS imports are parsed in place: the imported file's items are appended
//! to the rule that contains the statement and its variables join that
//! rule's table. CSS imports stay as statements and are hoisted by the
//! renderer. Imports whose file name interpolates a variable are recorded
//! as [`DeferredImport`]s and resolved once the whole tree is available.

use crate::error::{LessError, Result, SourcePosition};
use crate::import::directory_of;
use crate::options::{CompileOptions, ImportOptions};
use crate::parser::ast::Expr;
use crate::parser::expression::parse_expression;
use crate::parser::selectors::matching_paren;
use crate::parser::stylesheet::{DeferredImport, ImportContext, RuleId, RuleItem, Stylesheet};
use crate::parser::Parser;
use crate::types::Value;
use std::path::Path;
use std::sync::Arc;

/// Rounds of deferred resolution before giving up; each round can only
/// uncover imports nested in the files loaded by the previous one.
const MAX_DEFERRED_ROUNDS: usize = 32;

/// Splits a leading `(keyword, ...)` list off an import statement.
fn parse_import_options<'a>(text: &'a str, pos: &SourcePosition) -> (ImportOptions, &'a str) {
    let Some(inner) = text.strip_prefix('(') else {
        return (ImportOptions::empty(), text);
    };
    let Some(close) = matching_paren(inner) else {
        return (ImportOptions::empty(), text);
    };
    let mut options = ImportOptions::empty();
    for keyword in inner[..close].split(',').map(str::trim).filter(|k| !k.is_empty()) {
        match ImportOptions::from_keyword(keyword) {
            Some(flag) => options |= flag,
            None => log::warn!("{pos}: ignoring unknown import option `{keyword}`"),
        }
    }
    (options, inner[close + 1..].trim_start())
}

/// Splits the import target (a string or `url(...)`) from a trailing media
/// query list.
fn split_import_target(text: &str) -> (&str, &str) {
    let mut chars = text.char_indices();
    let end = match chars.next() {
        Some((_, quote @ ('"' | '\''))) => {
            let mut escaped = false;
            chars
                .find(|&(_, c)| {
                    let closes = !escaped && c == quote;
                    escaped = !escaped && c == '\\';
                    closes
                })
                .map(|(index, _)| index + 1)
        }
        _ if text.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("url(")) => {
            matching_paren(&text[4..]).map(|close| close + 5)
        }
        _ => None,
    };
    match end {
        Some(end) => (&text[..end], text[end..].trim()),
        None => (text, ""),
    }
}

/// Decides whether an import stays a plain CSS `@import`.
fn is_css_import(name: &str, options: ImportOptions, media: &str) -> bool {
    if options.contains(ImportOptions::CSS) {
        return true;
    }
    if options.intersects(ImportOptions::LESS | ImportOptions::INLINE) {
        return false;
    }
    let path = name.split(['?', '#']).next().unwrap_or(name);
    path.ends_with(".css")
        || !media.is_empty()
        || name.starts_with("http://")
        || name.starts_with("https://")
        || name.starts_with("//")
}

/// The file name of a literal import target, or `None` when it has to be
/// evaluated first.
fn literal_target(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Literal(Value::Str { text, .. }) => Some(text.clone()),
        Expr::Url { content, .. } => literal_target(content),
        _ => None,
    }
}

impl<'s, 't> Parser<'s, 't> {
    pub(super) fn parse_import(&mut self, target: RuleId, text: &str, pos: &SourcePosition) -> Result<()> {
        let (options, rest) = parse_import_options(text, pos);
        let (target_text, media) = split_import_target(rest);
        if target_text.is_empty() {
            return Err(LessError::syntax("missing import target", pos.clone()));
        }
        let expr = parse_expression(target_text, pos, &self.context)?;

        let Some(name) = literal_target(&expr) else {
            log::debug!("{pos}: deferring import {target_text}");
            let target_expr = match expr {
                Expr::Url { content, .. } => *content,
                other => other,
            };
            let deferred = DeferredImport {
                target: target_expr,
                options,
                context: self.context.clone(),
                pos: pos.clone(),
            };
            self.push(target, RuleItem::DeferredImport(deferred));
            return Ok(());
        };

        if is_css_import(&name, options, media) {
            self.push(
                target,
                RuleItem::AtRule {
                    name: "import".to_string(),
                    params: rest.to_string(),
                    pos: pos.clone(),
                },
            );
            return Ok(());
        }
        self.load_import(target, &name, options, pos)
    }

    /// Imports `name` as resolved by the configured resolver.
    fn load_import(
        &mut self,
        target: RuleId,
        name: &str,
        options: ImportOptions,
        pos: &SourcePosition,
    ) -> Result<()> {
        let resolved = match self.options.resolver.load(&self.context.dir, name) {
            Ok(resolved) => resolved,
            Err(err) if options.contains(ImportOptions::OPTIONAL) => {
                log::warn!("{pos}: skipping optional import {name}: {err}");
                return Ok(());
            }
            Err(source) => {
                return Err(LessError::Resource {
                    path: name.to_string(),
                    source,
                }
                .within(pos));
            }
        };

        let once = !options.contains(ImportOptions::MULTIPLE);
        if !self.sheet.imported.insert(resolved.location.clone()) && once {
            log::debug!("{} already imported, skipping", resolved.location.display());
            return Ok(());
        }

        if options.contains(ImportOptions::INLINE) {
            self.push(target, RuleItem::Verbatim(resolved.text));
            return Ok(());
        }

        log::debug!("importing {}", resolved.location.display());
        let context = ImportContext {
            file: Some(Arc::from(resolved.location.to_string_lossy().as_ref())),
            dir: resolved
                .location
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            relative_dir: format!("{}{}", self.context.relative_dir, directory_of(name)),
            reference: self.context.reference || options.contains(ImportOptions::REFERENCE),
        };
        if self.depth >= self.options.max_recursion {
            return Err(LessError::RecursionLimit {
                name: name.to_string(),
                limit: self.options.max_recursion,
                pos: pos.clone(),
            });
        }
        Parser::new(&mut *self.sheet, self.options, context, &resolved.text)
            .at_depth(self.depth + 1)
            .parse_into(target)
            .map_err(|err| err.within(pos))
    }

    /// Imports an already evaluated file name in place of a deferred import.
    fn import_resolved(
        &mut self,
        target: RuleId,
        name: &str,
        options: ImportOptions,
        pos: &SourcePosition,
    ) -> Result<()> {
        if is_css_import(name, options, "") {
            self.push(
                target,
                RuleItem::AtRule {
                    name: "import".to_string(),
                    params: format!("\"{name}\""),
                    pos: pos.clone(),
                },
            );
            return Ok(());
        }
        self.load_import(target, name, options, pos)
    }
}

/// Resolves every deferred import.
///
/// `evaluate` turns an import target into a file name, using the global
/// variables of `sheet`. The imported items replace the deferred item in
/// place; imports uncovered by them are resolved in the next round.
pub fn resolve_deferred_imports<F>(
    sheet: &mut Stylesheet,
    options: &CompileOptions,
    mut evaluate: F,
) -> Result<()>
where
    F: FnMut(&Stylesheet, &Expr) -> Result<String>,
{
    for _ in 0..MAX_DEFERRED_ROUNDS {
        let pending = sheet.deferred_imports();
        if pending.is_empty() {
            return Ok(());
        }
        for (rule, index) in pending.into_iter().rev() {
            let RuleItem::DeferredImport(import) = sheet.rule(rule).body[index].clone() else {
                continue;
            };
            let name = evaluate(sheet, &import.target).map_err(|err| err.within(&import.pos))?;
            log::debug!("{}: resolved deferred import to {name}", import.pos);

            let tail = sheet.rule_mut(rule).body.split_off(index + 1);
            sheet.rule_mut(rule).body.pop();
            let result = Parser::new(&mut *sheet, options, import.context.clone(), "")
                .import_resolved(rule, &name, import.options, &import.pos);
            sheet.rule_mut(rule).body.extend(tail);
            result?;
        }
    }
    Err(LessError::syntax(
        "deferred imports nested too deeply",
        SourcePosition::unknown(),
    ))
}
