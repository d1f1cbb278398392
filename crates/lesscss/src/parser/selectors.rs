//! Rule headers: selector lists, `:extend()` suffixes, mixin definitions,
//! mixin calls and guards.

use crate::error::{LessError, Result, SourcePosition};
use crate::parser::ast::{Arg, Param};
use crate::parser::expression::parse_expression;
use crate::parser::stylesheet::{ImportContext, MixinCall};
use crate::parser::advance_position;

/// Splits `text` at every `separator` outside parentheses, brackets and
/// quotes.
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut scan = TopLevel::new();
    for (index, c) in text.char_indices() {
        if scan.step(c) && c == separator {
            parts.push(&text[start..index]);
            start = index + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Byte index of the first top-level occurrence of `separator`.
pub fn find_top_level(text: &str, separator: char) -> Option<usize> {
    let mut scan = TopLevel::new();
    text.char_indices()
        .find(|&(_, c)| scan.step(c) && c == separator)
        .map(|(index, _)| index)
}

/// Tracks nesting while walking a string character by character.
struct TopLevel {
    depth: usize,
    quote: Option<char>,
    escaped: bool,
}

impl TopLevel {
    fn new() -> Self {
        Self {
            depth: 0,
            quote: None,
            escaped: false,
        }
    }

    /// Consumes `c`; returns `true` if it sits at the top level.
    fn step(&mut self, c: char) -> bool {
        if self.escaped {
            self.escaped = false;
            return false;
        }
        if c == '\\' {
            self.escaped = true;
            return false;
        }
        if let Some(q) = self.quote {
            if c == q {
                self.quote = None;
            }
            return false;
        }
        match c {
            '"' | '\'' => {
                self.quote = Some(c);
                false
            }
            '(' | '[' => {
                self.depth += 1;
                false
            }
            ')' | ']' => {
                self.depth = self.depth.saturating_sub(1);
                false
            }
            _ => self.depth == 0,
        }
    }
}

/// Splits a rule header at a top-level `when` keyword.
pub fn split_guard(header: &str) -> (&str, Option<&str>) {
    let mut scan = TopLevel::new();
    let mut previous = ' ';
    for (index, c) in header.char_indices() {
        let top = scan.step(c);
        if top && c == 'w' && previous.is_whitespace() {
            let rest = &header[index..];
            if rest.starts_with("when")
                && rest[4..]
                    .chars()
                    .next()
                    .is_some_and(|n| n.is_whitespace() || n == '(')
            {
                return (header[..index].trim_end(), Some(rest[4..].trim()));
            }
        }
        previous = c;
    }
    (header, None)
}

/// Splits a trailing `!important` off a value.
pub fn strip_important(text: &str) -> (&str, bool) {
    let trimmed = text.trim_end();
    if let Some(bang) = trimmed.rfind('!') {
        let tail = trimmed[bang + 1..].trim();
        if tail.eq_ignore_ascii_case("important") {
            return (trimmed[..bang].trim_end(), true);
        }
    }
    (trimmed, false)
}

/// Collapses runs of whitespace into single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses the targets of `:extend(...)`: `.a all, .b`.
pub fn parse_extend_targets(inner: &str) -> Vec<(String, bool)> {
    split_top_level(inner, ',')
        .into_iter()
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .map(|target| match target.strip_suffix(" all") {
            Some(base) => (normalize_whitespace(base), true),
            None => (normalize_whitespace(target), false),
        })
        .collect()
}

/// A selector with its `:extend()` suffixes removed.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectorEntry {
    pub selector: String,
    pub extends: Vec<(String, bool)>,
}

/// Splits a selector list and extracts `:extend()` suffixes.
pub fn parse_selector_list(text: &str) -> Result<Vec<SelectorEntry>, String> {
    split_top_level(text, ',')
        .into_iter()
        .map(|part| -> Result<SelectorEntry, String> {
            let mut selector = String::new();
            let mut extends = Vec::new();
            let mut rest = part;
            while let Some(start) = rest.find(":extend(") {
                selector.push_str(&rest[..start]);
                let inner_start = start + ":extend(".len();
                let close = matching_paren(&rest[inner_start..])
                    .ok_or_else(|| format!("unclosed :extend( in `{}`", part.trim()))?;
                extends.extend(parse_extend_targets(&rest[inner_start..inner_start + close]));
                rest = &rest[inner_start + close + 1..];
            }
            selector.push_str(rest);
            Ok(SelectorEntry {
                selector: normalize_whitespace(&selector),
                extends,
            })
        })
        .filter(|entry| {
            entry
                .as_ref()
                .map(|e| !e.selector.is_empty() || !e.extends.is_empty())
                .unwrap_or(true)
        })
        .collect()
}

/// Byte index of the `)` closing a parenthesis opened just before `text`.
pub fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') if depth == 0 => return Some(index),
            (None, ')') => depth -= 1,
            _ => {}
        }
    }
    None
}

/// A mixin definition header split into its parts.
#[derive(Clone, Debug, PartialEq)]
pub struct DefinitionHeader<'h> {
    pub name: &'h str,
    pub params: &'h str,
    /// Text after the closing parenthesis, such as `when (@a > 0)`.
    pub rest: &'h str,
}

/// Recognizes `.name(params) ...` and `#name(params) ...` headers.
pub fn split_definition(header: &str) -> Option<DefinitionHeader<'_>> {
    let mut chars = header.char_indices();
    let (_, first) = chars.next()?;
    if first != '.' && first != '#' {
        return None;
    }
    let name_end = chars
        .find(|&(_, c)| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .map(|(index, _)| index)?;
    if name_end <= 1 {
        return None;
    }
    let after_name = &header[name_end..];
    let open = after_name.len() - after_name.trim_start().len();
    if !after_name[open..].starts_with('(') {
        return None;
    }
    let params_start = name_end + open + 1;
    let close = matching_paren(&header[params_start..])?;
    Some(DefinitionHeader {
        name: &header[..name_end],
        params: &header[params_start..params_start + close],
        rest: header[params_start + close + 1..].trim(),
    })
}

/// Splits a parameter or argument list on `;` when it has any top-level
/// semicolon, otherwise on `,`.
fn split_arguments(text: &str) -> Vec<&str> {
    let separator = if find_top_level(text, ';').is_some() {
        ';'
    } else {
        ','
    };
    let parts = split_top_level(text, separator);
    if parts.len() == 1 && parts[0].trim().is_empty() {
        Vec::new()
    } else {
        parts
    }
}

/// Splits `@name: value` into its name and value.
fn split_named(text: &str) -> Option<(&str, &str)> {
    let body = text.strip_prefix('@')?;
    let name_len = body
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(body.len());
    let (name, after) = body.split_at(name_len);
    let value = after.trim_start().strip_prefix(':')?;
    (!name.is_empty()).then_some((name, value))
}

/// Parses the parameter list of a mixin definition.
pub fn parse_params(text: &str, pos: &SourcePosition, context: &ImportContext) -> Result<Vec<Param>> {
    let mut params = Vec::new();
    for raw in split_arguments(text) {
        let part = raw.trim();
        let param = if part == "..." {
            Param::Variadic { name: None }
        } else if let Some(name) = part.strip_suffix("...").and_then(|p| p.strip_prefix('@')) {
            Param::Variadic {
                name: Some(name.trim().to_string()),
            }
        } else if let Some((name, value)) = split_named(part) {
            Param::Named {
                name: name.to_string(),
                default: Some(parse_expression(value, pos, context)?),
            }
        } else if let Some(name) = part
            .strip_prefix('@')
            .filter(|n| n.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_'))
        {
            Param::Named {
                name: name.to_string(),
                default: None,
            }
        } else if part.is_empty() {
            return Err(LessError::syntax("empty mixin parameter", pos.clone()));
        } else {
            Param::Pattern(parse_expression(part, pos, context)?)
        };
        params.push(param);
    }
    Ok(params)
}

/// Splits a mixin path such as `#ns > .m` or `#ns.m` into its parts.
pub fn split_mixin_path(path: &str) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    for c in path.chars() {
        match c {
            '.' | '#' => parts.push(c.to_string()),
            '>' => {}
            c if c.is_whitespace() => {}
            c => match parts.last_mut() {
                Some(last) => last.push(c),
                None => parts.push(c.to_string()),
            },
        }
    }
    parts
}

/// Parses a mixin call statement such as `.m(1px; red) !important`.
pub fn parse_mixin_call(text: &str, pos: &SourcePosition, context: &ImportContext) -> Result<MixinCall> {
    let (text, important) = strip_important(text);
    let (path, args_text) = match text.find('(') {
        Some(open) => {
            let close = matching_paren(&text[open + 1..])
                .ok_or_else(|| LessError::syntax("unclosed mixin arguments", pos.clone()))?;
            let trailing = text[open + 1 + close + 1..].trim();
            if !trailing.is_empty() {
                return Err(LessError::syntax(
                    format!("unexpected `{trailing}` after mixin call"),
                    pos.clone(),
                ));
            }
            (&text[..open], &text[open + 1..open + 1 + close])
        }
        None => (text, ""),
    };

    let path = split_mixin_path(path);
    if path.is_empty() {
        return Err(LessError::syntax("missing mixin name", pos.clone()));
    }

    let args_pos = text
        .find('(')
        .map(|open| advance_position(pos, &text[..=open]))
        .unwrap_or_else(|| pos.clone());
    let mut args = Vec::new();
    for raw in split_arguments(args_text) {
        let part = raw.trim();
        if part.is_empty() {
            return Err(LessError::syntax("empty mixin argument", args_pos.clone()));
        }
        let arg = match split_named(part) {
            Some((name, value)) => Arg {
                name: Some(name.to_string()),
                value: parse_expression(value, &args_pos, context)?,
            },
            None => Arg {
                name: None,
                value: parse_expression(part, &args_pos, context)?,
            },
        };
        args.push(arg);
    }

    Ok(MixinCall {
        path,
        args,
        important,
        pos: pos.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Expr;

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("a, b(c, d), 'e, f'", ','),
            vec!["a", " b(c, d)", " 'e, f'"]
        );
        assert_eq!(find_top_level("(a;b) ; c", ';'), Some(6));
    }

    #[test]
    fn test_split_guard() {
        assert_eq!(
            split_guard(".m(@a) when (@a > 0)"),
            (".m(@a)", Some("(@a > 0)"))
        );
        assert_eq!(split_guard(".whenever"), (".whenever", None));
        assert_eq!(
            split_guard(".a when(@mode = dark)"),
            (".a", Some("(@mode = dark)"))
        );
    }

    #[test]
    fn test_strip_important() {
        assert_eq!(strip_important("red !important"), ("red", true));
        assert_eq!(strip_important("red ! important "), ("red", true));
        assert_eq!(strip_important("red"), ("red", false));
    }

    #[test]
    fn test_selector_list_with_extends() {
        let entries = parse_selector_list(".a:extend(.b all), .c:hover:extend(.d)").unwrap();
        assert_eq!(entries[0].selector, ".a");
        assert_eq!(entries[0].extends, vec![(".b".to_string(), true)]);
        assert_eq!(entries[1].selector, ".c:hover");
        assert_eq!(entries[1].extends, vec![(".d".to_string(), false)]);
    }

    #[test]
    fn test_split_definition() {
        let header = split_definition(".border(@w: 1px; @c) when (iscolor(@c))").unwrap();
        assert_eq!(header.name, ".border");
        assert_eq!(header.params, "@w: 1px; @c");
        assert_eq!(header.rest, "when (iscolor(@c))");
        assert!(split_definition(".a:not(.b)").is_none());
        assert!(split_definition("div(x)").is_none());
    }

    #[test]
    fn test_params() {
        let pos = SourcePosition::unknown();
        let context = ImportContext::default();
        let params = parse_params("dark; @c: red; @rest...", &pos, &context).unwrap();
        assert!(matches!(params[0], Param::Pattern(_)));
        assert!(matches!(&params[1], Param::Named { name, default: Some(_) } if name == "c"));
        assert_eq!(
            params[2],
            Param::Variadic {
                name: Some("rest".to_string())
            }
        );
        assert!(parse_params("", &pos, &context).unwrap().is_empty());
        assert_eq!(
            parse_params("...", &pos, &context).unwrap(),
            vec![Param::Variadic { name: None }]
        );
    }

    #[test]
    fn test_mixin_paths() {
        assert_eq!(split_mixin_path("#ns > .m"), vec!["#ns", ".m"]);
        assert_eq!(split_mixin_path("#ns.m"), vec!["#ns", ".m"]);
        assert_eq!(split_mixin_path(".m"), vec![".m"]);
    }

    #[test]
    fn test_mixin_call() {
        let call = parse_mixin_call(
            ".m(1px, 2px; @c: red) !important",
            &SourcePosition::unknown(),
            &ImportContext::default(),
        )
        .unwrap();
        assert!(call.important);
        assert_eq!(call.args.len(), 2);
        assert!(matches!(call.args[0].value, Expr::Operation { .. }));
        assert_eq!(call.args[1].name.as_deref(), Some("c"));

        let bare = parse_mixin_call(".m", &SourcePosition::unknown(), &ImportContext::default())
            .unwrap();
        assert!(bare.args.is_empty());
    }
}
