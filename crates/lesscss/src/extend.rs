//! Selector extension.
//!
//! Extends are collected in a first rendering pass into an [`ExtendIndex`];
//! the second pass asks the index for the selectors each rendered rule
//! gains. Extension is transitive: a selector added by one extend can
//! itself be the target of another, but an `all` extend never applies to
//! a selector it helped produce. An extend declared inside `@media` only
//! reaches rules of that media block.

use crate::parser::RuleId;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Upper bound on the selectors one rule can accumulate.
const MAX_SELECTORS: usize = 1024;

/// Canonical form used to compare selectors: single spaces, and
/// combinators outside brackets surrounded by one space.
pub fn normalize(selector: &str) -> String {
    let mut output = String::with_capacity(selector.len());
    let mut depth = 0usize;
    let mut pending_space = false;
    for c in selector.trim().chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 && c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if depth == 0 && matches!(c, '>' | '+' | '~') {
            let trimmed = output.trim_end().len();
            output.truncate(trimmed);
            output.push_str(&format!(" {c} "));
            pending_space = false;
            continue;
        }
        if pending_space && !output.is_empty() && !output.ends_with(' ') {
            output.push(' ');
        }
        pending_space = false;
        output.push(c);
    }
    output.trim().to_string()
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// The names in a selector: `.nav > a:hover` yields `nav`, `a`, `hover`.
fn tokens(selector: &str) -> impl Iterator<Item = &str> {
    selector.split(|c: char| !is_name_char(c)).filter(|token| !token.is_empty())
}

/// Replaces every occurrence of `target` in `selector` that is not part of
/// a longer name, or returns `None` if there is none.
fn replace_matches(selector: &str, target: &str, replacement: &str) -> Option<String> {
    if target.is_empty() {
        return None;
    }
    let starts_with_name = target.chars().next().is_some_and(is_name_char);
    let mut output = String::new();
    let mut rest = selector;
    let mut consumed = 0;
    let mut found = false;
    while let Some(index) = rest.find(target) {
        let absolute = consumed + index;
        let before = selector[..absolute].chars().next_back();
        let after = selector[absolute + target.len()..].chars().next();
        let bounded_before = !starts_with_name || !before.is_some_and(is_name_char);
        let bounded_after = !after.is_some_and(is_name_char);
        let step = index + target.len();
        if bounded_before && bounded_after {
            output.push_str(&rest[..index]);
            output.push_str(replacement);
            found = true;
        } else {
            output.push_str(&rest[..step]);
        }
        rest = &rest[step..];
        consumed += step;
    }
    output.push_str(rest);
    found.then_some(output)
}

/// One selector extending another. `media` is the media block the extend
/// was declared in, if any.
#[derive(Clone, Debug, PartialEq)]
struct Extension {
    target: String,
    extender: String,
    media: Option<RuleId>,
}

impl Extension {
    fn reaches(&self, media: &[RuleId]) -> bool {
        self.media.is_none_or(|block| media.contains(&block))
    }
}

/// Extends collected from the whole stylesheet.
#[derive(Debug, Default)]
pub struct ExtendIndex {
    /// Exact target selector to the extends naming it.
    exact: HashMap<String, Vec<Extension>>,
    /// `all` extensions in source order.
    partial: Vec<Extension>,
    /// First name of each `all` target to its entries in `partial`.
    by_token: HashMap<String, Vec<usize>>,
    /// `all` targets without a name, such as `*`.
    untokenized: Vec<usize>,
}

impl ExtendIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.partial.is_empty()
    }

    /// Records that `extender` extends `target`, declared inside the
    /// media block `media` or at the top level.
    pub fn add(&mut self, target: &str, all: bool, extender: &str, media: Option<RuleId>) {
        let entry = Extension {
            target: normalize(target),
            extender: normalize(extender),
            media,
        };
        if entry.target.is_empty() || entry.extender.is_empty() || entry.target == entry.extender {
            return;
        }
        if all {
            if self.partial.contains(&entry) {
                return;
            }
            let which = self.partial.len();
            match tokens(&entry.target).next() {
                Some(token) => self.by_token.entry(token.to_string()).or_default().push(which),
                None => self.untokenized.push(which),
            }
            self.partial.push(entry);
        } else {
            let extenders = self.exact.entry(entry.target.clone()).or_default();
            if !extenders.contains(&entry) {
                extenders.push(entry);
            }
        }
    }

    /// The `all` extends whose target could occur in `selector`, in
    /// source order.
    fn partial_candidates(&self, selector: &str) -> Vec<usize> {
        let mut candidates = self.untokenized.clone();
        for token in tokens(selector) {
            if let Some(entries) = self.by_token.get(token) {
                candidates.extend(entries);
            }
        }
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }

    /// The selector list of a rule inside the media blocks `media` after
    /// extension: the original selectors followed by every selector they
    /// gained.
    pub fn apply(&self, selectors: &[String], media: &[RuleId]) -> Vec<String> {
        // Each selector with the `all` extends it was derived through.
        let mut found: IndexMap<String, Vec<usize>> =
            selectors.iter().map(|s| (normalize(s), Vec::new())).collect();
        let mut index = 0;
        while index < found.len() && found.len() < MAX_SELECTORS {
            let Some((current, lineage)) = found.get_index(index).map(|(s, l)| (s.clone(), l.clone())) else {
                break;
            };
            if let Some(extenders) = self.exact.get(&current) {
                for extension in extenders.iter().filter(|e| e.reaches(media)) {
                    record(&mut found, extension.extender.clone(), &lineage);
                }
            }
            for which in self.partial_candidates(&current) {
                let extension = &self.partial[which];
                if lineage.contains(&which) || !extension.reaches(media) {
                    continue;
                }
                if let Some(extended) = replace_matches(&current, &extension.target, &extension.extender) {
                    let mut derived = lineage.clone();
                    derived.push(which);
                    record(&mut found, extended, &derived);
                }
            }
            index += 1;
        }
        if found.len() > MAX_SELECTORS {
            log::warn!("selector list grew past {MAX_SELECTORS} entries while extending; truncating");
            found.truncate(MAX_SELECTORS);
        }
        found.into_keys().collect()
    }

    /// Only the selectors a rule gained, for rules that are not output on
    /// their own (reference imports).
    pub fn added(&self, selectors: &[String], media: &[RuleId]) -> Vec<String> {
        let original: Vec<String> = selectors.iter().map(|s| normalize(s)).collect();
        self.apply(selectors, media)
            .into_iter()
            .filter(|selector| !original.contains(selector))
            .collect()
    }
}

/// Adds `selector` derived through `lineage`. A selector reached again
/// also counts as derived through the new lineage, so expanding an
/// already expanded list adds nothing.
fn record(found: &mut IndexMap<String, Vec<usize>>, selector: String, lineage: &[usize]) {
    let entry = found.entry(selector).or_default();
    for which in lineage {
        if !entry.contains(which) {
            entry.push(*which);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(selectors: &[&str]) -> Vec<String> {
        selectors.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  .a   .b "), ".a .b");
        assert_eq!(normalize(".a>.b"), ".a > .b");
        assert_eq!(normalize(".a  +  .b"), ".a + .b");
        assert_eq!(normalize("li:nth-child(2n+1)"), "li:nth-child(2n+1)");
        assert_eq!(normalize("a[title~=x]"), "a[title~=x]");
    }

    #[test]
    fn test_exact_extend() {
        let mut index = ExtendIndex::new();
        index.add(".a", false, ".b", None);
        assert_eq!(index.apply(&list(&[".a"]), &[]), list(&[".a", ".b"]));
        assert_eq!(index.apply(&list(&[".x .a"]), &[]), list(&[".x .a"]));
    }

    #[test]
    fn test_extend_is_transitive() {
        let mut index = ExtendIndex::new();
        index.add(".a", false, ".b", None);
        index.add(".b", false, ".c", None);
        assert_eq!(index.apply(&list(&[".a"]), &[]), list(&[".a", ".b", ".c"]));
    }

    #[test]
    fn test_all_replaces_partial_matches() {
        let mut index = ExtendIndex::new();
        index.add(".a", true, ".z", None);
        assert_eq!(
            index.apply(&list(&[".a:hover", ".x .a", ".ab"]), &[]),
            list(&[".a:hover", ".x .a", ".ab", ".z:hover", ".x .z"])
        );
    }

    #[test]
    fn test_applying_twice_changes_nothing() {
        let mut index = ExtendIndex::new();
        index.add(".a", true, ".a.b", None);
        let once = index.apply(&list(&[".a"]), &[]);
        assert_eq!(once, list(&[".a", ".a.b"]));
        assert_eq!(index.apply(&once, &[]), once);
    }

    #[test]
    fn test_all_extend_does_not_feed_on_itself() {
        let mut index = ExtendIndex::new();
        index.add(".nav", true, ".nav .item", None);
        assert_eq!(
            index.apply(&list(&[".nav .link"]), &[]),
            list(&[".nav .link", ".nav .item .link"])
        );
    }

    #[test]
    fn test_different_all_extends_chain() {
        let mut index = ExtendIndex::new();
        index.add(".a", true, ".b", None);
        index.add(".b", true, ".c", None);
        assert_eq!(
            index.apply(&list(&[".a:hover"]), &[]),
            list(&[".a:hover", ".b:hover", ".c:hover"])
        );
    }

    #[test]
    fn test_tokens() {
        assert_eq!(tokens(".nav > a:hover").collect::<Vec<_>>(), vec!["nav", "a", "hover"]);
        assert_eq!(tokens("*").count(), 0);
        let mut index = ExtendIndex::new();
        index.add("*", true, ".any", None);
        assert_eq!(index.apply(&list(&["* + p"]), &[]), list(&["* + p", ".any + p"]));
    }

    #[test]
    fn test_media_extends_stay_in_their_block() {
        let print = RuleId(7);
        let mut index = ExtendIndex::new();
        index.add(".a", false, ".b", Some(print));
        assert_eq!(index.apply(&list(&[".a"]), &[]), list(&[".a"]));
        assert_eq!(index.apply(&list(&[".a"]), &[print]), list(&[".a", ".b"]));
        assert_eq!(index.apply(&list(&[".a"]), &[RuleId(8)]), list(&[".a"]));
    }

    #[test]
    fn test_added_only() {
        let mut index = ExtendIndex::new();
        index.add(".a", false, ".b", None);
        assert_eq!(index.added(&list(&[".a"]), &[]), list(&[".b"]));
        assert!(index.added(&list(&[".q"]), &[]).is_empty());
    }
}
