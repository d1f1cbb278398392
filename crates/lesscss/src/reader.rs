//! Character source for the parser.
//!
//! The reader splits input into segments terminated by a structural marker
//! (`{`, `}` or `;`). While scanning it tracks line and column, skips
//! comments and keeps quoted strings and parenthesized text intact, so a
//! `;` inside `url(data:...;base64,...)` or a `}` inside a string never ends
//! a segment.

use crate::error::{LessError, Result, SourcePosition};
use std::sync::Arc;

/// The structural marker that ended a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    OpenBrace,
    CloseBrace,
    Semicolon,
    EndOfInput,
}

/// Text between two structural markers.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub marker: Marker,
    /// Raw text with comments removed; not trimmed.
    pub text: String,
    /// Position of the first non-blank character, or of the marker for
    /// blank segments.
    pub pos: SourcePosition,
}

impl Segment {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A character reader with one character of pushback.
pub struct LookaheadReader<'a> {
    source: &'a str,
    offset: usize,
    file: Option<Arc<str>>,
    line: u32,
    column: u32,
    previous: (u32, u32),
    comments: Vec<String>,
}

impl<'a> LookaheadReader<'a> {
    pub fn new(source: &'a str, file: Option<Arc<str>>) -> Self {
        Self {
            source,
            offset: 0,
            file,
            line: 1,
            column: 1,
            previous: (1, 1),
            comments: Vec::new(),
        }
    }

    pub fn position(&self) -> SourcePosition {
        SourcePosition::new(self.file.clone(), self.line, self.column)
    }

    /// Consumes one character.
    pub fn read(&mut self) -> Option<char> {
        let ch = self.source[self.offset..].chars().next()?;
        self.offset += ch.len_utf8();
        self.previous = (self.line, self.column);
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Returns the character just read to the input.
    ///
    /// Only the most recently read character can be pushed back.
    pub fn push_back(&mut self, ch: char) {
        debug_assert!(self.source[..self.offset].ends_with(ch));
        self.offset -= ch.len_utf8();
        (self.line, self.column) = self.previous;
    }

    /// Drains block comments that preceded the last segment's text.
    pub fn take_comments(&mut self) -> Vec<String> {
        std::mem::take(&mut self.comments)
    }

    /// Reads up to and including the next structural marker at
    /// parenthesis depth zero.
    pub fn next_segment(&mut self) -> Result<Segment> {
        let mut text = String::new();
        let mut start: Option<SourcePosition> = None;
        let mut depth = 0usize;

        loop {
            let here = self.position();
            let Some(ch) = self.read() else {
                let marker = if text.trim().is_empty() {
                    Marker::EndOfInput
                } else {
                    Marker::Semicolon
                };
                return Ok(Segment {
                    marker,
                    text,
                    pos: start.unwrap_or(here),
                });
            };

            match ch {
                '/' => match self.read() {
                    Some('*') => {
                        let comment = self.read_block_comment(&here)?;
                        if text.trim().is_empty() {
                            self.comments.push(comment);
                        }
                        continue;
                    }
                    Some('/') if depth == 0 => {
                        self.skip_line();
                        continue;
                    }
                    Some(next) => {
                        self.push_back(next);
                        text.push('/');
                    }
                    None => text.push('/'),
                },
                '"' | '\'' | '`' => {
                    text.push(ch);
                    self.read_string(ch, &mut text, &here)?;
                }
                '\\' => {
                    text.push(ch);
                    if let Some(escaped) = self.read() {
                        text.push(escaped);
                    }
                }
                '@' => {
                    text.push(ch);
                    match self.read() {
                        // `@{name}` interpolation braces are not structural.
                        Some('{') => {
                            text.push('{');
                            while let Some(inner) = self.read() {
                                text.push(inner);
                                if inner == '}' {
                                    break;
                                }
                            }
                        }
                        Some(next) => self.push_back(next),
                        None => {}
                    }
                }
                '(' => {
                    depth += 1;
                    text.push(ch);
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    text.push(ch);
                }
                '{' | '}' | ';' if depth == 0 => {
                    let marker = match ch {
                        '{' => Marker::OpenBrace,
                        '}' => Marker::CloseBrace,
                        _ => Marker::Semicolon,
                    };
                    return Ok(Segment {
                        marker,
                        text,
                        pos: start.unwrap_or(here),
                    });
                }
                _ => text.push(ch),
            }

            if start.is_none() && !ch.is_whitespace() {
                start = Some(here);
            }
        }
    }

    fn read_block_comment(&mut self, start: &SourcePosition) -> Result<String> {
        let mut comment = String::from("/*");
        let mut star = false;
        while let Some(ch) = self.read() {
            comment.push(ch);
            if star && ch == '/' {
                return Ok(comment);
            }
            star = ch == '*';
        }
        Err(LessError::syntax("unterminated comment", start.clone()))
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.read() {
            if ch == '\n' {
                break;
            }
        }
    }

    fn read_string(&mut self, quote: char, text: &mut String, start: &SourcePosition) -> Result<()> {
        while let Some(ch) = self.read() {
            text.push(ch);
            if ch == '\\' {
                if let Some(escaped) = self.read() {
                    text.push(escaped);
                }
            } else if ch == quote {
                return Ok(());
            }
        }
        Err(LessError::syntax("unterminated string", start.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(input: &str) -> Vec<(Marker, String)> {
        let mut reader = LookaheadReader::new(input, None);
        let mut result = Vec::new();
        loop {
            let segment = reader.next_segment().unwrap();
            let marker = segment.marker;
            result.push((marker, segment.text.trim().to_string()));
            if marker == Marker::EndOfInput {
                return result;
            }
        }
    }

    #[test]
    fn test_markers() {
        assert_eq!(
            segments(".a { color: red; }"),
            vec![
                (Marker::OpenBrace, ".a".to_string()),
                (Marker::Semicolon, "color: red".to_string()),
                (Marker::CloseBrace, String::new()),
                (Marker::EndOfInput, String::new()),
            ]
        );
    }

    #[test]
    fn test_markers_inside_strings_and_parens() {
        let result = segments(r#"content: "a;b}"; background: url(data:x;base64,AA)"#);
        assert_eq!(result[0].1, r#"content: "a;b}""#);
        // The unterminated last statement is closed implicitly.
        assert_eq!(
            result[1],
            (Marker::Semicolon, "background: url(data:x;base64,AA)".to_string())
        );
    }

    #[test]
    fn test_interpolation_braces() {
        let result = segments(".w-@{i} { @{p}-top: 1px; }");
        assert_eq!(result[0], (Marker::OpenBrace, ".w-@{i}".to_string()));
        assert_eq!(result[1], (Marker::Semicolon, "@{p}-top: 1px".to_string()));
    }

    #[test]
    fn test_line_comments_respect_parens() {
        let result = segments("a: url(//cdn/x.png); // trailing\nb: c;");
        assert_eq!(result[0].1, "a: url(//cdn/x.png)");
        assert_eq!(result[1].1, "b: c");
    }

    #[test]
    fn test_leading_block_comments_are_surfaced() {
        let mut reader = LookaheadReader::new("/* one */ a: /* inline */ b;", None);
        let segment = reader.next_segment().unwrap();
        assert_eq!(segment.text.trim(), "a:  b");
        assert_eq!(reader.take_comments(), vec!["/* one */".to_string()]);
        assert!(reader.take_comments().is_empty());
    }

    #[test]
    fn test_positions() {
        let mut reader = LookaheadReader::new("\n\n  .a {", Some("x.less".into()));
        let segment = reader.next_segment().unwrap();
        assert_eq!((segment.pos.line, segment.pos.column), (3, 3));
    }

    #[test]
    fn test_push_back_rewinds_position() {
        let mut reader = LookaheadReader::new("a\nb", None);
        assert_eq!(reader.read(), Some('a'));
        assert_eq!(reader.read(), Some('\n'));
        assert_eq!(reader.position().line, 2);
        reader.push_back('\n');
        assert_eq!((reader.position().line, reader.position().column), (1, 2));
        assert_eq!(reader.read(), Some('\n'));
        assert_eq!(reader.read(), Some('b'));
        assert_eq!(reader.read(), None);
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        let mut reader = LookaheadReader::new("a: \"oops;", None);
        assert!(reader.next_segment().is_err());
    }
}
