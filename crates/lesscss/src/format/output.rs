//! Buffered output.
//!
//! Every block being rendered owns a [`Frame`]. Declarations collect in the
//! frame until the block closes; blocks nested in it are flattened and
//! written to the frame's trailing text, which follows the block in the
//! output. A block whose frame holds no declarations is dropped, so rules
//! that only contain nested rules or variables never print `selector {}`.

use super::style::OutputStyle;

#[derive(Debug, Default)]
pub struct Frame {
    declarations: Vec<String>,
    trailing: String,
}

impl Frame {
    pub fn has_declarations(&self) -> bool {
        !self.declarations.is_empty()
    }

    /// The declarations joined for `style`; compressed output separates
    /// them with `;` so no semicolon ever precedes a closing brace.
    fn body(&self, style: &dyn OutputStyle) -> String {
        if style.is_compressed() {
            self.declarations.join(";")
        } else {
            self.declarations.concat()
        }
    }
}

#[derive(Debug)]
pub struct Output {
    frames: Vec<Frame>,
}

impl Output {
    /// An output holding only the root frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn pop_frame(&mut self) -> Frame {
        if self.frames.len() > 1 {
            self.frames.pop().unwrap_or_default()
        } else {
            Frame::default()
        }
    }

    /// Index of the innermost frame.
    pub fn current(&self) -> usize {
        self.frames.len() - 1
    }

    /// Returns `true` when no block is open.
    pub fn at_root(&self) -> bool {
        self.frames.len() == 1
    }

    pub fn declare(&mut self, text: String) {
        if let Some(frame) = self.frames.last_mut() {
            frame.declarations.push(text);
        }
    }

    /// Appends text after the innermost block.
    pub fn append(&mut self, text: &str) {
        let current = self.current();
        self.append_to(current, text);
    }

    /// Appends text after the block of frame `index`.
    pub fn append_to(&mut self, index: usize, text: &str) {
        if let Some(frame) = self.frames.get_mut(index) {
            frame.trailing.push_str(text);
        }
    }

    /// Writes a closed rule block followed by its trailing text.
    pub fn close_rule(&mut self, frame: Frame, style: &dyn OutputStyle, indent: &str, selectors: &[String]) {
        let mut text = String::new();
        if frame.has_declarations() && !selectors.is_empty() {
            text.push_str(&style.open_rule(indent, selectors));
            text.push_str(&frame.body(style));
            text.push_str(&style.close_block(indent));
        }
        text.push_str(&frame.trailing);
        self.append(&text);
    }

    /// Renders an at-rule block around `frame`, or nothing if it is empty.
    pub fn wrap_block(frame: Frame, style: &dyn OutputStyle, indent: &str, prelude: &str) -> Option<String> {
        if !frame.has_declarations() && frame.trailing.is_empty() {
            return None;
        }
        let mut text = style.open_at_rule(indent, prelude);
        text.push_str(&frame.body(style));
        text.push_str(&frame.trailing);
        text.push_str(&style.close_block(indent));
        Some(text)
    }

    /// The complete output, once every block is closed.
    pub fn finish(mut self) -> String {
        self.frames.truncate(1);
        self.frames.pop().map(|frame| frame.trailing).unwrap_or_default()
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Compressed, Readable};

    #[test]
    fn test_empty_rules_are_dropped() {
        let mut output = Output::new();
        output.push_frame();
        let frame = output.pop_frame();
        output.close_rule(frame, &Readable, "", &[".a".to_string()]);
        assert_eq!(output.finish(), "");
    }

    #[test]
    fn test_nested_blocks_follow_their_parent() {
        let mut output = Output::new();
        output.push_frame();
        output.declare(Readable.property("  ", "color", "red", false));
        output.push_frame();
        output.declare(Readable.property("  ", "width", "1px", false));
        let inner = output.pop_frame();
        output.close_rule(inner, &Readable, "", &[".a .b".to_string()]);
        let outer = output.pop_frame();
        output.close_rule(outer, &Readable, "", &[".a".to_string()]);
        assert_eq!(
            output.finish(),
            ".a {\n  color: red;\n}\n.a .b {\n  width: 1px;\n}\n"
        );
    }

    #[test]
    fn test_compressed_never_ends_block_with_semicolon() {
        let mut output = Output::new();
        output.push_frame();
        output.declare(Compressed.property("", "color", "red", false));
        output.declare(Compressed.property("", "margin", "0", false));
        let frame = output.pop_frame();
        output.close_rule(frame, &Compressed, "", &[".a".to_string()]);
        assert_eq!(output.finish(), ".a{color:red;margin:0}");
    }

    #[test]
    fn test_wrap_block() {
        let mut frame = Frame::default();
        assert!(Output::wrap_block(frame, &Readable, "", "@media print").is_none());
        frame = Frame::default();
        frame.trailing.push_str("  .a {\n    color: red;\n  }\n");
        assert_eq!(
            Output::wrap_block(frame, &Readable, "", "@media print").unwrap(),
            "@media print {\n  .a {\n    color: red;\n  }\n}\n"
        );
    }
}
