//! Line/column addressed text storage backed by an `xi_rope::Rope`.

use std::borrow::Cow;
use std::fmt;

use xi_rope::{LinesMetric, Rope};

use crate::geometry::Position;

/// The current text of one text object.
///
/// Positions handed to the buffer are relative to the buffer's first
/// character. Columns past the end of a line clamp to the line's end, lines
/// past the end clamp to the end of the text.
#[derive(Clone)]
pub struct TextBuffer {
    rope: Rope,
}

impl TextBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from(text),
        }
    }

    /// Full text as a string slice (allocates only for multi-leaf ropes).
    pub fn as_cow(&self) -> Cow<'_, str> {
        self.rope.slice_to_cow(..)
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len() == 0
    }

    /// Number of lines; an empty buffer still has one (empty) line.
    pub fn line_count(&self) -> usize {
        self.rope.measure::<LinesMetric>() + 1
    }

    /// Where this buffer's text ends if it starts at `start`.
    pub fn calc_end(&self, start: Position) -> Position {
        text_end(start, &self.as_cow())
    }

    /// Replaces `[start, end)` with `new_text` and returns the position where
    /// the inserted text ends.
    pub fn replace_text(&mut self, start: Position, end: Position, new_text: &str) -> Position {
        let from = self.offset_of(start);
        let to = self.offset_of(end).max(from);
        self.rope.edit(from..to, new_text);
        text_end(start, new_text)
    }

    /// Byte offset of a position, clamped into the text.
    fn offset_of(&self, pos: Position) -> usize {
        if pos.line >= self.line_count() {
            return self.rope.len();
        }
        let line_start = self.rope.offset_of_line(pos.line);
        let line_end = if pos.line + 1 < self.line_count() {
            // Stop before the line break.
            self.rope.offset_of_line(pos.line + 1) - 1
        } else {
            self.rope.len()
        };
        let line = self.rope.slice_to_cow(line_start..line_end);
        let within = line
            .char_indices()
            .nth(pos.col)
            .map_or(line.len(), |(idx, _)| idx);
        line_start + within
    }
}

/// End position of `text` when it is placed at `start`.
pub fn text_end(start: Position, text: &str) -> Position {
    match text.rfind('\n') {
        None => Position::new(start.line, start.col + text.chars().count()),
        Some(last_break) => {
            let breaks = text.matches('\n').count();
            let last_line = &text[last_break + 1..];
            Position::new(start.line + breaks, last_line.chars().count())
        }
    }
}

impl fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_cow())
    }
}

impl fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextBuffer({:?})", self.as_cow())
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<&str> for TextBuffer {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pos(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    #[test]
    fn calc_end_single_line() {
        let tb = TextBuffer::new("hello");
        assert_eq!(tb.calc_end(pos(0, 0)), pos(0, 5));
        assert_eq!(tb.calc_end(pos(3, 4)), pos(3, 9));
    }

    #[test]
    fn calc_end_multi_line_uses_last_line_length() {
        let tb = TextBuffer::new("ab\ncde\nf");
        assert_eq!(tb.calc_end(pos(2, 7)), pos(4, 1));
    }

    #[test]
    fn calc_end_trailing_newline() {
        let tb = TextBuffer::new("ab\n");
        assert_eq!(tb.calc_end(pos(0, 3)), pos(1, 0));
    }

    #[test]
    fn calc_end_counts_chars_not_bytes() {
        let tb = TextBuffer::new("h\u{e9}llo");
        assert_eq!(tb.calc_end(pos(0, 0)), pos(0, 5));
    }

    #[test]
    fn replace_within_line() {
        let mut tb = TextBuffer::new("a ${1:x} b");
        let end = tb.replace_text(pos(0, 2), pos(0, 8), "xyz");
        assert_eq!(tb.to_string(), "a xyz b");
        assert_eq!(end, pos(0, 5));
    }

    #[test]
    fn replace_across_lines() {
        let mut tb = TextBuffer::new("one\ntwo\nthree");
        let end = tb.replace_text(pos(0, 1), pos(2, 2), "X\nY");
        assert_eq!(tb.to_string(), "oX\nYree");
        assert_eq!(end, pos(1, 1));
    }

    #[test]
    fn replace_inserting_line_break() {
        let mut tb = TextBuffer::new("ab");
        let end = tb.replace_text(pos(0, 1), pos(0, 1), "\n");
        assert_eq!(tb.to_string(), "a\nb");
        assert_eq!(end, pos(1, 0));
        assert_eq!(tb.line_count(), 2);
    }

    #[test]
    fn replace_clamps_out_of_range_positions() {
        let mut tb = TextBuffer::new("ab\ncd");
        tb.replace_text(pos(0, 10), pos(9, 0), "!");
        assert_eq!(tb.to_string(), "ab!");
    }

    #[test]
    fn replace_on_second_line_with_multibyte_chars() {
        let mut tb = TextBuffer::new("x\n\u{e4}\u{f6}\u{fc}");
        tb.replace_text(pos(1, 1), pos(1, 2), "o");
        assert_eq!(tb.to_string(), "x\n\u{e4}o\u{fc}");
    }

    #[test]
    fn empty_buffer_has_one_line() {
        let tb = TextBuffer::new("");
        assert!(tb.is_empty());
        assert_eq!(tb.line_count(), 1);
        assert_eq!(tb.calc_end(pos(1, 1)), pos(1, 1));
    }
}
