use crate::geometry::Position;

/// A cursor for character-by-character template scanning with position tracking.
///
/// Positions are line/column pairs relative to the start of the scanned text,
/// which is exactly the frame a text object's children live in.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// The text being scanned.
    s: &'a str,
    /// Byte index of the next unread character.
    i: usize,
    /// Position of the next unread character.
    pos: Position,
}

impl<'a> Cursor<'a> {
    pub fn new(s: &'a str) -> Self {
        Self {
            s,
            i: 0,
            pos: Position::ZERO,
        }
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    /// Remaining unread text.
    pub fn rest(&self) -> &'a str {
        &self.s[self.i..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Up to `n` upcoming characters, for fixed-length lookahead checks.
    pub fn peek_n(&self, n: usize) -> &'a str {
        let rest = self.rest();
        let end = rest.char_indices().nth(n).map_or(rest.len(), |(idx, _)| idx);
        &rest[..end]
    }

    pub fn starts_with(&self, pat: &str) -> bool {
        self.rest().starts_with(pat)
    }

    /// Advances by one character, returning it.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.i += c.len_utf8();
        if c == '\n' {
            self.pos.line += 1;
            self.pos.col = 0;
        } else {
            self.pos.col += 1;
        }
        Some(c)
    }

    /// Advances by `n` characters (fewer at end of input).
    pub fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            if self.bump().is_none() {
                break;
            }
        }
    }
}
