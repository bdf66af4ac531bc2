use super::position::Position;

/// A half-open `[start, end)` range of positions.
///
/// Inside the text-object tree spans are relative to the owning node's parent;
/// [`crate::SnippetInstance`] resolves them to absolute spans on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    /// Inclusive start.
    pub start: Position,
    /// Exclusive end.
    pub end: Position,
}

impl Span {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// True if the span covers no text.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }

    /// True if `pos` lies in the span. The end is included so a cursor
    /// resting right after a placeholder still counts as inside it.
    #[must_use]
    pub fn contains(self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }
}
