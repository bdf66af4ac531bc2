use std::fmt;
use std::ops::Add;

/// A zero-based `(line, column)` location.
///
/// Columns count characters (Unicode scalar values), not bytes, so positions
/// stay meaningful regardless of how the host stores its text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Line index, 0 being the first line.
    pub line: usize,
    /// Character index within the line.
    pub col: usize,
}

impl Position {
    pub const ZERO: Position = Position { line: 0, col: 0 };

    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }

    /// Moves this position by a signed delta, clamping at zero.
    #[must_use]
    pub fn shifted(self, lines: isize, cols: isize) -> Self {
        Self {
            line: self.line.saturating_add_signed(lines),
            col: self.col.saturating_add_signed(cols),
        }
    }

    /// Places `self`, relative to `origin`, in `origin`'s frame. Only the
    /// first line is offset by the origin's column.
    #[must_use]
    pub fn anchored_at(self, origin: Position) -> Self {
        if self.line == 0 {
            origin + self
        } else {
            Position::new(origin.line + self.line, self.col)
        }
    }

    /// Inverse of [`Position::anchored_at`]: `self` as seen from `origin`.
    /// Positions before the origin clamp to it.
    #[must_use]
    pub fn relative_to(self, origin: Position) -> Self {
        if self.line > origin.line {
            Position::new(self.line - origin.line, self.col)
        } else if self.line == origin.line {
            Position::new(0, self.col.saturating_sub(origin.col))
        } else {
            Position::ZERO
        }
    }

    /// Signed `(lines, cols)` difference `self - earlier`.
    pub fn delta_from(self, earlier: Position) -> (isize, isize) {
        (
            self.line as isize - earlier.line as isize,
            self.col as isize - earlier.col as isize,
        )
    }
}

/// Component-wise addition, used to place a line-0 relative position inside
/// its parent's absolute frame.
impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.line + rhs.line, self.col + rhs.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
