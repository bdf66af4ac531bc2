use crate::geometry::Span;

/// A recognised construct in one scope's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Where the construct sits in the scope text, delimiters included.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// `\c`, standing for the literal `c`.
    Escape(char),
    /// `${N}` or `${N:default}`. The default is raw, untokenized text.
    TabStop { number: usize, default: String },
    /// `${N/search/replace/options}`
    Transformation {
        number: usize,
        search: String,
        replace: String,
        options: String,
    },
    /// `$N`
    Mirror { number: usize },
    /// `` `code` ``, escapes still in place.
    Shell { code: String },
    /// `` `!p code` ``, dedented and trimmed.
    Program { code: String, indent: String },
    /// `` `!v code` ``, trimmed.
    Script { code: String },
}

impl TokenKind {
    /// The tabstop number a placeholder refers to.
    pub fn number(&self) -> Option<usize> {
        match self {
            TokenKind::TabStop { number, .. }
            | TokenKind::Transformation { number, .. }
            | TokenKind::Mirror { number } => Some(*number),
            _ => None,
        }
    }
}
