use std::fmt;

use crate::eval::{EvalFailure, FragmentKind};
use crate::geometry::Position;

/// The bracketed or backtick-delimited construct a parse error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    TabStop,
    Transformation,
    Fragment(FragmentKind),
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Construct::TabStop => f.write_str("tabstop"),
            Construct::Transformation => f.write_str("transformation"),
            Construct::Fragment(kind) => write!(f, "{kind} fragment"),
        }
    }
}

/// Template-definition errors. Any of these rejects the whole expansion
/// before a single text object exists.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unterminated {construct} starting at {at}")]
    Unterminated { construct: Construct, at: Position },
    #[error("invalid tabstop number at {at}")]
    InvalidNumber { at: Position },
    #[error("transformation refers to undefined tabstop ${number}")]
    UnresolvedReference { number: usize },
    #[error("invalid search pattern in transformation of ${number}: {source}")]
    InvalidRegex {
        number: usize,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SnippetError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{} fragment(s) failed to evaluate", .0.len())]
    Evaluation(Vec<EvalFailure>),
    #[error("no tabstop ${0} in this snippet")]
    UnknownTabStop(usize),
    #[error("no tabstop is focused")]
    NoFocusedTabStop,
}
