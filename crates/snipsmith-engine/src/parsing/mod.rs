//! # Template Parsing
//!
//! `cursor` and `kinds` do the character-level recognition, `tokenizer`
//! turns one scope into [`Token`]s, and `parser` builds the text-object tree
//! from them.
//!
//! ```text
//! ${1:Hello ${2:world}}!
//! └── TabStop(1) "Hello ${2:world}"
//!     └── TabStop(2) "world"
//! ```

pub mod cursor;
pub mod kinds;
pub mod parser;
pub mod token;
pub mod tokenizer;

pub use parser::{Scanned, build, check_references, scan};
pub use token::{Token, TokenKind};
pub use tokenizer::tokenize;
