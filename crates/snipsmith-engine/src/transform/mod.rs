//! # Transformations
//!
//! A transformation mirrors a tabstop through a regex search and a
//! [`CleverReplace`] template: `${1/search/replace/options}`. Options are
//! `g` (replace every match instead of the first) and `i` (ignore case).

pub mod clever_replace;

pub use clever_replace::CleverReplace;

use regex::{Captures, Regex, RegexBuilder};

use crate::error::ParseError;

#[derive(Debug, Clone)]
pub struct Transform {
    search: Regex,
    replace: CleverReplace,
    /// Matches to replace; 0 means all of them.
    limit: usize,
}

impl Transform {
    pub const GLOBAL: char = 'g';
    pub const IGNORE_CASE: char = 'i';

    /// Compiles the search pattern of the transformation of tabstop `number`.
    pub fn compile(
        number: usize,
        search: &str,
        replace: &str,
        options: &str,
    ) -> Result<Self, ParseError> {
        let search = RegexBuilder::new(search)
            .dot_matches_new_line(true)
            .case_insensitive(options.contains(Self::IGNORE_CASE))
            .build()
            .map_err(|source| ParseError::InvalidRegex { number, source })?;
        Ok(Self {
            search,
            replace: CleverReplace::new(replace),
            limit: if options.contains(Self::GLOBAL) { 0 } else { 1 },
        })
    }

    pub fn is_global(&self) -> bool {
        self.limit == 0
    }

    /// Runs the transformation over a tabstop's current text.
    pub fn apply(&self, text: &str) -> String {
        self.search
            .replacen(text, self.limit, |caps: &Captures<'_>| {
                self.replace.replace(caps)
            })
            .into_owned()
    }
}
