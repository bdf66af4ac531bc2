//! # Template Kinds
//!
//! Each construct of the template language owns its delimiters and its
//! lookahead check. The tokenizer asks these types; it never hardcodes `${`
//! or a backtick itself.
//!
//! - **`Escape`**: `\` followed by one of `` { } \ $ ` ``
//! - **`Placeholder`**: `$N`, `${N}`, `${N:default}`, `${N/search/replace/options}`
//! - **`Fragment`**: `` `shell` ``, `` `!p program` ``, `` `!v script` ``

pub mod escape;
pub mod fragment;
pub mod placeholder;

pub use escape::Escape;
pub use fragment::Fragment;
pub use placeholder::Placeholder;
