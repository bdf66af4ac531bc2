//! # Text Objects
//!
//! The runtime tree of one expansion. Every placeholder, mirror, fragment and
//! escaped character is a [`Node`] in a [`Tree`] arena, with a span relative
//! to its parent's text and its own current text.
//!
//! - `tree`: arena, wholesale text overwrite, absolute positions
//! - `update`: the bottom-up update pass and sibling shifting
//! - `lookup`: tabstop resolution across the tree
//! - `navigate`: next/previous tabstop within a namespace
//! - `instance`: [`SnippetInstance`], the host-facing handle

pub mod instance;
pub mod lookup;
pub mod navigate;
pub mod node;
pub mod tree;
pub mod update;

pub use instance::{ExpandOptions, MAX_SETTLE_PASSES, SnippetInstance, TabStopInfo};
pub use node::{Node, NodeId, NodeKind};
pub use tree::Tree;
