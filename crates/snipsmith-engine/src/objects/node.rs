use std::collections::BTreeMap;
use std::fmt;

use crate::buffer::TextBuffer;
use crate::geometry::{Position, Span};
use crate::transform::Transform;

/// Stable index of a node in its [`Tree`](super::Tree). Never reused within
/// one tree, even after the node is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Root of one expansion and its tabstop namespace.
    Snippet,
    /// A single character that came from a two-character escape.
    Literal,
    TabStop {
        number: usize,
    },
    /// Copies its target's text. `None` once the target is gone.
    Mirror {
        target: Option<NodeId>,
    },
    Transformation {
        target: Option<NodeId>,
        rule: Transform,
    },
    ShellFragment,
    ScriptFragment,
    /// Code re-evaluated on every update pass.
    ProgramFragment {
        code: String,
        indent: String,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Snippet => "Snippet",
            NodeKind::Literal => "Literal",
            NodeKind::TabStop { .. } => "TabStop",
            NodeKind::Mirror { .. } => "Mirror",
            NodeKind::Transformation { .. } => "Transformation",
            NodeKind::ShellFragment => "ShellFragment",
            NodeKind::ScriptFragment => "ScriptFragment",
            NodeKind::ProgramFragment { .. } => "ProgramFragment",
        }
    }
}

/// One text object.
///
/// `start` and `end` are relative to the parent's text: line 0 is the
/// parent's first line and columns on line 0 count from the parent's start.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub start: Position,
    pub end: Position,
    pub parent: Option<NodeId>,
    /// Sorted by start position; equal starts keep insertion order.
    pub children: Vec<NodeId>,
    /// Tabstops defined directly in this node's scope.
    pub tabstops: BTreeMap<usize, NodeId>,
    pub text: TextBuffer,
}

impl Node {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    pub fn tabstop_number(&self) -> Option<usize> {
        match self.kind {
            NodeKind::TabStop { number } => Some(number),
            _ => None,
        }
    }

    /// True for nodes that open their own tabstop namespace.
    pub fn is_scope(&self) -> bool {
        matches!(self.kind, NodeKind::Snippet)
    }
}
