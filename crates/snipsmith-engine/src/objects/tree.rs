use std::fmt::Write as _;

use super::node::{Node, NodeId, NodeKind};
use crate::buffer::TextBuffer;
use crate::geometry::{Position, Span};

/// Arena of text objects.
///
/// Nodes are addressed by [`NodeId`]. Discarding a node frees its slot but
/// never hands the index out again, so a stale id simply resolves to nothing.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parentless `Snippet` node at an absolute position.
    pub fn add_root(&mut self, start: Position, text: &str) -> NodeId {
        let text = TextBuffer::new(text);
        self.push(Node {
            kind: NodeKind::Snippet,
            start,
            end: text.calc_end(start),
            parent: None,
            children: Vec::new(),
            tabstops: Default::default(),
            text,
        })
    }

    /// Adds a child of `parent` covering `span` of the parent's text.
    pub fn add_node(&mut self, parent: NodeId, kind: NodeKind, span: Span, text: &str) -> NodeId {
        let id = self.push(Node {
            kind,
            start: span.start,
            end: span.end,
            parent: Some(parent),
            children: Vec::new(),
            tabstops: Default::default(),
            text: TextBuffer::new(text),
        });

        let at = match self.get(parent) {
            Some(p) => p
                .children
                .partition_point(|&c| self.get(c).is_some_and(|c| c.start <= span.start)),
            None => return id,
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.insert(at, id);
        }
        id
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(Some(node));
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current text of a node; empty for discarded nodes.
    pub fn text_of(&self, id: NodeId) -> String {
        self.get(id).map(|n| n.text.to_string()).unwrap_or_default()
    }

    /// Records `tabstop` under `number` in `scope`'s local table.
    pub fn register_tabstop(&mut self, scope: NodeId, number: usize, tabstop: NodeId) {
        if let Some(node) = self.get_mut(scope) {
            node.tabstops.insert(number, tabstop);
        }
    }

    pub fn unregister_tabstop(&mut self, scope: NodeId, number: usize) -> Option<NodeId> {
        self.get_mut(scope)?.tabstops.remove(&number)
    }

    /// Overwrites a node's text wholesale. Every descendant is discarded and
    /// the local tabstop table is cleared; the end is left for the next
    /// update to recompute.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        let children = std::mem::take(&mut node.children);
        node.tabstops.clear();
        node.text = TextBuffer::new(text);
        for child in children {
            self.discard(child);
        }
    }

    /// Replaces a node's text but keeps its children. Used for computed
    /// content, which never has children of its own.
    pub(crate) fn replace_content(&mut self, id: NodeId, text: &str) {
        if let Some(node) = self.get_mut(id) {
            node.text = TextBuffer::new(text);
        }
    }

    fn discard(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        for child in node.children {
            self.discard(child);
        }
    }

    pub fn abs_start(&self, id: NodeId) -> Position {
        match self.get(id) {
            Some(node) => self.to_absolute(node.parent, node.start),
            None => Position::ZERO,
        }
    }

    pub fn abs_end(&self, id: NodeId) -> Position {
        match self.get(id) {
            Some(node) => self.to_absolute(node.parent, node.end),
            None => Position::ZERO,
        }
    }

    pub fn abs_span(&self, id: NodeId) -> Span {
        Span::new(self.abs_start(id), self.abs_end(id))
    }

    /// Resolves a position relative to `parent`'s text. Line 0 shares the
    /// parent's first line, so both components add; later lines only take
    /// the parent's line offset.
    fn to_absolute(&self, parent: Option<NodeId>, rel: Position) -> Position {
        let Some(parent) = parent else {
            return rel;
        };
        rel.anchored_at(self.abs_start(parent))
    }

    /// Indented outline of the subtree at `id`, one node per line.
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        let detail = match &node.kind {
            NodeKind::TabStop { number } => format!("({number})"),
            NodeKind::Mirror { target } | NodeKind::Transformation { target, .. } => {
                match target {
                    Some(t) => format!("({t})"),
                    None => "(-)".to_string(),
                }
            }
            _ => String::new(),
        };
        let _ = writeln!(
            out,
            "{:indent$}{id} {}{detail} {}..{} {:?}",
            "",
            node.kind.name(),
            node.start,
            node.end,
            node.text.to_string(),
            indent = depth * 2
        );
        for &child in &node.children {
            self.dump_into(child, depth + 1, out);
        }
    }
}
