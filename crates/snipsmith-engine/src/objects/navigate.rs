use std::ops::Bound;

use super::node::NodeId;
use super::tree::Tree;

impl Tree {
    /// Closest tabstop numbered above `after` within the scope at `id`,
    /// searching the local table and every child subtree.
    pub fn next_tabstop(&self, id: NodeId, after: usize) -> Option<(usize, NodeId)> {
        let node = self.get(id)?;
        let mut best = node
            .tabstops
            .range((Bound::Excluded(after), Bound::Unbounded))
            .next()
            .map(|(&n, &ts)| (n, ts));

        for candidate in self.child_results(id, |child| self.next_tabstop(child, after)) {
            if best.is_none_or(|(n, _)| candidate.0 < n) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Closest tabstop numbered below `before` (and above 0) within the scope
    /// at `id`.
    pub fn prev_tabstop(&self, id: NodeId, before: usize) -> Option<(usize, NodeId)> {
        let node = self.get(id)?;
        let mut best = if before > 1 {
            node.tabstops
                .range(1..before)
                .next_back()
                .map(|(&n, &ts)| (n, ts))
        } else {
            None
        };

        for candidate in self.child_results(id, |child| self.prev_tabstop(child, before)) {
            if best.is_none_or(|(n, _)| candidate.0 > n) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Applies `f` to every child that belongs to the same namespace.
    fn child_results<T>(
        &self,
        id: NodeId,
        f: impl Fn(NodeId) -> Option<T>,
    ) -> impl Iterator<Item = T> {
        self.get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|&&c| self.get(c).is_some_and(|c| !c.is_scope()))
            .filter_map(move |&c| f(c))
    }
}
