use super::node::NodeId;
use super::tree::Tree;

impl Tree {
    /// Finds tabstop `number` as seen from `id`.
    ///
    /// Checks `id`'s own table, then every child except `requester`, then the
    /// parent unless the parent is the requester. Nested snippets are
    /// separate namespaces: they are never searched from outside and never
    /// delegate to their parent.
    pub fn get_tabstop(&self, id: NodeId, requester: NodeId, number: usize) -> Option<NodeId> {
        let node = self.get(id)?;
        if let Some(&ts) = node.tabstops.get(&number) {
            return Some(ts);
        }

        for &child in &node.children {
            if child == requester || self.get(child).is_none_or(|c| c.is_scope()) {
                continue;
            }
            if let Some(ts) = self.get_tabstop(child, id, number) {
                return Some(ts);
            }
        }

        if node.is_scope() {
            return None;
        }
        match node.parent {
            Some(parent) if parent != requester => self.get_tabstop(parent, id, number),
            _ => None,
        }
    }
}
