//! The update pass: fold children into their parent's text bottom-up, shift
//! the siblings behind every child whose extent changed, then let the node
//! recompute its own content.

use log::trace;

use super::node::{NodeId, NodeKind};
use super::tree::Tree;
use crate::eval::{EvalEnv, FragmentKind};
use crate::geometry::Position;

impl Tree {
    /// Brings `id` and its subtree up to date and returns the node's new end.
    pub fn update(&mut self, id: NodeId, env: &mut EvalEnv<'_>) -> Position {
        let Some(children) = self.get(id).map(|n| n.children.clone()) else {
            return Position::ZERO;
        };

        for (idx, &child) in children.iter().enumerate() {
            let Some((start, old_end)) = self.get(child).map(|c| (c.start, c.end)) else {
                continue;
            };
            let new_end = self.update(child, env);

            let child_text = self.text_of(child);
            if let Some(node) = self.get_mut(id) {
                node.text.replace_text(start, old_end, &child_text);
            }

            let (lines, cols) = new_end.delta_from(old_end);
            self.shift_siblings(&children[idx + 1..], old_end, lines, cols);
        }

        self.recompute_content(id, env);
        env.finish(id);

        let Some(node) = self.get_mut(id) else {
            return Position::ZERO;
        };
        node.end = node.text.calc_end(node.start);
        node.end
    }

    /// Moves the siblings behind a child whose end went from `old_end` to
    /// `old_end + (lines, cols)`. Siblings on later lines move by lines only.
    /// Siblings on the same line at or after the old end also move in column;
    /// their end column moves only when they fit on one line.
    fn shift_siblings(
        &mut self,
        siblings: &[NodeId],
        old_end: Position,
        lines: isize,
        cols: isize,
    ) {
        if lines == 0 && cols == 0 {
            return;
        }
        for &sibling in siblings {
            let Some(node) = self.get_mut(sibling) else {
                continue;
            };
            if node.start.line > old_end.line {
                node.start = node.start.shifted(lines, 0);
                node.end = node.end.shifted(lines, 0);
            } else if node.start.line == old_end.line && node.start.col >= old_end.col {
                let single_line = node.start.line == node.end.line;
                node.start = node.start.shifted(lines, cols);
                node.end = node.end.shifted(lines, if single_line { cols } else { 0 });
            }
        }
    }

    fn recompute_content(&mut self, id: NodeId, env: &mut EvalEnv<'_>) {
        let Some(node) = self.get(id) else {
            return;
        };
        let content = match &node.kind {
            NodeKind::Mirror { target } => self.target_text(*target, env),
            NodeKind::Transformation { target, rule } => {
                rule.apply(&self.target_text(*target, env))
            }
            NodeKind::ProgramFragment { code, indent } => {
                env.run(self, id, FragmentKind::Program, code, indent)
            }
            _ => return,
        };
        trace!("{id} {} -> {content:?}", node.kind.name());
        self.replace_content(id, &content);
    }

    fn target_text(&self, target: Option<NodeId>, env: &mut EvalEnv<'_>) -> String {
        let Some(target) = target else {
            return String::new();
        };
        let text = self.text_of(target);
        env.observe(target, &text);
        text
    }
}
