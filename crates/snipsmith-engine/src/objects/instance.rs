use log::debug;

use super::node::{NodeId, NodeKind};
use super::tree::Tree;
use crate::buffer::text_end;
use crate::error::SnippetError;
use crate::eval::{EvalEnv, EvalFailure, Evaluator, Globals, IndentUtil, InstanceState, Locals};
use crate::geometry::{Position, Span};
use crate::parsing;

/// Upper bound on update passes per [`SnippetInstance::update`] call.
pub const MAX_SETTLE_PASSES: usize = 4;

/// How and where a template expands.
#[derive(Debug, Clone, Default)]
pub struct ExpandOptions {
    /// Absolute position of the first character of the expansion.
    pub start: Position,
    /// Indent of the line the snippet expands on.
    pub indent: String,
    /// Text that triggered the expansion, stored as the `match` local.
    pub trigger_match: Option<String>,
    pub globals: Globals,
    pub indent_util: IndentUtil,
}

/// A tabstop as the host sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabStopInfo {
    pub number: usize,
    pub span: Span,
    pub text: String,
}

#[derive(Debug, Clone, Copy)]
struct Scope {
    node: NodeId,
    /// Focused number; `None` once navigation ran past the last tabstop.
    current: Option<usize>,
}

/// One live expansion of a template.
#[derive(Debug)]
pub struct SnippetInstance {
    tree: Tree,
    root: NodeId,
    indent: String,
    state: InstanceState,
    /// Root scope first, innermost nested expansion last.
    scopes: Vec<Scope>,
}

impl SnippetInstance {
    /// Expands `template`.
    ///
    /// Syntax errors and unresolved references are reported before any
    /// fragment runs. Fragments that fail while expanding leave their node
    /// empty; the expansion is returned together with those failures.
    pub fn new(
        template: &str,
        options: ExpandOptions,
        evaluator: &mut dyn Evaluator,
    ) -> Result<(Self, Vec<EvalFailure>), SnippetError> {
        let ExpandOptions {
            start,
            indent,
            trigger_match,
            globals,
            indent_util,
        } = options;

        let items = parsing::scan(template, &indent)?;
        parsing::check_references(&items)?;

        let mut tree = Tree::new();
        let root = tree.add_root(start, template);
        let mut state = InstanceState::new(trigger_match, globals, indent_util);

        let mut env = EvalEnv::new(evaluator, &mut state);
        parsing::build(&mut tree, root, items, &mut env);
        settle(&mut tree, root, &mut env);
        let failures = env.into_failures();

        if !tree.get(root).is_some_and(|n| n.tabstops.contains_key(&0)) {
            let at = tree
                .get(root)
                .map(|n| n.text.calc_end(Position::ZERO))
                .unwrap_or_default();
            debug!("adding final tabstop $0 at {at}");
            let zero = tree.add_node(root, NodeKind::TabStop { number: 0 }, Span::new(at, at), "");
            tree.register_tabstop(root, 0, zero);
        }

        let instance = Self {
            tree,
            root,
            indent,
            state,
            scopes: vec![Scope {
                node: root,
                current: Some(0),
            }],
        };
        Ok((instance, failures))
    }

    /// Re-derives every span and recomputes mirrors, transformations and
    /// program fragments. Another pass runs only when a node read a tabstop
    /// that changed later in the same pass.
    ///
    /// Fragment failures are returned after the passes complete; the tree is
    /// consistent either way.
    pub fn update(&mut self, evaluator: &mut dyn Evaluator) -> Result<(), SnippetError> {
        let mut env = EvalEnv::new(evaluator, &mut self.state);
        settle(&mut self.tree, self.root, &mut env);
        into_result(env.into_failures(), ())
    }

    /// Full text of the expansion.
    pub fn text(&self) -> String {
        self.tree.text_of(self.root)
    }

    pub fn abs_span(&self) -> Span {
        self.tree.abs_span(self.root)
    }

    /// True if the snippet has tabstops besides the final `$0`.
    pub fn has_tabs(&self) -> bool {
        self.tree
            .get(self.root)
            .is_some_and(|n| n.tabstops.keys().any(|&k| k != 0))
    }

    /// The focused tabstop of the innermost scope.
    pub fn current_tabstop(&self) -> Option<TabStopInfo> {
        let scope = self.scopes.last()?;
        let number = scope.current?;
        self.lookup(scope.node, number)
    }

    /// Tabstop `number` of the innermost scope.
    pub fn tabstop(&self, number: usize) -> Option<TabStopInfo> {
        let scope = self.scopes.last()?;
        self.lookup(scope.node, number)
    }

    pub fn locals(&self) -> &Locals {
        &self.state.locals
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Moves focus to the next tabstop. Past the last one, focus goes to
    /// `$0` and then to nothing; an exhausted nested expansion hands over to
    /// the enclosing one.
    pub fn select_next_tab(&mut self) -> Option<TabStopInfo> {
        self.drop_dead_scopes();
        loop {
            let nested = self.scopes.len() > 1;
            let scope = *self.scopes.last()?;
            let Some(current) = scope.current else {
                if nested {
                    self.scopes.pop();
                    continue;
                }
                return None;
            };

            if let Some((number, ts)) = self.tree.next_tabstop(scope.node, current) {
                self.set_current(Some(number));
                return self.info(number, ts);
            }

            self.set_current(None);
            let zero = self
                .tree
                .get(scope.node)
                .and_then(|n| n.tabstops.get(&0).copied());
            if let Some(zero) = zero {
                return self.info(0, zero);
            }
            if !nested {
                return None;
            }
            self.scopes.pop();
        }
    }

    /// Moves focus to the previous tabstop. At the first one, focus stays
    /// and that tabstop is returned again.
    pub fn select_previous_tab(&mut self) -> Option<TabStopInfo> {
        self.drop_dead_scopes();
        loop {
            let nested = self.scopes.len() > 1;
            let scope = *self.scopes.last()?;
            let Some(current) = scope.current else {
                if nested {
                    self.scopes.pop();
                    continue;
                }
                return None;
            };

            return match self.tree.prev_tabstop(scope.node, current) {
                Some((number, ts)) => {
                    self.set_current(Some(number));
                    self.info(number, ts)
                }
                None => self.lookup(scope.node, current),
            };
        }
    }

    /// Overwrites tabstop `number` wholesale, as when the user types over a
    /// selected placeholder, then updates.
    pub fn set_tabstop_text(
        &mut self,
        number: usize,
        text: &str,
        evaluator: &mut dyn Evaluator,
    ) -> Result<(), SnippetError> {
        let scope = self.scopes.last().map(|s| s.node).unwrap_or(self.root);
        let ts = self
            .tree
            .get_tabstop(scope, scope, number)
            .ok_or(SnippetError::UnknownTabStop(number))?;
        self.tree.set_text(ts, text);
        self.update(evaluator)
    }

    /// Expands `template` inside the focused tabstop and focuses its first
    /// tabstop. The nested expansion numbers its tabstops independently; its
    /// `$0` is dropped unless it expands inside the enclosing `$0`.
    ///
    /// A failing fragment leaves its node empty. The expansion still takes
    /// place and focus moves into it before the failures are returned.
    pub fn expand_nested(
        &mut self,
        template: &str,
        evaluator: &mut dyn Evaluator,
    ) -> Result<Option<TabStopInfo>, SnippetError> {
        let scope = *self.scopes.last().ok_or(SnippetError::NoFocusedTabStop)?;
        let number = scope.current.ok_or(SnippetError::NoFocusedTabStop)?;
        let ts = self
            .tree
            .get_tabstop(scope.node, scope.node, number)
            .ok_or(SnippetError::UnknownTabStop(number))?;

        let items = parsing::scan(template, &self.indent)?;
        parsing::check_references(&items)?;

        self.tree.set_text(ts, template);
        let span = Span::new(Position::ZERO, text_end(Position::ZERO, template));
        let nested = self.tree.add_node(ts, NodeKind::Snippet, span, template);

        let mut env = EvalEnv::new(evaluator, &mut self.state);
        parsing::build(&mut self.tree, nested, items, &mut env);

        if number != 0
            && let Some(zero) = self.tree.unregister_tabstop(nested, 0)
        {
            debug!("dropping $0 of snippet nested in ${number}");
            self.tree.replace_content(zero, "");
        }

        settle(&mut self.tree, self.root, &mut env);
        let failures = env.into_failures();

        self.scopes.push(Scope {
            node: nested,
            current: Some(0),
        });
        let focused = self.select_next_tab();
        into_result(failures, focused)
    }

    /// Accepts the expansion and returns its final text.
    pub fn finish(self) -> String {
        self.text()
    }

    fn set_current(&mut self, current: Option<usize>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.current = current;
        }
    }

    /// Nested scopes whose snippet was overwritten no longer exist.
    fn drop_dead_scopes(&mut self) {
        while self.scopes.len() > 1
            && self
                .scopes
                .last()
                .is_some_and(|s| !self.tree.is_live(s.node))
        {
            self.scopes.pop();
        }
    }

    fn lookup(&self, scope: NodeId, number: usize) -> Option<TabStopInfo> {
        let ts = self.tree.get_tabstop(scope, scope, number)?;
        self.info(number, ts)
    }

    fn info(&self, number: usize, ts: NodeId) -> Option<TabStopInfo> {
        self.tree.is_live(ts).then(|| TabStopInfo {
            number,
            span: self.tree.abs_span(ts),
            text: self.tree.text_of(ts),
        })
    }
}

/// Runs update passes over `root` until nothing read early went stale.
fn settle(tree: &mut Tree, root: NodeId, env: &mut EvalEnv<'_>) {
    for pass in 1..=MAX_SETTLE_PASSES {
        env.begin_pass();
        tree.update(root, env);
        if !env.needs_another_pass(tree) {
            debug!("settled after {pass} pass(es)");
            return;
        }
    }
    debug!("still changing after {MAX_SETTLE_PASSES} passes");
}

fn into_result<T>(failures: Vec<EvalFailure>, value: T) -> Result<T, SnippetError> {
    if failures.is_empty() {
        Ok(value)
    } else {
        Err(SnippetError::Evaluation(failures))
    }
}
