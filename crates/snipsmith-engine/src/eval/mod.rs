//! # Fragment Evaluation
//!
//! Code fragments (`` `shell` ``, `` `!p ...` ``, `` `!v ...` ``) are run by a
//! host-supplied [`Evaluator`]. The engine never interprets code itself; it
//! hands the evaluator an [`EvalContext`] with read access to the snippet's
//! tabstops and mutable access to the per-instance locals.
//!
//! A failing fragment never aborts a pass. Its node shows the empty string
//! and the failure is reported to the caller once the pass is done.
//!
//! Every node is recomputed once per pass. Reads of nodes the pass has not
//! reached yet are remembered in a [`PassReads`]; the pass only has to be
//! repeated when one of those nodes ended up with different text.

pub mod indent;
pub mod util;

pub use indent::IndentUtil;
pub use util::SnippetUtil;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use log::warn;

use crate::geometry::Position;
use crate::objects::{NodeId, Tree};

/// Per-instance key/value store shared by every fragment of one expansion.
pub type Locals = BTreeMap<String, String>;

/// Author-supplied preamble code, keyed by the fragment kind it is for.
pub type Globals = HashMap<FragmentKind, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FragmentKind {
    /// `` `code` ``, run once when the snippet expands.
    Shell,
    /// `` `!v code` ``, run once when the snippet expands.
    Script,
    /// `` `!p code` ``, re-run on every update pass.
    Program,
}

impl FragmentKind {
    /// Tag written after the opening backtick.
    pub fn tag(self) -> &'static str {
        match self {
            FragmentKind::Shell => "",
            FragmentKind::Script => "!v",
            FragmentKind::Program => "!p",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FragmentKind::Shell => "shell",
            FragmentKind::Script => "script",
            FragmentKind::Program => "program",
        })
    }
}

/// Runs fragment code on behalf of the engine.
pub trait Evaluator {
    fn evaluate(
        &mut self,
        kind: FragmentKind,
        code: &str,
        ctx: &mut EvalContext<'_>,
    ) -> anyhow::Result<String>;
}

impl<F> Evaluator for F
where
    F: FnMut(FragmentKind, &str, &mut EvalContext<'_>) -> anyhow::Result<String>,
{
    fn evaluate(
        &mut self,
        kind: FragmentKind,
        code: &str,
        ctx: &mut EvalContext<'_>,
    ) -> anyhow::Result<String> {
        self(kind, code, ctx)
    }
}

/// Evaluator for hosts without any code execution: every fragment fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvaluator;

impl Evaluator for NullEvaluator {
    fn evaluate(
        &mut self,
        kind: FragmentKind,
        _code: &str,
        _ctx: &mut EvalContext<'_>,
    ) -> anyhow::Result<String> {
        anyhow::bail!("no evaluator available for {kind} fragments")
    }
}

/// A fragment that failed to evaluate.
#[derive(Debug, thiserror::Error)]
#[error("{kind} fragment at {at} failed: {error:#}")]
pub struct EvalFailure {
    pub kind: FragmentKind,
    /// Absolute start of the fragment.
    pub at: Position,
    pub error: anyhow::Error,
}

/// State that lives as long as one snippet instance.
#[derive(Debug, Clone, Default)]
pub struct InstanceState {
    pub locals: Locals,
    pub globals: Globals,
    preamble_taken: HashSet<FragmentKind>,
    pub indent_util: IndentUtil,
}

impl InstanceState {
    pub const MATCH_KEY: &'static str = "match";

    pub fn new(trigger_match: Option<String>, globals: Globals, indent_util: IndentUtil) -> Self {
        let mut locals = Locals::new();
        if let Some(m) = trigger_match {
            locals.insert(Self::MATCH_KEY.to_string(), m);
        }
        Self {
            locals,
            globals,
            preamble_taken: HashSet::new(),
            indent_util,
        }
    }
}

/// Which nodes the current update pass has finished, and what was read from
/// the ones it had not.
#[derive(Debug, Default)]
pub struct PassReads {
    finished: HashSet<NodeId>,
    early: Vec<(NodeId, String)>,
}

impl PassReads {
    fn begin(&mut self) {
        self.finished.clear();
        self.early.clear();
    }

    fn finish(&mut self, id: NodeId) {
        self.finished.insert(id);
    }

    /// Remembers `text` as read from `target` unless the pass is already
    /// done with it.
    fn record(&mut self, target: NodeId, text: &str) {
        if !self.finished.contains(&target) {
            self.early.push((target, text.to_string()));
        }
    }

    fn any_stale(&self, tree: &Tree) -> bool {
        self.early
            .iter()
            .any(|(target, seen)| tree.text_of(*target) != *seen)
    }
}

/// What an evaluator can see and touch while running one fragment.
pub struct EvalContext<'a> {
    tree: &'a Tree,
    node: NodeId,
    kind: FragmentKind,
    state: &'a mut InstanceState,
    reads: &'a mut PassReads,
    util: SnippetUtil,
}

impl EvalContext<'_> {
    /// Live text of tabstop `number`, as seen from this fragment.
    pub fn tab(&mut self, number: usize) -> Option<String> {
        let ts = self.tree.get_tabstop(self.node, self.node, number)?;
        let text = self.tree.text_of(ts);
        self.reads.record(ts, &text);
        Some(text)
    }

    /// The fragment's own text before this evaluation.
    pub fn current(&self) -> &str {
        self.util.current()
    }

    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    pub fn locals(&self) -> &Locals {
        &self.state.locals
    }

    pub fn locals_mut(&mut self) -> &mut Locals {
        &mut self.state.locals
    }

    /// Preamble code for this fragment kind. Only the first request per kind
    /// and instance gets it; later calls return `None`.
    pub fn take_preamble(&mut self) -> Option<Vec<String>> {
        if !self.state.preamble_taken.insert(self.kind) {
            return None;
        }
        self.state.globals.get(&self.kind).cloned()
    }

    pub fn util(&self) -> &SnippetUtil {
        &self.util
    }

    pub fn util_mut(&mut self) -> &mut SnippetUtil {
        &mut self.util
    }
}

/// Evaluator plus instance state for the duration of one build or update.
/// Collects failures instead of bailing out.
pub struct EvalEnv<'e> {
    evaluator: &'e mut dyn Evaluator,
    state: &'e mut InstanceState,
    reads: PassReads,
    failed: HashSet<NodeId>,
    failures: Vec<EvalFailure>,
}

impl<'e> EvalEnv<'e> {
    pub fn new(evaluator: &'e mut dyn Evaluator, state: &'e mut InstanceState) -> Self {
        Self {
            evaluator,
            state,
            reads: PassReads::default(),
            failed: HashSet::new(),
            failures: Vec::new(),
        }
    }

    /// Forgets what the previous pass read.
    pub fn begin_pass(&mut self) {
        self.reads.begin();
    }

    /// Marks `id` as recomputed for this pass.
    pub fn finish(&mut self, id: NodeId) {
        self.reads.finish(id);
    }

    /// Notes that a node's content was computed from `target`'s text.
    pub fn observe(&mut self, target: NodeId, text: &str) {
        self.reads.record(target, text);
    }

    /// True when some node read text the pass changed afterwards.
    pub fn needs_another_pass(&self, tree: &Tree) -> bool {
        self.reads.any_stale(tree)
    }

    /// Evaluates the fragment at `node` and returns the text it should show.
    pub fn run(
        &mut self,
        tree: &Tree,
        node: NodeId,
        kind: FragmentKind,
        code: &str,
        indent: &str,
    ) -> String {
        let code = code.replace("\\`", "`");
        let current = tree.text_of(node);
        let util = SnippetUtil::new(indent, current, self.state.indent_util);
        let mut ctx = EvalContext {
            tree,
            node,
            kind,
            state: &mut *self.state,
            reads: &mut self.reads,
            util,
        };

        let result = self.evaluator.evaluate(kind, &code, &mut ctx);
        let rv = ctx.util.take_rv();

        match result {
            Ok(output) => {
                let text = rv.unwrap_or(output);
                if kind == FragmentKind::Shell {
                    trim_shell_output(text)
                } else {
                    text
                }
            }
            Err(error) => {
                let at = tree.abs_start(node);
                warn!("{kind} fragment at {at} failed: {error:#}");
                if self.failed.insert(node) {
                    self.failures.push(EvalFailure { kind, at, error });
                }
                String::new()
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn into_failures(self) -> Vec<EvalFailure> {
        self.failures
    }
}

/// Drops one trailing `\n`, then one trailing `\r`.
fn trim_shell_output(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
    }
    if text.ends_with('\r') {
        text.pop();
    }
    text
}
