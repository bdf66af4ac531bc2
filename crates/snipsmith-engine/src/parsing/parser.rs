//! Template parser.
//!
//! Parsing runs in three phases so that a broken template is rejected before
//! any node exists or any fragment runs:
//!
//! 1. [`scan`] tokenizes every scope, recursing into tabstop defaults, and
//!    compiles transformation patterns.
//! 2. [`check_references`] makes sure every transformation refers to a
//!    tabstop that will exist.
//! 3. [`build`] creates the nodes, then binds mirrors and transformations
//!    once every tabstop of the template is known.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::token::{Token, TokenKind};
use super::tokenizer::tokenize;
use crate::error::ParseError;
use crate::eval::{EvalEnv, FragmentKind};
use crate::geometry::Span;
use crate::objects::{NodeId, NodeKind, Tree};
use crate::transform::Transform;

/// A token with everything derived from it during scanning.
#[derive(Debug, Clone)]
pub struct Scanned {
    pub token: Token,
    /// Items of a tabstop's default text.
    pub nested: Vec<Scanned>,
    /// Compiled rule of a transformation.
    pub rule: Option<Transform>,
}

/// Tokenizes `text` and every tabstop default inside it.
pub fn scan(text: &str, indent: &str) -> Result<Vec<Scanned>, ParseError> {
    tokenize(text, indent)?
        .into_iter()
        .map(|token| -> Result<Scanned, ParseError> {
            let (nested, rule) = match &token.kind {
                TokenKind::TabStop { default, .. } => (scan(default, indent)?, None),
                TokenKind::Transformation {
                    number,
                    search,
                    replace,
                    options,
                } => (
                    Vec::new(),
                    Some(Transform::compile(*number, search, replace, options)?),
                ),
                _ => (Vec::new(), None),
            };
            Ok(Scanned {
                token,
                nested,
                rule,
            })
        })
        .collect()
}

/// Fails with [`ParseError::UnresolvedReference`] when a transformation
/// targets a number no tabstop or mirror in the template defines.
///
/// Walks the items the way [`build`] will: a repeated tabstop number is a
/// mirror and its default text is never looked at.
pub fn check_references(items: &[Scanned]) -> Result<(), ParseError> {
    #[derive(Default)]
    struct Refs {
        tabstops: HashSet<usize>,
        mirrors: HashSet<usize>,
        transformations: Vec<usize>,
    }

    fn walk(items: &[Scanned], refs: &mut Refs) {
        for item in items {
            match item.token.kind {
                TokenKind::TabStop { number, .. } => {
                    if refs.tabstops.insert(number) {
                        walk(&item.nested, refs);
                    }
                }
                TokenKind::Mirror { number } => {
                    refs.mirrors.insert(number);
                }
                TokenKind::Transformation { number, .. } => refs.transformations.push(number),
                _ => {}
            }
        }
    }

    let mut refs = Refs::default();
    walk(items, &mut refs);
    match refs
        .transformations
        .into_iter()
        .find(|n| !refs.tabstops.contains(n) && !refs.mirrors.contains(n))
    {
        Some(number) => Err(ParseError::UnresolvedReference { number }),
        None => Ok(()),
    }
}

/// Creates the nodes for `items` under `scope`, evaluates shell and script
/// fragments, and binds mirrors and transformations.
///
/// Every tabstop number is resolved against the tabstops of this call only,
/// so a nested expansion gets a fresh namespace.
pub fn build(tree: &mut Tree, scope: NodeId, items: Vec<Scanned>, env: &mut EvalEnv<'_>) {
    let mut builder = Builder {
        tree,
        env,
        seen: HashMap::new(),
        mirrors: Vec::new(),
        transformations: Vec::new(),
    };
    builder.scope(scope, items);
    builder.bind_mirrors();
    builder.bind_transformations();
}

struct PendingMirror {
    scope: NodeId,
    span: Span,
    number: usize,
}

struct Builder<'t, 'e> {
    tree: &'t mut Tree,
    env: &'t mut EvalEnv<'e>,
    /// Canonical tabstop per number, first occurrence wins.
    seen: HashMap<usize, NodeId>,
    mirrors: Vec<PendingMirror>,
    transformations: Vec<(NodeId, usize)>,
}

impl Builder<'_, '_> {
    fn scope(&mut self, parent: NodeId, items: Vec<Scanned>) {
        debug!("building {} item(s) under {parent}", items.len());
        for Scanned {
            token,
            nested,
            rule,
        } in items
        {
            let span = token.span;
            match token.kind {
                TokenKind::Escape(c) => {
                    let mut buf = [0u8; 4];
                    self.tree
                        .add_node(parent, NodeKind::Literal, span, c.encode_utf8(&mut buf));
                }
                TokenKind::TabStop { number, default } => {
                    if let Some(&target) = self.seen.get(&number) {
                        debug!("repeated ${number} at {} becomes a mirror", span.start);
                        let kind = NodeKind::Mirror {
                            target: Some(target),
                        };
                        self.tree.add_node(parent, kind, span, "");
                        continue;
                    }
                    let ts = self
                        .tree
                        .add_node(parent, NodeKind::TabStop { number }, span, &default);
                    self.tree.register_tabstop(parent, number, ts);
                    self.seen.insert(number, ts);
                    self.scope(ts, nested);
                }
                TokenKind::Transformation { number, .. } => {
                    let Some(rule) = rule else {
                        continue;
                    };
                    let kind = NodeKind::Transformation { target: None, rule };
                    let id = self.tree.add_node(parent, kind, span, "");
                    self.transformations.push((id, number));
                }
                TokenKind::Mirror { number } => self.mirrors.push(PendingMirror {
                    scope: parent,
                    span,
                    number,
                }),
                TokenKind::Shell { code } => {
                    self.fragment(parent, span, NodeKind::ShellFragment, FragmentKind::Shell, &code)
                }
                TokenKind::Script { code } => self.fragment(
                    parent,
                    span,
                    NodeKind::ScriptFragment,
                    FragmentKind::Script,
                    &code,
                ),
                TokenKind::Program { code, indent } => {
                    let kind = NodeKind::ProgramFragment { code, indent };
                    self.tree.add_node(parent, kind, span, "");
                }
            }
        }
    }

    /// Adds a run-once fragment and evaluates it right away.
    fn fragment(
        &mut self,
        parent: NodeId,
        span: Span,
        node_kind: NodeKind,
        kind: FragmentKind,
        code: &str,
    ) {
        let id = self.tree.add_node(parent, node_kind, span, "");
        let text = self.env.run(self.tree, id, kind, code, "");
        self.tree.replace_content(id, &text);
    }

    /// Bare `$N`: a mirror of the known tabstop, or the tabstop itself when
    /// the number has no definition yet.
    fn bind_mirrors(&mut self) {
        for PendingMirror {
            scope,
            span,
            number,
        } in std::mem::take(&mut self.mirrors)
        {
            match self.seen.get(&number) {
                Some(&target) => {
                    let kind = NodeKind::Mirror {
                        target: Some(target),
                    };
                    self.tree.add_node(scope, kind, span, "");
                }
                None => {
                    debug!("${number} at {} has no definition, adding a tabstop", span.start);
                    let ts = self.tree.add_node(scope, NodeKind::TabStop { number }, span, "");
                    self.tree.register_tabstop(scope, number, ts);
                    self.seen.insert(number, ts);
                }
            }
        }
    }

    fn bind_transformations(&mut self) {
        for (id, number) in std::mem::take(&mut self.transformations) {
            let resolved = self.seen.get(&number).copied();
            if let Some(NodeKind::Transformation { target, .. }) =
                self.tree.get_mut(id).map(|n| &mut n.kind)
            {
                *target = resolved;
            }
        }
    }
}
