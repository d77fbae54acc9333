//! Placeholder expansion.
//!
//! # Grammar
//! - `${key}` is replaced by the value at dotted path `key`
//! - `${key:default}` falls back to the literal `default` when `key` is absent
//! - A missing key without default expands to the empty string
//!
//! # Design Decisions
//! - Expansion reads from an immutable context tree and writes a new tree
//! - Referenced strings are expanded before substitution. Each referent is
//!   expanded at most once per pass, so the cost is linear in the tree size
//! - A string that reaches a reference cycle expands to the empty string as
//!   a whole, with one warning
//! - Non-string referents are stringified; mappings and sequences use
//!   compact JSON with sorted keys

use std::collections::HashMap;

use serde_json::Value as Node;

use crate::reader::tree::{get_path, split_path, Tree};

/// Expand every placeholder in `tree`, using `tree` itself as the context.
pub fn resolve(tree: &Tree) -> Tree {
    resolve_against(tree, tree)
}

/// Expand every placeholder in `target`, looking keys up in `context`.
pub fn resolve_against(target: &Tree, context: &Tree) -> Tree {
    let mut resolver = Resolver::new(context);
    target
        .iter()
        .map(|(k, v)| (k.clone(), resolver.resolve_node(v)))
        .collect()
}

/// Marker for an expansion that ran into a reference cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cycle;

struct Resolver<'a> {
    context: &'a Tree,
    /// Stringified expansion per referenced key; `Err` when the key sits on
    /// or depends on a cycle.
    memo: HashMap<String, Result<String, Cycle>>,
    /// Keys currently being expanded.
    stack: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn new(context: &'a Tree) -> Self {
        Self {
            context,
            memo: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Resolve one node of the target tree. Cyclic strings become empty.
    fn resolve_node(&mut self, node: &Node) -> Node {
        match node {
            Node::String(s) => match self.expand(s) {
                Ok(expanded) => Node::String(expanded),
                Err(Cycle) => {
                    tracing::warn!(value = %s, "Placeholder reference cycle, expanding to empty");
                    Node::String(String::new())
                }
            },
            Node::Array(items) => Node::Array(items.iter().map(|item| self.resolve_node(item)).collect()),
            Node::Object(map) => Node::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve_node(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Like `resolve_node`, but a cycle anywhere fails the whole node.
    fn expand_node(&mut self, node: &Node) -> Result<Node, Cycle> {
        Ok(match node {
            Node::String(s) => Node::String(self.expand(s)?),
            Node::Array(items) => Node::Array(
                items
                    .iter()
                    .map(|item| self.expand_node(item))
                    .collect::<Result<_, _>>()?,
            ),
            Node::Object(map) => Node::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), self.expand_node(v)?)))
                    .collect::<Result<_, Cycle>>()?,
            ),
            other => other.clone(),
        })
    }

    /// Replace each `${...}` in `s`. Unterminated placeholders stay literal.
    fn expand(&mut self, s: &str) -> Result<String, Cycle> {
        let mut out = String::with_capacity(s.len());
        let mut rest = s;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return Ok(out);
            };
            out.push_str(&self.substitute(&after[..end])?);
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    fn substitute(&mut self, inner: &str) -> Result<String, Cycle> {
        let (key, default) = match inner.split_once(':') {
            Some((key, default)) => (key.trim(), Some(default)),
            None => (inner.trim(), None),
        };

        let context = self.context;
        match split_path(key).and_then(|segments| get_path(context, &segments)) {
            Some(node) => self.referent(key, node),
            None => Ok(default.unwrap_or_default().to_string()),
        }
    }

    fn referent(&mut self, key: &str, node: &Node) -> Result<String, Cycle> {
        if let Some(done) = self.memo.get(key) {
            return done.clone();
        }
        if self.stack.iter().any(|k| k == key) {
            return Err(Cycle);
        }

        self.stack.push(key.to_string());
        let expanded = self.expand_node(node).map(|n| stringify(&n));
        self.stack.pop();

        self.memo.insert(key.to_string(), expanded.clone());
        expanded
    }
}

/// Text form of a node used for substitution.
pub fn stringify(node: &Node) -> String {
    match node {
        Node::Null => String::new(),
        Node::String(s) => s.clone(),
        other => other.to_string(),
    }
}
