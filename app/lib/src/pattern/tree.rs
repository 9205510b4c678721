//! Candidate scanning for hierarchical models.
//!
//! Every node below the root is visited once. Leaves and object keys count
//! as literals, objects contribute their ordered key set, and every array or
//! object below the root is a subtree candidate.

use crate::als::serializer::{keyset_text, leaf_token};
use crate::als::{escape::encode_string, PatternKind};
use crate::convert::Tree;

use super::candidate::Tally;
use super::scanner::StructureScanner;

/// Scanner over the children of a tree's root.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeScanner;

impl TreeScanner {
    /// Create a new tree scanner.
    pub fn new() -> Self {
        Self
    }

    /// Record the root's own keys and key set.
    ///
    /// The root itself is never a subtree candidate; its children are scanned
    /// through [`StructureScanner::scan`].
    pub fn scan_root(&self, root: &Tree, tally: &mut Tally) {
        if let Tree::Object(entries) = root {
            let keys: Vec<String> = entries.iter().map(|(key, _)| encode_string(key)).collect();
            record_keys(&keys, tally);
        }
    }

    /// Scan one node, returning its literal text and node count.
    fn scan_node(&self, node: &Tree, tally: &mut Tally) -> (String, usize) {
        match node {
            Tree::Array(items) => {
                let mut text = String::from("[");
                let mut nodes = 1;
                for item in items {
                    let (child, count) = self.scan_node(item, tally);
                    text.push(' ');
                    text.push_str(&child);
                    nodes += count;
                }
                text.push_str(" ]");
                tally.record(PatternKind::Subtree, &text, nodes, text.len());
                (text, nodes)
            }
            Tree::Object(entries) => {
                let mut text = String::from("{");
                let mut keys = Vec::with_capacity(entries.len());
                let mut nodes = 1;
                for (key, value) in entries {
                    let key = encode_string(key);
                    let (child, count) = self.scan_node(value, tally);
                    text.push(' ');
                    text.push_str(&key);
                    text.push(' ');
                    text.push_str(&child);
                    keys.push(key);
                    nodes += count;
                }
                text.push_str(" }");
                record_keys(&keys, tally);
                tally.record(PatternKind::Subtree, &text, nodes, text.len());
                (text, nodes)
            }
            leaf => {
                let token = leaf_token(leaf).unwrap_or_default();
                tally.record(PatternKind::Literal, &token, token.len(), token.len());
                (token, 1)
            }
        }
    }
}

/// Record key literals and, for non-empty objects, the ordered key set.
fn record_keys(keys: &[String], tally: &mut Tally) {
    for key in keys {
        tally.record(PatternKind::Literal, key, key.len(), key.len());
    }
    if keys.is_empty() {
        return;
    }
    let text = keyset_text(keys);
    // An inline object spells out `{ k1 v1 k2 v2 }`; a shape reference drops
    // every ` k` plus the closing ` }`.
    let span = text.len() + 1;
    tally.record(PatternKind::KeySet, &text, keys.len() + 1, span);
}

impl<'a> StructureScanner<&'a Tree> for TreeScanner {
    fn scan(&self, items: &[&'a Tree], tally: &mut Tally) {
        for item in items {
            self.scan_node(item, tally);
        }
    }
}
