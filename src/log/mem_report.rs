//! Hierarchical memory reports emitted by the benchmarks as inline JSON.
//!
//! Example payload:
//! {"name":"lerloc","total_bytes":4096,"children":[{"name":"hzft","total_bytes":1024}]}
//!
//! Flattening maps the tree onto a fixed set of canonical components. Some
//! components are black boxes: once one is reached its subtree is not
//! visited, so nested sizes are never counted twice.

use super::ParseError;
use serde::Deserialize;
use std::collections::BTreeMap;

pub const OTHER: &str = "Other";
pub const HZ_FAST_TRIE: &str = "HZFastTrie";
pub const LEAF_BIT_VECTOR: &str = "Leaf_BitVector";
pub const MMPH_TRIE: &str = "MMPH_Trie";
pub const MMPH_BUCKETS: &str = "MMPH_Buckets";

/// Canonical components in stacking order (bottom to top).
pub const COMPONENTS: [&str; 5] = [OTHER, HZ_FAST_TRIE, LEAF_BIT_VECTOR, MMPH_TRIE, MMPH_BUCKETS];

/// One node of a memory report. Parents own their children.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MemNode {
    pub name: String,
    pub total_bytes: u64,
    #[serde(default)]
    pub children: Vec<MemNode>,
}

/// What flattening does when it meets a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    /// Count the node into a bucket and stop descending.
    Terminal(&'static str),
    /// Count the node into a bucket and keep descending.
    Descend(&'static str),
    /// Not a canonical component; only its children matter.
    Transparent,
}

fn classify(name: &str) -> Visit {
    match name {
        "hzft" => Visit::Terminal(HZ_FAST_TRIE),
        "rsdic_bv" => Visit::Terminal(LEAF_BIT_VECTOR),
        "ApproxZFastTrie" => Visit::Terminal(MMPH_TRIE),
        "buckets" => Visit::Terminal(MMPH_BUCKETS),
        "header" | "Top_Level_Header" => Visit::Descend(OTHER),
        _ => Visit::Transparent,
    }
}

impl MemNode {
    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }

    /// Flatten into canonical component byte totals.
    ///
    /// Every component in [`COMPONENTS`] is present in the result, and the
    /// values always sum to the root's `total_bytes`: bytes not claimed by any
    /// component land in `Other`. A tree whose claimed bytes exceed the root
    /// total cannot satisfy that and is rejected.
    pub fn flatten(&self) -> Result<BTreeMap<String, u64>, ParseError> {
        let mut out: BTreeMap<String, u64> =
            COMPONENTS.iter().map(|c| (c.to_string(), 0)).collect();

        // Running total of claimed bytes; no bucket can exceed it, so only
        // this sum needs an overflow check.
        let mut attributed: u64 = 0;
        let mut stack: Vec<&MemNode> = vec![self];
        while let Some(node) = stack.pop() {
            let (bucket, descend) = match classify(&node.name) {
                Visit::Terminal(bucket) => (Some(bucket), false),
                Visit::Descend(bucket) => (Some(bucket), true),
                Visit::Transparent => (None, true),
            };
            if let Some(bucket) = bucket {
                attributed = attributed
                    .checked_add(node.total_bytes)
                    .ok_or_else(|| ParseError::SizeOverflow { node: node.name.clone() })?;
                *out.entry(bucket.to_string()).or_default() += node.total_bytes;
            }
            if descend {
                // Reverse so children are visited in declaration order.
                stack.extend(node.children.iter().rev());
            }
        }

        if attributed > self.total_bytes {
            return Err(ParseError::OverAttributed {
                attributed,
                total: self.total_bytes,
            });
        }
        *out.entry(OTHER.to_string()).or_default() += self.total_bytes - attributed;
        Ok(out)
    }
}
