//! Forward-Only Chain Stitching
//!
//! Reassembles individually emitted line segments into continuous
//! polylines. Segments arrive in temporal order. A segment extends an open
//! chain only when its `start` is exactly equal to that chain's current
//! tail; otherwise it opens a new chain.
//!
//! Matching is forward-only: a segment is never attached to a chain's head
//! and never reversed. Two unrelated tracks whose endpoints happen to touch
//! in reverse time order therefore stay separate chains instead of being
//! joined by a spurious diagonal.

use super::geometry::{Chain, Point2D, Segment};
use std::collections::{BTreeSet, HashMap};

/// Exact-equality key for a tail point.
///
/// `-0.0` and `0.0` share a key; NaN coordinates have none and never match.
type TailKey = (u64, u64);

fn tail_key(point: &Point2D) -> Option<TailKey> {
    if point.x.is_nan() || point.y.is_nan() {
        return None;
    }
    let norm = |v: f64| if v == 0.0 { 0.0f64 } else { v };
    Some((norm(point.x).to_bits(), norm(point.y).to_bits()))
}

/// Group segments into connected chains, forward direction only
pub fn build_chains(segments: &[Segment]) -> Vec<Chain> {
    let mut builder = ChainBuilder::with_capacity(segments.len());
    for segment in segments {
        builder.push(segment);
    }
    builder.finish()
}

/// Incremental chain builder
#[derive(Debug, Default)]
pub struct ChainBuilder {
    chains: Vec<Chain>,
    /// Open chain indices by tail point, earliest-opened first
    tails: HashMap<TailKey, BTreeSet<usize>>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(segments: usize) -> Self {
        Self {
            chains: Vec::with_capacity(segments),
            tails: HashMap::with_capacity(segments),
        }
    }

    /// Append one segment.
    ///
    /// If several open chains end at `segment.start`, the earliest-opened
    /// one is extended.
    pub fn push(&mut self, segment: &Segment) {
        let start_key = tail_key(&segment.start);

        let matched = start_key.and_then(|key| {
            let open = self.tails.get_mut(&key)?;
            let index = open.pop_first()?;
            if open.is_empty() {
                self.tails.remove(&key);
            }
            Some(index)
        });

        let index = match matched {
            Some(index) => {
                self.chains[index].push(segment.end);
                index
            }
            None => {
                self.chains.push(vec![segment.start, segment.end]);
                self.chains.len() - 1
            }
        };

        if let Some(end_key) = tail_key(&segment.end) {
            self.tails.entry(end_key).or_default().insert(index);
        }
    }

    /// Number of chains opened so far
    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    /// Chains in the order they were opened
    pub fn finish(self) -> Vec<Chain> {
        self.chains
    }
}
