//! Sample File Replay
//!
//! Feeds a recorded JSON array of [`LocationSample`]s through a gate, the
//! way a file-replay location source would during development.

use crate::capture::dedup_gate::{Decision, DeduplicationGate, GateStats};
use crate::capture::types::LocationSample;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::Ordering;
use tracing::warn;

/// Outcome of one replayed sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub index: usize,
    pub sample: LocationSample,
    /// `None` when the sample was refused as invalid
    pub decision: Option<Decision>,
}

/// Summary of a replay run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub entries: Vec<ReplayEntry>,
    pub stats: GateStats,
    pub admitted: u64,
    pub rejected: u64,
    pub fallbacks: u64,
    pub invalid: u64,
}

/// Read a JSON array of samples
pub fn load_samples(path: &Path) -> crate::Result<Vec<LocationSample>> {
    let content = std::fs::read_to_string(path)?;
    let samples = serde_json::from_str(&content)?;
    Ok(samples)
}

/// Ingest `samples` in order and collect every decision
pub fn replay(gate: &DeduplicationGate, samples: &[LocationSample]) -> ReplayReport {
    let entries = samples
        .iter()
        .enumerate()
        .map(|(index, sample)| {
            let decision = match gate.ingest(*sample) {
                Ok(decision) => Some(decision),
                Err(e) => {
                    warn!("Sample {} skipped: {}", index, e);
                    None
                }
            };
            ReplayEntry {
                index,
                sample: *sample,
                decision,
            }
        })
        .collect();

    let counters = gate.counters();
    ReplayReport {
        entries,
        stats: gate.stats(),
        admitted: counters.admitted.load(Ordering::Relaxed),
        rejected: counters.rejected.load(Ordering::Relaxed),
        fallbacks: counters.fallbacks.load(Ordering::Relaxed),
        invalid: counters.invalid.load(Ordering::Relaxed),
    }
}
