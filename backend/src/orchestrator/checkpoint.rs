//! Checkpoint - Save/Load Ensemble State
//!
//! Captures every tier's containers, the RNG state and the round counter so a
//! run can be paused and resumed transition-for-transition.
//!
//! # Critical Invariants
//!
//! - **Determinism**: a restored ensemble makes the same random picks as the
//!   uninterrupted run would have
//! - **Conservation**: restoring re-checks that no item is lost or duplicated
//! - **Config Matching**: a snapshot only loads against the config it was
//!   taken with (SHA-256 of the canonical JSON)

use crate::models::{BacklogEntry, ItemId, Tier, TierId};
use crate::orchestrator::engine::{EnsembleConfig, SimulationError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Complete ensemble state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSnapshot {
    /// Run the snapshot was taken from
    pub run_id: Uuid,

    /// Round that was about to start
    pub current_round: usize,

    /// RNG state at time of snapshot (CRITICAL for determinism)
    pub rng_state: u64,

    pub tiers: Vec<TierSnapshot>,

    /// SHA256 hash of the config (for validation)
    pub config_hash: String,
}

/// One tier's containers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSnapshot {
    pub id: TierId,
    /// Head first
    pub backlog: Vec<BacklogEntry>,
    /// `(slot, item)` in draw order
    pub active: Vec<(usize, ItemId)>,
    pub confirmed: Vec<ItemId>,
    pub next_seq: u64,
}

impl From<&Tier> for TierSnapshot {
    fn from(tier: &Tier) -> Self {
        TierSnapshot {
            id: tier.id(),
            backlog: tier.backlog().copied().collect(),
            active: tier.active().occupants_in_draw_order(),
            confirmed: tier.confirmed().to_vec(),
            next_seq: tier.total_enqueued(),
        }
    }
}

impl EnsembleSnapshot {
    pub fn to_json(&self) -> Result<String, SimulationError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            SimulationError::SerializationError(format!("Snapshot serialization failed: {}", e))
        })
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json).map_err(|e| {
            SimulationError::SerializationError(format!("Snapshot deserialization failed: {}", e))
        })
    }

    /// Total items across all tiers and containers
    pub fn item_count(&self) -> usize {
        self.tiers
            .iter()
            .map(|t| t.backlog.len() + t.active.len() + t.confirmed.len())
            .sum()
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of config
///
/// Object keys are sorted recursively before hashing so the digest does not
/// depend on map iteration order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Validation
// ============================================================================

/// Check that `snapshot` can be restored against `config`.
///
/// Per-tier container invariants are checked separately when the tiers are
/// rebuilt.
pub fn validate_snapshot(
    snapshot: &EnsembleSnapshot,
    config: &EnsembleConfig,
) -> Result<(), SimulationError> {
    let expected = compute_config_hash(config)?;
    if snapshot.config_hash != expected {
        return Err(SimulationError::SnapshotMismatch(
            "config hash does not match snapshot".to_string(),
        ));
    }

    if snapshot.tiers.len() != config.tiers.len() {
        return Err(SimulationError::SnapshotMismatch(format!(
            "snapshot has {} tiers, config has {}",
            snapshot.tiers.len(),
            config.tiers.len()
        )));
    }

    for (index, tier) in snapshot.tiers.iter().enumerate() {
        if tier.id != TierId(index) {
            return Err(SimulationError::SnapshotMismatch(format!(
                "tier at position {} is labelled {}",
                index, tier.id
            )));
        }
    }

    Ok(())
}
