//! Item and tier identities
//!
//! Items carry no payload: identity plus the tier they were created in is all
//! a renderer or test needs to follow them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a tier within its ensemble (0 = highest priority)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TierId(pub usize);

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier_{}", self.0)
    }
}

/// Opaque item token
///
/// Sequence numbers are allocated by the owning tier, so two tiers never
/// need to coordinate to keep identities unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId {
    pub tier: TierId,
    pub seq: u64,
}

impl ItemId {
    pub fn new(tier: TierId, seq: u64) -> Self {
        Self { tier, seq }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}_{:08}", self.tier.0, self.seq)
    }
}
