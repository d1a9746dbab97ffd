//! Domain models for the tiered queue simulator

pub mod active_set;
pub mod event;
pub mod item;
pub mod layout;
pub mod tier;
pub mod transition;

// Re-exports
pub use active_set::ActiveSet;
pub use event::{Event, EventLog};
pub use item::{ItemId, TierId};
pub use layout::TierLayout;
pub use tier::{BacklogEntry, OverflowPolicy, Tier, TierDescriptor, TierError, TierStats};
pub use transition::{Container, Transition, TransitionKind};
