//! Arrival generation for each tier.
//!
//! Each tier decides independently, once per round, how many new items
//! arrive. All draws go through the ensemble's [`RngManager`], so the same
//! seed and config always produce the same arrivals.
//!
//! # Distributions
//!
//! - **Bernoulli**: one gate per round; on success `batch_size` items arrive
//! - **Poisson**: item count drawn with mean `rate_per_round`
//! - **Fixed**: exactly `count` items every round, no randomness consumed
//!
//! # Example
//!
//! ```
//! use tiered_queue_sim_core::arrivals::{ArrivalConfig, ArrivalDistribution};
//! use tiered_queue_sim_core::rng::RngManager;
//!
//! let mut rng = RngManager::new(42);
//! let config = ArrivalConfig {
//!     distribution: ArrivalDistribution::Bernoulli { probability: 1.0, batch_size: 5 },
//!     direct_to_active: false,
//! };
//! assert_eq!(config.sample_count(&mut rng), 5);
//! ```

use crate::models::TierId;
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};

/// Largest accepted Poisson mean.
///
/// [`RngManager::poisson`] multiplies uniforms until the product drops below
/// `exp(-rate)`; past about 745 that bound underflows to zero and the draw is
/// no longer Poisson.
pub const MAX_POISSON_RATE: f64 = 500.0;

/// How many items arrive in a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArrivalDistribution {
    /// `batch_size` items with probability `probability`, otherwise none
    Bernoulli { probability: f64, batch_size: usize },

    /// Poisson-distributed count with mean `rate_per_round`
    Poisson { rate_per_round: f64 },

    /// Exactly `count` items
    Fixed { count: usize },
}

/// Arrival parameters for a single tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalConfig {
    pub distribution: ArrivalDistribution,

    /// Arrivals skip the backlog and go straight into the active set
    #[serde(default)]
    pub direct_to_active: bool,
}

impl ArrivalConfig {
    /// Bernoulli-gated single item, the common case for sparse tiers.
    pub fn bernoulli(probability: f64, direct_to_active: bool) -> Self {
        Self {
            distribution: ArrivalDistribution::Bernoulli {
                probability,
                batch_size: 1,
            },
            direct_to_active,
        }
    }

    /// Draw the number of arrivals for one round.
    pub fn sample_count(&self, rng: &mut RngManager) -> usize {
        match &self.distribution {
            ArrivalDistribution::Bernoulli {
                probability,
                batch_size,
            } => {
                if rng.bernoulli(*probability) {
                    *batch_size
                } else {
                    0
                }
            }
            ArrivalDistribution::Poisson { rate_per_round } => rng.poisson(*rate_per_round) as usize,
            ArrivalDistribution::Fixed { count } => *count,
        }
    }

    /// Describe why this config is unusable, if it is.
    pub fn validate(&self) -> Result<(), String> {
        match &self.distribution {
            ArrivalDistribution::Bernoulli { probability, .. } => {
                if !(0.0..=1.0).contains(probability) {
                    return Err(format!("probability {} outside [0, 1]", probability));
                }
            }
            ArrivalDistribution::Poisson { rate_per_round } => {
                if !rate_per_round.is_finite() || *rate_per_round < 0.0 {
                    return Err(format!("invalid Poisson rate {}", rate_per_round));
                }
                if *rate_per_round > MAX_POISSON_RATE {
                    return Err(format!(
                        "Poisson rate {} above the supported maximum {}",
                        rate_per_round, MAX_POISSON_RATE
                    ));
                }
            }
            ArrivalDistribution::Fixed { .. } => {}
        }
        Ok(())
    }
}

/// A round's arrivals for one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrivalBatch {
    pub tier: TierId,
    pub count: usize,
    pub direct_to_active: bool,
}

/// Per-tier arrival sampling, indexed by tier position.
#[derive(Debug, Clone, Default)]
pub struct ArrivalGenerator {
    configs: Vec<Option<ArrivalConfig>>,
}

impl ArrivalGenerator {
    /// `configs[i]` drives tier `i`; `None` means the tier only receives
    /// scripted arrivals.
    pub fn new(configs: Vec<Option<ArrivalConfig>>) -> Self {
        Self { configs }
    }

    pub fn config_for(&self, tier: TierId) -> Option<&ArrivalConfig> {
        self.configs.get(tier.0).and_then(|c| c.as_ref())
    }

    /// Sample one round of arrivals for `tier`.
    ///
    /// Returns `None` when the tier has no arrival config or the draw came up
    /// empty.
    pub fn sample_for_tier(&self, tier: TierId, rng: &mut RngManager) -> Option<ArrivalBatch> {
        let config = self.config_for(tier)?;
        let count = config.sample_count(rng);
        (count > 0).then_some(ArrivalBatch {
            tier,
            count,
            direct_to_active: config.direct_to_active,
        })
    }
}
