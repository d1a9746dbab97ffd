//! Tier geometry
//!
//! A tier occupies a horizontal band: the backlog region on the left, the
//! active region butted against its right edge, and the confirmed strip
//! trailing off to the right at the band's vertical centre.
//!
//! ```text
//!   arrival ·   [ backlog  ←←← ][ active →→→ ]  · · · confirmed
//! ```
//!
//! Layouts are immutable values; they are read once to derive capacities and
//! on every transition to resolve positions.

use crate::core::grid::{FillOrder, Grid, Position, RegionBounds};
use serde::{Deserialize, Serialize};

/// Immutable geometry of one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierLayout {
    /// Horizontal centre of the backlog region
    pub center_x: f64,
    /// Vertical centre of the band
    pub center_y: f64,
    pub height: f64,
    pub backlog_width: f64,
    pub active_width: f64,
    /// Distance between adjacent item slots
    pub spacing: f64,
    /// Clearance kept on every side of a region when counting slots
    pub margin: f64,
}

impl Default for TierLayout {
    fn default() -> Self {
        Self {
            center_x: -3.0,
            center_y: 0.0,
            height: 0.7,
            backlog_width: 4.0,
            active_width: 2.0,
            spacing: 0.12,
            margin: 0.1,
        }
    }
}

impl TierLayout {
    /// Default geometry centred at `(center_x, center_y)`.
    pub fn centered_at(center_x: f64, center_y: f64) -> Self {
        Self {
            center_x,
            center_y,
            ..Self::default()
        }
    }

    pub fn backlog_bounds(&self) -> RegionBounds {
        RegionBounds::from_center(self.center_x, self.center_y, self.backlog_width, self.height)
    }

    pub fn active_bounds(&self) -> RegionBounds {
        let left = self.backlog_bounds().right;
        RegionBounds {
            left,
            right: left + self.active_width,
            top: self.center_y + self.height / 2.0,
            bottom: self.center_y - self.height / 2.0,
        }
    }

    /// Backlog lattice; slot 0 sits next to the active region.
    pub fn backlog_grid(&self) -> Grid {
        Grid::fit(self.backlog_bounds(), self.spacing, self.margin, FillOrder::RightToLeft)
    }

    pub fn active_grid(&self) -> Grid {
        Grid::fit(self.active_bounds(), self.spacing, self.margin, FillOrder::LeftToRight)
    }

    /// Position of entry `index` in the confirmed log.
    pub fn confirmed_position(&self, index: usize) -> Position {
        crate::core::grid::strip_position(
            index,
            self.active_bounds().right,
            self.center_y,
            self.spacing,
        )
    }
}
