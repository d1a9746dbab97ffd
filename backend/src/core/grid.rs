//! Grid capacity calculator
//!
//! Maps a rectangular region onto a lattice of item slots. Two questions are
//! answered here and nowhere else:
//!
//! 1. How many slots fit in a region (`capacity`)?
//! 2. Where does slot `i` sit inside that region (`slot_position`)?
//!
//! Everything is a pure function of its inputs. Tiers call into this module
//! once at construction (capacity) and on every transition (positions).
//!
//! # Example
//!
//! ```
//! use tiered_queue_sim_core::core::grid::{capacity, FillOrder, Grid, RegionBounds};
//!
//! let dims = capacity(2.0, 0.7, 0.12, 0.1);
//! assert_eq!((dims.columns, dims.rows), (15, 4));
//!
//! let bounds = RegionBounds::from_center(0.0, 0.0, 2.0, 0.7);
//! let grid = Grid::new(dims, bounds, 0.12, FillOrder::LeftToRight);
//! let first = grid.slot_position(0).unwrap();
//! assert!(first.x > bounds.left);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slack applied before flooring slot counts.
///
/// `0.6 / 0.2` evaluates to `2.9999999999999996` in f64; without slack a
/// region sized for exactly N slots would report N − 1.
const FLOOR_EPSILON: f64 = 1e-9;

/// Errors raised by slot lookups
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("slot index {index} is outside a grid of capacity {capacity}")]
    IndexOutOfRange { index: usize, capacity: usize },
}

/// 2-D coordinate in scene units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Number of slot columns and rows that fit in a region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDimensions {
    pub columns: usize,
    pub rows: usize,
}

impl GridDimensions {
    /// Total slot count (`columns × rows`), saturating at `usize::MAX`.
    pub fn capacity(&self) -> usize {
        self.columns.saturating_mul(self.rows)
    }

    /// Total slot count, or `None` if it does not fit in a `usize`.
    pub fn checked_capacity(&self) -> Option<usize> {
        self.columns.checked_mul(self.rows)
    }

    /// A zero-capacity region is full before anything is placed in it.
    pub fn is_empty(&self) -> bool {
        self.capacity() == 0
    }
}

/// Axis-aligned bounds of a region (y grows upward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl RegionBounds {
    /// Bounds of a `width × height` box centred on `(cx, cy)`.
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            left: cx - width / 2.0,
            right: cx + width / 2.0,
            top: cy + height / 2.0,
            bottom: cy - height / 2.0,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn center_y(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }
}

/// Horizontal direction in which a row is filled
///
/// Rows always fill top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillOrder {
    /// Slot 0 hugs the left edge (active regions)
    LeftToRight,
    /// Slot 0 hugs the right edge (backlogs, so the head sits next to the active region)
    RightToLeft,
}

/// How many slots of size `spacing` fit into a `width × height` region with
/// `margin` reserved on every side.
///
/// Regions smaller than one spacing unit yield zero in that dimension. That is
/// a valid result: callers treat the region as already full. A spacing that is
/// not a positive finite number also yields zero capacity.
pub fn capacity(width: f64, height: f64, spacing: f64, margin: f64) -> GridDimensions {
    if !(spacing.is_finite() && spacing > 0.0) {
        return GridDimensions::default();
    }

    GridDimensions {
        columns: slots_along(width - 2.0 * margin, spacing),
        rows: slots_along(height - 2.0 * margin, spacing),
    }
}

fn slots_along(usable: f64, spacing: f64) -> usize {
    if !usable.is_finite() || usable <= 0.0 {
        return 0;
    }
    (usable / spacing + FLOOR_EPSILON).floor() as usize
}

/// Position of slot `index` in a region.
///
/// Row-major: `row = index / columns`, `col = index % columns`. The first row
/// sits one spacing unit below the top edge and the first column one spacing
/// unit in from the edge the fill order starts at.
///
/// Indices at or beyond `dims.capacity()` fail with
/// [`GridError::IndexOutOfRange`]; they never wrap.
pub fn slot_position(
    index: usize,
    dims: GridDimensions,
    bounds: RegionBounds,
    spacing: f64,
    fill_order: FillOrder,
) -> Result<Position, GridError> {
    let capacity = dims.capacity();
    if index >= capacity {
        return Err(GridError::IndexOutOfRange { index, capacity });
    }

    let row = index / dims.columns;
    let col = index % dims.columns;

    let y = bounds.top - spacing * (1 + row) as f64;
    let x = match fill_order {
        FillOrder::LeftToRight => bounds.left + spacing * (1 + col) as f64,
        FillOrder::RightToLeft => bounds.right - spacing * (1 + col) as f64,
    };

    Ok(Position::new(x, y))
}

/// A region with its lattice resolved, for repeated slot lookups
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    dims: GridDimensions,
    bounds: RegionBounds,
    spacing: f64,
    fill_order: FillOrder,
}

impl Grid {
    pub fn new(
        dims: GridDimensions,
        bounds: RegionBounds,
        spacing: f64,
        fill_order: FillOrder,
    ) -> Self {
        Self {
            dims,
            bounds,
            spacing,
            fill_order,
        }
    }

    /// Build a grid for `bounds`, deriving the dimensions with [`capacity`].
    pub fn fit(bounds: RegionBounds, spacing: f64, margin: f64, fill_order: FillOrder) -> Self {
        let dims = capacity(bounds.width(), bounds.height(), spacing, margin);
        Self::new(dims, bounds, spacing, fill_order)
    }

    pub fn dims(&self) -> GridDimensions {
        self.dims
    }

    pub fn bounds(&self) -> RegionBounds {
        self.bounds
    }

    pub fn capacity(&self) -> usize {
        self.dims.capacity()
    }

    pub fn slot_position(&self, index: usize) -> Result<Position, GridError> {
        slot_position(index, self.dims, self.bounds, self.spacing, self.fill_order)
    }

    /// Like [`Grid::slot_position`] but `None` past capacity.
    ///
    /// Backlogs are unbounded while their drawable area is not; items past
    /// the visual capacity simply have no position.
    pub fn try_slot_position(&self, index: usize) -> Option<Position> {
        self.slot_position(index).ok()
    }
}

/// Position of entry `index` in an unbounded single-row strip that starts one
/// spacing unit right of `origin_x`, at height `y`.
///
/// The confirmed log is laid out this way.
pub fn strip_position(index: usize, origin_x: f64, y: f64, spacing: f64) -> Position {
    Position::new(origin_x + spacing * (1 + index) as f64, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_active_region() {
        let dims = capacity(2.0, 0.7, 0.12, 0.1);
        assert_eq!(dims, GridDimensions { columns: 15, rows: 4 });
        assert_eq!(dims.capacity(), 60);
    }

    #[test]
    fn test_reference_backlog_region() {
        let dims = capacity(4.0, 0.7, 0.12, 0.1);
        assert_eq!(dims, GridDimensions { columns: 31, rows: 4 });
    }

    #[test]
    fn test_floor_tolerates_binary_rounding() {
        // 0.6 / 0.2 is just under 3.0 in f64
        let dims = capacity(0.6, 0.6, 0.2, 0.0);
        assert_eq!(dims, GridDimensions { columns: 3, rows: 3 });
    }

    #[test]
    fn test_region_smaller_than_spacing_is_empty() {
        let dims = capacity(0.1, 5.0, 0.5, 0.0);
        assert_eq!(dims.columns, 0);
        assert!(dims.is_empty());
    }

    #[test]
    fn test_margin_larger_than_region_is_empty() {
        let dims = capacity(1.0, 1.0, 0.1, 0.6);
        assert_eq!(dims, GridDimensions::default());
    }

    #[test]
    fn test_bad_spacing_is_empty() {
        assert!(capacity(1.0, 1.0, 0.0, 0.0).is_empty());
        assert!(capacity(1.0, 1.0, -0.5, 0.0).is_empty());
        assert!(capacity(1.0, 1.0, f64::NAN, 0.0).is_empty());
    }

    #[test]
    fn test_huge_region_saturates_instead_of_overflowing() {
        let dims = capacity(1e12, 1e12, 1e-6, 0.0);
        assert!(dims.columns > 0 && dims.rows > 0);
        assert_eq!(dims.checked_capacity(), None);
        assert_eq!(dims.capacity(), usize::MAX);
        assert!(!dims.is_empty());
    }

    #[test]
    fn test_right_to_left_fill() {
        let bounds = RegionBounds {
            left: 0.0,
            right: 1.0,
            top: 1.0,
            bottom: 0.0,
        };
        let dims = GridDimensions { columns: 3, rows: 2 };

        let first = slot_position(0, dims, bounds, 0.25, FillOrder::RightToLeft).unwrap();
        assert_eq!(first, Position::new(0.75, 0.75));

        let wrap = slot_position(3, dims, bounds, 0.25, FillOrder::RightToLeft).unwrap();
        assert_eq!(wrap, Position::new(0.75, 0.5));
    }

    #[test]
    fn test_out_of_range_fails_fast() {
        let bounds = RegionBounds::from_center(0.0, 0.0, 1.0, 1.0);
        let dims = GridDimensions { columns: 2, rows: 2 };
        let err = slot_position(4, dims, bounds, 0.3, FillOrder::LeftToRight).unwrap_err();
        assert_eq!(err, GridError::IndexOutOfRange { index: 4, capacity: 4 });
    }

    #[test]
    fn test_zero_capacity_rejects_index_zero() {
        let grid = Grid::fit(RegionBounds::from_center(0.0, 0.0, 0.1, 0.1), 0.5, 0.0, FillOrder::LeftToRight);
        assert!(grid.try_slot_position(0).is_none());
    }

    #[test]
    fn test_strip_position() {
        let p = strip_position(2, 1.0, -0.5, 0.1);
        assert!((p.x - 1.3).abs() < 1e-12);
        assert_eq!(p.y, -0.5);
    }
}
