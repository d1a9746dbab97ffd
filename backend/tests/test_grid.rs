//! Grid Geometry Tests
//!
//! Capacity fitting and slot placement for the rectangular regions each tier
//! draws its backlog and active set in.

use tiered_queue_sim_core::core::grid::{
    capacity, slot_position, strip_position, FillOrder, Grid, GridDimensions, GridError,
    RegionBounds,
};
use tiered_queue_sim_core::models::TierLayout;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

// ============================================================================
// Capacity
// ============================================================================

#[test]
fn test_default_active_region_holds_sixty() {
    let dims = capacity(2.0, 0.7, 0.12, 0.1);
    assert_eq!(dims, GridDimensions { columns: 15, rows: 4 });
    assert_eq!(dims.capacity(), 60);
}

#[test]
fn test_default_backlog_region() {
    let dims = capacity(4.0, 0.7, 0.12, 0.1);
    assert_eq!(dims, GridDimensions { columns: 31, rows: 4 });
    assert_eq!(dims.capacity(), 124);
}

#[test]
fn test_exact_multiple_is_not_lost_to_rounding() {
    // 0.36 / 0.12 is just under 3 in binary floating point
    let dims = capacity(0.36, 0.12, 0.12, 0.0);
    assert_eq!(dims.columns, 3);
    assert_eq!(dims.rows, 1);
}

#[test]
fn test_region_smaller_than_spacing_is_empty() {
    let dims = capacity(0.1, 5.0, 0.12, 0.0);
    assert_eq!(dims.columns, 0);
    assert!(dims.is_empty());
    assert_eq!(dims.capacity(), 0);

    // Margins eat the whole region
    assert!(capacity(0.15, 0.15, 0.12, 0.1).is_empty());
}

#[test]
fn test_invalid_spacing_gives_zero_capacity() {
    assert!(capacity(2.0, 0.7, 0.0, 0.1).is_empty());
    assert!(capacity(2.0, 0.7, -0.12, 0.1).is_empty());
    assert!(capacity(2.0, 0.7, f64::NAN, 0.1).is_empty());
}

// ============================================================================
// Slot positions
// ============================================================================

#[test]
fn test_left_to_right_positions() {
    let bounds = RegionBounds::from_center(3.0, 1.5, 2.0, 0.7);
    let dims = GridDimensions { columns: 15, rows: 4 };

    let first = slot_position(0, dims, bounds, 0.12, FillOrder::LeftToRight).unwrap();
    assert_close(first.x, 2.12);
    assert_close(first.y, 1.73);

    let second_row = slot_position(15, dims, bounds, 0.12, FillOrder::LeftToRight).unwrap();
    assert_close(second_row.x, 2.12);
    assert_close(second_row.y, 1.61);

    let last = slot_position(59, dims, bounds, 0.12, FillOrder::LeftToRight).unwrap();
    assert_close(last.x, 2.0 + 0.12 * 15.0);
    assert_close(last.y, 1.85 - 0.12 * 4.0);
}

#[test]
fn test_right_to_left_positions() {
    let bounds = RegionBounds::from_center(0.0, 0.0, 4.0, 0.7);
    let dims = GridDimensions { columns: 31, rows: 4 };

    let first = slot_position(0, dims, bounds, 0.12, FillOrder::RightToLeft).unwrap();
    assert_close(first.x, 1.88);
    assert_close(first.y, 0.23);

    let next = slot_position(1, dims, bounds, 0.12, FillOrder::RightToLeft).unwrap();
    assert!(next.x < first.x);
}

#[test]
fn test_index_past_capacity_fails() {
    let grid = Grid::fit(
        RegionBounds::from_center(0.0, 0.0, 2.0, 0.7),
        0.12,
        0.1,
        FillOrder::LeftToRight,
    );
    assert_eq!(grid.capacity(), 60);
    assert!(grid.slot_position(59).is_ok());
    assert_eq!(
        grid.slot_position(60),
        Err(GridError::IndexOutOfRange {
            index: 60,
            capacity: 60
        })
    );
    assert_eq!(grid.try_slot_position(60), None);
}

#[test]
fn test_empty_grid_has_no_slots() {
    let grid = Grid::fit(
        RegionBounds::from_center(0.0, 0.0, 0.1, 0.1),
        0.12,
        0.0,
        FillOrder::LeftToRight,
    );
    assert!(matches!(
        grid.slot_position(0),
        Err(GridError::IndexOutOfRange { capacity: 0, .. })
    ));
}

#[test]
fn test_confirmed_strip_grows_right() {
    let a = strip_position(0, 4.0, 1.5, 0.12);
    let b = strip_position(1, 4.0, 1.5, 0.12);
    assert_close(a.y, 1.5);
    assert_close(b.y, 1.5);
    assert!(b.x > a.x);
    assert!(a.x > 4.0);
}

// ============================================================================
// Tier layout
// ============================================================================

#[test]
fn test_layout_regions_are_adjacent() {
    let layout = TierLayout::centered_at(0.0, -1.5);
    let backlog = layout.backlog_bounds();
    let active = layout.active_bounds();

    assert_close(backlog.right, active.left);
    assert_close(backlog.top, active.top);
    assert_close(backlog.bottom, active.bottom);
    assert_close(active.center_y(), -1.5);

    assert_eq!(layout.active_grid().capacity(), 60);
    assert_eq!(layout.backlog_grid().capacity(), 124);
}

#[test]
fn test_backlog_head_sits_next_to_active_region() {
    let layout = TierLayout::default();
    let head = layout.backlog_grid().slot_position(0).unwrap();
    let tail = layout.backlog_grid().slot_position(30).unwrap();
    let active_left = layout.active_bounds().left;

    assert!(head.x < active_left);
    assert!(active_left - head.x < active_left - tail.x);
}
