//! Pure building blocks: round counting and grid geometry

pub mod grid;
pub mod round;
