//! The cone sweep.
//!
//! The main entry point is [`LineSweeper`], which sweeps a collection of
//! obstacles in one direction. The other modules hold the pieces of its state,
//! and are public mostly so that they can be tested and fuzzed directly.

pub mod cone;
pub mod event;
mod line_sweeper;
pub mod obstacle_side;
pub mod status;

pub use line_sweeper::{LineSweeper, PortEdgeCreator, SweepMode, SweepStats};

/// How far back (along the sweep direction) we're willing to look for a cone
/// side that isn't where it should be in the sweep status.
///
/// Events that land this far behind the sweep line are also reported, in the
/// logs.
pub const ROLLBACK_LIMIT: f64 = 0.01;
