//! Live position tracking against a registered site.
//!
//! `distance` holds the great-circle math and the derived [`GeofenceState`]. `position` and
//! `render` define the two platform seams (the position push source and the map surface), each
//! with an in-process implementation for tests and demos. `monitor` owns the watch lifecycle
//! and the inside/outside state machine.

pub mod distance;
pub mod monitor;
pub mod position;
pub mod render;

pub use distance::*;
pub use monitor::*;
pub use position::*;
pub use render::*;
