/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Event sequencer for multi-dimensional acquisitions.
//!
//! This module expands a compact [`MultiDSpec`] (time points, z-stack,
//! channels, stage positions and their nesting order) into the concrete,
//! ordered list of [`AcquisitionEvent`](crate::event::AcquisitionEvent)s an
//! engine executes. Generation is pure: it holds no state, is safe to call
//! concurrently, and validates every parameter before emitting anything.
//!
//! # Traversal
//!
//! - The order string is read left to right as nested loops
//! - Axes without parameters are skipped
//! - Time emits `axes["time"]` and, when timed, `min_start_time`
//! - Z emits `axes["z"]` and the absolute `z`, per position for `xyz_positions`
//! - Positions emit `axes["position"]`, `x` and `y`
//! - Channels emit `axes["channel"]`, `config_group` and optionally `exposure`
//!
//! # Examples
//!
//! ```
//! use acquisition_rs::sequencer::MultiDSpec;
//!
//! let events = MultiDSpec::new()
//!     .xyz_positions(vec![[0.0, 0.0, 10.0], [0.0, 0.0, 20.0]])
//!     .z_stack(-1.0, 1.0, 1.0)
//!     .order("pz")
//!     .generate()
//!     .unwrap();
//!
//! let zs: Vec<f64> = events.iter().filter_map(|e| e.z).collect();
//! assert_eq!(zs, vec![9.0, 10.0, 11.0, 19.0, 20.0, 21.0]);
//! ```

pub mod generate;
pub mod order;
pub mod spec;

#[cfg(test)]
mod tests;

pub use generate::{SequenceError, generate, multi_d_acquisition_events};
pub use order::{AxisKind, AxisOrder};
pub use spec::{DEFAULT_ORDER, MultiDSpec, TimeInterval};
