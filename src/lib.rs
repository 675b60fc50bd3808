/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! # acquisition-rs
//!
//! Multi-dimensional acquisition event sequencing and asynchronous
//! notification coordination for microscopy acquisition engines.
//!
//! The crate has two halves:
//!
//! - [`sequencer`] expands a compact [`MultiDSpec`] (time points, z-stack,
//!   channels, xy/xyz positions and their nesting order) into an ordered
//!   list of [`AcquisitionEvent`]s.
//! - [`acquisition`] submits those events to an [`AcquisitionEngine`],
//!   dispatches the engine's notifications on a dedicated thread and lets
//!   callers block on [`AcquisitionFuture`]s until their images reach a
//!   given stage.
//!
//! [`event`] holds the shared data model and the validator, and [`config`]
//! the per-run settings.
//!
//! ## Example
//!
//! ```
//! use acquisition_rs::prelude::*;
//! use std::sync::Arc;
//!
//! let events = MultiDSpec::new()
//!     .time_points(2)
//!     .z_stack(0.0, 2.0, 1.0)
//!     .channels("Channel", ["DAPI", "FITC"])
//!     .order("tcz")
//!     .generate()
//!     .unwrap();
//! assert_eq!(events.len(), 12);
//!
//! let engine = Arc::new(LoopbackEngine::new());
//! let acq = AcquisitionBuilder::new(engine.clone())
//!     .config(AcquisitionConfig::named("example"))
//!     .start()
//!     .unwrap();
//! let future = acq.acquire(events).unwrap();
//! future.await_image_saved(None).unwrap();
//! acq.finish().unwrap();
//! assert_eq!(engine.executed(), 12);
//! ```
//!
//! ## Logging
//!
//! Diagnostics go through [`tracing`]. Lifecycle transitions log at `info`,
//! rejected submissions and aborts at `warn`, isolated listener panics at
//! `error`, and per-batch detail at `debug`. Install any subscriber to see
//! them.

pub mod acquisition;
pub mod config;
pub mod event;
pub mod sequencer;

pub use acquisition::{
    Acquisition, AcquisitionBuilder, AcquisitionEngine, AcquisitionError, AcquisitionFuture,
    AcquisitionHandle, LoopbackEngine, Phase, WaitOutcome,
};
pub use config::{AcquisitionConfig, ConfigError};
pub use event::{AcqNotification, AcquisitionEvent, Axes, AxisValue, EventBatch, NotificationKind};
pub use sequencer::{MultiDSpec, SequenceError, multi_d_acquisition_events};

/// Common imports.
pub mod prelude {
    pub use crate::acquisition::{
        Acquisition, AcquisitionBuilder, AcquisitionEngine, AcquisitionError, AcquisitionFuture,
        AcquisitionHandle, EngineLink, EventQueueHandle, LoopbackEngine, Phase, WaitOutcome,
    };
    pub use crate::config::AcquisitionConfig;
    pub use crate::event::{
        AcqNotification, AcquisitionEvent, Axes, AxisValue, EventBatch, NotificationKind,
        validate,
    };
    pub use crate::sequencer::{MultiDSpec, SequenceError};
}
