/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Acquisition lifecycle and notification-driven completion tracking.
//!
//! An [`Acquisition`] hands validated events to an external
//! [`AcquisitionEngine`] through an unbounded event queue and consumes the
//! engine's notifications on a dedicated dispatcher thread. Callers track
//! progress with [`AcquisitionFuture`]s, which unblock once every axes set
//! they cover reaches the requested stage, or as soon as the acquisition is
//! aborted.
//!
//! # Architecture
//!
//! - Events are submitted in batches onto the event queue
//! - The engine reports progress on a bounded notification stream (capacity 100)
//! - A single dispatcher fans notifications out to futures, then listeners
//! - The dispatcher stops after both termination sentinels, in either order
//! - Futures live in a generation-stamped registry and leave it when dropped
//!
//! # Examples
//!
//! ```
//! use acquisition_rs::acquisition::{AcquisitionBuilder, LoopbackEngine, WaitOutcome};
//! use acquisition_rs::event::{AcquisitionEvent, Axes, NotificationKind};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let acq = AcquisitionBuilder::new(Arc::new(LoopbackEngine::new()))
//!     .on_notification(|n| println!("{}", n.kind))
//!     .start()
//!     .unwrap();
//!
//! let future = acq
//!     .acquire(AcquisitionEvent::new(Axes::new().with("time", 0)))
//!     .unwrap();
//! let outcome = future
//!     .wait(NotificationKind::EventFinished, Some(Duration::from_secs(5)))
//!     .unwrap();
//! assert_eq!(outcome, WaitOutcome::Reached);
//!
//! acq.finish().unwrap();
//! ```

pub mod coordinator;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod future;
pub mod hooks;
pub mod registry;

#[cfg(test)]
mod tests;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use coordinator::{Acquisition, AcquisitionBuilder, AcquisitionHandle, Phase, Submission};
pub use dispatcher::{
    DISPATCHER_THREAD_NAME, DispatchEnd, DispatchSummary, NotificationDispatcher,
    NotificationListener,
};
pub use engine::{AcquisitionEngine, EngineLink, EventMessage, EventQueueHandle, LoopbackEngine};
pub use error::{
    AbortCause, AbortReason, AcquisitionError, EngineError, HookError, ImageProcessorError,
};
pub use future::{AcquisitionFuture, WaitOutcome};
pub use hooks::{Image, ImageMetadata, ImageProcessor, ImageSavedCallback, TaggedImage};
pub use registry::{FutureId, FutureRegistry};

/// Locks `mutex`, recovering the guard if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
