/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Acquisition futures.
//!
//! An [`AcquisitionFuture`] is returned for every submitted batch. It
//! tracks the axes of the batch's events and lets the caller block until
//! all of them reach a lifecycle stage. Futures only observe: the
//! dispatcher feeds them notifications, the coordinator closes or aborts
//! them, and dropping a future releases it from the registry.

use super::error::{AbortReason, AcquisitionError};
use super::lock;
use super::registry::{FutureId, FutureRegistry};
use crate::event::{AcqNotification, Axes, NotificationKind, Stages};
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

/// How a successful wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Every tracked image reached the requested stage.
    Reached,
    /// The acquisition terminated normally before that happened.
    AcquisitionEnded,
}

#[derive(Debug, Clone)]
enum Ending {
    Completed,
    Disconnected,
    Aborted(AbortReason),
}

#[derive(Debug)]
struct Progress {
    stages: HashMap<Axes, Stages>,
    ending: Option<Ending>,
}

impl Progress {
    fn reached(&self, stage: Stages) -> bool {
        self.stages.values().all(|s| s.contains(stage))
    }
}

/// State shared between a future, the registry and the dispatcher.
#[derive(Debug)]
pub(crate) struct FutureState {
    progress: Mutex<Progress>,
    changed: Condvar,
}

impl FutureState {
    pub(crate) fn new(axes: impl IntoIterator<Item = Axes>) -> Self {
        Self {
            progress: Mutex::new(Progress {
                stages: axes.into_iter().map(|a| (a, Stages::empty())).collect(),
                ending: None,
            }),
            changed: Condvar::new(),
        }
    }

    /// Records `notification` if it refers to one of the tracked images.
    pub(crate) fn notify(&self, notification: &AcqNotification) {
        let (Some(stage), Some(axes)) = (notification.kind.stage(), notification.axes.as_ref())
        else {
            return;
        };
        let mut progress = lock(&self.progress);
        if let Some(stages) = progress.stages.get_mut(axes) {
            stages.insert(stage);
            drop(progress);
            self.changed.notify_all();
        }
    }

    /// Marks the owning acquisition as terminated.
    pub(crate) fn close(&self) {
        self.end(Ending::Completed);
    }

    /// Marks the owning acquisition as cut off from its engine.
    pub(crate) fn disconnect(&self) {
        self.end(Ending::Disconnected);
    }

    /// Marks the owning acquisition as aborted.
    pub(crate) fn abort(&self, reason: AbortReason) {
        self.end(Ending::Aborted(reason));
    }

    fn end(&self, ending: Ending) {
        let mut progress = lock(&self.progress);
        if progress.ending.is_none() {
            progress.ending = Some(ending);
        }
        drop(progress);
        self.changed.notify_all();
    }

    fn wait_for(
        &self,
        kind: NotificationKind,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, AcquisitionError> {
        let stage = kind
            .stage()
            .ok_or(AcquisitionError::NotAwaitable { kind })?;
        let deadline = timeout.map(|t| Instant::now() + t);

        let mut progress = lock(&self.progress);
        loop {
            match &progress.ending {
                Some(Ending::Aborted(reason)) => {
                    return Err(AcquisitionError::Aborted {
                        reason: reason.clone(),
                    });
                }
                _ if progress.reached(stage) => return Ok(WaitOutcome::Reached),
                Some(Ending::Completed) => return Ok(WaitOutcome::AcquisitionEnded),
                Some(Ending::Disconnected) => return Err(AcquisitionError::EngineDisconnected),
                None => {}
            }
            progress = self.block(progress, kind, timeout, deadline)?;
        }
    }

    fn block<'a>(
        &self,
        guard: MutexGuard<'a, Progress>,
        kind: NotificationKind,
        timeout: Option<Duration>,
        deadline: Option<Instant>,
    ) -> Result<MutexGuard<'a, Progress>, AcquisitionError> {
        let Some(deadline) = deadline else {
            return Ok(self
                .changed
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner));
        };
        let now = Instant::now();
        if now >= deadline {
            return Err(AcquisitionError::Timeout {
                kind,
                timeout: timeout.unwrap_or_default(),
            });
        }
        let (guard, _) = self
            .changed
            .wait_timeout(guard, deadline - now)
            .unwrap_or_else(PoisonError::into_inner);
        Ok(guard)
    }

    fn has_reached(&self, stage: Stages) -> bool {
        lock(&self.progress).reached(stage)
    }

    fn tracked(&self) -> Vec<Axes> {
        let mut axes: Vec<Axes> = lock(&self.progress).stages.keys().cloned().collect();
        axes.sort();
        axes
    }
}

/// Handle for waiting on the events of one submission.
///
/// # Examples
///
/// ```
/// use acquisition_rs::acquisition::{AcquisitionBuilder, LoopbackEngine};
/// use acquisition_rs::event::{AcquisitionEvent, Axes};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let acq = AcquisitionBuilder::new(Arc::new(LoopbackEngine::new())).start().unwrap();
/// let future = acq.acquire(AcquisitionEvent::new(Axes::new().with("time", 0))).unwrap();
/// future.await_image_saved(Some(Duration::from_secs(5))).unwrap();
/// acq.finish().unwrap();
/// ```
pub struct AcquisitionFuture {
    id: FutureId,
    state: Arc<FutureState>,
    registry: Weak<FutureRegistry>,
}

impl AcquisitionFuture {
    pub(crate) fn register(registry: &Arc<FutureRegistry>, axes: Vec<Axes>) -> Self {
        let state = Arc::new(FutureState::new(axes));
        let id = registry.register(Arc::clone(&state));
        Self {
            id,
            state,
            registry: Arc::downgrade(registry),
        }
    }

    /// Registry id of this future.
    #[must_use]
    pub fn id(&self) -> FutureId {
        self.id
    }

    /// Axes tracked by this future, sorted.
    #[must_use]
    pub fn axes(&self) -> Vec<Axes> {
        self.state.tracked()
    }

    /// Blocks until every tracked image has passed the stage of `kind`.
    ///
    /// `None` waits without limit.
    ///
    /// # Errors
    ///
    /// - [`AcquisitionError::NotAwaitable`] for acquisition-wide kinds
    /// - [`AcquisitionError::Timeout`] if `timeout` elapses first
    /// - [`AcquisitionError::Aborted`] if the acquisition aborts
    /// - [`AcquisitionError::EngineDisconnected`] if the notification
    ///   stream closed before the stage was reached
    pub fn wait(
        &self,
        kind: NotificationKind,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, AcquisitionError> {
        self.state.wait_for(kind, timeout)
    }

    /// Waits until the engine finished executing every tracked event.
    ///
    /// # Errors
    ///
    /// See [`wait`](Self::wait).
    pub fn await_execution(&self, timeout: Option<Duration>) -> Result<WaitOutcome, AcquisitionError> {
        self.wait(NotificationKind::EventFinished, timeout)
    }

    /// Waits until every tracked image has been saved.
    ///
    /// # Errors
    ///
    /// See [`wait`](Self::wait).
    pub fn await_image_saved(
        &self,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, AcquisitionError> {
        self.wait(NotificationKind::ImageSaved, timeout)
    }

    /// Non-blocking check of whether every tracked image passed the stage
    /// of `kind`. Always `false` for acquisition-wide kinds.
    #[must_use]
    pub fn has_reached(&self, kind: NotificationKind) -> bool {
        kind.stage().is_some_and(|stage| self.state.has_reached(stage))
    }
}

impl Drop for AcquisitionFuture {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.release(self.id);
        }
    }
}

impl std::fmt::Debug for AcquisitionFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionFuture")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
