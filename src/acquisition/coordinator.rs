/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Acquisition coordinator.
//!
//! [`Acquisition`] owns the event queue, the notification dispatcher thread
//! and the future registry, and drives the lifecycle
//! `Created -> Running -> Finishing -> Terminated`. An abort may happen in
//! `Running` or `Finishing` and moves straight to `Terminated`.

use super::dispatcher::{
    DISPATCHER_THREAD_NAME, DispatchEnd, DispatchSummary, NotificationDispatcher,
};
use super::engine::{AcquisitionEngine, EngineLink, EventGate, EventQueueHandle};
use super::error::{AbortCause, AbortReason, AcquisitionError, ImageProcessorError};
use super::future::AcquisitionFuture;
use super::hooks::{Image, ImageMetadata, ImageProcessor, ImageSavedCallback, TaggedImage};
use super::lock;
use super::registry::FutureRegistry;
use crate::config::AcquisitionConfig;
use crate::event::{
    AcqNotification, AcquisitionEvent, Axes, DatasetRef, EventBatch, NotificationKind, validate,
};
use crossbeam::channel;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Lifecycle phase of an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Configured but not started.
    Created,
    /// Accepting events.
    Running,
    /// Shutdown requested; draining.
    Finishing,
    /// Engine and data sink both finished, or aborted.
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Finishing => "finishing",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// What a call to [`Acquisition::submit`] carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Events to acquire.
    Events(EventBatch),
    /// No more events; begin shutdown.
    Finish,
}

impl From<EventBatch> for Submission {
    fn from(batch: EventBatch) -> Self {
        Self::Events(batch)
    }
}

impl From<AcquisitionEvent> for Submission {
    fn from(event: AcquisitionEvent) -> Self {
        Self::Events(EventBatch::Single(event))
    }
}

impl From<Vec<AcquisitionEvent>> for Submission {
    fn from(events: Vec<AcquisitionEvent>) -> Self {
        Self::Events(EventBatch::Many(events))
    }
}

impl<T: Into<EventBatch>> From<Option<T>> for Submission {
    fn from(events: Option<T>) -> Self {
        events.map_or(Self::Finish, |e| Self::Events(e.into()))
    }
}

/// Interface shared by acquisition backends.
pub trait AcquisitionHandle {
    /// Dataset the acquisition writes to, once an image has been saved.
    fn dataset(&self) -> Option<DatasetRef>;

    /// Blocks until the acquisition terminates.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::Aborted`] with the stored cause if the
    /// acquisition was aborted, or [`AcquisitionError::EngineDisconnected`]
    /// if the engine went away without both termination sentinels.
    fn await_completion(&self) -> Result<(), AcquisitionError>;

    /// Name of the attached viewer, if any.
    fn viewer(&self) -> Option<&str>;
}

#[derive(Debug)]
struct Lifecycle {
    phase: Phase,
    aborted: Option<AbortReason>,
    ended: Option<DispatchEnd>,
    dataset: Option<DatasetRef>,
}

/// State shared with the dispatcher thread.
#[derive(Debug)]
struct Shared {
    lifecycle: Mutex<Lifecycle>,
    terminated: Condvar,
    gate: Arc<EventGate>,
}

impl Shared {
    fn new(gate: Arc<EventGate>) -> Self {
        Self {
            lifecycle: Mutex::new(Lifecycle {
                phase: Phase::Created,
                aborted: None,
                ended: None,
                dataset: None,
            }),
            terminated: Condvar::new(),
            gate,
        }
    }

    fn dispatch_finished(&self, id: Uuid, summary: DispatchSummary) {
        let mut lifecycle = lock(&self.lifecycle);
        lifecycle.ended = Some(summary.end);
        if lifecycle.phase != Phase::Terminated {
            match summary.end {
                DispatchEnd::Sentinels => {
                    info!(acquisition = %id, from = %lifecycle.phase, "acquisition terminated");
                }
                DispatchEnd::Disconnected => {
                    warn!(
                        acquisition = %id,
                        from = %lifecycle.phase,
                        "engine disconnected; acquisition terminated"
                    );
                }
            }
            lifecycle.phase = Phase::Terminated;
            self.gate.finish();
        }
        drop(lifecycle);
        self.terminated.notify_all();
    }

    fn record_dataset(&self, notification: &AcqNotification) {
        if notification.kind != NotificationKind::ImageSaved {
            return;
        }
        if let Some(dataset) = &notification.dataset {
            let mut lifecycle = lock(&self.lifecycle);
            if lifecycle.dataset.is_none() {
                lifecycle.dataset = Some(dataset.clone());
            }
        }
    }
}

/// Configures an acquisition before it starts.
///
/// # Examples
///
/// ```
/// use acquisition_rs::acquisition::{AcquisitionBuilder, LoopbackEngine, Phase};
/// use acquisition_rs::config::AcquisitionConfig;
/// use std::sync::Arc;
///
/// let builder = AcquisitionBuilder::new(Arc::new(LoopbackEngine::new()))
///     .config(AcquisitionConfig::named("demo"))
///     .on_notification(|n| println!("{}", n.kind));
/// assert_eq!(builder.phase(), Phase::Created);
///
/// let acq = builder.start().unwrap();
/// assert_eq!(acq.phase(), Phase::Running);
/// acq.finish().unwrap();
/// ```
pub struct AcquisitionBuilder {
    config: AcquisitionConfig,
    engine: Arc<dyn AcquisitionEngine>,
    notification_callback: Option<Arc<dyn Fn(&AcqNotification) + Send + Sync>>,
    image_saved_callback: Option<ImageSavedCallback>,
    image_processor: Option<Arc<dyn ImageProcessor>>,
}

impl AcquisitionBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new(engine: Arc<dyn AcquisitionEngine>) -> Self {
        Self {
            config: AcquisitionConfig::default(),
            engine,
            notification_callback: None,
            image_saved_callback: None,
            image_processor: None,
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn config(mut self, config: AcquisitionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the callback invoked, on the dispatcher thread, for every
    /// notification. It should return quickly.
    #[must_use]
    pub fn on_notification<F>(mut self, callback: F) -> Self
    where
        F: Fn(&AcqNotification) + Send + Sync + 'static,
    {
        self.notification_callback = Some(Arc::new(callback));
        self
    }

    /// Sets the callback invoked, on the dispatcher thread, whenever an
    /// image has been saved.
    #[must_use]
    pub fn on_image_saved<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Axes, &DatasetRef, &EventQueueHandle) + Send + Sync + 'static,
    {
        self.image_saved_callback = Some(Arc::new(callback));
        self
    }

    /// Sets the image processor run by [`Acquisition::process_image`].
    #[must_use]
    pub fn image_processor<P>(mut self, processor: P) -> Self
    where
        P: ImageProcessor + 'static,
    {
        self.image_processor = Some(Arc::new(processor));
        self
    }

    /// Always [`Phase::Created`].
    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::Created
    }

    /// Spawns the dispatcher, starts the engine and returns the running
    /// acquisition.
    ///
    /// # Errors
    ///
    /// Returns a config, spawn or engine error. Nothing keeps running on
    /// failure.
    pub fn start(self) -> Result<Acquisition, AcquisitionError> {
        self.config.validate()?;
        let id = Uuid::new_v4();

        let (event_tx, event_rx) = channel::unbounded();
        let (notification_tx, notification_rx) =
            channel::bounded(self.config.notification_capacity);
        let registry = Arc::new(FutureRegistry::new());
        let gate = Arc::new(EventGate::new(event_tx, event_rx.clone()));
        let shared = Arc::new(Shared::new(Arc::clone(&gate)));
        let queue = EventQueueHandle::new(gate);

        let mut dispatcher = NotificationDispatcher::new(notification_rx, Arc::clone(&registry));
        {
            let shared = Arc::clone(&shared);
            dispatcher.add_listener(move |n| shared.record_dataset(n));
        }
        if self.config.debug {
            dispatcher.add_listener(move |n| {
                debug!(acquisition = %id, kind = %n.kind, axes = ?n.axes, "notification");
            });
        }
        if let Some(callback) = self.image_saved_callback {
            let queue = queue.clone();
            dispatcher.add_listener(move |n| {
                if let (NotificationKind::ImageSaved, Some(axes), Some(dataset)) =
                    (n.kind, &n.axes, &n.dataset)
                {
                    callback(axes, dataset, &queue);
                }
            });
        }
        if let Some(callback) = self.notification_callback {
            dispatcher.add_shared_listener(callback);
        }

        let dispatcher_handle = {
            let shared = Arc::clone(&shared);
            dispatcher
                .spawn(move |summary| shared.dispatch_finished(id, summary))
                .map_err(|e| AcquisitionError::Spawn {
                    thread: DISPATCHER_THREAD_NAME,
                    message: e.to_string(),
                })?
        };

        // The stream cannot end before the engine holds the only sender.
        lock(&shared.lifecycle).phase = Phase::Running;
        self.engine.start(EngineLink {
            events: event_rx,
            notifications: notification_tx,
            name: self.config.name.clone(),
            directory: self.config.directory.clone(),
        })?;

        info!(acquisition = %id, name = %self.config.name, "acquisition running");

        Ok(Acquisition {
            id,
            config: self.config,
            engine: self.engine,
            queue,
            registry,
            shared,
            dispatcher: Mutex::new(Some(dispatcher_handle)),
            image_processor: self.image_processor,
        })
    }
}

/// A running acquisition.
///
/// Dropping an acquisition marks it finished and waits for it to
/// terminate, so shutdown happens on every exit path. Use
/// [`finish`](Self::finish) to observe the outcome instead.
///
/// # Examples
///
/// ```
/// use acquisition_rs::acquisition::{AcquisitionBuilder, LoopbackEngine};
/// use acquisition_rs::sequencer::MultiDSpec;
/// use std::sync::Arc;
///
/// let engine = Arc::new(LoopbackEngine::new());
/// let events = MultiDSpec::new().time_points(5).generate().unwrap();
///
/// let acq = AcquisitionBuilder::new(engine.clone()).start().unwrap();
/// let future = acq.acquire(events).unwrap();
/// future.await_image_saved(None).unwrap();
/// acq.finish().unwrap();
/// assert_eq!(engine.executed(), 5);
/// ```
pub struct Acquisition {
    id: Uuid,
    config: AcquisitionConfig,
    engine: Arc<dyn AcquisitionEngine>,
    queue: EventQueueHandle,
    registry: Arc<FutureRegistry>,
    shared: Arc<Shared>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    image_processor: Option<Arc<dyn ImageProcessor>>,
}

impl Acquisition {
    /// Starts an acquisition, runs `f` with it, then finishes it.
    ///
    /// The acquisition is finished and awaited whether `f` succeeds, fails
    /// or panics. An error from `f` takes precedence over one from
    /// finishing.
    ///
    /// # Errors
    ///
    /// Returns the start error, the error from `f`, or the completion error.
    pub fn scoped<T, F>(builder: AcquisitionBuilder, f: F) -> Result<T, AcquisitionError>
    where
        F: FnOnce(&Acquisition) -> Result<T, AcquisitionError>,
    {
        let acquisition = builder.start()?;
        let outcome = f(&acquisition);
        let completion = acquisition.finish();
        let value = outcome?;
        completion?;
        Ok(value)
    }

    /// Unique id of this run.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Configuration the acquisition was started with.
    #[must_use]
    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        lock(&self.shared.lifecycle).phase
    }

    /// Returns `true` once [`abort`](Self::abort) has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        lock(&self.shared.lifecycle).aborted.is_some()
    }

    /// Number of futures still held by callers.
    #[must_use]
    pub fn live_futures(&self) -> usize {
        self.registry.len()
    }

    /// Producer handle onto the event queue.
    #[must_use]
    pub fn event_queue(&self) -> EventQueueHandle {
        self.queue.clone()
    }

    /// Submits events, or begins shutdown for [`Submission::Finish`] or an
    /// empty batch.
    ///
    /// Events submitted in one call travel as one batch and are the only
    /// ones the engine may merge into a hardware sequence.
    ///
    /// # Errors
    ///
    /// - [`AcquisitionError::AlreadyComplete`] after shutdown began
    /// - [`AcquisitionError::Aborted`] after an abort
    /// - [`AcquisitionError::Validation`] for malformed events
    /// - [`AcquisitionError::EngineDisconnected`] if the queue is closed
    pub fn submit(
        &self,
        submission: impl Into<Submission>,
    ) -> Result<Option<AcquisitionFuture>, AcquisitionError> {
        if self.engine.are_events_finished() {
            warn!(acquisition = %self.id, "submission rejected: engine events finished");
            return Err(AcquisitionError::AlreadyComplete);
        }

        self.ensure_running(&lock(&self.shared.lifecycle))?;

        let mut batch = match submission.into() {
            Submission::Events(batch) if !batch.is_empty() => batch,
            Submission::Events(_) | Submission::Finish => {
                self.mark_finished();
                return Ok(None);
            }
        };
        validate(&mut batch)?;

        let future = AcquisitionFuture::register(&self.registry, batch.axes());
        let count = batch.len();
        self.shared.gate.send(batch.into_events())?;

        debug!(acquisition = %self.id, future = %future.id(), count, "events submitted");
        Ok(Some(future))
    }

    fn ensure_running(&self, lifecycle: &Lifecycle) -> Result<(), AcquisitionError> {
        if let Some(reason) = &lifecycle.aborted {
            return Err(AcquisitionError::Aborted {
                reason: reason.clone(),
            });
        }
        if lifecycle.phase != Phase::Running {
            warn!(acquisition = %self.id, phase = %lifecycle.phase, "submission rejected");
            return Err(AcquisitionError::AlreadyComplete);
        }
        Ok(())
    }

    /// Submits events and returns their future.
    ///
    /// # Errors
    ///
    /// See [`submit`](Self::submit).
    pub fn acquire(
        &self,
        events: impl Into<EventBatch>,
    ) -> Result<AcquisitionFuture, AcquisitionError> {
        self.submit(Submission::Events(events.into()))?
            .ok_or(AcquisitionError::AlreadyComplete)
    }

    /// Signals that no more events will be submitted. Idempotent.
    pub fn mark_finished(&self) {
        let mut lifecycle = lock(&self.shared.lifecycle);
        if lifecycle.phase != Phase::Running {
            return;
        }
        lifecycle.phase = Phase::Finishing;
        self.shared.gate.finish();
        info!(acquisition = %self.id, "acquisition finishing");
    }

    /// Cancels all queued events and shuts down.
    ///
    /// Events already handed to the engine are not recalled. `cause`, if
    /// given, is re-raised by [`await_completion`](Self::await_completion)
    /// and by every pending future wait. No-op once terminated.
    pub fn abort(&self, cause: Option<AbortCause>) {
        let reason = AbortReason::from(cause);
        let mut lifecycle = lock(&self.shared.lifecycle);
        if lifecycle.phase == Phase::Terminated {
            debug!(acquisition = %self.id, "abort ignored: already terminated");
            return;
        }
        lifecycle.aborted = Some(reason.clone());
        lifecycle.phase = Phase::Terminated;

        let purged = self.shared.gate.abort(reason.clone());
        drop(lifecycle);
        self.shared.terminated.notify_all();

        self.engine.abort();
        for future in self.registry.snapshot() {
            future.abort(reason.clone());
        }
        warn!(acquisition = %self.id, purged, %reason, "acquisition aborted");
    }

    /// Blocks until the acquisition terminates.
    ///
    /// Termination needs both the engine-finished and the
    /// data-sink-finished notifications, or an abort.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::Aborted`] with the stored cause if the
    /// acquisition was aborted, or [`AcquisitionError::EngineDisconnected`]
    /// if the notification stream closed before both sentinels arrived.
    pub fn await_completion(&self) -> Result<(), AcquisitionError> {
        let mut lifecycle = lock(&self.shared.lifecycle);
        while lifecycle.phase != Phase::Terminated {
            lifecycle = self
                .shared
                .terminated
                .wait(lifecycle)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let aborted = lifecycle.aborted.clone();
        let ended = lifecycle.ended;
        drop(lifecycle);

        if let Some(reason) = aborted {
            return Err(AcquisitionError::Aborted { reason });
        }
        let dispatcher = lock(&self.dispatcher).take();
        if let Some(handle) = dispatcher {
            if handle.join().is_err() {
                error!(acquisition = %self.id, "dispatcher thread panicked");
            }
        }
        if ended == Some(DispatchEnd::Disconnected) {
            return Err(AcquisitionError::EngineDisconnected);
        }
        Ok(())
    }

    /// Marks the acquisition finished and waits for it to terminate.
    ///
    /// # Errors
    ///
    /// See [`await_completion`](Self::await_completion).
    pub fn finish(self) -> Result<(), AcquisitionError> {
        self.mark_finished();
        self.await_completion()
    }

    /// Runs the image processor on one image.
    ///
    /// Without a processor the image passes through unchanged. If the
    /// processor fails the acquisition is aborted with the wrapped error as
    /// its cause and `None` is returned; the failure surfaces later through
    /// [`await_completion`](Self::await_completion) or a future wait.
    pub fn process_image(&self, image: Image, metadata: ImageMetadata) -> Option<Vec<TaggedImage>> {
        let Some(processor) = &self.image_processor else {
            return Some(vec![(image, metadata)]);
        };
        match processor.process(image, metadata, &self.queue) {
            Ok(images) => Some(images),
            Err(source) => {
                error!(acquisition = %self.id, error = %source, "image processor failed");
                self.abort(Some(Arc::new(ImageProcessorError { source })));
                None
            }
        }
    }
}

impl AcquisitionHandle for Acquisition {
    fn dataset(&self) -> Option<DatasetRef> {
        lock(&self.shared.lifecycle).dataset.clone()
    }

    fn await_completion(&self) -> Result<(), AcquisitionError> {
        Acquisition::await_completion(self)
    }

    fn viewer(&self) -> Option<&str> {
        self.config.viewer.as_deref()
    }
}

impl Drop for Acquisition {
    fn drop(&mut self) {
        if self.phase() == Phase::Terminated && lock(&self.dispatcher).is_none() {
            return;
        }
        self.mark_finished();
        if let Err(e) = self.await_completion() {
            debug!(acquisition = %self.id, error = %e, "acquisition ended with error");
        }
    }
}

impl fmt::Debug for Acquisition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acquisition")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("phase", &self.phase())
            .field("live_futures", &self.registry.len())
            .finish_non_exhaustive()
    }
}
