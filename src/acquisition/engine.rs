/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Boundary with the acquisition engine.
//!
//! The coordinator hands an engine an [`EngineLink`]: the receiving end of
//! the event queue and a sender onto the bounded notification stream. The
//! engine executes batches in order, reports progress as notifications and
//! ends the stream with the two termination sentinels.

use super::error::{AbortReason, AcquisitionError, EngineError};
use super::lock;
use crate::event::{AcqNotification, AcquisitionEvent, DatasetRef, EventBatch, NotificationKind, validate};
use crossbeam::channel::{Receiver, SendError, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Item on the event queue.
#[derive(Debug, Clone, PartialEq)]
pub enum EventMessage {
    /// Events submitted together; only these may be merged into one
    /// hardware sequence.
    Batch(Vec<AcquisitionEvent>),
    /// No more events will follow.
    Finished,
}

/// Channels and identity handed to an engine when the acquisition starts.
#[derive(Debug, Clone)]
pub struct EngineLink {
    /// Event queue, consumed in order.
    pub events: Receiver<EventMessage>,
    /// Bounded notification stream; sends block while it is full.
    pub notifications: Sender<AcqNotification>,
    /// Acquisition name.
    pub name: String,
    /// Save directory; `None` keeps data in memory.
    pub directory: Option<PathBuf>,
}

impl EngineLink {
    /// Dataset reference for this acquisition's name and directory.
    #[must_use]
    pub fn dataset(&self) -> DatasetRef {
        match &self.directory {
            Some(dir) => DatasetRef(dir.join(&self.name).display().to_string()),
            None => DatasetRef(format!("memory://{}", self.name)),
        }
    }
}

/// An engine that executes acquisition events.
///
/// Implementations must eventually send both
/// [`AcqNotification::events_finished`] and
/// [`AcqNotification::data_sink_finished`] after receiving
/// [`EventMessage::Finished`] or being aborted.
pub trait AcquisitionEngine: Send + Sync {
    /// Starts consuming `link.events`.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] if the engine cannot start.
    fn start(&self, link: EngineLink) -> Result<(), EngineError>;

    /// Returns `true` once the engine will accept no more events.
    fn are_events_finished(&self) -> bool;

    /// Stops executing events as soon as possible.
    fn abort(&self);
}

#[derive(Debug, Clone)]
enum GateState {
    Open,
    Finished,
    Aborted(AbortReason),
}

/// Single entry point onto the event queue.
///
/// Every batch and the finish sentinel go through the gate's lock, so once
/// the gate closes no batch can land behind the sentinel.
#[derive(Debug)]
pub(crate) struct EventGate {
    state: Mutex<GateState>,
    events: Sender<EventMessage>,
    queued: Receiver<EventMessage>,
}

impl EventGate {
    pub(crate) fn new(events: Sender<EventMessage>, queued: Receiver<EventMessage>) -> Self {
        Self {
            state: Mutex::new(GateState::Open),
            events,
            queued,
        }
    }

    /// Enqueues a validated batch while the gate is open.
    pub(crate) fn send(&self, events: Vec<AcquisitionEvent>) -> Result<(), AcquisitionError> {
        let state = lock(&self.state);
        match &*state {
            GateState::Open => {}
            GateState::Finished => return Err(AcquisitionError::AlreadyComplete),
            GateState::Aborted(reason) => {
                return Err(AcquisitionError::Aborted {
                    reason: reason.clone(),
                });
            }
        }
        self.events
            .send(EventMessage::Batch(events))
            .map_err(|_| AcquisitionError::EngineDisconnected)
    }

    /// Closes the gate and enqueues the finish sentinel. Returns `false`
    /// if it was already closed.
    pub(crate) fn finish(&self) -> bool {
        let mut state = lock(&self.state);
        if !matches!(*state, GateState::Open) {
            return false;
        }
        *state = GateState::Finished;
        if self.events.send(EventMessage::Finished).is_err() {
            warn!("event queue closed before finish sentinel");
        }
        true
    }

    /// Closes the gate for good, drops queued batches and enqueues a fresh
    /// finish sentinel. Returns the number of batches dropped.
    pub(crate) fn abort(&self, reason: AbortReason) -> usize {
        let mut state = lock(&self.state);
        *state = GateState::Aborted(reason);
        let purged = self
            .queued
            .try_iter()
            .filter(|m| matches!(m, EventMessage::Batch(_)))
            .count();
        if self.events.send(EventMessage::Finished).is_err() {
            debug!("event queue already closed");
        }
        purged
    }

    fn pending(&self) -> usize {
        self.events.len()
    }
}

/// Producer handle onto the event queue, given to hooks.
///
/// The handle closes with the acquisition: after shutdown begins pushes
/// fail with [`AcquisitionError::AlreadyComplete`], and after an abort with
/// [`AcquisitionError::Aborted`].
#[derive(Debug, Clone)]
pub struct EventQueueHandle {
    gate: Arc<EventGate>,
}

impl EventQueueHandle {
    pub(crate) fn new(gate: Arc<EventGate>) -> Self {
        Self { gate }
    }

    /// Validates and appends a batch to the event queue.
    ///
    /// # Errors
    ///
    /// - [`AcquisitionError::Validation`] for malformed events
    /// - [`AcquisitionError::AlreadyComplete`] after shutdown began
    /// - [`AcquisitionError::Aborted`] after an abort
    /// - [`AcquisitionError::EngineDisconnected`] if the queue is closed
    pub fn push(&self, events: impl Into<EventBatch>) -> Result<(), AcquisitionError> {
        let mut batch = events.into();
        validate(&mut batch)?;
        self.gate.send(batch.into_events())
    }

    /// Number of messages waiting to be consumed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.gate.pending()
    }
}

#[derive(Debug, Default)]
struct LoopbackState {
    events_finished: AtomicBool,
    aborted: AtomicBool,
    executed: AtomicU64,
}

/// In-process engine that acknowledges every event without hardware.
///
/// Each event produces `PreHardware`, `PostHardware`, `PreSnap`,
/// `PostSnap`, `EventFinished` and `ImageSaved` notifications. Start times
/// are not honored.
#[derive(Debug, Default)]
pub struct LoopbackEngine {
    state: Arc<LoopbackState>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LoopbackEngine {
    /// Creates an idle engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events executed so far.
    #[must_use]
    pub fn executed(&self) -> u64 {
        self.state.executed.load(Ordering::Acquire)
    }

    fn run(state: &LoopbackState, link: &EngineLink) -> Result<(), SendError<AcqNotification>> {
        let dataset = link.dataset();
        link.notifications
            .send(AcqNotification::global(NotificationKind::AcqStarted))?;

        for message in link.events.iter() {
            let EventMessage::Batch(events) = message else {
                break;
            };
            for event in events {
                if state.aborted.load(Ordering::Acquire) {
                    break;
                }
                Self::execute(&event, &dataset, &link.notifications)?;
                state.executed.fetch_add(1, Ordering::AcqRel);
            }
            if state.aborted.load(Ordering::Acquire) {
                break;
            }
        }

        state.events_finished.store(true, Ordering::Release);
        link.notifications.send(AcqNotification::events_finished())?;
        link.notifications.send(AcqNotification::data_sink_finished())
    }

    fn execute(
        event: &AcquisitionEvent,
        dataset: &DatasetRef,
        notifications: &Sender<AcqNotification>,
    ) -> Result<(), SendError<AcqNotification>> {
        for kind in [
            NotificationKind::PreHardware,
            NotificationKind::PostHardware,
            NotificationKind::PreSnap,
            NotificationKind::PostSnap,
            NotificationKind::EventFinished,
        ] {
            notifications.send(AcqNotification::for_axes(kind, event.axes.clone()))?;
        }
        notifications.send(AcqNotification::image_saved(
            event.axes.clone(),
            dataset.clone(),
        ))
    }
}

impl AcquisitionEngine for LoopbackEngine {
    fn start(&self, link: EngineLink) -> Result<(), EngineError> {
        let mut worker = lock(&self.worker);
        if worker.is_some() {
            return Err(EngineError::new("loopback engine already started"));
        }
        let state = Arc::clone(&self.state);
        let handle = thread::Builder::new()
            .name("loopback-engine".to_string())
            .spawn(move || {
                info!(name = %link.name, "loopback engine started");
                match Self::run(&state, &link) {
                    Ok(()) => debug!(executed = state.executed.load(Ordering::Acquire), "loopback engine finished"),
                    Err(_) => {
                        state.events_finished.store(true, Ordering::Release);
                        warn!("notification stream closed; loopback engine stopping");
                    }
                }
            })
            .map_err(|e| EngineError::new(e.to_string()))?;
        *worker = Some(handle);
        Ok(())
    }

    fn are_events_finished(&self) -> bool {
        self.state.events_finished.load(Ordering::Acquire)
    }

    fn abort(&self) {
        self.state.aborted.store(true, Ordering::Release);
    }
}
