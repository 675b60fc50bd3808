/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Engine double driven by the test body.

use crate::acquisition::{AcquisitionEngine, EngineError, EngineLink};
use crate::event::{AcqNotification, Axes, NotificationKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Engine that executes nothing; tests send notifications by hand.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    link: Mutex<Option<EngineLink>>,
    events_finished: AtomicBool,
    aborted: AtomicBool,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&self) -> EngineLink {
        self.link.lock().unwrap().clone().expect("engine not started")
    }

    pub fn send(&self, notification: AcqNotification) {
        self.link().notifications.send(notification).unwrap();
    }

    pub fn send_stage(&self, kind: NotificationKind, axes: &Axes) {
        self.send(AcqNotification::for_axes(kind, axes.clone()));
    }

    pub fn finish_events(&self) {
        self.events_finished.store(true, Ordering::Release);
        self.send(AcqNotification::events_finished());
    }

    pub fn finish_sink(&self) {
        self.send(AcqNotification::data_sink_finished());
    }

    pub fn set_events_finished(&self) {
        self.events_finished.store(true, Ordering::Release);
    }

    /// Drops the stored link, closing the notification stream.
    pub fn disconnect(&self) {
        self.link.lock().unwrap().take();
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

impl AcquisitionEngine for ScriptedEngine {
    fn start(&self, link: EngineLink) -> Result<(), EngineError> {
        *self.link.lock().unwrap() = Some(link);
        Ok(())
    }

    fn are_events_finished(&self) -> bool {
        self.events_finished.load(Ordering::Acquire)
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }
}

/// Engine that refuses to start.
#[derive(Debug, Default)]
pub struct FailingEngine;

impl AcquisitionEngine for FailingEngine {
    fn start(&self, _link: EngineLink) -> Result<(), EngineError> {
        Err(EngineError::new("camera offline"))
    }

    fn are_events_finished(&self) -> bool {
        false
    }

    fn abort(&self) {}
}

pub fn time_axes(t: i64) -> Axes {
    Axes::new().with("time", t)
}
