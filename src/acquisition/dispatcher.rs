/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Notification dispatcher.
//!
//! A single consumer drains the bounded notification stream and fans each
//! notification out, in arrival order, to every live future and then to
//! every listener. The loop ends once both the "all events finished" and
//! the "data sink finished" sentinels have been seen, in either order, or
//! when every producer has hung up.
//!
//! A panicking future or listener is caught and logged; fan-out to the
//! remaining recipients continues. Listeners run on the dispatcher thread,
//! so a slow listener delays every later notification.

use super::registry::FutureRegistry;
use crate::event::AcqNotification;
use crossbeam::channel::Receiver;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Type alias for notification listener functions.
pub type NotificationListener = Arc<dyn Fn(&AcqNotification) + Send + Sync>;

/// Name of the dispatcher thread.
pub const DISPATCHER_THREAD_NAME: &str = "notification-dispatcher";

/// Why the dispatch loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEnd {
    /// Both sentinels were observed.
    Sentinels,
    /// All notification senders were dropped first.
    Disconnected,
}

/// Counters reported when the dispatch loop exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Notifications taken off the stream.
    pub dispatched: u64,
    /// Future or listener invocations that panicked.
    pub listener_failures: u64,
    /// How the loop ended.
    pub end: DispatchEnd,
}

/// Single-consumer fan-out of engine notifications.
pub struct NotificationDispatcher {
    notifications: Receiver<AcqNotification>,
    registry: Arc<FutureRegistry>,
    listeners: Vec<NotificationListener>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over `notifications` feeding the futures in `registry`.
    #[must_use]
    pub fn new(notifications: Receiver<AcqNotification>, registry: Arc<FutureRegistry>) -> Self {
        Self {
            notifications,
            registry,
            listeners: Vec::new(),
        }
    }

    /// Registers a listener, called after the futures for each notification.
    ///
    /// Listeners are called in registration order.
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: Fn(&AcqNotification) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Registers an already shared listener.
    pub fn add_shared_listener(&mut self, listener: NotificationListener) {
        self.listeners.push(listener);
    }

    /// Runs the dispatch loop on a dedicated thread.
    ///
    /// `on_exit` runs on that thread after the loop ends and every live
    /// future has been closed.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn<F>(self, on_exit: F) -> io::Result<JoinHandle<()>>
    where
        F: FnOnce(DispatchSummary) + Send + 'static,
    {
        thread::Builder::new()
            .name(DISPATCHER_THREAD_NAME.to_string())
            .spawn(move || {
                let summary = self.run();
                on_exit(summary);
            })
    }

    /// Runs the dispatch loop on the current thread until it ends.
    pub fn run(self) -> DispatchSummary {
        let mut events_finished = false;
        let mut data_sink_finished = false;
        let mut dispatched = 0u64;
        let mut listener_failures = 0u64;

        let end = loop {
            let Ok(notification) = self.notifications.recv() else {
                warn!(
                    events_finished,
                    data_sink_finished, "notification stream closed before both sentinels"
                );
                break DispatchEnd::Disconnected;
            };
            dispatched += 1;

            if notification.is_acquisition_finished() {
                events_finished = true;
            } else if notification.is_data_sink_finished() {
                data_sink_finished = true;
            }

            for future in self.registry.snapshot() {
                if !isolate("future", || future.notify(&notification)) {
                    listener_failures += 1;
                }
            }
            for listener in &self.listeners {
                if !isolate("listener", || listener(&notification)) {
                    listener_failures += 1;
                }
            }

            if events_finished && data_sink_finished {
                break DispatchEnd::Sentinels;
            }
        };

        for future in self.registry.snapshot() {
            match end {
                DispatchEnd::Sentinels => future.close(),
                DispatchEnd::Disconnected => future.disconnect(),
            }
        }

        debug!(dispatched, listener_failures, ?end, "notification dispatch finished");
        DispatchSummary {
            dispatched,
            listener_failures,
            end,
        }
    }
}

/// Runs `f`, logging and swallowing a panic. Returns `false` if it panicked.
fn isolate(recipient: &'static str, f: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            error!(
                recipient,
                panic = panic_message(payload.as_ref()),
                "notification recipient panicked; continuing fan-out"
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
