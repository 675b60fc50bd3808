/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Error types for acquisition coordination.

use crate::config::ConfigError;
use crate::event::{NotificationKind, ValidationError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Shared, thread-safe error recorded as the reason for an abort.
pub type AbortCause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Why an acquisition was aborted.
///
/// Cloned into every waiter that observes the abort.
#[derive(Debug, Clone, Default)]
pub enum AbortReason {
    /// `abort` was called without a cause.
    #[default]
    Unspecified,
    /// `abort` was called with a cause, or a hook failed.
    Cause(AbortCause),
}

impl AbortReason {
    /// Wraps `error` as an abort cause.
    #[must_use]
    pub fn from_error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Cause(Arc::new(error))
    }

    /// Returns the stored cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&AbortCause> {
        match self {
            Self::Unspecified => None,
            Self::Cause(cause) => Some(cause),
        }
    }
}

impl From<Option<AbortCause>> for AbortReason {
    fn from(cause: Option<AbortCause>) -> Self {
        cause.map_or(Self::Unspecified, Self::Cause)
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => f.write_str("no cause given"),
            Self::Cause(cause) => write!(f, "{cause}"),
        }
    }
}

/// Errors returned by the acquisition coordinator and its futures.
#[derive(Debug, Clone, Error)]
pub enum AcquisitionError {
    /// Events were submitted after shutdown began.
    #[error("cannot submit more events because this acquisition is already finished")]
    AlreadyComplete,

    /// The acquisition was aborted; carries the stored cause.
    #[error("acquisition aborted: {reason}")]
    Aborted {
        /// The recorded abort reason.
        reason: AbortReason,
    },

    /// A submitted event failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A future wait expired.
    #[error("timed out after {timeout:?} waiting for {kind}")]
    Timeout {
        /// Notification kind that was awaited.
        kind: NotificationKind,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The requested kind is acquisition-wide and cannot be awaited per image.
    #[error("{kind} is not a per-image notification and cannot be awaited")]
    NotAwaitable {
        /// The rejected kind.
        kind: NotificationKind,
    },

    /// The engine side of the event queue is gone.
    #[error("acquisition engine is disconnected")]
    EngineDisconnected,

    /// The engine failed to start.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A worker thread could not be spawned.
    #[error("failed to spawn {thread} thread: {message}")]
    Spawn {
        /// Name of the thread.
        thread: &'static str,
        /// OS error message.
        message: String,
    },
}

impl AcquisitionError {
    /// Returns `true` if this error reports an abort.
    #[inline]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Error reported by an [`AcquisitionEngine`](super::AcquisitionEngine).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("engine error: {message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    /// Creates an engine error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure raised by a user-supplied hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    /// Creates a hook error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Abort cause recorded when the image processor fails.
#[derive(Debug, Clone, Error)]
#[error("exception in image processor: {source}")]
pub struct ImageProcessorError {
    /// The hook's error.
    #[source]
    pub source: HookError,
}
