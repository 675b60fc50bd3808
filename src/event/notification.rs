/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Notifications emitted by the acquisition engine.
//!
//! Global notifications describe the acquisition as a whole; all others
//! carry the [`Axes`] of the image they refer to and advance that image
//! through one lifecycle [`Stages`] bit.

use super::axes::Axes;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag of an [`AcqNotification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The engine accepted the acquisition.
    AcqStarted,
    /// No further events will be executed.
    AcqEventsFinished,
    /// Hardware is about to be updated for an event.
    PreHardware,
    /// Hardware has been updated for an event.
    PostHardware,
    /// A camera sequence is about to start.
    PreSequenceStarted,
    /// A single snap is about to be taken.
    PreSnap,
    /// A single snap was taken.
    PostSnap,
    /// A camera sequence stopped.
    PostSequenceStopped,
    /// The engine finished executing an event.
    EventFinished,
    /// The image for an event was written to the dataset.
    ImageSaved,
    /// The data sink (storage and viewer) shut down.
    DataSinkFinished,
}

impl NotificationKind {
    /// Returns the per-image stage this kind advances, or `None` for
    /// acquisition-wide notifications.
    #[must_use]
    pub fn stage(self) -> Option<Stages> {
        match self {
            Self::AcqStarted | Self::AcqEventsFinished | Self::DataSinkFinished => None,
            Self::PreHardware => Some(Stages::PRE_HARDWARE),
            Self::PostHardware => Some(Stages::POST_HARDWARE),
            Self::PreSequenceStarted | Self::PreSnap => Some(Stages::PRE_CAMERA),
            Self::PostSnap | Self::PostSequenceStopped => Some(Stages::POST_CAMERA),
            Self::EventFinished => Some(Stages::EVENT_FINISHED),
            Self::ImageSaved => Some(Stages::IMAGE_SAVED),
        }
    }

    /// Returns `true` for acquisition-wide notifications.
    #[inline]
    #[must_use]
    pub fn is_global(self) -> bool {
        self.stage().is_none()
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AcqStarted => "acq_started",
            Self::AcqEventsFinished => "acq_events_finished",
            Self::PreHardware => "pre_hardware",
            Self::PostHardware => "post_hardware",
            Self::PreSequenceStarted => "pre_sequence_started",
            Self::PreSnap => "pre_snap",
            Self::PostSnap => "post_snap",
            Self::PostSequenceStopped => "post_sequence_stopped",
            Self::EventFinished => "event_finished",
            Self::ImageSaved => "image_saved",
            Self::DataSinkFinished => "data_sink_finished",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Lifecycle stages an image passes through.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Stages: u8 {
        /// Hardware update started.
        const PRE_HARDWARE = 0b0000_0001;
        /// Hardware update finished.
        const POST_HARDWARE = 0b0000_0010;
        /// Camera about to be triggered.
        const PRE_CAMERA = 0b0000_0100;
        /// Camera triggered.
        const POST_CAMERA = 0b0000_1000;
        /// Engine done with the event.
        const EVENT_FINISHED = 0b0001_0000;
        /// Image written to the dataset.
        const IMAGE_SAVED = 0b0010_0000;
    }
}

/// Opaque reference to the dataset an image was written to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetRef(pub String);

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tagged progress report from the acquisition engine.
///
/// # Examples
///
/// ```
/// use acquisition_rs::event::{AcqNotification, Axes, NotificationKind};
///
/// let n = AcqNotification::for_axes(NotificationKind::EventFinished, Axes::new().with("time", 0));
/// assert!(!n.is_acquisition_finished());
/// assert!(AcqNotification::events_finished().is_acquisition_finished());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcqNotification {
    /// What happened.
    pub kind: NotificationKind,

    /// Image the notification refers to; `None` for global notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axes: Option<Axes>,

    /// Dataset the image was saved to, set on [`NotificationKind::ImageSaved`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetRef>,
}

impl AcqNotification {
    /// Creates an acquisition-wide notification.
    #[must_use]
    pub fn global(kind: NotificationKind) -> Self {
        Self {
            kind,
            axes: None,
            dataset: None,
        }
    }

    /// Creates a notification about the image identified by `axes`.
    #[must_use]
    pub fn for_axes(kind: NotificationKind, axes: Axes) -> Self {
        Self {
            kind,
            axes: Some(axes),
            dataset: None,
        }
    }

    /// Creates an [`NotificationKind::ImageSaved`] notification.
    #[must_use]
    pub fn image_saved(axes: Axes, dataset: DatasetRef) -> Self {
        Self {
            kind: NotificationKind::ImageSaved,
            axes: Some(axes),
            dataset: Some(dataset),
        }
    }

    /// The "all events finished" sentinel.
    #[must_use]
    pub fn events_finished() -> Self {
        Self::global(NotificationKind::AcqEventsFinished)
    }

    /// The "data sink finished" sentinel.
    #[must_use]
    pub fn data_sink_finished() -> Self {
        Self::global(NotificationKind::DataSinkFinished)
    }

    /// Returns `true` for the "all events finished" sentinel.
    #[inline]
    #[must_use]
    pub fn is_acquisition_finished(&self) -> bool {
        self.kind == NotificationKind::AcqEventsFinished
    }

    /// Returns `true` for the "data sink finished" sentinel.
    #[inline]
    #[must_use]
    pub fn is_data_sink_finished(&self) -> bool {
        self.kind == NotificationKind::DataSinkFinished
    }
}
