/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Acquisition event records.
//!
//! An [`AcquisitionEvent`] describes one image: the axis coordinates that
//! identify it plus the optional hardware settings the engine applies
//! before capturing it. An [`EventBatch`] is the unit of submission; the
//! engine may only merge events into a hardware sequence within a batch.

use super::axes::{AxisValue, Axes};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One atomic unit of acquisition work.
///
/// # Examples
///
/// ```
/// use acquisition_rs::event::{AcquisitionEvent, Axes};
///
/// let event = AcquisitionEvent::new(Axes::new().with("time", 0))
///     .with_min_start_time(2.5)
///     .with_exposure(10.0);
/// assert_eq!(event.min_start_time, Some(2.5));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionEvent {
    /// Axis coordinates identifying the image.
    pub axes: Axes,

    /// Earliest start, in seconds relative to acquisition start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_start_time: Option<f64>,

    /// Absolute z stage position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,

    /// Absolute x stage position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,

    /// Absolute y stage position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,

    /// `(group, setting)` pair of a configuration group to apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_group: Option<(String, String)>,

    /// Camera exposure in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure: Option<f64>,

    /// Deprecated top-level row; validation moves it into `axes["row"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<AxisValue>,

    /// Deprecated top-level column; validation moves it into `axes["column"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<AxisValue>,

    /// Engine-specific fields such as `keep_shutter_open`, `properties` or
    /// `tags`, carried through to the engine untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AcquisitionEvent {
    /// Creates an event with the given axes and no hardware settings.
    #[must_use]
    pub fn new(axes: Axes) -> Self {
        Self {
            axes,
            ..Self::default()
        }
    }

    /// Sets the minimum start time in seconds.
    #[must_use]
    pub fn with_min_start_time(mut self, seconds: f64) -> Self {
        self.min_start_time = Some(seconds);
        self
    }

    /// Sets an engine-specific field, replacing any previous value.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Sets the absolute z position.
    #[must_use]
    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    /// Sets the absolute xy position.
    #[must_use]
    pub fn with_xy(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Sets the configuration group and setting.
    #[must_use]
    pub fn with_config_group(mut self, group: impl Into<String>, setting: impl Into<String>) -> Self {
        self.config_group = Some((group.into(), setting.into()));
        self
    }

    /// Sets the exposure in milliseconds.
    #[must_use]
    pub fn with_exposure(mut self, exposure_ms: f64) -> Self {
        self.exposure = Some(exposure_ms);
        self
    }

    /// Returns `true` if the event still carries deprecated `row`/`col` fields.
    #[inline]
    #[must_use]
    pub fn has_deprecated_fields(&self) -> bool {
        self.row.is_some() || self.col.is_some()
    }
}

/// Events submitted together in a single call.
///
/// A batch built from a single event remembers that it was single so the
/// caller's shape is preserved through validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventBatch {
    /// A single event.
    Single(AcquisitionEvent),
    /// An ordered list of events.
    Many(Vec<AcquisitionEvent>),
}

impl EventBatch {
    /// Number of events in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Many(events) => events.len(),
        }
    }

    /// Returns `true` if the batch holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the events in submission order.
    pub fn iter(&self) -> std::slice::Iter<'_, AcquisitionEvent> {
        match self {
            Self::Single(event) => std::slice::from_ref(event).iter(),
            Self::Many(events) => events.iter(),
        }
    }

    /// Iterates mutably over the events in submission order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, AcquisitionEvent> {
        match self {
            Self::Single(event) => std::slice::from_mut(event).iter_mut(),
            Self::Many(events) => events.iter_mut(),
        }
    }

    /// Collects the axes of every event, in order.
    #[must_use]
    pub fn axes(&self) -> Vec<Axes> {
        self.iter().map(|e| e.axes.clone()).collect()
    }

    /// Flattens the batch into a list of events.
    #[must_use]
    pub fn into_events(self) -> Vec<AcquisitionEvent> {
        match self {
            Self::Single(event) => vec![event],
            Self::Many(events) => events,
        }
    }
}

impl From<AcquisitionEvent> for EventBatch {
    fn from(event: AcquisitionEvent) -> Self {
        Self::Single(event)
    }
}

impl From<Vec<AcquisitionEvent>> for EventBatch {
    fn from(events: Vec<AcquisitionEvent>) -> Self {
        Self::Many(events)
    }
}
