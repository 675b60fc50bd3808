/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Multi-dimensional acquisition parameters.
//!
//! A [`MultiDSpec`] is the compact description expanded by
//! [`generate`](super::generate) into an ordered event sequence. Every
//! axis is optional; an axis whose parameters are absent is skipped.

use super::generate::{SequenceError, generate};
use crate::event::{AcquisitionEvent, AxisValue};
use serde::{Deserialize, Serialize};

/// Default traversal order: time, position, channel, z.
pub const DEFAULT_ORDER: &str = "tpcz";

/// Interval between consecutive time points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeInterval {
    /// Same interval for every time point, in seconds. Zero means as fast
    /// as possible.
    Fixed(f64),
    /// One interval per time point, in seconds. The first element is the
    /// delay before the very first image.
    PerStep(Vec<f64>),
}

impl Default for TimeInterval {
    fn default() -> Self {
        Self::Fixed(0.0)
    }
}

impl From<f64> for TimeInterval {
    fn from(seconds: f64) -> Self {
        Self::Fixed(seconds)
    }
}

impl From<Vec<f64>> for TimeInterval {
    fn from(seconds: Vec<f64>) -> Self {
        Self::PerStep(seconds)
    }
}

/// Parameters of a multi-dimensional acquisition.
///
/// # Examples
///
/// ```
/// use acquisition_rs::sequencer::MultiDSpec;
///
/// let events = MultiDSpec::new()
///     .time_points(3)
///     .channels("Channel", ["DAPI", "FITC"])
///     .z_stack(0.0, 3.0, 1.0)
///     .order("tcz")
///     .generate()
///     .unwrap();
/// assert_eq!(events.len(), 24);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiDSpec {
    /// Number of time points; `None` or zero disables the time axis.
    pub num_time_points: Option<usize>,
    /// Interval between time points.
    pub time_interval_s: TimeInterval,
    /// First z position, relative to each position's z when `xyz_positions` is set.
    pub z_start: Option<f64>,
    /// Last z position, relative to each position's z when `xyz_positions` is set.
    pub z_end: Option<f64>,
    /// Step between z positions.
    pub z_step: Option<f64>,
    /// Configuration group the channels belong to.
    pub channel_group: Option<String>,
    /// Channel names, settings of `channel_group`.
    pub channels: Option<Vec<String>>,
    /// Exposure per channel in milliseconds, aligned with `channels`.
    pub channel_exposures_ms: Option<Vec<f64>>,
    /// `(x, y)` stage positions.
    pub xy_positions: Option<Vec<[f64; 2]>>,
    /// `(x, y, z)` stage positions.
    pub xyz_positions: Option<Vec<[f64; 3]>>,
    /// One label per stage position; defaults to `0..N`.
    pub position_labels: Option<Vec<AxisValue>>,
    /// Axis letters from outermost to innermost loop.
    pub order: String,
}

impl Default for MultiDSpec {
    fn default() -> Self {
        Self {
            num_time_points: None,
            time_interval_s: TimeInterval::default(),
            z_start: None,
            z_end: None,
            z_step: None,
            channel_group: None,
            channels: None,
            channel_exposures_ms: None,
            xy_positions: None,
            xyz_positions: None,
            position_labels: None,
            order: DEFAULT_ORDER.to_string(),
        }
    }
}

impl MultiDSpec {
    /// Creates an empty spec with the default order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of time points.
    #[must_use]
    pub fn time_points(mut self, count: usize) -> Self {
        self.num_time_points = Some(count);
        self
    }

    /// Sets the time interval (fixed or per step).
    #[must_use]
    pub fn time_interval(mut self, interval: impl Into<TimeInterval>) -> Self {
        self.time_interval_s = interval.into();
        self
    }

    /// Sets all three z-stack parameters.
    #[must_use]
    pub fn z_stack(mut self, start: f64, end: f64, step: f64) -> Self {
        self.z_start = Some(start);
        self.z_end = Some(end);
        self.z_step = Some(step);
        self
    }

    /// Sets the channel group and channel names.
    #[must_use]
    pub fn channels<I, S>(mut self, group: impl Into<String>, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channel_group = Some(group.into());
        self.channels = Some(channels.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the per-channel exposures in milliseconds.
    #[must_use]
    pub fn exposures(mut self, exposures_ms: impl Into<Vec<f64>>) -> Self {
        self.channel_exposures_ms = Some(exposures_ms.into());
        self
    }

    /// Sets `(x, y)` stage positions.
    #[must_use]
    pub fn xy_positions(mut self, positions: impl Into<Vec<[f64; 2]>>) -> Self {
        self.xy_positions = Some(positions.into());
        self
    }

    /// Sets `(x, y, z)` stage positions.
    #[must_use]
    pub fn xyz_positions(mut self, positions: impl Into<Vec<[f64; 3]>>) -> Self {
        self.xyz_positions = Some(positions.into());
        self
    }

    /// Sets the position labels.
    #[must_use]
    pub fn position_labels<I, L>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<AxisValue>,
    {
        self.position_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the traversal order.
    #[must_use]
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = order.into();
        self
    }

    /// Parses a spec from JSON.
    ///
    /// # Errors
    ///
    /// Returns the deserializer error if `json` is not a valid spec.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Expands this spec into its event sequence.
    ///
    /// # Errors
    ///
    /// See [`generate`](super::generate).
    pub fn generate(&self) -> Result<Vec<AcquisitionEvent>, SequenceError> {
        generate(self)
    }
}
