/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Expansion of a [`MultiDSpec`] into an ordered event sequence.
//!
//! Generation runs in two phases. [`SequencePlan::new`] checks every
//! parameter, including that the total event count is addressable, and
//! captures the per-axis values; nothing is emitted if any check fails. The plan
//! is then traversed as nested loops following the order string, the
//! leftmost letter being the outermost loop. Axes without parameters are
//! skipped and do not consume a nesting level.

use super::order::{AxisKind, AxisOrder};
use super::spec::{MultiDSpec, TimeInterval};
use crate::event::{
    AcquisitionEvent, AxisValue, CHANNEL_AXIS, POSITION_AXIS, TIME_AXIS, Z_AXIS,
};
use thiserror::Error;
use tracing::debug;

/// Slack applied when counting ramp steps so that `0.0..=1.0` by `0.1`
/// yields 11 slices despite binary rounding.
const RAMP_EPSILON: f64 = 1e-9;

/// Errors raised while checking a [`MultiDSpec`].
///
/// All checks run before the first event is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequenceError {
    /// Both `xy_positions` and `xyz_positions` were supplied.
    #[error("xyz_positions and xy_positions are incompatible arguments that cannot be passed together")]
    ConflictingPositions,

    /// The order string places `z` before `p`.
    #[error("order '{order}' must place the position axis 'p' before 'z'")]
    PositionAfterZ {
        /// The offending order string.
        order: String,
    },

    /// The order string contains a letter other than `t`, `p`, `c`, `z`.
    #[error("unknown axis '{letter}' in order; expected a combination of t, p, c and z")]
    UnknownOrderAxis {
        /// The unrecognized letter.
        letter: char,
    },

    /// The order string repeats an axis.
    #[error("axis '{letter}' appears more than once in order")]
    DuplicateOrderAxis {
        /// The repeated letter.
        letter: char,
    },

    /// A per-step time interval list does not match `num_time_points`.
    #[error("length of time interval list ({actual}) should be equal to num_time_points ({expected:?})")]
    TimeIntervalLength {
        /// The configured number of time points.
        expected: Option<usize>,
        /// The length of the interval list.
        actual: usize,
    },

    /// The number of position labels differs from the number of positions.
    #[error("{labels} position labels supplied for {positions} positions")]
    PositionLabelLength {
        /// Number of labels supplied.
        labels: usize,
        /// Number of positions supplied.
        positions: usize,
    },

    /// Only some of `z_start`, `z_end`, `z_step` were supplied.
    #[error("all of z_start, z_step, and z_end must be provided")]
    IncompleteZStack,

    /// `z_step` was zero or not finite.
    #[error("z_step must be a finite, non-zero number (got {step})")]
    InvalidZStep {
        /// The offending step.
        step: f64,
    },

    /// The exposure list does not line up with the channel list.
    #[error("{exposures} channel exposures supplied for {channels} channels")]
    ChannelExposureLength {
        /// Number of channels.
        channels: usize,
        /// Number of exposures.
        exposures: usize,
    },

    /// Per-position z ramps were requested but `p` is missing from the order.
    #[error("z-stacks relative to xyz_positions require 'p' in the order (got '{order}')")]
    RelativeZWithoutPositionAxis {
        /// The offending order string.
        order: String,
    },

    /// The product of the axis lengths does not fit in memory.
    #[error("sequence is too large to generate: the axis lengths multiply past addressable memory")]
    SequenceTooLarge,
}

/// Expands `spec` into its ordered event sequence.
///
/// The output length is the product of the cardinalities of the axes that
/// are both parameterized and present in `spec.order`. Identical inputs
/// always yield identical sequences.
///
/// # Errors
///
/// Returns a [`SequenceError`] describing the first invalid parameter.
///
/// # Examples
///
/// ```
/// use acquisition_rs::sequencer::{generate, MultiDSpec};
///
/// let spec = MultiDSpec::new().time_points(3).time_interval(vec![5.0, 2.0, 3.0]);
/// let starts: Vec<_> = generate(&spec)
///     .unwrap()
///     .iter()
///     .map(|e| e.min_start_time.unwrap())
///     .collect();
/// assert_eq!(starts, vec![5.0, 7.0, 10.0]);
/// ```
pub fn generate(spec: &MultiDSpec) -> Result<Vec<AcquisitionEvent>, SequenceError> {
    let plan = SequencePlan::new(spec)?;
    let mut events = Vec::new();
    events
        .try_reserve_exact(plan.count)
        .map_err(|_| SequenceError::SequenceTooLarge)?;
    plan.expand(0, AcquisitionEvent::default(), None, &mut events);
    debug!(order = %plan.order, count = events.len(), "generated multi-d events");
    Ok(events)
}

/// Alias of [`generate`] named after the public operation it implements.
///
/// # Errors
///
/// See [`generate`].
pub fn multi_d_acquisition_events(
    spec: &MultiDSpec,
) -> Result<Vec<AcquisitionEvent>, SequenceError> {
    generate(spec)
}

/// Checked parameters of each axis.
struct SequencePlan {
    order: AxisOrder,
    time: Option<TimePoints>,
    z: Option<ZSlices>,
    positions: Option<Positions>,
    channels: Option<Channels>,
    /// Number of events the traversal will emit.
    count: usize,
}

struct TimePoints {
    count: usize,
    starts: StartTimes,
}

enum StartTimes {
    /// No minimum start time is set.
    Untimed,
    /// Point `i` starts at `i * interval`.
    Every(f64),
    /// Running sums of the per-step intervals.
    Cumulative(Vec<f64>),
}

impl TimePoints {
    fn start(&self, index: usize) -> Option<f64> {
        match &self.starts {
            StartTimes::Untimed => None,
            StartTimes::Every(interval) => Some(index as f64 * interval),
            StartTimes::Cumulative(starts) => starts.get(index).copied(),
        }
    }
}

/// Relative z offsets `start, start + step, ...`.
#[derive(Clone, Copy)]
struct ZRamp {
    start: f64,
    step: f64,
    count: usize,
}

impl ZRamp {
    fn offset(&self, index: usize) -> f64 {
        self.start + index as f64 * self.step
    }
}

struct ZSlices {
    ramp: ZRamp,
    /// Per-position base z, indexed like the positions. `None` makes the
    /// ramp absolute and shared by all events.
    bases: Option<Vec<f64>>,
}

struct Positions {
    labels: Vec<AxisValue>,
    xy: Vec<[f64; 2]>,
    /// Literal z per position, set only for `xyz_positions` without a z-stack.
    z: Option<Vec<f64>>,
}

struct Channels {
    group: String,
    names: Vec<String>,
    exposures: Option<Vec<f64>>,
}

impl SequencePlan {
    fn new(spec: &MultiDSpec) -> Result<Self, SequenceError> {
        if spec.xy_positions.is_some() && spec.xyz_positions.is_some() {
            return Err(SequenceError::ConflictingPositions);
        }
        let order: AxisOrder = spec.order.parse()?;

        if let TimeInterval::PerStep(intervals) = &spec.time_interval_s {
            if spec.num_time_points != Some(intervals.len()) {
                return Err(SequenceError::TimeIntervalLength {
                    expected: spec.num_time_points,
                    actual: intervals.len(),
                });
            }
        }

        let position_count = spec
            .xy_positions
            .as_ref()
            .map(Vec::len)
            .or_else(|| spec.xyz_positions.as_ref().map(Vec::len));
        if let (Some(labels), Some(positions)) = (&spec.position_labels, position_count) {
            if labels.len() != positions {
                return Err(SequenceError::PositionLabelLength {
                    labels: labels.len(),
                    positions,
                });
            }
        }

        let ramp = match (spec.z_start, spec.z_end, spec.z_step) {
            (None, None, None) => None,
            (Some(start), Some(end), Some(step)) => Some(z_ramp(start, end, step)?),
            _ => return Err(SequenceError::IncompleteZStack),
        };

        let channels = Self::channels(spec)?;

        let z = match (ramp, &spec.xyz_positions) {
            (None, _) => None,
            (Some(ramp), None) => Some(ZSlices { ramp, bases: None }),
            (Some(ramp), Some(xyz)) => {
                if order.contains(AxisKind::Z) && !order.contains(AxisKind::Position) {
                    return Err(SequenceError::RelativeZWithoutPositionAxis {
                        order: spec.order.clone(),
                    });
                }
                Some(ZSlices {
                    ramp,
                    bases: Some(xyz.iter().map(|p| p[2]).collect()),
                })
            }
        };

        let positions = match (&spec.xy_positions, &spec.xyz_positions) {
            (Some(xy), _) => Some(Positions {
                labels: Self::labels(spec, xy.len()),
                xy: xy.clone(),
                z: None,
            }),
            (None, Some(xyz)) => Some(Positions {
                labels: Self::labels(spec, xyz.len()),
                xy: xyz.iter().map(|p| [p[0], p[1]]).collect(),
                z: ramp.is_none().then(|| xyz.iter().map(|p| p[2]).collect()),
            }),
            (None, None) => None,
        };

        let mut plan = Self {
            order,
            time: Self::time_points(spec),
            z,
            positions,
            channels,
            count: 0,
        };
        plan.count = plan.event_count()?;
        Ok(plan)
    }

    fn time_points(spec: &MultiDSpec) -> Option<TimePoints> {
        let count = spec.num_time_points.filter(|n| *n > 0)?;
        let starts = match &spec.time_interval_s {
            TimeInterval::PerStep(intervals) => StartTimes::Cumulative(
                intervals
                    .iter()
                    .scan(0.0, |elapsed, dt| {
                        *elapsed += dt;
                        Some(*elapsed)
                    })
                    .collect(),
            ),
            TimeInterval::Fixed(interval) if *interval == 0.0 => StartTimes::Untimed,
            TimeInterval::Fixed(interval) => StartTimes::Every(*interval),
        };
        Some(TimePoints { count, starts })
    }

    fn channels(spec: &MultiDSpec) -> Result<Option<Channels>, SequenceError> {
        let (Some(group), Some(names)) = (&spec.channel_group, &spec.channels) else {
            return Ok(None);
        };
        if let Some(exposures) = &spec.channel_exposures_ms {
            if exposures.len() != names.len() {
                return Err(SequenceError::ChannelExposureLength {
                    channels: names.len(),
                    exposures: exposures.len(),
                });
            }
        }
        Ok(Some(Channels {
            group: group.clone(),
            names: names.clone(),
            exposures: spec.channel_exposures_ms.clone(),
        }))
    }

    fn labels(spec: &MultiDSpec, count: usize) -> Vec<AxisValue> {
        spec.position_labels
            .clone()
            .unwrap_or_else(|| (0..count).map(AxisValue::from).collect())
    }

    /// Product of the cardinalities of the ordered axes.
    fn event_count(&self) -> Result<usize, SequenceError> {
        self.order
            .axes()
            .iter()
            .map(|axis| match axis {
                AxisKind::Time => self.time.as_ref().map_or(1, |t| t.count),
                AxisKind::Position => self.positions.as_ref().map_or(1, |p| p.xy.len()),
                AxisKind::Channel => self.channels.as_ref().map_or(1, |c| c.names.len()),
                AxisKind::Z => self.z.as_ref().map_or(1, |z| z.ramp.count),
            })
            .try_fold(1usize, usize::checked_mul)
            .ok_or(SequenceError::SequenceTooLarge)
    }

    /// Emits every event below nesting level `depth` into `out`.
    ///
    /// `position` is the index of the stage position chosen by an enclosing
    /// position loop, used to pick that position's base z.
    fn expand(
        &self,
        depth: usize,
        event: AcquisitionEvent,
        position: Option<usize>,
        out: &mut Vec<AcquisitionEvent>,
    ) {
        let Some(axis) = self.order.axes().get(depth) else {
            out.push(event);
            return;
        };
        let next = depth + 1;

        match axis {
            AxisKind::Time => match &self.time {
                Some(time) => {
                    for index in 0..time.count {
                        let mut e = event.clone();
                        e.axes.insert(TIME_AXIS, index);
                        if let Some(start) = time.start(index) {
                            e.min_start_time = Some(start);
                        }
                        self.expand(next, e, position, out);
                    }
                }
                None => self.expand(next, event, position, out),
            },
            AxisKind::Z => {
                let slices = self.z.as_ref().and_then(|z| match &z.bases {
                    None => Some((z.ramp, None)),
                    Some(bases) => position
                        .and_then(|p| bases.get(p))
                        .map(|base| (z.ramp, Some(*base))),
                });
                match slices {
                    Some((ramp, base)) => {
                        for index in 0..ramp.count {
                            let offset = ramp.offset(index);
                            let mut e = event.clone();
                            e.axes.insert(Z_AXIS, index);
                            e.z = Some(base.map_or(offset, |b| b + offset));
                            self.expand(next, e, position, out);
                        }
                    }
                    None => self.expand(next, event, position, out),
                }
            }
            AxisKind::Position => match &self.positions {
                Some(positions) => {
                    for (index, (label, [x, y])) in
                        positions.labels.iter().zip(&positions.xy).enumerate()
                    {
                        let mut e = event.clone();
                        e.axes.insert(POSITION_AXIS, label.clone());
                        e.x = Some(*x);
                        e.y = Some(*y);
                        if let Some(z) = positions.z.as_ref().and_then(|z| z.get(index)) {
                            e.z = Some(*z);
                        }
                        self.expand(next, e, Some(index), out);
                    }
                }
                None => self.expand(next, event, position, out),
            },
            AxisKind::Channel => match &self.channels {
                Some(channels) => {
                    for (index, name) in channels.names.iter().enumerate() {
                        let mut e = event.clone();
                        e.config_group = Some((channels.group.clone(), name.clone()));
                        e.axes.insert(CHANNEL_AXIS, name.as_str());
                        if let Some(exposure) =
                            channels.exposures.as_ref().and_then(|x| x.get(index))
                        {
                            e.exposure = Some(*exposure);
                        }
                        self.expand(next, e, position, out);
                    }
                }
                None => self.expand(next, event, position, out),
            },
        }
    }
}

/// Counts the relative z ramp `start, start + step, ...` up to and
/// including `end` when it is reachable by whole steps.
fn z_ramp(start: f64, end: f64, step: f64) -> Result<ZRamp, SequenceError> {
    if step == 0.0 || !step.is_finite() {
        return Err(SequenceError::InvalidZStep { step });
    }
    let steps = ((end + step - start) / step - RAMP_EPSILON).ceil();
    // Saturates for unbounded ranges; the event count check rejects them.
    let count = if steps > 0.0 { steps as usize } else { 0 };
    Ok(ZRamp { start, step, count })
}
