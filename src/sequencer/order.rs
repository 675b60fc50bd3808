/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Axis traversal order.

use super::generate::SequenceError;
use std::fmt;
use std::str::FromStr;

/// One of the axes the sequencer knows how to expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    /// `t`: time points.
    Time,
    /// `p`: stage positions.
    Position,
    /// `c`: channels.
    Channel,
    /// `z`: z-stack slices.
    Z,
}

impl AxisKind {
    /// Letter used for this axis in an order string.
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Self::Time => 't',
            Self::Position => 'p',
            Self::Channel => 'c',
            Self::Z => 'z',
        }
    }

    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            't' => Some(Self::Time),
            'p' => Some(Self::Position),
            'c' => Some(Self::Channel),
            'z' => Some(Self::Z),
            _ => None,
        }
    }
}

/// Nesting order of the axes, outermost first.
///
/// Letters are case-insensitive. Each of `t`, `p`, `c`, `z` may appear at
/// most once and `p` must come before `z`.
///
/// # Examples
///
/// ```
/// use acquisition_rs::sequencer::{AxisKind, AxisOrder};
///
/// let order: AxisOrder = "TPz".parse().unwrap();
/// assert_eq!(order.axes(), &[AxisKind::Time, AxisKind::Position, AxisKind::Z]);
/// assert!("zp".parse::<AxisOrder>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisOrder(Vec<AxisKind>);

impl AxisOrder {
    /// Axes from outermost to innermost.
    #[must_use]
    pub fn axes(&self) -> &[AxisKind] {
        &self.0
    }

    /// Returns `true` if `axis` appears in the order.
    #[must_use]
    pub fn contains(&self, axis: AxisKind) -> bool {
        self.0.contains(&axis)
    }

    fn position_of(&self, axis: AxisKind) -> Option<usize> {
        self.0.iter().position(|a| *a == axis)
    }
}

impl FromStr for AxisOrder {
    type Err = SequenceError;

    fn from_str(order: &str) -> Result<Self, Self::Err> {
        let mut axes = Vec::with_capacity(4);
        for letter in order.chars().map(|c| c.to_ascii_lowercase()) {
            let axis =
                AxisKind::from_letter(letter).ok_or(SequenceError::UnknownOrderAxis { letter })?;
            if axes.contains(&axis) {
                return Err(SequenceError::DuplicateOrderAxis { letter });
            }
            axes.push(axis);
        }

        let parsed = Self(axes);
        let p = parsed.position_of(AxisKind::Position);
        let z = parsed.position_of(AxisKind::Z);
        if matches!((p, z), (Some(p), Some(z)) if p > z) {
            return Err(SequenceError::PositionAfterZ {
                order: order.to_string(),
            });
        }
        Ok(parsed)
    }
}

impl fmt::Display for AxisOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in &self.0 {
            write!(f, "{}", axis.letter())?;
        }
        Ok(())
    }
}
