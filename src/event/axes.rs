/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Axis coordinate types.
//!
//! An [`Axes`] set maps axis names (`"time"`, `"z"`, `"channel"`,
//! `"position"` or any user-defined key) to an [`AxisValue`]. The map is
//! ordered so that two sets built in different insertion orders compare,
//! hash and serialize identically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Axis name for time points.
pub const TIME_AXIS: &str = "time";
/// Axis name for z-stack slices.
pub const Z_AXIS: &str = "z";
/// Axis name for channels.
pub const CHANNEL_AXIS: &str = "channel";
/// Axis name for stage positions.
pub const POSITION_AXIS: &str = "position";
/// Axis name for grid rows.
pub const ROW_AXIS: &str = "row";
/// Axis name for grid columns.
pub const COLUMN_AXIS: &str = "column";

/// Value of a single axis: an integer index or a string label.
///
/// # Examples
///
/// ```
/// use acquisition_rs::event::AxisValue;
///
/// assert_eq!(AxisValue::from(3), AxisValue::Index(3));
/// assert_eq!(AxisValue::from("DAPI"), AxisValue::Label("DAPI".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisValue {
    /// Integer index along the axis.
    Index(i64),
    /// Named coordinate, e.g. a channel or position label.
    Label(String),
}

impl AxisValue {
    /// Returns the index if this value is an [`AxisValue::Index`].
    #[inline]
    #[must_use]
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Label(_) => None,
        }
    }

    /// Returns the label if this value is an [`AxisValue::Label`].
    #[inline]
    #[must_use]
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Index(_) => None,
            Self::Label(s) => Some(s),
        }
    }
}

impl fmt::Display for AxisValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Label(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for AxisValue {
    fn from(value: i64) -> Self {
        Self::Index(value)
    }
}

impl From<i32> for AxisValue {
    fn from(value: i32) -> Self {
        Self::Index(i64::from(value))
    }
}

impl From<usize> for AxisValue {
    fn from(value: usize) -> Self {
        Self::Index(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for AxisValue {
    fn from(value: &str) -> Self {
        Self::Label(value.to_string())
    }
}

impl From<String> for AxisValue {
    fn from(value: String) -> Self {
        Self::Label(value)
    }
}

/// A set of axis coordinates identifying one image of an acquisition.
///
/// Keys are unique; iteration is in key order.
///
/// # Examples
///
/// ```
/// use acquisition_rs::event::Axes;
///
/// let a = Axes::new().with("time", 0).with("channel", "DAPI");
/// let b = Axes::new().with("channel", "DAPI").with("time", 0);
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Axes(BTreeMap<String, AxisValue>);

impl Axes {
    /// Creates an empty axis set.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, axis: impl Into<String>, value: impl Into<AxisValue>) -> Self {
        self.insert(axis, value);
        self
    }

    /// Sets `axis` to `value`, returning the previous value if any.
    pub fn insert(
        &mut self,
        axis: impl Into<String>,
        value: impl Into<AxisValue>,
    ) -> Option<AxisValue> {
        self.0.insert(axis.into(), value.into())
    }

    /// Returns the value of `axis`.
    #[must_use]
    pub fn get(&self, axis: &str) -> Option<&AxisValue> {
        self.0.get(axis)
    }

    /// Returns `true` if `axis` is present.
    #[must_use]
    pub fn contains(&self, axis: &str) -> bool {
        self.0.contains_key(axis)
    }

    /// Number of axes in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set holds no axes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the axis names in key order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over `(name, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AxisValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for Axes
where
    K: Into<String>,
    V: Into<AxisValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Axes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}
