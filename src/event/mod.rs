/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Event data model.
//!
//! This module defines the records exchanged with the acquisition engine:
//! axis coordinate sets, acquisition events and engine notifications, plus
//! the validator run on every submission.

pub mod axes;
pub mod notification;
pub mod record;
pub mod validate;

pub use axes::{
    AxisValue, Axes, CHANNEL_AXIS, COLUMN_AXIS, POSITION_AXIS, ROW_AXIS, TIME_AXIS, Z_AXIS,
};
pub use notification::{AcqNotification, DatasetRef, NotificationKind, Stages};
pub use record::{AcquisitionEvent, EventBatch};
pub use validate::{
    DeprecatedField, ValidationError, ValidationWarning, validate, validate_json,
};
