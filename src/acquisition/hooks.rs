/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! User hooks.
//!
//! Every hook has one fixed shape; arguments a hook does not need are
//! simply ignored by its implementation.

use super::engine::EventQueueHandle;
use super::error::HookError;
use crate::event::{Axes, DatasetRef};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Metadata attached to an image.
pub type ImageMetadata = Map<String, Value>;

/// Raw image pixels as delivered by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Image {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major pixel values.
    pub pixels: Vec<u16>,
}

/// An image together with its metadata.
pub type TaggedImage = (Image, ImageMetadata);

/// Processes each acquired image before it is saved.
///
/// Returns the images to save in place of the input: none to drop it, one
/// to replace it, several to fan it out. An `Err` aborts the acquisition.
pub trait ImageProcessor: Send + Sync {
    /// Processes one image.
    ///
    /// # Errors
    ///
    /// Returns a [`HookError`] to abort the acquisition.
    fn process(
        &self,
        image: Image,
        metadata: ImageMetadata,
        queue: &EventQueueHandle,
    ) -> Result<Vec<TaggedImage>, HookError>;
}

impl<F> ImageProcessor for F
where
    F: Fn(Image, ImageMetadata, &EventQueueHandle) -> Result<Vec<TaggedImage>, HookError>
        + Send
        + Sync,
{
    fn process(
        &self,
        image: Image,
        metadata: ImageMetadata,
        queue: &EventQueueHandle,
    ) -> Result<Vec<TaggedImage>, HookError> {
        self(image, metadata, queue)
    }
}

/// Called on the dispatcher thread whenever an image has been saved.
pub type ImageSavedCallback = Arc<dyn Fn(&Axes, &DatasetRef, &EventQueueHandle) + Send + Sync>;
