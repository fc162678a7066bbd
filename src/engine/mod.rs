//! Codec engine abstraction
//!
//! The pipeline drives an external codec through this trait: decode once,
//! mutate the in-flight image (format, quality, resize), encode as often
//! as the quality search requires, then release. An engine holds at most
//! one in-flight image and is not safe for concurrent transforms.

pub mod image_rs;

pub use image_rs::ImageRsEngine;

use crate::error::RepixError;
use crate::options::OutputFormat;

/// Capability set the transform pipeline consumes.
///
/// Encoding must be deterministic for a fixed (image, format, quality)
/// triple; the quality search relies on it.
pub trait CodecEngine {
    /// Load source bytes as the in-flight image, returning its dimensions
    fn decode(&mut self, data: &[u8]) -> Result<(u32, u32), RepixError>;

    /// Set the output format for subsequent encodes
    fn set_format(&mut self, format: OutputFormat) -> Result<(), RepixError>;

    /// Set the compression quality (1-100) for subsequent encodes
    fn set_quality(&mut self, quality: u8) -> Result<(), RepixError>;

    /// Scale the in-flight image to fit within (width, height) preserving
    /// aspect ratio; returns the actual output dimensions
    fn resize_best_fit(&mut self, width: u32, height: u32) -> Result<(u32, u32), RepixError>;

    /// Scale and center-crop the in-flight image to exactly (width, height)
    fn resize_exact(&mut self, width: u32, height: u32) -> Result<(), RepixError>;

    /// Encode the in-flight image at the current format and quality
    fn encode(&mut self) -> Result<Vec<u8>, RepixError>;

    /// Drop the in-flight image so the engine can be reused
    fn release(&mut self);
}
