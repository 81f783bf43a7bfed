//! Image decoding for the transcoding pipeline.
//!
//! This module provides functionality for:
//! - Decoding any raster format the `image` crate is built with
//! - Using the caller's declared MIME type as a hint, with signature sniffing
//! - Applying EXIF orientation the way browsers do when drawing an image
//! - Refusing oversized images from their header, before a full decode

mod raster;
mod types;

pub use raster::{decode_surface, extract_orientation};
pub use types::{DecodeError, DecodedSurface, Orientation, PixelLayout};
