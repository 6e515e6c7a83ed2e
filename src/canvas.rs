use std::fmt;
use std::sync::Arc;

use image::{Rgba, RgbaImage};

// ============================================================================
// PIXEL BUFFER – immutable, shareable decoded raster
// ============================================================================

/// A fully decoded 8-bit RGBA raster (straight alpha).
///
/// The pixels live behind an `Arc`: `clone()` only bumps a reference count, so
/// the same buffer can sit in a session's `current` slot, on an undo stack and
/// inside a background job at once. Nothing ever writes through a
/// `PixelBuffer` after construction; filters always produce a new one.
#[derive(Clone)]
pub struct PixelBuffer {
    pixels: Arc<RgbaImage>,
}

impl PixelBuffer {
    // ---- construction -------------------------------------------------------

    /// Wrap a decoded image. Returns `None` for a zero-sized image.
    pub fn from_rgba_image(img: RgbaImage) -> Option<Self> {
        if img.width() == 0 || img.height() == 0 {
            return None;
        }
        Some(Self { pixels: Arc::new(img) })
    }

    /// Build from raw RGBA bytes (row-major, 4 bytes per pixel).
    /// Returns `None` when the length doesn't match `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, raw: Vec<u8>) -> Option<Self> {
        let img = RgbaImage::from_raw(width, height, raw)?;
        Self::from_rgba_image(img)
    }

    /// A buffer filled with a single color.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Self::from_rgba_image(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    // ---- accessors ----------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// RGBA of the pixel at (x, y), or `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(self.pixels.get_pixel(x, y).0)
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Bytes held by the pixel data (4 per pixel).
    pub fn byte_size(&self) -> usize {
        self.pixels.as_raw().len()
    }

    /// True when both handles share the same underlying pixels.
    pub fn ptr_eq(&self, other: &PixelBuffer) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl PartialEq for PixelBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.dimensions() == other.dimensions() && self.as_raw() == other.as_raw())
    }
}

impl Eq for PixelBuffer {}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
