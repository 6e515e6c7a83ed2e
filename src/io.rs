use image::ImageError;
use image::codecs::png::PngEncoder;
use image::ImageEncoder;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::canvas::PixelBuffer;

/// Suffix inserted before the extension of a saved, filtered image.
pub const DEFAULT_FILTERED_SUFFIX: &str = "_filtered";

/// Extensions offered when opening images (lowercase).
pub const OPEN_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

// ============================================================================
// ERRORS
// ============================================================================

/// Error type for image decode / encode / write operations
#[derive(Debug)]
pub enum ImageIoError {
    /// The source file is unreadable, corrupt, or not a supported raster.
    Decode { path: PathBuf, reason: String },
    /// The buffer could not be encoded as PNG.
    Encode(String),
    Io(std::io::Error),
}

impl fmt::Display for ImageIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageIoError::Decode { path, reason } => {
                write!(f, "Cannot decode '{}': {}", path.display(), reason)
            }
            ImageIoError::Encode(e) => write!(f, "Encode error: {}", e),
            ImageIoError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ImageIoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageIoError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ImageIoError {
    fn from(e: std::io::Error) -> Self {
        ImageIoError::Io(e)
    }
}

impl ImageIoError {
    pub fn is_decode(&self) -> bool {
        matches!(self, ImageIoError::Decode { .. })
    }
}

// ============================================================================
// DECODE
// ============================================================================

/// Synchronously decode any supported raster file to an RGBA buffer.
pub fn decode_image(path: &Path) -> Result<PixelBuffer, ImageIoError> {
    let decode_err = |reason: String| ImageIoError::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let img = image::open(path).map_err(|e| decode_err(e.to_string()))?.to_rgba8();
    PixelBuffer::from_rgba_image(img).ok_or_else(|| decode_err("image has no pixels".into()))
}

// ============================================================================
// ENCODE / WRITE
// ============================================================================

/// Encode a buffer into a PNG container.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, ImageIoError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            buffer.as_raw(),
            buffer.width(),
            buffer.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e: ImageError| ImageIoError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Write `bytes` to `path`, creating the parent directory on demand.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), ImageIoError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

/// Encode and write a buffer as PNG.
/// This is a standalone function so it can be called from background threads.
pub fn save_png(buffer: &PixelBuffer, path: &Path) -> Result<(), ImageIoError> {
    let bytes = encode_png(buffer)?;
    write_bytes(path, &bytes)
}

// ============================================================================
// OUTPUT NAMING
// ============================================================================

/// Insert `suffix` before the extension: `photo.png` → `photo_filtered.png`.
/// Names without an extension (or dot-files) get the suffix appended.
pub fn filtered_file_name(name: &str, suffix: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}{}{}", &name[..dot], suffix, &name[dot..]),
        _ => format!("{}{}", name, suffix),
    }
}

/// Where a filtered copy of `source_name` lands inside `output_dir`.
pub fn filtered_output_path(output_dir: &Path, source_name: &str, suffix: &str) -> PathBuf {
    output_dir.join(filtered_file_name(source_name, suffix))
}

/// Display name for an image path (its file name).
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Default per-run output directory: `<home>/ProcessedImages`.
pub fn default_output_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    home.join("ProcessedImages")
}

/// Whether `path` carries one of the extensions offered when opening images.
pub fn has_open_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| OPEN_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
