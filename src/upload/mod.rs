// Image upload module
// Reads PNG/JPEG files and reports what was loaded


use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, ImageReader};
use tracing::debug;

use crate::{DescriptionsError, Result};

/// File extensions accepted for upload, compared case-insensitively
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// An image loaded into memory, ready to be described
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl UploadedImage {
    /// Reads an image from disk. The extension must be one of
    /// [`ACCEPTED_EXTENSIONS`] and the content must decode as PNG or JPEG.
    #[inline]
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(DescriptionsError::Image(format!(
                "Unsupported file type for {} (expected one of: {})",
                path.display(),
                ACCEPTED_EXTENSIONS.join(", ")
            )));
        }

        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_bytes(file_name, bytes)
    }

    /// Wraps already loaded bytes, detecting format and dimensions
    #[inline]
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        let reader = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| DescriptionsError::Image(format!("Failed to read {}: {}", file_name, e)))?;

        let format = match reader.format() {
            Some(format @ (ImageFormat::Png | ImageFormat::Jpeg)) => format,
            Some(other) => {
                return Err(DescriptionsError::Image(format!(
                    "{} is {:?}, only PNG and JPEG are supported",
                    file_name, other
                )));
            }
            None => {
                return Err(DescriptionsError::Image(format!(
                    "{} is not a recognizable image",
                    file_name
                )));
            }
        };

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| DescriptionsError::Image(format!("Failed to decode {}: {}", file_name, e)))?;

        debug!("Loaded {} ({:?}, {}x{})", file_name, format, width, height);

        Ok(Self {
            file_name,
            bytes,
            format,
            width,
            height,
        })
    }

    #[inline]
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// One-line summary shown after loading, e.g. `cat.png (PNG, 10x10, 75 bytes)`
    #[inline]
    pub fn preview_line(&self) -> String {
        let format = match self.format {
            ImageFormat::Jpeg => "JPEG",
            _ => "PNG",
        };
        format!(
            "{} ({}, {}x{}, {} bytes)",
            self.file_name,
            format,
            self.width,
            self.height,
            self.bytes.len()
        )
    }
}
