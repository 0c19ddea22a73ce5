use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Where the request's image came from, resolved once at the boundary.
#[derive(Debug)]
pub enum ImageSource {
    Upload {
        filename: Option<String>,
        bytes: Vec<u8>,
    },
    Base64(String),
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("No image found")]
    NoImage,
    #[error("invalid base64 image data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Local directory that uploaded images are written to before inference.
/// Files are retained after the request completes; there is no cleanup pass.
#[derive(Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Writes the image bytes under a fresh v4 UUID name and returns the path.
    /// Unique names mean concurrent workers cannot collide on the directory.
    pub fn persist(&self, source: ImageSource) -> Result<PathBuf, IntakeError> {
        let (bytes, extension) = match source {
            ImageSource::Upload { filename, bytes } => {
                let extension = filename
                    .as_deref()
                    .and_then(file_extension)
                    .unwrap_or("jpg")
                    .to_string();
                (bytes, extension)
            }
            ImageSource::Base64(encoded) => {
                (decode_base64_image(&encoded)?, "jpg".to_string())
            }
        };

        let path = self.dir.join(format!("{}.{}", Uuid::new_v4(), extension));
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

fn file_extension(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|ext| ext.to_str())
}

/// Decodes a base64 image payload, tolerating a data-URL prefix
/// such as `data:image/jpeg;base64,<payload>`.
pub fn decode_base64_image(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = encoded.rsplit(',').next().unwrap_or(encoded);
    BASE64.decode(payload.trim())
}
