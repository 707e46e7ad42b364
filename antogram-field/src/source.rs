use crate::{ContentDescriptor, FieldError};
use image::RgbaImage;
use log::debug;
use std::path::PathBuf;

/// Resolved content, ready for the field builder.
#[derive(Debug, Clone)]
pub enum FieldContent {
    Text(String),
    Image(RgbaImage),
}

/// Turns a descriptor into drawable content.
///
/// Implementations may block (file or network access), so callers run them
/// off the tick thread.
pub trait FieldSource: Send {
    fn fetch(&self, descriptor: &ContentDescriptor) -> Result<FieldContent, FieldError>;
}

/// Resolves text directly and images from local paths or `data:` URLs.
#[derive(Debug, Clone, Default)]
pub struct LocalFieldSource {
    base_dir: Option<PathBuf>,
}

impl LocalFieldSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relative image paths are resolved against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve_path(&self, reference: &str) -> PathBuf {
        let path = PathBuf::from(reference.strip_prefix("file://").unwrap_or(reference));
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}

impl FieldSource for LocalFieldSource {
    fn fetch(&self, descriptor: &ContentDescriptor) -> Result<FieldContent, FieldError> {
        descriptor.validate()?;
        match descriptor {
            ContentDescriptor::Text(text) => Ok(FieldContent::Text(text.clone())),
            ContentDescriptor::Image(reference) => {
                if let Some(rest) = reference.strip_prefix("data:") {
                    let (_, payload) = rest.split_once(";base64,").ok_or_else(|| {
                        FieldError::Unavailable("only base64 data URLs are supported".to_string())
                    })?;
                    let bytes = base64::decode(payload.trim())
                        .map_err(|e| FieldError::Unavailable(format!("bad data URL: {}", e)))?;
                    return decode_image(&bytes).map(FieldContent::Image);
                }
                if reference.starts_with("http://") || reference.starts_with("https://") {
                    return Err(FieldError::Unavailable(format!(
                        "remote image {} cannot be fetched by a local source",
                        reference
                    )));
                }

                let path = self.resolve_path(reference);
                debug!("Loading image field from {}", path.display());
                let bytes = std::fs::read(&path)?;
                decode_image(&bytes).map(FieldContent::Image)
            }
        }
    }
}

/// Decodes any supported bitmap format into RGBA.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, FieldError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}
