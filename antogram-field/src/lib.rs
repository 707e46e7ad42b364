//! Target field preparation: turns a text message or a bitmap into colored
//! bits plus the jobs and destinations the swarm works through.

pub mod builder;
pub mod descriptor;
pub mod font;
pub mod raster;
pub mod source;

pub use builder::{FieldBuilder, SamplePoint, TextLayout};
pub use descriptor::{ContentDescriptor, MAX_IMAGE_REF_LEN, MAX_TEXT_LEN};
pub use font::BitmapFontRasterizer;
pub use raster::{RasterBuffer, TextRasterizer};
pub use source::{decode_image, FieldContent, FieldSource, LocalFieldSource};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FieldError {
    #[error("Text message exceeds {max} characters ({len})")]
    TextTooLong { len: usize, max: usize },

    #[error("Image reference exceeds {max} characters ({len})")]
    ImageRefTooLong { len: usize, max: usize },

    #[error("Invalid content id: {0}")]
    InvalidId(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Field content unavailable: {0}")]
    Unavailable(String),
}
