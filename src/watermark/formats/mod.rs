pub mod jpeg;
pub mod png;

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::{debug, warn};

use super::error::WatermarkError;

/// Quality used for lossy encoders. Not configurable.
pub const JPEG_QUALITY: u8 = 95;

/// Formats the watermarked output can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Bmp,
    Gif,
    Tiff,
    WebP,
}

impl OutputFormat {
    /// Lossless format used whenever the preferred one cannot be written.
    pub const FALLBACK: OutputFormat = OutputFormat::Png;

    /// The encoder matching a decoded source format, if there is one.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::Bmp => Some(OutputFormat::Bmp),
            ImageFormat::Gif => Some(OutputFormat::Gif),
            ImageFormat::Tiff => Some(OutputFormat::Tiff),
            ImageFormat::WebP => Some(OutputFormat::WebP),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Gif => "gif",
            OutputFormat::Tiff => "tiff",
            OutputFormat::WebP => "webp",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Gif => ImageFormat::Gif,
            OutputFormat::Tiff => ImageFormat::Tiff,
            OutputFormat::WebP => ImageFormat::WebP,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Bmp => "image/bmp",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Tiff => "image/tiff",
            OutputFormat::WebP => "image/webp",
        }
    }
}

/// Encoded image bytes and the format they ended up in.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
}

/// Encode `image` in exactly `format`.
pub fn encode(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, WatermarkError> {
    let mut buffer = Cursor::new(Vec::new());
    let result = match format {
        OutputFormat::Jpeg => jpeg::encode(image, &mut buffer, JPEG_QUALITY),
        OutputFormat::Png => png::encode(image, &mut buffer),
        // WebP goes through the lossless encoder
        other => image.write_to(&mut buffer, other.image_format()),
    };
    result.map_err(|source| WatermarkError::EncodeError { format, source })?;
    Ok(buffer.into_inner())
}

/// Encode in the format matching `preferred`, falling back to
/// [`OutputFormat::FALLBACK`] when there is no encoder for it or the
/// encoder fails. Errors only if the fallback fails too.
pub fn encode_preferred(
    image: &DynamicImage,
    preferred: Option<ImageFormat>,
) -> Result<Encoded, WatermarkError> {
    let target = match preferred.and_then(OutputFormat::from_image_format) {
        Some(format) => format,
        None => {
            debug!(
                "No encoder for {:?}, using {:?}",
                preferred,
                OutputFormat::FALLBACK
            );
            OutputFormat::FALLBACK
        }
    };

    match encode(image, target) {
        Ok(bytes) => Ok(Encoded {
            bytes,
            format: target,
        }),
        Err(e) if target != OutputFormat::FALLBACK => {
            warn!("{}; falling back to {:?}", e, OutputFormat::FALLBACK);
            let bytes = encode(image, OutputFormat::FALLBACK)?;
            Ok(Encoded {
                bytes,
                format: OutputFormat::FALLBACK,
            })
        }
        Err(e) => Err(e),
    }
}
