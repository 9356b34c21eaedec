use image::{DynamicImage, ImageEncoder, codecs::jpeg::JpegEncoder};
use std::io::Write;

/// Encode as JPEG. JPEG has no alpha channel, so the image is flattened to RGB.
pub fn encode<W: Write>(image: &DynamicImage, output: W, quality: u8) -> image::ImageResult<()> {
    let rgb_image = image.to_rgb8();
    let encoder = JpegEncoder::new_with_quality(output, quality);
    encoder.write_image(
        &rgb_image,
        rgb_image.width(),
        rgb_image.height(),
        image::ExtendedColorType::Rgb8,
    )
}
