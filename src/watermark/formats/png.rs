use image::{DynamicImage, codecs::png::PngEncoder};
use std::io::Write;

/// Encode as PNG, keeping the pixel format of `image`.
pub fn encode<W: Write>(image: &DynamicImage, output: W) -> image::ImageResult<()> {
    let encoder = PngEncoder::new(output);
    image.write_with_encoder(encoder)
}
