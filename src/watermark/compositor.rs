use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, Luma, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use super::date_format::format_date_or_default;
use super::error::WatermarkError;
use super::fonts::{FontLibrary, LoadedFont};
use super::formats::{self, Encoded, OutputFormat};
use super::layout::{measure_text, resolve_position};
use super::types::{CompositeRequest, WatermarkSettings};

/// A decoded source image and the format it was stored in
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: DynamicImage,
    pub format: Option<ImageFormat>,
}

/// Decode image bytes, sniffing the format from their content.
pub fn decode(bytes: &[u8]) -> Result<SourceImage, WatermarkError> {
    decode_with_hint(bytes, None)
}

/// Read the whole file into memory before decoding so no handle stays open.
/// The extension is used for formats without a recognizable signature.
pub fn decode_file(path: &Path) -> Result<SourceImage, WatermarkError> {
    let bytes = std::fs::read(path)?;
    decode_with_hint(&bytes, ImageFormat::from_path(path).ok())
}

fn decode_with_hint(
    bytes: &[u8],
    hint: Option<ImageFormat>,
) -> Result<SourceImage, WatermarkError> {
    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    if reader.format().is_none()
        && let Some(format) = hint
    {
        reader.set_format(format);
    }
    let format = reader.format();
    let image = reader.decode()?;
    Ok(SourceImage { image, format })
}

/// Draw `date_text` onto a copy of `source`.
///
/// The shadow (if enabled) is drawn first at the shadow offset, then the
/// text at the anchor position. Both use the settings' transparency as
/// their alpha. A source without alpha yields an RGB result.
pub fn compose(
    source: &DynamicImage,
    date_text: &str,
    font: &LoadedFont,
    settings: &WatermarkSettings,
) -> DynamicImage {
    let mut canvas = source.to_rgba8();

    let extent = measure_text(date_text, font);
    let position = resolve_position(
        canvas.dimensions(),
        extent,
        settings.position,
        settings.margin_x,
        settings.margin_y,
    );
    debug!(
        "Placing {:?} ({}x{}) at ({}, {})",
        date_text, extent.width, extent.height, position.x, position.y
    );

    if settings.has_drop_shadow {
        draw_text_layer(
            &mut canvas,
            date_text,
            font,
            position.x + settings.shadow_offset_x,
            position.y + settings.shadow_offset_y,
            settings.shadow_rgba(),
        );
    }
    draw_text_layer(
        &mut canvas,
        date_text,
        font,
        position.x,
        position.y,
        settings.text_rgba(),
    );

    if source.color().has_alpha() {
        DynamicImage::ImageRgba8(canvas)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
    }
}

/// Format the date, resolve the font and compose.
pub fn render(
    request: &CompositeRequest<'_>,
    fonts: &FontLibrary,
) -> Result<DynamicImage, WatermarkError> {
    let settings = request.settings;
    settings.validate()?;

    let date_text = format_date_or_default(request.date, &settings.date_format);
    let font = fonts.resolve(&settings.font())?;

    Ok(compose(request.source, &date_text, &font, settings))
}

/// Render a preview from encoded source bytes. Previews are always PNG.
pub fn preview(
    bytes: &[u8],
    date: chrono::NaiveDate,
    settings: &WatermarkSettings,
    fonts: &FontLibrary,
) -> Result<Encoded, WatermarkError> {
    let source = decode(bytes)?;
    let composed = render(&CompositeRequest::new(&source.image, date, settings), fonts)?;
    let bytes = formats::encode(&composed, OutputFormat::Png)?;
    Ok(Encoded {
        bytes,
        format: OutputFormat::Png,
    })
}

/// Rasterize `text` into a coverage mask and blend `color` through it.
fn draw_text_layer(
    canvas: &mut RgbaImage,
    text: &str,
    font: &LoadedFont,
    x: f32,
    y: f32,
    color: Rgba<u8>,
) {
    if text.is_empty() || color[3] == 0 {
        return;
    }

    let (width, height) = canvas.dimensions();
    let mut coverage = GrayImage::new(width, height);
    // Glyphs outside the canvas are clipped by the rasterizer
    draw_text_mut(
        &mut coverage,
        Luma([255u8]),
        x.round() as i32,
        y.round() as i32,
        font.scale,
        &font.font,
        text,
    );

    for (pixel, mask) in canvas.pixels_mut().zip(coverage.pixels()) {
        if mask[0] > 0 {
            blend_over(pixel, color, mask[0]);
        }
    }
}

/// Source-over compositing of `color`, scaled by glyph `coverage`, onto `dst`.
fn blend_over(dst: &mut Rgba<u8>, color: Rgba<u8>, coverage: u8) {
    let src_alpha = (color[3] as f32 / 255.0) * (coverage as f32 / 255.0);
    let dst_alpha = dst[3] as f32 / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);

    if out_alpha <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }

    for channel in 0..3 {
        let value = (color[channel] as f32 * src_alpha
            + dst[channel] as f32 * dst_alpha * (1.0 - src_alpha))
            / out_alpha;
        dst[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}
