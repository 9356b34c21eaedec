use ab_glyph::{Font, ScaleFont};
use imageproc::drawing::text_size;

use super::fonts::LoadedFont;
use super::types::{AnchorPosition, HorizontalAlign, Position, TextExtent, VerticalAlign};

/// Extent of `text` laid out on one line in `font`.
///
/// The height is the full line height (ascent to descent), which is the box
/// the rasterizer fills when the text's top-left is placed at a position.
pub fn measure_text(text: &str, font: &LoadedFont) -> TextExtent {
    let (width, _) = text_size(font.scale, &font.font, text);
    let line_height = font.font.as_scaled(font.scale).height().ceil();
    TextExtent::new(width as f32, line_height)
}

/// Top-left corner of the text box for `anchor`.
///
/// The result is not clamped to the image: text larger than the space
/// between the margins ends up partly off-canvas.
pub fn resolve_position(
    image_size: (u32, u32),
    text: TextExtent,
    anchor: AnchorPosition,
    margin_x: f32,
    margin_y: f32,
) -> Position {
    let (image_width, image_height) = (image_size.0 as f32, image_size.1 as f32);

    let x = match anchor.horizontal() {
        HorizontalAlign::Left => margin_x,
        HorizontalAlign::Center => (image_width - text.width) / 2.0,
        HorizontalAlign::Right => image_width - text.width - margin_x,
    };
    let y = match anchor.vertical() {
        VerticalAlign::Top => margin_y,
        VerticalAlign::Middle => (image_height - text.height) / 2.0,
        VerticalAlign::Bottom => image_height - text.height - margin_y,
    };

    Position { x, y }
}
