// Watermark module - date formatting, text placement, compositing and saving
mod compositor;
mod date_format;
mod error;
mod fonts;
pub mod formats;
mod layout;
mod persist;
mod types;

pub use compositor::{SourceImage, compose, decode, decode_file, preview, render};
pub use date_format::{DEFAULT_DATE_FORMAT, format_date, format_date_or_default};
pub use error::WatermarkError;
pub use fonts::{FontLibrary, LoadedFont, point_size_to_scale};
pub use formats::{Encoded, JPEG_QUALITY, OutputFormat, encode, encode_preferred};
pub use layout::{measure_text, resolve_position};
pub use persist::{COPY_SUFFIX, output_path, save, stamp_file, write_atomic};
pub use types::{
    AnchorPosition, CompositeRequest, FontDescriptor, HorizontalAlign, Position, Rgb, TextExtent,
    VerticalAlign, WatermarkSettings,
};

#[cfg(test)]
mod tests {
    mod compositor_tests;
    mod formats_tests;
    mod layout_tests;
    mod persist_tests;
}
