use chrono::NaiveDate;
use image::{DynamicImage, ImageFormat};
use std::fs::Permissions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::compositor::{decode_file, render};
use super::error::WatermarkError;
use super::fonts::FontLibrary;
use super::formats::{OutputFormat, encode_preferred};
use super::types::{CompositeRequest, WatermarkSettings};

/// Suffix appended to the file stem when saving a copy
pub const COPY_SUFFIX: &str = "_watermarked";

/// Mode given to newly created outputs (rw-r--r--)
#[cfg(unix)]
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Encode `image` (preferring `preferred`) and write it to `output_path`.
///
/// Returns the format actually written, which is the fallback format when
/// `preferred` has no encoder.
pub fn save(
    image: &DynamicImage,
    output_path: &Path,
    preferred: Option<ImageFormat>,
) -> Result<OutputFormat, WatermarkError> {
    let encoded = encode_preferred(image, preferred)?;
    if preferred.and_then(OutputFormat::from_image_format) != Some(encoded.format) {
        warn!(
            "Writing {:?} as {:?} instead of {:?}",
            output_path, encoded.format, preferred
        );
    }
    write_atomic(output_path, &encoded.bytes)?;
    debug!(
        "Wrote {} bytes of {} to {:?}",
        encoded.bytes.len(),
        encoded.format.mime_type(),
        output_path
    );
    Ok(encoded.format)
}

/// Write `bytes` to a temporary file next to `path`, then rename it into
/// place. On any failure the destination is left untouched. A replaced file
/// keeps its permissions.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), WatermarkError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    if let Some(permissions) = target_permissions(path) {
        temp.as_file().set_permissions(permissions)?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Permissions for the file about to land at `path`: those of the file it
/// replaces, or a regular-file default. Temp files start out owner-only.
fn target_permissions(path: &Path) -> Option<Permissions> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => Some(metadata.permissions()),
        _ => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(DEFAULT_FILE_MODE))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

/// Where a stamped image goes: the original path, or a `_watermarked` copy
/// alongside it.
pub fn output_path(original: &Path, copy: bool) -> PathBuf {
    if !copy {
        return original.to_path_buf();
    }

    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match original.extension() {
        Some(ext) => format!("{}{}.{}", stem, COPY_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, COPY_SUFFIX),
    };
    original.with_file_name(file_name)
}

/// Decode `source_path`, stamp `date` onto it and save it to `output_path`
/// in the source's own format where possible.
pub fn stamp_file(
    source_path: &Path,
    output_path: &Path,
    date: NaiveDate,
    settings: &WatermarkSettings,
    fonts: &FontLibrary,
) -> Result<OutputFormat, WatermarkError> {
    let source = decode_file(source_path)?;
    let composed = render(&CompositeRequest::new(&source.image, date, settings), fonts)?;
    let format = save(&composed, output_path, source.format)?;
    info!(
        "Stamped {} onto {:?} -> {:?}",
        date, source_path, output_path
    );
    Ok(format)
}
