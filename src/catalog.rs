use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::watermark::WatermarkError;

/// Extensions accepted as stampable images, lowercase
pub const SUPPORTED_EXTENSIONS: [&str; 8] =
    ["jpg", "jpeg", "png", "bmp", "tiff", "tif", "gif", "webp"];

/// A source image as the caller sees it before stamping
#[derive(Debug, Clone, Serialize)]
pub struct ImageDescriptor {
    pub path: PathBuf,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    /// Birth time where the platform records it, otherwise last modification
    pub created: DateTime<Local>,
    pub file_size: u64,
}

impl ImageDescriptor {
    pub fn load(path: &Path) -> Result<Self, WatermarkError> {
        let metadata = std::fs::metadata(path)?;
        let created = metadata.created().or_else(|_| metadata.modified())?;

        // An unreadable header still yields a descriptor, just without dimensions
        let (width, height) = match image::image_dimensions(path) {
            Ok(dimensions) => dimensions,
            Err(e) => {
                debug!("Could not read dimensions of {:?}: {}", path, e);
                (0, 0)
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            width,
            height,
            created: DateTime::<Local>::from(created),
            file_size: metadata.len(),
        })
    }

    /// The local calendar date the file was created on.
    pub fn creation_date(&self) -> NaiveDate {
        self.created.date_naive()
    }
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Descriptors for every supported path that could be read. Unsupported
/// paths are skipped silently, unreadable ones with a warning.
pub fn load_descriptors<P: AsRef<Path>>(paths: &[P]) -> Vec<ImageDescriptor> {
    paths
        .iter()
        .map(AsRef::as_ref)
        .filter(|path| is_supported_image(path))
        .filter_map(|path| match ImageDescriptor::load(path) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                warn!("Error loading image {:?}: {}", path, e);
                None
            }
        })
        .collect()
}
