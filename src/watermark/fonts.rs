use ab_glyph::{Font, FontVec, PxScale};
use fontdb::{Database, Family, Query, Style, Weight};
use std::path::Path;
use tracing::{debug, warn};

use super::error::WatermarkError;
use super::types::FontDescriptor;
use crate::FontConfig;

/// Families tried after the requested one, before giving up on names entirely.
const FALLBACK_FAMILIES: [&str; 4] = ["Arial", "DejaVu Sans", "Liberation Sans", "Noto Sans"];

/// A face ready to rasterize at a fixed size.
pub struct LoadedFont {
    pub font: FontVec,
    pub scale: PxScale,
    /// Family name of the face actually selected
    pub family: String,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFont")
            .field("family", &self.family)
            .field("scale", &self.scale)
            .finish()
    }
}

/// Font faces available for watermark text. Read-only once built.
pub struct FontLibrary {
    db: Database,
}

impl FontLibrary {
    pub fn empty() -> Self {
        Self { db: Database::new() }
    }

    /// Installed system fonts only.
    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        debug!("Loaded {} system font faces", db.len());
        Self { db }
    }

    pub fn from_config(config: &FontConfig) -> Self {
        let mut library = if config.load_system {
            Self::system()
        } else {
            Self::empty()
        };

        for dir in &config.directories {
            library.add_font_dir(dir);
        }
        for file in &config.files {
            if let Err(e) = library.add_font_file(file) {
                warn!("Failed to load font file {:?}: {}", file, e);
            }
        }

        library
    }

    pub fn add_font_dir(&mut self, dir: &Path) {
        let before = self.db.len();
        self.db.load_fonts_dir(dir);
        debug!("Loaded {} font faces from {:?}", self.db.len() - before, dir);
    }

    pub fn add_font_file(&mut self, path: &Path) -> Result<(), WatermarkError> {
        self.db.load_font_file(path)?;
        Ok(())
    }

    pub fn add_font_data(&mut self, data: Vec<u8>) {
        self.db.load_font_data(data);
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Pick the face closest to `descriptor`, falling back to a common
    /// sans-serif family and finally to any face at all.
    pub fn resolve(&self, descriptor: &FontDescriptor) -> Result<LoadedFont, WatermarkError> {
        let mut families = vec![Family::Name(&descriptor.family), Family::SansSerif];
        families.extend(FALLBACK_FAMILIES.iter().map(|name| Family::Name(*name)));

        let query = Query {
            families: &families,
            weight: if descriptor.bold {
                Weight::BOLD
            } else {
                Weight::NORMAL
            },
            style: if descriptor.italic {
                Style::Italic
            } else {
                Style::Normal
            },
            ..Query::default()
        };

        let id = self
            .db
            .query(&query)
            .or_else(|| self.db.faces().next().map(|face| face.id))
            .ok_or_else(|| WatermarkError::FontNotFound(descriptor.family.clone()))?;

        let family = self
            .db
            .face(id)
            .and_then(|face| face.families.first())
            .map(|(name, _)| name.clone())
            .unwrap_or_default();
        if !family.eq_ignore_ascii_case(&descriptor.family) {
            debug!(
                "Font family {:?} not available, using {:?}",
                descriptor.family, family
            );
        }

        let font = self
            .db
            .with_face_data(id, |data, index| {
                FontVec::try_from_vec_and_index(data.to_vec(), index)
            })
            .ok_or_else(|| WatermarkError::FontNotFound(descriptor.family.clone()))?
            .map_err(|_| WatermarkError::FontParse)?;

        let scale = point_size_to_scale(&font, descriptor.size);

        Ok(LoadedFont {
            font,
            scale,
            family,
        })
    }
}

/// Convert a point size at 96 DPI into the face's pixel scale.
pub fn point_size_to_scale(font: &impl Font, points: f32) -> PxScale {
    font.pt_to_px_scale(points)
        .unwrap_or_else(|| PxScale::from(points * 96.0 / 72.0))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A font resolved from the host, or `None` when the host has no fonts.
    pub(crate) fn host_font(bold: bool) -> Option<LoadedFont> {
        let library = FontLibrary::system();
        if library.is_empty() {
            return None;
        }
        library
            .resolve(&FontDescriptor {
                family: "DejaVu Sans".to_string(),
                size: 24.0,
                bold,
                italic: false,
            })
            .ok()
    }

    #[test]
    fn test_empty_library_has_no_font() {
        let library = FontLibrary::empty();
        assert!(library.is_empty());
        let result = library.resolve(&FontDescriptor {
            family: "Arial".to_string(),
            size: 12.0,
            bold: false,
            italic: false,
        });
        assert!(matches!(result, Err(WatermarkError::FontNotFound(_))));
    }

    #[test]
    fn test_missing_font_file() {
        let mut library = FontLibrary::empty();
        let result = library.add_font_file(Path::new("/nonexistent/font.ttf"));
        assert!(matches!(result, Err(WatermarkError::IoError(_))));
    }

    #[test]
    fn test_unknown_family_falls_back() {
        let library = FontLibrary::system();
        if library.is_empty() {
            // Can't test without installed fonts
            return;
        }
        let loaded = library
            .resolve(&FontDescriptor {
                family: "No Such Family 1234".to_string(),
                size: 24.0,
                bold: true,
                italic: true,
            })
            .unwrap();
        assert!(!loaded.family.is_empty());
    }

    #[test]
    fn test_font_loaded_from_memory_resolves() {
        let system = FontLibrary::system();
        let Some(path) = system.db.faces().find_map(|face| match &face.source {
            fontdb::Source::File(path) => Some(path.clone()),
            _ => None,
        }) else {
            return;
        };
        let data = std::fs::read(&path).unwrap();

        let mut library = FontLibrary::empty();
        library.add_font_data(data);

        assert!(!library.is_empty());
        let loaded = library
            .resolve(&FontDescriptor {
                family: "Anything".to_string(),
                size: 18.0,
                bold: false,
                italic: false,
            })
            .unwrap();
        assert!(!loaded.family.is_empty());
    }

    #[test]
    fn test_point_size_scales_up() {
        let Some(loaded) = host_font(false) else {
            return;
        };
        let small = point_size_to_scale(&loaded.font, 12.0);
        let large = point_size_to_scale(&loaded.font, 24.0);
        assert!(large.y > small.y);
        assert!((large.y - 2.0 * small.y).abs() < 0.01);
    }
}
