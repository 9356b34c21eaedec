use chrono::NaiveDate;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use std::path::Path;
use tempfile::TempDir;

use crate::watermark::{
    FontLibrary, OutputFormat, WatermarkError, WatermarkSettings, decode_file, output_path, save,
    stamp_file, write_atomic,
};

fn test_image() -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_pixel(120, 80, Rgb([40, 90, 160])))
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_write_atomic_creates_directories() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("deeper").join("out.bin");

    write_atomic(&path, b"hello").unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    assert_eq!(entries(path.parent().unwrap()), vec!["out.bin".to_string()]);
}

#[test]
fn test_write_atomic_replaces_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("photo.jpg");
    std::fs::write(&path, b"old contents").unwrap();

    write_atomic(&path, b"new").unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"new");
    assert_eq!(entries(temp_dir.path()), vec!["photo.jpg".to_string()]);
}

#[cfg(unix)]
fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[cfg(unix)]
#[test]
fn test_write_atomic_keeps_existing_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    for mode in [0o644, 0o640] {
        let path = temp_dir.path().join(format!("photo_{mode:o}.jpg"));
        std::fs::write(&path, b"old contents").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert_eq!(mode_of(&path), mode);
    }
}

#[cfg(unix)]
#[test]
fn test_write_atomic_new_file_is_not_owner_only() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fresh.png");

    write_atomic(&path, b"data").unwrap();

    assert_eq!(mode_of(&path), 0o644);
}

#[test]
fn test_failed_write_leaves_no_partial_file() {
    let temp_dir = TempDir::new().unwrap();
    // A non-empty directory can't be replaced by a file
    let blocker = temp_dir.path().join("taken");
    std::fs::create_dir(&blocker).unwrap();
    std::fs::write(blocker.join("keep.txt"), b"keep").unwrap();

    let result = write_atomic(&blocker, b"data");

    assert!(matches!(result, Err(WatermarkError::IoError(_))));
    assert!(blocker.is_dir());
    assert_eq!(entries(temp_dir.path()), vec!["taken".to_string()]);
}

#[test]
fn test_save_in_preferred_format() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("out.bmp");

    let format = save(&test_image(), &path, Some(ImageFormat::Bmp)).unwrap();

    assert_eq!(format, OutputFormat::Bmp);
    let written = decode_file(&path).unwrap();
    assert_eq!(written.format, Some(ImageFormat::Bmp));
    assert_eq!((written.image.width(), written.image.height()), (120, 80));
}

#[test]
fn test_save_without_matching_encoder_writes_png() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("out.dds");

    let format = save(&test_image(), &path, Some(ImageFormat::Dds)).unwrap();

    assert_eq!(format, OutputFormat::Png);
    assert_eq!(
        decode_file(&path).unwrap().format,
        Some(ImageFormat::Png)
    );
}

#[test]
fn test_output_path_for_copies() {
    assert_eq!(
        output_path(Path::new("/photos/IMG_0001.jpg"), true),
        Path::new("/photos/IMG_0001_watermarked.jpg")
    );
    assert_eq!(
        output_path(Path::new("/photos/IMG_0001.jpg"), false),
        Path::new("/photos/IMG_0001.jpg")
    );
    assert_eq!(
        output_path(Path::new("scan"), true),
        Path::new("scan_watermarked")
    );
    assert_eq!(
        output_path(Path::new("a/b.tar.png"), true),
        Path::new("a/b.tar_watermarked.png")
    );
}

fn host_library() -> Option<FontLibrary> {
    let library = FontLibrary::system();
    if library.is_empty() { None } else { Some(library) }
}

#[test]
fn test_stamp_file_keeps_source_format() {
    let Some(library) = host_library() else {
        // Can't test without an installed font
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("holiday.jpg");
    test_image().save(&source).unwrap();
    let output = output_path(&source, true);

    let date = NaiveDate::from_ymd_opt(2023, 12, 24).unwrap();
    let format = stamp_file(&source, &output, date, &WatermarkSettings::default(), &library)
        .unwrap();

    assert_eq!(format, OutputFormat::Jpeg);
    let written = decode_file(&output).unwrap();
    assert_eq!(written.format, Some(ImageFormat::Jpeg));
    assert_eq!((written.image.width(), written.image.height()), (120, 80));
    // Source is untouched
    assert!(source.exists());
    assert_eq!(decode_file(&source).unwrap().format, Some(ImageFormat::Jpeg));
}

#[test]
fn test_stamp_file_without_encoder_falls_back() {
    let Some(library) = host_library() else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("frame.tga");
    test_image().save(&source).unwrap();
    let output = temp_dir.path().join("stamped").join("frame.tga");

    let date = NaiveDate::from_ymd_opt(2023, 12, 24).unwrap();
    let format = stamp_file(&source, &output, date, &WatermarkSettings::default(), &library)
        .unwrap();

    assert_eq!(format, OutputFormat::Png);
    assert_eq!(decode_file(&output).unwrap().format, Some(ImageFormat::Png));
}

#[test]
fn test_stamp_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = stamp_file(
        &temp_dir.path().join("missing.png"),
        &temp_dir.path().join("out.png"),
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        &WatermarkSettings::default(),
        &FontLibrary::empty(),
    );
    assert!(matches!(result, Err(WatermarkError::IoError(_))));
    assert!(!temp_dir.path().join("out.png").exists());
}
