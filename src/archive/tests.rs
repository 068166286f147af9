use super::*;
use crate::test_utils::{TarBuilder, ZipBuilder, sample_app_tar, sample_app_zip};
use tempfile::TempDir;

fn apps_root(temp: &TempDir) -> AppsRoot {
    AppsRoot::new(temp.path().join("apps"), "manifest")
}

fn setup() -> (TempDir, AppsRoot) {
    let temp = TempDir::new().unwrap();
    let root = apps_root(&temp);
    root.ensure_exists().unwrap();
    (temp, root)
}

/// Everything in the apps root, to prove nothing was written.
fn root_listing(root: &AppsRoot) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_detect_format_by_content() {
    let temp = TempDir::new().unwrap();
    let tar = sample_app_tar("clock", "1", "manifest").write_to(temp.path(), "clock.zip");
    assert_eq!(detect_format(&tar).unwrap(), ArchiveFormat::Tar);

    let zip = sample_app_zip("clock", "1", "manifest").write_to(temp.path(), "clock.tar");
    assert_eq!(detect_format(&zip).unwrap(), ArchiveFormat::Zip);

    let gz = temp.path().join("clock.bin");
    std::fs::write(&gz, sample_app_tar("clock", "1", "manifest").into_gzip_bytes()).unwrap();
    assert_eq!(detect_format(&gz).unwrap(), ArchiveFormat::TarGz);
}

/// A pre-POSIX tar: no `ustar` magic, only the header checksum.
fn v7_tar(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, data) in entries {
        let mut header = tar::Header::new_old();
        if path.ends_with('/') {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(0o755);
        } else {
            header.set_entry_type(tar::EntryType::Regular);
            header.set_mode(0o644);
        }
        header.set_size(data.len() as u64);
        builder.append_data(&mut header, path, data.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap()
}

#[test]
fn test_detect_format_accepts_v7_tar() {
    let (temp, root) = setup();
    let bytes = v7_tar(&[
        ("clock/", ""),
        ("clock/clock.manifest", r#"{"name":"clock","version":"1","files":["clock.manifest"]}"#),
    ]);
    assert_ne!(&bytes[257..262], b"ustar");
    let path = temp.path().join("clock.tar");
    std::fs::write(&path, bytes).unwrap();

    assert_eq!(detect_format(&path).unwrap(), ArchiveFormat::Tar);
    let extracted = extract(&path, &root).unwrap();
    assert!(extracted.app_dir().join("clock.manifest").is_file());
}

#[test]
fn test_detect_format_rejects_bad_tar_checksum() {
    let temp = TempDir::new().unwrap();
    let mut bytes = v7_tar(&[("clock/", ""), ("clock/a.js", "x")]);
    bytes[0] ^= 0x01;
    let path = temp.path().join("clock.tar");
    std::fs::write(&path, bytes).unwrap();
    assert!(matches!(detect_format(&path), Err(AppError::UnsupportedFormat { .. })));
}

#[test]
fn test_detect_format_rejects_other_content() {
    let temp = TempDir::new().unwrap();
    let text = temp.path().join("notes.tar");
    std::fs::write(&text, "just some text, not an archive").unwrap();
    assert!(matches!(detect_format(&text), Err(AppError::UnsupportedFormat { .. })));

    let gz = temp.path().join("notes.gz");
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    std::io::Write::write_all(&mut encoder, b"plain text").unwrap();
    std::fs::write(&gz, encoder.finish().unwrap()).unwrap();
    assert!(matches!(detect_format(&gz), Err(AppError::UnsupportedFormat { .. })));
}

#[test]
fn test_list_entries_in_order() {
    let temp = TempDir::new().unwrap();
    let tar = sample_app_tar("clock", "1", "manifest").write_to(temp.path(), "a.tar");
    let entries = list_entries(&tar, ArchiveFormat::Tar).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(names, vec!["clock/", "clock/clock.manifest", "clock/app.js"]);
    assert_eq!(entries[0].kind, EntryKind::Directory);
    assert_eq!(entries[1].kind, EntryKind::File);
}

#[test]
fn test_extract_tar_into_staging() {
    let (temp, root) = setup();
    let archive = sample_app_tar("clock", "1.0", "manifest").write_to(temp.path(), "clock.tar");

    let extracted = extract(&archive, &root).unwrap();
    assert_eq!(extracted.app_name, "clock");
    assert_eq!(extracted.staging_dir, root.staging_dir("clock"));
    assert!(extracted.app_dir().join("clock.manifest").is_file());
    assert_eq!(
        std::fs::read_to_string(extracted.app_dir().join("app.js")).unwrap(),
        "console.log('hello');\n"
    );
}

#[test]
fn test_extract_targz_and_zip() {
    let (temp, root) = setup();

    let gz = temp.path().join("clock.tgz");
    std::fs::write(&gz, sample_app_tar("clock", "1", "manifest").into_gzip_bytes()).unwrap();
    let extracted = extract(&gz, &root).unwrap();
    assert!(extracted.app_dir().join("app.js").is_file());
    remove_dir_all(&extracted.staging_dir).unwrap();

    let zip = sample_app_zip("weather", "2", "manifest").write_to(temp.path(), "weather.zip");
    let extracted = extract(&zip, &root).unwrap();
    assert_eq!(extracted.app_name, "weather");
    assert!(extracted.app_dir().join("weather.manifest").is_file());
    assert!(extracted.app_dir().join("app.js").is_file());
}

#[test]
fn test_extract_zip_without_directory_entries() {
    let (temp, root) = setup();
    let zip = ZipBuilder::new()
        .file("clock/clock.manifest", b"{}")
        .file("clock/lib/app.js", b"x")
        .write_to(temp.path(), "clock.zip");

    let extracted = extract(&zip, &root).unwrap();
    assert_eq!(extracted.app_name, "clock");
    assert!(extracted.app_dir().join("lib").join("app.js").is_file());
}

#[test]
fn test_empty_archives_rejected() {
    let (temp, root) = setup();
    let single = TarBuilder::new().dir("clock/").write_to(temp.path(), "single.tar");
    assert!(matches!(extract(&single, &root), Err(AppError::EmptyArchive { .. })));

    let zip = ZipBuilder::new().dir("clock/").write_to(temp.path(), "single.zip");
    assert!(matches!(extract(&zip, &root), Err(AppError::EmptyArchive { .. })));
    assert!(root_listing(&root).is_empty());
}

#[test]
fn test_tar_traversal_rejected_without_writing() {
    let (temp, root) = setup();
    let archive = TarBuilder::new()
        .dir("clock/")
        .file("clock/app.js", b"fine")
        .file("clock/../../escape.txt", b"pwned")
        .write_to(temp.path(), "evil.tar");

    match extract(&archive, &root) {
        Err(AppError::UnsafeArchivePath { path }) => assert_eq!(path, "clock/../../escape.txt"),
        other => panic!("Expected UnsafeArchivePath, got {other:?}"),
    }
    assert!(root_listing(&root).is_empty());
    assert!(!temp.path().join("escape.txt").exists());
}

#[test]
fn test_tar_absolute_path_rejected() {
    let (temp, root) = setup();
    let archive = TarBuilder::new()
        .dir("clock/")
        .file("/tmp/appdock-absolute-test", b"pwned")
        .write_to(temp.path(), "abs.tar");

    assert!(matches!(extract(&archive, &root), Err(AppError::UnsafeArchivePath { .. })));
    assert!(root_listing(&root).is_empty());
}

#[test]
fn test_zip_traversal_rejected_without_writing() {
    let (temp, root) = setup();
    let archive = ZipBuilder::new()
        .dir("clock/")
        .file("clock/app.js", b"fine")
        .file("../escape.txt", b"pwned")
        .write_to(temp.path(), "evil.zip");

    assert!(matches!(extract(&archive, &root), Err(AppError::UnsafeArchivePath { .. })));
    assert!(root_listing(&root).is_empty());
    assert!(!temp.path().join("escape.txt").exists());
}

#[test]
fn test_hidden_segments_rejected() {
    let (temp, root) = setup();
    let archive = TarBuilder::new()
        .dir("clock/")
        .file("clock/.git/config", b"x")
        .write_to(temp.path(), "hidden.tar");
    assert!(matches!(extract(&archive, &root), Err(AppError::UnsafeArchivePath { .. })));
}

#[test]
fn test_symlinks_rejected() {
    let (temp, root) = setup();
    let tar = TarBuilder::new()
        .dir("clock/")
        .symlink("clock/passwd", "/etc/passwd")
        .write_to(temp.path(), "link.tar");
    assert!(matches!(extract(&tar, &root), Err(AppError::UnsafeArchivePath { .. })));

    let zip = ZipBuilder::new()
        .dir("clock/")
        .symlink("clock/passwd", "/etc/passwd")
        .write_to(temp.path(), "link.zip");
    assert!(matches!(extract(&zip, &root), Err(AppError::UnsafeArchivePath { .. })));
    assert!(root_listing(&root).is_empty());
}

#[test]
fn test_staging_name_must_be_valid_app_name() {
    let (temp, root) = setup();
    let archive = TarBuilder::new()
        .dir("_clock/")
        .file("_clock/app.js", b"x")
        .write_to(temp.path(), "staging.tar");
    assert!(matches!(extract(&archive, &root), Err(AppError::InvalidManifest { .. })));
    assert!(root_listing(&root).is_empty());
}

#[test]
fn test_leftover_staging_is_replaced() {
    let (temp, root) = setup();
    let stale = root.staging_dir("clock");
    std::fs::create_dir_all(stale.join("old")).unwrap();

    let archive = sample_app_tar("clock", "1", "manifest").write_to(temp.path(), "clock.tar");
    let extracted = extract(&archive, &root).unwrap();
    assert!(!extracted.staging_dir.join("old").exists());
}

#[test]
fn test_missing_archive() {
    let (temp, root) = setup();
    let err = extract(&temp.path().join("missing.tar"), &root).unwrap_err();
    assert!(matches!(err, AppError::FileNotFound { .. }));
}

#[tokio::test]
async fn test_extract_async() {
    let (temp, root) = setup();
    let archive = sample_app_tar("clock", "1", "manifest").write_to(temp.path(), "clock.tar");
    let extracted = extract_async(archive, root.clone()).await.unwrap();
    assert!(extracted.app_dir().join("app.js").is_file());
}
