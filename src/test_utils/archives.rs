//! Builders for tar and zip app archives used in tests.
//!
//! Unlike the regular `tar`/`zip` writer APIs, these builders can emit entry
//! names that a well-behaved packer would refuse (`../escape`, `/etc/passwd`),
//! which is exactly what the extractor's safety checks need to be tested with.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// Builds a tar archive in memory.
///
/// ```rust,no_run
/// use appdock::test_utils::TarBuilder;
///
/// let bytes = TarBuilder::new()
///     .dir("clock/")
///     .file("clock/clock.manifest", br#"{"name":"clock","version":"1","files":[]}"#)
///     .file("clock/../../escape", b"oops")
///     .into_bytes();
/// assert!(!bytes.is_empty());
/// ```
pub struct TarBuilder {
    builder: tar::Builder<Vec<u8>>,
}

impl Default for TarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TarBuilder {
    /// Start an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    /// Add a directory entry.
    #[must_use]
    pub fn dir(self, path: &str) -> Self {
        self.entry(path, tar::EntryType::Directory, 0o755, b"", None)
    }

    /// Add a regular file entry.
    #[must_use]
    pub fn file(self, path: &str, content: &[u8]) -> Self {
        self.entry(path, tar::EntryType::Regular, 0o644, content, None)
    }

    /// Add a symbolic link entry pointing at `target`.
    #[must_use]
    pub fn symlink(self, path: &str, target: &str) -> Self {
        self.entry(path, tar::EntryType::Symlink, 0o777, b"", Some(target))
    }

    fn entry(
        mut self,
        path: &str,
        entry_type: tar::EntryType,
        mode: u32,
        content: &[u8],
        link: Option<&str>,
    ) -> Self {
        let mut header = tar::Header::new_ustar();
        // Raw name bytes: set_path() would refuse the malicious names tests need
        let name = path.as_bytes();
        assert!(name.len() < 100, "test entry names must fit the ustar name field");
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        if let Some(link) = link {
            let link = link.as_bytes();
            header.as_old_mut().linkname[..link.len()].copy_from_slice(link);
        }
        header.set_entry_type(entry_type);
        header.set_mode(mode);
        header.set_size(content.len() as u64);
        header.set_mtime(1_700_000_000);
        header.set_cksum();
        self.builder.append(&header, content).expect("append tar entry");
        self
    }

    /// Finish the archive and return its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.builder.into_inner().expect("finish tar archive")
    }

    /// Finish the archive and return it gzip-compressed.
    #[must_use]
    pub fn into_gzip_bytes(self) -> Vec<u8> {
        let tar = self.into_bytes();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar).expect("gzip tar archive");
        encoder.finish().expect("finish gzip stream")
    }

    /// Finish the archive and write it to `dir/file_name`.
    pub fn write_to(self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.into_bytes()).expect("write tar archive");
        path
    }
}

/// Builds a zip archive in memory.
pub struct ZipBuilder {
    writer: zip::ZipWriter<Cursor<Vec<u8>>>,
}

impl Default for ZipBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipBuilder {
    /// Start an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: zip::ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Add a directory entry. The name is stored as given.
    #[must_use]
    pub fn dir(mut self, path: &str) -> Self {
        self.writer
            .add_directory(path, SimpleFileOptions::default())
            .expect("add zip directory");
        self
    }

    /// Add a file entry. The name is stored as given.
    #[must_use]
    pub fn file(mut self, path: &str, content: &[u8]) -> Self {
        self.writer.start_file(path, SimpleFileOptions::default()).expect("start zip entry");
        self.writer.write_all(content).expect("write zip entry");
        self
    }

    /// Add a symbolic link entry pointing at `target`.
    #[must_use]
    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        self.writer
            .add_symlink(path, target, SimpleFileOptions::default())
            .expect("add zip symlink");
        self
    }

    /// Finish the archive and return its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.finish().expect("finish zip archive").into_inner()
    }

    /// Finish the archive and write it to `dir/file_name`.
    pub fn write_to(self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.into_bytes()).expect("write zip archive");
        path
    }
}

/// A manifest document for app `name` listing `files`.
#[must_use]
pub fn manifest_json(name: &str, version: &str, files: &[&str]) -> Vec<u8> {
    serde_json::to_vec_pretty(&serde_json::json!({
        "name": name,
        "version": version,
        "files": files,
    }))
    .expect("serialize manifest")
}

/// A well-formed tar archive for app `name` with `app.js` and its manifest.
#[must_use]
pub fn sample_app_tar(name: &str, version: &str, extension: &str) -> TarBuilder {
    let manifest_name = format!("{name}.{extension}");
    TarBuilder::new()
        .dir(&format!("{name}/"))
        .file(
            &format!("{name}/{manifest_name}"),
            &manifest_json(name, version, &[&manifest_name, "app.js"]),
        )
        .file(&format!("{name}/app.js"), b"console.log('hello');\n")
}

/// A well-formed zip archive for app `name` with `app.js` and its manifest.
#[must_use]
pub fn sample_app_zip(name: &str, version: &str, extension: &str) -> ZipBuilder {
    let manifest_name = format!("{name}.{extension}");
    ZipBuilder::new()
        .dir(&format!("{name}/"))
        .file(
            &format!("{name}/{manifest_name}"),
            &manifest_json(name, version, &[&manifest_name, "app.js"]),
        )
        .file(&format!("{name}/app.js"), b"console.log('hello');\n")
}
