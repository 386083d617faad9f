// Copyright 2024 Meal Planner Authors

//! Image storage for product and recipe photos. Photo rows hold a path relative to the media root.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Directory under the media root an image is filed into.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UploadTo {
    Products,
    Recipes,
}

impl UploadTo {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Recipes => "recipes",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copies `source` under the upload prefix and returns the relative path to record. An
    /// existing file with the same name is never overwritten; a numeric suffix is added instead.
    pub fn store(&self, upload_to: UploadTo, source: impl AsRef<Path>) -> Result<String> {
        let source = source.as_ref();
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} has no usable file name", source.display()),
                ))
            })?;

        let dir = self.root.join(upload_to.prefix());
        std::fs::create_dir_all(&dir)?;

        let name = available_name(&dir, file_name);
        std::fs::copy(source, dir.join(&name))?;
        log::debug!("stored {} as {}/{name}", source.display(), upload_to.prefix());

        Ok(format!("{}/{name}", upload_to.prefix()))
    }

    pub fn path_of(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Removes a stored file whose row was never written.
    pub fn discard(&self, relative: &str) {
        if let Err(error) = std::fs::remove_file(self.path_of(relative)) {
            log::warn!("failed to remove {relative}: {error}");
        }
    }
}

fn available_name(dir: &Path, file_name: &str) -> String {
    if !dir.join(file_name).exists() {
        return file_name.into();
    }
    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };
    (1..)
        .map(|n| match extension {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        })
        .find(|candidate| !dir.join(candidate).exists())
        .unwrap_or_else(|| file_name.into())
}

#[test]
fn store_under_prefix() {
    let media = tempfile::tempdir().unwrap();
    let uploads = tempfile::tempdir().unwrap();
    let source = uploads.path().join("oats.jpg");
    std::fs::write(&source, b"jpeg").unwrap();

    let store = MediaStore::new(media.path());
    let first = store.store(UploadTo::Products, &source).unwrap();
    let second = store.store(UploadTo::Products, &source).unwrap();
    let third = store.store(UploadTo::Recipes, &source).unwrap();

    assert_eq!(first, "products/oats.jpg");
    assert_eq!(second, "products/oats_1.jpg");
    assert_eq!(third, "recipes/oats.jpg");
    assert_eq!(std::fs::read(store.path_of(&second)).unwrap(), b"jpeg");
}

#[test]
fn store_missing_source() {
    let media = tempfile::tempdir().unwrap();
    let store = MediaStore::new(media.path());
    let err = store
        .store(UploadTo::Recipes, media.path().join("missing.png"))
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
