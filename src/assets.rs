//! Profile image staging.
//!
//! An edit session copies a picked image into a temp file, then either commits
//! it to the owner's permanent path or throws it away. The temp file is tied to
//! the [`EditSession`] value and removed when the session is dropped, however
//! the session ends.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

use crate::error::{Error, Result};

/// File name prefix of per-owner profile images.
pub const IMAGE_PREFIX: &str = "profile_image_";

const TEMP_PREFIX: &str = "temp_profile_image_";

/// Reference to a local image file, stored as a `file://` URI.
///
/// The path is derived from the string on access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    /// Canonical reference for a local path.
    pub fn from_path(path: &Path) -> Self {
        Self(format!("file://{}", path.display()))
    }

    /// Parse a stored string, accepting only local file references.
    ///
    /// The result is always in canonical `file:///abs/path` form.
    pub fn parse(s: &str) -> Option<Self> {
        file_path_of(s).map(|p| Self::from_path(&p))
    }

    pub fn path(&self) -> Option<PathBuf> {
        file_path_of(&self.0)
    }

    /// Whether the referenced file currently exists.
    pub fn exists(&self) -> bool {
        self.path().is_some_and(|p| p.is_file())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract the absolute path from `file:/p`, `file:///p` or `file://localhost/p`.
fn file_path_of(s: &str) -> Option<PathBuf> {
    let rest = s.trim().strip_prefix("file:")?;
    let path = match rest.strip_prefix("//") {
        Some(after) if after.starts_with('/') => after,
        Some(after) => after.strip_prefix("localhost")?,
        None => rest,
    };
    if path.starts_with('/') {
        Some(PathBuf::from(path))
    } else {
        None
    }
}

/// Accept a stored image reference only if it is a local file that exists.
///
/// `expected` is the owner's permanent image path. Anything else (other
/// schemes, relative paths, deleted files) is treated as no image.
pub fn validate(stored: &str, expected: &Path) -> Option<ImageRef> {
    let Some(path) = file_path_of(stored) else {
        log::warn!("Ignoring non-file image reference: {}", stored);
        return None;
    };

    if path == expected && expected.is_file() {
        return Some(ImageRef::from_path(expected));
    }
    if path.is_file() {
        return Some(ImageRef::from_path(&path));
    }

    log::warn!("Image file does not exist: {}, clearing reference", path.display());
    None
}

/// Owns the image directory: permanent per-owner images and session temp files.
#[derive(Debug, Clone)]
pub struct AssetStager {
    dir: PathBuf,
}

impl AssetStager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stable image path for an owner.
    pub fn permanent_path(&self, owner: &str) -> PathBuf {
        self.dir.join(format!("{}{}.jpg", IMAGE_PREFIX, owner))
    }

    /// Validate a stored reference against the owner's permanent path.
    pub fn validate(&self, stored: &ImageRef, owner: &str) -> Option<ImageRef> {
        validate(stored.as_str(), &self.permanent_path(owner))
    }

    /// Start an edit session with its own temp file slot.
    pub fn begin(&self) -> EditSession {
        let temp = self.dir.join(format!("{}{}.jpg", TEMP_PREFIX, Uuid::new_v4()));
        EditSession {
            dir: self.dir.clone(),
            temp,
        }
    }
}

/// A single image edit. Dropping it deletes the temp file.
#[derive(Debug)]
pub struct EditSession {
    dir: PathBuf,
    temp: PathBuf,
}

impl EditSession {
    /// Copy bytes from `source` into the session's temp file.
    ///
    /// Staging again replaces the previous temp image.
    pub async fn stage<R>(&mut self, source: &mut R) -> Result<ImageRef>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        tokio::fs::create_dir_all(&self.dir).await?;

        let copied = async {
            let mut file = tokio::fs::File::create(&self.temp).await?;
            let bytes = tokio::io::copy(source, &mut file).await?;
            file.flush().await?;
            Ok::<u64, std::io::Error>(bytes)
        }
        .await;

        match copied {
            Ok(bytes) => {
                log::debug!("Staged {} bytes to {}", bytes, self.temp.display());
                Ok(ImageRef::from_path(&self.temp))
            }
            Err(e) => {
                self.remove_temp();
                Err(Error::Stage(e.to_string()))
            }
        }
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Whether an image is currently staged.
    pub fn is_staged(&self) -> bool {
        self.temp.is_file()
    }

    /// Move the staged image to the owner's permanent path.
    ///
    /// Without a staged image, `existing` is returned unchanged. A staged temp
    /// file is renamed into place, so nothing is left for `Drop` to remove.
    pub async fn commit(self, owner: &str, existing: Option<ImageRef>) -> Result<Option<ImageRef>> {
        if !self.is_staged() {
            return Ok(existing);
        }

        let target = self.dir.join(format!("{}{}.jpg", IMAGE_PREFIX, owner));
        tokio::fs::rename(&self.temp, &target).await.map_err(|source| {
            log::error!("Failed to commit image to {}: {}", target.display(), source);
            Error::Persist {
                path: target.clone(),
                source,
            }
        })?;

        log::debug!("Committed image for {} to {}", owner, target.display());
        Ok(Some(ImageRef::from_path(&target)))
    }

    /// Discard the staged image.
    pub fn rollback(self) {
        drop(self);
    }

    fn remove_temp(&self) {
        if self.temp.exists() {
            match std::fs::remove_file(&self.temp) {
                Ok(()) => log::debug!("Removed temp image {}", self.temp.display()),
                Err(e) => log::warn!("Failed to remove temp image {}: {}", self.temp.display(), e),
            }
        }
    }
}

/// Rollback and early drops unlink the temp file synchronously. That is a
/// single unlink of a file in the session's own directory; `commit` never
/// reaches it.
impl Drop for EditSession {
    fn drop(&mut self) {
        self.remove_temp();
    }
}
