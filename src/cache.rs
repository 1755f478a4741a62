use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use tempfile::Builder;

use crate::asset::{AssetKind, recode_url};
use crate::error::PrefetchError;

pub const IMAGE_DIR: &str = "Images";
pub const MODEL_DIR: &str = "Models";
pub const BUNDLE_DIR: &str = "Assetbundles";

/// Outcome of resolving a URL to a cache path. Images whose extension cannot
/// be derived from the URL or an existing cache file stay pending until the
/// response headers arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Utf8PathBuf),
    Pending(Utf8PathBuf),
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    root: Utf8PathBuf,
}

impl CacheStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    /// The game's mod cache directory for the current platform. The game
    /// install owns this tree; the prefetcher never creates it.
    pub fn default_root() -> Result<Utf8PathBuf, PrefetchError> {
        let dirs = BaseDirs::new().ok_or_else(|| {
            PrefetchError::Filesystem("unable to resolve home directory".to_string())
        })?;
        let home = dirs.home_dir();
        let gamedata = if cfg!(windows) {
            home.join("Documents")
                .join("My Games")
                .join("Tabletop Simulator")
        } else {
            home.join(".local").join("share").join("Tabletop Simulator")
        };
        Utf8PathBuf::from_path_buf(gamedata.join("Mods")).map_err(|_| {
            PrefetchError::Filesystem("game data directory is not valid UTF-8".to_string())
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn absolute(&self, relative: &Utf8Path) -> Utf8PathBuf {
        self.root.join(relative)
    }

    pub fn resolve(&self, url: &str, kind: AssetKind) -> Resolution {
        let stem = recode_url(url);
        match kind {
            AssetKind::Mesh => {
                Resolution::Resolved(Utf8PathBuf::from(MODEL_DIR).join(format!("{stem}.obj")))
            }
            AssetKind::Bundle => {
                Resolution::Resolved(Utf8PathBuf::from(BUNDLE_DIR).join(format!("{stem}.unity3d")))
            }
            AssetKind::Image => self.resolve_image(url, &stem),
        }
    }

    fn resolve_image(&self, url: &str, stem: &str) -> Resolution {
        // A previously cached image already fixes the extension.
        for ext in ["jpg", "png"] {
            let relative = Utf8PathBuf::from(IMAGE_DIR).join(format!("{stem}.{ext}"));
            if self.absolute(&relative).as_std_path().exists() {
                return Resolution::Resolved(relative);
            }
        }
        let suffix = if url.contains(".png") {
            ".png"
        } else if url.contains(".jpeg") || url.contains(".jpg") {
            ".jpg"
        } else {
            return Resolution::Pending(Utf8PathBuf::from(IMAGE_DIR).join(stem));
        };
        Resolution::Resolved(Utf8PathBuf::from(IMAGE_DIR).join(format!("{stem}{suffix}")))
    }

    /// A cache entry only counts when the file exists and is non-empty.
    pub fn is_cached(&self, relative: &Utf8Path) -> bool {
        fs::metadata(self.absolute(relative).as_std_path())
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    /// Writes an asset through a temp file in the destination directory and
    /// an atomic rename, so readers never observe partial content. A missing
    /// destination directory indicates a misconfigured cache root.
    pub fn write_asset(&self, relative: &Utf8Path, content: &[u8]) -> Result<(), PrefetchError> {
        let destination = self.absolute(relative);
        let parent = destination.parent().ok_or_else(|| PrefetchError::Write {
            path: destination.clone(),
            message: "destination has no parent directory".to_string(),
        })?;
        let mut temp = Builder::new()
            .prefix(".tts-prefetch")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| classify_write_error(parent, &destination, err))?;
        temp.write_all(content)
            .map_err(|err| PrefetchError::Write {
                path: destination.clone(),
                message: err.to_string(),
            })?;
        temp.persist(destination.as_std_path())
            .map_err(|err| PrefetchError::Write {
                path: destination.clone(),
                message: err.to_string(),
            })?;
        Ok(())
    }
}

fn classify_write_error(
    parent: &Utf8Path,
    destination: &Utf8Path,
    err: io::Error,
) -> PrefetchError {
    if err.kind() == io::ErrorKind::NotFound {
        PrefetchError::CacheDirMissing(parent.to_path_buf())
    } else {
        PrefetchError::Write {
            path: destination.to_path_buf(),
            message: err.to_string(),
        }
    }
}
