use std::path::PathBuf;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PrefetchError {
    #[error("save file not found: {0}")]
    SaveNotFound(PathBuf),

    #[error("failed to read save file {path}: {message}")]
    SaveRead { path: PathBuf, message: String },

    #[error("malformed save file {path}: {message}")]
    MalformedSave { path: PathBuf, message: String },

    #[error("do not know how to handle URL {url} at key {key}")]
    UnresolvableAssetKind { key: String, url: String },

    #[error("cannot determine image extension for {0}")]
    ExtensionUndeterminable(String),

    #[error("failed to set up HTTP client: {0}")]
    ClientSetup(String),

    #[error("request for {url} failed: {message}")]
    Http { url: String, message: String },

    #[error(
        "content type {content_type} for {url} does not match the expected type (use --relax to ignore)"
    )]
    ContentTypeMismatch { url: String, content_type: String },

    #[error("cache directory missing: {0} (is the game data directory configured correctly?)")]
    CacheDirMissing(Utf8PathBuf),

    #[error("failed to write {path}: {message}")]
    Write { path: Utf8PathBuf, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse config file: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl PrefetchError {
    /// Whether this error aborts the whole batch instead of failing one URL.
    /// Content-type mismatches are batch-fatal while network errors are not;
    /// the asymmetry is inherited behavior (see DESIGN.md).
    pub fn is_batch_fatal(&self) -> bool {
        match self {
            PrefetchError::SaveNotFound(_)
            | PrefetchError::SaveRead { .. }
            | PrefetchError::MalformedSave { .. }
            | PrefetchError::UnresolvableAssetKind { .. }
            | PrefetchError::ContentTypeMismatch { .. }
            | PrefetchError::CacheDirMissing(_)
            | PrefetchError::ConfigRead(_)
            | PrefetchError::ConfigParse(_)
            | PrefetchError::ClientSetup(_)
            | PrefetchError::Filesystem(_) => true,
            PrefetchError::ExtensionUndeterminable(_)
            | PrefetchError::Http { .. }
            | PrefetchError::Write { .. } => false,
        }
    }
}
