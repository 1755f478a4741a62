use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::error::PrefetchError;

const MESH_KEYS: [&str; 2] = ["MeshURL", "ColliderURL"];
const BUNDLE_KEYS: [&str; 2] = ["AssetbundleURL", "AssetbundleSecondaryURL"];

/// A URL-bearing field discovered in a save file, together with the chain of
/// keys leading to it. Only the terminal key determines the asset kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub path: Vec<String>,
    pub url: String,
}

impl Reference {
    pub fn new(path: Vec<String>, url: impl Into<String>) -> Self {
        Self {
            path,
            url: url.into(),
        }
    }

    pub fn terminal_key(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Mesh,
    Bundle,
    Image,
}

impl AssetKind {
    /// Classifies a reference by its terminal key. Image is the fallback for
    /// any other key ending in `URL`; a key outside that closed world is an
    /// error rather than a silent misclassification.
    pub fn classify(reference: &Reference) -> Result<Self, PrefetchError> {
        let key = reference.terminal_key();
        if MESH_KEYS.contains(&key) {
            Ok(AssetKind::Mesh)
        } else if BUNDLE_KEYS.contains(&key) {
            Ok(AssetKind::Bundle)
        } else if key.ends_with("URL") {
            Ok(AssetKind::Image)
        } else {
            Err(PrefetchError::UnresolvableAssetKind {
                key: key.to_string(),
                url: reference.url.clone(),
            })
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Mesh => write!(f, "mesh"),
            AssetKind::Bundle => write!(f, "assetbundle"),
            AssetKind::Image => write!(f, "image"),
        }
    }
}

/// Recodes a URL into the filesystem stem the game itself uses for cache
/// files: every character that is not a letter, digit or underscore is
/// removed. Must stay bit-exact so locally written files and files the game
/// fetched itself address the same name.
pub fn recode_url(url: &str) -> String {
    Regex::new(r"\W").unwrap().replace_all(url, "").into_owned()
}
