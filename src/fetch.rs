use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use tracing::warn;

use crate::asset::AssetKind;
use crate::error::PrefetchError;

const MESH_CONTENT_TYPES: [&str; 5] = [
    "text/plain",
    "application/binary",
    "application/octet-stream",
    "application/json",
    "application/x-tgif",
];

const BUNDLE_CONTENT_TYPES: [&str; 2] = ["application/binary", "application/octet-stream"];

const IMAGE_CONTENT_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "application/octet-stream",
    "application/binary",
];

#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub content_type: String,
    pub content_disposition: Option<String>,
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

pub trait AssetSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedAsset, PrefetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpAssetSource {
    client: Client,
}

impl HttpAssetSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, PrefetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|err| PrefetchError::ClientSetup(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| PrefetchError::ClientSetup(err.to_string()))?;
        Ok(Self { client })
    }
}

impl AssetSource for HttpAssetSource {
    fn fetch(&self, url: &str) -> Result<FetchedAsset, PrefetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| PrefetchError::Http {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        let response = response
            .error_for_status()
            .map_err(|err| PrefetchError::Http {
                url: url.to_string(),
                message: err.to_string(),
            })?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .trim()
            .to_string();
        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();
        let body = response
            .bytes()
            .map_err(|err| PrefetchError::Http {
                url: url.to_string(),
                message: err.to_string(),
            })?
            .to_vec();

        Ok(FetchedAsset {
            content_type,
            content_disposition,
            content_length,
            body,
        })
    }
}

/// Some mods carry URLs without a scheme; assume http for those, as the game
/// appears to.
pub fn ensure_scheme(url: &str) -> String {
    if Url::parse(url).is_ok() {
        url.to_string()
    } else {
        warn!(url, "URL does not specify a scheme, assuming http");
        format!("http://{url}")
    }
}

/// Whether the declared content type is acceptable for the asset kind.
/// Meshes and bundles match by prefix, images by the exact header value.
pub fn content_expected(kind: AssetKind, content_type: &str) -> bool {
    match kind {
        AssetKind::Mesh => MESH_CONTENT_TYPES
            .iter()
            .any(|expected| content_type.starts_with(expected)),
        AssetKind::Bundle => BUNDLE_CONTENT_TYPES
            .iter()
            .any(|expected| content_type.starts_with(expected)),
        AssetKind::Image => IMAGE_CONTENT_TYPES
            .iter()
            .any(|expected| content_type == *expected),
    }
}
