use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{debug, warn};

use crate::asset::{AssetKind, Reference};
use crate::cache::{CacheStore, Resolution};
use crate::error::PrefetchError;
use crate::fetch::{AssetSource, content_expected, ensure_scheme};
use crate::savefile::SaveFile;

#[derive(Debug, Clone, Default)]
pub struct PrefetchOptions {
    pub refetch: bool,
    pub ignore_content_type: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Per-document outcome partition, for reporting only.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub save_file: String,
    pub save_name: String,
    pub fetched: Vec<String>,
    pub cached: Vec<String>,
    pub duplicates: Vec<String>,
    pub dry_run: Vec<String>,
    pub failed: Vec<FailedUrl>,
    pub warnings: Vec<String>,
    pub aborted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedUrl {
    pub url: String,
    pub reason: String,
}

enum UrlOutcome {
    Fetched { warned: bool, bytes: u64 },
    AlreadyCached,
    DryRun,
}

pub struct Prefetcher<S: AssetSource> {
    store: CacheStore,
    source: S,
    options: PrefetchOptions,
    abort: Arc<AtomicBool>,
}

impl<S: AssetSource> Prefetcher<S> {
    pub fn new(store: CacheStore, source: S, options: PrefetchOptions) -> Self {
        Self {
            store,
            source,
            options,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cooperative abort token. Setting it stops the batch before the next
    /// URL; a fetch already in flight is never interrupted.
    pub fn abort_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn prefetch_save(
        &self,
        path: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<RunSummary, PrefetchError> {
        let save = SaveFile::load(path)?;
        self.prefetch(&save, sink)
    }

    /// Runs one pass over the save's references: deduplicates identical URLs,
    /// fetches what is missing, and aggregates per-URL outcomes. Per-URL
    /// failures are recorded and the batch continues; batch-fatal errors
    /// propagate to the caller.
    pub fn prefetch(
        &self,
        save: &SaveFile,
        sink: &dyn ProgressSink,
    ) -> Result<RunSummary, PrefetchError> {
        sink.event(ProgressEvent {
            message: format!(
                "Prefetching assets for {} ({}).",
                save.path().display(),
                save.display_name()
            ),
        });

        let mut summary = RunSummary {
            save_file: save.path().display().to_string(),
            save_name: save.display_name().to_string(),
            fetched: Vec::new(),
            cached: Vec::new(),
            duplicates: Vec::new(),
            dry_run: Vec::new(),
            failed: Vec::new(),
            warnings: Vec::new(),
            aborted: false,
        };

        // Scoped to this invocation so concurrent batches stay independent.
        let mut done: HashSet<String> = HashSet::new();

        for reference in save.references() {
            if self.abort.load(Ordering::Relaxed) {
                summary.aborted = true;
                sink.event(ProgressEvent {
                    message: "Aborted.".to_string(),
                });
                break;
            }

            if done.contains(&reference.url) {
                debug!(url = %reference.url, "already processed in this run");
                summary.duplicates.push(reference.url.clone());
                continue;
            }

            match self.fetch_one(&reference) {
                Ok(UrlOutcome::AlreadyCached) => {
                    debug!(url = %reference.url, "already cached");
                    summary.cached.push(reference.url.clone());
                    done.insert(reference.url);
                }
                Ok(UrlOutcome::DryRun) => {
                    sink.event(ProgressEvent {
                        message: format!("{} dry run", reference.url),
                    });
                    summary.dry_run.push(reference.url.clone());
                    done.insert(reference.url);
                }
                Ok(UrlOutcome::Fetched { warned, bytes }) => {
                    sink.event(ProgressEvent {
                        message: format!("{} ({} kb): ok", reference.url, bytes / 1000),
                    });
                    if warned {
                        summary.warnings.push(reference.url.clone());
                    }
                    summary.fetched.push(reference.url.clone());
                    done.insert(reference.url);
                }
                Err(err) if err.is_batch_fatal() => return Err(err),
                Err(err) => {
                    warn!(url = %reference.url, error = %err, "skipping URL");
                    sink.event(ProgressEvent {
                        message: format!("{} error: {err}", reference.url),
                    });
                    summary.failed.push(FailedUrl {
                        url: reference.url,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if !summary.aborted {
            let message = if self.options.dry_run {
                format!("Dry-run for {} completed.", summary.save_file)
            } else {
                format!("Prefetching {} completed.", summary.save_file)
            };
            sink.event(ProgressEvent { message });
        }

        Ok(summary)
    }

    fn fetch_one(&self, reference: &Reference) -> Result<UrlOutcome, PrefetchError> {
        let kind = AssetKind::classify(reference)?;
        let resolution = self.store.resolve(&reference.url, kind);

        // A pending resolution has no complete path to check, so it always
        // proceeds to the fetch.
        if let Resolution::Resolved(relative) = &resolution
            && !self.options.refetch
            && self.store.is_cached(relative)
        {
            return Ok(UrlOutcome::AlreadyCached);
        }

        if self.options.dry_run {
            return Ok(UrlOutcome::DryRun);
        }

        let fetch_url = ensure_scheme(&reference.url);
        let asset = self.source.fetch(&fetch_url)?;

        let matched = content_expected(kind, &asset.content_type);
        if !matched && !self.options.ignore_content_type {
            return Err(PrefetchError::ContentTypeMismatch {
                url: reference.url.clone(),
                content_type: asset.content_type,
            });
        }

        let relative = match resolution {
            Resolution::Resolved(relative) => relative,
            Resolution::Pending(stem) => {
                extend_pending_stem(stem, asset.content_disposition.as_deref(), &reference.url)?
            }
        };

        self.store.write_asset(&relative, &asset.body)?;

        if !matched {
            warn!(
                url = %reference.url,
                content_type = %asset.content_type,
                "content type did not match expected type"
            );
        }

        Ok(UrlOutcome::Fetched {
            warned: !matched,
            bytes: asset
                .content_length
                .unwrap_or(asset.body.len() as u64),
        })
    }
}

/// Picks an image extension from the served filename in Content-Disposition.
/// This is the only place a pending resolution can complete.
fn extend_pending_stem(
    stem: Utf8PathBuf,
    content_disposition: Option<&str>,
    url: &str,
) -> Result<Utf8PathBuf, PrefetchError> {
    let disposition = content_disposition.unwrap_or("");
    let extension = if disposition.contains("jpg") || disposition.contains("jpeg") {
        "jpg"
    } else if disposition.contains("png") {
        "png"
    } else if disposition.contains("mp3") {
        "mp3"
    } else {
        return Err(PrefetchError::ExtensionUndeterminable(url.to_string()));
    };
    Ok(Utf8PathBuf::from(format!("{stem}.{extension}")))
}
