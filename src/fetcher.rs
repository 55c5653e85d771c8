//! Bounded parallel download of report PDFs
//!
//! Downloads run on a fixed-size rayon pool. Every reference gets at most one
//! attempt, and a failed download is logged and left out of the result without
//! affecting the other tasks.

use crate::http::HttpSource;
use crate::ScrapeError;
use log::{error, info, warn};
use rayon::prelude::*;
use reqwest::Url;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// URL of a report PDF
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentReference(String);

impl DocumentReference {
    pub fn new(url: impl Into<String>) -> Self {
        DocumentReference(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Local file name for this reference: the final URL path segment
    pub fn file_name(&self) -> Option<String> {
        let url = Url::parse(&self.0).ok()?;
        let segment = url.path_segments()?.last()?;
        if segment.is_empty() || segment == "." || segment == ".." {
            return None;
        }
        Some(segment.to_string())
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A PDF saved to the download directory
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedDocument {
    pub path: PathBuf,
    /// Source URL; `None` for files that were not downloaded by the fetcher
    pub reference: Option<DocumentReference>,
}

impl DownloadedDocument {
    pub fn local(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            reference: None,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Downloads reference sets into one directory with a bounded worker pool
pub struct DocumentFetcher<H> {
    http: H,
    download_dir: PathBuf,
    max_concurrent: usize,
}

impl<H: HttpSource> DocumentFetcher<H> {
    pub fn new(http: H, download_dir: impl Into<PathBuf>, max_concurrent: usize) -> Self {
        Self {
            http,
            download_dir: download_dir.into(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Download every reference, returning the successes in completion-independent order
    ///
    /// Only setup failures (download directory, worker pool) are errors.
    pub fn fetch_all(
        &self,
        refs: &BTreeSet<DocumentReference>,
    ) -> Result<Vec<DownloadedDocument>, ScrapeError> {
        let jobs = plan_downloads(refs);
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        fs::create_dir_all(&self.download_dir)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_concurrent)
            .thread_name(|i| format!("pdf-download-{}", i))
            .build()
            .map_err(|e| ScrapeError::Config(format!("failed to build download pool: {}", e)))?;

        let results: Vec<Option<DownloadedDocument>> = pool.install(|| {
            jobs.par_iter()
                .map(|(reference, file_name)| match self.download(reference, file_name) {
                    Ok(document) => {
                        info!("PDF saved as: {}", document.path.display());
                        Some(document)
                    }
                    Err(e) => {
                        error!("Failed to download PDF from {}: {}", reference, e);
                        None
                    }
                })
                .collect()
        });

        let documents: Vec<DownloadedDocument> = results.into_iter().flatten().collect();
        info!("Downloaded {}/{} PDFs", documents.len(), jobs.len());
        Ok(documents)
    }

    fn download(
        &self,
        reference: &DocumentReference,
        file_name: &str,
    ) -> Result<DownloadedDocument, ScrapeError> {
        let response = self
            .http
            .get(reference.as_str(), &[])?
            .error_for_status(reference.as_str())?;

        // Write through a sibling temp file so a partial body never sits under the final name
        let path = self.download_dir.join(file_name);
        let partial = self.download_dir.join(format!("{}.part", file_name));
        if let Err(e) = fs::write(&partial, &response.body).and_then(|_| fs::rename(&partial, &path)) {
            if partial.exists() {
                if let Err(cleanup) = fs::remove_file(&partial) {
                    warn!("Could not remove {}: {}", partial.display(), cleanup);
                }
            }
            return Err(e.into());
        }

        Ok(DownloadedDocument {
            path,
            reference: Some(reference.clone()),
        })
    }
}

/// Pair each reference with its target file name, one reference per name
fn plan_downloads(refs: &BTreeSet<DocumentReference>) -> Vec<(DocumentReference, String)> {
    let mut seen = HashSet::new();
    let mut jobs = Vec::with_capacity(refs.len());

    for reference in refs {
        let Some(file_name) = reference.file_name() else {
            warn!("Skipping {}: URL has no file name", reference);
            continue;
        };
        if !seen.insert(file_name.clone()) {
            warn!(
                "Skipping {}: another reference already downloads to {}",
                reference, file_name
            );
            continue;
        }
        jobs.push((reference.clone(), file_name));
    }

    jobs
}
