// src/session.rs

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument};

use crate::codec::{self, InvoiceRow};
use crate::config::Config;
use crate::emit::{self, SaveTarget};
use crate::enrich::{self, EnrichStats, JoinColumns};
use crate::error::{DownloadError, MappingFetchError, ProcessError};
use crate::fetch::MappingSource;
use crate::mapping::{self, CodeMapping};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    /// Mapping loaded, nothing processed yet (or reset).
    ReadyForUpload,
    Completed,
    /// The last processing attempt failed; processing may be retried.
    Error,
}

/// The work product of one successful parse + enrich pass.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub file_name: String,
    pub rows: Vec<InvoiceRow>,
    pub headers: Vec<String>,
    pub stats: EnrichStats,
    pub completed_at: DateTime<Local>,
}

/// What gets reported once a pass finishes.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingSummary {
    pub file_name: String,
    pub rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub derived_column: String,
    pub completed_at: String,
}

/// Session state: the mapping loaded at start-up and the latest result.
///
/// Both are replaced wholesale, never edited in place.
#[derive(Debug)]
pub struct Session {
    cols: JoinColumns,
    file_suffix: String,
    mapping: CodeMapping,
    result: Option<ProcessingResult>,
    status: SessionStatus,
}

impl Session {
    pub fn new(mapping: CodeMapping, cfg: &Config) -> Self {
        Self {
            cols: JoinColumns::from_config(cfg),
            file_suffix: cfg.file_suffix.clone(),
            mapping,
            result: None,
            status: SessionStatus::ReadyForUpload,
        }
    }

    /// Load the mapping from `source`. A fetch failure means no session.
    pub async fn start<S: MappingSource>(
        source: &S,
        cfg: &Config,
    ) -> Result<Self, MappingFetchError> {
        let mapping = mapping::load(source).await.map_err(|e| {
            error!(error = %e, "could not load reference mapping");
            e
        })?;
        Ok(Self::new(mapping, cfg))
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn mapping(&self) -> &CodeMapping {
        &self.mapping
    }

    pub fn result(&self) -> Option<&ProcessingResult> {
        self.result.as_ref()
    }

    /// Parse and enrich an uploaded invoice held in memory.
    ///
    /// On failure the previous result is dropped and nothing partial is kept.
    #[instrument(level = "info", skip(self, bytes), fields(size = bytes.len()))]
    pub fn process_bytes(
        &mut self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<&ProcessingResult, ProcessError> {
        self.result = None;
        let table = match codec::parse_table(bytes, true) {
            Ok(table) => table,
            Err(source) => {
                error!(error = %source, "invoice did not parse");
                self.status = SessionStatus::Error;
                return Err(ProcessError::Parse {
                    file_name: file_name.to_string(),
                    source,
                });
            }
        };

        let (rows, headers, stats) =
            enrich::enrich(&table.rows, &table.headers, &self.mapping, &self.cols);
        info!(
            total = stats.total,
            matched = stats.matched,
            unmatched = stats.unmatched,
            "invoice processed"
        );

        self.status = SessionStatus::Completed;
        let result = self.result.insert(ProcessingResult {
            file_name: emit::output_file_name(file_name, &self.file_suffix),
            rows,
            headers,
            stats,
            completed_at: Local::now(),
        });
        Ok(&*result)
    }

    /// Read `path` and process it; the output name derives from its file name.
    pub async fn process_file(&mut self, path: &Path) -> Result<&ProcessingResult, ProcessError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(source) => {
                self.result = None;
                self.status = SessionStatus::Error;
                return Err(ProcessError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.process_bytes(&name, &bytes)
    }

    /// Save the current result through `target`. A failure leaves the result
    /// in place so the download can be retried.
    pub async fn download<T: SaveTarget>(&self, target: &T) -> Result<PathBuf, DownloadError> {
        let result = self.result.as_ref().ok_or(DownloadError::NoResult)?;
        emit::emit(&result.rows, &result.headers, &result.file_name, target)
            .await
            .map_err(|e| {
                error!(error = %e, file = %result.file_name, "download failed");
                e
            })
    }

    /// Forget the current result and wait for the next upload.
    pub fn reset(&mut self) {
        self.result = None;
        self.status = SessionStatus::ReadyForUpload;
    }

    pub fn summary(&self) -> Option<ProcessingSummary> {
        self.result.as_ref().map(|r| ProcessingSummary {
            file_name: r.file_name.clone(),
            rows: r.rows.len(),
            matched: r.stats.matched,
            unmatched: r.stats.unmatched,
            derived_column: self.cols.derived_column.clone(),
            completed_at: r.completed_at.format("%H:%M:%S").to_string(),
        })
    }
}
