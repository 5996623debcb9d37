// src/emit.rs

use std::{
    future::Future,
    path::{Path, PathBuf},
};
use tokio::fs;
use tracing::{info, instrument};

use crate::codec::{self, InvoiceRow, BOM};
use crate::error::DownloadError;

/// The host's file-save mechanism.
pub trait SaveTarget {
    /// Store `bytes` under `file_name`, returning where they landed.
    fn save(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<PathBuf, DownloadError>> + Send;
}

/// Saves into a directory on the local file system.
#[derive(Debug, Clone)]
pub struct DirectoryTarget {
    dir: PathBuf,
}

impl DirectoryTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveTarget for DirectoryTarget {
    fn save(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<PathBuf, DownloadError>> + Send {
        let dest = self.dir.join(file_name);
        let bytes = bytes.to_vec();
        let dir = self.dir.clone();
        async move {
            let write_err = |path: &Path| {
                let path = path.to_path_buf();
                move |source: std::io::Error| DownloadError::Write { path, source }
            };
            fs::create_dir_all(&dir).await.map_err(write_err(&dir))?;
            fs::write(&dest, &bytes).await.map_err(write_err(&dest))?;
            Ok(dest)
        }
    }
}

/// Output name for an uploaded file: its stem, `suffix`, then `.csv`.
///
/// `orders.csv` with suffix `_옵션추가완료` becomes `orders_옵션추가완료.csv`.
pub fn output_file_name(input_name: &str, suffix: &str) -> String {
    let path = Path::new(input_name);
    // A dotfile such as `.csv` is all extension.
    let stem = match (path.file_stem(), path.file_name()) {
        (Some(stem), Some(name)) if stem == name && stem.to_string_lossy().starts_with('.') => {
            None
        }
        (stem, _) => stem,
    };
    let stem = stem
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "invoice".to_string());
    format!("{}{}.csv", stem, suffix)
}

/// CSV text prefixed with a UTF-8 byte-order mark, so spreadsheet tools pick
/// the right character set.
pub fn encode_with_bom(rows: &[InvoiceRow], headers: &[String]) -> Result<Vec<u8>, csv::Error> {
    let csv = codec::serialize(rows, headers)?;
    let mut out = Vec::with_capacity(BOM.len() + csv.len());
    out.extend_from_slice(BOM.as_bytes());
    out.extend_from_slice(csv.as_bytes());
    Ok(out)
}

/// Serialize and hand the payload to `target`. Not retried on failure.
#[instrument(level = "info", skip(rows, headers, target), fields(row_count = rows.len()))]
pub async fn emit<T: SaveTarget>(
    rows: &[InvoiceRow],
    headers: &[String],
    file_name: &str,
    target: &T,
) -> Result<PathBuf, DownloadError> {
    let payload = encode_with_bom(rows, headers)?;
    let path = target.save(file_name, &payload).await?;
    info!(path = %path.display(), bytes = payload.len(), "saved output");
    Ok(path)
}
