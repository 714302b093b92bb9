//! Append-only CSV record of served predictions.
//!
//! The header is the first logged request's field names, in request order,
//! followed by [`TRAILER_COLUMNS`]. Later rows are aligned to that header by
//! field name. Each row is encoded in memory and written with one
//! `write_all` while the lock is held, so concurrent requests can neither
//! interleave rows nor write a second header.

use chrono::{DateTime, Utc};
use serde_json::Value;
use shared::{PredictionResponse, RawRequest};
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

pub const TRAILER_COLUMNS: [&str; 3] = ["churn_prediction", "churn_probability", "timestamp_utc"];

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Inference log I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Inference log CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Existing file {0} is not an inference log (unexpected header)")]
    UnexpectedHeader(String),
    #[error("Inference log lock poisoned")]
    Poisoned,
}

pub struct InferenceLogger {
    path: PathBuf,
    /// Request columns of the header, once one exists on disk.
    columns: Mutex<Option<Vec<String>>>,
}

impl InferenceLogger {
    /// Opens `path`, reusing the header of an existing non-empty log.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LogError> {
        let path = path.into();
        let columns = read_existing_columns(&path)?;
        if let Some(columns) = &columns {
            log::info!(
                "Appending to existing inference log {} ({} request columns)",
                path.display(),
                columns.len()
            );
        }
        Ok(Self {
            path,
            columns: Mutex::new(columns),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort append: failures are logged and swallowed.
    pub fn record(&self, raw: &RawRequest, response: &PredictionResponse) {
        if let Err(e) = self.append(raw, response, Utc::now()) {
            log::warn!("Failed to append to inference log {}: {}", self.path.display(), e);
        }
    }

    pub fn append(
        &self,
        raw: &RawRequest,
        response: &PredictionResponse,
        at: DateTime<Utc>,
    ) -> Result<(), LogError> {
        let mut columns = self.columns.lock().map_err(|_| LogError::Poisoned)?;

        let (header, bytes) = match columns.as_ref() {
            Some(existing) => (None, encode_rows(existing, false, raw, response, at)?),
            None => {
                let fresh: Vec<String> = raw.keys().cloned().collect();
                let bytes = encode_rows(&fresh, true, raw, response, at)?;
                (Some(fresh), bytes)
            }
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&bytes)?;
        file.flush()?;

        // Only remember the header once it is actually on disk.
        if header.is_some() {
            *columns = header;
        }
        Ok(())
    }

    /// Waits for any in-flight append, then syncs the file to disk.
    pub fn sync(&self) -> Result<(), LogError> {
        let _guard = self.columns.lock().map_err(|_| LogError::Poisoned)?;
        if self.path.exists() {
            OpenOptions::new().append(true).open(&self.path)?.sync_all()?;
        }
        Ok(())
    }
}

fn read_existing_columns(path: &Path) -> Result<Option<Vec<String>>, LogError> {
    let is_empty = match fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => return Err(e.into()),
    };
    if is_empty {
        return Ok(None);
    }

    let columns = {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
        let headers = reader.headers()?;
        let names: Vec<&str> = headers.iter().collect();
        match names.split_last_chunk::<3>() {
            Some((request_columns, trailer)) if *trailer == TRAILER_COLUMNS => request_columns
                .iter()
                .map(|name| name.to_string())
                .collect::<Vec<_>>(),
            _ => return Err(LogError::UnexpectedHeader(path.display().to_string())),
        }
    };

    // Nothing left means the header itself was never terminated.
    if drop_partial_row(path)? == 0 {
        return Ok(None);
    }
    Ok(Some(columns))
}

/// Cuts an unterminated last line left by an interrupted write, so the next
/// append starts on a fresh line. Returns the remaining length.
fn drop_partial_row(path: &Path) -> Result<u64, LogError> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let len = file.seek(SeekFrom::End(0))?;
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(len);
    }

    let mut bytes = Vec::with_capacity(len as usize);
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut bytes)?;
    let keep = bytes
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |i| i as u64 + 1);
    log::warn!(
        "Dropping {} bytes of unterminated row at the end of {}",
        len - keep,
        path.display()
    );
    file.set_len(keep)?;
    Ok(keep)
}

fn encode_rows(
    columns: &[String],
    with_header: bool,
    raw: &RawRequest,
    response: &PredictionResponse,
    at: DateTime<Utc>,
) -> Result<Vec<u8>, LogError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    if with_header {
        writer.write_record(columns.iter().map(String::as_str).chain(TRAILER_COLUMNS))?;
    }

    let row = columns
        .iter()
        .map(|column| raw.get(column).map(render).unwrap_or_default())
        .chain([
            response.churn_prediction.to_string(),
            response.churn_probability.to_string(),
            timestamp(at),
        ]);
    writer.write_record(row)?;

    writer
        .into_inner()
        .map_err(|e| LogError::Io(e.into_error()))
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// UTC, ISO-8601, no offset suffix.
fn timestamp(at: DateTime<Utc>) -> String {
    at.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
