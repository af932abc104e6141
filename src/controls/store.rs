//! Durable mirror of the control layout (`UI.cfg`).
//!
//! One record per line:
//!
//! ```text
//! ButtonID_<id>(<size>;<offsetX>;<offsetY>;<isLocked>;<keyCode>)
//! ```
//!
//! Lines that do not match are skipped. The file is always rewritten in full,
//! and the thumbstick record survives every rewrite.

use crate::controls::keys::KeyCode;
use crate::controls::widget::{WidgetRecord, THUMBSTICK_ID};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info, warn};

static RECORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ButtonID_(\d+)\(([\d.]+);([\d.]+);([\d.]+);(true|false);(\d+)\)")
        .expect("record pattern is a valid regex")
});

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read layout file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create layout directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write layout file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parses one line. `None` for anything outside the grammar, including numbers
/// that match the pattern but do not parse (`1.2.3`, ids beyond `u32`).
pub fn parse_record(line: &str) -> Option<WidgetRecord> {
    let caps = RECORD_PATTERN.captures(line)?;
    Some(WidgetRecord {
        id: caps[1].parse().ok()?,
        size: caps[2].parse().ok()?,
        offset_x: caps[3].parse().ok()?,
        offset_y: caps[4].parse().ok()?,
        is_locked: &caps[5] == "true",
        key_code: KeyCode(caps[6].parse().ok()?),
    })
}

/// Parses a whole file, keeping the first record for each id.
pub fn parse_records(content: &str) -> Vec<WidgetRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(line) {
            Some(record) if seen.insert(record.id) => records.push(record),
            Some(record) => warn!(
                "Skipping duplicate layout record for id {} on line {}",
                record.id,
                index + 1
            ),
            None => warn!("Skipping malformed layout line {}: {:?}", index + 1, line),
        }
    }

    records
}

pub fn render_records(records: &[WidgetRecord]) -> String {
    records.iter().map(|r| format!("{r}\n")).collect()
}

#[derive(Clone, Debug)]
pub struct LayoutStore {
    path: PathBuf,
}

impl LayoutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every valid record. A missing file is an empty layout.
    pub fn load(&self) -> Result<Vec<WidgetRecord>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No layout file at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let records = parse_records(&content);
        debug!(
            "Loaded {} layout records from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }

    /// Replaces the file with `records`.
    ///
    /// The thumbstick record is taken from `records` when present, otherwise
    /// carried forward from the current file.
    pub fn save(&self, records: &[WidgetRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let thumbstick = match records.iter().rev().find(|r| r.is_thumbstick()) {
            Some(stick) => Some(stick.clone()),
            None => self.load()?.into_iter().find(|r| r.id == THUMBSTICK_ID),
        };

        let mut seen = HashSet::new();
        let mut output: Vec<WidgetRecord> = Vec::with_capacity(records.len() + 1);
        // Last write for an id wins.
        for record in records.iter().rev().filter(|r| !r.is_thumbstick()) {
            if seen.insert(record.id) {
                output.push(record.clone());
            }
        }
        output.reverse();
        output.extend(thumbstick);

        fs::write(&self.path, render_records(&output)).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        info!(
            "Saved {} layout records to {}",
            output.len(),
            self.path.display()
        );
        Ok(())
    }
}
