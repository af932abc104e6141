//! Layout backups: copy `UI.cfg` out to a timestamped file and back in.

use crate::config::Paths;
use crate::controls::store::parse_records;
use chrono::Local;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::info;

const EXPORT_PREFIX: &str = "UI_";
const EXPORT_EXTENSION: &str = "cfg";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub async fn export_layout(paths: &Paths) -> Result<PathBuf> {
    if !tokio::fs::try_exists(&paths.layout_file)
        .await
        .map_err(|e| eyre!("Failed to check if layout file exists: {}", e))?
    {
        return Err(eyre!(
            "No layout to export at {}",
            paths.layout_file.display()
        ));
    }

    tokio::fs::create_dir_all(&paths.backup_dir)
        .await
        .map_err(|e| eyre!("Failed to create backup directory: {}", e))?;

    let stamp = Local::now().format(TIMESTAMP_FORMAT);
    let target = paths
        .backup_dir
        .join(format!("{EXPORT_PREFIX}{stamp}.{EXPORT_EXTENSION}"));

    tokio::fs::copy(&paths.layout_file, &target)
        .await
        .map_err(|e| eyre!("Failed to export layout: {}", e))?;

    info!("Layout exported to {}", target.display());
    Ok(target)
}

/// Replaces the current layout with `source`. A file without a single
/// valid record is refused and the current layout is left alone.
pub async fn import_layout(paths: &Paths, source: &Path) -> Result<usize> {
    let content = tokio::fs::read_to_string(source)
        .await
        .map_err(|e| eyre!("Failed to read {}: {}", source.display(), e))?;

    let records = parse_records(&content);
    if records.is_empty() {
        return Err(eyre!(
            "{} contains no control records",
            source.display()
        ));
    }

    tokio::fs::create_dir_all(&paths.config_dir)
        .await
        .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
    tokio::fs::write(&paths.layout_file, content)
        .await
        .map_err(|e| eyre!("Failed to write layout file: {}", e))?;

    info!(
        "Imported {} records from {}",
        records.len(),
        source.display()
    );
    Ok(records.len())
}
