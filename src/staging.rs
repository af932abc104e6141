//! First-run preparation of the user storage root.
//!
//! Copies the bundled configuration tree, creates the user `openmw.cfg` and a
//! default control layout, then writes a version stamp. Existing user files are
//! never overwritten, so running it again is harmless.

use crate::config::Paths;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const USER_OPENMW_CFG_STUB: &str =
    "# This is the user openmw.cfg. Feel free to modify it as you wish.\n";

/// Seven buttons and the thumbstick, placed for a landscape phone screen.
pub const DEFAULT_LAYOUT: &str = "\
ButtonID_1(60.0;2054.6936;18.942787;false;111)
ButtonID_2(60.0;1805.0613;700.42505;false;54)
ButtonID_3(60.0;1942.9843;561.5578;false;30)
ButtonID_4(60.0;1805.0613;422.69055;false;33)
ButtonID_5(60.0;1668.5325;561.5578;false;52)
ButtonID_6(60.0;1335.1458;770.3131;false;62)
ButtonID_7(60.0;750.73267;770.3131;false;66)
ButtonID_99(200.0;200.56776;281.6349;false;29)
";

const FALLBACK_SETTINGS: &str = "settings.fallback.cfg";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What a staging run changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StagingReport {
    pub copied_files: usize,
    pub wrote_user_cfg: bool,
    pub wrote_layout: bool,
    pub wrote_settings: bool,
    pub wrote_stamp: bool,
}

async fn exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| eyre!("Failed to check if {} exists: {}", path.display(), e))
}

async fn write_if_absent(path: &Path, content: &str) -> Result<bool> {
    if exists(path).await? {
        return Ok(false);
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
    debug!("Created {}", path.display());
    Ok(true)
}

/// Copies `src` into `dst` file by file, skipping files already present.
pub async fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    let mut pending: Vec<(PathBuf, PathBuf)> = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from_dir, to_dir)) = pending.pop() {
        tokio::fs::create_dir_all(&to_dir)
            .await
            .map_err(|e| eyre!("Failed to create {}: {}", to_dir.display(), e))?;

        let mut entries = tokio::fs::read_dir(&from_dir)
            .await
            .map_err(|e| eyre!("Failed to read {}: {}", from_dir.display(), e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| eyre!("Failed to list {}: {}", from_dir.display(), e))?
        {
            let from = entry.path();
            let to = to_dir.join(entry.file_name());
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| eyre!("Failed to stat {}: {}", from.display(), e))?;

            if file_type.is_dir() {
                pending.push((from, to));
            } else if exists(&to).await? {
                debug!("Keeping existing {}", to.display());
            } else {
                tokio::fs::copy(&from, &to)
                    .await
                    .map_err(|e| eyre!("Failed to copy {}: {}", from.display(), e))?;
                copied += 1;
            }
        }
    }
    Ok(copied)
}

pub async fn stage_first_run(paths: &Paths, bundle: Option<&Path>) -> Result<StagingReport> {
    let mut report = StagingReport::default();

    tokio::fs::create_dir_all(&paths.config_dir)
        .await
        .map_err(|e| eyre!("Failed to create config directory: {}", e))?;

    match bundle {
        Some(bundle) if exists(bundle).await? => {
            report.copied_files = copy_tree(bundle, &paths.config_dir).await?;
            info!(
                "Copied {} bundled files from {}",
                report.copied_files,
                bundle.display()
            );

            let fallback = bundle.join(FALLBACK_SETTINGS);
            if !exists(&paths.settings_file).await? && exists(&fallback).await? {
                tokio::fs::copy(&fallback, &paths.settings_file)
                    .await
                    .map_err(|e| eyre!("Failed to seed settings file: {}", e))?;
                report.wrote_settings = true;
                info!("Settings seeded from {}", fallback.display());
            }
        }
        Some(bundle) => warn!("Bundle {} not found, skipping copy", bundle.display()),
        None => debug!("No bundle configured"),
    }

    report.wrote_user_cfg = write_if_absent(&paths.user_openmw_cfg, USER_OPENMW_CFG_STUB).await?;
    report.wrote_layout = write_if_absent(&paths.layout_file, DEFAULT_LAYOUT).await?;
    if report.wrote_layout {
        info!("Default layout written to {}", paths.layout_file.display());
    }

    let stamp = match tokio::fs::read_to_string(&paths.stamp_file).await {
        Ok(stamp) => stamp,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(eyre!("Failed to read version stamp: {}", e)),
    };
    if stamp.trim() != VERSION {
        tokio::fs::write(&paths.stamp_file, VERSION)
            .await
            .map_err(|e| eyre!("Failed to write version stamp: {}", e))?;
        report.wrote_stamp = true;
    }

    Ok(report)
}

/// Replaces the user's `settings.cfg` with the bundle's fallback copy.
pub async fn reset_user_settings(paths: &Paths, bundle: &Path) -> Result<()> {
    let fallback = bundle.join(FALLBACK_SETTINGS);
    tokio::fs::copy(&fallback, &paths.settings_file)
        .await
        .map_err(|e| eyre!("Failed to restore {}: {}", fallback.display(), e))?;
    info!("Settings reset from {}", fallback.display());
    Ok(())
}
