//! # Application configuration
//!
//! Holds everything the overlay reads at startup: where the user's files
//! live, how the thumbstick translates touches into keys, and the UI toggles
//! that used to be process-wide flags. The toggles now live in [`UiState`],
//! created once by [`AppConfig::load`] and handed to whoever needs them.
//!
//! Missing configuration degrades to defaults; a configuration file that
//! exists but cannot be parsed is an error.

use crate::controls::keys::KeyCode;
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

const HOME_ENV: &str = "OMW_TOUCH_HOME";
const APP_DIR: &str = "omw-touch";
const CONFIG_DIR: &str = "config";
const LAYOUT_FILE: &str = "UI.cfg";
const SETTINGS_FILE: &str = "settings.cfg";
const USER_OPENMW_CFG: &str = "openmw.cfg";
const APP_CONFIG_FILE: &str = "touch.toml";
const BACKUP_DIR: &str = "backups";
const STAMP_FILE: &str = "stamp";

/// File locations derived from one storage root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paths {
    pub root: PathBuf,
    pub config_dir: PathBuf,
    pub layout_file: PathBuf,
    pub settings_file: PathBuf,
    pub user_openmw_cfg: PathBuf,
    pub app_config_file: PathBuf,
    pub backup_dir: PathBuf,
    pub stamp_file: PathBuf,
}

impl Paths {
    /// `$OMW_TOUCH_HOME`, else the platform data directory.
    pub fn resolve() -> Self {
        if let Some(root) = std::env::var_os(HOME_ENV) {
            return Self::under(root);
        }
        let root = dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .unwrap_or_else(|| {
                warn!("Could not determine data directory, using current directory");
                PathBuf::from(".")
            });
        Self::under(root)
    }

    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let config_dir = root.join(CONFIG_DIR);
        Self {
            layout_file: config_dir.join(LAYOUT_FILE),
            settings_file: config_dir.join(SETTINGS_FILE),
            user_openmw_cfg: config_dir.join(USER_OPENMW_CFG),
            app_config_file: config_dir.join(APP_CONFIG_FILE),
            backup_dir: root.join(BACKUP_DIR),
            stamp_file: root.join(STAMP_FILE),
            config_dir,
            root,
        }
    }
}

/// How the thumbstick holds its run key.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Never press the run key.
    Off,
    /// Press once the stick passes the run threshold, hold until release.
    #[default]
    Latch,
    /// Hold for the whole gesture while the run toggle is on.
    Toggle,
}

/// Touch-to-key tuning for the thumbstick. Ratios are fractions of the radius.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StickSettings {
    pub deadzone_ratio: f32,
    /// Above this, only the dominant axis is pressed.
    pub axis_lock_ratio: f32,
    pub run_mode: RunMode,
    pub run_threshold_ratio: f32,
    pub run_key: KeyCode,
}

impl Default for StickSettings {
    fn default() -> Self {
        Self {
            deadzone_ratio: 0.2,
            axis_lock_ratio: 0.95,
            run_mode: RunMode::default(),
            run_threshold_ratio: 0.9,
            run_key: KeyCode::SHIFT_LEFT,
        }
    }
}

/// Overlay toggles shared by the on-screen controls.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct UiState {
    pub visible: bool,
    pub ui_hidden: bool,
    pub vibration_enabled: bool,
    pub custom_cursor_enabled: bool,
    pub memory_info_enabled: bool,
    pub battery_status_enabled: bool,
    pub logging_enabled: bool,
    pub logcat_enabled: bool,
    pub run_enabled: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            visible: true,
            ui_hidden: false,
            vibration_enabled: true,
            custom_cursor_enabled: false,
            memory_info_enabled: false,
            battery_status_enabled: false,
            logging_enabled: false,
            logcat_enabled: false,
            run_enabled: false,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub stick: StickSettings,
    pub ui: UiState,
}

impl AppConfig {
    pub async fn load(paths: &Paths) -> Result<Self> {
        let path = &paths.app_config_file;
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if {} exists: {}", path.display(), e))?
        {
            info!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read configuration file: {}", e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse configuration file: {}", e))?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub async fn save(&self, paths: &Paths) -> Result<()> {
        tokio::fs::create_dir_all(&paths.config_dir)
            .await
            .map_err(|e| eyre!("Failed to create config directory: {}", e))?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize configuration: {}", e))?;
        tokio::fs::write(&paths.app_config_file, content)
            .await
            .map_err(|e| eyre!("Failed to write configuration file: {}", e))?;

        info!("Configuration saved to {}", paths.app_config_file.display());
        Ok(())
    }
}
