use color_eyre::{eyre::eyre, Result};
use omw_touch::config::{AppConfig, Paths};
use omw_touch::controls::{LayoutEngine, LayoutStore, Overlay};
use omw_touch::mods::ModsFile;
use omw_touch::settings::SettingsFile;
use omw_touch::staging::stage_first_run;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const BUNDLE_ENV: &str = "OMW_TOUCH_BUNDLE";

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let paths = Paths::resolve();
    info!("Using storage root {}", paths.root.display());

    let bundle = std::env::var_os(BUNDLE_ENV).map(PathBuf::from);
    let report = stage_first_run(&paths, bundle.as_deref()).await?;
    debug!("Staging finished: {:?}", report);

    let config = AppConfig::load(&paths).await?;

    let layout = LayoutEngine::open(LayoutStore::new(&paths.layout_file))
        .map_err(|e| eyre!("Failed to open layout: {}", e))?;
    let overlay = Overlay::new(layout, &config);

    for widget in overlay.layout().widgets() {
        let record = widget.record();
        info!("{} -> {}", widget.as_control().target(), record.key_code);
    }
    if overlay.layout().thumbstick().is_none() {
        warn!("Layout has no thumbstick");
    }

    let catalog = overlay.layout().key_catalog();
    info!(
        "{} keys available: {}",
        catalog.len(),
        catalog
            .iter()
            .map(|key| key.label())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let settings = SettingsFile::new(&paths.settings_file);
    match settings.read() {
        Ok(sections) if !sections.is_empty() => {
            let entries: usize = sections.iter().map(|s| s.entries.len()).sum();
            info!("{} settings in {} sections", entries, sections.len());
        }
        Ok(_) => debug!("No engine settings at {}", paths.settings_file.display()),
        Err(e) => warn!("{}", e),
    }

    match ModsFile::new(&paths.user_openmw_cfg).read_mods() {
        Ok(mods) => {
            let enabled = mods.iter().filter(|m| m.enabled).count();
            info!("{} mods listed, {} enabled", mods.len(), enabled);
        }
        Err(e) => warn!("{}", e),
    }

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
