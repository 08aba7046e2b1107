//! Main application entry point

use anyhow::{Context, Result};
use tracing::info;

use vsync_core::{install_global, SyncConfig};

mod demo;

/// Layout used when no document is given on the command line
pub(crate) const DEFAULT_LAYOUT: &str = include_str!("../fusion_layout.json");

fn load_layout() -> Result<SyncConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading synchronizer layout from {}", path);
            SyncConfig::from_path(&path).with_context(|| format!("Failed to load layout {}", path))
        }
        None => SyncConfig::from_json_str(DEFAULT_LAYOUT).context("Built-in layout is invalid"),
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting viewport synchronization demo");

    let layout = load_layout()?;
    let renderer = demo::build_viewports();
    let registry = install_global(renderer.clone())?;
    let synchronizers = layout.apply(registry)?;
    info!("Wired {} synchronizers", synchronizers.len());

    demo::initialize_camera_sync(&renderer)?;
    demo::run_session(&renderer, registry)?;
    demo::report(registry);

    registry.dispose_all();
    info!("Disposed all synchronizers");
    Ok(())
}
