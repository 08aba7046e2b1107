//! Synchronizer wiring loaded from a configuration document
//!
//! A document lists synchronizers with their kind, members and options:
//!
//! ```json
//! {
//!   "synchronizers": [
//!     {
//!       "id": "CT_VOI_SYNCHRONIZER_ID",
//!       "kind": "voi",
//!       "options": { "sync_invert_state": false, "sync_colormap": false },
//!       "sources": [{ "rendering_engine_id": "engine", "viewport_id": "CT_AXIAL" }],
//!       "targets": [{ "rendering_engine_id": "engine", "viewport_id": "FUSION_AXIAL" }]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::state::StateKind;
use crate::sync::{Synchronizer, SynchronizerRegistry, VoiSyncOptions};
use crate::viewport::ViewportRef;

/// Configuration of one synchronizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynchronizerConfig {
    pub id: String,
    pub kind: StateKind,

    /// VOI filtering flags; not accepted for camera synchronizers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<VoiSyncOptions>,

    #[serde(default)]
    pub sources: Vec<ViewportRef>,

    #[serde(default)]
    pub targets: Vec<ViewportRef>,
}

/// A full synchronization layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    pub synchronizers: Vec<SynchronizerConfig>,
}

impl SyncConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SyncConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check ids are unique, member lists hold no duplicates and options
    /// only appear on VOI synchronizers
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for sync in &self.synchronizers {
            if !ids.insert(sync.id.as_str()) {
                return Err(SyncError::Config(format!("duplicate synchronizer id '{}'", sync.id)));
            }
            if sync.kind == StateKind::Camera && sync.options.is_some() {
                return Err(SyncError::Config(format!(
                    "camera synchronizer '{}' does not take options",
                    sync.id
                )));
            }
            for (list, members) in [("sources", &sync.sources), ("targets", &sync.targets)] {
                let mut seen = HashSet::new();
                if let Some(dup) = members.iter().find(|m| !seen.insert(*m)) {
                    return Err(SyncError::Config(format!(
                        "{} listed twice in {} of '{}'",
                        dup, list, sync.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Create and wire every synchronizer. On failure nothing stays registered.
    pub fn apply(&self, registry: &SynchronizerRegistry) -> Result<Vec<Arc<Synchronizer>>> {
        self.validate()?;

        let mut created: Vec<Arc<Synchronizer>> = Vec::with_capacity(self.synchronizers.len());
        let result = self.wire(registry, &mut created);

        if let Err(err) = result {
            tracing::warn!("Synchronization layout rejected: {}", err);
            for sync in &created {
                registry.dispose(sync.id());
            }
            return Err(err);
        }

        tracing::info!("Wired {} synchronizer(s)", created.len());
        Ok(created)
    }

    fn wire(&self, registry: &SynchronizerRegistry, created: &mut Vec<Arc<Synchronizer>>) -> Result<()> {
        for config in &self.synchronizers {
            let sync = match config.kind {
                StateKind::Camera => registry.create_camera_synchronizer(config.id.clone())?,
                StateKind::Voi => {
                    registry.create_voi_synchronizer(config.id.clone(), config.options.unwrap_or_default())?
                }
            };
            created.push(sync.clone());

            for source in &config.sources {
                sync.add_source(source.clone())?;
            }
            for target in &config.targets {
                sync.add_target(target.clone())?;
            }
        }
        Ok(())
    }
}
