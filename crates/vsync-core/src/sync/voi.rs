//! VOI (windowing) synchronization

use serde::{Deserialize, Serialize};

use super::{Applied, Propagated, SyncAdapter};
use crate::error::Result;
use crate::render::RenderingLayer;
use crate::state::{StateKind, StateSnapshot, VoiUpdate};
use crate::viewport::ViewportRef;

/// Which VOI sub-fields propagate besides the window itself.
///
/// Unknown flags are rejected when parsed from a configuration document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VoiSyncOptions {
    /// Propagate the inversion flag when a change toggles it
    pub sync_invert_state: bool,
    /// Propagate colormap identity and opacity
    pub sync_colormap: bool,
}

/// Mirrors windowing of one volume across members.
///
/// VOI state lives per (viewport, volume). A member is written on the
/// volume named by the change if it renders that volume, otherwise on its
/// only volume; a fusion member rendering neither is skipped, as is a
/// member whose properties would not change.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoiSync {
    options: VoiSyncOptions,
}

impl VoiSync {
    pub fn new(options: VoiSyncOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> VoiSyncOptions {
        self.options
    }
}

impl SyncAdapter for VoiSync {
    fn kind(&self) -> StateKind {
        StateKind::Voi
    }

    fn extract(&self, state: &StateSnapshot) -> Option<Propagated> {
        let StateSnapshot::Voi { volume_id, snapshot, invert_changed } = state else {
            return None;
        };

        let update = VoiUpdate {
            range: Some(snapshot.range),
            invert: (self.options.sync_invert_state && *invert_changed).then_some(snapshot.invert),
            colormap: if self.options.sync_colormap {
                snapshot.colormap.clone()
            } else {
                None
            },
        };

        Some(Propagated::Voi {
            volume_id: volume_id.clone(),
            update,
        })
    }

    fn apply(&self, layer: &dyn RenderingLayer, propagated: &Propagated, target: &ViewportRef) -> Result<Applied> {
        let Propagated::Voi { volume_id, update } = propagated else {
            return Ok(Applied::Skipped);
        };

        let volumes = layer.volume_ids(target)?;
        let volume = if volumes.contains(volume_id) {
            volume_id
        } else if let [only] = volumes.as_slice() {
            only
        } else {
            tracing::debug!("{} does not render {} and has {} volumes", target, volume_id, volumes.len());
            return Ok(Applied::Skipped);
        };

        let current = layer.display_properties(target, volume)?;
        let mut merged = current.clone();
        merged.apply(update);
        if merged == current {
            return Ok(Applied::Skipped);
        }

        layer.set_display_properties(target, volume, update)?;
        Ok(Applied::Written)
    }

    fn capture(&self, layer: &dyn RenderingLayer, origin: &ViewportRef) -> Result<Vec<StateSnapshot>> {
        layer
            .volume_ids(origin)?
            .into_iter()
            .map(|volume_id| {
                let snapshot = layer.display_properties(origin, &volume_id)?;
                Ok(StateSnapshot::Voi {
                    volume_id,
                    snapshot,
                    invert_changed: true,
                })
            })
            .collect()
    }
}
