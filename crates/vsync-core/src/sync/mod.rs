//! Synchronization of camera and VOI state across viewports
//!
//! A [`Synchronizer`] listens to the change events of its *source* members
//! and pushes the relevant part of each change to every other member,
//! source or *target*. What "relevant part" means is decided by a
//! [`SyncAdapter`]: [`CameraSync`] copies the whole pose, [`VoiSync`]
//! copies windowing and, depending on its options, inversion and colormap.

mod camera;
mod cascade;
mod registry;
mod synchronizer;
mod voi;

pub use camera::{init_camera_sync, CameraSync};
pub use registry::{global, install_global, SynchronizerRegistry};
pub use synchronizer::{SyncStats, Synchronizer, SynchronizerState};
pub use voi::{VoiSync, VoiSyncOptions};

use crate::error::Result;
use crate::render::RenderingLayer;
use crate::state::{CameraSnapshot, StateKind, StateSnapshot, VoiUpdate};
use crate::viewport::{ViewportRef, VolumeId};

/// The sub-state extracted from a notification, ready to be written to members
#[derive(Debug, Clone, PartialEq)]
pub enum Propagated {
    Camera(CameraSnapshot),
    Voi { volume_id: VolumeId, update: VoiUpdate },
}

/// Outcome of writing propagated state to one member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Written,
    /// The member has nothing this state applies to
    Skipped,
}

/// Kind-specific extraction and application of state
pub trait SyncAdapter: Send + Sync {
    /// State kind this adapter subscribes to
    fn kind(&self) -> StateKind;

    /// Select what propagates out of a new state. `None` means nothing does.
    fn extract(&self, state: &StateSnapshot) -> Option<Propagated>;

    /// Write propagated state to one member, leaving unselected fields alone
    fn apply(&self, layer: &dyn RenderingLayer, propagated: &Propagated, target: &ViewportRef) -> Result<Applied>;

    /// Read the current state of a viewport as it would appear in a notification
    fn capture(&self, layer: &dyn RenderingLayer, origin: &ViewportRef) -> Result<Vec<StateSnapshot>>;
}
