//! Cross-viewport synchronization engine
//!
//! Keeps camera pose and VOI (windowing) state coherent across
//! independently rendered viewports, e.g. the axial/sagittal/coronal views
//! of a CT, a PET and their fusion. Rendering itself stays outside this
//! crate: it is reached through the [`RenderingLayer`] contract.

pub mod config;
pub mod error;
pub mod events;
pub mod render;
pub mod state;
pub mod sync;
pub mod viewport;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::{SyncConfig, SynchronizerConfig};
pub use error::{RenderError, Result, SyncError};
pub use events::{ChangeHandler, ChangeNotification, SubscriptionId, ViewportEventBus};
pub use render::RenderingLayer;
pub use state::{CameraSnapshot, Colormap, StateKind, StateSnapshot, VoiRange, VoiSnapshot, VoiUpdate};
pub use sync::{
    global, init_camera_sync, install_global, Applied, CameraSync, Propagated, SyncAdapter, SyncStats, Synchronizer,
    SynchronizerRegistry, SynchronizerState, VoiSync, VoiSyncOptions,
};
pub use viewport::{ViewportRef, VolumeId};
