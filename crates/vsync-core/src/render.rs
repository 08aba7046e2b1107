//! The narrow contract the engine needs from a rendering layer

use crate::error::RenderError;
use crate::events::{ChangeHandler, SubscriptionId};
use crate::state::{CameraSnapshot, StateKind, VoiSnapshot, VoiUpdate};
use crate::viewport::{ViewportRef, VolumeId};

/// Get/set access to viewport camera and display properties, plus the
/// per-viewport change-event stream.
///
/// Implementations are expected to emit a change notification after each
/// successful `set_*` call, on the calling thread, once their own locks
/// are released.
pub trait RenderingLayer: Send + Sync {
    /// Current camera of a viewport
    fn camera(&self, viewport: &ViewportRef) -> Result<CameraSnapshot, RenderError>;

    /// Replace the camera of a viewport
    fn set_camera(&self, viewport: &ViewportRef, camera: CameraSnapshot) -> Result<(), RenderError>;

    /// Volumes rendered by a viewport; a fusion viewport returns more than one
    fn volume_ids(&self, viewport: &ViewportRef) -> Result<Vec<VolumeId>, RenderError>;

    /// Display properties of one volume in one viewport
    fn display_properties(&self, viewport: &ViewportRef, volume: &VolumeId) -> Result<VoiSnapshot, RenderError>;

    /// Merge a partial update into the display properties of one volume
    fn set_display_properties(
        &self,
        viewport: &ViewportRef,
        volume: &VolumeId,
        update: &VoiUpdate,
    ) -> Result<(), RenderError>;

    /// Ask for the viewport to be redrawn
    fn request_render(&self, _viewport: &ViewportRef) {}

    /// Register a handler for `kind` changes on `viewport`
    fn subscribe(&self, viewport: &ViewportRef, kind: StateKind, handler: ChangeHandler) -> SubscriptionId;

    /// Drop a subscription returned by [`RenderingLayer::subscribe`]
    fn unsubscribe(&self, id: SubscriptionId);
}
