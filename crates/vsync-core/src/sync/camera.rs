//! Camera pose synchronization

use super::{Applied, Propagated, SyncAdapter};
use crate::error::Result;
use crate::render::RenderingLayer;
use crate::state::{StateKind, StateSnapshot};
use crate::viewport::ViewportRef;

/// Mirrors the full camera pose across members. Used to couple same-plane
/// viewports of different volumes for side-by-side reading.
///
/// A member already showing the pose is left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraSync;

impl SyncAdapter for CameraSync {
    fn kind(&self) -> StateKind {
        StateKind::Camera
    }

    fn extract(&self, state: &StateSnapshot) -> Option<Propagated> {
        match state {
            StateSnapshot::Camera(camera) => Some(Propagated::Camera(*camera)),
            _ => None,
        }
    }

    fn apply(&self, layer: &dyn RenderingLayer, propagated: &Propagated, target: &ViewportRef) -> Result<Applied> {
        let Propagated::Camera(camera) = propagated else {
            return Ok(Applied::Skipped);
        };
        if layer.camera(target)? == *camera {
            return Ok(Applied::Skipped);
        }
        layer.set_camera(target, *camera)?;
        Ok(Applied::Written)
    }

    fn capture(&self, layer: &dyn RenderingLayer, origin: &ViewportRef) -> Result<Vec<StateSnapshot>> {
        Ok(vec![StateSnapshot::Camera(layer.camera(origin)?)])
    }
}

/// Copy the camera of `source` onto `target` once, outside any synchronizer
pub fn init_camera_sync(layer: &dyn RenderingLayer, source: &ViewportRef, target: &ViewportRef) -> Result<()> {
    let camera = layer.camera(source)?;
    layer.set_camera(target, camera)?;
    layer.request_render(target);
    tracing::debug!("Initialized camera of {} from {}", target, source);
    Ok(())
}
