//! Emulated interaction tools
//!
//! Each gesture mutates one viewport the way a tool binding would and emits
//! the change event synchronizers consume. Tool writes are not counted as
//! applies; only writes arriving through the rendering-layer contract are.

use glam::{DQuat, DVec3};

use vsync_core::{CameraSnapshot, Colormap, RenderError, ViewportRef, VoiRange, VoiSnapshot, VolumeId};

use crate::HeadlessRenderer;

/// Smallest parallel scale a zoom can reach
pub const MIN_PARALLEL_SCALE: f64 = 1e-3;

/// Smallest window width a window/level drag can reach
pub const MIN_WINDOW_WIDTH: f64 = 1.0;

impl HeadlessRenderer {
    /// Pan: move position and focal point together
    pub fn pan(&self, viewport: &ViewportRef, delta: DVec3) -> Result<CameraSnapshot, RenderError> {
        self.write_camera(viewport, false, |camera| camera.translated(delta))
    }

    /// Zoom by `factor` (> 1 zooms in)
    pub fn zoom(&self, viewport: &ViewportRef, factor: f64) -> Result<CameraSnapshot, RenderError> {
        self.write_camera(viewport, false, |camera| CameraSnapshot {
            parallel_scale: (camera.parallel_scale / factor).max(MIN_PARALLEL_SCALE),
            ..*camera
        })
    }

    /// Roll the view around its view-plane normal
    pub fn rotate(&self, viewport: &ViewportRef, degrees: f64) -> Result<CameraSnapshot, RenderError> {
        self.write_camera(viewport, false, |camera| {
            let roll = DQuat::from_axis_angle(camera.view_plane_normal.normalize_or_zero(), degrees.to_radians());
            CameraSnapshot {
                view_up: roll * camera.view_up,
                ..*camera
            }
        })
    }

    /// Window/level drag: adjust width and center of one volume's window
    pub fn window_level(
        &self,
        viewport: &ViewportRef,
        volume: &VolumeId,
        delta_width: f64,
        delta_center: f64,
    ) -> Result<VoiSnapshot, RenderError> {
        self.write_voi(viewport, volume, false, |voi| {
            let width = (voi.range.window_width() + delta_width).max(MIN_WINDOW_WIDTH);
            let center = voi.range.window_center() + delta_center;
            voi.range = VoiRange::from_window(width, center);
        })
    }

    pub fn set_voi_range(&self, viewport: &ViewportRef, volume: &VolumeId, range: VoiRange) -> Result<VoiSnapshot, RenderError> {
        self.write_voi(viewport, volume, false, |voi| voi.range = range)
    }

    pub fn set_invert(&self, viewport: &ViewportRef, volume: &VolumeId, invert: bool) -> Result<VoiSnapshot, RenderError> {
        self.write_voi(viewport, volume, false, |voi| voi.invert = invert)
    }

    pub fn set_colormap(
        &self,
        viewport: &ViewportRef,
        volume: &VolumeId,
        colormap: Colormap,
    ) -> Result<VoiSnapshot, RenderError> {
        self.write_voi(viewport, volume, false, |voi| voi.colormap = Some(colormap))
    }

    /// Opacity slider; a volume without a colormap gets a grayscale one
    pub fn set_opacity(&self, viewport: &ViewportRef, volume: &VolumeId, opacity: f64) -> Result<VoiSnapshot, RenderError> {
        self.write_voi(viewport, volume, false, |voi| {
            let name = voi
                .colormap
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "Grayscale".to_string());
            voi.colormap = Some(Colormap::new(name, opacity));
        })
    }
}
