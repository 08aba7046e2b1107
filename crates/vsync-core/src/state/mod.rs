//! Viewport state snapshots carried by change notifications
//!
//! Snapshots are plain values: once captured they never change, and a
//! synchronizer only ever copies the fields its adapter selects.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::viewport::VolumeId;

/// The kind of state a synchronizer tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Camera,
    Voi,
}

/// Camera pose of a viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    pub position: DVec3,
    pub focal_point: DVec3,
    pub view_up: DVec3,
    pub view_plane_normal: DVec3,
    /// Half-height of the view in world units for parallel projection
    pub parallel_scale: f64,
    /// Vertical field of view in degrees
    pub view_angle: f64,
}

impl CameraSnapshot {
    /// Camera looking along `normal` at `focal_point` from `distance` away.
    pub fn looking_at(focal_point: DVec3, normal: DVec3, view_up: DVec3, distance: f64, parallel_scale: f64) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            position: focal_point + normal * distance,
            focal_point,
            view_up,
            view_plane_normal: normal,
            parallel_scale,
            view_angle: 90.0,
        }
    }

    /// Translate position and focal point together
    pub fn translated(&self, delta: DVec3) -> Self {
        Self {
            position: self.position + delta,
            focal_point: self.focal_point + delta,
            ..*self
        }
    }
}

impl Default for CameraSnapshot {
    fn default() -> Self {
        Self::looking_at(DVec3::ZERO, DVec3::Z, DVec3::NEG_Y, 1.0, 1.0)
    }
}

/// Lower/upper bounds of the intensity window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiRange {
    pub lower: f64,
    pub upper: f64,
}

impl VoiRange {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Linear window conversion: `center ± width / 2`
    pub fn from_window(width: f64, center: f64) -> Self {
        let half = width / 2.0;
        Self {
            lower: center - half,
            upper: center + half,
        }
    }

    pub fn window_width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn window_center(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }
}

/// Colormap identity and its overall opacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColormapFields")]
pub struct Colormap {
    pub name: String,
    pub opacity: f64,
}

#[derive(Deserialize)]
struct ColormapFields {
    name: String,
    opacity: f64,
}

impl From<ColormapFields> for Colormap {
    fn from(fields: ColormapFields) -> Self {
        Colormap::new(fields.name, fields.opacity)
    }
}

impl Colormap {
    /// Opacity is clamped into `[0, 1]`
    pub fn new(name: impl Into<String>, opacity: f64) -> Self {
        Self {
            name: name.into(),
            opacity: opacity.clamp(0.0, 1.0),
        }
    }
}

/// Display properties of one volume inside one viewport
#[derive(Debug, Clone, PartialEq)]
pub struct VoiSnapshot {
    pub range: VoiRange,
    pub invert: bool,
    /// `None` means the default grayscale mapping
    pub colormap: Option<Colormap>,
}

impl VoiSnapshot {
    pub fn new(range: VoiRange) -> Self {
        Self {
            range,
            invert: false,
            colormap: None,
        }
    }

    pub fn with_colormap(mut self, colormap: Colormap) -> Self {
        self.colormap = Some(colormap);
        self
    }

    /// Merge a partial update; fields the update leaves out stay untouched.
    pub fn apply(&mut self, update: &VoiUpdate) {
        if let Some(range) = update.range {
            self.range = range;
        }
        if let Some(invert) = update.invert {
            self.invert = invert;
        }
        if let Some(colormap) = &update.colormap {
            self.colormap = Some(colormap.clone());
        }
    }
}

/// Partial display-property write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiUpdate {
    pub range: Option<VoiRange>,
    pub invert: Option<bool>,
    pub colormap: Option<Colormap>,
}

impl VoiUpdate {
    pub fn is_empty(&self) -> bool {
        self.range.is_none() && self.invert.is_none() && self.colormap.is_none()
    }
}

/// New state carried by a change notification
#[derive(Debug, Clone, PartialEq)]
pub enum StateSnapshot {
    Camera(CameraSnapshot),
    Voi {
        volume_id: VolumeId,
        snapshot: VoiSnapshot,
        /// Whether this change toggled the inversion flag
        invert_changed: bool,
    },
}

impl StateSnapshot {
    pub fn kind(&self) -> StateKind {
        match self {
            StateSnapshot::Camera(_) => StateKind::Camera,
            StateSnapshot::Voi { .. } => StateKind::Voi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_conversion() {
        let range = VoiRange::from_window(400.0, 40.0);
        assert_eq!(range, VoiRange::new(-160.0, 240.0));
        assert_eq!(range.window_width(), 400.0);
        assert_eq!(range.window_center(), 40.0);
    }

    #[test]
    fn test_colormap_opacity_is_clamped() {
        assert_eq!(Colormap::new("hsv", 1.7).opacity, 1.0);
        assert_eq!(Colormap::new("hsv", -0.2).opacity, 0.0);
        assert_eq!(Colormap::new("hsv", 0.4).opacity, 0.4);
    }

    #[test]
    fn test_deserialized_opacity_is_clamped() {
        let colormap: Colormap = serde_json::from_str(r#"{"name":"hsv","opacity":1.7}"#).unwrap();
        assert_eq!(colormap, Colormap::new("hsv", 1.0));

        let colormap: Colormap = serde_json::from_str(r#"{"name":"hsv","opacity":-3.0}"#).unwrap();
        assert_eq!(colormap.opacity, 0.0);
    }

    #[test]
    fn test_partial_update_merges() {
        let mut voi = VoiSnapshot::new(VoiRange::new(0.0, 5.0)).with_colormap(Colormap::new("hsv", 0.5));
        voi.invert = true;

        voi.apply(&VoiUpdate {
            range: Some(VoiRange::new(100.0, 300.0)),
            ..Default::default()
        });

        assert_eq!(voi.range, VoiRange::new(100.0, 300.0));
        assert!(voi.invert);
        assert_eq!(voi.colormap, Some(Colormap::new("hsv", 0.5)));
        assert!(VoiUpdate::default().is_empty());
    }

    #[test]
    fn test_translated_camera_keeps_orientation() {
        let camera = CameraSnapshot::default();
        let moved = camera.translated(DVec3::new(1.0, 2.0, 0.0));

        assert_eq!(moved.focal_point, DVec3::new(1.0, 2.0, 0.0));
        assert_eq!(moved.position - moved.focal_point, camera.position - camera.focal_point);
        assert_eq!(moved.view_up, camera.view_up);
        assert_eq!(moved.parallel_scale, camera.parallel_scale);
    }
}
