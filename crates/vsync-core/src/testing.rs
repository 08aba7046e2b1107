//! In-crate rendering layer for unit tests

use std::sync::Arc;

use ahash::AHashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::error::RenderError;
use crate::events::{ChangeHandler, ChangeNotification, SubscriptionId, ViewportEventBus};
use crate::render::RenderingLayer;
use crate::state::{CameraSnapshot, StateKind, StateSnapshot, VoiRange, VoiSnapshot, VoiUpdate};
use crate::viewport::{ViewportRef, VolumeId};

struct FakeViewport {
    camera: CameraSnapshot,
    volumes: IndexMap<VolumeId, VoiSnapshot>,
    writes: usize,
}

pub(crate) struct FakeLayer {
    bus: ViewportEventBus,
    viewports: Mutex<AHashMap<ViewportRef, FakeViewport>>,
}

impl FakeLayer {
    /// Viewports on engine "engine", each rendering a single "ct" volume
    pub(crate) fn with_viewports(ids: &[&str]) -> Arc<Self> {
        let layer = Arc::new(Self {
            bus: ViewportEventBus::new(),
            viewports: Mutex::new(AHashMap::new()),
        });
        for id in ids {
            layer.add_viewport(id, &["ct"]);
        }
        layer
    }

    pub(crate) fn add_viewport(&self, id: &str, volumes: &[&str]) {
        let volumes = volumes
            .iter()
            .map(|v| (VolumeId::from(*v), VoiSnapshot::new(VoiRange::new(0.0, 100.0))))
            .collect();
        self.viewports.lock().insert(
            ViewportRef::new("engine", id),
            FakeViewport {
                camera: CameraSnapshot::default(),
                volumes,
                writes: 0,
            },
        );
    }

    pub(crate) fn subscriber_count(&self, viewport: &ViewportRef) -> usize {
        self.bus.subscriber_count(viewport, StateKind::Camera) + self.bus.subscriber_count(viewport, StateKind::Voi)
    }

    pub(crate) fn writes(&self, viewport: &ViewportRef) -> usize {
        self.viewports.lock().get(viewport).map(|v| v.writes).unwrap_or(0)
    }

    pub(crate) fn camera_of(&self, viewport: &ViewportRef) -> Option<CameraSnapshot> {
        self.viewports.lock().get(viewport).map(|v| v.camera)
    }

    pub(crate) fn voi_of(&self, viewport: &ViewportRef, volume: &str) -> Option<VoiSnapshot> {
        self.viewports
            .lock()
            .get(viewport)
            .and_then(|v| v.volumes.get(&VolumeId::from(volume)).cloned())
    }

    pub(crate) fn set_camera_silently(&self, viewport: &ViewportRef, camera: CameraSnapshot) {
        if let Some(v) = self.viewports.lock().get_mut(viewport) {
            v.camera = camera;
        }
    }

    /// A tool changing the camera: updates state and emits the change event
    pub(crate) fn user_set_camera(&self, viewport: &ViewportRef, camera: CameraSnapshot) {
        self.set_camera_silently(viewport, camera);
        self.bus
            .publish(&ChangeNotification::new(viewport.clone(), StateSnapshot::Camera(camera)));
    }

    /// A tool changing display properties of one volume
    pub(crate) fn user_set_voi(&self, viewport: &ViewportRef, volume: &str, update: VoiUpdate) {
        let volume_id = VolumeId::from(volume);
        let (snapshot, invert_changed) = {
            let mut viewports = self.viewports.lock();
            let voi = viewports
                .get_mut(viewport)
                .and_then(|v| v.volumes.get_mut(&volume_id))
                .expect("unknown viewport or volume in test");
            let before = voi.invert;
            voi.apply(&update);
            (voi.clone(), before != voi.invert)
        };
        self.bus.publish(&ChangeNotification::new(
            viewport.clone(),
            StateSnapshot::Voi {
                volume_id,
                snapshot,
                invert_changed,
            },
        ));
    }
}

impl RenderingLayer for FakeLayer {
    fn camera(&self, viewport: &ViewportRef) -> Result<CameraSnapshot, RenderError> {
        self.camera_of(viewport)
            .ok_or_else(|| RenderError::ViewportNotFound(viewport.clone()))
    }

    fn set_camera(&self, viewport: &ViewportRef, camera: CameraSnapshot) -> Result<(), RenderError> {
        {
            let mut viewports = self.viewports.lock();
            let v = viewports
                .get_mut(viewport)
                .ok_or_else(|| RenderError::ViewportNotFound(viewport.clone()))?;
            v.camera = camera;
            v.writes += 1;
        }
        self.bus
            .publish(&ChangeNotification::new(viewport.clone(), StateSnapshot::Camera(camera)));
        Ok(())
    }

    fn volume_ids(&self, viewport: &ViewportRef) -> Result<Vec<VolumeId>, RenderError> {
        self.viewports
            .lock()
            .get(viewport)
            .map(|v| v.volumes.keys().cloned().collect())
            .ok_or_else(|| RenderError::ViewportNotFound(viewport.clone()))
    }

    fn display_properties(&self, viewport: &ViewportRef, volume: &VolumeId) -> Result<VoiSnapshot, RenderError> {
        let viewports = self.viewports.lock();
        let v = viewports
            .get(viewport)
            .ok_or_else(|| RenderError::ViewportNotFound(viewport.clone()))?;
        v.volumes.get(volume).cloned().ok_or_else(|| RenderError::VolumeNotFound {
            viewport: viewport.clone(),
            volume: volume.clone(),
        })
    }

    fn set_display_properties(
        &self,
        viewport: &ViewportRef,
        volume: &VolumeId,
        update: &VoiUpdate,
    ) -> Result<(), RenderError> {
        let snapshot = {
            let mut viewports = self.viewports.lock();
            let v = viewports
                .get_mut(viewport)
                .ok_or_else(|| RenderError::ViewportNotFound(viewport.clone()))?;
            let voi = v.volumes.get_mut(volume).ok_or_else(|| RenderError::VolumeNotFound {
                viewport: viewport.clone(),
                volume: volume.clone(),
            })?;
            voi.apply(update);
            let snapshot = voi.clone();
            v.writes += 1;
            snapshot
        };
        self.bus.publish(&ChangeNotification::new(
            viewport.clone(),
            StateSnapshot::Voi {
                volume_id: volume.clone(),
                snapshot,
                invert_changed: update.invert.is_some(),
            },
        ));
        Ok(())
    }

    fn subscribe(&self, viewport: &ViewportRef, kind: StateKind, handler: ChangeHandler) -> SubscriptionId {
        self.bus.subscribe(viewport, kind, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.bus.unsubscribe(id);
    }
}
