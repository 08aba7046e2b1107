//! In-memory viewport store implementing the rendering-layer contract

use ahash::AHashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;

use vsync_core::{
    CameraSnapshot, ChangeHandler, ChangeNotification, RenderError, RenderingLayer, StateKind, StateSnapshot,
    SubscriptionId, ViewportEventBus, ViewportRef, VoiSnapshot, VoiUpdate, VolumeId,
};

/// Per-viewport write and render accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewportCounters {
    /// Camera writes through the rendering-layer contract
    pub camera_writes: usize,
    /// Display-property writes through the rendering-layer contract
    pub voi_writes: usize,
    /// Render requests
    pub renders: usize,
}

impl ViewportCounters {
    pub fn applies(&self) -> usize {
        self.camera_writes + self.voi_writes
    }
}

pub(crate) struct ViewportSlot {
    pub(crate) camera: CameraSnapshot,
    pub(crate) volumes: IndexMap<VolumeId, VoiSnapshot>,
    pub(crate) counters: ViewportCounters,
}

/// Headless rendering layer hosting any number of rendering-engine ids
pub struct HeadlessRenderer {
    pub(crate) viewports: RwLock<AHashMap<ViewportRef, ViewportSlot>>,
    bus: ViewportEventBus,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self {
            viewports: RwLock::new(AHashMap::new()),
            bus: ViewportEventBus::new(),
        }
    }

    /// Add (or replace) a viewport rendering the given volumes
    pub fn add_viewport(
        &self,
        viewport: ViewportRef,
        camera: CameraSnapshot,
        volumes: impl IntoIterator<Item = (VolumeId, VoiSnapshot)>,
    ) {
        let slot = ViewportSlot {
            camera,
            volumes: volumes.into_iter().collect(),
            counters: ViewportCounters::default(),
        };
        tracing::debug!("Adding viewport {} with {} volume(s)", viewport, slot.volumes.len());
        self.viewports.write().insert(viewport, slot);
    }

    /// Tear a viewport down. Subscriptions on it stay registered but never fire.
    pub fn remove_viewport(&self, viewport: &ViewportRef) -> bool {
        self.viewports.write().remove(viewport).is_some()
    }

    pub fn contains(&self, viewport: &ViewportRef) -> bool {
        self.viewports.read().contains_key(viewport)
    }

    pub fn viewport_refs(&self) -> Vec<ViewportRef> {
        let mut refs: Vec<_> = self.viewports.read().keys().cloned().collect();
        refs.sort();
        refs
    }

    pub fn counters(&self, viewport: &ViewportRef) -> ViewportCounters {
        self.viewports
            .read()
            .get(viewport)
            .map(|slot| slot.counters)
            .unwrap_or_default()
    }

    /// Writes received through the rendering-layer contract
    pub fn apply_count(&self, viewport: &ViewportRef) -> usize {
        self.counters(viewport).applies()
    }

    pub fn render_count(&self, viewport: &ViewportRef) -> usize {
        self.counters(viewport).renders
    }

    pub fn reset_counters(&self) {
        for slot in self.viewports.write().values_mut() {
            slot.counters = ViewportCounters::default();
        }
    }

    pub fn subscriber_count(&self, viewport: &ViewportRef, kind: StateKind) -> usize {
        self.bus.subscriber_count(viewport, kind)
    }

    /// Update a camera in place and emit its change event
    pub(crate) fn write_camera(
        &self,
        viewport: &ViewportRef,
        counted: bool,
        change: impl FnOnce(&CameraSnapshot) -> CameraSnapshot,
    ) -> Result<CameraSnapshot, RenderError> {
        let camera = {
            let mut viewports = self.viewports.write();
            let slot = viewports
                .get_mut(viewport)
                .ok_or_else(|| RenderError::ViewportNotFound(viewport.clone()))?;
            slot.camera = change(&slot.camera);
            if counted {
                slot.counters.camera_writes += 1;
            }
            slot.camera
        };

        self.bus
            .publish(&ChangeNotification::new(viewport.clone(), StateSnapshot::Camera(camera)));
        Ok(camera)
    }

    /// Update display properties of one volume in place and emit its change event
    pub(crate) fn write_voi(
        &self,
        viewport: &ViewportRef,
        volume: &VolumeId,
        counted: bool,
        change: impl FnOnce(&mut VoiSnapshot),
    ) -> Result<VoiSnapshot, RenderError> {
        let (snapshot, invert_changed) = {
            let mut viewports = self.viewports.write();
            let slot = viewports
                .get_mut(viewport)
                .ok_or_else(|| RenderError::ViewportNotFound(viewport.clone()))?;
            let voi = slot.volumes.get_mut(volume).ok_or_else(|| RenderError::VolumeNotFound {
                viewport: viewport.clone(),
                volume: volume.clone(),
            })?;

            let inverted_before = voi.invert;
            change(voi);
            let invert_changed = inverted_before != voi.invert;
            let snapshot = voi.clone();
            if counted {
                slot.counters.voi_writes += 1;
            }
            (snapshot, invert_changed)
        };

        self.bus.publish(&ChangeNotification::new(
            viewport.clone(),
            StateSnapshot::Voi {
                volume_id: volume.clone(),
                snapshot: snapshot.clone(),
                invert_changed,
            },
        ));
        Ok(snapshot)
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderingLayer for HeadlessRenderer {
    fn camera(&self, viewport: &ViewportRef) -> Result<CameraSnapshot, RenderError> {
        self.viewports
            .read()
            .get(viewport)
            .map(|slot| slot.camera)
            .ok_or_else(|| RenderError::ViewportNotFound(viewport.clone()))
    }

    fn set_camera(&self, viewport: &ViewportRef, camera: CameraSnapshot) -> Result<(), RenderError> {
        self.write_camera(viewport, true, |_| camera).map(|_| ())
    }

    fn volume_ids(&self, viewport: &ViewportRef) -> Result<Vec<VolumeId>, RenderError> {
        self.viewports
            .read()
            .get(viewport)
            .map(|slot| slot.volumes.keys().cloned().collect())
            .ok_or_else(|| RenderError::ViewportNotFound(viewport.clone()))
    }

    fn display_properties(&self, viewport: &ViewportRef, volume: &VolumeId) -> Result<VoiSnapshot, RenderError> {
        let viewports = self.viewports.read();
        let slot = viewports
            .get(viewport)
            .ok_or_else(|| RenderError::ViewportNotFound(viewport.clone()))?;
        slot.volumes.get(volume).cloned().ok_or_else(|| RenderError::VolumeNotFound {
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
        // nothing to merge: no write, no change event
        if update.is_empty() {
            return self.display_properties(viewport, volume).map(|_| ());
        }
        self.write_voi(viewport, volume, true, |voi| voi.apply(update)).map(|_| ())
    }

    fn request_render(&self, viewport: &ViewportRef) {
        if let Some(slot) = self.viewports.write().get_mut(viewport) {
            slot.counters.renders += 1;
        }
    }

    fn subscribe(&self, viewport: &ViewportRef, kind: StateKind, handler: ChangeHandler) -> SubscriptionId {
        self.bus.subscribe(viewport, kind, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.bus.unsubscribe(id);
    }
}
