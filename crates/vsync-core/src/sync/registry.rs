//! Named registry of live synchronizers

use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use super::cascade::Cascade;
use super::{CameraSync, SyncAdapter, Synchronizer, VoiSync, VoiSyncOptions};
use crate::error::{Result, SyncError};
use crate::render::RenderingLayer;

static GLOBAL: OnceCell<SynchronizerRegistry> = OnceCell::new();

/// Owns synchronizers by id; all of them talk to the same rendering layer
/// and propagate one at a time, whichever thread delivers the change
pub struct SynchronizerRegistry {
    layer: Arc<dyn RenderingLayer>,
    cascade: Arc<Cascade>,
    synchronizers: RwLock<IndexMap<String, Arc<Synchronizer>>>,
}

impl SynchronizerRegistry {
    /// Create an empty registry
    pub fn new(layer: Arc<dyn RenderingLayer>) -> Self {
        Self {
            layer,
            cascade: Cascade::new(),
            synchronizers: RwLock::new(IndexMap::new()),
        }
    }

    pub fn layer(&self) -> &Arc<dyn RenderingLayer> {
        &self.layer
    }

    /// Register a synchronizer driven by `adapter`
    pub fn create(&self, id: impl Into<String>, adapter: Box<dyn SyncAdapter>) -> Result<Arc<Synchronizer>> {
        let id = id.into();
        let mut synchronizers = self.synchronizers.write();
        if synchronizers.contains_key(&id) {
            return Err(SyncError::DuplicateId(id));
        }

        let synchronizer = Synchronizer::with_cascade(id.clone(), adapter, self.layer.clone(), self.cascade.clone());
        synchronizer.activate();
        synchronizers.insert(id.clone(), synchronizer.clone());

        tracing::info!("Created {:?} synchronizer '{}'", synchronizer.kind(), id);
        Ok(synchronizer)
    }

    pub fn create_camera_synchronizer(&self, id: impl Into<String>) -> Result<Arc<Synchronizer>> {
        self.create(id, Box::new(CameraSync))
    }

    pub fn create_voi_synchronizer(&self, id: impl Into<String>, options: VoiSyncOptions) -> Result<Arc<Synchronizer>> {
        self.create(id, Box::new(VoiSync::new(options)))
    }

    pub fn get(&self, id: &str) -> Option<Arc<Synchronizer>> {
        self.synchronizers.read().get(id).cloned()
    }

    /// Dispose and forget a synchronizer. Unknown ids are ignored.
    pub fn dispose(&self, id: &str) -> bool {
        let removed = self.synchronizers.write().shift_remove(id);
        match removed {
            Some(synchronizer) => {
                if let Err(err) = synchronizer.dispose() {
                    tracing::debug!("Synchronizer '{}' was already disposed: {}", id, err);
                }
                true
            }
            None => false,
        }
    }

    pub fn dispose_all(&self) {
        let drained: Vec<_> = self.synchronizers.write().drain(..).collect();
        for (id, synchronizer) in drained {
            if let Err(err) = synchronizer.dispose() {
                tracing::debug!("Synchronizer '{}' was already disposed: {}", id, err);
            }
        }
    }

    /// Ids in creation order
    pub fn ids(&self) -> Vec<String> {
        self.synchronizers.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.synchronizers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.synchronizers.read().is_empty()
    }
}

/// Install the process-wide registry. Only the first call succeeds.
pub fn install_global(layer: Arc<dyn RenderingLayer>) -> Result<&'static SynchronizerRegistry> {
    GLOBAL
        .set(SynchronizerRegistry::new(layer))
        .map_err(|_| SyncError::RegistryAlreadyInstalled)?;
    GLOBAL.get().ok_or(SyncError::RegistryAlreadyInstalled)
}

/// The process-wide registry, if one was installed
pub fn global() -> Option<&'static SynchronizerRegistry> {
    GLOBAL.get()
}
