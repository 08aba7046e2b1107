//! Error types for synchronization and the rendering-layer contract

use thiserror::Error;

use crate::viewport::{ViewportRef, VolumeId};

/// Errors reported by a rendering layer when a viewport is read or written
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("viewport {0} not found")]
    ViewportNotFound(ViewportRef),

    #[error("volume {volume} is not rendered by viewport {viewport}")]
    VolumeNotFound { viewport: ViewportRef, volume: VolumeId },
}

/// Errors that can occur in synchronizer operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("synchronizer '{0}' already exists")]
    DuplicateId(String),

    #[error("synchronizer '{0}' has been disposed")]
    Disposed(String),

    #[error("viewport {0} no longer resolves to a live viewport")]
    StaleViewport(ViewportRef),

    #[error("volume {volume} is not rendered by viewport {viewport}")]
    UnknownVolume { viewport: ViewportRef, volume: VolumeId },

    #[error("a process-wide synchronizer registry is already installed")]
    RegistryAlreadyInstalled,

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<RenderError> for SyncError {
    fn from(error: RenderError) -> Self {
        match error {
            RenderError::ViewportNotFound(viewport) => SyncError::StaleViewport(viewport),
            RenderError::VolumeNotFound { viewport, volume } => SyncError::UnknownVolume { viewport, volume },
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(error: serde_json::Error) -> Self {
        SyncError::Config(error.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(error: std::io::Error) -> Self {
        SyncError::Config(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
