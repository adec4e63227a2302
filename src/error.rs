// src/error.rs
use std::path::PathBuf;

/// Rejected reel configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("reel count must be at least 1 (got {0})")]
    NoReels(usize),

    #[error("symbols per reel must be at least 1 (got {0})")]
    NoSymbols(usize),

    #[error("symbol size must be a positive, finite number (got {0})")]
    InvalidSymbolSize(f32),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Texture loading failures.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to open image {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to read palette manifest {path:?}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("palette manifest {path:?} is malformed: {source}")]
    ManifestFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("texture {0:?} has zero width or height")]
    EmptyTexture(String),

    #[error("symbol palette is empty")]
    EmptyPalette,
}

/// Errors surfaced by the reel engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("expected {expected} stop offsets, one per reel (got {got})")]
    ExtrasMismatch { expected: usize, got: usize },
}
