// error.rs — 查看器错误类型

use std::path::PathBuf;

use crate::camera::ViewKey;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("view not found: {0}")]
    ViewNotFound(ViewKey),

    #[error("camera missing from registry: {0}")]
    CameraMissing(ViewKey),

    #[error("duplicate camera preset: {0}")]
    DuplicatePreset(ViewKey),

    #[error("initial view {0} has no camera preset")]
    UnknownInitialView(ViewKey),

    #[error("camera preset {0} has an unusable projection")]
    InvalidProjection(ViewKey),

    #[error("invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),

    #[error("failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to load model {path:?}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("failed to load image {path:?}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("load cancelled")]
    Cancelled,

    #[error("background load of {0} stopped without a result")]
    LoadAborted(String),

    #[error("GPU error: {0}")]
    Gpu(String),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
