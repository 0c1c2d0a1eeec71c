use std::path::PathBuf;
use thiserror::Error;

/// Error type for decoding Tiled JSON documents
#[derive(Debug, Error)]
pub enum MapError {
    /// File I/O error
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// JSON parse error in a file
    #[error("JSON parse error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// JSON parse error in an inline document
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Structurally valid JSON that is not a usable map
    #[error("invalid map: {0}")]
    InvalidMap(String),
    /// A custom property declared a type we do not understand
    #[error("property '{name}' has unsupported type '{kind}'")]
    UnsupportedPropertyType { name: String, kind: String },
}

/// Recoverable problems met while rendering a single layer.
///
/// None of these abort a render pass: they are logged, recorded on the
/// layer and the pass carries on with whatever can still be drawn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    /// No supplied tileset covers this global tile id
    #[error("no tileset contains tile {gid}")]
    MissingTileset { gid: u32 },
    /// Layer type outside tilelayer / objectgroup / imagelayer
    #[error("unsupported layer type '{kind}'")]
    UnsupportedLayer { kind: String },
    /// Image or plane source could not be loaded
    #[error("failed to load image '{path}': {reason}")]
    ImageLoad { path: String, reason: String },
    /// Backing surface larger than an image can address
    #[error("surface of {width}x{height} pixels exceeds the maximum bitmap size")]
    SurfaceTooLarge { width: u32, height: u32 },
}
