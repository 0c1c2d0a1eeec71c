//! Tiled JSON layer compositing for Macroquad.
//!
//! Tile, object, image and parallax-plane layers are drawn onto CPU
//! bitmaps, then handed to a scene node either directly or wrapped in a
//! scrolling tiling sprite for looping maps and parallax backgrounds.

mod error;
mod image_loader;
mod ir_map;
mod layer;
mod loader {
    pub mod json_loader;
}
mod map;
mod node;
mod render;
mod tileset;

pub use error::{LayerError, MapError};
pub use image_loader::{DirectoryImageLoader, ImageLoader, ImageRequest, PreloadedImages};
pub use ir_map::{IrMap, IrTileset, LayerData, LayerKind, MapObject, Properties, PropertyValue};
pub use layer::{
    Layer, LayerDescriptor, LayerHint, LayerInfo, LayerProperties, LayerSurface, LoopConfig,
    RenderStrategy, RenderedLayer, TileSize, Viewport,
};
pub use loader::json_loader::{decode_layer_str, decode_map_file_to_ir, decode_map_str};
pub use map::{LayerStack, TiledMap};
pub use node::{RenderableNode, SceneNode};
pub use render::{
    wrapped_spans, BlitParams, Bitmap, MacroquadNode, PixelRect, Span, TilingFrame, TilingSprite,
};
pub use tileset::{tileset_for, AtlasTileset, TileId, Tileset, FLIP_D, FLIP_H, FLIP_V, GID_MASK};
