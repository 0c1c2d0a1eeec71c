pub mod bitmap;
pub mod draw;
pub mod tiling;

pub use bitmap::{BlitParams, Bitmap, PixelRect};
pub use draw::MacroquadNode;
pub use tiling::{wrapped_spans, Span, TilingFrame, TilingSprite};
