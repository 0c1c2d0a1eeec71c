//! Rendering of a single map layer.
//!
//! A [`Layer`] is created from its data, the map's tilesets and the tile
//! size, then consumed by [`Layer::render`], which picks one of four
//! strategies from the layer kind:
//!
//! * tile layers blit every non-empty cell of the grid,
//! * object layers blit every tile object, converting Tiled's bottom-left
//!   anchor to a top-left one,
//! * image layers blit one picture at the layer's placement,
//! * plane layers (image layers with a `parallax` property) put the
//!   picture in a viewport-sized [`TilingSprite`] and never allocate a
//!   backing bitmap.
//!
//! Tile and object layers of a looping map end up in a tiling sprite too,
//! which [`RenderedLayer::update`] scrolls every frame.

mod properties;

pub use properties::{LayerHint, LayerProperties};

use crate::error::LayerError;
use crate::image_loader::{ImageLoader, ImageRequest};
use crate::ir_map::{LayerData, LayerKind};
use crate::node::RenderableNode;
use crate::render::{Bitmap, TilingSprite};
use crate::tileset::{tileset_for, AtlasTileset, TileId, Tileset};
use macroquad::math::{vec2, Vec2};
use std::rc::Rc;

/// Whether the map wraps around on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopConfig {
    pub horizontal: bool,
    pub vertical: bool,
}

impl LoopConfig {
    pub const NONE: Self = Self::new(false, false);

    pub const fn new(horizontal: bool, vertical: bool) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl TileSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    Tiles,
    Objects,
    Image,
    Plane,
    Unsupported,
}

/// Everything about a layer that does not depend on its tilesets or
/// scene node.
#[derive(Debug, Clone)]
pub struct LayerDescriptor {
    data: LayerData,
    tile_size: TileSize,
    grid_horz: u32,
    grid_vert: u32,
    properties: LayerProperties,
    loops: LoopConfig,
}

impl LayerDescriptor {
    pub fn new(data: LayerData, tile_size: TileSize, loops: LoopConfig) -> Self {
        Self {
            grid_horz: data.width,
            grid_vert: data.height,
            properties: LayerProperties::from_properties(&data.properties),
            data,
            tile_size,
            loops,
        }
    }

    pub fn data(&self) -> &LayerData {
        &self.data
    }

    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    pub fn grid(&self) -> (u32, u32) {
        (self.grid_horz, self.grid_vert)
    }

    pub fn properties(&self) -> &LayerProperties {
        &self.properties
    }

    pub fn loops(&self) -> LoopConfig {
        self.loops
    }

    /// Pixel size of the backing bitmap.
    pub fn bitmap_size(&self) -> (u32, u32) {
        (
            self.grid_horz.saturating_mul(self.tile_size.width),
            self.grid_vert.saturating_mul(self.tile_size.height),
        )
    }

    pub fn strategy(&self) -> RenderStrategy {
        match self.data.kind {
            LayerKind::Tiles { .. } => RenderStrategy::Tiles,
            LayerKind::Objects { .. } => RenderStrategy::Objects,
            LayerKind::Image { .. } if self.properties.parallax => RenderStrategy::Plane,
            LayerKind::Image { .. } => RenderStrategy::Image,
            LayerKind::Unsupported(_) => RenderStrategy::Unsupported,
        }
    }
}

/// Classification queries shared by unrendered and rendered layers.
pub trait LayerInfo {
    fn descriptor(&self) -> &LayerDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().data.name
    }

    fn is_tile_layer(&self) -> bool {
        matches!(self.descriptor().data.kind, LayerKind::Tiles { .. })
    }

    fn is_object_layer(&self) -> bool {
        matches!(self.descriptor().data.kind, LayerKind::Objects { .. })
    }

    fn is_image_layer(&self) -> bool {
        matches!(self.descriptor().data.kind, LayerKind::Image { .. })
    }

    fn is_plane_layer(&self) -> bool {
        self.is_image_layer() && self.descriptor().properties.parallax
    }

    fn is_loop_horizontal(&self) -> bool {
        self.descriptor().loops.horizontal
    }

    fn is_loop_vertical(&self) -> bool {
        self.descriptor().loops.vertical
    }

    fn is_loop(&self) -> bool {
        self.is_loop_horizontal() || self.is_loop_vertical()
    }

    fn is_collision_layer(&self) -> bool {
        self.descriptor().properties.collision
    }

    /// A `regionId` of 0 (number or string) counts as no region.
    fn is_region_layer(&self) -> bool {
        self.descriptor().properties.region_id.is_some()
    }

    fn is_upper_layer(&self) -> bool {
        self.descriptor().properties.layer_hint == Some(LayerHint::Upper)
    }
}

impl LayerInfo for LayerDescriptor {
    fn descriptor(&self) -> &LayerDescriptor {
        self
    }
}

/// A layer that has not been drawn yet.
pub struct Layer<N, T = AtlasTileset> {
    descriptor: LayerDescriptor,
    tilesets: Rc<[T]>,
    node: N,
}

impl<N: RenderableNode, T: Tileset> Layer<N, T> {
    /// Hidden layers still render; only their node is made invisible.
    pub fn create(
        data: LayerData,
        tilesets: Rc<[T]>,
        tile_size: TileSize,
        loops: LoopConfig,
        mut node: N,
    ) -> Self {
        if !data.visible {
            node.set_visible(false);
        }
        Self {
            descriptor: LayerDescriptor::new(data, tile_size, loops),
            tilesets,
            node,
        }
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    /// Draw the layer and attach the result to its node.
    ///
    /// Problems (unknown tiles, unsupported kinds, broken images) are logged
    /// and kept in [`RenderedLayer::diagnostics`]; they never abort the
    /// pass. Images the loader reports as pending are applied later by
    /// [`RenderedLayer::poll_images`].
    pub fn render<L>(self, viewport: Viewport, loader: &mut L) -> RenderedLayer<N, T>
    where
        L: ImageLoader + ?Sized,
    {
        let mut rendered = RenderedLayer {
            descriptor: self.descriptor,
            tilesets: self.tilesets,
            node: self.node,
            viewport,
            surface: LayerSurface::Empty,
            pending: None,
            diagnostics: Vec::new(),
        };
        rendered.compose(loader);
        rendered
    }
}

impl<N, T> LayerInfo for Layer<N, T> {
    fn descriptor(&self) -> &LayerDescriptor {
        &self.descriptor
    }
}

/// What a rendered layer shows.
#[derive(Debug, Default)]
pub enum LayerSurface {
    /// Nothing drawable (unsupported kind, failed allocation, plane image
    /// still loading)
    #[default]
    Empty,
    /// Backing bitmap attached as the node's content
    Direct(Bitmap),
    /// Looping backing bitmap, or a plane's picture
    Tiling(TilingSprite),
}

#[derive(Debug)]
struct PendingImage {
    path: String,
    origin: Vec2,
}

pub struct RenderedLayer<N, T = AtlasTileset> {
    descriptor: LayerDescriptor,
    tilesets: Rc<[T]>,
    node: N,
    viewport: Viewport,
    surface: LayerSurface,
    pending: Option<PendingImage>,
    diagnostics: Vec<LayerError>,
}

impl<N: RenderableNode, T: Tileset> RenderedLayer<N, T> {
    /// Repaint from the layer data, reusing the backing bitmap. The scroll
    /// origin of a tiling layer is kept.
    pub fn rerender<L>(&mut self, loader: &mut L)
    where
        L: ImageLoader + ?Sized,
    {
        self.compose(loader);
    }

    /// Per-frame hook: scrolls tiling layers by their `planeX`/`planeY`
    /// speed, wrapping within the source bitmap.
    pub fn update(&mut self) {
        let LayerSurface::Tiling(sprite) = &mut self.surface else {
            return;
        };
        let (dx, dy) = self.descriptor.properties.scroll_speed();
        if dx == 0 && dy == 0 {
            return;
        }
        sprite.advance(dx as f32, dy as f32);
        self.node.scroll_children(sprite.origin());
    }

    /// Put the scroll origin at an absolute position, e.g. to follow the
    /// camera on a looping map.
    pub fn move_loop_layer(&mut self, x: f32, y: f32) {
        let LayerSurface::Tiling(sprite) = &mut self.surface else {
            return;
        };
        sprite.set_origin(vec2(x, y));
        self.node.scroll_children(sprite.origin());
    }

    /// Retry a pending image. Returns true once the image was applied or
    /// failed for good.
    pub fn poll_images<L>(&mut self, loader: &mut L) -> bool
    where
        L: ImageLoader + ?Sized,
    {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        match loader.load_parallax_image(&pending.path, 0) {
            ImageRequest::Ready(image) => {
                self.apply_image(image, pending.origin);
                true
            }
            ImageRequest::Pending => {
                self.pending = Some(pending);
                false
            }
            ImageRequest::Failed(e) => {
                self.record(e);
                true
            }
        }
    }

    fn compose<L>(&mut self, loader: &mut L)
    where
        L: ImageLoader + ?Sized,
    {
        let _span = tracing::debug_span!("render_layer", layer = %self.descriptor.data.name)
            .entered();

        let previous = std::mem::take(&mut self.surface);
        let origin = match &previous {
            LayerSurface::Tiling(sprite) => sprite.origin(),
            _ => Vec2::ZERO,
        };
        self.diagnostics.clear();
        self.pending = None;
        self.node.detach_all();

        match self.descriptor.strategy() {
            RenderStrategy::Tiles | RenderStrategy::Objects => {
                let Some(mut bitmap) = self.backing_bitmap_from(previous) else {
                    return;
                };
                self.draw_cells(&mut bitmap);
                self.finish_composition(bitmap, origin);
            }
            RenderStrategy::Image => {
                let Some(bitmap) = self.backing_bitmap_from(previous) else {
                    return;
                };
                self.node.set_content(&bitmap);
                self.surface = LayerSurface::Direct(bitmap);
                self.request_image(loader, origin);
            }
            RenderStrategy::Plane => self.request_image(loader, origin),
            RenderStrategy::Unsupported => {
                let kind = self.descriptor.data.kind.type_name().to_owned();
                self.record(LayerError::UnsupportedLayer { kind });
            }
        }
    }

    /// The previous backing bitmap cleared, or a fresh one.
    fn backing_bitmap_from(&mut self, previous: LayerSurface) -> Option<Bitmap> {
        let reused = match previous {
            LayerSurface::Direct(bitmap) => Some(bitmap),
            LayerSurface::Tiling(sprite) if !self.is_plane_layer() => Some(sprite.into_source()),
            _ => None,
        };
        if let Some(mut bitmap) = reused {
            bitmap.clear();
            return Some(bitmap);
        }

        let (width, height) = self.descriptor.bitmap_size();
        match Bitmap::new(width, height) {
            Ok(bitmap) => Some(bitmap),
            Err(e) => {
                self.record(e);
                None
            }
        }
    }

    fn draw_cells(&mut self, bitmap: &mut Bitmap) {
        let mut missing: Vec<LayerError> = Vec::new();
        let mut blit = |gid: TileId, x: i32, y: i32| {
            if let Err(e) = blit_tile(&self.tilesets, bitmap, gid, x, y) {
                if !missing.contains(&e) {
                    missing.push(e);
                }
            }
        };

        match &self.descriptor.data.kind {
            LayerKind::Tiles { data } => {
                let cols = self.descriptor.grid_horz as usize;
                if cols == 0 {
                    return;
                }
                let TileSize { width, height } = self.descriptor.tile_size;
                for (i, &raw) in data.iter().enumerate() {
                    let gid = TileId(raw);
                    if gid.is_empty() {
                        continue;
                    }
                    let x = (i % cols) as i64 * i64::from(width);
                    let y = (i / cols) as i64 * i64::from(height);
                    blit(gid, x as i32, y as i32);
                }
            }
            LayerKind::Objects { objects } => {
                for obj in objects {
                    let gid = TileId(obj.gid);
                    if gid.is_empty() {
                        continue;
                    }
                    blit(gid, round_half_up(obj.x), round_half_up(obj.y - obj.height));
                }
            }
            _ => {}
        }

        for e in missing {
            self.record(e);
        }
    }

    fn finish_composition(&mut self, bitmap: Bitmap, origin: Vec2) {
        if !self.is_loop() {
            self.node.set_content(&bitmap);
            self.surface = LayerSurface::Direct(bitmap);
            return;
        }

        let width = if self.is_loop_horizontal() {
            self.viewport.width
        } else {
            bitmap.width()
        };
        let height = if self.is_loop_vertical() {
            self.viewport.height
        } else {
            bitmap.height()
        };
        let mut sprite = TilingSprite::new(bitmap, Vec2::ZERO, width, height);
        sprite.set_origin(origin);
        self.node.add_child(&sprite);
        self.surface = LayerSurface::Tiling(sprite);
    }

    fn request_image<L>(&mut self, loader: &mut L, origin: Vec2)
    where
        L: ImageLoader + ?Sized,
    {
        let LayerKind::Image { image, .. } = &self.descriptor.data.kind else {
            return;
        };
        let path = image.clone();
        match loader.load_parallax_image(&path, 0) {
            ImageRequest::Ready(image) => self.apply_image(image, origin),
            ImageRequest::Pending => {
                tracing::debug!(path = %path, "layer image pending");
                self.pending = Some(PendingImage { path, origin });
            }
            ImageRequest::Failed(e) => self.record(e),
        }
    }

    fn apply_image(&mut self, image: Bitmap, origin: Vec2) {
        let LayerKind::Image { x, y, .. } = self.descriptor.data.kind else {
            return;
        };
        match self.descriptor.strategy() {
            RenderStrategy::Plane => {
                let Viewport { width, height } = self.viewport;
                let mut sprite = TilingSprite::new(image, vec2(x, y), width, height);
                sprite.set_origin(origin);
                self.node.add_child(&sprite);
                self.surface = LayerSurface::Tiling(sprite);
            }
            RenderStrategy::Image => {
                if let LayerSurface::Direct(bitmap) = &mut self.surface {
                    bitmap.blit_whole(&image, round_half_up(x), round_half_up(y));
                    self.node.set_content(bitmap);
                }
            }
            _ => {}
        }
    }

    fn record(&mut self, e: LayerError) {
        tracing::warn!(layer = %self.descriptor.data.name, error = %e, "layer rendered with problems");
        self.diagnostics.push(e);
    }
}

impl<N, T> RenderedLayer<N, T> {
    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut N {
        &mut self.node
    }

    pub fn surface(&self) -> &LayerSurface {
        &self.surface
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The composited grid bitmap; `None` for plane and unsupported layers.
    pub fn backing_bitmap(&self) -> Option<&Bitmap> {
        match &self.surface {
            LayerSurface::Direct(bitmap) => Some(bitmap),
            LayerSurface::Tiling(sprite) if !self.is_plane_layer() => Some(sprite.source()),
            _ => None,
        }
    }

    pub fn tiling_sprite(&self) -> Option<&TilingSprite> {
        match &self.surface {
            LayerSurface::Tiling(sprite) => Some(sprite),
            _ => None,
        }
    }

    /// Whether an image is still being waited on.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Problems met during the last render pass.
    pub fn diagnostics(&self) -> &[LayerError] {
        &self.diagnostics
    }
}

impl<N, T> LayerInfo for RenderedLayer<N, T> {
    fn descriptor(&self) -> &LayerDescriptor {
        &self.descriptor
    }
}

fn blit_tile<T: Tileset>(
    tilesets: &[T],
    target: &mut Bitmap,
    gid: TileId,
    x: i32,
    y: i32,
) -> Result<(), LayerError> {
    let ts = tileset_for(tilesets, gid).ok_or(LayerError::MissingTileset { gid: gid.clean() })?;
    let params = ts.blit_params_for(gid, x, y);
    target.blit(ts.image(), &params);
    Ok(())
}

/// Rounds .5 towards positive infinity.
fn round_half_up(v: f32) -> i32 {
    (v + 0.5).floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir_map::PropertyValue;

    #[test]
    fn rounding_matches_pixel_snapping() {
        assert_eq!(round_half_up(10.5), 11);
        assert_eq!(round_half_up(30.2), 30);
        assert_eq!(round_half_up(-10.5), -10);
    }

    #[test]
    fn strategy_depends_on_kind_and_parallax_only() {
        let tile_size = TileSize::new(16, 16);
        let image = || LayerKind::Image {
            image: "sky.png".into(),
            x: 0.0,
            y: 0.0,
        };
        let strategy = |data: LayerData| {
            LayerDescriptor::new(data, tile_size, LoopConfig::new(true, true)).strategy()
        };

        assert_eq!(strategy(LayerData::new(LayerKind::Tiles { data: vec![] })), RenderStrategy::Tiles);
        assert_eq!(
            strategy(LayerData::new(LayerKind::Objects { objects: vec![] })),
            RenderStrategy::Objects
        );
        assert_eq!(strategy(LayerData::new(image())), RenderStrategy::Image);
        assert_eq!(
            strategy(LayerData::new(image()).with_property("parallax", PropertyValue::Bool(true))),
            RenderStrategy::Plane
        );
        assert_eq!(
            strategy(LayerData::new(image()).with_property("parallax", PropertyValue::Bool(false))),
            RenderStrategy::Image
        );
        assert_eq!(
            strategy(LayerData::new(LayerKind::Unsupported("group".into()))),
            RenderStrategy::Unsupported
        );
    }

    #[test]
    fn grid_and_bitmap_size_come_from_layer_dimensions() {
        let d = LayerDescriptor::new(
            LayerData::new(LayerKind::Tiles { data: vec![0; 6] }).with_size(3, 2),
            TileSize::new(16, 8),
            LoopConfig::NONE,
        );
        assert_eq!(d.grid(), (3, 2));
        assert_eq!(d.bitmap_size(), (48, 16));

        let empty = LayerDescriptor::new(
            LayerData::new(LayerKind::Tiles { data: vec![] }),
            TileSize::new(16, 8),
            LoopConfig::NONE,
        );
        assert_eq!(empty.bitmap_size(), (0, 0));
    }
}
