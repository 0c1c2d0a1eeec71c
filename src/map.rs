use crate::image_loader::ImageLoader;
use crate::ir_map::{IrMap, LayerData, Properties};
use crate::layer::{Layer, LayerInfo, LoopConfig, RenderedLayer, TileSize, Viewport};
use crate::loader::json_loader::decode_map_file_to_ir;
use crate::node::RenderableNode;
use crate::render::{Bitmap, MacroquadNode};
use crate::tileset::AtlasTileset;
use anyhow::Context;
use macroquad::math::Vec2;
use std::path::Path;
use std::rc::Rc;

/// A decoded map with its tileset atlases loaded.
pub struct TiledMap {
    pub width: u32,
    pub height: u32,
    pub tile_w: u32,
    pub tile_h: u32,
    pub properties: Properties,
    pub layers: Vec<LayerData>,
    pub tilesets: Rc<[AtlasTileset]>,
}

impl TiledMap {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let (ir, base) = decode_map_file_to_ir(path)?;
        Self::from_ir(ir, &base)
    }

    pub fn from_ir(ir: IrMap, base_dir: &Path) -> anyhow::Result<Self> {
        let mut tilesets = Vec::with_capacity(ir.tilesets.len());
        for t in &ir.tilesets {
            let img_path = base_dir.join(&t.image);
            let bytes = std::fs::read(&img_path)
                .with_context(|| format!("Reading tileset image {}", img_path.display()))?;
            let image = Bitmap::decode(&bytes)
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Decoding tileset image {}", t.image))?;
            tilesets.push(AtlasTileset::from_ir(t, image));
        }
        Ok(Self::from_parts(ir, tilesets))
    }

    /// Assemble from already loaded tilesets, kept in `first_gid` order.
    pub fn from_parts(ir: IrMap, mut tilesets: Vec<AtlasTileset>) -> Self {
        tilesets.sort_by_key(|t| t.first_gid);
        Self {
            width: ir.width,
            height: ir.height,
            tile_w: ir.tile_w,
            tile_h: ir.tile_h,
            properties: ir.properties,
            layers: ir.layers,
            tilesets: tilesets.into(),
        }
    }

    pub fn tile_size(&self) -> TileSize {
        TileSize::new(self.tile_w, self.tile_h)
    }
}

/// Every layer of a map, rendered, in draw order.
pub struct LayerStack<N> {
    layers: Vec<RenderedLayer<N>>,
}

impl<N: RenderableNode> LayerStack<N> {
    /// Create and render one layer per map layer. A layer that fails to
    /// render stays in the stack, blank, with its diagnostics.
    pub fn build<L, F>(
        map: &TiledMap,
        loops: LoopConfig,
        viewport: Viewport,
        loader: &mut L,
        mut make_node: F,
    ) -> Self
    where
        L: ImageLoader + ?Sized,
        F: FnMut(&LayerData) -> N,
    {
        let mut layers = Vec::with_capacity(map.layers.len());
        for data in &map.layers {
            let node = make_node(data);
            let layer = Layer::create(
                data.clone(),
                Rc::clone(&map.tilesets),
                map.tile_size(),
                loops,
                node,
            );
            layers.push(layer.render(viewport, &mut *loader));
        }

        let problems: usize = layers.iter().map(|l| l.diagnostics().len()).sum();
        tracing::info!(layers = layers.len(), problems, "map layers rendered");
        Self { layers }
    }

    pub fn update(&mut self) {
        for layer in &mut self.layers {
            layer.update();
        }
    }

    /// Scroll every tiling layer to the same absolute origin.
    pub fn move_loop_layers(&mut self, x: f32, y: f32) {
        for layer in &mut self.layers {
            layer.move_loop_layer(x, y);
        }
    }

    /// Point looping layers at the camera. Plane layers keep their own
    /// drift, and an axis the map does not loop on stays at 0.
    pub fn follow_camera(&mut self, camera: Vec2) {
        for layer in &mut self.layers {
            if !layer.is_loop() || layer.is_plane_layer() {
                continue;
            }
            let x = if layer.is_loop_horizontal() { camera.x } else { 0.0 };
            let y = if layer.is_loop_vertical() { camera.y } else { 0.0 };
            layer.move_loop_layer(x, y);
        }
    }

    /// Retry pending images; returns how many got resolved.
    pub fn poll_images<L>(&mut self, loader: &mut L) -> usize
    where
        L: ImageLoader + ?Sized,
    {
        self.layers
            .iter_mut()
            .filter(|l| l.is_pending())
            .map(|l| l.poll_images(&mut *loader))
            .filter(|done| *done)
            .count()
    }
}

impl<N> LayerStack<N> {
    pub fn layers(&self) -> &[RenderedLayer<N>] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [RenderedLayer<N>] {
        &mut self.layers
    }

    pub fn pending_images(&self) -> usize {
        self.layers.iter().filter(|l| l.is_pending()).count()
    }

    pub fn upper_layers(&self) -> impl Iterator<Item = &RenderedLayer<N>> {
        self.layers.iter().filter(|l| l.is_upper_layer())
    }

    pub fn lower_layers(&self) -> impl Iterator<Item = &RenderedLayer<N>> {
        self.layers.iter().filter(|l| !l.is_upper_layer())
    }

    pub fn collision_layers(&self) -> impl Iterator<Item = &RenderedLayer<N>> {
        self.layers.iter().filter(|l| l.is_collision_layer())
    }

    pub fn region_layers(&self) -> impl Iterator<Item = &RenderedLayer<N>> {
        self.layers.iter().filter(|l| l.is_region_layer())
    }
}

impl LayerStack<MacroquadNode> {
    /// Lower layers, then `between` (characters and the like), then upper
    /// layers.
    pub fn draw(&self, offset: Vec2, between: impl FnOnce()) {
        for layer in self.lower_layers() {
            layer.node().draw(offset);
        }
        between();
        for layer in self.upper_layers() {
            layer.node().draw(offset);
        }
    }
}
