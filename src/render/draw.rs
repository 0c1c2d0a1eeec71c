use crate::node::RenderableNode;
use crate::render::bitmap::Bitmap;
use crate::render::tiling::{wrapped_spans, TilingFrame, TilingSprite};
use macroquad::prelude::*;

/// Scene node that keeps layer output as GPU textures and draws it with
/// macroquad. Needs a live macroquad context.
pub struct MacroquadNode {
    content: Option<Texture2D>,
    tiling: Option<(Texture2D, TilingFrame)>,
    visible: bool,
}

impl MacroquadNode {
    pub fn new() -> Self {
        Self {
            content: None,
            tiling: None,
            visible: true,
        }
    }

    /// Draw with the content's top-left at `offset`. Tiling children scroll
    /// through their origin instead and ignore the offset.
    pub fn draw(&self, offset: Vec2) {
        if !self.visible {
            return;
        }
        if let Some(tex) = &self.content {
            draw_texture(tex, offset.x, offset.y, WHITE);
        }
        if let Some((tex, frame)) = &self.tiling {
            draw_tiling(tex, frame);
        }
    }
}

impl Default for MacroquadNode {
    fn default() -> Self {
        Self::new()
    }
}

fn upload(bitmap: &Bitmap) -> Texture2D {
    let tex = Texture2D::from_image(bitmap.image());
    tex.set_filter(FilterMode::Nearest);
    tex
}

fn draw_tiling(tex: &Texture2D, frame: &TilingFrame) {
    let xs = wrapped_spans(frame.origin.x, tex.width() as u32, frame.width);
    let ys = wrapped_spans(frame.origin.y, tex.height() as u32, frame.height);

    for sy in &ys {
        for sx in &xs {
            draw_texture_ex(
                tex,
                frame.position.x + sx.dst as f32,
                frame.position.y + sy.dst as f32,
                WHITE,
                DrawTextureParams {
                    source: Some(Rect::new(
                        sx.src as f32,
                        sy.src as f32,
                        sx.len as f32,
                        sy.len as f32,
                    )),
                    ..Default::default()
                },
            );
        }
    }
}

impl RenderableNode for MacroquadNode {
    fn set_content(&mut self, bitmap: &Bitmap) {
        self.content = Some(upload(bitmap));
    }

    fn add_child(&mut self, sprite: &TilingSprite) {
        self.tiling = Some((upload(sprite.source()), *sprite.frame()));
    }

    fn scroll_children(&mut self, origin: Vec2) {
        if let Some((_, frame)) = &mut self.tiling {
            frame.origin = origin;
        }
    }

    fn detach_all(&mut self) {
        self.content = None;
        self.tiling = None;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}
