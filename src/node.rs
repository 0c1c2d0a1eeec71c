use crate::render::{Bitmap, TilingFrame, TilingSprite};
use macroquad::math::Vec2;

/// The scene-graph side of a layer: whatever the host engine uses to put
/// pixels on screen.
///
/// A layer pushes its output here: a composited bitmap as direct content,
/// or a tiling child for looping and parallax layers. Only one of the two
/// is attached at a time.
pub trait RenderableNode {
    fn set_content(&mut self, bitmap: &Bitmap);

    fn add_child(&mut self, sprite: &TilingSprite);

    /// The tiling child's origin moved.
    fn scroll_children(&mut self, origin: Vec2);

    /// Drop content and children ahead of a repaint.
    fn detach_all(&mut self);

    fn set_visible(&mut self, visible: bool);

    fn is_visible(&self) -> bool;
}

/// Headless node keeping a copy of whatever was attached.
#[derive(Debug, Clone)]
pub struct SceneNode {
    content: Option<Bitmap>,
    children: Vec<TilingFrame>,
    visible: bool,
}

impl SceneNode {
    pub fn new() -> Self {
        Self {
            content: None,
            children: Vec::new(),
            visible: true,
        }
    }

    pub fn content(&self) -> Option<&Bitmap> {
        self.content.as_ref()
    }

    pub fn children(&self) -> &[TilingFrame] {
        &self.children
    }
}

impl Default for SceneNode {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderableNode for SceneNode {
    fn set_content(&mut self, bitmap: &Bitmap) {
        self.content = Some(bitmap.clone());
    }

    fn add_child(&mut self, sprite: &TilingSprite) {
        self.children.push(*sprite.frame());
    }

    fn scroll_children(&mut self, origin: Vec2) {
        for child in &mut self.children {
            child.origin = origin;
        }
    }

    fn detach_all(&mut self) {
        self.content = None;
        self.children.clear();
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}
