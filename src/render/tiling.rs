use crate::render::bitmap::{BlitParams, Bitmap, PixelRect};
use macroquad::math::{vec2, Vec2};

/// Where a tiling sprite sits on screen and how far its texture scrolled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilingFrame {
    pub position: Vec2,
    pub width: u32,
    pub height: u32,
    /// Scroll origin: frame pixel (0, 0) shows source pixel `origin`
    /// (wrapped).
    pub origin: Vec2,
}

/// A rectangle that repeats its source bitmap endlessly in both axes.
#[derive(Debug, Clone)]
pub struct TilingSprite {
    source: Bitmap,
    frame: TilingFrame,
}

impl TilingSprite {
    pub fn new(source: Bitmap, position: Vec2, width: u32, height: u32) -> Self {
        Self {
            source,
            frame: TilingFrame {
                position,
                width,
                height,
                origin: Vec2::ZERO,
            },
        }
    }

    pub fn source(&self) -> &Bitmap {
        &self.source
    }

    pub fn into_source(self) -> Bitmap {
        self.source
    }

    pub fn frame(&self) -> &TilingFrame {
        &self.frame
    }

    pub fn origin(&self) -> Vec2 {
        self.frame.origin
    }

    pub fn set_origin(&mut self, origin: Vec2) {
        self.frame.origin = origin;
    }

    /// Move the origin by (dx, dy), wrapping each axis into
    /// `[0, source dimension)`. Zero deltas leave that axis alone.
    pub fn advance(&mut self, dx: f32, dy: f32) {
        let (w, h) = (self.source.width(), self.source.height());
        let origin = &mut self.frame.origin;
        if dx != 0.0 && w > 0 {
            origin.x = (origin.x + dx).rem_euclid(w as f32);
        }
        if dy != 0.0 && h > 0 {
            origin.y = (origin.y + dy).rem_euclid(h as f32);
        }
    }

    /// Composite the visible, wrapped view onto `target` at the frame's
    /// position.
    pub fn render_into(&self, target: &mut Bitmap) {
        let frame = &self.frame;
        let xs = wrapped_spans(frame.origin.x, self.source.width(), frame.width);
        let ys = wrapped_spans(frame.origin.y, self.source.height(), frame.height);
        let base = vec2(frame.position.x.round(), frame.position.y.round());

        for sy in &ys {
            for sx in &xs {
                target.blit(
                    &self.source,
                    &BlitParams {
                        source: PixelRect::new(sx.src as i32, sy.src as i32, sx.len, sy.len),
                        dest: PixelRect::new(
                            base.x as i32 + sx.dst as i32,
                            base.y as i32 + sy.dst as i32,
                            sx.len,
                            sy.len,
                        ),
                    },
                );
            }
        }
    }
}

/// A contiguous run along one axis of a tiling frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub src: u32,
    pub dst: u32,
    pub len: u32,
}

/// Split a frame axis of `frame_len` pixels into runs that each read a
/// contiguous stretch of a source of `source_len` pixels, starting at
/// `origin` and wrapping.
pub fn wrapped_spans(origin: f32, source_len: u32, frame_len: u32) -> Vec<Span> {
    let mut spans = Vec::new();
    if source_len == 0 {
        return spans;
    }
    let mut src = (origin.floor() as i64).rem_euclid(i64::from(source_len)) as u32;
    let mut dst = 0;
    while dst < frame_len {
        let len = (source_len - src).min(frame_len - dst);
        spans.push(Span { src, dst, len });
        dst += len;
        src = 0;
    }
    spans
}
