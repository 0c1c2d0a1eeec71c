use crate::error::LayerError;
use macroquad::texture::Image;
use std::fmt;

/// Integer pixel rectangle. `x`/`y` may be negative, blits clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Parameters for one block copy: where to read in the source image and
/// where to write on the target surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitParams {
    pub source: PixelRect,
    pub dest: PixelRect,
}

/// RGBA8 raster surface backed by a macroquad [`Image`].
pub struct Bitmap {
    image: Image,
}

impl Bitmap {
    /// Fully transparent bitmap.
    pub fn new(width: u32, height: u32) -> Result<Self, LayerError> {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, LayerError> {
        let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
            return Err(LayerError::SurfaceTooLarge { width, height });
        };
        let bytes = rgba.repeat(width as usize * height as usize);
        Ok(Self {
            image: Image {
                bytes,
                width: w,
                height: h,
            },
        })
    }

    pub fn from_image(image: Image) -> Self {
        Self { image }
    }

    /// Decode an encoded image file (PNG and friends).
    pub fn decode(encoded: &[u8]) -> Result<Self, String> {
        Image::from_file_with_format(encoded, None)
            .map(Self::from_image)
            .map_err(|e| format!("{e:?}"))
    }

    pub fn width(&self) -> u32 {
        u32::from(self.image.width)
    }

    pub fn height(&self) -> u32 {
        u32::from(self.image.height)
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn bytes(&self) -> &[u8] {
        &self.image.bytes
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let at = self.offset(x, y);
        let px = &self.image.bytes[at..at + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Reset every pixel to transparent, keeping the dimensions.
    pub fn clear(&mut self) {
        self.image.bytes.fill(0);
    }

    /// Source-over block copy. Copies `min(source, dest)` in each axis,
    /// clipped against both surfaces; no scaling.
    pub fn blit(&mut self, src: &Bitmap, params: &BlitParams) {
        let BlitParams { source, dest } = *params;
        let w = i64::from(source.width.min(dest.width));
        let h = i64::from(source.height.min(dest.height));
        let (src_w, src_h) = (i64::from(src.width()), i64::from(src.height()));
        let (dst_w, dst_h) = (i64::from(self.width()), i64::from(self.height()));

        for row in 0..h {
            let sy = i64::from(source.y) + row;
            let dy = i64::from(dest.y) + row;
            if !(0..src_h).contains(&sy) || !(0..dst_h).contains(&dy) {
                continue;
            }
            for col in 0..w {
                let sx = i64::from(source.x) + col;
                let dx = i64::from(dest.x) + col;
                if !(0..src_w).contains(&sx) || !(0..dst_w).contains(&dx) {
                    continue;
                }
                let s = src.offset(sx as u32, sy as u32);
                let d = self.offset(dx as u32, dy as u32);
                blend_over(
                    &mut self.image.bytes[d..d + 4],
                    &src.image.bytes[s..s + 4],
                );
            }
        }
    }

    /// Copy the whole of `src` with its top-left corner at (x, y).
    pub fn blit_whole(&mut self, src: &Bitmap, x: i32, y: i32) {
        let (w, h) = (src.width(), src.height());
        self.blit(
            src,
            &BlitParams {
                source: PixelRect::new(0, 0, w, h),
                dest: PixelRect::new(x, y, w, h),
            },
        );
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width() as usize + x as usize) * 4
    }
}

fn blend_over(dst: &mut [u8], src: &[u8]) {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return;
    }
    if sa == 255 {
        dst.copy_from_slice(src);
        return;
    }
    let da = u32::from(dst[3]);
    let inv = 255 - sa;
    let out_a = sa + da * inv / 255;
    if out_a == 0 {
        return;
    }
    for c in 0..3 {
        let v = (u32::from(src[c]) * sa + u32::from(dst[c]) * da * inv / 255) / out_a;
        dst[c] = v.min(255) as u8;
    }
    dst[3] = out_a as u8;
}

impl Clone for Bitmap {
    fn clone(&self) -> Self {
        Self {
            image: Image {
                bytes: self.image.bytes.clone(),
                width: self.image.width,
                height: self.image.height,
            },
        }
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        self.image.width == other.image.width
            && self.image.height == other.image.height
            && self.image.bytes == other.image.bytes
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.image.width)
            .field("height", &self.image.height)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];

    #[test]
    fn blit_clips_negative_and_overflowing_destinations() {
        let src = Bitmap::filled(4, 4, RED).unwrap();
        let mut dst = Bitmap::new(4, 4).unwrap();
        dst.blit_whole(&src, -2, 3);

        assert_eq!(dst.pixel(0, 3), Some(RED));
        assert_eq!(dst.pixel(1, 3), Some(RED));
        assert_eq!(dst.pixel(2, 3), Some([0, 0, 0, 0]));
        assert_eq!(dst.pixel(0, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn transparent_source_pixels_leave_destination_untouched() {
        let src = Bitmap::new(2, 2).unwrap();
        let mut dst = Bitmap::filled(2, 2, RED).unwrap();
        dst.blit_whole(&src, 0, 0);
        assert_eq!(dst.pixel(1, 1), Some(RED));
    }

    #[test]
    fn half_alpha_blends_over_opaque() {
        let src = Bitmap::filled(1, 1, [0, 0, 255, 128]).unwrap();
        let mut dst = Bitmap::filled(1, 1, RED).unwrap();
        dst.blit_whole(&src, 0, 0);
        let [r, g, b, a] = dst.pixel(0, 0).unwrap();
        assert_eq!(a, 255);
        assert_eq!(g, 0);
        assert!(r > 120 && r < 130, "r = {r}");
        assert!(b > 125 && b < 132, "b = {b}");
    }

    #[test]
    fn oversize_surfaces_are_rejected() {
        let err = Bitmap::new(70_000, 1).unwrap_err();
        assert_eq!(
            err,
            LayerError::SurfaceTooLarge {
                width: 70_000,
                height: 1
            }
        );
    }
}
