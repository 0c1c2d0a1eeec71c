use crate::ir_map::IrTileset;
use crate::render::{BlitParams, Bitmap, PixelRect};

// Tiled keeps flip flags in the top three bits of a global id.
pub const FLIP_H: u32 = 1 << 31;
pub const FLIP_V: u32 = 1 << 30;
pub const FLIP_D: u32 = 1 << 29;
pub const GID_MASK: u32 = !(FLIP_H | FLIP_V | FLIP_D);

/// Global tile id as stored in Tiled data, flip flags included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

impl TileId {
    /// The id with flip flags masked off.
    pub fn clean(self) -> u32 {
        self.0 & GID_MASK
    }

    pub fn is_empty(self) -> bool {
        self.clean() == 0
    }
}

/// What a layer needs from a tileset to blit one tile.
pub trait Tileset {
    fn contains_tile(&self, gid: TileId) -> bool;

    /// Source rect inside [`Tileset::image`] and destination rect on the
    /// target surface for a tile whose top-left lands on (dest_x, dest_y).
    /// Only called for ids this tileset contains.
    fn blit_params_for(&self, gid: TileId, dest_x: i32, dest_y: i32) -> BlitParams;

    fn image(&self) -> &Bitmap;
}

/// First tileset in list order that contains `gid`.
pub fn tileset_for<T: Tileset>(tilesets: &[T], gid: TileId) -> Option<&T> {
    tilesets.iter().find(|ts| ts.contains_tile(gid))
}

/// Regular grid atlas, optionally with margin and spacing.
#[derive(Debug, Clone)]
pub struct AtlasTileset {
    pub name: String,
    pub first_gid: u32,
    pub tilecount: u32,
    pub cols: u32,
    pub tile_w: u32,
    pub tile_h: u32,
    pub spacing: u32,
    pub margin: u32,
    pub offset: (i32, i32),
    image: Bitmap,
}

impl AtlasTileset {
    pub fn new(first_gid: u32, tile_w: u32, tile_h: u32, image: Bitmap) -> Self {
        let mut ts = Self {
            name: String::new(),
            first_gid,
            tilecount: 0,
            cols: 0,
            tile_w,
            tile_h,
            spacing: 0,
            margin: 0,
            offset: (0, 0),
            image,
        };
        ts.cols = ts.columns_in_image();
        ts.tilecount = ts.cols * ts.rows_in_image();
        ts
    }

    pub fn from_ir(def: &IrTileset, image: Bitmap) -> Self {
        let mut ts = Self {
            name: def.name.clone(),
            first_gid: def.first_gid,
            tilecount: def.tilecount,
            cols: def.columns,
            tile_w: def.tile_w,
            tile_h: def.tile_h,
            spacing: def.spacing,
            margin: def.margin,
            offset: def.offset,
            image,
        };
        // Older exports leave these out
        if ts.cols == 0 {
            ts.cols = ts.columns_in_image();
        }
        if ts.tilecount == 0 {
            ts.tilecount = ts.cols * ts.rows_in_image();
        }
        ts
    }

    fn columns_in_image(&self) -> u32 {
        fit(self.image.width(), self.margin, self.spacing, self.tile_w)
    }

    fn rows_in_image(&self) -> u32 {
        fit(self.image.height(), self.margin, self.spacing, self.tile_h)
    }

    /// Top-left of a tile inside the atlas image.
    pub fn source_origin(&self, gid: TileId) -> (u32, u32) {
        let local = gid.clean() - self.first_gid;
        let cols = self.cols.max(1);
        let col = local % cols;
        let row = local / cols;
        let sx = self.margin + col * (self.tile_w + self.spacing);
        let sy = self.margin + row * (self.tile_h + self.spacing);
        (sx, sy)
    }
}

fn fit(extent: u32, margin: u32, spacing: u32, tile: u32) -> u32 {
    let usable = extent.saturating_sub(2 * margin) + spacing;
    usable / (tile + spacing).max(1)
}

impl Tileset for AtlasTileset {
    fn contains_tile(&self, gid: TileId) -> bool {
        let id = gid.clean();
        id >= self.first_gid && id - self.first_gid < self.tilecount
    }

    fn blit_params_for(&self, gid: TileId, dest_x: i32, dest_y: i32) -> BlitParams {
        let (sx, sy) = self.source_origin(gid);
        BlitParams {
            source: PixelRect::new(sx as i32, sy as i32, self.tile_w, self.tile_h),
            dest: PixelRect::new(
                dest_x + self.offset.0,
                dest_y + self.offset.1,
                self.tile_w,
                self.tile_h,
            ),
        }
    }

    fn image(&self) -> &Bitmap {
        &self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atlas(first_gid: u32) -> AtlasTileset {
        // 2x2 tiles of 8px with 1px margin and 2px spacing: 1 + 8 + 2 + 8 + 1
        AtlasTileset::from_ir(
            &IrTileset {
                name: "terrain".into(),
                first_gid,
                image: "terrain.png".into(),
                tile_w: 8,
                tile_h: 8,
                tilecount: 0,
                columns: 0,
                spacing: 2,
                margin: 1,
                offset: (0, 0),
                properties: Default::default(),
            },
            Bitmap::new(20, 20).unwrap(),
        )
    }

    #[test]
    fn derives_grid_from_image_when_missing() {
        let ts = atlas(1);
        assert_eq!(ts.cols, 2);
        assert_eq!(ts.tilecount, 4);
    }

    #[test]
    fn source_rect_accounts_for_margin_and_spacing() {
        let ts = atlas(10);
        let params = ts.blit_params_for(TileId(13), 32, 48);
        assert_eq!(params.source, PixelRect::new(11, 11, 8, 8));
        assert_eq!(params.dest, PixelRect::new(32, 48, 8, 8));
    }

    #[test]
    fn membership_ignores_flip_flags() {
        let ts = atlas(10);
        assert!(ts.contains_tile(TileId(10 | FLIP_H)));
        assert!(!ts.contains_tile(TileId(9)));
        assert!(!ts.contains_tile(TileId(14)));
    }

    #[test]
    fn flip_flags_alone_are_an_empty_cell() {
        assert!(TileId(FLIP_V | FLIP_D).is_empty());
        assert_eq!(TileId(7 | FLIP_H | FLIP_V).clean(), 7);
        assert_eq!(GID_MASK, 0x1FFF_FFFF);
    }

    #[test]
    fn first_matching_tileset_wins() {
        let sets = vec![atlas(1), atlas(5), atlas(3)];
        let hit = tileset_for(&sets, TileId(4)).unwrap();
        assert_eq!(hit.first_gid, 1);
        let hit = tileset_for(&sets, TileId(6)).unwrap();
        assert_eq!(hit.first_gid, 5);
        assert!(tileset_for(&sets, TileId(42)).is_none());
    }
}
