use std::collections::HashMap;

/// Canonical, format-agnostic map.
#[derive(Debug, Clone, Default)]
pub struct IrMap {
    pub width: u32,
    pub height: u32,
    pub tile_w: u32,
    pub tile_h: u32,
    pub properties: Properties,
    pub tilesets: Vec<IrTileset>, // sorted by first_gid
    pub layers: Vec<LayerData>,   // draw order: array order
}

/// One image atlas with a regular grid.
#[derive(Debug, Clone, PartialEq)]
pub struct IrTileset {
    pub name: String,
    pub first_gid: u32,
    pub image: String, // relative to the map directory
    pub tile_w: u32,
    pub tile_h: u32,
    pub tilecount: u32,
    pub columns: u32,
    pub spacing: u32,
    pub margin: u32,
    pub offset: (i32, i32),
    pub properties: Properties,
}

/// One layer of a map, immutable once handed to a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerData {
    pub name: String,
    /// Grid width in tiles, 0 when the source had none.
    pub width: u32,
    /// Grid height in tiles, 0 when the source had none.
    pub height: u32,
    pub visible: bool,
    pub properties: Properties,
    pub kind: LayerKind,
}

impl LayerData {
    pub fn new(kind: LayerKind) -> Self {
        Self {
            name: String::new(),
            width: 0,
            height: 0,
            visible: true,
            properties: Properties::new(),
            kind,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name, value);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    /// `tilelayer`: row-major global tile ids, 0 = empty cell
    Tiles { data: Vec<u32> },
    /// `objectgroup`
    Objects { objects: Vec<MapObject> },
    /// `imagelayer`, placed at (x, y) in pixels
    Image { image: String, x: f32, y: f32 },
    /// Anything else, keeps the raw Tiled type name
    Unsupported(String),
}

impl LayerKind {
    pub fn type_name(&self) -> &str {
        match self {
            LayerKind::Tiles { .. } => "tilelayer",
            LayerKind::Objects { .. } => "objectgroup",
            LayerKind::Image { .. } => "imagelayer",
            LayerKind::Unsupported(kind) => kind.as_str(),
        }
    }
}

/// An entry of an object layer. Tiled anchors tile objects at their
/// bottom-left corner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapObject {
    pub id: u32,
    pub name: String,
    pub class_name: String,
    /// 0 when the object is not a tile object
    pub gid: u32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub visible: bool,
    pub properties: Properties,
}

impl MapObject {
    pub fn tile(gid: u32, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            gid,
            x,
            y,
            width,
            height,
            visible: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    I64(i64),
    F32(f32),
    String(String),
}

impl PropertyValue {
    /// Whether the value switches a flag on.
    ///
    /// Empty strings and the strings `"false"` and `"0"` count as off, so
    /// maps exported with string-only properties behave like typed ones.
    pub fn is_truthy(&self) -> bool {
        match self {
            PropertyValue::Bool(b) => *b,
            PropertyValue::I64(n) => *n != 0,
            PropertyValue::F32(n) => *n != 0.0 && !n.is_nan(),
            PropertyValue::String(s) => {
                let s = s.trim();
                !(s.is_empty() || s.eq_ignore_ascii_case("false") || s == "0")
            }
        }
    }

    /// Integer reading in the lenient style of `parseInt`: floats are
    /// truncated, strings are read up to the first non-digit.
    pub fn to_int_lossy(&self) -> Option<i64> {
        match self {
            PropertyValue::Bool(_) => None,
            PropertyValue::I64(n) => Some(*n),
            PropertyValue::F32(n) if n.is_finite() => Some(n.trunc() as i64),
            PropertyValue::F32(_) => None,
            PropertyValue::String(s) => parse_int_prefix(s),
        }
    }
}

fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Properties {
    values: HashMap<String, PropertyValue>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            PropertyValue::I64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get_i64(name).and_then(|n| i32::try_from(n).ok())
    }

    pub fn get_f32(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            PropertyValue::F32(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// True when the property exists and is truthy.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).is_some_and(PropertyValue::is_truthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_tiled_string_exports() {
        assert!(PropertyValue::String("full".into()).is_truthy());
        assert!(!PropertyValue::String("".into()).is_truthy());
        assert!(!PropertyValue::String("false".into()).is_truthy());
        assert!(!PropertyValue::I64(0).is_truthy());
        assert!(PropertyValue::F32(0.5).is_truthy());
    }

    #[test]
    fn lossy_int_reads_leading_digits() {
        assert_eq!(PropertyValue::String("2".into()).to_int_lossy(), Some(2));
        assert_eq!(PropertyValue::String("-3px".into()).to_int_lossy(), Some(-3));
        assert_eq!(PropertyValue::String("fast".into()).to_int_lossy(), None);
        assert_eq!(PropertyValue::F32(1.9).to_int_lossy(), Some(1));
        assert_eq!(PropertyValue::Bool(true).to_int_lossy(), None);
    }

    #[test]
    fn i32_getter_rejects_out_of_range_values() {
        let mut props = Properties::new();
        props.insert("big", PropertyValue::I64(5_000_000_000));
        assert_eq!(props.get_i64("big"), Some(5_000_000_000));
        assert_eq!(props.get_i32("big"), None);
    }
}
