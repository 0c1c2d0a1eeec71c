// src/loader/json_loader.rs
use crate::error::MapError;
use crate::ir_map::*;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct JsonLayer {
    /// CSV layers hold an id array; base64/compressed ones a string
    #[serde(default)]
    data: JsonValue,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>, // "tilelayer" when missing
    #[serde(default)]
    properties: JsonProperties,
    #[serde(default)]
    objects: Vec<JsonObject>,
    #[serde(default)]
    image: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    offsetx: f32,
    #[serde(default)]
    offsety: f32,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct JsonMap {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    tilewidth: u32,
    tileheight: u32,
    layers: Vec<JsonLayer>,
    #[serde(default)]
    tilesets: Vec<JsonTilesetRef>,
    #[serde(default)]
    properties: JsonProperties,
}

/// Either an external reference (`source`) or an embedded tileset.
#[derive(Deserialize)]
struct JsonTilesetRef {
    firstgid: u32,
    #[serde(default)]
    source: Option<String>,
    #[serde(flatten)]
    embedded: JsonTileset,
}

#[derive(Deserialize, Default)]
struct JsonTileset {
    #[serde(default)]
    name: String,
    #[serde(default)]
    tilewidth: u32,
    #[serde(default)]
    tileheight: u32,
    #[serde(default)]
    tilecount: u32,
    #[serde(default)]
    columns: u32,
    #[serde(default)]
    image: String,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    margin: u32,
    #[serde(default)]
    tileoffset: Option<JsonOffset>,
    #[serde(default)]
    properties: JsonProperties,
}

#[derive(Deserialize)]
struct JsonOffset {
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
}

/// Tiled writes properties as a typed list; maps from older versions use
/// a plain name → value object.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonProperties {
    List(Vec<JsonProperty>),
    Legacy(serde_json::Map<String, JsonValue>),
}

impl Default for JsonProperties {
    fn default() -> Self {
        JsonProperties::List(Vec::new())
    }
}

#[derive(Deserialize)]
struct JsonProperty {
    name: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    value: JsonValue,
}

#[derive(Deserialize)]
struct JsonObject {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    gid: Option<u32>,
    #[serde(default)]
    properties: JsonProperties,
}

fn infer_property_value(value: &JsonValue) -> Option<PropertyValue> {
    if let Some(v) = value.as_bool() {
        Some(PropertyValue::Bool(v))
    } else if let Some(v) = value.as_i64() {
        Some(PropertyValue::I64(v))
    } else if let Some(v) = value.as_f64() {
        Some(PropertyValue::F32(v as f32))
    } else {
        value.as_str().map(|s| PropertyValue::String(s.to_owned()))
    }
}

fn json_property_to_ir(prop: JsonProperty) -> Result<Option<(String, PropertyValue)>, MapError> {
    let JsonProperty { name, kind, value } = prop;

    let parsed = match kind.as_deref() {
        Some("bool") => value.as_bool().map(PropertyValue::Bool),
        Some("int") | Some("object") => value.as_i64().map(PropertyValue::I64),
        Some("float") => value.as_f64().map(|n| PropertyValue::F32(n as f32)),
        Some("string") | Some("file") | Some("color") | Some("class") => {
            value.as_str().map(|s| PropertyValue::String(s.to_owned()))
        }
        Some(other) => {
            return Err(MapError::UnsupportedPropertyType {
                name,
                kind: other.to_owned(),
            });
        }
        None => infer_property_value(&value),
    };

    Ok(parsed.map(|value| (name, value)))
}

fn properties_from_json(props: JsonProperties) -> Result<Properties, MapError> {
    let mut out = Properties::new();
    match props {
        JsonProperties::List(list) => {
            for p in list {
                if let Some((name, value)) = json_property_to_ir(p)? {
                    out.insert(name, value);
                }
            }
        }
        JsonProperties::Legacy(map) => {
            for (name, value) in map {
                if let Some(value) = infer_property_value(&value) {
                    out.insert(name, value);
                }
            }
        }
    }
    Ok(out)
}

fn object_to_ir(obj: JsonObject) -> Result<MapObject, MapError> {
    let class_name = if !obj.class.is_empty() {
        obj.class
    } else {
        obj.kind
    };

    Ok(MapObject {
        id: obj.id,
        name: obj.name,
        class_name,
        gid: obj.gid.unwrap_or(0),
        x: obj.x,
        y: obj.y,
        width: obj.width,
        height: obj.height,
        rotation: obj.rotation,
        visible: obj.visible,
        properties: properties_from_json(obj.properties)?,
    })
}

/// Tile ids of a CSV-encoded layer. Anything else is kept as an
/// unsupported layer so the rest of the map still decodes.
fn tile_data_to_ir(name: &str, data: JsonValue, encoding: Option<&str>) -> LayerKind {
    if data.is_null() {
        return LayerKind::Tiles { data: Vec::new() };
    }
    match serde_json::from_value::<Vec<u32>>(data) {
        Ok(data) => LayerKind::Tiles { data },
        Err(e) => {
            let kind = match encoding {
                Some(enc) if enc != "csv" => "tilelayer(encoded)",
                _ => "tilelayer(malformed)",
            };
            tracing::warn!(layer = name, encoding, error = %e, "tile data not decoded");
            LayerKind::Unsupported(kind.to_owned())
        }
    }
}

fn layer_to_ir(l: JsonLayer) -> Result<LayerData, MapError> {
    let kind = match l.kind.as_deref().unwrap_or("tilelayer") {
        "tilelayer" => tile_data_to_ir(&l.name, l.data, l.encoding.as_deref()),
        "objectgroup" => LayerKind::Objects {
            objects: l
                .objects
                .into_iter()
                .map(object_to_ir)
                .collect::<Result<Vec<_>, _>>()?,
        },
        // Newer Tiled versions place image layers through their offset
        "imagelayer" => LayerKind::Image {
            image: l.image,
            x: l.x + l.offsetx,
            y: l.y + l.offsety,
        },
        other => LayerKind::Unsupported(other.to_owned()),
    };

    Ok(LayerData {
        name: l.name,
        width: l.width,
        height: l.height,
        visible: l.visible,
        properties: properties_from_json(l.properties)?,
        kind,
    })
}

/// Decode a single Tiled layer object.
pub fn decode_layer_str(json: &str) -> Result<LayerData, MapError> {
    let layer: JsonLayer = serde_json::from_str(json)?;
    layer_to_ir(layer)
}

/// `None` for tilesets that are not a single grid atlas (image
/// collections, zero tile size). Their tiles resolve to no tileset later.
fn tileset_to_ir(
    first_gid: u32,
    ts: JsonTileset,
    image_dir: &Path,
) -> Result<Option<IrTileset>, MapError> {
    if ts.image.is_empty() {
        tracing::warn!(tileset = %ts.name, first_gid, "skipping tileset without an atlas image");
        return Ok(None);
    }
    if ts.tilewidth == 0 || ts.tileheight == 0 {
        tracing::warn!(tileset = %ts.name, first_gid, "skipping tileset with a zero tile size");
        return Ok(None);
    }

    Ok(Some(IrTileset {
        name: ts.name,
        first_gid,
        image: image_dir.join(&ts.image).to_string_lossy().into_owned(),
        tile_w: ts.tilewidth,
        tile_h: ts.tileheight,
        tilecount: ts.tilecount,
        columns: ts.columns,
        spacing: ts.spacing,
        margin: ts.margin,
        offset: ts.tileoffset.map(|o| (o.x, o.y)).unwrap_or((0, 0)),
        properties: properties_from_json(ts.properties)?,
    }))
}

/// Decode a map document. External tilesets are read relative to
/// `map_dir`; tileset image paths in the result are relative to it too.
pub fn decode_map_str(json: &str, map_dir: &Path) -> Result<IrMap, MapError> {
    let j: JsonMap = serde_json::from_str(json)?;
    map_to_ir(j, map_dir)
}

fn map_to_ir(j: JsonMap, map_dir: &Path) -> Result<IrMap, MapError> {
    if j.tilewidth == 0 || j.tileheight == 0 {
        return Err(MapError::InvalidMap("Map tile size must be non-zero".into()));
    }

    let mut ir_tilesets = Vec::with_capacity(j.tilesets.len());
    for ts in j.tilesets {
        let Some(source) = ts.source else {
            ir_tilesets.extend(tileset_to_ir(ts.firstgid, ts.embedded, Path::new(""))?);
            continue;
        };
        if !source.ends_with(".json") {
            return Err(MapError::InvalidMap(format!(
                "External tileset must be JSON: {source}"
            )));
        }
        let ts_path = map_dir.join(&source);
        let ext_txt = std::fs::read_to_string(&ts_path).map_err(|source| MapError::Io {
            path: ts_path.clone(),
            source,
        })?;
        let ext: JsonTileset = serde_json::from_str(&ext_txt).map_err(|source| MapError::Json {
            path: ts_path,
            source,
        })?;
        let image_dir = Path::new(&source).parent().unwrap_or(Path::new(""));
        ir_tilesets.extend(tileset_to_ir(ts.firstgid, ext, image_dir)?);
    }

    // Sorted by first_gid so the first containing tileset is the right one
    ir_tilesets.sort_by_key(|t| t.first_gid);

    let mut ir_layers = Vec::with_capacity(j.layers.len());
    for l in j.layers {
        let mut layer = layer_to_ir(l)?;
        // Object and image layers carry no grid; they cover the whole map
        if layer.width == 0 && layer.height == 0 {
            layer.width = j.width;
            layer.height = j.height;
        }
        ir_layers.push(layer);
    }

    Ok(IrMap {
        width: j.width,
        height: j.height,
        tile_w: j.tilewidth,
        tile_h: j.tileheight,
        properties: properties_from_json(j.properties)?,
        tilesets: ir_tilesets,
        layers: ir_layers,
    })
}

pub fn decode_map_file_to_ir(path: &str) -> Result<(IrMap, PathBuf), MapError> {
    let p = Path::new(path);
    if p.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(MapError::InvalidMap(format!(
            "Map file must be a JSON file: {path}"
        )));
    }

    let txt = std::fs::read_to_string(p).map_err(|source| MapError::Io {
        path: p.to_path_buf(),
        source,
    })?;
    let j: JsonMap = serde_json::from_str(&txt).map_err(|source| MapError::Json {
        path: p.to_path_buf(),
        source,
    })?;

    let map_dir = p
        .parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"));

    Ok((map_to_ir(j, &map_dir)?, map_dir))
}
