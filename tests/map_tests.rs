// tests/map_tests.rs

use macroquad::math::vec2;
use macroquad_tiled_layers::{
    Bitmap, DirectoryImageLoader, LayerError, LayerInfo, LayerStack, LoopConfig,
    PreloadedImages, SceneNode, TiledMap, Viewport,
};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const VIEWPORT: Viewport = Viewport::new(64, 48);

fn temp_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("mq_tiled_layers_map_{nanos}"));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn write_png(path: &PathBuf, bitmap: &Bitmap) {
    bitmap.image().export_png(path.to_str().expect("path utf8"));
}

const MAP_JSON: &str = r#"{
  "width": 4,
  "height": 3,
  "tilewidth": 8,
  "tileheight": 8,
  "layers": [
    {
      "type": "tilelayer", "name": "ground", "width": 4, "height": 3,
      "data": [1,1,1,1, 0,2,0,0, 0,0,0,1],
      "properties": [{"name":"collision","type":"string","value":"full"}]
    },
    {
      "type": "objectgroup", "name": "props",
      "objects": [{"id": 1, "gid": 2, "x": 8, "y": 24, "width": 8, "height": 8}]
    },
    { "type": "group", "name": "folder", "layers": [] },
    {
      "type": "imagelayer", "name": "clouds", "image": "img/clouds.png",
      "properties": {"parallax": true, "planeX": 1, "layer": "upper"}
    },
    {
      "type": "tilelayer", "name": "roofs", "width": 4, "height": 3,
      "data": [0,0,0,0, 0,0,0,0, 0,0,0,0],
      "properties": [{"name":"regionId","type":"int","value":4}]
    }
  ],
  "tilesets": [
    {"firstgid": 1, "name": "terrain", "tilewidth": 8, "tileheight": 8,
     "tilecount": 2, "columns": 2, "image": "terrain.png"}
  ]
}"#;

fn write_fixture() -> PathBuf {
    let dir = temp_dir();
    let mut atlas = Bitmap::new(16, 8).unwrap();
    atlas.blit_whole(&Bitmap::filled(8, 8, [200, 10, 10, 255]).unwrap(), 0, 0);
    atlas.blit_whole(&Bitmap::filled(8, 8, [10, 200, 10, 255]).unwrap(), 8, 0);
    write_png(&dir.join("terrain.png"), &atlas);
    write_png(
        &dir.join("clouds.png"),
        &Bitmap::filled(20, 10, [255, 255, 255, 128]).unwrap(),
    );
    fs::write(dir.join("map.json"), MAP_JSON).expect("failed to write map");
    dir
}

#[test]
fn load_and_render_every_layer() {
    let dir = write_fixture();
    let map = TiledMap::load(dir.join("map.json").to_str().unwrap()).expect("map loads");
    assert_eq!(map.tile_size().width, 8);
    assert_eq!(map.tilesets.len(), 1);

    let mut loader = DirectoryImageLoader::new(&dir);
    let mut stack = LayerStack::build(&map, LoopConfig::NONE, VIEWPORT, &mut loader, |_| {
        SceneNode::new()
    });

    let layers = stack.layers();
    assert_eq!(layers.len(), 5);

    let ground = layers[0].backing_bitmap().unwrap();
    assert_eq!((ground.width(), ground.height()), (32, 24));
    assert_eq!(ground.pixel(0, 0), Some([200, 10, 10, 255]));
    assert_eq!(ground.pixel(8, 8), Some([10, 200, 10, 255]));

    // the object layer inherits the map grid; gid 2 anchored at its bottom
    let props = layers[1].backing_bitmap().unwrap();
    assert_eq!((props.width(), props.height()), (32, 24));
    assert_eq!(props.pixel(8, 16), Some([10, 200, 10, 255]));

    // the unsupported group does not stop its siblings
    assert_eq!(
        layers[2].diagnostics(),
        &[LayerError::UnsupportedLayer {
            kind: "group".into()
        }][..]
    );
    assert!(layers[3].diagnostics().is_empty());
    assert!(layers[3].is_plane_layer());
    assert!(layers[3].backing_bitmap().is_none());

    assert_eq!(stack.collision_layers().count(), 1);
    assert_eq!(stack.region_layers().count(), 1);
    let upper: Vec<&str> = stack.upper_layers().map(|l| l.name()).collect();
    assert_eq!(upper, vec!["clouds"]);
    assert_eq!(stack.lower_layers().count(), 4);
    assert_eq!(stack.pending_images(), 0);

    for _ in 0..25 {
        stack.update();
    }
    let clouds = stack.layers()[3].tiling_sprite().unwrap();
    assert_eq!(clouds.origin().x, 5.0);

    stack.move_loop_layers(3.0, 2.0);
    let clouds = stack.layers()[3].tiling_sprite().unwrap();
    assert_eq!((clouds.origin().x, clouds.origin().y), (3.0, 2.0));
    // non tiling layers are untouched
    assert!(stack.layers()[0].tiling_sprite().is_none());
}

#[test]
fn looping_maps_wrap_tile_layers_but_not_images() {
    let dir = write_fixture();
    let map = TiledMap::load(dir.join("map.json").to_str().unwrap()).expect("map loads");

    let mut loader = DirectoryImageLoader::new(&dir);
    let stack = LayerStack::build(
        &map,
        LoopConfig::new(true, true),
        VIEWPORT,
        &mut loader,
        |_| SceneNode::new(),
    );

    let ground = stack.layers()[0].tiling_sprite().expect("looped");
    assert_eq!((ground.frame().width, ground.frame().height), (64, 48));
    assert!(stack.layers()[0].node().content().is_none());
}

#[test]
fn camera_moves_only_looping_axes_of_non_plane_layers() {
    let dir = write_fixture();
    let map = TiledMap::load(dir.join("map.json").to_str().unwrap()).expect("map loads");

    let mut loader = DirectoryImageLoader::new(&dir);
    let mut stack = LayerStack::build(
        &map,
        LoopConfig::new(true, false),
        VIEWPORT,
        &mut loader,
        |_| SceneNode::new(),
    );

    stack.follow_camera(vec2(5.0, 7.0));

    let ground = stack.layers()[0].tiling_sprite().expect("looped");
    assert_eq!(ground.origin(), vec2(5.0, 0.0));
    let clouds = stack.layers()[3].tiling_sprite().expect("plane");
    assert_eq!(clouds.origin(), vec2(0.0, 0.0));
}

#[test]
fn pending_plane_images_resolve_on_poll() {
    let dir = write_fixture();
    let map = TiledMap::load(dir.join("map.json").to_str().unwrap()).expect("map loads");

    let mut images = PreloadedImages::new();
    let mut stack =
        LayerStack::build(&map, LoopConfig::NONE, VIEWPORT, &mut images, |_| SceneNode::new());
    assert_eq!(stack.pending_images(), 1);
    assert_eq!(stack.poll_images(&mut images), 0);

    images.insert("img/clouds.png", Bitmap::new(4, 4).unwrap());
    assert_eq!(stack.poll_images(&mut images), 1);
    assert_eq!(stack.pending_images(), 0);
    assert!(stack.layers()[3].tiling_sprite().is_some());
}

#[test]
fn missing_atlas_image_is_reported_with_context() {
    let dir = temp_dir();
    fs::write(dir.join("map.json"), MAP_JSON).expect("failed to write map");

    let err = TiledMap::load(dir.join("map.json").to_str().unwrap())
        .err()
        .expect("expected load error");
    assert!(format!("{err:#}").contains("Reading tileset image"));
}
