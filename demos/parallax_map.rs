use macroquad::prelude::*;
use macroquad_tiled_layers::{
    DirectoryImageLoader, LayerStack, LoopConfig, MacroquadNode, TiledMap, Viewport,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn window_conf() -> Conf {
    Conf {
        window_title: "Parallax Map".into(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let map = TiledMap::load("assets/map.json").expect("Failed to load map");
    let loops = LoopConfig::new(
        map.properties.flag("loopHorizontal"),
        map.properties.flag("loopVertical"),
    );
    let viewport = Viewport::new(screen_width() as u32, screen_height() as u32);

    let mut images = DirectoryImageLoader::new("assets/parallaxes");
    let mut stack = LayerStack::build(&map, loops, viewport, &mut images, |_| {
        MacroquadNode::new()
    });

    let mut camera = Vec2::ZERO;
    loop {
        let speed = 4.0;
        if is_key_down(KeyCode::Left) {
            camera.x -= speed;
        }
        if is_key_down(KeyCode::Right) {
            camera.x += speed;
        }
        if is_key_down(KeyCode::Up) {
            camera.y -= speed;
        }
        if is_key_down(KeyCode::Down) {
            camera.y += speed;
        }

        stack.poll_images(&mut images);
        stack.update();
        stack.follow_camera(camera);

        clear_background(BLACK);
        stack.draw(-camera, || {
            draw_circle(screen_width() / 2.0, screen_height() / 2.0, 8.0, YELLOW);
        });

        draw_text(
            &format!("FPS: {}", get_fps()),
            screen_width() - 135.0,
            55.0,
            30.0,
            RED,
        );

        next_frame().await;
    }
}
