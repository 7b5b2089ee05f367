//! Minimal end-to-end usage: register a scene, run the engine against the
//! null device, and watch it report FPS for a second.
//!
//! Run with `cargo run --example hello_world`.

use std::time::Duration;

use ledmatrix_engine::device::null::NullDevice;
use ledmatrix_engine::prelude::*;

struct Sweep {
    offset: u32,
}

impl Scene for Sweep {
    fn update(&mut self, _state: &State, _dt: Duration) -> Result<(), SceneError> {
        self.offset = self.offset.wrapping_add(1);
        Ok(())
    }

    fn draw(&mut self, state: &State, surface: &mut Surface) -> Result<(), SceneError> {
        let colors = state.get_palette_colors();
        if colors.is_empty() {
            surface.clear();
            return Ok(());
        }
        let (w, h) = (surface.width(), surface.height());
        for y in 0..h {
            let color = colors[(y + self.offset) as usize % colors.len()];
            for x in 0..w {
                surface.set_pixel(x as i64, y as i64, color.r, color.g, color.b);
            }
        }
        Ok(())
    }

    fn filename(&self) -> Option<&str> {
        Some("sweep.scene")
    }
}

fn build_sweep(_width: u32, _height: u32) -> Box<dyn Scene> {
    Box::new(Sweep { offset: 0 })
}

fn main() {
    env_logger::init();

    let data_dir = std::env::temp_dir().join("ledmatrix-engine-hello-world");

    let config = EngineConfig::builder()
        .dimensions(16, 16)
        .target_fps(60)
        .data_root(data_dir.join("data"))
        .assets_root(data_dir.join("scenes"))
        .build()
        .expect("valid config");

    let state = State::load(&config.data_root);

    let mut scripts = ScriptSource::new();
    scripts.register("sweep", build_sweep as _);
    state.set_scene(scripts.build("sweep", config.width, config.height).expect("sweep is registered"));

    let device = Box::new(NullDevice::new(config.width, config.height, config.initial_brightness));
    let handle: EngineHandle = Engine::new(config, device, state).run_threaded();

    for _ in 0..5 {
        std::thread::sleep(Duration::from_millis(200));
        println!("fps: {:.1}", handle.get_current_fps());
    }

    if let Some(preview) = handle.get_preview_frame() {
        println!("captured a {} byte PNG preview", preview.len());
    }

    handle.stop();
}
