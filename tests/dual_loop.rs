//! Both loops running on their own threads against in-memory backends.

use std::sync::{Arc, Mutex};
use std::thread;

use image::{Rgba, RgbaImage};
use winit::keyboard::KeyCode;

use sprite_loop::engine::graphics::{SoftwareCanvas, Sprite};
use sprite_loop::engine::input::{EventSource, InputEvent};
use sprite_loop::engine::time::SystemClock;
use sprite_loop::game::loops::{RenderLoop, Scene, Simulation, UpdateLoop};
use sprite_loop::game::{AppConfig, DisplayConfig, Position, Shape, SharedState};

/// Holds the right arrow for a fixed number of ticks, then quits.
struct QuitAfter {
    remaining: u32,
    pressed: bool,
    drains: Arc<Mutex<u32>>,
}

impl EventSource for QuitAfter {
    fn drain(&mut self, out: &mut Vec<InputEvent>) {
        *self.drains.lock().unwrap() += 1;
        if !self.pressed {
            self.pressed = true;
            out.push(InputEvent::Key {
                code: KeyCode::ArrowRight,
                pressed: true,
            });
        }
        if self.remaining == 0 {
            out.push(InputEvent::Quit);
        } else {
            self.remaining -= 1;
        }
    }
}

#[test]
fn quit_stops_both_loops() {
    let config = AppConfig {
        updates_per_second: 500,
        ..AppConfig::default()
    };
    let state = Arc::new(SharedState::new(&config));

    let render_state = Arc::clone(&state);
    let render_config = config.clone();
    let render_thread = thread::spawn(move || {
        let mut canvas = SoftwareCanvas::new(render_config.window_size);
        let dot = Sprite::from_image(&mut canvas, &RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255])));
        let ring = Sprite::from_image(&mut canvas, &RgbaImage::from_pixel(40, 40, Rgba([0, 0, 255, 128])));
        let mut render = RenderLoop::new(
            canvas,
            SystemClock::new(),
            Scene::from_sprites(dot, ring),
            render_state,
            DisplayConfig { refresh_rate: 250 },
            &render_config,
        );
        let frames = render.run().unwrap();
        (frames, render.canvas().frames_presented())
    });

    let drains = Arc::new(Mutex::new(0));
    let mut events = QuitAfter {
        remaining: 10,
        pressed: false,
        drains: Arc::clone(&drains),
    };
    let mut simulation = Simulation::new(Arc::clone(&state));
    let ticks = UpdateLoop::new(SystemClock::new(), config.updates_per_second)
        .run(|| simulation.update(&mut events));
    state.request_shutdown();

    let (frames, presented) = render_thread.join().unwrap();

    assert_eq!(ticks, 11);
    assert_eq!(*drains.lock().unwrap(), 11);
    assert_eq!(frames, presented);
    // Ten movement ticks; the quitting tick moves nothing.
    assert_eq!(state.position(Shape::Dot).load(), Position::new(190, 180));
}
