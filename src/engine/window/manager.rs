//! Window management implementation.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::engine::input::{EventSource, InputEvent};

const STARTUP_PUMP_ATTEMPTS: u32 = 100;
const STARTUP_PUMP_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] EventLoopError),

    #[error("failed to create window: {0}")]
    CreateWindow(#[from] OsError),

    #[error("event loop exited with code {0} before the window was created")]
    ExitedDuringStartup(i32),

    #[error("window was not created during startup")]
    NotResumed,
}

/// Receives winit callbacks and queues them as [`InputEvent`]s.
struct EventCollector {
    attributes: WindowAttributes,
    window: Option<Arc<Window>>,
    create_error: Option<OsError>,
    pending: Vec<InputEvent>,
}

impl EventCollector {
    fn new(attributes: WindowAttributes) -> Self {
        Self {
            attributes,
            window: None,
            create_error: None,
            pending: Vec::new(),
        }
    }
}

impl ApplicationHandler for EventCollector {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => {
                center_on_monitor(&window);
                info!("Window created: {:?}", window.inner_size());
                self.window = Some(Arc::new(window));
            }
            Err(e) => {
                error!("Failed to create window: {:?}", e);
                self.create_error = Some(e);
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.pending.push(InputEvent::Quit);
            }
            WindowEvent::Resized(physical_size) => {
                self.pending.push(InputEvent::Resized(physical_size));
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    let pressed = event.state == ElementState::Pressed;
                    self.pending.push(InputEvent::Key { code, pressed });
                }
            }
            WindowEvent::Focused(focused) => {
                self.pending.push(InputEvent::Focused(focused));
            }
            _ => (),
        }
    }
}

fn center_on_monitor(window: &Window) {
    if let Some(monitor) = window.current_monitor() {
        let area = monitor.size();
        let origin = monitor.position();
        let outer = window.outer_size();
        let x = origin.x + (area.width as i32 - outer.width as i32) / 2;
        let y = origin.y + (area.height as i32 - outer.height as i32) / 2;
        window.set_outer_position(PhysicalPosition::new(x, y));
    }
}

/// Owns the winit event loop and the window it created.
///
/// Must stay on the thread that created it. Events are drained without
/// blocking through `pump_app_events`.
pub struct WindowManager {
    event_loop: EventLoop<()>,
    collector: EventCollector,
    window: Arc<Window>,
}

impl WindowManager {
    pub fn new(title: &str, size: PhysicalSize<u32>) -> Result<Self, WindowError> {
        let mut event_loop = EventLoop::new()?;
        let attributes = Window::default_attributes()
            .with_title(title)
            .with_inner_size(LogicalSize::new(size.width as f64, size.height as f64))
            .with_resizable(true)
            .with_visible(true);
        let mut collector = EventCollector::new(attributes);

        for _ in 0..STARTUP_PUMP_ATTEMPTS {
            if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(STARTUP_PUMP_TIMEOUT), &mut collector) {
                return Err(WindowError::ExitedDuringStartup(code));
            }
            if let Some(e) = collector.create_error.take() {
                return Err(WindowError::CreateWindow(e));
            }
            if collector.window.is_some() {
                break;
            }
        }
        let window = collector.window.clone().ok_or(WindowError::NotResumed)?;
        debug!("Event loop ready, {} events queued during startup", collector.pending.len());

        Ok(Self {
            event_loop,
            collector,
            window,
        })
    }

    pub fn window(&self) -> Arc<Window> {
        Arc::clone(&self.window)
    }

    pub fn get_size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }
}

impl EventSource for WindowManager {
    fn drain(&mut self, out: &mut Vec<InputEvent>) {
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(Some(Duration::ZERO), &mut self.collector) {
            debug!("Event loop exited with code {code}");
            self.collector.pending.push(InputEvent::Quit);
        }
        out.append(&mut self.collector.pending);
    }
}
