use winit::dpi::PhysicalSize;
use winit::keyboard::KeyCode;

/// Window and keyboard events the update loop cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    Key { code: KeyCode, pressed: bool },
    Resized(PhysicalSize<u32>),
    Focused(bool),
}

/// Non-blocking queue of pending input.
pub trait EventSource {
    /// Appends every event queued since the last call to `out`.
    fn drain(&mut self, out: &mut Vec<InputEvent>);
}
