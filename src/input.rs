//! Input events and the callback table they are dispatched through

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Space,
    Enter,
    Char(char),
    /// Platform key code without a named variant.
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u32),
}

impl MouseButton {
    /// Map a Linux input event code (`BTN_*`).
    pub fn from_code(code: u32) -> Self {
        match code {
            0x110 => MouseButton::Left,
            0x111 => MouseButton::Right,
            0x112 => MouseButton::Middle,
            other => MouseButton::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Press,
    Release,
}

/// Anything a callback can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Key(Key),
    Mouse(MouseButton),
}

impl From<Key> for Button {
    fn from(key: Key) -> Self {
        Button::Key(key)
    }
}

impl From<MouseButton> for Button {
    fn from(button: MouseButton) -> Self {
        Button::Mouse(button)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key { key: Key, action: Action },
    Button { button: MouseButton, action: Action },
    CursorMoved { x: f64, y: f64 },
    Scroll { dx: f64, dy: f64 },
    /// The window was closed by the user or the compositor.
    CloseRequested,
}

pub type ButtonCallback = Box<dyn FnMut() + Send>;
pub type ScrollCallback = Box<dyn FnMut(f64, f64) + Send>;

/// What the canvas should do after an event was dispatched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Dispatch {
    Continue,
    Close,
    Cursor(f64, f64),
}

/// Callbacks keyed by button and action. Escape closes the canvas unless
/// something else is bound to its press.
#[derive(Default)]
pub(crate) struct Bindings {
    buttons: HashMap<(Button, Action), ButtonCallback>,
    scroll: Option<ScrollCallback>,
}

impl Bindings {
    pub(crate) fn bind_button(&mut self, button: Button, action: Action, callback: ButtonCallback) {
        self.buttons.insert((button, action), callback);
    }

    pub(crate) fn bind_scroll(&mut self, callback: ScrollCallback) {
        self.scroll = Some(callback);
    }

    fn fire(&mut self, button: Button, action: Action) -> bool {
        match self.buttons.get_mut(&(button, action)) {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    pub(crate) fn dispatch(&mut self, event: &InputEvent) -> Dispatch {
        match *event {
            InputEvent::Key { key, action } => {
                let handled = self.fire(Button::Key(key), action);
                if !handled && key == Key::Escape && action == Action::Press {
                    return Dispatch::Close;
                }
                Dispatch::Continue
            }
            InputEvent::Button { button, action } => {
                self.fire(Button::Mouse(button), action);
                Dispatch::Continue
            }
            InputEvent::Scroll { dx, dy } => {
                if let Some(callback) = self.scroll.as_mut() {
                    callback(dx, dy);
                }
                Dispatch::Continue
            }
            InputEvent::CursorMoved { x, y } => Dispatch::Cursor(x, y),
            InputEvent::CloseRequested => Dispatch::Close,
        }
    }
}
