//! Pointer event translation for the Wayland presenter

use log::debug;
use smithay_client_toolkit::seat::pointer::{PointerEvent, PointerEventKind};

use crate::input::{Action, InputEvent, MouseButton};

pub(crate) fn translate_pointer_events(events: &[PointerEvent], out: &mut Vec<InputEvent>) {
    for event in events {
        let (x, y) = event.position;
        match event.kind {
            PointerEventKind::Enter { .. } => {
                debug!("pointer entered canvas at ({x:.1}, {y:.1})");
                out.push(InputEvent::CursorMoved { x, y });
            }
            PointerEventKind::Leave { .. } => debug!("pointer left canvas"),
            PointerEventKind::Motion { .. } => out.push(InputEvent::CursorMoved { x, y }),
            PointerEventKind::Press { button, .. } => out.push(InputEvent::Button {
                button: MouseButton::from_code(button),
                action: Action::Press,
            }),
            PointerEventKind::Release { button, .. } => out.push(InputEvent::Button {
                button: MouseButton::from_code(button),
                action: Action::Release,
            }),
            PointerEventKind::Axis {
                horizontal,
                vertical,
                ..
            } => out.push(InputEvent::Scroll {
                dx: horizontal.absolute,
                dy: vertical.absolute,
            }),
        }
    }
}
