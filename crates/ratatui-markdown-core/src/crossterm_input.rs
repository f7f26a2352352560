use crossterm::event as ct;

use crate::input::InputEvent;
use crate::input::KeyCode;
use crate::input::KeyEvent;
use crate::input::KeyModifiers;
use crate::input::MouseButton;
use crate::input::MouseEvent;
use crate::input::MouseEventKind;

/// Converts a crossterm event; returns `None` for events widgets do not consume
/// (key releases, focus, resize, unsupported keys).
pub fn input_event_from_crossterm(ev: ct::Event) -> Option<InputEvent> {
    match ev {
        ct::Event::Key(key) if key.kind == ct::KeyEventKind::Press => {
            key_event_from_crossterm(key).map(InputEvent::Key)
        }
        ct::Event::Mouse(m) => mouse_event_from_crossterm(m).map(InputEvent::Mouse),
        _ => None,
    }
}

pub fn key_event_from_crossterm(key: ct::KeyEvent) -> Option<KeyEvent> {
    let code = match key.code {
        ct::KeyCode::Char(c) => KeyCode::Char(c),
        ct::KeyCode::Enter => KeyCode::Enter,
        ct::KeyCode::Tab => KeyCode::Tab,
        ct::KeyCode::Esc => KeyCode::Esc,
        ct::KeyCode::Left => KeyCode::Left,
        ct::KeyCode::Right => KeyCode::Right,
        ct::KeyCode::Up => KeyCode::Up,
        ct::KeyCode::Down => KeyCode::Down,
        ct::KeyCode::Home => KeyCode::Home,
        ct::KeyCode::End => KeyCode::End,
        ct::KeyCode::PageUp => KeyCode::PageUp,
        ct::KeyCode::PageDown => KeyCode::PageDown,
        _ => return None,
    };
    let mut modifiers = modifiers_from_crossterm(key.modifiers);
    // Uppercase letters already carry the shift; bindings like `G` are written without it.
    if matches!(code, KeyCode::Char(c) if c.is_ascii_uppercase()) {
        modifiers.shift = false;
    }
    Some(KeyEvent { code, modifiers })
}

pub fn mouse_event_from_crossterm(m: ct::MouseEvent) -> Option<MouseEvent> {
    let button = |b: ct::MouseButton| match b {
        ct::MouseButton::Left => MouseButton::Left,
        ct::MouseButton::Right => MouseButton::Right,
        ct::MouseButton::Middle => MouseButton::Middle,
    };
    let kind = match m.kind {
        ct::MouseEventKind::Down(b) => MouseEventKind::Down(button(b)),
        ct::MouseEventKind::Drag(b) => MouseEventKind::Drag(button(b)),
        ct::MouseEventKind::Up(b) => MouseEventKind::Up(button(b)),
        ct::MouseEventKind::ScrollUp => MouseEventKind::ScrollUp,
        ct::MouseEventKind::ScrollDown => MouseEventKind::ScrollDown,
        _ => return None,
    };
    Some(MouseEvent {
        x: m.column,
        y: m.row,
        kind,
        modifiers: modifiers_from_crossterm(m.modifiers),
    })
}

fn modifiers_from_crossterm(m: ct::KeyModifiers) -> KeyModifiers {
    KeyModifiers {
        shift: m.contains(ct::KeyModifiers::SHIFT),
        ctrl: m.contains(ct::KeyModifiers::CONTROL),
        alt: m.contains(ct::KeyModifiers::ALT),
    }
}
