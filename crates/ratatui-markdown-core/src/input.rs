//! Backend-agnostic input events and the key binding sets widgets react to.
//!
//! Convert from your terminal backend once (see `crossterm_input` behind the `crossterm`
//! feature) and feed [`InputEvent`]s to widgets.
use crate::viewport::ViewportState;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    Enter,
    Tab,
    Esc,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyEvent {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::default(),
        }
    }

    pub fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c))
    }

    pub fn ctrl(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers {
                ctrl: true,
                ..KeyModifiers::default()
            },
        }
    }

    /// Exact match on code and all modifier flags.
    pub fn matches(&self, other: &KeyEvent) -> bool {
        self.code == other.code && self.modifiers == other.modifiers
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseEventKind {
    Down(MouseButton),
    Drag(MouseButton),
    Up(MouseButton),
    ScrollUp,
    ScrollDown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseEvent {
    pub x: u16,
    pub y: u16,
    pub kind: MouseEventKind,
    pub modifiers: KeyModifiers,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollAction {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

/// Vim-flavoured scroll keys, plus arrows and paging keys.
#[derive(Clone, Debug)]
pub struct ScrollBindings {
    pub line_step: i32,
    pub horiz_step: i32,
    pub bindings: Vec<(KeyEvent, ScrollAction)>,
}

impl Default for ScrollBindings {
    fn default() -> Self {
        use ScrollAction::*;

        Self {
            line_step: 1,
            horiz_step: 4,
            bindings: vec![
                (KeyEvent::new(KeyCode::Up), Up),
                (KeyEvent::char('k'), Up),
                (KeyEvent::new(KeyCode::Down), Down),
                (KeyEvent::char('j'), Down),
                (KeyEvent::new(KeyCode::Left), Left),
                (KeyEvent::char('h'), Left),
                (KeyEvent::new(KeyCode::Right), Right),
                (KeyEvent::char('l'), Right),
                (KeyEvent::new(KeyCode::PageUp), PageUp),
                (KeyEvent::ctrl('u'), PageUp),
                (KeyEvent::new(KeyCode::PageDown), PageDown),
                (KeyEvent::ctrl('d'), PageDown),
                (KeyEvent::char(' '), PageDown),
                (KeyEvent::new(KeyCode::Home), Top),
                (KeyEvent::char('g'), Top),
                (KeyEvent::new(KeyCode::End), Bottom),
                (KeyEvent::char('G'), Bottom),
            ],
        }
    }
}

impl ScrollBindings {
    pub fn action_for(&self, key: &KeyEvent) -> Option<ScrollAction> {
        self.bindings
            .iter()
            .find(|(pattern, _)| pattern.matches(key))
            .map(|(_, action)| *action)
    }

    pub fn apply(&self, state: &mut ViewportState, action: ScrollAction) {
        match action {
            ScrollAction::Up => state.scroll_y_by(-self.line_step),
            ScrollAction::Down => state.scroll_y_by(self.line_step),
            ScrollAction::Left => state.scroll_x_by(-self.horiz_step),
            ScrollAction::Right => state.scroll_x_by(self.horiz_step),
            ScrollAction::PageUp => state.page_up(),
            ScrollAction::PageDown => state.page_down(),
            ScrollAction::Top => state.to_top(),
            ScrollAction::Bottom => state.to_bottom(),
        }
    }
}

/// Keys for copying and clearing a selection.
///
/// Widgets never touch a clipboard; they hand the selected text back to the caller.
#[derive(Clone, Debug)]
pub struct SelectionBindings {
    pub copy: Vec<KeyEvent>,
    pub clear: Vec<KeyEvent>,
}

impl Default for SelectionBindings {
    fn default() -> Self {
        Self {
            copy: vec![KeyEvent::char('y')],
            clear: vec![KeyEvent::new(KeyCode::Esc)],
        }
    }
}

impl SelectionBindings {
    pub fn is_copy(&self, key: &KeyEvent) -> bool {
        self.copy.iter().any(|p| p.matches(key))
    }

    pub fn is_clear(&self, key: &KeyEvent) -> bool {
        self.clear.iter().any(|p| p.matches(key))
    }
}
