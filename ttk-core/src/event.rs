//! Unified input event model
//!
//! Every backend translates its native input (terminal key sequences, window
//! system events) into these value types. Events carry no backend ownership.

use std::fmt;
use std::time::{Duration, Instant};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Numeric key identifier shared by all backends
///
/// Printable ASCII keys that have a dedicated constant (ENTER, TAB, ...) use
/// their ASCII value; named keys start at 1000 and letter/digit/punctuation
/// keys used together with modifiers start at 2000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u32);

impl KeyCode {
    /// Keys that produce text but have no dedicated code (e.g. `!` or `é`)
    pub const UNKNOWN: KeyCode = KeyCode(0);

    pub const TAB: KeyCode = KeyCode(9);
    pub const ENTER: KeyCode = KeyCode(10);
    pub const ESCAPE: KeyCode = KeyCode(27);
    pub const SPACE: KeyCode = KeyCode(32);
    pub const BACKSPACE: KeyCode = KeyCode(127);

    pub const UP: KeyCode = KeyCode(1000);
    pub const DOWN: KeyCode = KeyCode(1001);
    pub const LEFT: KeyCode = KeyCode(1002);
    pub const RIGHT: KeyCode = KeyCode(1003);

    pub const F1: KeyCode = KeyCode(1100);
    pub const F2: KeyCode = KeyCode(1101);
    pub const F3: KeyCode = KeyCode(1102);
    pub const F4: KeyCode = KeyCode(1103);
    pub const F5: KeyCode = KeyCode(1104);
    pub const F6: KeyCode = KeyCode(1105);
    pub const F7: KeyCode = KeyCode(1106);
    pub const F8: KeyCode = KeyCode(1107);
    pub const F9: KeyCode = KeyCode(1108);
    pub const F10: KeyCode = KeyCode(1109);
    pub const F11: KeyCode = KeyCode(1110);
    pub const F12: KeyCode = KeyCode(1111);

    pub const INSERT: KeyCode = KeyCode(1200);
    pub const DELETE: KeyCode = KeyCode(1201);
    pub const HOME: KeyCode = KeyCode(1202);
    pub const END: KeyCode = KeyCode(1203);
    pub const PAGE_UP: KeyCode = KeyCode(1204);
    pub const PAGE_DOWN: KeyCode = KeyCode(1205);

    pub const KEY_A: KeyCode = KeyCode(2000);
    pub const KEY_Z: KeyCode = KeyCode(2025);
    pub const DIGIT_0: KeyCode = KeyCode(2100);
    pub const DIGIT_9: KeyCode = KeyCode(2109);

    pub const MINUS: KeyCode = KeyCode(2200);
    pub const EQUAL: KeyCode = KeyCode(2201);
    pub const LEFT_BRACKET: KeyCode = KeyCode(2202);
    pub const RIGHT_BRACKET: KeyCode = KeyCode(2203);
    pub const BACKSLASH: KeyCode = KeyCode(2204);
    pub const SEMICOLON: KeyCode = KeyCode(2205);
    pub const QUOTE: KeyCode = KeyCode(2206);
    pub const COMMA: KeyCode = KeyCode(2207);
    pub const PERIOD: KeyCode = KeyCode(2208);
    pub const SLASH: KeyCode = KeyCode(2209);
    pub const GRAVE: KeyCode = KeyCode(2210);

    /// Function key by number (1-12)
    pub fn function(n: u8) -> Option<KeyCode> {
        (1..=12)
            .contains(&n)
            .then(|| KeyCode(Self::F1.0 + u32::from(n) - 1))
    }

    /// Letter key for an ASCII letter, case-insensitive
    pub fn letter(c: char) -> Option<KeyCode> {
        let lower = c.to_ascii_lowercase();
        lower
            .is_ascii_lowercase()
            .then(|| KeyCode(Self::KEY_A.0 + (lower as u32 - 'a' as u32)))
    }

    /// Digit key for an ASCII digit
    pub fn digit(c: char) -> Option<KeyCode> {
        c.to_digit(10).map(|d| KeyCode(Self::DIGIT_0.0 + d))
    }

    /// Punctuation key for the unshifted character on a US layout
    pub fn punctuation(c: char) -> Option<KeyCode> {
        let code = match c {
            '-' => Self::MINUS,
            '=' => Self::EQUAL,
            '[' => Self::LEFT_BRACKET,
            ']' => Self::RIGHT_BRACKET,
            '\\' => Self::BACKSLASH,
            ';' => Self::SEMICOLON,
            '\'' => Self::QUOTE,
            ',' => Self::COMMA,
            '.' => Self::PERIOD,
            '/' => Self::SLASH,
            '`' => Self::GRAVE,
            _ => return None,
        };
        Some(code)
    }

    /// Key code for a character typed on the keyboard
    ///
    /// Letters, digits and punctuation map to their physical key codes, the
    /// control characters with dedicated codes map to them. Anything else
    /// yields `None`.
    pub fn for_char(c: char) -> Option<KeyCode> {
        match c {
            '\t' => Some(Self::TAB),
            '\r' | '\n' => Some(Self::ENTER),
            '\x1b' => Some(Self::ESCAPE),
            ' ' => Some(Self::SPACE),
            '\x7f' | '\x08' => Some(Self::BACKSPACE),
            _ => Self::letter(c)
                .or_else(|| Self::digit(c))
                .or_else(|| Self::punctuation(c)),
        }
    }

    /// Named keys: arrows, function keys and the navigation block
    pub fn is_special(self) -> bool {
        self.0 >= 1000
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            KeyCode::TAB => "Tab",
            KeyCode::ENTER => "Enter",
            KeyCode::ESCAPE => "Escape",
            KeyCode::SPACE => "Space",
            KeyCode::BACKSPACE => "Backspace",
            KeyCode::UP => "Up",
            KeyCode::DOWN => "Down",
            KeyCode::LEFT => "Left",
            KeyCode::RIGHT => "Right",
            KeyCode::INSERT => "Insert",
            KeyCode::DELETE => "Delete",
            KeyCode::HOME => "Home",
            KeyCode::END => "End",
            KeyCode::PAGE_UP => "PageUp",
            KeyCode::PAGE_DOWN => "PageDown",
            KeyCode(n @ 1100..=1111) => return write!(f, "F{}", n - 1099),
            KeyCode(n @ 2000..=2025) => {
                return write!(f, "{}", char::from(b'A' + (n - 2000) as u8))
            }
            KeyCode(n @ 2100..=2109) => return write!(f, "{}", n - 2100),
            KeyCode(n) => return write!(f, "Key({})", n),
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Modifier keys held during an input event
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ModifierKey: u8 {
        const SHIFT = 1;
        const CONTROL = 2;
        const ALT = 4;
        const COMMAND = 8;
    }
}

impl ModifierKey {
    pub const NONE: ModifierKey = ModifierKey::empty();

    /// Modifiers that turn a printable key into a shortcut
    pub const SHORTCUT: ModifierKey = ModifierKey::CONTROL
        .union(ModifierKey::ALT)
        .union(ModifierKey::COMMAND);
}

/// A key press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key_code: KeyCode,
    pub modifiers: ModifierKey,
    /// The character the key produced, if any
    pub char: Option<char>,
}

impl KeyEvent {
    pub fn new(key_code: KeyCode, modifiers: ModifierKey) -> Self {
        Self {
            key_code,
            modifiers,
            char: None,
        }
    }

    pub fn with_char(key_code: KeyCode, modifiers: ModifierKey, ch: char) -> Self {
        Self {
            key_code,
            modifiers,
            char: Some(ch),
        }
    }

    /// The key produced a printable character
    pub fn is_printable(&self) -> bool {
        self.char.map_or(false, |c| !c.is_control())
    }

    pub fn is_special_key(&self) -> bool {
        self.key_code.is_special()
    }

    pub fn has_modifier(&self, modifier: ModifierKey) -> bool {
        self.modifiers.contains(modifier)
    }

    /// The character to deliver as text input, if this key should produce one
    ///
    /// Keys combined with CONTROL, ALT or COMMAND are shortcuts and never
    /// produce text.
    pub fn text_char(&self) -> Option<char> {
        if self.modifiers.intersects(ModifierKey::SHORTCUT) || !self.is_printable() {
            return None;
        }
        self.char
    }
}

/// Printable text input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharEvent {
    pub ch: char,
    pub modifiers: ModifierKey,
}

impl CharEvent {
    pub fn new(ch: char) -> Self {
        Self {
            ch,
            modifiers: ModifierKey::NONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemEventKind {
    Resize,
    Close,
    FocusGained,
    FocusLost,
}

/// Window or session level notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub kind: SystemEventKind,
}

impl SystemEvent {
    pub fn new(kind: SystemEventKind) -> Self {
        Self { kind }
    }

    pub fn is_resize(&self) -> bool {
        self.kind == SystemEventKind::Resize
    }

    pub fn is_close(&self) -> bool {
        self.kind == SystemEventKind::Close
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseEventKind {
    ButtonDown,
    ButtonUp,
    DoubleClick,
    Move,
    Wheel,
    Drag,
}

impl MouseEventKind {
    pub const ALL: [MouseEventKind; 6] = [
        MouseEventKind::ButtonDown,
        MouseEventKind::ButtonUp,
        MouseEventKind::DoubleClick,
        MouseEventKind::Move,
        MouseEventKind::Wheel,
        MouseEventKind::Drag,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    #[default]
    None,
}

bitflags! {
    /// The set of mouse event kinds a backend delivers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MouseEventSet: u8 {
        const BUTTON_DOWN = 1;
        const BUTTON_UP = 1 << 1;
        const DOUBLE_CLICK = 1 << 2;
        const MOVE = 1 << 3;
        const WHEEL = 1 << 4;
        const DRAG = 1 << 5;
    }
}

impl From<MouseEventKind> for MouseEventSet {
    fn from(kind: MouseEventKind) -> Self {
        match kind {
            MouseEventKind::ButtonDown => MouseEventSet::BUTTON_DOWN,
            MouseEventKind::ButtonUp => MouseEventSet::BUTTON_UP,
            MouseEventKind::DoubleClick => MouseEventSet::DOUBLE_CLICK,
            MouseEventKind::Move => MouseEventSet::MOVE,
            MouseEventKind::Wheel => MouseEventSet::WHEEL,
            MouseEventKind::Drag => MouseEventSet::DRAG,
        }
    }
}

impl MouseEventSet {
    pub fn from_kinds(kinds: &[MouseEventKind]) -> Self {
        kinds
            .iter()
            .fold(MouseEventSet::empty(), |set, &kind| set | kind.into())
    }

    pub fn supports(&self, kind: MouseEventKind) -> bool {
        self.contains(kind.into())
    }

    /// Member kinds in declaration order
    pub fn kinds(&self) -> impl Iterator<Item = MouseEventKind> + '_ {
        MouseEventKind::ALL
            .into_iter()
            .filter(move |k| self.supports(*k))
    }
}

/// Pointer input in grid coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub button: MouseButton,
    pub row: usize,
    pub col: usize,
    /// Horizontal position inside the cell, in [0, 1)
    pub sub_cell_x: f32,
    /// Vertical position inside the cell, in [0, 1)
    pub sub_cell_y: f32,
    pub scroll_delta_x: f32,
    pub scroll_delta_y: f32,
    pub modifiers: ModifierKey,
}

impl MouseEvent {
    pub fn new(kind: MouseEventKind, button: MouseButton, row: usize, col: usize) -> Self {
        Self {
            kind,
            button,
            row,
            col,
            sub_cell_x: 0.0,
            sub_cell_y: 0.0,
            scroll_delta_x: 0.0,
            scroll_delta_y: 0.0,
            modifiers: ModifierKey::NONE,
        }
    }

    pub fn with_modifiers(mut self, modifiers: ModifierKey) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_scroll(mut self, dx: f32, dy: f32) -> Self {
        self.scroll_delta_x = dx;
        self.scroll_delta_y = dy;
        self
    }
}

/// A native menu item was invoked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEvent {
    pub item_id: String,
}

/// Any input delivered by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Key(KeyEvent),
    Char(CharEvent),
    System(SystemEvent),
    Mouse(MouseEvent),
    Menu(MenuEvent),
}

impl Event {
    pub fn resize() -> Self {
        Event::System(SystemEvent::new(SystemEventKind::Resize))
    }

    pub fn close() -> Self {
        Event::System(SystemEvent::new(SystemEventKind::Close))
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Event::System(e) if e.is_close())
    }
}

/// Interval within which a second press on the same cell is a double click
pub const DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(400);

/// Turns repeated button presses into double clicks
#[derive(Debug, Default)]
pub struct ClickTracker {
    last: Option<(Instant, MouseButton, usize, usize)>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a press, returning `DoubleClick` for the second press of a pair
    pub fn press(&mut self, at: Instant, button: MouseButton, row: usize, col: usize) -> MouseEventKind {
        match self.last {
            Some((prev, b, r, c))
                if b == button
                    && r == row
                    && c == col
                    && at.saturating_duration_since(prev) <= DOUBLE_CLICK_INTERVAL =>
            {
                self.last = None;
                MouseEventKind::DoubleClick
            }
            _ => {
                self.last = Some((at, button, row, col));
                MouseEventKind::ButtonDown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_code_values() {
        assert_eq!(KeyCode::ENTER.0, 10);
        assert_eq!(KeyCode::ESCAPE.0, 27);
        assert_eq!(KeyCode::BACKSPACE.0, 127);
        assert_eq!(KeyCode::RIGHT.0, 1003);
        assert_eq!(KeyCode::F12.0, 1111);
        assert_eq!(KeyCode::PAGE_DOWN.0, 1205);
        assert_eq!(KeyCode::KEY_Z.0, 2025);
        assert_eq!(KeyCode::DIGIT_9.0, 2109);
        assert_eq!(KeyCode::GRAVE.0, 2210);
    }

    #[test]
    fn test_key_code_constructors() {
        assert_eq!(KeyCode::function(1), Some(KeyCode::F1));
        assert_eq!(KeyCode::function(12), Some(KeyCode::F12));
        assert_eq!(KeyCode::function(13), None);
        assert_eq!(KeyCode::letter('q'), Some(KeyCode(2016)));
        assert_eq!(KeyCode::letter('Q'), Some(KeyCode(2016)));
        assert_eq!(KeyCode::digit('7'), Some(KeyCode(2107)));
        assert_eq!(KeyCode::for_char('/'), Some(KeyCode::SLASH));
        assert_eq!(KeyCode::for_char('\r'), Some(KeyCode::ENTER));
        assert_eq!(KeyCode::for_char('é'), None);
    }

    #[test]
    fn test_key_code_display() {
        assert_eq!(KeyCode::F5.to_string(), "F5");
        assert_eq!(KeyCode::letter('c').map(|k| k.to_string()), Some("C".into()));
        assert_eq!(KeyCode::PAGE_UP.to_string(), "PageUp");
    }

    #[test]
    fn test_modifier_flags() {
        let mods = ModifierKey::SHIFT | ModifierKey::CONTROL;
        assert_eq!(mods.bits(), 3);
        assert_eq!(ModifierKey::COMMAND.bits(), 8);
        let event = KeyEvent::new(KeyCode::UP, mods);
        assert!(event.has_modifier(ModifierKey::SHIFT));
        assert!(!event.has_modifier(ModifierKey::ALT));
        assert!(event.is_special_key());
    }

    #[test]
    fn test_text_char() {
        let plain = KeyEvent::with_char(KeyCode::KEY_A, ModifierKey::NONE, 'a');
        assert_eq!(plain.text_char(), Some('a'));

        let shifted = KeyEvent::with_char(KeyCode::KEY_A, ModifierKey::SHIFT, 'A');
        assert_eq!(shifted.text_char(), Some('A'));

        let ctrl = KeyEvent::with_char(KeyCode::KEY_A, ModifierKey::CONTROL, 'a');
        assert_eq!(ctrl.text_char(), None);

        let enter = KeyEvent::with_char(KeyCode::ENTER, ModifierKey::NONE, '\r');
        assert!(!enter.is_printable());
        assert_eq!(enter.text_char(), None);
    }

    #[test]
    fn test_mouse_event_set() {
        let set = MouseEventSet::from_kinds(&[MouseEventKind::ButtonDown, MouseEventKind::Wheel]);
        assert_eq!(set, MouseEventSet::BUTTON_DOWN | MouseEventSet::WHEEL);
        assert!(set.supports(MouseEventKind::ButtonDown));
        assert!(set.supports(MouseEventKind::Wheel));
        assert!(!set.supports(MouseEventKind::DoubleClick));
        assert_eq!(set.iter().count(), 2);
        assert!(MouseEventSet::empty().is_empty());
        assert_eq!(MouseEventSet::all().kinds().count(), 6);
        assert_eq!(MouseEventSet::from_kinds(&MouseEventKind::ALL), MouseEventSet::all());
    }

    #[test]
    fn test_double_click_detection() {
        let mut tracker = ClickTracker::new();
        let t0 = Instant::now();
        assert_eq!(
            tracker.press(t0, MouseButton::Left, 2, 3),
            MouseEventKind::ButtonDown
        );
        assert_eq!(
            tracker.press(t0 + Duration::from_millis(200), MouseButton::Left, 2, 3),
            MouseEventKind::DoubleClick
        );
        // A third press starts a new pair
        assert_eq!(
            tracker.press(t0 + Duration::from_millis(300), MouseButton::Left, 2, 3),
            MouseEventKind::ButtonDown
        );
    }

    #[test]
    fn test_double_click_requires_same_cell_and_interval() {
        let mut tracker = ClickTracker::new();
        let t0 = Instant::now();
        tracker.press(t0, MouseButton::Left, 0, 0);
        assert_eq!(
            tracker.press(t0 + Duration::from_millis(100), MouseButton::Left, 0, 1),
            MouseEventKind::ButtonDown
        );
        assert_eq!(
            tracker.press(t0 + Duration::from_millis(900), MouseButton::Left, 0, 1),
            MouseEventKind::ButtonDown
        );
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::Menu(MenuEvent {
            item_id: "file.open".to_string(),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"menu\""));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
