//! Translation of crossterm input into the unified event model

use crossterm::event::{
    KeyCode as TermKey, KeyEvent as TermKeyEvent, KeyEventKind, KeyModifiers,
    MouseButton as TermButton, MouseEvent as TermMouseEvent, MouseEventKind as TermMouseKind,
};
use ttk_core::{
    KeyCode, KeyEvent, ModifierKey, MouseButton, MouseEvent, MouseEventKind, MouseEventSet,
};

/// Mouse kinds a terminal can report
pub fn supported_mouse_events() -> MouseEventSet {
    MouseEventSet::from_kinds(&[
        MouseEventKind::ButtonDown,
        MouseEventKind::ButtonUp,
        MouseEventKind::Drag,
        MouseEventKind::Wheel,
    ])
}

pub fn modifiers(mods: KeyModifiers) -> ModifierKey {
    let mut out = ModifierKey::NONE;
    if mods.contains(KeyModifiers::SHIFT) {
        out |= ModifierKey::SHIFT;
    }
    if mods.contains(KeyModifiers::CONTROL) {
        out |= ModifierKey::CONTROL;
    }
    if mods.contains(KeyModifiers::ALT) {
        out |= ModifierKey::ALT;
    }
    if mods.contains(KeyModifiers::SUPER) || mods.contains(KeyModifiers::META) {
        out |= ModifierKey::COMMAND;
    }
    out
}

/// Map a key press; releases and keys without a unified code yield `None`
pub fn key_event(event: &TermKeyEvent) -> Option<KeyEvent> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let mut mods = modifiers(event.modifiers);
    let key_code = match event.code {
        TermKey::Char(ch) => {
            let code = KeyCode::for_char(ch).unwrap_or(KeyCode::UNKNOWN);
            return Some(KeyEvent::with_char(code, mods, ch));
        }
        TermKey::Enter => KeyCode::ENTER,
        TermKey::Tab => KeyCode::TAB,
        TermKey::BackTab => {
            mods |= ModifierKey::SHIFT;
            KeyCode::TAB
        }
        TermKey::Esc => KeyCode::ESCAPE,
        TermKey::Backspace => KeyCode::BACKSPACE,
        TermKey::Delete => KeyCode::DELETE,
        TermKey::Insert => KeyCode::INSERT,
        TermKey::Up => KeyCode::UP,
        TermKey::Down => KeyCode::DOWN,
        TermKey::Left => KeyCode::LEFT,
        TermKey::Right => KeyCode::RIGHT,
        TermKey::Home => KeyCode::HOME,
        TermKey::End => KeyCode::END,
        TermKey::PageUp => KeyCode::PAGE_UP,
        TermKey::PageDown => KeyCode::PAGE_DOWN,
        TermKey::F(n) => KeyCode::function(n)?,
        // Ctrl+Space arrives as NUL on most terminals
        TermKey::Null => {
            mods |= ModifierKey::CONTROL;
            KeyCode::SPACE
        }
        other => {
            log::trace!("dropping unmapped key {:?}", other);
            return None;
        }
    };
    Some(KeyEvent::new(key_code, mods))
}

fn button(button: TermButton) -> MouseButton {
    match button {
        TermButton::Left => MouseButton::Left,
        TermButton::Right => MouseButton::Right,
        TermButton::Middle => MouseButton::Middle,
    }
}

/// Map a mouse report, clamping the position to a `rows` x `cols` grid
///
/// Motion without a pressed button is not reported. Wheel deltas are one
/// line per notch, positive for up and right.
pub fn mouse_event(event: &TermMouseEvent, rows: usize, cols: usize) -> Option<MouseEvent> {
    let (kind, btn, dx, dy) = match event.kind {
        TermMouseKind::Down(b) => (MouseEventKind::ButtonDown, button(b), 0.0, 0.0),
        TermMouseKind::Up(b) => (MouseEventKind::ButtonUp, button(b), 0.0, 0.0),
        TermMouseKind::Drag(b) => (MouseEventKind::Drag, button(b), 0.0, 0.0),
        TermMouseKind::ScrollUp => (MouseEventKind::Wheel, MouseButton::None, 0.0, 1.0),
        TermMouseKind::ScrollDown => (MouseEventKind::Wheel, MouseButton::None, 0.0, -1.0),
        TermMouseKind::ScrollLeft => (MouseEventKind::Wheel, MouseButton::None, -1.0, 0.0),
        TermMouseKind::ScrollRight => (MouseEventKind::Wheel, MouseButton::None, 1.0, 0.0),
        TermMouseKind::Moved => return None,
    };
    let row = usize::from(event.row).min(rows.saturating_sub(1));
    let col = usize::from(event.column).min(cols.saturating_sub(1));
    Some(
        MouseEvent::new(kind, btn, row, col)
            .with_modifiers(modifiers(event.modifiers))
            .with_scroll(dx, dy),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: TermKey, mods: KeyModifiers) -> TermKeyEvent {
        TermKeyEvent {
            code,
            modifiers: mods,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_printable_key_carries_char() {
        let event = key_event(&press(TermKey::Char('a'), KeyModifiers::NONE)).unwrap();
        assert_eq!(event.key_code, KeyCode::letter('a').unwrap());
        assert_eq!(event.char, Some('a'));
        assert_eq!(event.text_char(), Some('a'));
    }

    #[test]
    fn test_control_letter_is_not_text() {
        let event = key_event(&press(TermKey::Char('c'), KeyModifiers::CONTROL)).unwrap();
        assert!(event.has_modifier(ModifierKey::CONTROL));
        assert_eq!(event.text_char(), None);
    }

    #[test]
    fn test_char_without_key_code() {
        let event = key_event(&press(TermKey::Char('!'), KeyModifiers::SHIFT)).unwrap();
        assert_eq!(event.key_code, KeyCode::UNKNOWN);
        assert_eq!(event.text_char(), Some('!'));
    }

    #[test]
    fn test_shift_arrow() {
        let event = key_event(&press(TermKey::Up, KeyModifiers::SHIFT)).unwrap();
        assert_eq!(event.key_code, KeyCode::UP);
        assert_eq!(event.modifiers, ModifierKey::SHIFT);
        assert_eq!(event.char, None);
    }

    #[test]
    fn test_special_keys() {
        let cases = [
            (TermKey::Enter, KeyCode::ENTER),
            (TermKey::Esc, KeyCode::ESCAPE),
            (TermKey::Backspace, KeyCode::BACKSPACE),
            (TermKey::F(5), KeyCode::F5),
            (TermKey::PageDown, KeyCode::PAGE_DOWN),
        ];
        for (term, expected) in cases {
            assert_eq!(key_event(&press(term, KeyModifiers::NONE)).unwrap().key_code, expected);
        }
        let back_tab = key_event(&press(TermKey::BackTab, KeyModifiers::NONE)).unwrap();
        assert_eq!(back_tab.key_code, KeyCode::TAB);
        assert!(back_tab.has_modifier(ModifierKey::SHIFT));
    }

    #[test]
    fn test_unmapped_and_release_dropped() {
        assert!(key_event(&press(TermKey::F(20), KeyModifiers::NONE)).is_none());
        assert!(key_event(&press(TermKey::CapsLock, KeyModifiers::NONE)).is_none());
        let mut release = press(TermKey::Char('a'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert!(key_event(&release).is_none());
    }

    #[test]
    fn test_mouse_clamped_to_grid() {
        let raw = TermMouseEvent {
            kind: TermMouseKind::Down(TermButton::Left),
            column: 200,
            row: 3,
            modifiers: KeyModifiers::NONE,
        };
        let event = mouse_event(&raw, 24, 80).unwrap();
        assert_eq!(event.kind, MouseEventKind::ButtonDown);
        assert_eq!(event.button, MouseButton::Left);
        assert_eq!((event.row, event.col), (3, 79));
    }

    #[test]
    fn test_wheel_and_motion() {
        let wheel = TermMouseEvent {
            kind: TermMouseKind::ScrollDown,
            column: 1,
            row: 1,
            modifiers: KeyModifiers::NONE,
        };
        let event = mouse_event(&wheel, 24, 80).unwrap();
        assert_eq!(event.kind, MouseEventKind::Wheel);
        assert_eq!(event.scroll_delta_y, -1.0);

        let moved = TermMouseEvent {
            kind: TermMouseKind::Moved,
            ..wheel
        };
        assert!(mouse_event(&moved, 24, 80).is_none());
        assert!(!supported_mouse_events().supports(MouseEventKind::DoubleClick));
    }

    proptest::proptest! {
        #[test]
        fn prop_mouse_position_stays_on_grid(
            column in 0u16..=u16::MAX,
            row in 0u16..=u16::MAX,
            rows in 1usize..300,
            cols in 1usize..300,
        ) {
            let raw = TermMouseEvent {
                kind: TermMouseKind::Drag(TermButton::Left),
                column,
                row,
                modifiers: KeyModifiers::NONE,
            };
            let event = mouse_event(&raw, rows, cols).unwrap();
            proptest::prop_assert!(event.row < rows && event.col < cols);
            if usize::from(row) < rows {
                proptest::prop_assert_eq!(event.row, usize::from(row));
            }
        }
    }
}
