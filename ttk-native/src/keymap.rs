//! winit keyboard input to unified key codes

use ttk_core::{KeyCode, KeyEvent, ModifierKey};
use winit::keyboard::{Key, KeyCode as PhysicalCode, ModifiersState, NamedKey, PhysicalKey};

pub fn modifiers(state: ModifiersState) -> ModifierKey {
    let mut out = ModifierKey::NONE;
    if state.shift_key() {
        out |= ModifierKey::SHIFT;
    }
    if state.control_key() {
        out |= ModifierKey::CONTROL;
    }
    if state.alt_key() {
        out |= ModifierKey::ALT;
    }
    if state.super_key() {
        out |= ModifierKey::COMMAND;
    }
    out
}

/// Map a key press
///
/// The logical key decides the code and character. When the layout or a
/// modifier turns a letter into something without a code (Option+A on macOS
/// yields 'å'), the physical key supplies the code instead. Keys with neither
/// are dropped.
pub fn key_event(logical: &Key, physical: PhysicalKey, mods: ModifierKey) -> Option<KeyEvent> {
    match logical {
        Key::Named(named) => named_key(*named, mods),
        Key::Character(text) => {
            let mut chars = text.chars();
            let ch = chars.next()?;
            if chars.next().is_some() {
                log::trace!("dropping multi-character key {:?}", text);
                return None;
            }
            let code = KeyCode::for_char(ch)
                .or_else(|| physical_code(physical))
                .unwrap_or(KeyCode::UNKNOWN);
            Some(KeyEvent::with_char(code, mods, ch))
        }
        Key::Dead(_) | Key::Unidentified(_) => {
            let code = physical_code(physical)?;
            Some(KeyEvent::new(code, mods))
        }
    }
}

fn named_key(named: NamedKey, mods: ModifierKey) -> Option<KeyEvent> {
    let code = match named {
        NamedKey::Space => return Some(KeyEvent::with_char(KeyCode::SPACE, mods, ' ')),
        NamedKey::Enter => KeyCode::ENTER,
        NamedKey::Tab => KeyCode::TAB,
        NamedKey::Escape => KeyCode::ESCAPE,
        NamedKey::Backspace => KeyCode::BACKSPACE,
        NamedKey::Delete => KeyCode::DELETE,
        NamedKey::Insert => KeyCode::INSERT,
        NamedKey::Home => KeyCode::HOME,
        NamedKey::End => KeyCode::END,
        NamedKey::PageUp => KeyCode::PAGE_UP,
        NamedKey::PageDown => KeyCode::PAGE_DOWN,
        NamedKey::ArrowUp => KeyCode::UP,
        NamedKey::ArrowDown => KeyCode::DOWN,
        NamedKey::ArrowLeft => KeyCode::LEFT,
        NamedKey::ArrowRight => KeyCode::RIGHT,
        NamedKey::F1 => KeyCode::F1,
        NamedKey::F2 => KeyCode::F2,
        NamedKey::F3 => KeyCode::F3,
        NamedKey::F4 => KeyCode::F4,
        NamedKey::F5 => KeyCode::F5,
        NamedKey::F6 => KeyCode::F6,
        NamedKey::F7 => KeyCode::F7,
        NamedKey::F8 => KeyCode::F8,
        NamedKey::F9 => KeyCode::F9,
        NamedKey::F10 => KeyCode::F10,
        NamedKey::F11 => KeyCode::F11,
        NamedKey::F12 => KeyCode::F12,
        _ => return None,
    };
    Some(KeyEvent::new(code, mods))
}

/// Code for the physical key position on a US layout
pub fn physical_code(physical: PhysicalKey) -> Option<KeyCode> {
    let PhysicalKey::Code(code) = physical else {
        return None;
    };
    let c = match code {
        PhysicalCode::KeyA => 'a',
        PhysicalCode::KeyB => 'b',
        PhysicalCode::KeyC => 'c',
        PhysicalCode::KeyD => 'd',
        PhysicalCode::KeyE => 'e',
        PhysicalCode::KeyF => 'f',
        PhysicalCode::KeyG => 'g',
        PhysicalCode::KeyH => 'h',
        PhysicalCode::KeyI => 'i',
        PhysicalCode::KeyJ => 'j',
        PhysicalCode::KeyK => 'k',
        PhysicalCode::KeyL => 'l',
        PhysicalCode::KeyM => 'm',
        PhysicalCode::KeyN => 'n',
        PhysicalCode::KeyO => 'o',
        PhysicalCode::KeyP => 'p',
        PhysicalCode::KeyQ => 'q',
        PhysicalCode::KeyR => 'r',
        PhysicalCode::KeyS => 's',
        PhysicalCode::KeyT => 't',
        PhysicalCode::KeyU => 'u',
        PhysicalCode::KeyV => 'v',
        PhysicalCode::KeyW => 'w',
        PhysicalCode::KeyX => 'x',
        PhysicalCode::KeyY => 'y',
        PhysicalCode::KeyZ => 'z',
        PhysicalCode::Digit0 => '0',
        PhysicalCode::Digit1 => '1',
        PhysicalCode::Digit2 => '2',
        PhysicalCode::Digit3 => '3',
        PhysicalCode::Digit4 => '4',
        PhysicalCode::Digit5 => '5',
        PhysicalCode::Digit6 => '6',
        PhysicalCode::Digit7 => '7',
        PhysicalCode::Digit8 => '8',
        PhysicalCode::Digit9 => '9',
        PhysicalCode::Minus => '-',
        PhysicalCode::Equal => '=',
        PhysicalCode::BracketLeft => '[',
        PhysicalCode::BracketRight => ']',
        PhysicalCode::Backslash => '\\',
        PhysicalCode::Semicolon => ';',
        PhysicalCode::Quote => '\'',
        PhysicalCode::Comma => ',',
        PhysicalCode::Period => '.',
        PhysicalCode::Slash => '/',
        PhysicalCode::Backquote => '`',
        _ => return None,
    };
    KeyCode::for_char(c)
}
