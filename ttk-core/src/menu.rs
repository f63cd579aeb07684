//! Menu bar descriptor and live enabled-state
//!
//! The descriptor is purely descriptive and is handed to a backend once.
//! Afterwards only the enabled flag of individual items changes, through
//! `MenuState`, without rebuilding anything.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::{KeyCode, ModifierKey};

/// Top-level menu bar
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuBar {
    #[serde(default)]
    pub menus: Vec<Menu>,
}

/// One drop-down menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

/// Entry in a menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MenuItem {
    Separator {
        separator: bool,
    },
    Entry {
        id: String,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shortcut: Option<String>,
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
}

fn default_enabled() -> bool {
    true
}

impl MenuItem {
    pub fn entry(id: impl Into<String>, label: impl Into<String>) -> Self {
        MenuItem::Entry {
            id: id.into(),
            label: label.into(),
            shortcut: None,
            enabled: true,
        }
    }

    pub fn separator() -> Self {
        MenuItem::Separator { separator: true }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            MenuItem::Entry { id, .. } => Some(id),
            MenuItem::Separator { .. } => None,
        }
    }
}

impl MenuBar {
    /// Parse the JSON form `{"menus": [...]}`
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// All item entries with their ids, in menu order
    pub fn entries(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.menus.iter().flat_map(|menu| {
            menu.items.iter().filter_map(|item| match item {
                MenuItem::Entry { id, enabled, .. } => Some((id.as_str(), *enabled)),
                MenuItem::Separator { .. } => None,
            })
        })
    }
}

/// Live id -> enabled mapping for an installed menu bar
#[derive(Debug, Clone, Default)]
pub struct MenuState {
    enabled: HashMap<String, bool>,
}

impl MenuState {
    pub fn new(bar: &MenuBar) -> Self {
        let enabled = bar
            .entries()
            .map(|(id, enabled)| (id.to_string(), enabled))
            .collect();
        Self { enabled }
    }

    /// Update an item; returns false (and logs) for unknown ids
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        match self.enabled.get_mut(id) {
            Some(state) => {
                *state = enabled;
                true
            }
            None => {
                log::warn!("update_menu_item_state: unknown menu item '{}'", id);
                false
            }
        }
    }

    pub fn is_enabled(&self, id: &str) -> Option<bool> {
        self.enabled.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

/// Parsed keyboard shortcut such as `Cmd+Shift+N`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
    pub modifiers: ModifierKey,
    pub key: KeyCode,
}

impl Shortcut {
    /// Parse `Modifier+...+Key`; modifier names are case-insensitive
    ///
    /// Accepts Cmd/Command/Meta/Super, Ctrl/Control, Alt/Option/Opt and Shift.
    pub fn parse(text: &str) -> Option<Shortcut> {
        let mut modifiers = ModifierKey::NONE;
        let mut key = None;
        for part in text.split('+').map(str::trim) {
            if part.is_empty() {
                return None;
            }
            match part.to_ascii_lowercase().as_str() {
                "cmd" | "command" | "meta" | "super" => modifiers |= ModifierKey::COMMAND,
                "ctrl" | "control" => modifiers |= ModifierKey::CONTROL,
                "alt" | "option" | "opt" => modifiers |= ModifierKey::ALT,
                "shift" => modifiers |= ModifierKey::SHIFT,
                name => {
                    if key.is_some() {
                        return None;
                    }
                    key = Some(key_by_name(name)?);
                }
            }
        }
        key.map(|key| Shortcut { modifiers, key })
    }
}

fn key_by_name(name: &str) -> Option<KeyCode> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return KeyCode::for_char(c);
    }
    let code = match name {
        "enter" | "return" => KeyCode::ENTER,
        "esc" | "escape" => KeyCode::ESCAPE,
        "tab" => KeyCode::TAB,
        "space" => KeyCode::SPACE,
        "backspace" => KeyCode::BACKSPACE,
        "delete" | "del" => KeyCode::DELETE,
        "insert" => KeyCode::INSERT,
        "home" => KeyCode::HOME,
        "end" => KeyCode::END,
        "pageup" => KeyCode::PAGE_UP,
        "pagedown" => KeyCode::PAGE_DOWN,
        "up" => KeyCode::UP,
        "down" => KeyCode::DOWN,
        "left" => KeyCode::LEFT,
        "right" => KeyCode::RIGHT,
        _ => {
            let n = name.strip_prefix('f')?.parse::<u8>().ok()?;
            return KeyCode::function(n);
        }
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MENU_JSON: &str = r#"{
        "menus": [
            {
                "id": "file",
                "label": "File",
                "items": [
                    {"id": "file.open", "label": "Open", "shortcut": "Cmd+O", "enabled": true},
                    {"separator": true},
                    {"id": "file.delete", "label": "Delete", "enabled": false}
                ]
            },
            {
                "id": "edit",
                "label": "Edit",
                "items": [
                    {"id": "edit.paste", "label": "Paste", "shortcut": "Cmd+V"}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_menu_json() {
        let bar = MenuBar::from_json(MENU_JSON).unwrap();
        assert_eq!(bar.menus.len(), 2);
        assert_eq!(bar.menus[0].items.len(), 3);
        assert_eq!(bar.menus[0].items[1], MenuItem::separator());
        assert_eq!(
            bar.menus[1].items[0],
            MenuItem::Entry {
                id: "edit.paste".into(),
                label: "Paste".into(),
                shortcut: Some("Cmd+V".into()),
                enabled: true,
            }
        );
    }

    #[test]
    fn test_menu_state_updates_in_place() {
        let bar = MenuBar::from_json(MENU_JSON).unwrap();
        let mut state = MenuState::new(&bar);
        assert_eq!(state.len(), 3);
        assert_eq!(state.is_enabled("file.delete"), Some(false));

        assert!(state.set_enabled("file.delete", true));
        assert_eq!(state.is_enabled("file.delete"), Some(true));

        assert!(!state.set_enabled("file.missing", true));
        assert_eq!(state.is_enabled("file.missing"), None);
    }

    #[test]
    fn test_menu_round_trip_json() {
        let bar = MenuBar::from_json(MENU_JSON).unwrap();
        let json = serde_json::to_string(&bar).unwrap();
        assert_eq!(MenuBar::from_json(&json).unwrap(), bar);
    }

    #[test]
    fn test_parse_shortcut() {
        let s = Shortcut::parse("Cmd+Shift+N").unwrap();
        assert_eq!(s.modifiers, ModifierKey::COMMAND | ModifierKey::SHIFT);
        assert_eq!(s.key, KeyCode::letter('n').unwrap());

        let s = Shortcut::parse("ctrl+f5").unwrap();
        assert_eq!(s.modifiers, ModifierKey::CONTROL);
        assert_eq!(s.key, KeyCode::F5);

        let s = Shortcut::parse("Delete").unwrap();
        assert_eq!(s.modifiers, ModifierKey::NONE);
        assert_eq!(s.key, KeyCode::DELETE);

        assert_eq!(Shortcut::parse("Cmd+"), None);
        assert_eq!(Shortcut::parse("Cmd+A+B"), None);
        assert_eq!(Shortcut::parse("Cmd+Shift"), None);
    }
}
