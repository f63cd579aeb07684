//! Native menu bar
//!
//! The enabled state of every item lives in `MenuState` on all platforms.
//! Where a window-attachable menu bar exists (macOS, Windows) a muda menu
//! mirrors it; elsewhere menus exist as state only.

use ttk_core::{MenuBar, MenuEvent, MenuState};
use winit::window::Window;

#[derive(Debug, Default)]
pub struct NativeMenu {
    bar: Option<MenuBar>,
    state: MenuState,
    #[cfg(any(target_os = "macos", target_os = "windows"))]
    platform: Option<platform::MenuBarHandle>,
}

impl NativeMenu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the menu bar, attaching it to `window` when one exists
    pub fn install(&mut self, bar: &MenuBar, window: Option<&Window>) {
        self.state = MenuState::new(bar);
        self.bar = Some(bar.clone());
        log::debug!("menu bar installed with {} items", self.state.len());
        if let Some(window) = window {
            self.attach(window);
        }
    }

    /// Attach the installed bar to a (new) window
    pub fn attach(&mut self, window: &Window) {
        let Some(bar) = self.bar.as_ref() else {
            return;
        };
        #[cfg(any(target_os = "macos", target_os = "windows"))]
        {
            match platform::MenuBarHandle::build(bar, &self.state)
                .and_then(|handle| handle.attach(window).map(|()| handle))
            {
                Ok(handle) => self.platform = Some(handle),
                Err(e) => log::warn!("native menu bar unavailable: {}", e),
            }
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            let _ = (bar, window);
            log::info!("no native menu bar on this platform; menu items are reachable by shortcut only");
        }
    }

    pub fn set_enabled(&mut self, item_id: &str, enabled: bool) -> bool {
        if !self.state.set_enabled(item_id, enabled) {
            return false;
        }
        #[cfg(any(target_os = "macos", target_os = "windows"))]
        {
            if let Some(handle) = &self.platform {
                handle.set_enabled(item_id, enabled);
            }
        }
        true
    }

    pub fn state(&self) -> &MenuState {
        &self.state
    }

    /// Menu activations since the last poll, disabled items filtered out
    pub fn poll(&mut self) -> Vec<MenuEvent> {
        #[cfg(any(target_os = "macos", target_os = "windows"))]
        let activated = platform::drain();
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let activated: Vec<String> = Vec::new();

        self.filter_enabled(activated)
    }

    fn filter_enabled(&self, ids: Vec<String>) -> Vec<MenuEvent> {
        ids.into_iter()
            .filter(|id| self.state.is_enabled(id) == Some(true))
            .map(|item_id| MenuEvent { item_id })
            .collect()
    }

    /// Forget the window attachment, keeping the descriptor for the next window
    pub fn detach(&mut self) {
        #[cfg(any(target_os = "macos", target_os = "windows"))]
        {
            self.platform = None;
        }
    }
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
mod platform {
    use std::collections::HashMap;

    use muda::accelerator::Accelerator;
    use muda::{Menu, MenuItem, PredefinedMenuItem, Submenu};
    use ttk_core::menu::MenuItem as Item;
    use ttk_core::{MenuBar, MenuState};
    use winit::window::Window;

    pub struct MenuBarHandle {
        menu: Menu,
        items: HashMap<String, MenuItem>,
    }

    impl std::fmt::Debug for MenuBarHandle {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MenuBarHandle")
                .field("items", &self.items.len())
                .finish()
        }
    }

    impl MenuBarHandle {
        pub fn build(bar: &MenuBar, state: &MenuState) -> muda::Result<Self> {
            let menu = Menu::new();
            let mut items = HashMap::new();
            for descriptor in &bar.menus {
                let submenu = Submenu::new(&descriptor.label, true);
                for item in &descriptor.items {
                    match item {
                        Item::Separator { .. } => {
                            submenu.append(&PredefinedMenuItem::separator())?;
                        }
                        Item::Entry {
                            id,
                            label,
                            shortcut,
                            ..
                        } => {
                            let accelerator = shortcut
                                .as_deref()
                                .and_then(|s| s.parse::<Accelerator>().ok());
                            let enabled = state.is_enabled(id).unwrap_or(true);
                            let entry = MenuItem::with_id(id.as_str(), label, enabled, accelerator);
                            submenu.append(&entry)?;
                            items.insert(id.clone(), entry);
                        }
                    }
                }
                menu.append(&submenu)?;
            }
            Ok(Self { menu, items })
        }

        #[cfg(target_os = "macos")]
        pub fn attach(&self, _window: &Window) -> muda::Result<()> {
            self.menu.init_for_nsapp();
            log::info!("attached application menu bar");
            Ok(())
        }

        #[cfg(target_os = "windows")]
        pub fn attach(&self, window: &Window) -> muda::Result<()> {
            use raw_window_handle::{HasWindowHandle, RawWindowHandle};

            if let Ok(handle) = window.window_handle() {
                if let RawWindowHandle::Win32(win32) = handle.as_raw() {
                    // SAFETY: the handle belongs to a window that outlives the menu
                    unsafe { self.menu.init_for_hwnd(win32.hwnd.get() as _)? };
                    log::info!("attached window menu bar");
                }
            }
            Ok(())
        }

        pub fn set_enabled(&self, id: &str, enabled: bool) {
            if let Some(item) = self.items.get(id) {
                item.set_enabled(enabled);
            }
        }
    }

    pub fn drain() -> Vec<String> {
        let receiver = muda::MenuEvent::receiver();
        let mut ids = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            ids.push(event.id.0);
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttk_core::{Menu, MenuItem};

    fn bar() -> MenuBar {
        MenuBar {
            menus: vec![Menu {
                id: "file".into(),
                label: "File".into(),
                items: vec![
                    MenuItem::entry("open", "Open"),
                    MenuItem::separator(),
                    MenuItem::entry("save", "Save"),
                ],
            }],
        }
    }

    #[test]
    fn test_install_without_window_keeps_state() {
        let mut menu = NativeMenu::new();
        menu.install(&bar(), None);
        assert_eq!(menu.state().len(), 2);
        assert!(menu.set_enabled("save", false));
        assert_eq!(menu.state().is_enabled("save"), Some(false));
        assert!(!menu.set_enabled("quit", false));
    }

    #[test]
    fn test_disabled_items_do_not_fire() {
        let mut menu = NativeMenu::new();
        menu.install(&bar(), None);
        menu.set_enabled("save", false);
        let fired = menu.filter_enabled(vec!["open".into(), "save".into(), "ghost".into()]);
        assert_eq!(
            fired,
            vec![MenuEvent {
                item_id: "open".into()
            }]
        );
    }
}
