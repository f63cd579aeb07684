//! TTK demo
//!
//! Opens the configured backend (falling back from GPU to CPU to terminal),
//! draws a small screen and echoes every event it receives.

use std::error::Error;

use clap::Parser;
use ttk::config::{CliArgs, Config};
use ttk::{
    initialize_with_fallback, BackendKind, CharEvent, EventCallback, KeyCode, KeyEvent,
    Menu, MenuBar, MenuEvent, MenuItem, MouseEvent, Renderer, SystemEvent, TerminalRenderer,
    TextAttribute,
};

const TITLE_PAIR: i32 = 1;
const FRAME_PAIR: i32 = 2;
const STATUS_PAIR: i32 = 3;

struct Demo {
    last_event: String,
    clipboard_note: String,
    quit: bool,
}

impl Demo {
    fn new() -> Self {
        Self {
            last_event: "none yet".to_string(),
            clipboard_note: String::new(),
            quit: false,
        }
    }

    fn draw(&self, r: &mut dyn Renderer) -> ttk::Result<()> {
        let (rows, cols) = r.get_dimensions();
        let (rows, cols) = (rows as i32, cols as i32);
        r.clear()?;
        r.draw_text(0, 0, &" ".repeat(cols as usize), TITLE_PAIR, TextAttribute::NORMAL)?;
        r.draw_text(
            0,
            1,
            &format!("TTK demo on the {} backend ({}x{})", r.backend_name(), rows, cols),
            TITLE_PAIR,
            TextAttribute::BOLD,
        )?;
        r.draw_rect(2, 2, (rows - 5).max(0), (cols - 4).max(0), FRAME_PAIR, false)?;
        r.draw_text(3, 4, "Hello", 0, TextAttribute::NORMAL)?;
        r.draw_text(3, 10, "underlined", 0, TextAttribute::UNDERLINE)?;
        r.draw_text(3, 21, "reverse", 0, TextAttribute::REVERSE)?;

        let mut line = 5;
        let mut help = vec!["q / Esc: quit", "c: copy greeting", "v: paste"];
        if r.supports_drag_and_drop() {
            help.push("d: drag a file out of the window");
        }
        for text in help {
            r.draw_text(line, 4, text, 0, TextAttribute::NORMAL)?;
            line += 1;
        }
        if !self.clipboard_note.is_empty() {
            r.draw_text(line + 1, 4, &self.clipboard_note, 0, TextAttribute::NORMAL)?;
        }

        r.draw_text(rows - 1, 0, &" ".repeat(cols as usize), STATUS_PAIR, TextAttribute::NORMAL)?;
        r.draw_text(rows - 1, 1, &format!("last event: {}", self.last_event), STATUS_PAIR, TextAttribute::NORMAL)?;
        r.refresh()
    }

    fn redraw(&self, r: &mut dyn Renderer) {
        if let Err(e) = self.draw(r) {
            log::error!("draw failed: {}", e);
        }
    }

    fn command(&mut self, key: char, r: &mut dyn Renderer) -> bool {
        match key {
            'q' => self.quit = true,
            'c' => {
                self.clipboard_note = if r.set_clipboard_text("Hello from TTK") {
                    "copied greeting".to_string()
                } else {
                    "clipboard unavailable".to_string()
                };
            }
            'v' => {
                let text = r.get_clipboard_text();
                self.clipboard_note = format!("clipboard: {:?}", text.chars().take(40).collect::<String>());
            }
            'd' => {
                let path = std::env::temp_dir().join("ttk-demo.txt");
                let url = format!("file://{}", path.display());
                if r.start_drag_session(&[url], "ttk-demo.txt") {
                    self.clipboard_note = "dragging; release outside the window to drop".to_string();
                }
            }
            _ => return false,
        }
        true
    }
}

impl EventCallback for Demo {
    fn on_key_event(&mut self, event: &KeyEvent, r: &mut dyn Renderer) -> bool {
        self.last_event = format!("key {:?} {:?}", event.key_code, event.modifiers);
        let handled = if event.key_code == KeyCode::ESCAPE {
            self.quit = true;
            true
        } else {
            event.char.map_or(false, |ch| self.command(ch, r))
        };
        self.redraw(r);
        handled
    }

    fn on_char_event(&mut self, event: &CharEvent, r: &mut dyn Renderer) -> bool {
        self.last_event = format!("char {:?}", event.ch);
        self.redraw(r);
        true
    }

    fn on_system_event(&mut self, event: &SystemEvent, r: &mut dyn Renderer) -> bool {
        self.last_event = format!("system {:?}", event.kind);
        if event.is_close() {
            self.quit = true;
            return true;
        }
        self.redraw(r);
        true
    }

    fn on_mouse_event(&mut self, event: &MouseEvent, r: &mut dyn Renderer) -> bool {
        self.last_event = format!(
            "mouse {:?} {:?} at {},{}",
            event.kind, event.button, event.row, event.col
        );
        self.redraw(r);
        true
    }

    fn on_menu_event(&mut self, event: &MenuEvent, r: &mut dyn Renderer) -> bool {
        self.last_event = format!("menu {}", event.item_id);
        let handled = match event.item_id.as_str() {
            "quit" => self.command('q', r),
            "copy" => self.command('c', r),
            "paste" => self.command('v', r),
            _ => false,
        };
        self.redraw(r);
        handled
    }

    fn on_menu_will_open(&mut self, r: &mut dyn Renderer) {
        let clipboard = r.supports_clipboard();
        r.update_menu_item_state("paste", clipboard);
    }

    fn should_close(&self) -> bool {
        self.quit
    }
}

fn menu_bar() -> MenuBar {
    let mut quit = MenuItem::entry("quit", "Quit");
    if let MenuItem::Entry { shortcut, .. } = &mut quit {
        *shortcut = Some("CmdOrCtrl+Q".to_string());
    }
    MenuBar {
        menus: vec![
            Menu {
                id: "file".into(),
                label: "File".into(),
                items: vec![quit],
            },
            Menu {
                id: "edit".into(),
                label: "Edit".into(),
                items: vec![
                    MenuItem::entry("copy", "Copy"),
                    MenuItem::separator(),
                    MenuItem::entry("paste", "Paste"),
                ],
            },
        ],
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = CliArgs::parse();
    let config = match Config::load_with_args(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let preferred = config.backend.resolve();
    log::debug!("preferred backend: {}", preferred);
    let options = config.init_options();

    let mut renderer = initialize_with_fallback(preferred, |kind| match kind {
        BackendKind::Terminal => {
            let mut terminal = TerminalRenderer::new(&options);
            terminal.set_fullcolor_mode(config.fullcolor);
            Ok(Box::new(terminal) as Box<dyn Renderer>)
        }
        other => ttk::create_renderer(other, &options),
    })?;

    renderer.init_color_pair(TITLE_PAIR, (255, 255, 255), (40, 70, 160))?;
    renderer.init_color_pair(FRAME_PAIR, (120, 200, 255), (0, 0, 0))?;
    renderer.init_color_pair(STATUS_PAIR, (0, 0, 0), (200, 200, 200))?;
    renderer.set_menu_bar(&menu_bar())?;
    if config.mouse && !renderer.enable_mouse_events() {
        log::info!("mouse reporting unavailable");
    }

    let demo = Demo::new();
    demo.draw(renderer.as_mut())?;
    renderer.set_event_callback(Some(Box::new(demo)));

    let result = renderer.run_event_loop();
    renderer.shutdown();
    result?;
    log::debug!("demo exited");
    Ok(())
}
