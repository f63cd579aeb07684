//! Renderer contract checks
//!
//! Each scenario takes `&mut dyn Renderer` so it can be run against any
//! backend that initializes without a display. Here that is the headless
//! renderer; lifecycle checks also run on every compiled backend.

use proptest::prelude::*;
use ttk::{
    box_chars, create_renderer, BackendKind, Cell, Error, HeadlessRenderer, InitOptions,
    LifecycleState, Renderer, TextAttribute,
};

fn running(rows: usize, cols: usize) -> HeadlessRenderer {
    let mut renderer = HeadlessRenderer::with_size(rows, cols);
    renderer.initialize().unwrap();
    renderer
}

fn hello_scenario(r: &mut dyn Renderer) {
    r.init_color_pair(1, (255, 255, 0), (0, 0, 128)).unwrap();
    r.draw_text(0, 0, "Hello", 1, TextAttribute::NORMAL).unwrap();
    r.refresh().unwrap();

    for (col, ch) in "Hello".chars().enumerate() {
        assert_eq!(
            r.cell_at(0, col),
            Some(Cell::new(ch, 1, TextAttribute::NORMAL)),
            "cell (0, {})",
            col
        );
    }
    assert_eq!(r.cell_at(0, 5), Some(Cell::BLANK));
}

fn rect_scenario(r: &mut dyn Renderer) {
    r.draw_text(6, 11, "inside", 0, TextAttribute::NORMAL).unwrap();
    r.draw_rect(5, 10, 3, 20, 2, false).unwrap();
    r.refresh().unwrap();

    let r: &dyn Renderer = r;
    let at = |row: usize, col: usize| r.cell_at(row, col).map(|c| c.ch);
    assert_eq!(at(5, 10), Some(box_chars::TOP_LEFT));
    assert_eq!(at(5, 29), Some(box_chars::TOP_RIGHT));
    assert_eq!(at(7, 10), Some(box_chars::BOTTOM_LEFT));
    assert_eq!(at(7, 29), Some(box_chars::BOTTOM_RIGHT));
    for col in 11..29 {
        assert_eq!(at(5, col), Some(box_chars::HORIZONTAL));
        assert_eq!(at(7, col), Some(box_chars::HORIZONTAL));
    }
    assert_eq!(at(6, 10), Some(box_chars::VERTICAL));
    assert_eq!(at(6, 29), Some(box_chars::VERTICAL));
    // Interior untouched
    assert_eq!(at(6, 11), Some('i'));
    assert_eq!(at(6, 20), Some(' '));
    // Outside untouched
    assert_eq!(at(4, 10), Some(' '));
    assert_eq!(at(6, 30), Some(' '));
}

#[test]
fn test_hello_scenario() {
    let mut renderer = running(24, 80);
    hello_scenario(&mut renderer);
    assert_eq!(renderer.snapshot().screen[0].text, "Hello");
}

#[test]
fn test_rect_outline_scenario() {
    let mut renderer = running(24, 80);
    rect_scenario(&mut renderer);
}

#[test]
fn test_clear_blanks_everything() {
    let mut renderer = running(10, 20);
    renderer.init_color_pair(3, (1, 2, 3), (4, 5, 6)).unwrap();
    renderer.draw_rect(0, 0, 10, 20, 3, true).unwrap();
    renderer.draw_text(2, 2, "text", 3, TextAttribute::BOLD | TextAttribute::REVERSE).unwrap();
    renderer.clear().unwrap();
    for row in 0..10 {
        for col in 0..20 {
            assert_eq!(renderer.cell_at(row, col), Some(Cell::BLANK));
        }
    }
}

#[test]
fn test_color_pair_validation() {
    let mut renderer = running(5, 5);
    for id in [0, -1, 256] {
        assert!(matches!(
            renderer.init_color_pair(id, (0, 0, 0), (0, 0, 0)),
            Err(Error::InvalidColorPair(_))
        ));
    }
    assert!(matches!(
        renderer.init_color_pair(1, (0, 256, 0), (0, 0, 0)),
        Err(Error::InvalidRgb { .. })
    ));
    renderer.init_color_pair(1, (1, 1, 1), (0, 0, 0)).unwrap();
    renderer.init_color_pair(1, (2, 2, 2), (0, 0, 0)).unwrap();
}

#[test]
fn test_color_pairs_require_running() {
    let options = InitOptions::default();
    for kind in BackendKind::ALL.into_iter().filter(|k| k.is_compiled()) {
        let mut renderer = create_renderer(kind, &options).unwrap();
        assert!(
            matches!(
                renderer.init_color_pair(1, (255, 255, 0), (0, 0, 128)),
                Err(Error::NotRunning(_))
            ),
            "{} before initialize",
            kind
        );
        // Bad arguments are reported as such in any state
        assert!(
            matches!(
                renderer.init_color_pair(0, (0, 0, 0), (0, 0, 0)),
                Err(Error::InvalidColorPair(0))
            ),
            "{}",
            kind
        );
    }

    let mut headless = HeadlessRenderer::with_size(5, 5);
    assert!(matches!(
        headless.init_color_pair(1, (255, 255, 0), (0, 0, 128)),
        Err(Error::NotRunning(_))
    ));
    headless.initialize().unwrap();
    headless.init_color_pair(1, (255, 255, 0), (0, 0, 128)).unwrap();
    headless.shutdown();
    assert!(matches!(
        headless.init_color_pair(1, (255, 255, 0), (0, 0, 128)),
        Err(Error::NotRunning(_))
    ));
}

#[test]
fn test_negative_sizes_are_rejected() {
    let mut renderer = running(5, 5);
    assert!(matches!(
        renderer.clear_region(0, 0, -1, 3),
        Err(Error::InvalidDimensions { .. })
    ));
    assert!(renderer.draw_hline(0, 0, '-', -2, 0).is_err());
    assert!(renderer.clear_region(-10, -10, 100, 100).is_ok());
}

#[test]
fn test_double_shutdown_on_every_backend() {
    let options = InitOptions::default();
    for kind in BackendKind::ALL.into_iter().filter(|k| k.is_compiled()) {
        let mut renderer = create_renderer(kind, &options).unwrap();
        renderer.shutdown();
        renderer.shutdown();
        assert_eq!(renderer.get_dimensions(), (0, 0), "{}", kind);
        assert_ne!(renderer.state(), LifecycleState::Running);
    }

    let mut headless = running(24, 80);
    headless.shutdown();
    headless.shutdown();
    assert_eq!(headless.state(), LifecycleState::Shutdown);
    assert_eq!(headless.get_dimensions(), (0, 0));
}

#[test]
fn test_clipboard_without_support_is_empty() {
    let mut terminal = create_renderer(BackendKind::Terminal, &InitOptions::default()).unwrap();
    assert!(!terminal.supports_clipboard());
    assert!(!terminal.set_clipboard_text("ignored"));
    assert_eq!(terminal.get_clipboard_text(), "");
    assert_eq!(terminal.get_clipboard_text(), "");
}

#[test]
fn test_capabilities_have_no_side_effects() {
    let terminal = create_renderer(BackendKind::Terminal, &InitOptions::default()).unwrap();
    assert!(terminal.supports_mouse());
    assert!(!terminal.supports_drag_and_drop());
    assert!(!terminal.is_desktop_mode());
    assert_eq!(terminal.state(), LifecycleState::Uninitialized);
}

proptest! {
    #[test]
    fn prop_out_of_bounds_draws_never_touch_the_grid(
        row in -50i32..50,
        col in -100i32..100,
        text in "[a-z]{1,8}",
    ) {
        let mut renderer = running(10, 20);
        let in_bounds = |r: i32, c: i32| (0..10).contains(&r) && (0..20).contains(&c);
        renderer.draw_text(row, col, &text, 0, TextAttribute::NORMAL).unwrap();
        renderer.refresh().unwrap();

        for r in 0..10i32 {
            for c in 0..20i32 {
                let cell = renderer.cell_at(r as usize, c as usize).unwrap();
                let offset = c - col;
                let written = r == row && offset >= 0 && (offset as usize) < text.len();
                if written && in_bounds(r, c) {
                    prop_assert_eq!(Some(cell.ch), text.chars().nth(offset as usize));
                } else {
                    prop_assert_eq!(cell, Cell::BLANK);
                }
            }
        }
    }
}
