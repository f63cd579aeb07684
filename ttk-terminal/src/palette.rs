//! RGB to terminal color resolution

use std::collections::HashMap;

use crossterm::style::Color;
use ttk_core::color::{nearest_xterm_index, BasicColor};
use ttk_core::Rgb;

/// Color capability of the attached terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorMode {
    /// 24-bit RGB escapes
    TrueColor,
    /// xterm 256-color palette
    Indexed256,
    /// The eight ANSI colors
    Basic,
}

impl ColorMode {
    /// Detect from `COLORTERM` and `TERM`
    pub fn detect() -> Self {
        let colorterm = std::env::var("COLORTERM").ok();
        let term = std::env::var("TERM").ok();
        Self::from_env(colorterm.as_deref(), term.as_deref())
    }

    pub fn from_env(colorterm: Option<&str>, term: Option<&str>) -> Self {
        if matches!(colorterm, Some("truecolor") | Some("24bit")) {
            ColorMode::TrueColor
        } else if term.map_or(false, |t| t.contains("256color")) {
            ColorMode::Indexed256
        } else {
            ColorMode::Basic
        }
    }

    pub fn is_full(self) -> bool {
        self != ColorMode::Basic
    }
}

/// Resolves and caches terminal colors for RGB values
#[derive(Debug)]
pub struct Palette {
    detected: ColorMode,
    fullcolor: bool,
    cache: HashMap<Rgb, Color>,
}

impl Palette {
    pub fn new(detected: ColorMode) -> Self {
        Self {
            detected,
            fullcolor: detected.is_full(),
            cache: HashMap::new(),
        }
    }

    /// The mode colors are currently resolved in
    pub fn mode(&self) -> ColorMode {
        match (self.fullcolor, self.detected) {
            (false, _) => ColorMode::Basic,
            // Forced on for a terminal that did not advertise rich color
            (true, ColorMode::Basic) => ColorMode::Indexed256,
            (true, detected) => detected,
        }
    }

    pub fn is_fullcolor(&self) -> bool {
        self.fullcolor
    }

    /// Returns true when the mode changed
    pub fn set_fullcolor(&mut self, enabled: bool) -> bool {
        if self.fullcolor == enabled {
            return false;
        }
        self.fullcolor = enabled;
        self.cache.clear();
        true
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn resolve(&mut self, rgb: Rgb) -> Color {
        let mode = self.mode();
        *self.cache.entry(rgb).or_insert_with(|| match mode {
            ColorMode::TrueColor => Color::Rgb {
                r: rgb.r,
                g: rgb.g,
                b: rgb.b,
            },
            ColorMode::Indexed256 => Color::AnsiValue(nearest_xterm_index(rgb)),
            ColorMode::Basic => basic(BasicColor::approximate(rgb)),
        })
    }
}

fn basic(color: BasicColor) -> Color {
    match color {
        BasicColor::Black => Color::Black,
        BasicColor::Red => Color::DarkRed,
        BasicColor::Green => Color::DarkGreen,
        BasicColor::Yellow => Color::DarkYellow,
        BasicColor::Blue => Color::DarkBlue,
        BasicColor::Magenta => Color::DarkMagenta,
        BasicColor::Cyan => Color::DarkCyan,
        BasicColor::White => Color::Grey,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_mode() {
        assert_eq!(ColorMode::from_env(Some("truecolor"), Some("xterm")), ColorMode::TrueColor);
        assert_eq!(ColorMode::from_env(Some("24bit"), None), ColorMode::TrueColor);
        assert_eq!(
            ColorMode::from_env(None, Some("xterm-256color")),
            ColorMode::Indexed256
        );
        assert_eq!(ColorMode::from_env(None, Some("vt100")), ColorMode::Basic);
        assert_eq!(ColorMode::from_env(None, None), ColorMode::Basic);
    }

    #[test]
    fn test_resolve_per_mode() {
        let red = Rgb::new(255, 0, 0);

        let mut palette = Palette::new(ColorMode::TrueColor);
        assert_eq!(palette.resolve(red), Color::Rgb { r: 255, g: 0, b: 0 });

        let mut palette = Palette::new(ColorMode::Indexed256);
        assert_eq!(palette.resolve(red), Color::AnsiValue(196));

        let mut palette = Palette::new(ColorMode::Basic);
        assert_eq!(palette.resolve(red), Color::DarkRed);
        assert_eq!(palette.resolve(Rgb::new(10, 10, 10)), Color::Black);
    }

    #[test]
    fn test_fullcolor_toggle_clears_cache() {
        let mut palette = Palette::new(ColorMode::TrueColor);
        palette.resolve(Rgb::new(1, 2, 3));
        assert_eq!(palette.cached(), 1);

        assert!(palette.set_fullcolor(false));
        assert_eq!(palette.mode(), ColorMode::Basic);
        assert_eq!(palette.cached(), 0);
        assert!(!palette.set_fullcolor(false));

        let mut basic = Palette::new(ColorMode::Basic);
        assert!(!basic.is_fullcolor());
        basic.set_fullcolor(true);
        assert_eq!(basic.mode(), ColorMode::Indexed256);
    }
}
