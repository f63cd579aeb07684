//! Colors, text attributes and the color pair table
//!
//! Clients never pass RGB at draw time. They register a pair id once and
//! refer to it from every drawing call:
//! - id 0: reserved, white on black
//! - ids 1-255: client-assigned, re-registration overwrites

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Highest color pair id a client may register
pub const MAX_COLOR_PAIR: i32 = 255;

/// 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from unchecked components, rejecting anything outside 0-255
    pub fn validated(r: i32, g: i32, b: i32) -> Result<Self> {
        let check = |channel: &'static str, value: i32| {
            u8::try_from(value).map_err(|_| Error::InvalidRgb { channel, value })
        };
        Ok(Self {
            r: check("red", r)?,
            g: check("green", g)?,
            b: check("blue", b)?,
        })
    }

    /// Parse `#rrggbb` or `rrggbb`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Components scaled to 0.0-1.0
    pub fn normalized(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }

    /// Packed as 0x00RRGGBB
    pub fn packed(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | (self.b as u32)
    }

    pub fn tuple(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    fn distance_sq(self, other: Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Rgb::new(r, g, b)
    }
}

bitflags! {
    /// Text attributes, combinable with `|`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TextAttribute: u8 {
        const BOLD = 1;
        const UNDERLINE = 2;
        const REVERSE = 4;
    }
}

impl TextAttribute {
    pub const NORMAL: TextAttribute = TextAttribute::empty();
}

/// Foreground and background of a registered pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPair {
    pub fg: Rgb,
    pub bg: Rgb,
}

impl ColorPair {
    pub const DEFAULT: ColorPair = ColorPair {
        fg: Rgb::WHITE,
        bg: Rgb::BLACK,
    };

    /// Check a registration for pair `id` without storing it
    pub fn validated(id: i32, fg: (i32, i32, i32), bg: (i32, i32, i32)) -> Result<Self> {
        if !(1..=MAX_COLOR_PAIR).contains(&id) {
            return Err(Error::InvalidColorPair(id));
        }
        Ok(ColorPair {
            fg: Rgb::validated(fg.0, fg.1, fg.2)?,
            bg: Rgb::validated(bg.0, bg.1, bg.2)?,
        })
    }
}

impl Default for ColorPair {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Check a color pair id used at draw time (0 allowed)
pub fn check_pair_id(id: i32) -> Result<u8> {
    u8::try_from(id).map_err(|_| Error::InvalidColorPair(id))
}

/// Mapping from pair id to colors
#[derive(Debug, Clone)]
pub struct ColorPairTable {
    pairs: Vec<Option<ColorPair>>,
}

impl Default for ColorPairTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorPairTable {
    pub fn new() -> Self {
        let mut pairs = vec![None; 256];
        pairs[0] = Some(ColorPair::DEFAULT);
        Self { pairs }
    }

    /// Register or replace a pair
    ///
    /// Rejects id 0, ids outside 1-255 and components outside 0-255.
    pub fn register(&mut self, id: i32, fg: (i32, i32, i32), bg: (i32, i32, i32)) -> Result<ColorPair> {
        let pair = ColorPair::validated(id, fg, bg)?;
        self.pairs[id as usize] = Some(pair);
        Ok(pair)
    }

    pub fn get(&self, id: u8) -> Option<ColorPair> {
        self.pairs[id as usize]
    }

    pub fn is_registered(&self, id: u8) -> bool {
        id != 0 && self.pairs[id as usize].is_some()
    }

    /// Colors for a pair, falling back to pair 0 for unregistered ids
    pub fn lookup(&self, id: u8) -> ColorPair {
        self.pairs[id as usize].unwrap_or(ColorPair::DEFAULT)
    }

    /// Colors to draw with once attributes are applied
    ///
    /// Reverse video swaps foreground and background here, at draw time.
    pub fn resolve(&self, id: u8, attrs: TextAttribute) -> (Rgb, Rgb) {
        let pair = self.lookup(id);
        if attrs.contains(TextAttribute::REVERSE) {
            (pair.bg, pair.fg)
        } else {
            (pair.fg, pair.bg)
        }
    }

    /// Registered ids with their colors, ascending
    pub fn iter(&self) -> impl Iterator<Item = (u8, ColorPair)> + '_ {
        self.pairs
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(id, pair)| pair.map(|p| (id as u8, p)))
    }
}

/// Convert a 256-color index to RGB using the xterm palette
pub fn xterm_index_to_rgb(index: u8) -> Rgb {
    let (r, g, b) = match index {
        0 => (0, 0, 0),
        1 => (205, 0, 0),
        2 => (0, 205, 0),
        3 => (205, 205, 0),
        4 => (0, 0, 238),
        5 => (205, 0, 205),
        6 => (0, 205, 205),
        7 => (229, 229, 229),
        8 => (127, 127, 127),
        9 => (255, 0, 0),
        10 => (0, 255, 0),
        11 => (255, 255, 0),
        12 => (92, 92, 255),
        13 => (255, 0, 255),
        14 => (0, 255, 255),
        15 => (255, 255, 255),
        // 6x6x6 color cube
        16..=231 => {
            let idx = index - 16;
            let to_val = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            (to_val(idx / 36), to_val((idx % 36) / 6), to_val(idx % 6))
        }
        // Grayscale ramp
        232..=255 => {
            let gray = 8 + (index - 232) * 10;
            (gray, gray, gray)
        }
    };
    Rgb::new(r, g, b)
}

/// Nearest entry of the xterm cube or grayscale ramp (indices 16-255)
///
/// The first 16 entries are skipped because terminals commonly theme them.
pub fn nearest_xterm_index(color: Rgb) -> u8 {
    let cube_level = |v: u8| -> u8 {
        if v < 48 {
            0
        } else if v < 115 {
            1
        } else {
            ((v - 35) / 40).min(5)
        }
    };
    let (ri, gi, bi) = (cube_level(color.r), cube_level(color.g), cube_level(color.b));
    let cube = 16 + 36 * ri + 6 * gi + bi;

    let avg = ((color.r as u16 + color.g as u16 + color.b as u16) / 3) as u8;
    let gray = if avg < 8 {
        232
    } else {
        232 + ((avg - 8) / 10).min(23)
    };

    if color.distance_sq(xterm_index_to_rgb(gray)) < color.distance_sq(xterm_index_to_rgb(cube)) {
        gray
    } else {
        cube
    }
}

/// The eight colors every terminal supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasicColor {
    Black = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
}

impl BasicColor {
    /// Closest basic color by brightness, saturation and dominant channel
    pub fn approximate(color: Rgb) -> BasicColor {
        let (r, g, b) = (color.r as i32, color.g as i32, color.b as i32);
        let brightness = (r + g + b) / 3;

        if brightness < 30 {
            return BasicColor::Black;
        }
        if brightness > 200 {
            return BasicColor::White;
        }

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        if max - min < 40 {
            return BasicColor::White;
        }

        if r > 180 && g > 180 && b < 150 {
            BasicColor::Yellow
        } else if g > r.max(b) + 50 {
            BasicColor::Green
        } else if b > r.max(g) + 30 {
            BasicColor::Blue
        } else if g > 180 && b > 180 && r < 100 {
            BasicColor::Cyan
        } else if r > 180 && b > 180 && g < 100 {
            BasicColor::Magenta
        } else if r > g.max(b) + 50 {
            BasicColor::Red
        } else if r > 180 && g > 180 {
            BasicColor::Yellow
        } else {
            BasicColor::White
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}
