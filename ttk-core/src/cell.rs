//! Character cell representation
//!
//! Each cell in the grid holds exactly one displayable character, the id of
//! the color pair it is drawn with and its text attributes.

use serde::{Deserialize, Serialize};

use crate::color::TextAttribute;

/// A single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub ch: char,
    pub color_pair: u8,
    pub attrs: TextAttribute,
}

impl Cell {
    /// Space drawn with pair 0 and no attributes
    pub const BLANK: Cell = Cell {
        ch: ' ',
        color_pair: 0,
        attrs: TextAttribute::NORMAL,
    };

    pub fn new(ch: char, color_pair: u8, attrs: TextAttribute) -> Self {
        Self {
            ch,
            color_pair,
            attrs,
        }
    }

    /// A blank cell that only contributes its background
    pub fn blank_with(color_pair: u8) -> Self {
        Self {
            color_pair,
            ..Self::BLANK
        }
    }

    /// Blank cell with default colors, safe to skip when painting over a default background
    pub fn is_default_blank(&self) -> bool {
        *self == Self::BLANK
    }

    /// The cell has a visible glyph on top of its background
    pub fn has_glyph(&self) -> bool {
        self.ch != ' ' && !self.ch.is_control()
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_cell() {
        let cell = Cell::default();
        assert_eq!(cell.ch, ' ');
        assert_eq!(cell.color_pair, 0);
        assert_eq!(cell.attrs, TextAttribute::NORMAL);
        assert!(cell.is_default_blank());
        assert!(!cell.has_glyph());
    }

    #[test]
    fn test_colored_blank_is_not_default() {
        let cell = Cell::blank_with(4);
        assert!(!cell.is_default_blank());
        assert!(!cell.has_glyph());

        let underlined = Cell::new(' ', 0, TextAttribute::UNDERLINE);
        assert!(!underlined.is_default_blank());
    }

    #[test]
    fn test_glyph_cell() {
        let cell = Cell::new('x', 1, TextAttribute::BOLD);
        assert!(cell.has_glyph());
        assert!(!cell.is_default_blank());
    }
}
