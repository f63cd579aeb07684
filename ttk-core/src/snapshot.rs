//! Grid snapshot for testing and debugging
//!
//! Provides a serializable representation of what a backend would show.

use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::color::TextAttribute;
use crate::grid::Grid;

/// A complete snapshot of a canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub rows: usize,
    pub cols: usize,
    pub cursor: SnapshotCursor,
    /// Screen content (rows of text with attributes)
    pub screen: Vec<SnapshotLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotCursor {
    pub row: usize,
    pub col: usize,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotLine {
    /// Text content of the line, trailing blanks trimmed
    pub text: String,
    /// Runs of cells that are not default blank-styled
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<SnapshotSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSpan {
    pub start: usize,
    pub end: usize,
    pub color_pair: u8,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub underline: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub reverse: bool,
}

impl Snapshot {
    pub fn from_canvas(canvas: &Canvas) -> Self {
        let (rows, cols) = canvas.dimensions();
        Self {
            rows,
            cols,
            cursor: SnapshotCursor {
                row: canvas.cursor.row,
                col: canvas.cursor.col,
                visible: canvas.cursor.visible,
            },
            screen: lines(&canvas.grid),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Plain text of the screen, one line per row
    pub fn screen_text(&self) -> String {
        self.screen
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn lines(grid: &Grid) -> Vec<SnapshotLine> {
    (0..grid.rows())
        .map(|r| {
            let row = grid.row(r);
            let text: String = row.iter().map(|c| c.ch).collect();
            SnapshotLine {
                text: text.trim_end().to_string(),
                spans: spans(row),
            }
        })
        .collect()
}

/// Group consecutive cells with identical styling
fn spans(row: &[crate::cell::Cell]) -> Vec<SnapshotSpan> {
    let mut spans: Vec<SnapshotSpan> = Vec::new();
    for (col, cell) in row.iter().enumerate() {
        if cell.color_pair == 0 && cell.attrs.is_empty() {
            continue;
        }
        if let Some(last) = spans.last_mut() {
            if last.end == col
                && last.color_pair == cell.color_pair
                && last.bold == cell.attrs.contains(TextAttribute::BOLD)
                && last.underline == cell.attrs.contains(TextAttribute::UNDERLINE)
                && last.reverse == cell.attrs.contains(TextAttribute::REVERSE)
            {
                last.end = col + 1;
                continue;
            }
        }
        spans.push(SnapshotSpan {
            start: col,
            end: col + 1,
            color_pair: cell.color_pair,
            bold: cell.attrs.contains(TextAttribute::BOLD),
            underline: cell.attrs.contains(TextAttribute::UNDERLINE),
            reverse: cell.attrs.contains(TextAttribute::REVERSE),
        });
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_screen_text() {
        let mut canvas = Canvas::new(3, 10);
        canvas.draw_text(0, 0, "Hello", 0, TextAttribute::NORMAL).unwrap();
        canvas.draw_text(2, 2, "World", 0, TextAttribute::NORMAL).unwrap();

        let snapshot = Snapshot::from_canvas(&canvas);
        assert_eq!(snapshot.screen_text(), "Hello\n\n  World");
    }

    #[test]
    fn test_snapshot_spans() {
        let mut canvas = Canvas::new(1, 10);
        canvas.register_pair(3, (255, 0, 0), (0, 0, 0)).unwrap();
        canvas.draw_text(0, 1, "ab", 3, TextAttribute::BOLD).unwrap();
        canvas.draw_text(0, 3, "c", 3, TextAttribute::NORMAL).unwrap();

        let snapshot = Snapshot::from_canvas(&canvas);
        let spans = &snapshot.screen[0].spans;
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].start, spans[0].end, spans[0].bold), (1, 3, true));
        assert_eq!((spans[1].start, spans[1].end, spans[1].bold), (3, 4, false));
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let mut canvas = Canvas::new(2, 4);
        canvas.draw_text(1, 0, "ok", 0, TextAttribute::UNDERLINE).unwrap();
        let snapshot = Snapshot::from_canvas(&canvas);
        let json = snapshot.to_json().unwrap();
        assert_eq!(Snapshot::from_json(&json).unwrap(), snapshot);
    }
}
