//! Serializable drawing commands
//!
//! Every drawing call of [`Renderer`] has a command form that can be written
//! to JSON, read back and replayed against any backend. This is how drawing
//! sequences are recorded for debugging and replayed in tests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::color::TextAttribute;
use crate::error::Result;
use crate::renderer::Renderer;

type RgbTriple = (i32, i32, i32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command_type", rename_all = "snake_case")]
pub enum Command {
    DrawText {
        row: i32,
        col: i32,
        text: String,
        #[serde(default)]
        color_pair: i32,
        /// Raw attribute bits (BOLD = 1, UNDERLINE = 2, REVERSE = 4)
        #[serde(default)]
        attributes: u8,
    },
    DrawHline {
        row: i32,
        col: i32,
        char: char,
        length: i32,
        #[serde(default)]
        color_pair: i32,
    },
    DrawVline {
        row: i32,
        col: i32,
        char: char,
        length: i32,
        #[serde(default)]
        color_pair: i32,
    },
    DrawRect {
        row: i32,
        col: i32,
        height: i32,
        width: i32,
        #[serde(default)]
        color_pair: i32,
        #[serde(default)]
        filled: bool,
    },
    Clear,
    ClearRegion {
        row: i32,
        col: i32,
        height: i32,
        width: i32,
    },
    Refresh,
    RefreshRegion {
        row: i32,
        col: i32,
        height: i32,
        width: i32,
    },
    InitColorPair {
        pair_id: i32,
        fg_color: RgbTriple,
        bg_color: RgbTriple,
    },
    SetCursorVisibility {
        visible: bool,
    },
    MoveCursor {
        row: i32,
        col: i32,
    },
}

impl Command {
    pub fn draw_text(row: i32, col: i32, text: &str, color_pair: i32, attrs: TextAttribute) -> Self {
        Command::DrawText {
            row,
            col,
            text: text.to_string(),
            color_pair,
            attributes: attrs.bits(),
        }
    }

    /// The `command_type` tag
    pub fn name(&self) -> &'static str {
        match self {
            Command::DrawText { .. } => "draw_text",
            Command::DrawHline { .. } => "draw_hline",
            Command::DrawVline { .. } => "draw_vline",
            Command::DrawRect { .. } => "draw_rect",
            Command::Clear => "clear",
            Command::ClearRegion { .. } => "clear_region",
            Command::Refresh => "refresh",
            Command::RefreshRegion { .. } => "refresh_region",
            Command::InitColorPair { .. } => "init_color_pair",
            Command::SetCursorVisibility { .. } => "set_cursor_visibility",
            Command::MoveCursor { .. } => "move_cursor",
        }
    }

    /// Replay the command against a renderer
    pub fn apply(&self, renderer: &mut dyn Renderer) -> Result<()> {
        match self {
            Command::DrawText {
                row,
                col,
                text,
                color_pair,
                attributes,
            } => renderer.draw_text(
                *row,
                *col,
                text,
                *color_pair,
                TextAttribute::from_bits_truncate(*attributes),
            ),
            Command::DrawHline {
                row,
                col,
                char,
                length,
                color_pair,
            } => renderer.draw_hline(*row, *col, *char, *length, *color_pair),
            Command::DrawVline {
                row,
                col,
                char,
                length,
                color_pair,
            } => renderer.draw_vline(*row, *col, *char, *length, *color_pair),
            Command::DrawRect {
                row,
                col,
                height,
                width,
                color_pair,
                filled,
            } => renderer.draw_rect(*row, *col, *height, *width, *color_pair, *filled),
            Command::Clear => renderer.clear(),
            Command::ClearRegion {
                row,
                col,
                height,
                width,
            } => renderer.clear_region(*row, *col, *height, *width),
            Command::Refresh => renderer.refresh(),
            Command::RefreshRegion {
                row,
                col,
                height,
                width,
            } => renderer.refresh_region(*row, *col, *height, *width),
            Command::InitColorPair {
                pair_id,
                fg_color,
                bg_color,
            } => renderer.init_color_pair(*pair_id, *fg_color, *bg_color),
            Command::SetCursorVisibility { visible } => {
                renderer.set_cursor_visibility(*visible);
                Ok(())
            }
            Command::MoveCursor { row, col } => {
                renderer.move_cursor(*row, *col);
                Ok(())
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Human-readable form: the command name, then one sorted `key: value` line per parameter
    pub fn pretty(&self) -> String {
        self.pretty_indented(0)
    }

    pub fn pretty_indented(&self, indent: usize) -> String {
        let pad = " ".repeat(indent);
        let mut out = format!("{}{}:", pad, self.name());
        if let Ok(Value::Object(fields)) = serde_json::to_value(self) {
            let mut keys: Vec<&String> = fields.keys().filter(|k| *k != "command_type").collect();
            keys.sort();
            for key in keys {
                out.push('\n');
                out.push_str(&format!("{}  {}: {}", pad, key, format_value(&fields[key.as_str()])));
            }
        }
        out
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(format_value).collect();
            format!("({})", parts.join(", "))
        }
        other => other.to_string(),
    }
}

/// Parse a JSON array of commands
pub fn parse_commands(json: &str) -> Result<Vec<Command>> {
    Ok(serde_json::from_str(json)?)
}

/// Replay a command list, stopping at the first failing command
pub fn replay(commands: &[Command], renderer: &mut dyn Renderer) -> Result<()> {
    for (index, command) in commands.iter().enumerate() {
        command.apply(renderer).map_err(|err| {
            log::warn!("command {} ({}) failed: {}", index, command.name(), err);
            err
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::headless::HeadlessRenderer;

    #[test]
    fn test_draw_text_json_shape() {
        let cmd = Command::draw_text(5, 10, "Hello", 1, TextAttribute::BOLD | TextAttribute::UNDERLINE);
        let value: Value = serde_json::from_str(&cmd.to_json().unwrap()).unwrap();
        assert_eq!(value["command_type"], "draw_text");
        assert_eq!(value["attributes"], 3);
        assert_eq!(value["text"], "Hello");
    }

    #[test]
    fn test_optional_fields_default() {
        let cmd = Command::from_json(r#"{"command_type":"draw_rect","row":1,"col":2,"height":3,"width":4}"#)
            .unwrap();
        assert_eq!(
            cmd,
            Command::DrawRect {
                row: 1,
                col: 2,
                height: 3,
                width: 4,
                color_pair: 0,
                filled: false,
            }
        );
    }

    #[test]
    fn test_unknown_or_incomplete_commands_rejected() {
        assert!(Command::from_json(r#"{"command_type":"explode"}"#).is_err());
        assert!(Command::from_json(r#"{"command_type":"draw_text","row":1}"#).is_err());
        assert!(Command::from_json(r#"{"row":1,"col":1,"text":"x"}"#).is_err());
        assert!(Command::from_json(
            r#"{"command_type":"init_color_pair","pair_id":1,"fg_color":[1,2],"bg_color":[0,0,0]}"#
        )
        .is_err());
    }

    #[test]
    fn test_pretty_format() {
        let cmd = Command::InitColorPair {
            pair_id: 1,
            fg_color: (255, 0, 0),
            bg_color: (0, 0, 0),
        };
        assert_eq!(
            cmd.pretty(),
            "init_color_pair:\n  bg_color: (0, 0, 0)\n  fg_color: (255, 0, 0)\n  pair_id: 1"
        );

        let cmd = Command::SetCursorVisibility { visible: true };
        assert_eq!(cmd.pretty_indented(2), "  set_cursor_visibility:\n    visible: true");

        assert_eq!(Command::Clear.pretty(), "clear:");

        let cmd = Command::draw_text(0, 0, "Hi", 0, TextAttribute::NORMAL);
        assert!(cmd.pretty().contains("  text: \"Hi\""));
    }

    #[test]
    fn test_replay_draws_on_renderer() {
        let json = r#"[
            {"command_type": "init_color_pair", "pair_id": 1, "fg_color": [255, 255, 255], "bg_color": [0, 0, 255]},
            {"command_type": "draw_text", "row": 0, "col": 0, "text": "Hello", "color_pair": 1},
            {"command_type": "draw_rect", "row": 2, "col": 0, "height": 3, "width": 4, "color_pair": 1},
            {"command_type": "move_cursor", "row": 1, "col": 1},
            {"command_type": "refresh"}
        ]"#;
        let commands = parse_commands(json).unwrap();
        assert_eq!(commands.len(), 5);

        let mut renderer = HeadlessRenderer::with_size(10, 20);
        renderer.initialize().unwrap();
        replay(&commands, &mut renderer).unwrap();

        let text = renderer.snapshot().screen_text();
        assert!(text.starts_with("Hello"));
        assert_eq!(renderer.cell_at(2, 0).unwrap().ch, '┌');
        assert_eq!(renderer.cursor().row, 1);
        assert_eq!(renderer.refresh_count(), 1);
    }

    #[test]
    fn test_replay_stops_on_error() {
        let commands = vec![
            Command::draw_text(0, 0, "x", 999, TextAttribute::NORMAL),
            Command::Refresh,
        ];
        let mut renderer = HeadlessRenderer::with_size(2, 2);
        renderer.initialize().unwrap();
        assert!(matches!(
            replay(&commands, &mut renderer),
            Err(Error::InvalidColorPair(999))
        ));
        assert_eq!(renderer.refresh_count(), 0);
    }
}
