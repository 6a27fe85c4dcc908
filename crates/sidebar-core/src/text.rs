//! Text values handed to the engine and their per-viewer wire renderings.
//!
//! # The text layer (for beginners)
//!
//! Sidebar content comes from a text layer the engine does not own: plain
//! strings, strings with legacy `§` colour codes, or JSON chat components.
//! Before a packet is built, each [`Text`] is reduced for one viewer to a
//! [`WireText`] holding both encodings:
//!
//! - `json`: a JSON text component (`{"text":"Kills: 5","color":"gold"}`),
//!   used by 1.13+ clients (and converted to NBT for 1.20.3+).
//! - `legacy`: the same text with `§` codes (`§6Kills: 5`), used by older
//!   clients.
//!
//! The reduction goes through the [`TextRenderer`] trait so that a host can
//! plug in locale-aware or placeholder-expanding renderers.  The bundled
//! [`DefaultTextRenderer`] is viewer-independent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::objective::ViewerId;

// ── Text values ───────────────────────────────────────────────────────────────

/// A rich-text value as produced by the text layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Text {
    /// Text without any formatting codes.
    Plain(String),
    /// Text using legacy `§` formatting codes.
    Legacy(String),
    /// A serialized JSON text component.
    Json(String),
}

impl Text {
    pub fn plain(s: impl Into<String>) -> Self {
        Text::Plain(s.into())
    }

    pub fn legacy(s: impl Into<String>) -> Self {
        Text::Legacy(s.into())
    }

    pub fn json(s: impl Into<String>) -> Self {
        Text::Json(s.into())
    }

    /// The "empty" sentinel sent for rows that are currently hidden.
    pub fn empty() -> Self {
        Text::Plain(String::new())
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text::Plain(s.to_string())
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Text::Plain(s)
    }
}

/// A text value reduced for one viewer, ready for any protocol era.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireText {
    pub json: String,
    pub legacy: String,
}

impl WireText {
    pub fn new(json: impl Into<String>, legacy: impl Into<String>) -> Self {
        Self {
            json: json.into(),
            legacy: legacy.into(),
        }
    }

    /// Wraps a legacy string in a `{"text": ...}` component.
    pub fn from_legacy(legacy: impl Into<String>) -> Self {
        let legacy = legacy.into();
        Self {
            json: text_component(&legacy),
            legacy,
        }
    }

    /// Builds the legacy rendering from a JSON component.
    pub fn from_json(json: impl Into<String>) -> Self {
        let json = json.into();
        Self {
            legacy: json_to_legacy(&json),
            json,
        }
    }

    pub fn empty() -> Self {
        Self::from_legacy("")
    }
}

// ── Renderer seam ─────────────────────────────────────────────────────────────

/// Reduces a [`Text`] to its wire form for one viewer.
pub trait TextRenderer: Send + Sync {
    fn render(&self, viewer: ViewerId, text: &Text) -> WireText;
}

/// Viewer-independent renderer backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTextRenderer;

impl TextRenderer for DefaultTextRenderer {
    fn render(&self, _viewer: ViewerId, text: &Text) -> WireText {
        match text {
            Text::Plain(s) | Text::Legacy(s) => WireText::from_legacy(s.as_str()),
            Text::Json(json) => WireText::from_json(json.as_str()),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

/// Serializes `{"text": s}`.
pub fn text_component(s: &str) -> String {
    let mut map = Map::new();
    map.insert("text".to_string(), Value::String(s.to_string()));
    Value::Object(map).to_string()
}

/// Flattens a JSON text component into a legacy `§`-coded string.
///
/// Named colours and the boolean decorations map to their legacy codes; hex
/// colours have no legacy equivalent and are dropped.  Input that is not valid
/// JSON is returned unchanged.
pub fn json_to_legacy(json: &str) -> String {
    let value: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(_) => return json.to_string(),
    };
    let mut out = String::new();
    let mut applied = Style::default();
    flatten(&value, &Style::default(), &mut applied, &mut out);
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Style {
    color: Option<char>,
    formats: Vec<char>,
}

impl Style {
    fn inherit(&self, fields: &Map<String, Value>) -> Style {
        let mut style = self.clone();
        if let Some(code) = fields.get("color").and_then(Value::as_str).and_then(color_code) {
            style.color = Some(code);
        }
        for (key, code) in DECORATIONS {
            match fields.get(*key).and_then(Value::as_bool) {
                Some(true) if !style.formats.contains(code) => style.formats.push(*code),
                Some(false) => style.formats.retain(|c| c != code),
                _ => {}
            }
        }
        style
    }

    fn codes(&self) -> String {
        let mut s = String::new();
        if let Some(c) = self.color {
            s.push('§');
            s.push(c);
        }
        for f in &self.formats {
            s.push('§');
            s.push(*f);
        }
        s
    }
}

const DECORATIONS: &[(&str, char)] = &[
    ("obfuscated", 'k'),
    ("bold", 'l'),
    ("strikethrough", 'm'),
    ("underlined", 'n'),
    ("italic", 'o'),
];

fn flatten(value: &Value, style: &Style, applied: &mut Style, out: &mut String) {
    match value {
        Value::String(s) => emit(s, style, applied, out),
        Value::Array(items) => {
            for item in items {
                flatten(item, style, applied, out);
            }
        }
        Value::Object(fields) => {
            let own = style.inherit(fields);
            if let Some(text) = fields.get("text").and_then(Value::as_str) {
                emit(text, &own, applied, out);
            } else if let Some(key) = fields.get("translate").and_then(Value::as_str) {
                emit(key, &own, applied, out);
            }
            if let Some(extra) = fields.get("extra") {
                flatten(extra, &own, applied, out);
            }
        }
        Value::Number(n) => emit(&n.to_string(), style, applied, out),
        Value::Bool(b) => emit(&b.to_string(), style, applied, out),
        Value::Null => {}
    }
}

fn emit(text: &str, style: &Style, applied: &mut Style, out: &mut String) {
    if text.is_empty() {
        return;
    }
    if style != applied {
        // Legacy codes can only add decorations; dropping one needs a reset.
        let needs_reset = (applied.color.is_some() && style.color.is_none())
            || applied.formats.iter().any(|f| !style.formats.contains(f));
        if needs_reset && style.color.is_none() {
            out.push_str("§r");
        }
        out.push_str(&style.codes());
        *applied = style.clone();
    }
    out.push_str(text);
}

fn color_code(name: &str) -> Option<char> {
    let code = match name {
        "black" => '0',
        "dark_blue" => '1',
        "dark_green" => '2',
        "dark_aqua" => '3',
        "dark_red" => '4',
        "dark_purple" => '5',
        "gold" => '6',
        "gray" => '7',
        "dark_gray" => '8',
        "blue" => '9',
        "green" => 'a',
        "aqua" => 'b',
        "red" => 'c',
        "light_purple" => 'd',
        "yellow" => 'e',
        "white" => 'f',
        _ => return None,
    };
    Some(code)
}

/// Returns the colour and decoration codes still active at the end of a
/// legacy string, so text continued after a split keeps its look.
pub fn last_legacy_codes(s: &str) -> String {
    let mut color: Option<char> = None;
    let mut formats: Vec<char> = Vec::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '§' {
            continue;
        }
        let Some(code) = chars.next().map(|c| c.to_ascii_lowercase()) else {
            break;
        };
        match code {
            '0'..='9' | 'a'..='f' => {
                color = Some(code);
                formats.clear();
            }
            'r' => {
                color = None;
                formats.clear();
            }
            'k'..='o' if !formats.contains(&code) => formats.push(code),
            _ => {}
        }
    }
    Style { color, formats }.codes()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_plain_text_is_wrapped_in_text_component() {
        let wire = DefaultTextRenderer.render(Uuid::nil(), &Text::plain("Kills: 5"));
        assert_eq!(wire.legacy, "Kills: 5");
        let parsed: Value = serde_json::from_str(&wire.json).unwrap();
        assert_eq!(parsed, serde_json::json!({ "text": "Kills: 5" }));
    }

    #[test]
    fn test_quotes_are_escaped_in_text_component() {
        let json = text_component(r#"say "hi""#);
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["text"], r#"say "hi""#);
    }

    #[test]
    fn test_json_component_flattens_to_legacy_codes() {
        let json = r#"{"text":"Stats","color":"gold","bold":true}"#;
        assert_eq!(json_to_legacy(json), "§6§lStats");
    }

    #[test]
    fn test_extra_children_inherit_parent_style() {
        let json = r#"{"text":"A","color":"red","extra":[{"text":"B"},{"text":"C","color":"blue"}]}"#;
        assert_eq!(json_to_legacy(json), "§cAB§9C");
    }

    #[test]
    fn test_dropping_decoration_emits_reset() {
        let json = r#"{"text":"","extra":[{"text":"A","bold":true},{"text":"B"}]}"#;
        assert_eq!(json_to_legacy(json), "§lA§rB");
    }

    #[test]
    fn test_invalid_json_is_returned_unchanged() {
        assert_eq!(json_to_legacy("not json"), "not json");
    }

    #[test]
    fn test_empty_wire_text() {
        let empty = WireText::empty();
        assert_eq!(empty.legacy, "");
        assert_eq!(empty.json, r#"{"text":""}"#);
    }

    #[test]
    fn test_last_legacy_codes() {
        assert_eq!(last_legacy_codes("§aHello §lWorld"), "§a§l");
        assert_eq!(last_legacy_codes("§a§lBold§rPlain"), "");
        assert_eq!(last_legacy_codes("§lBold §cRed"), "§c");
        assert_eq!(last_legacy_codes("no codes"), "");
    }
}
