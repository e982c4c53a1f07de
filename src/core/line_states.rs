/// Line-state store — descriptive text keyed by (hexagram, line).

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::schema::hexagram::Position;

/// Shown in place of text for keys the source table does not have.
pub const UNREGISTERED_PLACEHOLDER: &str = "（未登録）";

#[derive(Debug, Error)]
pub enum LineStateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The text for one (hexagram, line) key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineState {
    pub text: String,
    /// False when the key was absent from the source and the text is empty.
    pub registered: bool,
}

impl LineState {
    fn unregistered() -> Self {
        Self {
            text: String::new(),
            registered: false,
        }
    }

    pub fn display_text(&self) -> &str {
        if self.registered {
            &self.text
        } else {
            UNREGISTERED_PLACEHOLDER
        }
    }
}

// Values in the source JSON are either a bare string or an object with a
// `text` field. Anything else is kept so it can be reported and skipped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLineState {
    Plain(String),
    Record { text: String },
    Other(serde_json::Value),
}

/// Read-only line-state texts. Loaded once; lookups never fail.
#[derive(Debug, Clone, Default)]
pub struct LineStateStore {
    states: FxHashMap<Position, String>,
}

impl LineStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file of `"<hexagram>-<line>"` keys.
    pub fn load_from_json(path: &Path) -> Result<LineStateStore, LineStateError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_json(&contents)
    }

    /// Parse a JSON object of `"<hexagram>-<line>"` keys. Malformed keys and
    /// values of an unexpected shape are skipped with a warning.
    pub fn parse_json(input: &str) -> Result<LineStateStore, LineStateError> {
        let raw: FxHashMap<String, RawLineState> = serde_json::from_str(input)?;
        let mut states = FxHashMap::default();
        let mut skipped = 0usize;

        for (key, value) in raw {
            let Some(position) = parse_key(&key) else {
                warn!(key = %key, "skipping line state with malformed key");
                skipped += 1;
                continue;
            };
            let text = match value {
                RawLineState::Plain(text) | RawLineState::Record { text } => text,
                RawLineState::Other(_) => {
                    warn!(key = %key, "skipping line state without text");
                    skipped += 1;
                    continue;
                }
            };
            states.insert(position, text);
        }

        debug!(entries = states.len(), skipped, "line states loaded");
        Ok(LineStateStore { states })
    }

    pub fn insert(&mut self, position: Position, text: impl Into<String>) {
        self.states.insert(position, text.into());
    }

    pub fn get(&self, position: Position) -> LineState {
        match self.states.get(&position) {
            Some(text) => LineState {
                text: text.clone(),
                registered: true,
            },
            None => LineState::unregistered(),
        }
    }

    pub fn into_entries(self) -> impl Iterator<Item = (Position, String)> {
        self.states.into_iter()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.states.contains_key(&position)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

fn parse_key(key: &str) -> Option<Position> {
    let (hexagram, line) = key.trim().split_once('-')?;
    let hexagram = hexagram.trim().parse().ok()?;
    let line = line.trim().parse().ok()?;
    Position::new(hexagram, line).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(h: u32, l: u32) -> Position {
        Position::new(h, l).unwrap()
    }

    #[test]
    fn parses_plain_and_record_values() {
        let store = LineStateStore::parse_json(
            r#"{
                "1-1": "潜龍、用いるなかれ",
                "1-2": { "text": "見龍在田", "keywords": ["出現"] }
            }"#,
        )
        .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(pos(1, 1)).text, "潜龍、用いるなかれ");
        assert_eq!(store.get(pos(1, 2)).text, "見龍在田");
        assert!(store.get(pos(1, 2)).registered);
    }

    #[test]
    fn missing_key_is_unregistered() {
        let store = LineStateStore::new();
        let state = store.get(pos(64, 6));
        assert!(!state.registered);
        assert_eq!(state.text, "");
        assert_eq!(state.display_text(), UNREGISTERED_PLACEHOLDER);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let store = LineStateStore::parse_json(
            r#"{
                "1-1": "ok",
                "65-1": "out of range",
                "1-7": "bad line",
                "abc": "no dash",
                "2-1": { "summary": "no text field" },
                "2-2": 42
            }"#,
        )
        .unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.contains(pos(1, 1)));
        assert!(!store.contains(pos(2, 1)));
    }

    #[test]
    fn non_object_json_is_an_error() {
        assert!(matches!(
            LineStateStore::parse_json("[1, 2, 3]"),
            Err(LineStateError::Json(_))
        ));
    }

    #[test]
    fn load_fixture() {
        let path = std::path::PathBuf::from("tests/fixtures/line_states.json");
        let store = LineStateStore::load_from_json(&path).unwrap();
        assert!(store.contains(pos(11, 1)));
        assert!(!store.is_empty());
    }
}
