//! WASM bindings for hexagram-engine. Everything crosses the boundary as JSON
//! strings; the host page fetches the data files and hands their contents in.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use hexagram_engine::core::line_states::LineStateStore;
use hexagram_engine::core::table::HexagramTable;
use hexagram_engine::schema::hexagram::{yao_name, Position};
use hexagram_engine::schema::situation::SituationSummary;
use hexagram_engine::HexagramEngine;

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(Serialize)]
struct StateOutput<'a> {
    hexagram: u8,
    line: u8,
    name: Option<&'a str>,
    yao_name: Option<String>,
    text: &'a str,
    registered: bool,
    display_text: &'a str,
}

#[derive(Serialize)]
struct StartOutput {
    hexagram: u8,
    line: u8,
    yao_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Engine — the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct Engine {
    inner: HexagramEngine,
}

#[wasm_bindgen]
impl Engine {
    /// Create an engine over the built-in table with the given line states.
    #[wasm_bindgen(constructor)]
    pub fn new(line_states_json: &str) -> Result<Engine, JsError> {
        Engine::build(None, line_states_json).map_err(|e| JsError::new(&e))
    }

    /// Create an engine over a caller-supplied RON hexagram table.
    pub fn with_table(hexagrams_ron: &str, line_states_json: &str) -> Result<Engine, JsError> {
        Engine::build(Some(hexagrams_ron), line_states_json).map_err(|e| JsError::new(&e))
    }

    /// The eight branches from a start position, as a JSON branch set.
    pub fn generate_eight_branches(&self, hexagram: u32, line: u32) -> Result<String, JsError> {
        self.branches_json(hexagram, line)
            .map_err(|e| JsError::new(&e))
    }

    /// Pick a starting line for `hexagram` from a JSON situation summary.
    pub fn select_start(&self, hexagram: u32, summary_json: &str) -> Result<String, JsError> {
        self.start_json(hexagram, summary_json)
            .map_err(|e| JsError::new(&e))
    }

    /// The line state at a position, with its display text.
    pub fn current_state(&self, hexagram: u32, line: u32) -> Result<String, JsError> {
        self.state_json(hexagram, line)
            .map_err(|e| JsError::new(&e))
    }

    /// True when running on a partial table and results may be estimated.
    pub fn is_degraded(&self) -> bool {
        self.inner.is_degraded()
    }

    /// Number of hexagrams the engine knows.
    pub fn hexagram_count(&self) -> usize {
        self.inner.table().len()
    }
}

// Private helpers
impl Engine {
    fn build(hexagrams_ron: Option<&str>, line_states_json: &str) -> Result<Engine, String> {
        let line_states = LineStateStore::parse_json(line_states_json)
            .map_err(|e| format!("Line state parse error: {e}"))?;
        let mut builder = HexagramEngine::builder().with_line_states(line_states);
        if let Some(source) = hexagrams_ron {
            let table = HexagramTable::parse_ron(source)
                .map_err(|e| format!("Hexagram table parse error: {e}"))?;
            builder = builder.with_table(table);
        }
        let inner = builder
            .build()
            .map_err(|e| format!("Engine build error: {e}"))?;
        Ok(Engine { inner })
    }

    fn branches_json(&self, hexagram: u32, line: u32) -> Result<String, String> {
        let set = self
            .inner
            .generate_eight_branches(hexagram, line)
            .map_err(|e| format!("Branch error: {e}"))?;
        serde_json::to_string(&set).map_err(|e| format!("Serialization error: {e}"))
    }

    fn start_json(&self, hexagram: u32, summary_json: &str) -> Result<String, String> {
        let summary: SituationSummary = serde_json::from_str(summary_json)
            .map_err(|e| format!("Invalid summary JSON: {e}"))?;
        let start = self
            .inner
            .select_start(hexagram, &summary)
            .map_err(|e| format!("Selection error: {e}"))?;
        let output = StartOutput {
            hexagram: start.hexagram.get(),
            line: start.line.get(),
            yao_name: self.yao_name(start),
        };
        serde_json::to_string(&output).map_err(|e| format!("Serialization error: {e}"))
    }

    fn state_json(&self, hexagram: u32, line: u32) -> Result<String, String> {
        let position = Position::new(hexagram, line).map_err(|e| format!("Invalid position: {e}"))?;
        let state = self.inner.line_states().get(position);
        let output = StateOutput {
            hexagram: position.hexagram.get(),
            line: position.line.get(),
            name: self.inner.table().name(position.hexagram),
            yao_name: self.yao_name(position),
            text: &state.text,
            registered: state.registered,
            display_text: state.display_text(),
        };
        serde_json::to_string(&output).map_err(|e| format!("Serialization error: {e}"))
    }

    fn yao_name(&self, position: Position) -> Option<String> {
        self.inner
            .table()
            .pattern(position.hexagram)
            .ok()
            .map(|pattern| yao_name(pattern, position.line))
    }
}
