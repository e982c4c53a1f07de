/// The assembled engine: table, line states and selector, plus the
/// load-once slot applications keep it in.

use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::branches::BranchEnumerator;
use crate::core::line_states::{LineState, LineStateError, LineStateStore};
use crate::core::selector::{LineSelector, SelectorError};
use crate::core::table::{HexagramTable, TableError};
use crate::core::transform::{TransformError, TransformationEngine};
use crate::schema::branch::BranchSet;
use crate::schema::hexagram::{HexagramId, Position, PositionError};
use crate::schema::situation::SituationSummary;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("hexagram table error: {0}")]
    Table(#[from] TableError),
    #[error("line state error: {0}")]
    LineState(#[from] LineStateError),
    #[error("transformation error: {0}")]
    Transform(#[from] TransformError),
    #[error("line selector error: {0}")]
    Selector(#[from] SelectorError),
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error("engine is not initialized")]
    NotInitialized,
    #[error("engine is already initialized")]
    AlreadyInitialized,
}

/// The top-level engine. Built via `HexagramEngine::builder()`.
///
/// Immutable once built; every method takes `&self`, so one instance can
/// serve any number of threads.
#[derive(Debug, Clone)]
pub struct HexagramEngine {
    table: HexagramTable,
    line_states: LineStateStore,
    selector: LineSelector,
}

/// Builder for constructing a `HexagramEngine`.
#[derive(Debug, Default)]
pub struct HexagramEngineBuilder {
    table_path: Option<String>,
    line_states_path: Option<String>,
    theme_layers_path: Option<String>,
    allow_seed_table: bool,
    /// Directly provided table (for testing without files).
    table: Option<HexagramTable>,
    /// Directly provided line states (for testing without files).
    line_states: Option<LineStateStore>,
    /// Directly provided selector (for testing without files).
    selector: Option<LineSelector>,
}

impl HexagramEngine {
    pub fn builder() -> HexagramEngineBuilder {
        HexagramEngineBuilder::default()
    }

    pub fn table(&self) -> &HexagramTable {
        &self.table
    }

    pub fn line_states(&self) -> &LineStateStore {
        &self.line_states
    }

    pub fn selector(&self) -> &LineSelector {
        &self.selector
    }

    /// True when running on a partial table; results may be approximate.
    pub fn is_degraded(&self) -> bool {
        !self.table.is_complete()
    }

    pub fn transformer(&self) -> TransformationEngine<'_> {
        TransformationEngine::new(&self.table)
    }

    pub fn enumerator(&self) -> BranchEnumerator<'_> {
        BranchEnumerator::new(&self.table, &self.line_states)
    }

    /// The eight three-step traces from `(hexagram, line)`.
    pub fn generate_eight_branches(
        &self,
        hexagram: u32,
        line: u32,
    ) -> Result<BranchSet, EngineError> {
        let start = Position::new(hexagram, line)?;
        Ok(self.enumerator().generate(start)?)
    }

    /// Starting position for a hexagram chosen by the caller's analysis,
    /// with the line picked by the selector.
    pub fn select_start(
        &self,
        hexagram: u32,
        summary: &SituationSummary,
    ) -> Result<Position, EngineError> {
        Ok(Position {
            hexagram: HexagramId::new(hexagram)?,
            line: self.selector.select(summary),
        })
    }

    /// Line state of a single position, for the "current situation" view.
    pub fn current_state(&self, hexagram: u32, line: u32) -> Result<LineState, EngineError> {
        Ok(self.line_states.get(Position::new(hexagram, line)?))
    }
}

impl HexagramEngineBuilder {
    /// RON file of `(number, name, lower, upper)` records. Without one the
    /// embedded canonical table is used.
    pub fn hexagram_table(mut self, path: &str) -> Self {
        self.table_path = Some(path.to_string());
        self
    }

    /// JSON file of `"<hexagram>-<line>"` texts.
    pub fn line_states(mut self, path: &str) -> Self {
        self.line_states_path = Some(path.to_string());
        self
    }

    /// RON file of `(theme, layer)` overrides for the selector.
    pub fn theme_layers(mut self, path: &str) -> Self {
        self.theme_layers_path = Some(path.to_string());
        self
    }

    /// Fall back to the seed table when the configured table file cannot
    /// be read. A table that reads but fails validation is never replaced.
    pub fn allow_seed_table(mut self, allow: bool) -> Self {
        self.allow_seed_table = allow;
        self
    }

    /// Provide the table directly (for testing without files).
    pub fn with_table(mut self, table: HexagramTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Provide line states directly (for testing without files).
    pub fn with_line_states(mut self, line_states: LineStateStore) -> Self {
        self.line_states = Some(line_states);
        self
    }

    /// Provide the selector directly (for testing without files).
    pub fn with_selector(mut self, selector: LineSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn build(self) -> Result<HexagramEngine, EngineError> {
        let table = match (self.table, self.table_path) {
            (Some(table), _) => table,
            (None, Some(path)) => match HexagramTable::load_from_ron(Path::new(&path)) {
                Ok(table) => table,
                Err(TableError::Io(e)) if self.allow_seed_table => {
                    warn!(path = %path, error = %e, "hexagram table unreadable; using seed table");
                    HexagramTable::seed()?
                }
                Err(e) => return Err(e.into()),
            },
            (None, None) => HexagramTable::canonical()?,
        };

        let mut line_states = self.line_states.unwrap_or_default();
        if let Some(ref path) = self.line_states_path {
            let loaded = LineStateStore::load_from_json(Path::new(path))?;
            line_states = merge_line_states(line_states, loaded);
        }

        let mut selector = self.selector.unwrap_or_default();
        if let Some(ref path) = self.theme_layers_path {
            selector.load_overrides(Path::new(path))?;
        }

        info!(
            hexagrams = table.len(),
            complete = table.is_complete(),
            line_states = line_states.len(),
            "hexagram engine ready"
        );

        Ok(HexagramEngine {
            table,
            line_states,
            selector,
        })
    }
}

// Entries loaded from file override directly provided ones.
fn merge_line_states(mut base: LineStateStore, loaded: LineStateStore) -> LineStateStore {
    for (position, text) in loaded.into_entries() {
        base.insert(position, text);
    }
    base
}

/// Load-once holder for the application's engine.
///
/// `get` fails with [`EngineError::NotInitialized`] until `initialize` has
/// run, unless the slot was created with [`EngineSlot::with_seed_fallback`],
/// in which case it serves an engine over the seed table meanwhile.
#[derive(Debug, Default)]
pub struct EngineSlot {
    engine: OnceLock<HexagramEngine>,
    seed_engine: Option<HexagramEngine>,
}

impl EngineSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot that serves a seed-table engine until initialized.
    pub fn with_seed_fallback() -> Result<Self, EngineError> {
        let seed_engine = HexagramEngine::builder()
            .with_table(HexagramTable::seed()?)
            .build()?;
        Ok(Self {
            engine: OnceLock::new(),
            seed_engine: Some(seed_engine),
        })
    }

    pub fn initialize(&self, engine: HexagramEngine) -> Result<(), EngineError> {
        self.engine
            .set(engine)
            .map_err(|_| EngineError::AlreadyInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.get().is_some()
    }

    pub fn get(&self) -> Result<&HexagramEngine, EngineError> {
        if let Some(engine) = self.engine.get() {
            return Ok(engine);
        }
        match &self.seed_engine {
            Some(engine) => {
                debug!("engine not initialized; serving seed table");
                Ok(engine)
            }
            None => Err(EngineError::NotInitialized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::situation::{Layer, Urgency};

    #[test]
    fn builder_defaults_to_canonical_table() {
        let engine = HexagramEngine::builder().build().unwrap();
        assert!(engine.table().is_complete());
        assert!(!engine.is_degraded());
        assert!(engine.line_states().is_empty());
    }

    #[test]
    fn generate_validates_inputs() {
        let engine = HexagramEngine::builder().build().unwrap();
        assert!(matches!(
            engine.generate_eight_branches(65, 1),
            Err(EngineError::Position(PositionError::InvalidHexagram(65)))
        ));
        assert!(matches!(
            engine.generate_eight_branches(1, 0),
            Err(EngineError::Position(PositionError::InvalidLine(0)))
        ));
        assert_eq!(engine.generate_eight_branches(1, 1).unwrap().branches.len(), 8);
    }

    #[test]
    fn loads_files() {
        let engine = HexagramEngine::builder()
            .hexagram_table("data/hexagrams.ron")
            .line_states("tests/fixtures/line_states.json")
            .theme_layers("tests/fixtures/theme_layers.ron")
            .build()
            .unwrap();
        assert!(engine.table().is_complete());
        let state = engine.current_state(11, 1).unwrap();
        assert!(state.registered);
        assert_eq!(engine.selector().layer_for("family"), Layer::Middle);
    }

    #[test]
    fn missing_table_file_without_opt_in_fails() {
        let err = HexagramEngine::builder()
            .hexagram_table("tests/fixtures/does_not_exist.ron")
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::Table(TableError::Io(_))));
    }

    #[test]
    fn missing_table_file_with_opt_in_uses_seed() {
        let engine = HexagramEngine::builder()
            .hexagram_table("tests/fixtures/does_not_exist.ron")
            .allow_seed_table(true)
            .build()
            .unwrap();
        assert!(engine.is_degraded());
    }

    #[test]
    fn corrupt_table_is_never_replaced() {
        let err = HexagramEngine::builder()
            .hexagram_table("tests/fixtures/broken_table.ron")
            .allow_seed_table(true)
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::Table(TableError::Configuration(_))));
    }

    #[test]
    fn select_start_uses_selector() {
        let engine = HexagramEngine::builder()
            .with_selector(LineSelector::new().with_theme("exams", Layer::Lower))
            .build()
            .unwrap();
        let summary = SituationSummary {
            primary_theme: "exams".to_string(),
            urgency_level: Urgency::Medium,
            emotional_intensity: 0.8,
        };
        let start = engine.select_start(11, &summary).unwrap();
        assert_eq!(start, Position::new(11, 2).unwrap());
        assert!(engine.select_start(0, &summary).is_err());
    }

    #[test]
    fn slot_fails_fast_before_initialization() {
        let slot = EngineSlot::new();
        assert!(matches!(slot.get(), Err(EngineError::NotInitialized)));
        slot.initialize(HexagramEngine::builder().build().unwrap())
            .unwrap();
        assert!(slot.is_initialized());
        assert!(slot.get().is_ok());
        assert!(matches!(
            slot.initialize(HexagramEngine::builder().build().unwrap()),
            Err(EngineError::AlreadyInitialized)
        ));
    }

    #[test]
    fn slot_with_seed_fallback_serves_degraded_engine() {
        let slot = EngineSlot::with_seed_fallback().unwrap();
        let first: *const HexagramEngine = slot.get().unwrap();
        let second: *const HexagramEngine = slot.get().unwrap();
        assert_eq!(first, second);
        assert!(slot.get().unwrap().is_degraded());
        assert!(!slot.is_initialized());
        slot.initialize(HexagramEngine::builder().build().unwrap())
            .unwrap();
        assert!(!slot.get().unwrap().is_degraded());
    }
}
