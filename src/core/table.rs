/// Hexagram table — the single source of truth for number ↔ line pattern.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::schema::hexagram::{HexagramId, LinePattern, PositionError};
use crate::schema::trigram::Trigram;

/// Canonical King Wen table shipped with the crate.
const CANONICAL_RON: &str = include_str!("../../data/hexagrams.ron");

/// Hexagrams present in the seed table: the eight doubled trigrams plus
/// 泰, 否, 既済 and 未済.
const SEED_NUMBERS: [u8; 12] = [1, 2, 11, 12, 29, 30, 51, 52, 57, 58, 63, 64];

#[derive(Debug, Error)]
pub enum TableError {
    /// The table cannot be used at all. Not recoverable.
    #[error("hexagram table configuration error: {0}")]
    Configuration(String),
    #[error("hexagram {0} not found in table")]
    NotFound(HexagramId),
    #[error("no hexagram matches line pattern {0}")]
    PatternNotFound(LinePattern),
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A table source record: `(number, name, lower, upper)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexagramEntry {
    pub number: u32,
    pub name: String,
    pub lower: String,
    pub upper: String,
}

/// A resolved hexagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hexagram {
    pub id: HexagramId,
    pub name: String,
    pub lower: Trigram,
    pub upper: Trigram,
    pub pattern: LinePattern,
}

impl Hexagram {
    /// Bottom-first line bits.
    pub fn lines(&self) -> [u8; 6] {
        self.pattern.lines()
    }
}

/// Read-only mapping between hexagram numbers and line patterns.
///
/// A complete table holds all 64 hexagrams with distinct patterns. A
/// partial table (see [`HexagramTable::seed`]) holds a subset and is only
/// used in degraded mode; callers can tell with [`HexagramTable::is_complete`].
#[derive(Debug, Clone)]
pub struct HexagramTable {
    hexagrams: Vec<Option<Hexagram>>,
    by_pattern: FxHashMap<LinePattern, HexagramId>,
    by_name: FxHashMap<String, HexagramId>,
    count: usize,
}

impl HexagramTable {
    /// Build a complete table. Exactly 64 entries with distinct numbers and
    /// distinct line patterns are required.
    pub fn new(entries: Vec<HexagramEntry>) -> Result<HexagramTable, TableError> {
        if entries.len() != 64 {
            return Err(TableError::Configuration(format!(
                "expected 64 hexagrams, found {}",
                entries.len()
            )));
        }
        let table = Self::build(entries)?;
        debug!(entries = table.count, complete = true, "hexagram table built");
        Ok(table)
    }

    /// Build a partial table. Uniqueness is still enforced; completeness
    /// is not.
    pub fn partial(entries: Vec<HexagramEntry>) -> Result<HexagramTable, TableError> {
        if entries.len() > 64 {
            return Err(TableError::Configuration(format!(
                "expected at most 64 hexagrams, found {}",
                entries.len()
            )));
        }
        let table = Self::build(entries)?;
        debug!(entries = table.count, complete = table.is_complete(), "partial hexagram table built");
        Ok(table)
    }

    /// The canonical King Wen table embedded in the crate.
    pub fn canonical() -> Result<HexagramTable, TableError> {
        Self::parse_ron(CANONICAL_RON)
    }

    /// The documented fallback table for degraded operation.
    pub fn seed() -> Result<HexagramTable, TableError> {
        let entries: Vec<HexagramEntry> = ron::from_str(CANONICAL_RON)?;
        let seed = entries
            .into_iter()
            .filter(|e| SEED_NUMBERS.iter().any(|n| *n as u32 == e.number))
            .collect();
        Self::partial(seed)
    }

    /// Load a complete table from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<HexagramTable, TableError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a complete table from a RON list of entries.
    pub fn parse_ron(input: &str) -> Result<HexagramTable, TableError> {
        let entries: Vec<HexagramEntry> = ron::from_str(input)?;
        Self::new(entries)
    }

    fn build(entries: Vec<HexagramEntry>) -> Result<HexagramTable, TableError> {
        let mut hexagrams: Vec<Option<Hexagram>> = vec![None; 64];
        let mut by_pattern = FxHashMap::default();
        let mut by_name = FxHashMap::default();

        for entry in entries {
            let id = HexagramId::new(entry.number).map_err(|e| {
                TableError::Configuration(format!("{} ({})", e, entry.name))
            })?;
            let lower = parse_trigram(&entry.lower, &entry.name)?;
            let upper = parse_trigram(&entry.upper, &entry.name)?;
            let pattern = LinePattern::from_trigrams(lower, upper);

            let slot = &mut hexagrams[(id.get() - 1) as usize];
            if slot.is_some() {
                return Err(TableError::Configuration(format!(
                    "duplicate hexagram number {}",
                    id
                )));
            }
            if let Some(existing) = by_pattern.insert(pattern, id) {
                return Err(TableError::Configuration(format!(
                    "hexagrams {} and {} share line pattern {}",
                    existing, id, pattern
                )));
            }
            if let Some(existing) = by_name.insert(entry.name.clone(), id) {
                return Err(TableError::Configuration(format!(
                    "hexagrams {} and {} share the name '{}'",
                    existing, id, entry.name
                )));
            }
            *slot = Some(Hexagram {
                id,
                name: entry.name,
                lower,
                upper,
                pattern,
            });
        }

        let count = by_pattern.len();
        Ok(HexagramTable {
            hexagrams,
            by_pattern,
            by_name,
            count,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.count == 64
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, id: HexagramId) -> Result<&Hexagram, TableError> {
        self.hexagrams[(id.get() - 1) as usize]
            .as_ref()
            .ok_or(TableError::NotFound(id))
    }

    pub fn pattern(&self, id: HexagramId) -> Result<LinePattern, TableError> {
        Ok(self.get(id)?.pattern)
    }

    /// `(lower, upper)` trigrams of a hexagram.
    pub fn trigrams(&self, id: HexagramId) -> Result<(Trigram, Trigram), TableError> {
        let hexagram = self.get(id)?;
        Ok((hexagram.lower, hexagram.upper))
    }

    /// Bottom-first line bits of a hexagram.
    pub fn get_lines(&self, number: u32) -> Result<[u8; 6], TableError> {
        let id = HexagramId::new(number)?;
        Ok(self.get(id)?.lines())
    }

    /// Reverse lookup by line pattern.
    pub fn lookup(&self, pattern: LinePattern) -> Result<HexagramId, TableError> {
        self.by_pattern
            .get(&pattern)
            .copied()
            .ok_or(TableError::PatternNotFound(pattern))
    }

    /// Reverse lookup by bottom-first line bits.
    pub fn get_hexagram_number(&self, lines: [u8; 6]) -> Result<HexagramId, TableError> {
        self.lookup(LinePattern::from_lines(lines)?)
    }

    pub fn name(&self, id: HexagramId) -> Option<&str> {
        self.get(id).ok().map(|h| h.name.as_str())
    }

    pub fn find_by_name(&self, name: &str) -> Option<HexagramId> {
        self.by_name.get(name.trim()).copied()
    }

    /// Hexagrams present in the table, in King Wen order.
    pub fn iter(&self) -> impl Iterator<Item = &Hexagram> {
        self.hexagrams.iter().flatten()
    }
}

fn parse_trigram(name: &str, hexagram: &str) -> Result<Trigram, TableError> {
    Trigram::from_name(name).ok_or_else(|| {
        TableError::Configuration(format!("unknown trigram '{}' in {}", name, hexagram))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn id(n: u32) -> HexagramId {
        HexagramId::new(n).unwrap()
    }

    fn entry(number: u32, name: &str, lower: &str, upper: &str) -> HexagramEntry {
        HexagramEntry {
            number,
            name: name.to_string(),
            lower: lower.to_string(),
            upper: upper.to_string(),
        }
    }

    #[test]
    fn canonical_table_is_complete() {
        let table = HexagramTable::canonical().unwrap();
        assert!(table.is_complete());
        assert_eq!(table.len(), 64);
        assert_eq!(table.iter().count(), 64);
    }

    #[test]
    fn golden_encodings() {
        let table = HexagramTable::canonical().unwrap();
        assert_eq!(table.get_lines(1).unwrap(), [1, 1, 1, 1, 1, 1]);
        assert_eq!(table.get_lines(2).unwrap(), [0, 0, 0, 0, 0, 0]);
        assert_eq!(table.get_lines(11).unwrap(), [1, 1, 1, 0, 0, 0]);
        assert_eq!(table.get_lines(12).unwrap(), [0, 0, 0, 1, 1, 1]);
        assert_eq!(table.get_lines(63).unwrap(), [1, 0, 1, 0, 1, 0]);
        assert_eq!(table.get_lines(64).unwrap(), [0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn reverse_lookup_round_trips_every_hexagram() {
        let table = HexagramTable::canonical().unwrap();
        let mut seen = HashSet::new();
        for h in HexagramId::all() {
            let lines = table.get_lines(h.get() as u32).unwrap();
            assert!(seen.insert(lines), "duplicate pattern for {}", h);
            assert_eq!(table.get_hexagram_number(lines).unwrap(), h);
        }
    }

    #[test]
    fn names_and_trigrams() {
        let table = HexagramTable::canonical().unwrap();
        let tai = table.get(id(11)).unwrap();
        assert_eq!(tai.name, "地天泰");
        assert_eq!(tai.lower, Trigram::Qian);
        assert_eq!(tai.upper, Trigram::Kun);
        assert_eq!(table.find_by_name("水雷屯"), Some(id(3)));
        assert_eq!(table.find_by_name("存在しない"), None);
        // 屯: thunder below, so the bottom line is yang.
        assert_eq!(table.get_lines(3).unwrap(), [1, 0, 0, 0, 1, 0]);
        assert_eq!(table.trigrams(id(11)).unwrap(), (Trigram::Qian, Trigram::Kun));
        assert_eq!(table.trigrams(id(12)).unwrap(), (Trigram::Kun, Trigram::Qian));
        let seed = HexagramTable::seed().unwrap();
        assert!(matches!(seed.trigrams(id(3)), Err(TableError::NotFound(_))));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = HexagramTable::partial(vec![
            entry(11, "地天泰", "乾", "坤"),
            entry(12, "地天泰", "坤", "乾"),
        ])
        .unwrap_err();
        assert!(matches!(err, TableError::Configuration(_)));
        assert!(err.to_string().contains("地天泰"));
    }

    #[test]
    fn out_of_range_number_is_position_error() {
        let table = HexagramTable::canonical().unwrap();
        assert!(matches!(
            table.get_lines(0),
            Err(TableError::Position(PositionError::InvalidHexagram(0)))
        ));
        assert!(matches!(
            table.get_lines(65),
            Err(TableError::Position(PositionError::InvalidHexagram(65)))
        ));
        assert!(matches!(
            table.get_hexagram_number([1, 1, 1, 0, 0, 2]),
            Err(TableError::Position(PositionError::InvalidLineBit(2)))
        ));
    }

    #[test]
    fn wrong_count_is_configuration_error() {
        let err = HexagramTable::new(vec![entry(1, "乾為天", "乾", "乾")]).unwrap_err();
        assert!(matches!(err, TableError::Configuration(_)));
    }

    #[test]
    fn duplicate_pattern_is_configuration_error() {
        let mut entries: Vec<HexagramEntry> = ron::from_str(CANONICAL_RON).unwrap();
        // Give 坤為地 the trigrams of 乾為天.
        entries[1].lower = "乾".to_string();
        entries[1].upper = "乾".to_string();
        let err = HexagramTable::new(entries).unwrap_err();
        assert!(err.to_string().contains("share line pattern"));
    }

    #[test]
    fn duplicate_number_is_configuration_error() {
        let mut entries: Vec<HexagramEntry> = ron::from_str(CANONICAL_RON).unwrap();
        entries[63].number = 63;
        let err = HexagramTable::new(entries).unwrap_err();
        assert!(err.to_string().contains("duplicate hexagram number"));
    }

    #[test]
    fn unknown_trigram_is_configuration_error() {
        let err = HexagramTable::partial(vec![entry(1, "乾為天", "乾", "雲")]).unwrap_err();
        assert!(matches!(err, TableError::Configuration(_)));
    }

    #[test]
    fn seed_table_is_partial() {
        let seed = HexagramTable::seed().unwrap();
        assert!(!seed.is_complete());
        assert_eq!(seed.len(), 12);
        assert_eq!(seed.get_lines(11).unwrap(), [1, 1, 1, 0, 0, 0]);
        assert!(matches!(seed.get(id(3)), Err(TableError::NotFound(_))));
        let pattern = LinePattern::from_lines([1, 0, 0, 0, 1, 0]).unwrap();
        assert!(matches!(
            seed.lookup(pattern),
            Err(TableError::PatternNotFound(_))
        ));
    }

    #[test]
    fn partial_rejects_more_than_64_entries() {
        let mut entries: Vec<HexagramEntry> = ron::from_str(CANONICAL_RON).unwrap();
        entries.push(entry(1, "乾為天", "乾", "乾"));
        assert_eq!(entries.len(), 65);
        match HexagramTable::partial(entries) {
            Err(TableError::Configuration(msg)) => assert!(msg.contains("at most 64")),
            other => panic!("expected configuration error, got {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn trigram_spellings_are_interchangeable() {
        let table = HexagramTable::partial(vec![
            entry(11, "地天泰", "天", "地"),
            entry(12, "天地否", "kun", "qian"),
        ])
        .unwrap();
        assert_eq!(table.get_lines(11).unwrap(), [1, 1, 1, 0, 0, 0]);
        assert_eq!(table.get_lines(12).unwrap(), [0, 0, 0, 1, 1, 1]);
    }
}
