/// Starting-line heuristic — maps a situational summary to a line.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::schema::hexagram::LinePosition;
use crate::schema::situation::{Layer, SituationSummary};

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Built-in theme table.
const DEFAULT_THEMES: [(&str, Layer); 8] = [
    ("personal_growth", Layer::Lower),
    ("learning", Layer::Lower),
    ("health", Layer::Lower),
    ("relationships", Layer::Middle),
    ("community", Layer::Middle),
    ("career", Layer::Upper),
    ("creativity", Layer::Upper),
    ("spirituality", Layer::Upper),
];

/// Theme-to-layer mapping entry, as written in override files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeLayer {
    pub theme: String,
    pub layer: Layer,
}

/// Deterministic heuristic for the starting line. Unknown themes fall in
/// the middle layer.
#[derive(Debug, Clone)]
pub struct LineSelector {
    themes: FxHashMap<String, Layer>,
}

impl Default for LineSelector {
    fn default() -> Self {
        let themes = DEFAULT_THEMES
            .iter()
            .map(|(theme, layer)| (theme.to_string(), *layer))
            .collect();
        Self { themes }
    }
}

impl LineSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one theme mapping.
    pub fn with_theme(mut self, theme: &str, layer: Layer) -> Self {
        self.themes.insert(normalize(theme), layer);
        self
    }

    /// Apply overrides from a RON list of `(theme, layer)` records.
    pub fn load_overrides(&mut self, path: &Path) -> Result<(), SelectorError> {
        let contents = std::fs::read_to_string(path)?;
        self.parse_overrides(&contents)
    }

    pub fn parse_overrides(&mut self, input: &str) -> Result<(), SelectorError> {
        let entries: Vec<ThemeLayer> = ron::from_str(input)?;
        debug!(entries = entries.len(), "theme layer overrides loaded");
        for entry in entries {
            self.themes.insert(normalize(&entry.theme), entry.layer);
        }
        Ok(())
    }

    pub fn layer_for(&self, theme: &str) -> Layer {
        self.themes
            .get(&normalize(theme))
            .copied()
            .unwrap_or(Layer::Middle)
    }

    /// Pick the starting line.
    ///
    /// The theme's layer is shifted one step up for high urgency and one
    /// step down for low urgency, clamped to the three layers. Intensity
    /// below 0.5 selects the lower line of the layer, otherwise the upper.
    pub fn select(&self, summary: &SituationSummary) -> LinePosition {
        let base = self.layer_for(&summary.primary_theme);
        let layer = Layer::from_index(base.index() as i8 + summary.urgency_level.shift());

        let intensity = if summary.emotional_intensity.is_nan() {
            0.0
        } else {
            summary.emotional_intensity.clamp(0.0, 1.0)
        };
        let pick = ((intensity * 2.0).floor() as usize).min(1);

        layer.positions()[pick]
    }
}

fn normalize(theme: &str) -> String {
    theme.trim().to_lowercase()
}
