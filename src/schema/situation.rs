use serde::{Deserialize, Serialize};

use super::hexagram::LinePosition;

/// How pressing the caller's situation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

impl Urgency {
    /// Layer shift applied by the line selector.
    pub fn shift(&self) -> i8 {
        match self {
            Self::Low => -1,
            Self::Medium => 0,
            Self::High => 1,
        }
    }
}

/// A pair of adjacent lines within a hexagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Lines 1 and 2.
    Lower,
    /// Lines 3 and 4.
    Middle,
    /// Lines 5 and 6.
    Upper,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Self::Lower, Self::Middle, Self::Upper];

    pub fn index(&self) -> usize {
        match self {
            Self::Lower => 0,
            Self::Middle => 1,
            Self::Upper => 2,
        }
    }

    /// Index clamped into 0..=2.
    pub fn from_index(index: i8) -> Layer {
        Self::ALL[index.clamp(0, 2) as usize]
    }

    /// The two line positions of the layer, bottom first.
    pub fn positions(&self) -> [LinePosition; 2] {
        let base = self.index() * 2;
        [LinePosition::ALL[base], LinePosition::ALL[base + 1]]
    }
}

/// Situational analysis supplied by the caller. Producing it from free
/// text is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationSummary {
    pub primary_theme: String,
    #[serde(default)]
    pub urgency_level: Urgency,
    /// 0.0..=1.0; values outside are clamped.
    #[serde(default)]
    pub emotional_intensity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_lines() {
        let lines = |layer: Layer| layer.positions().map(|p| p.get());
        assert_eq!(lines(Layer::Lower), [1, 2]);
        assert_eq!(lines(Layer::Middle), [3, 4]);
        assert_eq!(lines(Layer::Upper), [5, 6]);
    }

    #[test]
    fn layer_index_clamps() {
        assert_eq!(Layer::from_index(-3), Layer::Lower);
        assert_eq!(Layer::from_index(1), Layer::Middle);
        assert_eq!(Layer::from_index(9), Layer::Upper);
    }

    #[test]
    fn summary_deserializes_with_defaults() {
        let s: SituationSummary =
            serde_json::from_str(r#"{"primary_theme": "career"}"#).unwrap();
        assert_eq!(s.urgency_level, Urgency::Medium);
        assert_eq!(s.emotional_intensity, 0.0);

        let s: SituationSummary = serde_json::from_str(
            r#"{"primary_theme": "health", "urgency_level": "high", "emotional_intensity": 0.7}"#,
        )
        .unwrap();
        assert_eq!(s.urgency_level, Urgency::High);
    }
}
