use serde::{Deserialize, Serialize};

use super::hexagram::{HexagramId, LinePosition, Position};

/// Note attached to a step that tried to advance past the top line.
pub const TERMINAL_NOTE: &str = "進不可（最終）";

/// Note attached to a change whose resulting hexagram was estimated.
pub const ESTIMATED_NOTE: &str = "推定（近似）";

/// One of the two moves available from a (hexagram, line) state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// 進: move attention one line upward; the hexagram is unchanged.
    Advance,
    /// 変: flip the current line, producing a different hexagram.
    Change,
}

impl Action {
    /// Letter used in sequence labels: "A" for advance, "B" for change.
    pub fn label(&self) -> char {
        match self {
            Self::Advance => 'A',
            Self::Change => 'B',
        }
    }

    pub fn kanji(&self) -> &'static str {
        match self {
            Self::Advance => "進",
            Self::Change => "変",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::Change => "change",
        }
    }
}

/// The eight three-action sequences in canonical order. Callers rely on
/// positional identity: index 0 is always three advances.
pub const ACTION_SEQUENCES: [[Action; 3]; 8] = {
    use Action::{Advance as A, Change as B};
    [
        [A, A, A],
        [A, A, B],
        [A, B, A],
        [A, B, B],
        [B, A, A],
        [B, A, B],
        [B, B, A],
        [B, B, B],
    ]
};

/// Label such as "ABB" for a sequence of actions.
pub fn sequence_label(actions: &[Action]) -> String {
    actions.iter().map(Action::label).collect()
}

/// The state reached by applying one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationStep {
    pub hexagram: HexagramId,
    pub line: LinePosition,
    pub action: Action,
    /// Line-state text for (hexagram, line); empty when unregistered.
    pub line_text: String,
    pub registered: bool,
    /// False only for an advance attempted at the top line.
    pub progressed: bool,
    /// True when the hexagram came from the approximate fallback formula.
    pub estimated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TransformationStep {
    pub fn position(&self) -> Position {
        Position {
            hexagram: self.hexagram,
            line: self.line,
        }
    }
}

/// One of the eight traces produced from a starting state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchResult {
    /// 1..=8, matching enumeration order.
    pub id: u8,
    pub steps: [TransformationStep; 3],
    /// False when any advance hit the top line.
    pub valid: bool,
    pub action_sequence_label: String,
}

impl BranchResult {
    pub fn final_position(&self) -> Position {
        self.steps[2].position()
    }

    pub fn actions(&self) -> [Action; 3] {
        [
            self.steps[0].action,
            self.steps[1].action,
            self.steps[2].action,
        ]
    }
}

/// The full output of one enumeration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSet {
    pub start: Position,
    pub branches: Vec<BranchResult>,
    /// Set once any change in the run used the fallback estimate. Results
    /// should then be shown as approximate.
    pub used_fallback: bool,
}

impl BranchSet {
    pub fn get(&self, label: &str) -> Option<&BranchResult> {
        self.branches
            .iter()
            .find(|b| b.action_sequence_label == label)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.branches
            .iter()
            .map(|b| b.action_sequence_label.as_str())
            .collect()
    }
}
