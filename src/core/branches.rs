/// Eight-branch enumeration: every three-action trace from a start state.

use tracing::debug;

use crate::core::line_states::LineStateStore;
use crate::core::table::{HexagramTable, TableError};
use crate::core::transform::{estimate_change, Resolved, TransformError, TransformationEngine};
use crate::schema::branch::{
    sequence_label, Action, BranchResult, BranchSet, TransformationStep, ACTION_SEQUENCES,
    ESTIMATED_NOTE, TERMINAL_NOTE,
};
use crate::schema::hexagram::Position;

/// Produces the eight traces for a start state. Stateless apart from its
/// shared references, and a pure function of (start, tables).
#[derive(Debug, Clone, Copy)]
pub struct BranchEnumerator<'a> {
    transformer: TransformationEngine<'a>,
    line_states: &'a LineStateStore,
}

impl<'a> BranchEnumerator<'a> {
    pub fn new(table: &'a HexagramTable, line_states: &'a LineStateStore) -> Self {
        Self {
            transformer: TransformationEngine::new(table),
            line_states,
        }
    }

    /// All eight branches in canonical order, `AAA` first and `BBB` last.
    ///
    /// Missing table data never fails the run: changes that cannot be
    /// looked up are estimated and `used_fallback` is set on the result.
    pub fn generate(&self, start: Position) -> Result<BranchSet, TransformError> {
        let mut used_fallback = false;
        let mut branches = Vec::with_capacity(ACTION_SEQUENCES.len());

        for (i, actions) in ACTION_SEQUENCES.iter().enumerate() {
            let branch = self.trace(i as u8 + 1, start, actions, &mut used_fallback)?;
            branches.push(branch);
        }

        debug!(
            start = %start,
            used_fallback,
            invalid = branches.iter().filter(|b| !b.valid).count(),
            "generated eight branches"
        );

        Ok(BranchSet {
            start,
            branches,
            used_fallback,
        })
    }

    fn trace(
        &self,
        id: u8,
        start: Position,
        actions: &[Action; 3],
        used_fallback: &mut bool,
    ) -> Result<BranchResult, TransformError> {
        let mut current = start;
        let mut valid = true;

        let [first, second, third] = *actions;
        let mut steps = [
            self.step(&mut current, first, &mut valid, used_fallback)?,
            self.step(&mut current, second, &mut valid, used_fallback)?,
            self.step(&mut current, third, &mut valid, used_fallback)?,
        ];

        // An invalid branch always ends on the terminal note.
        if !valid {
            let note = match steps[2].note.take() {
                Some(note) if note.contains(TERMINAL_NOTE) => note,
                Some(note) => format!("{} / {}", note, TERMINAL_NOTE),
                None => TERMINAL_NOTE.to_string(),
            };
            steps[2].note = Some(note);
        }

        Ok(BranchResult {
            id,
            steps,
            valid,
            action_sequence_label: sequence_label(actions),
        })
    }

    fn step(
        &self,
        current: &mut Position,
        action: Action,
        valid: &mut bool,
        used_fallback: &mut bool,
    ) -> Result<TransformationStep, TransformError> {
        let mut progressed = true;
        let mut estimated = false;

        match action {
            Action::Advance => {
                let out = self.transformer.apply_advance(*current);
                if !out.progressed {
                    progressed = false;
                    *valid = false;
                }
                *current = out.position;
            }
            Action::Change => {
                let resolved = match self.transformer.apply_change(*current) {
                    Ok(resolved) => resolved,
                    // Source hexagram absent from a partial table.
                    Err(TransformError::Table(TableError::NotFound(_))) => {
                        Resolved::Estimated(Position {
                            hexagram: estimate_change(*current),
                            line: current.line,
                        })
                    }
                    Err(e) => return Err(e),
                };
                if resolved.used_fallback() {
                    estimated = true;
                    *used_fallback = true;
                }
                *current = resolved.value();
            }
        }

        let state = self.line_states.get(*current);
        let note = if !progressed {
            Some(TERMINAL_NOTE.to_string())
        } else if estimated {
            Some(ESTIMATED_NOTE.to_string())
        } else {
            None
        };

        Ok(TransformationStep {
            hexagram: current.hexagram,
            line: current.line,
            action,
            line_text: state.text,
            registered: state.registered,
            progressed,
            estimated,
            note,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(h: u32, l: u32) -> Position {
        Position::new(h, l).unwrap()
    }

    fn generate(table: &HexagramTable, store: &LineStateStore, h: u32, l: u32) -> BranchSet {
        BranchEnumerator::new(table, store).generate(pos(h, l)).unwrap()
    }

    #[test]
    fn eight_branches_in_canonical_order() {
        let table = HexagramTable::canonical().unwrap();
        let store = LineStateStore::new();
        let set = generate(&table, &store, 11, 1);
        assert_eq!(set.branches.len(), 8);
        let ids: Vec<u8> = set.branches.iter().map(|b| b.id).collect();
        assert_eq!(ids, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(
            set.labels(),
            ["AAA", "AAB", "ABA", "ABB", "BAA", "BAB", "BBA", "BBB"]
        );
        assert!(!set.used_fallback);
    }

    #[test]
    fn three_advances_from_line_one() {
        let table = HexagramTable::canonical().unwrap();
        let store = LineStateStore::new();
        let set = generate(&table, &store, 11, 1);
        let aaa = &set.branches[0];
        assert!(aaa.valid);
        let lines: Vec<u8> = aaa.steps.iter().map(|s| s.line.get()).collect();
        assert_eq!(lines, [2, 3, 4]);
        assert!(aaa.steps.iter().all(|s| s.hexagram.get() == 11));
    }

    #[test]
    fn advance_at_top_line_marks_branch_invalid() {
        let table = HexagramTable::canonical().unwrap();
        let store = LineStateStore::new();
        let set = generate(&table, &store, 1, 6);
        let aaa = &set.branches[0];
        assert!(!aaa.valid);
        for step in &aaa.steps {
            assert_eq!(step.position(), pos(1, 6));
            assert!(!step.progressed);
            assert_eq!(step.note.as_deref(), Some(TERMINAL_NOTE));
        }
    }

    #[test]
    fn invalid_branch_continues_deterministically() {
        let table = HexagramTable::canonical().unwrap();
        let store = LineStateStore::new();
        let set = generate(&table, &store, 1, 6);
        // A at line 6 stalls, then the two changes still apply.
        let abb = set.get("ABB").unwrap();
        assert!(!abb.valid);
        assert!(!abb.steps[0].progressed);
        assert_eq!(abb.steps[1].position(), pos(43, 6));
        assert_eq!(abb.steps[2].position(), pos(1, 6));
        assert!(abb.steps[2].note.as_deref().unwrap().contains(TERMINAL_NOTE));
        // Pure changes never stall.
        assert!(set.get("BBB").unwrap().valid);
    }

    #[test]
    fn triple_change_ends_flipped() {
        let table = HexagramTable::canonical().unwrap();
        let store = LineStateStore::new();
        let set = generate(&table, &store, 11, 1);
        let bbb = set.get("BBB").unwrap();
        let hexagrams: Vec<u8> = bbb.steps.iter().map(|s| s.hexagram.get()).collect();
        assert_eq!(hexagrams, [46, 11, 46]);
        assert!(bbb.steps.iter().all(|s| s.line.get() == 1));
        assert_eq!(
            table.get_lines(46).unwrap(),
            [0, 1, 1, 0, 0, 0]
        );
    }

    #[test]
    fn steps_carry_line_text() {
        let table = HexagramTable::canonical().unwrap();
        let mut store = LineStateStore::new();
        store.insert(pos(11, 2), "二爻");
        let set = generate(&table, &store, 11, 1);
        let aaa = &set.branches[0];
        assert_eq!(aaa.steps[0].line_text, "二爻");
        assert!(aaa.steps[0].registered);
        assert_eq!(aaa.steps[1].line_text, "");
        assert!(!aaa.steps[1].registered);
    }

    #[test]
    fn seed_table_sets_sticky_fallback() {
        let seed = HexagramTable::seed().unwrap();
        let store = LineStateStore::new();
        let set = generate(&seed, &store, 11, 1);
        assert!(set.used_fallback);
        // Advances alone never touch the table.
        assert!(set.branches[0].steps.iter().all(|s| !s.estimated));
        let baa = set.get("BAA").unwrap();
        assert!(baa.steps[0].estimated);
        assert_eq!(baa.steps[0].note.as_deref(), Some(ESTIMATED_NOTE));
    }

    #[test]
    fn seed_table_absorbs_missing_source_hexagram() {
        let seed = HexagramTable::seed().unwrap();
        let store = LineStateStore::new();
        // 屯 is not in the seed table at all.
        let set = generate(&seed, &store, 3, 2);
        assert_eq!(set.branches.len(), 8);
        assert!(set.used_fallback);
        let bbb = set.get("BBB").unwrap();
        assert!(bbb.steps.iter().all(|s| s.estimated));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let table = HexagramTable::canonical().unwrap();
        let store = LineStateStore::new();
        let a = generate(&table, &store, 37, 4);
        let b = generate(&table, &store, 37, 4);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
