/// Single-action transitions over (hexagram, line) states.

use thiserror::Error;
use tracing::warn;

use crate::core::table::{HexagramTable, TableError};
use crate::schema::hexagram::{HexagramId, Position, PositionError};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// A value that was either looked up exactly or estimated because the
/// table had no entry for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<T> {
    Exact(T),
    Estimated(T),
}

impl<T> Resolved<T> {
    pub fn value(self) -> T {
        match self {
            Self::Exact(v) | Self::Estimated(v) => v,
        }
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self, Self::Estimated(_))
    }
}

/// Outcome of an advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advanced {
    pub position: Position,
    /// False at the top line, where the position is returned unchanged.
    pub progressed: bool,
}

/// Applies advance and change actions. Holds only a shared reference to
/// the table, so any number of these can run concurrently.
#[derive(Debug, Clone, Copy)]
pub struct TransformationEngine<'a> {
    table: &'a HexagramTable,
}

impl<'a> TransformationEngine<'a> {
    pub fn new(table: &'a HexagramTable) -> Self {
        Self { table }
    }

    /// Move to the next line up. Line 6 is a dead end, not a wrap-around.
    pub fn apply_advance(&self, from: Position) -> Advanced {
        match from.line.next() {
            Some(line) => Advanced {
                position: Position {
                    hexagram: from.hexagram,
                    line,
                },
                progressed: true,
            },
            None => Advanced {
                position: from,
                progressed: false,
            },
        }
    }

    /// Flip the current line and look up the resulting hexagram.
    ///
    /// A hexagram missing from the table is an error for the caller to
    /// handle. A flipped pattern missing from the reverse map falls back to
    /// [`estimate_change`] and is returned as [`Resolved::Estimated`].
    pub fn apply_change(&self, from: Position) -> Result<Resolved<Position>, TransformError> {
        let pattern = self.table.pattern(from.hexagram)?;
        let flipped = pattern.flip(from.line);

        match self.table.lookup(flipped) {
            Ok(hexagram) => Ok(Resolved::Exact(Position {
                hexagram,
                line: from.line,
            })),
            Err(TableError::PatternNotFound(_)) => {
                let hexagram = estimate_change(from);
                warn!(
                    hexagram = from.hexagram.get(),
                    line = from.line.get(),
                    pattern = %flipped,
                    estimated = hexagram.get(),
                    "line pattern missing from table; using estimated hexagram"
                );
                Ok(Resolved::Estimated(Position {
                    hexagram,
                    line: from.line,
                }))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Range-checked variant of [`TransformationEngine::apply_advance`].
    pub fn advance(&self, hexagram: u32, line: u32) -> Result<Advanced, TransformError> {
        Ok(self.apply_advance(Position::new(hexagram, line)?))
    }

    /// Range-checked variant of [`TransformationEngine::apply_change`].
    pub fn change(&self, hexagram: u32, line: u32) -> Result<Resolved<Position>, TransformError> {
        self.apply_change(Position::new(hexagram, line)?)
    }
}

/// Approximate result of changing a line without a table entry:
/// `((hexagram - 1) XOR (1 << (line - 1))) + 1`.
///
/// King Wen numbering does not follow the line patterns, so this is not
/// the real transformed hexagram. It only keeps degraded output
/// deterministic and must be reported as approximate.
pub fn estimate_change(from: Position) -> HexagramId {
    let index = (from.hexagram.get() - 1) ^ (1 << from.line.index());
    HexagramId::from_index(index)
}
