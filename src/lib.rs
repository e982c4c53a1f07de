//! Hexagram Engine — deterministic I Ching transformation traces.
//!
//! From a starting hexagram and line, enumerates the eight three-step
//! sequences of "advance" (move one line up) and "change" (flip the
//! current line) over the King Wen table, attaching descriptive line
//! text to every step.

pub mod core;
pub mod schema;

pub use crate::core::engine::{EngineError, EngineSlot, HexagramEngine};
pub use crate::schema::branch::{Action, BranchResult, BranchSet, TransformationStep};
pub use crate::schema::hexagram::{HexagramId, LinePosition, Position};
