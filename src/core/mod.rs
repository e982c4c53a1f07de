pub mod branches;
pub mod engine;
pub mod line_states;
pub mod selector;
pub mod table;
pub mod transform;
