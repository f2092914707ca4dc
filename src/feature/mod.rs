//! Optional per-job features. Each is configured once from the properties
//! and the two table schemas, then consulted read-only by the engines.

pub mod constant_columns;
pub mod explode_map;
pub mod guardrail;

pub use constant_columns::ConstantColumns;
pub use explode_map::ExplodeMap;
pub use guardrail::{Guardrail, GuardrailCheck};
