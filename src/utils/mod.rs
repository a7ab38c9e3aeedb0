//! Shared utilities: AS identifier expansion and topology validation.

pub mod as_id;
pub mod validation;

pub use as_id::{as_id_suffix, expand_as_id, parse_as_id, AS_ID_PREFIX};
pub use validation::{parse_subnet, validate_topology_spec};
