//! Topology builder.
//!
//! Creates the entities of a declarative topology in dependency order.

pub mod topology;
pub mod types;

pub use topology::TopologyBuilder;
pub use types::{BuildError, BuildOptions, BuildReport, Stage};
