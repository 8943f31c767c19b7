//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, Clock, etc.)
//! but are themselves concrete structs, not traits.

mod condition;
mod tree;

pub use condition::{ConditionService, RequestOptions};
pub use tree::{tree_from_toml, TreeService};
