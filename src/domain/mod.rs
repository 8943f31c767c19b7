//! Domain layer: configuration trees, condition matching and reference resolution
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arguments;
pub mod condition;
pub mod date;
pub mod environment;
pub mod error;
pub mod expression;
pub mod matching;
pub mod normalizer;
pub mod predicate;
pub mod references;
pub mod registry;
pub mod tree;
pub mod user_function;
pub mod value;

pub use arguments::{parse_arguments, FunctionCall};
pub use condition::{ConditionMatcher, ForwardedForPolicy, MatcherConfig};
pub use environment::{ApplicationContext, Environment, FrontendUser};
pub use error::DomainError;
pub use normalizer::normalize_expression;
pub use predicate::Predicate;
pub use references::{ReferenceResolver, DEFAULT_MAX_REFERENCE_DEPTH};
pub use registry::ElementRegistry;
pub use tree::{ConfigTree, Lookup, Node};
pub use user_function::UserFunctionRegistry;
pub use value::Value;
