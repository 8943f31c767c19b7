//! tsconf: TypoScript condition matching and configuration reference resolution
//!
//! Layers, innermost first:
//! - [`domain`]: condition matching, expression language, reference resolution
//! - [`application`]: services orchestrating the domain over I/O traits
//! - [`infrastructure`]: real I/O implementations and the service container
//! - [`cli`]: argument parsing, command dispatch and terminal output

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
