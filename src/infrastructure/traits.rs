//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::io;
use std::path::Path;

use chrono::{DateTime, FixedOffset, Local};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Source of "now" for date conditions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Name of the machine conditions are evaluated on.
pub trait HostnameProvider: Send + Sync {
    fn hostname(&self) -> io::Result<String>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Local wall clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Host name as reported by the operating system.
#[derive(Debug, Default)]
pub struct SystemHostname;

impl HostnameProvider for SystemHostname {
    fn hostname(&self) -> io::Result<String> {
        hostname::get()?
            .into_string()
            .map_err(|raw| io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", raw)))
    }
}

// ============================================================
// TEST IMPLEMENTATIONS
// ============================================================

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Host name fixed at construction.
#[derive(Debug, Clone)]
pub struct FixedHostname(pub String);

impl HostnameProvider for FixedHostname {
    fn hostname(&self) -> io::Result<String> {
        Ok(self.0.clone())
    }
}
