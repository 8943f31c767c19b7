//! Error conversion helpers for I/O operations on tree and config files

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// let content = fs.read_to_string(&path)
    ///     .with_path_context("read tree file", &path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}
