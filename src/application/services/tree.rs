//! Tree file service
//!
//! Loads configuration trees from TOML files and resolves their references.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::tree::{subtree_key, SUBTREE_SUFFIX};
use crate::domain::{ConfigTree, DomainError, ElementRegistry, Node, ReferenceResolver};
use crate::infrastructure::traits::FileSystem;

/// Convert a TOML table into a configuration tree.
///
/// Tables become subtrees under `key.` (keys already ending in `.` are kept),
/// scalars become strings (booleans as `1`/`0`), arrays of scalars become
/// comma separated lists.
pub fn tree_from_toml(table: &toml::Table) -> Result<ConfigTree, DomainError> {
    let mut tree = ConfigTree::new();
    for (key, value) in table {
        match value {
            toml::Value::Table(sub) => {
                let key = if key.ends_with(SUBTREE_SUFFIX) {
                    key.clone()
                } else {
                    subtree_key(key)
                };
                tree.insert(key, Node::Tree(tree_from_toml(sub)?));
            }
            toml::Value::Array(items) => {
                let parts = items
                    .iter()
                    .map(|item| {
                        scalar_to_string(item).ok_or_else(|| {
                            DomainError::InvalidTree(format!("{}: arrays may only hold scalars", key))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                tree.set_value(key.as_str(), parts.join(","));
            }
            scalar => {
                let value = scalar_to_string(scalar)
                    .ok_or_else(|| DomainError::InvalidTree(format!("{}: unsupported value", key)))?;
                tree.set_value(key.as_str(), value);
            }
        }
    }
    Ok(tree)
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(if *b { "1" } else { "0" }.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

/// Service for loading and resolving tree files.
pub struct TreeService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl TreeService {
    /// Create a new tree service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// The given file, or the configured `tree_file`.
    pub fn tree_file(&self, file: Option<&Path>) -> ApplicationResult<PathBuf> {
        file.map(Path::to_path_buf)
            .or_else(|| self.settings.tree_file.clone())
            .ok_or(ApplicationError::NoTreeFile)
    }

    /// Load a TOML tree file.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<ConfigTree> {
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read tree file", path)?;
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| ApplicationError::OperationFailed {
                context: format!("parse tree file: {}", path.display()),
                source: Box::new(e),
            })?;
        let tree = tree_from_toml(&table)?;
        debug!("load: {} top-level keys", tree.len());
        Ok(tree)
    }

    /// Load `path` and resolve references, either in the whole tree or in
    /// the subtree at `subpath` (references still resolve against the root).
    pub fn resolve_file(&self, path: &Path, subpath: Option<&str>) -> ApplicationResult<ConfigTree> {
        let root = self.load(path)?;
        let target = match subpath {
            Some(p) => root
                .subtree_at(p)
                .cloned()
                .ok_or_else(|| ApplicationError::SubtreeNotFound {
                    path: p.to_string(),
                    file: path.to_path_buf(),
                })?,
            None => root.clone(),
        };
        Ok(self.resolve(&root, target))
    }

    /// Resolve `tree` against `root` with the configured depth bound.
    pub fn resolve(&self, root: &ConfigTree, tree: ConfigTree) -> ConfigTree {
        ReferenceResolver::new(root)
            .with_max_depth(self.settings.max_reference_depth)
            .resolve(tree)
    }

    /// Element registry over the resolved form tree at `form_path`
    /// (default: the configured `form_path`).
    pub fn element_registry(
        &self,
        path: &Path,
        form_path: Option<&str>,
    ) -> ApplicationResult<ElementRegistry> {
        let form_path = form_path.unwrap_or(&self.settings.form_path);
        let tree = self.resolve_file(path, Some(form_path))?;
        Ok(ElementRegistry::from_tree(tree)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_nested_tables_when_converting_then_subtree_keys_get_dot() {
        let table: toml::Table = r#"
            a = "<b"
            b = "value"
            flag = true
            list = [1, 2]
            "b." = { x = 1 }
            [c]
            y = "z"
        "#
        .parse()
        .expect("valid toml");

        let tree = tree_from_toml(&table).expect("tree");

        assert_eq!(tree.value("a"), Some("<b"));
        assert_eq!(tree.value("flag"), Some("1"));
        assert_eq!(tree.value("list"), Some("1,2"));
        assert_eq!(tree.lookup("b.x").value, Some("1"));
        assert_eq!(tree.lookup("c.y").value, Some("z"));
    }

    #[test]
    fn given_array_of_tables_when_converting_then_invalid_tree() {
        let table: toml::Table = "items = [{ a = 1 }]".parse().expect("valid toml");
        assert!(matches!(
            tree_from_toml(&table),
            Err(DomainError::InvalidTree(_))
        ));
    }
}
