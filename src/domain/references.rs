//! Resolution of `<` references inside a configuration tree.
//!
//! A value `<lib.parseFunc` copies the scalar and the subtree found at
//! `lib.parseFunc` (looked up in the root tree) into the referencing key;
//! `<.sibling` looks on the current level instead. The referencing key's own
//! subtree is applied on top, so local overrides win at every depth.
//! References whose target is itself a reference are followed until a
//! plain value is reached.

use tracing::{debug, instrument, warn};

use crate::domain::tree::{ConfigTree, Node, SUBTREE_SUFFIX};

/// Marks a reference that is looked up on the current level.
const RELATIVE_PREFIX: char = '.';

/// Default bound on the length of a reference chain.
pub const DEFAULT_MAX_REFERENCE_DEPTH: usize = 32;

/// What a reference points to after following its chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Target {
    value: Option<String>,
    tree: Option<ConfigTree>,
}

/// Resolves references against a root tree.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'r> {
    root: &'r ConfigTree,
    max_depth: usize,
}

impl<'r> ReferenceResolver<'r> {
    pub fn new(root: &'r ConfigTree) -> Self {
        Self {
            root,
            max_depth: DEFAULT_MAX_REFERENCE_DEPTH,
        }
    }

    /// Longest reference chain followed before giving up on it.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Resolve every reference in `tree`, recursively.
    #[instrument(level = "debug", skip_all, fields(keys = tree.len()))]
    pub fn resolve(&self, tree: ConfigTree) -> ConfigTree {
        self.resolve_level(tree)
    }

    fn resolve_level(&self, mut tree: ConfigTree) -> ConfigTree {
        let keys: Vec<String> = tree
            .keys()
            .filter(|k| !k.ends_with(SUBTREE_SUFFIX))
            .cloned()
            .collect();

        for key in keys {
            let Some(reference) = tree.value(&key).and_then(reference_path).map(String::from)
            else {
                continue;
            };
            let own = tree.subtree(&key).cloned();

            let target = match self.chase(&reference, &tree, &mut Vec::new()) {
                Some(target) => target,
                None => {
                    warn!("reference cycle or chain too long at {:?} -> <{}", key, reference);
                    Target::default()
                }
            };
            debug!("{} = <{} -> {:?}", key, reference, target.value);

            let has_value = target.value.is_some();
            let merged = match (target.tree, own) {
                (Some(found), Some(own)) => Some(found.replaced_with(&own)),
                (found, own) => found.or(own),
            };
            match target.value {
                Some(value) => tree.set_value(key.as_str(), value),
                None => {
                    tree.remove(&key);
                }
            }
            match merged {
                Some(subtree) => tree.set_subtree(&key, subtree),
                None if !has_value => tree.set_subtree(&key, ConfigTree::new()),
                None => {}
            }
        }

        let subtree_keys: Vec<String> = tree
            .iter()
            .filter(|(_, node)| matches!(node, Node::Tree(_)))
            .map(|(k, _)| k.clone())
            .collect();
        for key in subtree_keys {
            if let Some(Node::Tree(sub)) = tree.get_mut(&key) {
                let taken = std::mem::take(sub);
                *sub = self.resolve_level(taken);
            }
        }
        tree
    }

    /// Follow `reference` from `level`. `None` when the chain loops or
    /// exceeds the depth bound.
    fn chase(&self, reference: &str, level: &ConfigTree, chain: &mut Vec<String>) -> Option<Target> {
        let (search_level, path, id) = match reference.strip_prefix(RELATIVE_PREFIX) {
            // relative paths are only unique together with their level
            Some(relative) => (level, relative, format!("{:p}:{}", level, relative)),
            None => (self.root, reference, reference.to_string()),
        };
        if chain.contains(&id) || chain.len() >= self.max_depth {
            return None;
        }
        chain.push(id);

        let found = search_level.lookup(path);
        let mut target = Target {
            value: found.value.map(String::from),
            tree: found.tree.cloned(),
        };

        if let Some(next) = found.value.and_then(reference_path) {
            let found_level = match path.rsplit_once(SUBTREE_SUFFIX) {
                Some((parent, _)) => search_level.subtree_at(parent).unwrap_or(search_level),
                None => search_level,
            };
            let chained = self.chase(next, found_level, chain)?;
            target.value = chained.value;
            target.tree = match (chained.tree, target.tree) {
                (Some(far), Some(near)) => Some(far.replaced_with(&near)),
                (far, near) => near.or(far),
            };
        }
        Some(target)
    }
}

/// Path of a well-formed reference value like `< lib.foo` or `<.bar`.
///
/// Values like `<div>` are markup, not references.
pub fn reference_path(value: &str) -> Option<&str> {
    let path = value.strip_prefix('<')?.trim();
    let well_formed = !path.is_empty()
        && path != "."
        && path
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'));
    well_formed.then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("<lib.foo", Some("lib.foo"))]
    #[case("< lib.foo ", Some("lib.foo"))]
    #[case("<.sibling", Some(".sibling"))]
    #[case("<div>", None)]
    #[case("<", None)]
    #[case("< ", None)]
    #[case("lib.foo", None)]
    fn test_reference_path(#[case] value: &str, #[case] expected: Option<&str>) {
        assert_eq!(reference_path(value), expected);
    }

    #[test]
    fn given_self_reference_when_resolving_then_fails_closed() {
        let tree: ConfigTree = [("a", Node::value("<.a"))].into_iter().collect();
        let resolved = ReferenceResolver::new(&tree).resolve(tree.clone());

        assert_eq!(resolved.value("a"), None);
        assert_eq!(resolved.subtree("a"), Some(&ConfigTree::new()));
    }

    #[test]
    fn given_leading_dot_when_resolving_then_current_level_searched() {
        let lib: ConfigTree = [
            ("x", Node::value("inner")),
            ("relative", Node::value("<.x")),
            ("absolute", Node::value("<x")),
        ]
        .into_iter()
        .collect();
        let mut tree: ConfigTree = [("x", Node::value("outer"))].into_iter().collect();
        tree.set_subtree("lib", lib);

        let resolved = ReferenceResolver::new(&tree).resolve(tree.clone());

        assert_eq!(resolved.lookup("lib.relative").value, Some("inner"));
        assert_eq!(resolved.lookup("lib.absolute").value, Some("outer"));
    }

    #[test]
    fn given_chain_longer_than_bound_when_resolving_then_unresolved() {
        let tree: ConfigTree = [
            ("a", Node::value("<b")),
            ("b", Node::value("<c")),
            ("c", Node::value("end")),
        ]
        .into_iter()
        .collect();

        let short = ReferenceResolver::new(&tree).with_max_depth(1).resolve(tree.clone());
        let long = ReferenceResolver::new(&tree).resolve(tree.clone());

        assert_eq!(short.value("a"), None);
        assert_eq!(long.value("a"), Some("end"));
    }
}
