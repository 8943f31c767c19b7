//! Configuration tree: an insertion-ordered map of scalar values and subtrees.
//!
//! Subtree keys carry a trailing `.` so that `a` (scalar) and `a.` (subtree)
//! can live side by side.

use indexmap::IndexMap;

/// Marker appended to keys holding a subtree.
pub const SUBTREE_SUFFIX: char = '.';

/// A node in the configuration tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Value(String),
    Tree(ConfigTree),
}

impl Node {
    pub fn value(v: impl Into<String>) -> Self {
        Node::Value(v.into())
    }

    pub fn tree(t: ConfigTree) -> Self {
        Node::Tree(t)
    }

    pub fn as_value(&self) -> Option<&str> {
        match self {
            Node::Value(v) => Some(v),
            Node::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&ConfigTree> {
        match self {
            Node::Tree(t) => Some(t),
            Node::Value(_) => None,
        }
    }
}

/// Result of a path lookup: the scalar at the path and the subtree at `path.`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lookup<'a> {
    pub value: Option<&'a str>,
    pub tree: Option<&'a ConfigTree>,
}

impl Lookup<'_> {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.tree.is_none()
    }
}

/// Insertion-ordered configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigTree {
    entries: IndexMap<String, Node>,
}

/// Key under which the subtree of `key` is stored.
pub fn subtree_key(key: &str) -> String {
    format!("{}{}", key, SUBTREE_SUFFIX)
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries.get_mut(key)
    }

    /// Insert or replace an entry. Replacing keeps the key's position.
    pub fn insert(&mut self, key: impl Into<String>, node: Node) -> Option<Node> {
        self.entries.insert(key.into(), node)
    }

    /// Remove an entry, preserving the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<Node> {
        self.entries.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.entries.iter()
    }

    /// Scalar value stored at `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Node::as_value)
    }

    /// Subtree stored at `key.`; `key` is given without the trailing dot.
    pub fn subtree(&self, key: &str) -> Option<&ConfigTree> {
        self.entries.get(&subtree_key(key)).and_then(Node::as_tree)
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), Node::Value(value.into()));
    }

    /// Store `tree` under `key.`; `key` is given without the trailing dot.
    pub fn set_subtree(&mut self, key: &str, tree: ConfigTree) {
        self.entries.insert(subtree_key(key), Node::Tree(tree));
    }

    /// Look up a dotted path like `lib.parseFunc.tags`.
    ///
    /// Intermediate segments are followed through their `segment.` subtrees;
    /// the last segment yields both the scalar and the subtree stored under it.
    /// Missing paths yield an empty lookup.
    pub fn lookup(&self, path: &str) -> Lookup<'_> {
        if path.is_empty() {
            return Lookup::default();
        }
        match path.split_once(SUBTREE_SUFFIX) {
            None => Lookup {
                value: self.value(path),
                tree: self.subtree(path),
            },
            Some((head, rest)) => match self.subtree(head) {
                Some(sub) => sub.lookup(rest),
                None => Lookup::default(),
            },
        }
    }

    /// Subtree at a dotted path, e.g. `settings.registeredElements`.
    pub fn subtree_at(&self, path: &str) -> Option<&ConfigTree> {
        self.lookup(path).tree
    }

    /// Recursive replace: returns `self` with `overlay` applied on top.
    ///
    /// Keys present in both trees take the overlay's node, except when both
    /// sides are subtrees, which are merged the same way. Keys only in `self`
    /// keep their position; keys only in the overlay are appended.
    pub fn replaced_with(&self, overlay: &ConfigTree) -> ConfigTree {
        let mut result = self.clone();
        for (key, node) in overlay.iter() {
            let merged = match (result.entries.get(key), node) {
                (Some(Node::Tree(base)), Node::Tree(over)) => Node::Tree(base.replaced_with(over)),
                _ => node.clone(),
            };
            result.entries.insert(key.clone(), merged);
        }
        result
    }

    /// Flatten into `(path, value)` pairs in tree order, e.g. `("a.b", "1")`.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        for (key, node) in self.iter() {
            match node {
                Node::Value(v) => out.push((format!("{}{}", prefix, key), v.clone())),
                Node::Tree(t) => {
                    let key = if key.ends_with(SUBTREE_SUFFIX) {
                        key.clone()
                    } else {
                        subtree_key(key)
                    };
                    t.flatten_into(&format!("{}{}", prefix, key), out);
                }
            }
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for ConfigTree {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, n)| (k.into(), n)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigTree {
        ConfigTree::from_iter([
            ("lib", Node::value("TEXT")),
            (
                "lib.",
                Node::tree(ConfigTree::from_iter([
                    ("value", Node::value("hello")),
                    (
                        "wrap.",
                        Node::tree(ConfigTree::from_iter([("inner", Node::value("<p>|</p>"))])),
                    ),
                ])),
            ),
        ])
    }

    #[test]
    fn given_single_segment_when_lookup_then_returns_value_and_subtree() {
        let tree = sample();
        let found = tree.lookup("lib");
        assert_eq!(found.value, Some("TEXT"));
        assert_eq!(found.tree.map(|t| t.len()), Some(2));
    }

    #[test]
    fn given_nested_path_when_lookup_then_descends_subtrees() {
        let tree = sample();
        assert_eq!(tree.lookup("lib.value").value, Some("hello"));
        assert_eq!(tree.lookup("lib.wrap.inner").value, Some("<p>|</p>"));
        assert!(tree.lookup("lib.wrap").value.is_none());
        assert!(tree.lookup("lib.wrap").tree.is_some());
    }

    #[test]
    fn given_missing_path_when_lookup_then_empty() {
        let tree = sample();
        assert!(tree.lookup("nope.value").is_empty());
        assert!(tree.lookup("").is_empty());
    }

    #[test]
    fn given_overlay_when_replaced_with_then_overlay_wins_and_base_keys_stay() {
        let base = ConfigTree::from_iter([
            ("a", Node::value("1")),
            (
                "sub.",
                Node::tree(ConfigTree::from_iter([
                    ("x", Node::value("base")),
                    ("y", Node::value("base")),
                ])),
            ),
        ]);
        let overlay = ConfigTree::from_iter([
            ("sub.", Node::tree(ConfigTree::from_iter([("x", Node::value("over"))]))),
            ("b", Node::value("2")),
        ]);

        let merged = base.replaced_with(&overlay);

        assert_eq!(merged.value("a"), Some("1"));
        assert_eq!(merged.value("b"), Some("2"));
        let sub = merged.subtree("sub").unwrap();
        assert_eq!(sub.value("x"), Some("over"));
        assert_eq!(sub.value("y"), Some("base"));
        assert_eq!(
            merged.keys().cloned().collect::<Vec<_>>(),
            vec!["a".to_string(), "sub.".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn given_nested_tree_when_flatten_then_dotted_paths() {
        let flat = sample().flatten();
        assert_eq!(
            flat,
            vec![
                ("lib".to_string(), "TEXT".to_string()),
                ("lib.value".to_string(), "hello".to_string()),
                ("lib.wrap.inner".to_string(), "<p>|</p>".to_string()),
            ]
        );
    }
}
