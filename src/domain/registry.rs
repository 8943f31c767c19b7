//! Form element registry built on a resolved form-plugin tree.

use indexmap::IndexMap;
use itertools::Itertools;

use crate::domain::error::DomainError;
use crate::domain::tree::{subtree_key, ConfigTree, Node, SUBTREE_SUFFIX};

/// Default scope holding an element's template partial.
pub const DEFAULT_PARTIAL_TYPE: &str = "partialPath";

const SETTINGS: &str = "settings";
const REGISTERED_ELEMENTS: &str = "registeredElements";

/// Lookup of registered form elements and their model definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRegistry {
    tree: ConfigTree,
    element_types: Vec<String>,
}

impl ElementRegistry {
    /// Registry over `tree`, with element types read from
    /// `settings.registeredElements.`.
    pub fn from_tree(tree: ConfigTree) -> Result<Self, DomainError> {
        Self::with_element_types(tree, Vec::new())
    }

    /// Registry with an explicit list of element types. An empty list falls
    /// back to the types registered in the tree.
    pub fn with_element_types(tree: ConfigTree, types: Vec<String>) -> Result<Self, DomainError> {
        let element_types = if types.is_empty() {
            let registered = registered_elements(&tree).ok_or_else(|| {
                DomainError::InvalidArgument("There are no registeredElements available.".into())
            })?;
            registered
                .keys()
                .map(|k| k.trim_end_matches(SUBTREE_SUFFIX).to_string())
                .unique()
                .collect()
        } else {
            types
        };
        Ok(Self {
            tree,
            element_types,
        })
    }

    pub fn registered_element_types(&self) -> &[String] {
        &self.element_types
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    /// Node stored under `scope` (a raw key like `partialPath` or
    /// `htmlAttributes.`) of `element`'s model definition.
    pub fn model_configuration_by_scope(&self, element: &str, scope: &str) -> Option<&Node> {
        registered_elements(&self.tree)?
            .subtree(element)?
            .get(scope)
    }

    /// Html attributes of `element` mapped to their default values.
    ///
    /// Attributes listed under `htmlAttributes.` start out as `None`;
    /// `defaultHtmlAttributeValues.` then fills in (or adds) values.
    pub fn model_defined_html_attributes(&self, element: &str) -> IndexMap<String, Option<String>> {
        let mut attributes = IndexMap::new();
        if element.is_empty() {
            return attributes;
        }

        let scope = subtree_key("htmlAttributes");
        if let Some(Node::Tree(names)) = self.model_configuration_by_scope(element, &scope) {
            for (_, node) in names.iter() {
                if let Node::Value(name) = node {
                    attributes.insert(name.clone(), None);
                }
            }
        }

        let scope = subtree_key("defaultHtmlAttributeValues");
        if let Some(Node::Tree(defaults)) = self.model_configuration_by_scope(element, &scope) {
            for (name, node) in defaults.iter() {
                if let Node::Value(value) = node {
                    attributes.insert(name.clone(), Some(value.clone()));
                }
            }
        }
        attributes
    }

    /// Template partial of `element` for `partial_type`, empty if unset.
    pub fn default_fluid_template(&self, element: &str, partial_type: Option<&str>) -> String {
        let scope = partial_type.unwrap_or(DEFAULT_PARTIAL_TYPE);
        self.model_configuration_by_scope(element, scope)
            .and_then(Node::as_value)
            .filter(|v| !v.is_empty() && *v != "0")
            .map(String::from)
            .unwrap_or_default()
    }

    /// Class registered under `settings.<scope>.<name>.className`; the name
    /// is matched lower-cased.
    pub fn registered_class_name(&self, name: &str, scope: &str) -> Option<String> {
        self.tree
            .subtree(SETTINGS)?
            .subtree(scope)?
            .subtree(&name.to_lowercase())?
            .value("className")
            .map(String::from)
    }
}

fn registered_elements(tree: &ConfigTree) -> Option<&ConfigTree> {
    tree.subtree(SETTINGS)?.subtree(REGISTERED_ELEMENTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_scalar_and_subtree_keys_when_listing_types_then_deduplicated() {
        let elements: ConfigTree = [
            ("TEXTLINE", Node::value("x")),
            ("TEXTLINE.", Node::tree(ConfigTree::new())),
            ("SUBMIT.", Node::tree(ConfigTree::new())),
        ]
        .into_iter()
        .collect();
        let settings: ConfigTree = [("registeredElements.", Node::tree(elements))]
            .into_iter()
            .collect();
        let tree: ConfigTree = [("settings.", Node::tree(settings))].into_iter().collect();

        let registry = ElementRegistry::from_tree(tree).unwrap();

        assert_eq!(registry.registered_element_types(), ["TEXTLINE", "SUBMIT"]);
    }

    #[test]
    fn given_explicit_types_when_tree_is_empty_then_no_lookup() {
        let registry =
            ElementRegistry::with_element_types(ConfigTree::new(), vec!["FORM".into()]).unwrap();
        assert_eq!(registry.registered_element_types(), ["FORM"]);
        assert_eq!(registry.default_fluid_template("FORM", None), "");
    }
}
