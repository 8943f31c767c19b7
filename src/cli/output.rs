//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;
use termtree::Tree;

use crate::domain::{ConfigTree, Node};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print condition result: green `true` or red `false`
pub fn verdict(matched: bool) {
    if matched {
        println!("{}", "true".green());
    } else {
        println!("{}", "false".red());
    }
}

/// Print `key = value` with the key highlighted
pub fn assignment(key: &str, value: &(impl std::fmt::Display + ?Sized)) {
    println!("{} = {}", key.cyan(), value);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Render a configuration tree with box-drawing characters.
pub fn render_tree(label: &str, tree: &ConfigTree) -> String {
    to_termtree(label.to_string(), tree).to_string()
}

fn to_termtree(label: String, tree: &ConfigTree) -> Tree<String> {
    let mut root = Tree::new(label);
    for (key, node) in tree.iter() {
        match node {
            Node::Value(v) => {
                root.push(Tree::new(format!("{} = {}", key, v)));
            }
            Node::Tree(sub) => {
                root.push(to_termtree(key.clone(), sub));
            }
        }
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_nested_tree_when_rendering_then_children_indented() {
        let inner: ConfigTree = [("x", Node::value("1"))].into_iter().collect();
        let tree: ConfigTree = [("a", Node::value("v")), ("a.", Node::tree(inner))]
            .into_iter()
            .collect();

        let rendered = render_tree("root", &tree);

        assert!(rendered.starts_with("root\n"));
        assert!(rendered.contains("a = v"));
        assert!(rendered.contains("a.\n"));
        assert!(rendered.contains("x = 1"));
    }
}
