// src/macro_tree.rs
//
// The hierarchical macro store: a tree of macro groups and macro leaves.
// Every operation takes a tree snapshot and returns a brand-new tree (or
// `None` for not-found), never mutating its input. Consumers relying on
// reference-equality change detection always observe a fresh top-level list.

use serde::{Deserialize, Serialize};
use tauri::{AppHandle, Emitter};

use crate::macros::MacroData;
use crate::store;

// ============================================================================
// Types
// ============================================================================

/// A node in the macro tree. Groups (`is_macro_group`) carry children and no
/// data; leaves carry a [`MacroData`] and no children. Keys are unique
/// across the entire tree, so every operation locates nodes by key alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroNode {
    pub key: String,
    pub label: String,
    pub is_macro_group: bool,
    /// Transient UI flag: whether the label is currently being renamed.
    #[serde(default)]
    pub is_edit_name: bool,
    #[serde(default = "default_draggable")]
    pub draggable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MacroNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<MacroData>,
}

fn default_draggable() -> bool {
    true
}

impl MacroNode {
    /// A new, empty macro group.
    pub fn group(key: &str, label: &str) -> Self {
        MacroNode {
            key: key.to_string(),
            label: label.to_string(),
            is_macro_group: true,
            is_edit_name: false,
            draggable: true,
            children: Vec::new(),
            data: None,
        }
    }

    /// A new macro leaf.
    pub fn leaf(key: &str, label: &str, data: MacroData) -> Self {
        MacroNode {
            key: key.to_string(),
            label: label.to_string(),
            is_macro_group: false,
            is_edit_name: false,
            draggable: true,
            children: Vec::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// Tree Operations
// ============================================================================

/// Depth-first search for the node with the given key. A group whose own
/// key matches is returned directly instead of being recursed into; all
/// other groups are descended into before their own key is checked.
pub fn search_node<'a>(key: &str, nodes: &'a [MacroNode]) -> Option<&'a MacroNode> {
    for elem in nodes {
        if elem.is_macro_group && elem.key != key {
            if let Some(node) = search_node(key, &elem.children) {
                return Some(node);
            }
        }
        if elem.key == key {
            return Some(elem);
        }
    }
    None
}

/// Remove the node with the given key (and thereby its whole subtree) and
/// return the updated tree. Only the path from the root to the removed node
/// is rebuilt. Returns `None` when the key does not occur anywhere, which
/// is distinct from a successful delete that leaves an empty list.
pub fn delete_node(key: &str, nodes: &[MacroNode]) -> Option<Vec<MacroNode>> {
    for (index, elem) in nodes.iter().enumerate() {
        if elem.is_macro_group && elem.key != key {
            if let Some(remaining) = delete_node(key, &elem.children) {
                let mut copy = nodes.to_vec();
                copy[index].children = remaining;
                return Some(copy);
            }
        }
        if elem.key == key {
            let mut copy = nodes.to_vec();
            copy.remove(index);
            return Some(copy);
        }
    }
    None
}

/// Replace the node with the given key by `new_node`, dropping the old
/// node's subtree, and return the updated tree. `None` when the key is not
/// found.
pub fn replace_node(key: &str, new_node: &MacroNode, nodes: &[MacroNode]) -> Option<Vec<MacroNode>> {
    for (index, elem) in nodes.iter().enumerate() {
        if elem.is_macro_group && elem.key != key {
            if let Some(replaced) = replace_node(key, new_node, &elem.children) {
                let mut copy = nodes.to_vec();
                copy[index].children = replaced;
                return Some(copy);
            }
        }
        if elem.key == key {
            let mut copy = nodes.to_vec();
            copy[index] = new_node.clone();
            return Some(copy);
        }
    }
    None
}

/// Flatten the subtree at the given key into a list of macro leaves in
/// document order. A leaf yields itself; a group yields all descendant
/// leaves, never the groups themselves. `None` when the key is not found.
pub fn collect_as_list(key: &str, nodes: &[MacroNode]) -> Option<Vec<MacroNode>> {
    let node = search_node(key, nodes)?;
    if !node.is_macro_group {
        return Some(vec![node.clone()]);
    }
    let mut res = Vec::new();
    for elem in &node.children {
        if elem.is_macro_group {
            if let Some(mut nested) = collect_as_list(&elem.key, std::slice::from_ref(elem)) {
                res.append(&mut nested);
            }
        } else {
            res.push(elem.clone());
        }
    }
    Some(res)
}

/// Return a copy of the tree with `is_edit_name` cleared on every node at
/// every depth. Called when the rename state has to be dropped globally,
/// e.g. when the tree loses focus.
pub fn reset_edit_mode(nodes: &[MacroNode]) -> Vec<MacroNode> {
    nodes
        .iter()
        .map(|elem| {
            let mut copy = elem.clone();
            if copy.is_macro_group {
                copy.children = reset_edit_mode(&copy.children);
            }
            copy.is_edit_name = false;
            copy
        })
        .collect()
}

// ============================================================================
// Tauri Commands
// ============================================================================

/// Find a node by key anywhere in the tree.
#[tauri::command]
pub fn search_node_cmd(key: String, nodes: Vec<MacroNode>) -> Option<MacroNode> {
    search_node(&key, &nodes).cloned()
}

/// Delete a node by key and return the updated tree, or `None` if the key
/// does not exist.
#[tauri::command]
pub fn delete_node_cmd(key: String, nodes: Vec<MacroNode>) -> Option<Vec<MacroNode>> {
    delete_node(&key, &nodes)
}

/// Replace a node by key and return the updated tree, or `None` if the key
/// does not exist.
#[tauri::command]
pub fn replace_node_cmd(
    key: String,
    new_node: MacroNode,
    nodes: Vec<MacroNode>,
) -> Option<Vec<MacroNode>> {
    replace_node(&key, &new_node, &nodes)
}

/// Flatten the subtree at a key into its macro leaves, e.g. for "send all
/// macros in this group".
#[tauri::command]
pub fn collect_as_list_cmd(key: String, nodes: Vec<MacroNode>) -> Option<Vec<MacroNode>> {
    collect_as_list(&key, &nodes)
}

/// Clear the rename flag on every node.
#[tauri::command]
pub fn reset_edit_mode_cmd(nodes: Vec<MacroNode>) -> Vec<MacroNode> {
    reset_edit_mode(&nodes)
}

/// Load the persisted macro tree.
#[tauri::command]
pub fn load_macros() -> Vec<MacroNode> {
    store::macro_tree()
}

/// Persist the macro tree and notify all windows.
#[tauri::command]
pub fn save_macros(app: AppHandle, nodes: Vec<MacroNode>) -> Result<(), String> {
    store::set_macro_tree(nodes)?;
    let _ = app.emit("ui-state:changed", "macros");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn macro_group(key: &str) -> MacroNode {
        let mut node = MacroNode::group(key, "");
        node.is_edit_name = true;
        node
    }

    fn macro_leaf(key: &str) -> MacroNode {
        MacroNode {
            key: key.to_string(),
            label: String::new(),
            is_macro_group: false,
            is_edit_name: true,
            draggable: true,
            children: Vec::new(),
            data: None,
        }
    }

    // ========================================================================
    // Search Tests
    // ========================================================================

    #[test]
    fn test_search_empty_list() {
        assert_eq!(search_node("1", &[]), None);
    }

    #[test]
    fn test_search_with_one_element() {
        let node = macro_group("1");
        assert_eq!(search_node("1", std::slice::from_ref(&node)), Some(&node));
    }

    #[test]
    fn test_search_with_leading_macro_group() {
        let nodes = vec![macro_group("1"), macro_group("2")];
        assert_eq!(search_node("2", &nodes), Some(&nodes[1]));
    }

    #[test]
    fn test_search_children_of_macro_group() {
        let mut node = macro_group("1");
        node.children = vec![macro_leaf("1-1"), macro_leaf("1-2")];
        let nodes = vec![node];
        assert_eq!(search_node("1-2", &nodes), Some(&nodes[0].children[1]));
    }

    #[test]
    fn test_search_children_of_macro_group_in_list() {
        let mut group = macro_group("3");
        group.children = vec![macro_leaf("3-1"), macro_leaf("3-2")];
        let nodes = vec![macro_group("1"), macro_leaf("2"), group];
        assert_eq!(search_node("3-2", &nodes), Some(&nodes[2].children[1]));
    }

    #[test]
    fn test_search_unknown_element() {
        let mut group = macro_group("3");
        group.children = vec![macro_leaf("3-1"), macro_leaf("3-2")];
        let nodes = vec![macro_group("1"), macro_leaf("2"), group];
        assert_eq!(search_node("3-3", &nodes), None);
    }

    #[test]
    fn test_search_nested_element() {
        let mut nested = macro_group("1-2");
        nested.children = vec![macro_leaf("1-2-1"), macro_leaf("1-2-2")];
        let mut node = macro_group("1");
        node.children = vec![macro_leaf("1-1"), nested.clone()];
        let nodes = vec![node, nested];
        let found = search_node("1-2-2", &nodes).unwrap();
        assert_eq!(found.key, "1-2-2");
    }

    // ========================================================================
    // Delete Tests
    // ========================================================================

    #[test]
    fn test_delete_with_empty_nodes() {
        assert_eq!(delete_node("1", &[]), None);
    }

    #[test]
    fn test_delete_with_one_element() {
        let nodes = vec![macro_group("1")];
        assert_eq!(delete_node("1", &nodes), Some(Vec::new()));
    }

    #[test]
    fn test_delete_with_leading_macro_group_keeps_input_unchanged() {
        let nodes = vec![macro_group("1"), macro_group("2")];
        let snapshot = nodes.clone();
        assert_eq!(delete_node("2", &nodes), Some(vec![macro_group("1")]));
        assert_eq!(nodes, snapshot);
    }

    #[test]
    fn test_delete_children_of_macro_group() {
        let mut node = macro_group("1");
        node.children = vec![macro_leaf("1-1"), macro_leaf("1-2")];
        let nodes = vec![node];
        let snapshot = nodes.clone();

        let mut expected = macro_group("1");
        expected.children = vec![macro_leaf("1-1")];
        assert_eq!(delete_node("1-2", &nodes), Some(vec![expected]));
        assert_eq!(nodes, snapshot);
    }

    #[test]
    fn test_delete_children_of_macro_group_in_list() {
        let mut group = macro_group("3");
        group.children = vec![macro_leaf("3-1"), macro_leaf("3-2")];
        let nodes = vec![macro_group("1"), macro_leaf("2"), group];

        let mut expected_group = macro_group("3");
        expected_group.children = vec![macro_leaf("3-1")];
        let expected = vec![macro_group("1"), macro_leaf("2"), expected_group];
        assert_eq!(delete_node("3-2", &nodes), Some(expected));
    }

    #[test]
    fn test_delete_macro_group_with_children() {
        let mut group = macro_group("3");
        group.children = vec![macro_leaf("3-1"), macro_leaf("3-2")];
        let nodes = vec![macro_group("1"), macro_leaf("2"), group];

        let expected = vec![macro_group("1"), macro_leaf("2")];
        assert_eq!(delete_node("3", &nodes), Some(expected));
    }

    #[test]
    fn test_delete_unknown_element() {
        let mut group = macro_group("3");
        group.children = vec![macro_leaf("3-1"), macro_leaf("3-2")];
        let nodes = vec![macro_group("1"), macro_leaf("2"), group];
        assert_eq!(delete_node("3-3", &nodes), None);
    }

    #[test]
    fn test_delete_nested_element() {
        let mut nested = macro_group("2-2");
        nested.children = vec![macro_leaf("2-2-1"), macro_leaf("2-2-2")];
        let mut node = macro_group("2");
        node.children = vec![macro_leaf("2-1"), nested];
        let nodes = vec![macro_group("1"), node];

        let mut expected_nested = macro_group("2-2");
        expected_nested.children = vec![macro_leaf("2-2-1")];
        let mut expected_node = macro_group("2");
        expected_node.children = vec![macro_leaf("2-1"), expected_nested];
        let expected = vec![macro_group("1"), expected_node];
        assert_eq!(delete_node("2-2-2", &nodes), Some(expected));
    }

    // ========================================================================
    // Replace Tests
    // ========================================================================

    #[test]
    fn test_replace_with_empty_list() {
        assert_eq!(replace_node("1", &macro_leaf("1"), &[]), None);
    }

    #[test]
    fn test_replace_with_one_element() {
        let new_node = macro_group("2");
        assert_eq!(
            replace_node("1", &new_node, &[macro_group("1")]),
            Some(vec![new_node.clone()])
        );
    }

    #[test]
    fn test_replace_with_leading_macro_group_keeps_input_unchanged() {
        let nodes = vec![macro_group("1"), macro_group("2")];
        let snapshot = nodes.clone();
        let expected = vec![macro_group("1"), macro_group("3")];
        assert_eq!(replace_node("2", &macro_group("3"), &nodes), Some(expected));
        assert_eq!(nodes, snapshot);
    }

    #[test]
    fn test_replace_macro_group_with_macro() {
        let nodes = vec![macro_group("1"), macro_group("2")];
        let snapshot = nodes.clone();
        let expected = vec![macro_group("1"), macro_leaf("3")];
        assert_eq!(replace_node("2", &macro_leaf("3"), &nodes), Some(expected));
        assert_eq!(nodes, snapshot);
    }

    #[test]
    fn test_replace_children_of_macro_group() {
        let mut node = macro_group("1");
        node.children = vec![macro_leaf("1-1"), macro_leaf("1-2")];
        let nodes = vec![node];
        let snapshot = nodes.clone();

        let mut expected = macro_group("1");
        expected.children = vec![macro_leaf("1-1"), macro_leaf("1-4")];
        assert_eq!(
            replace_node("1-2", &macro_leaf("1-4"), &nodes),
            Some(vec![expected])
        );
        assert_eq!(nodes, snapshot);
    }

    #[test]
    fn test_replace_first_child_of_macro_group() {
        let mut node = macro_group("1");
        node.children = vec![macro_leaf("1-1"), macro_leaf("1-2")];
        let nodes = vec![node];

        let mut expected = macro_group("1");
        expected.children = vec![macro_leaf("1-4"), macro_leaf("1-2")];
        assert_eq!(
            replace_node("1-1", &macro_leaf("1-4"), &nodes),
            Some(vec![expected])
        );
    }

    #[test]
    fn test_replace_macro_group_with_children() {
        let mut group = macro_group("3");
        group.children = vec![macro_leaf("3-1"), macro_leaf("3-2")];
        let nodes = vec![macro_group("1"), macro_leaf("2"), group];

        let expected = vec![macro_group("1"), macro_leaf("2"), macro_leaf("4")];
        assert_eq!(replace_node("3", &macro_leaf("4"), &nodes), Some(expected));
    }

    #[test]
    fn test_replace_unknown_element() {
        let mut group = macro_group("3");
        group.children = vec![macro_leaf("3-1"), macro_leaf("3-2")];
        let nodes = vec![macro_group("1"), macro_leaf("2"), group];
        assert_eq!(replace_node("3-3", &macro_leaf("2"), &nodes), None);
    }

    #[test]
    fn test_replace_nested_element() {
        let mut nested = macro_group("2-2");
        nested.children = vec![macro_leaf("2-2-1"), macro_leaf("2-2-2")];
        let mut node = macro_group("2");
        node.children = vec![macro_leaf("2-1"), nested];
        let nodes = vec![macro_group("1"), node];

        let mut expected_nested = macro_group("2-2");
        expected_nested.children = vec![macro_leaf("2-2-1"), macro_leaf("2-5-2")];
        let mut expected_node = macro_group("2");
        expected_node.children = vec![macro_leaf("2-1"), expected_nested];
        let expected = vec![macro_group("1"), expected_node];
        assert_eq!(
            replace_node("2-2-2", &macro_leaf("2-5-2"), &nodes),
            Some(expected)
        );
    }

    // ========================================================================
    // Collect Tests
    // ========================================================================

    #[test]
    fn test_collect_with_empty_list() {
        assert_eq!(collect_as_list("1", &[]), None);
    }

    #[test]
    fn test_collect_with_one_element() {
        let node = macro_leaf("1");
        assert_eq!(
            collect_as_list("1", std::slice::from_ref(&node)),
            Some(vec![node.clone()])
        );
    }

    #[test]
    fn test_collect_with_leading_macro_group() {
        let nodes = vec![macro_group("1"), macro_leaf("2")];
        assert_eq!(collect_as_list("2", &nodes), Some(vec![macro_leaf("2")]));
    }

    #[test]
    fn test_collect_children_of_macro_group() {
        let children = vec![macro_leaf("2-1"), macro_leaf("2-2")];
        let mut group = macro_group("2");
        group.children = children.clone();
        let nodes = vec![macro_leaf("1-1"), group];
        assert_eq!(collect_as_list("2", &nodes), Some(children));
    }

    #[test]
    fn test_collect_unknown_element() {
        let mut group = macro_group("3");
        group.children = vec![macro_leaf("3-1"), macro_leaf("3-2")];
        let nodes = vec![macro_group("1"), macro_leaf("2"), group];
        assert_eq!(collect_as_list("3-3", &nodes), None);
    }

    #[test]
    fn test_collect_group_without_children() {
        let nodes = vec![macro_group("1"), macro_leaf("2"), macro_group("3")];
        assert_eq!(collect_as_list("3", &nodes), Some(Vec::new()));
    }

    #[test]
    fn test_collect_group_with_nested_elements() {
        let mut nested = macro_group("2-2");
        nested.children = vec![macro_leaf("2-2-1"), macro_leaf("2-2-2")];
        let mut node = macro_group("2");
        node.children = vec![macro_leaf("2-1"), macro_leaf("2-2"), nested];
        let nodes = vec![macro_group("1"), node];

        let expected = vec![
            macro_leaf("2-1"),
            macro_leaf("2-2"),
            macro_leaf("2-2-1"),
            macro_leaf("2-2-2"),
        ];
        assert_eq!(collect_as_list("2", &nodes), Some(expected));
    }

    // ========================================================================
    // Reset Edit Mode Tests
    // ========================================================================

    #[test]
    fn test_reset_edit_mode_clears_all_depths() {
        let mut nested = macro_group("2-2");
        nested.children = vec![macro_leaf("2-2-1")];
        let mut node = macro_group("2");
        node.children = vec![macro_leaf("2-1"), nested];
        let nodes = vec![macro_leaf("1"), node];
        let snapshot = nodes.clone();

        let reset = reset_edit_mode(&nodes);
        assert!(!reset[0].is_edit_name);
        assert!(!reset[1].is_edit_name);
        assert!(!reset[1].children[0].is_edit_name);
        assert!(!reset[1].children[1].is_edit_name);
        assert!(!reset[1].children[1].children[0].is_edit_name);
        // The input tree still carries its edit flags.
        assert_eq!(nodes, snapshot);
        assert!(nodes[1].children[0].is_edit_name);
    }
}
