//! Accessibility-tree snapshot rendering.
//!
//! Turns `Accessibility.getFullAXTree` output into an indented text outline,
//! one line per interesting node: `- role "name"`.

use std::collections::HashMap;

use serde_json::Value;

/// Roles that carry no information of their own; their children are promoted
/// to the parent's depth.
const GENERIC_ROLES: &[&str] = &["none", "generic", "InlineTextBox", "LineBreak"];

/// Renders the AX tree result into an indented outline.
pub fn render(tree: &Value) -> String {
	let Some(nodes) = tree.get("nodes").and_then(Value::as_array) else {
		return String::new();
	};

	let by_id: HashMap<&str, &Value> = nodes
		.iter()
		.filter_map(|node| node.get("nodeId").and_then(Value::as_str).map(|id| (id, node)))
		.collect();

	let root = nodes.iter().find(|node| node.get("parentId").is_none());
	let mut out = String::new();
	if let Some(root) = root {
		render_node(root, &by_id, 0, &mut out);
	}
	out
}

fn render_node(node: &Value, by_id: &HashMap<&str, &Value>, depth: usize, out: &mut String) {
	let ignored = node.get("ignored").and_then(Value::as_bool).unwrap_or(false);
	let role = node
		.get("role")
		.and_then(|r| r.get("value"))
		.and_then(Value::as_str)
		.unwrap_or("");
	let name = node
		.get("name")
		.and_then(|n| n.get("value"))
		.and_then(Value::as_str)
		.unwrap_or("");

	let mut child_depth = depth;
	if !ignored && !GENERIC_ROLES.contains(&role) && !role.is_empty() {
		out.push_str(&"  ".repeat(depth));
		out.push_str("- ");
		out.push_str(role);
		if !name.is_empty() {
			out.push_str(" \"");
			out.push_str(name);
			out.push('"');
		}
		out.push('\n');
		child_depth = depth + 1;
	}

	if let Some(child_ids) = node.get("childIds").and_then(Value::as_array) {
		for child_id in child_ids.iter().filter_map(Value::as_str) {
			if let Some(child) = by_id.get(child_id) {
				render_node(child, by_id, child_depth, out);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn renders_indented_roles_with_names() {
		let tree = json!({
			"nodes": [
				{
					"nodeId": "1",
					"role": { "value": "RootWebArea" },
					"name": { "value": "Example" },
					"childIds": ["2", "3"]
				},
				{
					"nodeId": "2",
					"parentId": "1",
					"role": { "value": "heading" },
					"name": { "value": "Hello" },
					"childIds": []
				},
				{
					"nodeId": "3",
					"parentId": "1",
					"role": { "value": "generic" },
					"childIds": ["4"]
				},
				{
					"nodeId": "4",
					"parentId": "3",
					"role": { "value": "button" },
					"name": { "value": "Go" },
					"childIds": []
				}
			]
		});

		let text = render(&tree);
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines[0], "- RootWebArea \"Example\"");
		assert_eq!(lines[1], "  - heading \"Hello\"");
		// generic wrapper is elided; button stays at the wrapper's depth
		assert_eq!(lines[2], "  - button \"Go\"");
	}

	#[test]
	fn ignored_nodes_are_skipped_but_children_kept() {
		let tree = json!({
			"nodes": [
				{
					"nodeId": "1",
					"role": { "value": "RootWebArea" },
					"childIds": ["2"]
				},
				{
					"nodeId": "2",
					"parentId": "1",
					"ignored": true,
					"role": { "value": "paragraph" },
					"childIds": ["3"]
				},
				{
					"nodeId": "3",
					"parentId": "2",
					"role": { "value": "link" },
					"name": { "value": "docs" },
					"childIds": []
				}
			]
		});

		let text = render(&tree);
		assert!(!text.contains("paragraph"));
		assert!(text.contains("- link \"docs\""));
	}

	#[test]
	fn empty_tree_renders_empty() {
		assert_eq!(render(&json!({})), "");
	}
}
