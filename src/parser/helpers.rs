//
//  helpers.rs
//  Atlas
//

use tree_sitter::Node;

/// Get the full text of a node.
pub fn node_text(node: &Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}

/// Text with all whitespace removed (`java.util . List` -> `java.util.List`).
pub fn compact_text(node: &Node, source: &[u8]) -> String {
    node.utf8_text(source)
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// 1-based start line.
pub fn line_of(node: &Node) -> usize {
    node.start_position().row + 1
}

pub fn is_comment(node: &Node) -> bool {
    matches!(node.kind(), "line_comment" | "block_comment")
}

/// Named children, comments skipped.
pub fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !is_comment(c))
        .collect()
}

/// All children including anonymous keyword tokens.
pub fn children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// First named child of the given kind.
pub fn child_of_kind<'t>(node: &Node<'t>, kind: &str) -> Option<Node<'t>> {
    named_children(node).into_iter().find(|c| c.kind() == kind)
}

/// All children reachable through a field name.
pub fn field_children<'t>(node: &Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// Strip Java string literal quotes, including text blocks.
pub fn unquote(literal: &str) -> String {
    let trimmed = literal.trim();
    if let Some(inner) = trimmed
        .strip_prefix("\"\"\"")
        .and_then(|s| s.strip_suffix("\"\"\""))
    {
        return inner.trim().to_string();
    }
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

/// Drop `<...>` sections from a compact type name (`Outer<T>.Inner` -> `Outer.Inner`).
pub fn strip_generics(name: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"/api\""), "/api");
        assert_eq!(unquote("\"\"\"\n  select 1\n\"\"\""), "select 1");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_strip_generics() {
        assert_eq!(strip_generics("Outer<String>.Inner"), "Outer.Inner");
        assert_eq!(strip_generics("Map<K,List<V>>"), "Map");
    }
}
