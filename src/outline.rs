use std::fmt::Write;

use kava_ast::{Node, NodeKind};

/// An indented dump of constructed nodes, one per line with the slot it
/// occupies and its source text for leaves.
pub fn outline(source: &str, nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, source, node, None, 0);
    }
    out
}

fn write_node(out: &mut String, source: &str, node: &Node, slot: Option<String>, depth: usize) {
    let indent = "  ".repeat(depth);
    let slot = slot.map(|s| format!("{s}: ")).unwrap_or_default();
    let _ = write!(out, "{indent}{slot}{} @{}", node.label(), node.span);
    let detail = match &node.kind {
        NodeKind::Function(function) => Some(function.signature()),
        NodeKind::Declaration(declaration) => Some(format!("{} {}", declaration.ty, declaration.name)),
        _ if node.slots().is_empty() => source
            .get(node.span.start..node.span.end)
            .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" ")),
        _ => None,
    };
    if let Some(detail) = detail {
        let _ = write!(out, " `{detail}`");
    }
    out.push('\n');
    for (slot, child) in node.slots() {
        write_node(out, source, child, Some(slot.to_string()), depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_nodes_are_indented() {
        let source = "int x = 1 + 2;";
        let nodes = crate::parse(source).unwrap();
        let shape: Vec<String> = outline(source, &nodes)
            .lines()
            .map(|line| {
                let (head, tail) = line.split_once(" @").unwrap();
                let detail = tail.split_once(' ').map(|(_, d)| d).unwrap_or("");
                format!("{head} {detail}").trim_end().to_string()
            })
            .collect();
        insta::assert_snapshot!(shape.join("\n"), @r"
        assignment
          an assignment target: declaration `int x`
          an expression: binary operator
            an expression: literal `1`
            an expression: literal `2`
        ");
    }
}
