//! Mermaid flowchart rendering of a [`DependencyGraph`].
//!
//! Marked nodes are assigned the `marked` class so a propagation result can
//! be read straight off the diagram.

use std::fmt::Write;

use crate::graph::DependencyGraph;

/// Renders the graph as a Mermaid `flowchart TD` document.
pub fn to_mermaid(graph: &DependencyGraph) -> String {
    let mut out = String::from("flowchart TD\n");
    let mut marked = Vec::new();

    for (id, record) in graph.nodes() {
        let label = escape(&record.node.display_label());
        let _ = writeln!(out, "    n{id}[\"{label}\"]");
        if record.marked {
            marked.push(format!("n{id}"));
        }
    }
    for (source, relation, target) in graph.edges() {
        let _ = writeln!(out, "    n{source} -->|{relation}| n{target}");
    }
    if !marked.is_empty() {
        out.push_str("    classDef marked fill:#f66,stroke:#900,color:#fff\n");
        let _ = writeln!(out, "    class {} marked", marked.join(","));
    }
    out
}

fn escape(label: &str) -> String {
    label.replace('"', "#quot;")
}
