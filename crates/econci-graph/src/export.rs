use crate::product_space::ItemGraph;
use econci_core::Result;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Serialize)]
struct NodeRecord<'a> {
    id: usize,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct EdgeRecord {
    source: usize,
    target: usize,
    weight: f64,
}

/// Paths of the two files written by [`edges_nodes_to_csv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedGraph {
    pub edges_path: PathBuf,
    pub nodes_path: PathBuf,
}

/// Writes `<dir>/<graph_name>_edges.csv` (`source,target,weight`) and
/// `<dir>/<graph_name>_nodes.csv` (`id,name`). Edges reference nodes by integer id.
///
/// `dir` must already exist. Header rows are written even for an edgeless graph.
pub fn edges_nodes_to_csv(
    graph: &ItemGraph,
    graph_name: &str,
    dir: impl AsRef<Path>,
) -> Result<ExportedGraph> {
    let dir = dir.as_ref();
    let nodes_path = dir.join(format!("{}_nodes.csv", graph_name));
    let edges_path = dir.join(format!("{}_edges.csv", graph_name));

    let mut nodes = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&nodes_path)?;
    nodes.write_record(["id", "name"])?;
    for index in graph.node_indices() {
        nodes.serialize(NodeRecord {
            id: index.index(),
            name: &graph[index],
        })?;
    }
    nodes.flush()?;

    let mut edges = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&edges_path)?;
    edges.write_record(["source", "target", "weight"])?;
    for edge in graph.edge_references() {
        edges.serialize(EdgeRecord {
            source: edge.source().index(),
            target: edge.target().index(),
            weight: *edge.weight(),
        })?;
    }
    edges.flush()?;

    info!(
        "Exported {} nodes and {} edges of '{}' to {}",
        graph.node_count(),
        graph.edge_count(),
        graph_name,
        dir.display()
    );
    Ok(ExportedGraph {
        edges_path,
        nodes_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_writes_both_files() {
        let mut graph = ItemGraph::default();
        let a = graph.add_node("P1".to_string());
        let b = graph.add_node("P2".to_string());
        graph.add_node("P3".to_string());
        graph.add_edge(a, b, 0.75);

        let dir = TempDir::new().unwrap();
        let exported = edges_nodes_to_csv(&graph, "maxst", dir.path()).unwrap();

        assert_eq!(exported.nodes_path, dir.path().join("maxst_nodes.csv"));
        let nodes = std::fs::read_to_string(&exported.nodes_path).unwrap();
        assert_eq!(nodes, "id,name\n0,P1\n1,P2\n2,P3\n");
        let edges = std::fs::read_to_string(&exported.edges_path).unwrap();
        assert_eq!(edges, "source,target,weight\n0,1,0.75\n");
    }

    #[test]
    fn test_export_edgeless_graph_keeps_headers() {
        let mut graph = ItemGraph::default();
        graph.add_node("only".to_string());

        let dir = TempDir::new().unwrap();
        let exported = edges_nodes_to_csv(&graph, "g", dir.path()).unwrap();
        let edges = std::fs::read_to_string(&exported.edges_path).unwrap();
        assert_eq!(edges, "source,target,weight\n");
    }

    #[test]
    fn test_export_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(edges_nodes_to_csv(&ItemGraph::default(), "g", missing).is_err());
    }
}
