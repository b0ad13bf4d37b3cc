use econci_core::LabeledMatrix;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use tracing::debug;

/// Undirected item graph; node weights are item labels, edge weights are proximities.
pub type ItemGraph = UnGraph<String, f64>;

/// Complete graph and maximum spanning tree of a proximity matrix, kept so the product
/// space can be rebuilt for any edge-weight threshold without recomputing either.
///
/// All three graphs share node indices: node `i` is item `i` of the proximity matrix.
#[derive(Debug, Clone)]
pub struct ProductSpaceBuilder {
    complete: ItemGraph,
    maxst: ItemGraph,
}

impl ProductSpaceBuilder {
    pub fn from_proximity(proximity: &LabeledMatrix) -> Self {
        let complete = complete_graph(proximity);
        let maxst = maximum_spanning_tree(&complete);
        debug!(
            "Built complete graph ({} nodes, {} edges) and MST ({} edges)",
            complete.node_count(),
            complete.edge_count(),
            maxst.edge_count()
        );
        Self { complete, maxst }
    }

    pub fn complete_graph(&self) -> &ItemGraph {
        &self.complete
    }

    pub fn maxst(&self) -> &ItemGraph {
        &self.maxst
    }

    /// The MST plus every other complete-graph edge whose weight is strictly above
    /// `edge_weight_threshold`.
    pub fn product_space(&self, edge_weight_threshold: f64) -> ItemGraph {
        let mut graph = self.maxst.clone();
        for edge in self.complete.edge_references() {
            let weight = *edge.weight();
            if weight > edge_weight_threshold
                && graph.find_edge(edge.source(), edge.target()).is_none()
            {
                graph.add_edge(edge.source(), edge.target(), weight);
            }
        }
        debug!(
            "Product space at threshold {}: {} edges ({} beyond the MST)",
            edge_weight_threshold,
            graph.edge_count(),
            graph.edge_count() - self.maxst.edge_count()
        );
        graph
    }
}

/// One node per item and one edge per item pair with non-zero proximity.
pub fn complete_graph(proximity: &LabeledMatrix) -> ItemGraph {
    let n = proximity.rows.len();
    let mut graph = ItemGraph::with_capacity(n, n * n.saturating_sub(1) / 2);
    let nodes: Vec<NodeIndex> = proximity
        .rows
        .iter()
        .map(|label| graph.add_node(label.clone()))
        .collect();

    for p in 0..n {
        for q in (p + 1)..n {
            let weight = proximity.values[[p, q]];
            if weight != 0.0 {
                graph.add_edge(nodes[p], nodes[q], weight);
            }
        }
    }
    graph
}

/// Kruskal's algorithm over edges sorted by descending weight. Ties keep insertion order,
/// NaN-weighted edges are never selected, and a disconnected input yields a spanning
/// forest. Every node of `graph` is kept.
pub fn maximum_spanning_tree(graph: &ItemGraph) -> ItemGraph {
    let mut tree = ItemGraph::with_capacity(graph.node_count(), graph.node_count());
    for node in graph.node_indices() {
        tree.add_node(graph[node].clone());
    }

    let mut edges: Vec<_> = graph
        .edge_references()
        .filter(|e| !e.weight().is_nan())
        .collect();
    edges.sort_by(|a, b| b.weight().total_cmp(a.weight()));

    let mut components = UnionFind::<usize>::new(graph.node_count());
    for edge in edges {
        if components.union(edge.source().index(), edge.target().index()) {
            tree.add_edge(edge.source(), edge.target(), *edge.weight());
        }
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labels(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("P{}", i)).collect()
    }

    fn weighted_square() -> LabeledMatrix {
        // P1-P2 0.9, P2-P3 0.7, P3-P4 0.8, P4-P1 0.3, P1-P3 0.66
        LabeledMatrix::new(
            labels(4),
            labels(4),
            array![
                [0.0, 0.9, 0.66, 0.3],
                [0.9, 0.0, 0.7, 0.0],
                [0.66, 0.7, 0.0, 0.8],
                [0.3, 0.0, 0.8, 0.0]
            ],
        )
    }

    fn has_edge(graph: &ItemGraph, a: usize, b: usize) -> bool {
        graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .is_some()
    }

    #[test]
    fn test_complete_graph_skips_zero_proximity() {
        let graph = complete_graph(&weighted_square());
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 5);
        assert!(!has_edge(&graph, 1, 3));
        assert_eq!(graph[NodeIndex::new(2)], "P3");
    }

    #[test]
    fn test_maximum_spanning_tree_picks_heaviest_edges() {
        let tree = maximum_spanning_tree(&complete_graph(&weighted_square()));
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.edge_count(), 3);
        assert!(has_edge(&tree, 0, 1));
        assert!(has_edge(&tree, 2, 3));
        assert!(has_edge(&tree, 1, 2));
        let total: f64 = tree.edge_weights().sum();
        assert!((total - 2.4).abs() < 1e-12);
    }

    #[test]
    fn test_disconnected_input_gives_forest() {
        let proximity = LabeledMatrix::new(
            labels(4),
            labels(4),
            array![
                [0.0, 0.5, 0.0, 0.0],
                [0.5, 0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 0.0]
            ],
        );
        let tree = maximum_spanning_tree(&complete_graph(&proximity));
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.edge_count(), 1);
    }

    #[test]
    fn test_product_space_threshold_is_strict() {
        let builder = ProductSpaceBuilder::from_proximity(&weighted_square());

        let space = builder.product_space(0.65);
        assert_eq!(space.edge_count(), 4);
        assert!(has_edge(&space, 0, 2));
        assert!(!has_edge(&space, 0, 3));

        assert_eq!(builder.product_space(0.66).edge_count(), 3);
        assert_eq!(builder.product_space(0.0).edge_count(), 5);
        // The cached graphs are untouched by thresholding.
        assert_eq!(builder.maxst().edge_count(), 3);
        assert_eq!(builder.complete_graph().edge_count(), 5);
    }
}
