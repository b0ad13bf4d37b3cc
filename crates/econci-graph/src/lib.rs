pub mod engine;
pub mod export;
pub mod product_space;

pub use engine::{ComplexityEngine, EngineState};
pub use export::{edges_nodes_to_csv, ExportedGraph};
pub use product_space::{complete_graph, maximum_spanning_tree, ItemGraph, ProductSpaceBuilder};
