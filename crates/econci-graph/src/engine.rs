use crate::product_space::{ItemGraph, ProductSpaceBuilder};
use econci_core::{
    build_flow_matrix, density, distance, diversity, economic_complexity_index,
    product_complexity_index, proximity, revealed_comparative_advantage, specialization_matrix,
    ubiquity, EconCiConfig, EconCiError, LabeledMatrix, LabeledVector, ObservationTable,
    PreconditionError, Result,
};
use tracing::{debug, info, warn};

/// Lifecycle of a [`ComplexityEngine`]. Ordered: later stages imply earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EngineState {
    Uninitialized,
    IndexesComputed,
    ProductSpaceBuilt,
}

#[derive(Debug, Clone, Default)]
struct IndexArtifacts {
    m: Option<LabeledMatrix>,
    rca: Option<LabeledMatrix>,
    m_cp: Option<LabeledMatrix>,
    diversity: Option<LabeledVector>,
    ubiquity: Option<LabeledVector>,
    eci: Option<LabeledVector>,
    pci: Option<LabeledVector>,
    proximity: Option<LabeledMatrix>,
    density: Option<LabeledMatrix>,
    distance: Option<LabeledMatrix>,
}

/// Owns a copy of an observation table and computes, on request, the complexity
/// indexes and the product space graphs derived from it.
///
/// Results are read through accessors that hand out independent copies. Reading a
/// result before the stage producing it has run is a [`PreconditionError`].
#[derive(Debug, Clone)]
pub struct ComplexityEngine {
    table: ObservationTable,
    entity_column: String,
    item_column: String,
    value_column: String,
    m_cp_threshold: f64,
    state: EngineState,
    artifacts: IndexArtifacts,
    graphs: Option<ProductSpaceBuilder>,
    product_space: Option<ItemGraph>,
}

impl ComplexityEngine {
    /// Fails with [`EconCiError::InvalidTable`] when a role column is missing or the
    /// value column is not numeric.
    pub fn new(
        table: &ObservationTable,
        entity_column: &str,
        item_column: &str,
        value_column: &str,
        m_cp_threshold: f64,
    ) -> Result<Self> {
        table.validate_roles(entity_column, item_column, value_column)?;
        debug!(
            "Engine over {} rows (entity='{}', item='{}', value='{}', m_cp threshold={})",
            table.num_rows(),
            entity_column,
            item_column,
            value_column,
            m_cp_threshold
        );

        Ok(Self {
            table: table.clone(),
            entity_column: entity_column.to_string(),
            item_column: item_column.to_string(),
            value_column: value_column.to_string(),
            m_cp_threshold,
            state: EngineState::Uninitialized,
            artifacts: IndexArtifacts::default(),
            graphs: None,
            product_space: None,
        })
    }

    pub fn from_config(table: &ObservationTable, config: &EconCiConfig) -> Result<Self> {
        Self::new(
            table,
            &config.columns.entity,
            &config.columns.item,
            &config.columns.value,
            config.complexity.m_cp_threshold,
        )
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn m_cp_threshold(&self) -> f64 {
        self.m_cp_threshold
    }

    /// Runs every index stage from the flow matrix through distance.
    ///
    /// Previously built graphs are discarded. On failure the stages that completed
    /// stay readable and the engine is left `Uninitialized`.
    pub fn calculate_indexes(&mut self) -> Result<()> {
        self.state = EngineState::Uninitialized;
        self.artifacts = IndexArtifacts::default();
        self.graphs = None;
        self.product_space = None;

        if let Err(e) = self.run_index_stages() {
            warn!("Index computation stopped: {}", e);
            return Err(e);
        }

        self.state = EngineState::IndexesComputed;
        if let Some(m_cp) = &self.artifacts.m_cp {
            let (entities, items) = m_cp.shape();
            info!(
                "Computed complexity indexes for {} entities and {} items",
                entities, items
            );
        }
        Ok(())
    }

    fn run_index_stages(&mut self) -> Result<()> {
        let threshold = self.m_cp_threshold;
        let artifacts = &mut self.artifacts;

        let m = artifacts.m.insert(build_flow_matrix(
            &self.table,
            &self.entity_column,
            &self.item_column,
            &self.value_column,
        )?);
        let rca = artifacts.rca.insert(revealed_comparative_advantage(m));
        let m_cp = artifacts
            .m_cp
            .insert(specialization_matrix(rca, threshold));
        let k_c = artifacts.diversity.insert(diversity(m_cp));
        let k_p = artifacts.ubiquity.insert(ubiquity(m_cp));

        artifacts.eci = Some(economic_complexity_index(m_cp, k_c, k_p)?);
        artifacts.pci = Some(product_complexity_index(m_cp, k_c, k_p)?);

        let phi = artifacts.proximity.insert(proximity(m_cp, k_p));
        let dens = artifacts.density.insert(density(m_cp, phi));
        artifacts.distance = Some(distance(dens));
        Ok(())
    }

    /// Builds the complete graph and maximum spanning tree on first use, then the
    /// product space for `edge_weight_threshold`. Calling again with another
    /// threshold reuses the first two graphs.
    pub fn create_product_space(&mut self, edge_weight_threshold: f64) -> Result<()> {
        if self.state < EngineState::IndexesComputed {
            return Err(PreconditionError::IndexesNotComputed.into());
        }
        let phi = self
            .artifacts
            .proximity
            .as_ref()
            .ok_or(PreconditionError::IndexesNotComputed)?;

        let graphs = self
            .graphs
            .get_or_insert_with(|| ProductSpaceBuilder::from_proximity(phi));
        let space = graphs.product_space(edge_weight_threshold);
        info!(
            "Product space over {} items has {} edges (threshold {})",
            space.node_count(),
            space.edge_count(),
            edge_weight_threshold
        );

        self.product_space = Some(space);
        self.state = EngineState::ProductSpaceBuilt;
        Ok(())
    }

    pub fn m(&self) -> Result<LabeledMatrix> {
        computed(&self.artifacts.m)
    }

    pub fn rca(&self) -> Result<LabeledMatrix> {
        computed(&self.artifacts.rca)
    }

    pub fn m_cp(&self) -> Result<LabeledMatrix> {
        computed(&self.artifacts.m_cp)
    }

    pub fn diversity(&self) -> Result<LabeledVector> {
        computed(&self.artifacts.diversity)
    }

    pub fn ubiquity(&self) -> Result<LabeledVector> {
        computed(&self.artifacts.ubiquity)
    }

    pub fn eci(&self) -> Result<LabeledVector> {
        computed(&self.artifacts.eci)
    }

    pub fn pci(&self) -> Result<LabeledVector> {
        computed(&self.artifacts.pci)
    }

    pub fn proximity(&self) -> Result<LabeledMatrix> {
        computed(&self.artifacts.proximity)
    }

    pub fn density(&self) -> Result<LabeledMatrix> {
        computed(&self.artifacts.density)
    }

    pub fn distance(&self) -> Result<LabeledMatrix> {
        computed(&self.artifacts.distance)
    }

    pub fn complete_graph(&self) -> Result<ItemGraph> {
        self.graphs
            .as_ref()
            .map(|g| g.complete_graph().clone())
            .ok_or_else(|| PreconditionError::ProductSpaceNotBuilt.into())
    }

    pub fn maxst(&self) -> Result<ItemGraph> {
        self.graphs
            .as_ref()
            .map(|g| g.maxst().clone())
            .ok_or_else(|| PreconditionError::ProductSpaceNotBuilt.into())
    }

    pub fn product_space(&self) -> Result<ItemGraph> {
        self.product_space
            .clone()
            .ok_or_else(|| PreconditionError::ProductSpaceNotBuilt.into())
    }
}

fn computed<T: Clone>(slot: &Option<T>) -> Result<T> {
    slot.clone()
        .ok_or(EconCiError::Precondition(PreconditionError::IndexesNotComputed))
}
