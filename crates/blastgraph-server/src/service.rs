//! ImpactService: the single coordinator between HTTP handlers and the
//! impact crate.
//!
//! Owns the retrying SQLite store and the default propagation options.
//! Handlers stay thin wrappers around these methods.

use blastgraph_core::{ArtifactRef, NodeId, NodeKind};
use blastgraph_impact::fixture::{load_fixture, FixtureSummary, GraphFixture};
use blastgraph_impact::ingest::{self, LibraryUpsert};
use blastgraph_impact::query::{self, BlastRadius, ComponentView, Domain, LibraryView, RemovedNodes};
use blastgraph_impact::{
    create_binding, create_inter_component_dependency, create_serves, create_vulnerability,
    upsert_endpoint, Binding, BindingRequest, DependencyLink, EndpointRef, PropagationConfig,
    PropagationReport, Propagator, Registration,
};
use blastgraph_storage::{RetryPolicy, RetryingStore, SqliteStore};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::schema::impact::{PropagationRequest, VulnerabilityRequest};
use crate::schema::ingest::{CallGraphRequest, HostingRequest, LibraryRequest, SystemRequest};
use crate::schema::topology::{NetworkDependencyRequest, ServesRequest};

pub struct ImpactService {
    store: RetryingStore<SqliteStore>,
    propagation: PropagationConfig,
}

impl ImpactService {
    /// Opens (or creates) the database named by `config`.
    pub fn new(config: &ServerConfig) -> Result<Self, ApiError> {
        let store = SqliteStore::new(&config.db_path)?;
        Ok(Self::with_store(store, config.retry.clone(), config.propagation.clone()))
    }

    /// A service over an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, ApiError> {
        Ok(Self::with_store(
            SqliteStore::in_memory()?,
            RetryPolicy::default(),
            PropagationConfig::default(),
        ))
    }

    pub fn with_store(store: SqliteStore, retry: RetryPolicy, propagation: PropagationConfig) -> Self {
        ImpactService {
            store: RetryingStore::new(store, retry),
            propagation,
        }
    }

    pub fn propagation_config(&self) -> &PropagationConfig {
        &self.propagation
    }

    // -- ingestion ---------------------------------------------------------

    pub fn upsert_library(&mut self, req: &LibraryRequest) -> Result<LibraryUpsert, ApiError> {
        Ok(ingest::upsert_library(&mut self.store, &req.library, &req.symbols)?)
    }

    pub fn upsert_component(&mut self, component: &ArtifactRef) -> Result<NodeId, ApiError> {
        Ok(ingest::upsert_component(&mut self.store, component)?)
    }

    pub fn upsert_asset(&mut self, asset: &ArtifactRef) -> Result<NodeId, ApiError> {
        Ok(ingest::upsert_asset(&mut self.store, asset)?)
    }

    pub fn upsert_system(&mut self, req: &SystemRequest) -> Result<NodeId, ApiError> {
        Ok(ingest::upsert_system(&mut self.store, &req.name, &req.components)?)
    }

    pub fn host_component(&mut self, req: &HostingRequest) -> Result<bool, ApiError> {
        Ok(ingest::host_component(&mut self.store, &req.component, &req.asset)?)
    }

    pub fn add_call_graph_dependencies(
        &mut self,
        req: &CallGraphRequest,
    ) -> Result<DependencyLink, ApiError> {
        Ok(ingest::add_call_graph_dependencies(
            &mut self.store,
            &req.caller,
            &req.callees,
        )?)
    }

    pub fn load_fixture(&mut self, fixture: &GraphFixture) -> Result<FixtureSummary, ApiError> {
        Ok(load_fixture(&mut self.store, fixture)?)
    }

    // -- topology ----------------------------------------------------------

    pub fn upsert_endpoint(&mut self, endpoint: &EndpointRef) -> Result<NodeId, ApiError> {
        Ok(upsert_endpoint(&mut self.store, endpoint)?)
    }

    pub fn create_inter_component_dependency(
        &mut self,
        req: &NetworkDependencyRequest,
    ) -> Result<DependencyLink, ApiError> {
        Ok(create_inter_component_dependency(
            &mut self.store,
            &req.caller,
            &req.callees,
        )?)
    }

    pub fn create_serves(&mut self, req: &ServesRequest) -> Result<bool, ApiError> {
        Ok(create_serves(&mut self.store, &req.endpoint, &req.symbol)?)
    }

    // -- impact ------------------------------------------------------------

    pub fn create_binding(&mut self, req: &BindingRequest) -> Result<Binding, ApiError> {
        Ok(create_binding(&mut self.store, req)?)
    }

    pub fn create_vulnerability(
        &mut self,
        req: &VulnerabilityRequest,
    ) -> Result<Registration, ApiError> {
        Ok(create_vulnerability(
            &mut self.store,
            req.identity.as_deref(),
            &req.symbol,
        )?)
    }

    /// Runs propagation with the request's options layered over the
    /// configured defaults.
    pub fn run_propagation(
        &mut self,
        req: &PropagationRequest,
    ) -> Result<PropagationReport, ApiError> {
        let config = PropagationConfig {
            converge: req.converge.unwrap_or(self.propagation.converge),
            deadline_ms: req.deadline_ms.or(self.propagation.deadline_ms),
        };
        let mut propagator = Propagator::new(&mut self.store, config);
        let report = if req.from_current_marks {
            propagator.propagate()?
        } else {
            propagator.run(req.identity.as_deref())?
        };
        Ok(report)
    }

    // -- queries -----------------------------------------------------------

    pub fn marked(&self, kind: NodeKind) -> Result<Vec<NodeId>, ApiError> {
        Ok(query::marked(&self.store, kind)?)
    }

    pub fn blast_radius(&self) -> Result<BlastRadius, ApiError> {
        Ok(query::blast_radius(&self.store)?)
    }

    pub fn library(&self, library: &ArtifactRef) -> Result<LibraryView, ApiError> {
        Ok(query::library(&self.store, library)?)
    }

    pub fn component(&self, component: &ArtifactRef) -> Result<ComponentView, ApiError> {
        Ok(query::component(&self.store, component)?)
    }

    pub fn callees(&self, symbol: &str) -> Result<Vec<String>, ApiError> {
        Ok(query::callees(&self.store, symbol)?)
    }

    pub fn export_mermaid(&self) -> Result<String, ApiError> {
        Ok(query::export_mermaid(&self.store)?)
    }

    pub fn reset_marks(&mut self) -> Result<usize, ApiError> {
        Ok(query::reset_marks(&mut self.store)?)
    }

    pub fn reset(&mut self) -> Result<(), ApiError> {
        Ok(query::reset(&mut self.store)?)
    }

    pub fn reset_domain(&mut self, domain: Domain) -> Result<RemovedNodes, ApiError> {
        Ok(query::reset_domain(&mut self.store, domain)?)
    }
}
