//! Cross-layer impact analysis over the dependency graph.
//!
//! Every operation takes the store as an explicit `&mut S: GraphStore`
//! argument; nothing here holds global state.
//!
//! - [`binding`]: deduplicated Binding creation
//! - [`topology`]: endpoints, network dependencies, SERVES links
//! - [`vulnerability`]: registration and propagation seeding
//! - [`ingest`]: upserts used by graph producers
//! - [`fixture`]: whole-graph JSON fixtures
//! - [`propagation`]: the six-stage mark-and-propagate engine
//! - [`query`]: marked-node and structural queries, Mermaid export

pub mod binding;
pub mod error;
pub mod fixture;
pub mod ingest;
pub mod outcome;
pub mod propagation;
pub mod query;
pub mod topology;
pub mod vulnerability;

pub use binding::{create_binding, Binding, BindingRequest};
pub use error::{ImpactError, PartialFailure, TargetFailure};
pub use fixture::{load_fixture, FixtureSummary, GraphFixture};
pub use outcome::Outcomes;
pub use propagation::{
    PropagationConfig, PropagationReport, Propagator, RunId, Stage, StageReport,
};
pub use query::{BlastRadius, Domain, RemovedNodes};
pub use topology::{
    create_inter_component_dependency, create_serves, upsert_endpoint, DependencyLink, EndpointRef,
};
pub use vulnerability::{create_vulnerability, Registration};
