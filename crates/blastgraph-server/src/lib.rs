//! HTTP/JSON API over the blastgraph impact engine.
//!
//! Graph producers post libraries, components, endpoints and bindings;
//! security tooling registers vulnerabilities, starts propagation runs and
//! reads the resulting blast radius.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod schema;
pub mod service;
pub mod state;
