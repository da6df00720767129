//! API schema types for request/response definitions.
//!
//! Each sub-module defines the request and response types for one API
//! area. Impact-layer result types that already derive `Serialize` are
//! returned as-is and only re-exported here.

pub mod common;
pub mod impact;
pub mod ingest;
pub mod topology;
