//! Application state with a shared [`ImpactService`].
//!
//! The service sits behind `Arc<tokio::sync::Mutex<>>`: handlers await the
//! lock without blocking the runtime, and at most one operation touches the
//! store at a time, so two propagation runs never interleave their marks.
//! `rusqlite::Connection` is `!Sync`, which rules out an `RwLock`.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::service::ImpactService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<tokio::sync::Mutex<ImpactService>>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self, ApiError> {
        Ok(Self::from_service(ImpactService::new(config)?))
    }

    /// State over an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, ApiError> {
        Ok(Self::from_service(ImpactService::in_memory()?))
    }

    pub fn from_service(service: ImpactService) -> Self {
        AppState {
            service: Arc::new(tokio::sync::Mutex::new(service)),
        }
    }
}
