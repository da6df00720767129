//! Server configuration read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `BLASTGRAPH_DB_PATH` | `blastgraph.db` |
//! | `BLASTGRAPH_PORT` | `3000` |
//! | `BLASTGRAPH_RETRY_ATTEMPTS` | `3` |
//! | `BLASTGRAPH_RETRY_BACKOFF_MS` | `300` |
//! | `BLASTGRAPH_CONVERGE` | `false` |
//! | `BLASTGRAPH_DEADLINE_MS` | unset |

use std::str::FromStr;

use blastgraph_impact::PropagationConfig;
use blastgraph_storage::RetryPolicy;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_path: String,
    pub port: u16,
    pub retry: RetryPolicy,
    pub propagation: PropagationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            db_path: "blastgraph.db".to_string(),
            port: 3000,
            retry: RetryPolicy::default(),
            propagation: PropagationConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from `lookup`, falling back to defaults for unset
    /// variables. Unparseable values are rejected.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut config = ServerConfig::default();
        if let Some(path) = lookup("BLASTGRAPH_DB_PATH") {
            config.db_path = path;
        }
        if let Some(port) = parse(&lookup, "BLASTGRAPH_PORT")? {
            config.port = port;
        }
        if let Some(attempts) = parse(&lookup, "BLASTGRAPH_RETRY_ATTEMPTS")? {
            config.retry.max_retries = attempts;
        }
        if let Some(backoff) = parse(&lookup, "BLASTGRAPH_RETRY_BACKOFF_MS")? {
            config.retry.initial_backoff_ms = backoff;
        }
        if let Some(converge) = parse(&lookup, "BLASTGRAPH_CONVERGE")? {
            config.propagation.converge = converge;
        }
        config.propagation.deadline_ms = parse(&lookup, "BLASTGRAPH_DEADLINE_MS")?;
        Ok(config)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ApiError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("invalid value for {name}: '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.propagation.deadline_ms, None);
    }

    #[test]
    fn overrides_from_environment() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BLASTGRAPH_DB_PATH", "/tmp/g.db"),
            ("BLASTGRAPH_PORT", "8080"),
            ("BLASTGRAPH_RETRY_ATTEMPTS", "5"),
            ("BLASTGRAPH_RETRY_BACKOFF_MS", "50"),
            ("BLASTGRAPH_CONVERGE", "true"),
            ("BLASTGRAPH_DEADLINE_MS", "1500"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, "/tmp/g.db");
        assert_eq!(config.port, 8080);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_backoff_ms, 50);
        assert!(config.propagation.converge);
        assert_eq!(config.propagation.deadline_ms, Some(1500));
    }

    #[test]
    fn rejects_garbage() {
        let err = ServerConfig::from_lookup(lookup(&[("BLASTGRAPH_PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("BLASTGRAPH_PORT"));
    }
}
