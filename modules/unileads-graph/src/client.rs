use std::future::Future;
use std::time::Duration;

use neo4rs::{ConfigBuilder, Graph};

use unileads_common::UnileadsError;

/// Per-call timeout applied to every store round trip when the caller does
/// not configure one.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin wrapper around neo4rs::Graph providing connection setup and the
/// per-call timeout every store operation runs under.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
    timeout: Duration,
}

impl GraphClient {
    /// Connect to Neo4j with the given credentials and the default timeout.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, UnileadsError> {
        Self::connect_with_timeout(uri, user, password, DEFAULT_STORE_TIMEOUT).await
    }

    pub async fn connect_with_timeout(
        uri: &str,
        user: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, UnileadsError> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .fetch_size(500)
            .max_connections(10)
            .build()
            .map_err(|e| UnileadsError::Config(format!("bad neo4j config: {e}")))?;
        let graph = Graph::connect(config)
            .await
            .map_err(|e| UnileadsError::Database(format!("connect failed: {e}")))?;
        Ok(Self { graph, timeout })
    }

    /// Get a reference to the underlying neo4rs Graph.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }

    /// Run a store operation under the per-call timeout, classifying the
    /// failure: elapsed timer -> `Timeout`, transient write race ->
    /// `Conflict` (retryable), anything else -> `Database`.
    pub(crate) async fn timed<T, F>(&self, op: &'static str, fut: F) -> Result<T, UnileadsError>
    where
        F: Future<Output = Result<T, neo4rs::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(classify(op, e)),
            Err(_) => Err(UnileadsError::Timeout(format!(
                "{op} exceeded {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

/// Map a driver error to the engine taxonomy. Neo4j signals transient
/// lock/merge races with "Transient"-class status codes; those are the only
/// failures callers should retry.
fn classify(op: &str, e: neo4rs::Error) -> UnileadsError {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("transient") || lower.contains("deadlock") {
        UnileadsError::Conflict(format!("{op}: {msg}"))
    } else {
        UnileadsError::Database(format!("{op}: {msg}"))
    }
}
