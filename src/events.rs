//! Deployment audit events. Sinks are fire-and-forget: an unavailable
//! event store degrades to a log line, never to a failed deployment.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentPhase {
    Requested,
    Mapping,
    KeyResolution,
    GasEstimation,
    Deploying,
    Initializing,
    AttachingModules,
    ApplyingConfiguration,
    Confirmed,
    Failed,
}

impl DeploymentPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Mapping => "mapping",
            Self::KeyResolution => "key-resolution",
            Self::GasEstimation => "gas-estimation",
            Self::Deploying => "deploying",
            Self::Initializing => "initializing",
            Self::AttachingModules => "attaching-modules",
            Self::ApplyingConfiguration => "applying-configuration",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
}

impl EventSeverity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeploymentEvent {
    pub token_id: String,
    pub user_id: Option<String>,
    pub phase: DeploymentPhase,
    pub severity: EventSeverity,
    pub detail: Option<String>,
}

impl DeploymentEvent {
    pub fn info(token_id: &str, phase: DeploymentPhase) -> Self {
        Self {
            token_id: token_id.to_owned(),
            user_id: None,
            phase,
            severity: EventSeverity::Info,
            detail: None,
        }
    }

    pub fn failure(token_id: &str, phase: DeploymentPhase, detail: String) -> Self {
        Self {
            token_id: token_id.to_owned(),
            user_id: None,
            phase,
            severity: EventSeverity::Error,
            detail: Some(detail),
        }
    }

    pub fn with_user(mut self, user_id: Option<&str>) -> Self {
        self.user_id = user_id.map(str::to_owned);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[async_trait]
pub trait DeploymentEventSink: Send + Sync {
    async fn record(&self, event: DeploymentEvent);
}

/// Writes events to the `deployment_events` table. Insert failures are
/// logged and swallowed.
#[derive(Debug, Clone)]
pub struct SqliteEventSink {
    pool: SqlitePool,
}

impl SqliteEventSink {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeploymentEventSink for SqliteEventSink {
    async fn record(&self, event: DeploymentEvent) {
        let result = sqlx::query(
            "INSERT INTO deployment_events (token_id, user_id, phase, severity, detail)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&event.token_id)
        .bind(&event.user_id)
        .bind(event.phase.as_str())
        .bind(event.severity.as_str())
        .bind(&event.detail)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(
                token_id = %event.token_id,
                phase = %event.phase,
                error = %e,
                "failed to record deployment event"
            );
        }
    }
}

/// Discards every event. Useful for tests and one-shot CLI runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

#[async_trait]
impl DeploymentEventSink for NoopEventSink {
    async fn record(&self, _event: DeploymentEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn events_land_in_the_audit_table() {
        let pool = setup_test_db().await;
        let sink = SqliteEventSink::new(pool.clone());

        sink.record(
            DeploymentEvent::info("tok-1", DeploymentPhase::Deploying).with_user(Some("user-7")),
        )
        .await;
        sink.record(DeploymentEvent::failure(
            "tok-1",
            DeploymentPhase::Failed,
            "transaction reverted".to_owned(),
        ))
        .await;

        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT phase, severity, user_id FROM deployment_events WHERE token_id = 'tok-1' ORDER BY id",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ("deploying".to_owned(), "info".to_owned(), Some("user-7".to_owned())));
        assert_eq!(rows[1].0, "failed");
        assert_eq!(rows[1].1, "error");
    }

    #[tokio::test]
    async fn sink_survives_a_closed_pool() {
        let pool = setup_test_db().await;
        let sink = SqliteEventSink::new(pool.clone());
        pool.close().await;

        // Must not panic or error out.
        sink.record(DeploymentEvent::info("tok-1", DeploymentPhase::Requested))
            .await;
    }
}
