//! Per-user deployment rate limiting, counted over the audit event table.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::ServiceError;
use crate::events::DeploymentPhase;

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Errors with `ServiceError::RateLimited` when the user has exhausted
    /// the current window.
    async fn check(&self, user_id: &str) -> Result<(), ServiceError>;
}

/// No limiting; used for CLI runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRateLimit;

#[async_trait]
impl RateLimiter for NoRateLimit {
    async fn check(&self, _user_id: &str) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Windowed counter over `deployment_events`: at most `max_per_window`
/// deployment requests per user per window. Counting the audit table keeps
/// the limiter consistent across restarts without another table.
#[derive(Debug, Clone)]
pub struct WindowedRateLimiter {
    pool: SqlitePool,
    max_per_window: u32,
    window_secs: u64,
}

impl WindowedRateLimiter {
    pub const fn new(pool: SqlitePool, max_per_window: u32, window_secs: u64) -> Self {
        Self {
            pool,
            max_per_window,
            window_secs,
        }
    }
}

#[async_trait]
impl RateLimiter for WindowedRateLimiter {
    async fn check(&self, user_id: &str) -> Result<(), ServiceError> {
        let window_param = format!("-{} seconds", self.window_secs);
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM deployment_events
             WHERE user_id = ?1 AND phase = ?2 AND recorded_at >= datetime('now', ?3)",
        )
        .bind(user_id)
        .bind(DeploymentPhase::Requested.as_str())
        .bind(&window_param)
        .fetch_one(&self.pool)
        .await?;

        if count < i64::from(self.max_per_window) {
            return Ok(());
        }

        let oldest_age_secs: Option<i64> = sqlx::query_scalar(
            "SELECT CAST((julianday('now') - julianday(MIN(recorded_at))) * 86400 AS INTEGER)
             FROM deployment_events
             WHERE user_id = ?1 AND phase = ?2 AND recorded_at >= datetime('now', ?3)",
        )
        .bind(user_id)
        .bind(DeploymentPhase::Requested.as_str())
        .bind(&window_param)
        .fetch_one(&self.pool)
        .await?;

        let remaining_secs = self
            .window_secs
            .saturating_sub(oldest_age_secs.unwrap_or(0).max(0) as u64);
        Err(ServiceError::RateLimited {
            user_id: user_id.to_owned(),
            remaining_secs,
        })
    }
}
