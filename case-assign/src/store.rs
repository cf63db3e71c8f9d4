use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::Config;
use crate::error::StoreError;
use crate::types::{CaseId, QueueId, TeamId, UserId};

/// The external data store the resolver reads from and writes to.
///
/// Three reads and two writes; the resolver never touches the store any other
/// way. `team_members` must return a stable order for a fixed team state, as
/// tie candidates inherit it.
#[async_trait]
pub trait CaseStore {
    async fn team_members(&self, team: TeamId) -> Result<Vec<UserId>, StoreError>;
    async fn team_queue(&self, team: TeamId) -> Result<Option<QueueId>, StoreError>;
    async fn open_case_count(&self, user: UserId) -> Result<u64, StoreError>;
    async fn assign_to_user(&self, case: CaseId, user: UserId) -> Result<(), StoreError>;
    async fn assign_to_queue(&self, case: CaseId, queue: QueueId) -> Result<(), StoreError>;
}

/// A `CaseStore` backed by PostgreSQL.
pub struct PgCaseStore {
    pool: PgPool,
    lookup_timeout: Duration,
}

impl PgCaseStore {
    pub async fn new(config: &Config) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_pg_connections)
            .connect(&config.database_url)
            .await?;

        Ok(Self {
            pool,
            lookup_timeout: config.lookup_timeout.0,
        })
    }

    pub fn from_pool(pool: PgPool, lookup_timeout: Duration) -> Self {
        Self {
            pool,
            lookup_timeout,
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        timeout(self.lookup_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl CaseStore for PgCaseStore {
    async fn team_members(&self, team: TeamId) -> Result<Vec<UserId>, StoreError> {
        let rows: Vec<Uuid> = self
            .bounded(
                sqlx::query_scalar(
                    "SELECT user_id FROM team_memberships WHERE team_id = $1 ORDER BY user_id",
                )
                .bind(team.0)
                .fetch_all(&self.pool),
            )
            .await?;

        Ok(rows.into_iter().map(UserId).collect())
    }

    async fn team_queue(&self, team: TeamId) -> Result<Option<QueueId>, StoreError> {
        let row: Option<Option<Uuid>> = self
            .bounded(
                sqlx::query_scalar("SELECT queue_id FROM teams WHERE id = $1")
                    .bind(team.0)
                    .fetch_optional(&self.pool),
            )
            .await?;

        Ok(row.flatten().map(QueueId))
    }

    async fn open_case_count(&self, user: UserId) -> Result<u64, StoreError> {
        let count: i64 = self
            .bounded(
                sqlx::query_scalar(
                    "SELECT count(*) FROM cases WHERE owner_user_id = $1 AND status = 'open'",
                )
                .bind(user.0)
                .fetch_one(&self.pool),
            )
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn assign_to_user(&self, case: CaseId, user: UserId) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query("UPDATE cases SET owner_user_id = $2, queue_id = NULL WHERE id = $1")
                .bind(case.0)
                .bind(user.0)
                .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn assign_to_queue(&self, case: CaseId, queue: QueueId) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query("UPDATE cases SET queue_id = $2, owner_user_id = NULL WHERE id = $1")
                .bind(case.0)
                .bind(queue.0)
                .execute(&self.pool),
        )
        .await?;

        Ok(())
    }
}

/// A write issued against a `MemoryCaseStore`, recorded for assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedWrite {
    ToUser(CaseId, UserId),
    ToQueue(CaseId, QueueId),
}

/// An in-memory `CaseStore` for tests and local experimentation.
#[derive(Clone, Default)]
pub struct MemoryCaseStore {
    members: HashMap<TeamId, Vec<UserId>>,
    queues: HashMap<TeamId, QueueId>,
    counts: HashMap<UserId, u64>,
    fail_members: bool,
    fail_queue: bool,
    fail_counts: bool,
    writes: Arc<Mutex<Vec<RecordedWrite>>>,
}

impl MemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(mut self, team: TeamId, members: Vec<UserId>) -> Self {
        self.members.insert(team, members);
        self
    }

    pub fn with_queue(mut self, team: TeamId, queue: QueueId) -> Self {
        self.queues.insert(team, queue);
        self
    }

    pub fn with_count(mut self, user: UserId, count: u64) -> Self {
        self.counts.insert(user, count);
        self
    }

    pub fn failing_members(mut self) -> Self {
        self.fail_members = true;
        self
    }

    pub fn failing_queue(mut self) -> Self {
        self.fail_queue = true;
        self
    }

    pub fn failing_counts(mut self) -> Self {
        self.fail_counts = true;
        self
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaseStore for MemoryCaseStore {
    async fn team_members(&self, team: TeamId) -> Result<Vec<UserId>, StoreError> {
        if self.fail_members {
            return Err(StoreError::Timeout);
        }
        Ok(self.members.get(&team).cloned().unwrap_or_default())
    }

    async fn team_queue(&self, team: TeamId) -> Result<Option<QueueId>, StoreError> {
        if self.fail_queue {
            return Err(StoreError::Timeout);
        }
        Ok(self.queues.get(&team).copied())
    }

    async fn open_case_count(&self, user: UserId) -> Result<u64, StoreError> {
        if self.fail_counts {
            return Err(StoreError::Timeout);
        }
        Ok(self.counts.get(&user).copied().unwrap_or_default())
    }

    async fn assign_to_user(&self, case: CaseId, user: UserId) -> Result<(), StoreError> {
        self.writes
            .lock()
            .unwrap()
            .push(RecordedWrite::ToUser(case, user));
        Ok(())
    }

    async fn assign_to_queue(&self, case: CaseId, queue: QueueId) -> Result<(), StoreError> {
        self.writes
            .lock()
            .unwrap()
            .push(RecordedWrite::ToQueue(case, queue));
        Ok(())
    }
}
