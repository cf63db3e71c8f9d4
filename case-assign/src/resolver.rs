use std::sync::Arc;

use futures::future;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::instrument;

use crate::error::AssignError;
use crate::store::CaseStore;
use crate::types::{Assignee, CaseId, Resolution, TeamId, UserId};

/// Assigns a case to the least-loaded member of a team, or to the team's
/// default queue when the team has no members. Ties on workload are broken
/// uniformly at random.
///
/// The random source is part of the resolver so tests can inject a seeded
/// generator and get reproducible tie-breaks.
pub struct AssignmentResolver<R = StdRng> {
    store: Arc<dyn CaseStore + Send + Sync>,
    rng: R,
}

impl AssignmentResolver<StdRng> {
    pub fn new(store: Arc<dyn CaseStore + Send + Sync>) -> Self {
        Self {
            store,
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R: Rng> AssignmentResolver<R> {
    pub fn with_rng(store: Arc<dyn CaseStore + Send + Sync>, rng: R) -> Self {
        Self { store, rng }
    }

    /// Resolve where `case` should go and issue the assignment.
    ///
    /// Returns `Resolution::Skipped` without touching the store when the
    /// assignee is already a user. All reads happen before the single write,
    /// so a failed invocation issues no write and can be retried whole.
    #[instrument(skip_all, fields(case_id = %case))]
    pub async fn resolve(
        &mut self,
        case: CaseId,
        assignee: Assignee,
    ) -> Result<Resolution, AssignError> {
        let team = match assignee {
            Assignee::Team(team) => team,
            Assignee::User(user) => {
                tracing::debug!(user_id = %user, "assignee is already a user, nothing to do");
                return Ok(Resolution::Skipped);
            }
        };

        let members = self.store.team_members(team).await?;

        if members.is_empty() {
            return self.assign_to_default_queue(case, team).await;
        }

        // One count query per member, all independent, so issue them together.
        // Member ids are unique, keeping the (member, count) pairs key-unique
        // and in membership order.
        let counts: Vec<(UserId, u64)> =
            future::try_join_all(members.into_iter().map(|member| {
                let store = Arc::clone(&self.store);
                async move {
                    store
                        .open_case_count(member)
                        .await
                        .map(|count| (member, count))
                }
            }))
            .await?;

        let min_count = counts.iter().map(|(_, count)| *count).min().unwrap_or_default();
        let candidates: Vec<UserId> = counts
            .iter()
            .filter(|(_, count)| *count == min_count)
            .map(|(member, _)| *member)
            .collect();

        let target = if candidates.len() == 1 {
            candidates[0]
        } else {
            candidates[self.rng.gen_range(0..candidates.len())]
        };

        self.store.assign_to_user(case, target).await?;
        metrics::counter!("case_assignments_total", "destination" => "user").increment(1);
        tracing::info!(
            team_id = %team,
            user_id = %target,
            open_cases = min_count,
            tied = candidates.len(),
            "assigned case to least-loaded team member"
        );

        Ok(Resolution::AssignedToUser(target))
    }

    async fn assign_to_default_queue(
        &self,
        case: CaseId,
        team: TeamId,
    ) -> Result<Resolution, AssignError> {
        let queue = self
            .store
            .team_queue(team)
            .await?
            .ok_or(AssignError::NoQueueConfigured(team))?;

        self.store.assign_to_queue(case, queue).await?;
        metrics::counter!("case_assignments_total", "destination" => "queue").increment(1);
        tracing::info!(
            team_id = %team,
            queue_id = %queue,
            "team has no members, assigned case to its default queue"
        );

        Ok(Resolution::AssignedToQueue(queue))
    }
}
