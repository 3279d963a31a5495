use super::export::{StoreSnapshot, EXPORT_SCHEMA_VERSION};
use super::{BallotWrite, CompetitionStore, Transition, WriteOutcome};
use crate::error::{StoreError, StoreResult};
use crate::phase;
use crate::types::*;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    settings: HashMap<LeagueId, LeagueSettings>,
    prompts: HashMap<PromptId, Prompt>,
    responses: HashMap<ResponseId, Response>,
    votes: HashMap<VoteId, Vote>,
}

/// In-process store. Every write holds the single table lock, so each call
/// is one atomic read-then-conditional-write.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a validated snapshot
    pub fn from_snapshot(snapshot: StoreSnapshot) -> StoreResult<Self> {
        snapshot
            .validate()
            .map_err(StoreError::Snapshot)?;

        let tables = Tables {
            settings: snapshot.settings,
            prompts: snapshot.prompts,
            responses: snapshot.responses,
            votes: snapshot.votes,
        };
        Ok(Self {
            tables: Arc::new(RwLock::new(tables)),
        })
    }

    /// Copy the full store contents
    pub async fn snapshot(&self) -> StoreSnapshot {
        let tables = self.tables.read().await;
        StoreSnapshot {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now(),
            settings: tables.settings.clone(),
            prompts: tables.prompts.clone(),
            responses: tables.responses.clone(),
            votes: tables.votes.clone(),
        }
    }

    /// Owner-side settings edit; the league settings collaborator is read-only to the engine
    pub async fn set_league_settings(&self, league_id: &str, settings: LeagueSettings) {
        self.tables
            .write()
            .await
            .settings
            .insert(league_id.to_string(), settings);
    }
}

#[async_trait]
impl CompetitionStore for MemoryStore {
    async fn league_ids(&self) -> StoreResult<Vec<LeagueId>> {
        let tables = self.tables.read().await;
        // Leagues with prompts but no settings are listed too, so they get reported
        let ids: BTreeSet<LeagueId> = tables
            .settings
            .keys()
            .cloned()
            .chain(tables.prompts.values().map(|p| p.league_id.clone()))
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn league_settings(&self, league_id: &str) -> StoreResult<Option<LeagueSettings>> {
        Ok(self.tables.read().await.settings.get(league_id).copied())
    }

    async fn prompts_for_league(&self, league_id: &str) -> StoreResult<Vec<Prompt>> {
        let tables = self.tables.read().await;
        let mut prompts: Vec<Prompt> = tables
            .prompts
            .values()
            .filter(|p| p.league_id == league_id)
            .cloned()
            .collect();
        prompts.sort_by(|a, b| a.queue_order.cmp(&b.queue_order).then_with(|| a.id.cmp(&b.id)));
        Ok(prompts)
    }

    async fn get_prompt(&self, prompt_id: &str) -> StoreResult<Option<Prompt>> {
        Ok(self.tables.read().await.prompts.get(prompt_id).cloned())
    }

    async fn insert_prompt(&self, prompt: Prompt) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.prompts.contains_key(&prompt.id) {
            return Err(StoreError::Constraint(format!(
                "prompt '{}' already exists",
                prompt.id
            )));
        }
        tables.prompts.insert(prompt.id.clone(), prompt);
        Ok(())
    }

    async fn responses_for_prompt(&self, prompt_id: &str) -> StoreResult<Vec<Response>> {
        let tables = self.tables.read().await;
        let mut responses: Vec<Response> = tables
            .responses
            .values()
            .filter(|r| r.prompt_id == prompt_id)
            .cloned()
            .collect();
        responses.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then_with(|| a.id.cmp(&b.id)));
        Ok(responses)
    }

    async fn upsert_response(&self, response: Response) -> StoreResult<Option<Response>> {
        let mut tables = self.tables.write().await;

        let prompt = tables
            .prompts
            .get(&response.prompt_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "prompt",
                id: response.prompt_id.clone(),
            })?;
        if prompt.status != PromptStatus::Active {
            return Ok(None);
        }

        if let Some(current) = tables
            .responses
            .values_mut()
            .find(|r| r.prompt_id == response.prompt_id && r.user_id == response.user_id)
        {
            current.photo_url = response.photo_url;
            current.caption = response.caption;
            current.submitted_at = response.submitted_at;
            return Ok(Some(current.clone()));
        }

        tables
            .responses
            .insert(response.id.clone(), response.clone());
        Ok(Some(response))
    }

    async fn votes_for_prompt(&self, prompt_id: &str) -> StoreResult<Vec<Vote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .values()
            .filter(|v| v.prompt_id == prompt_id)
            .cloned()
            .collect())
    }

    async fn transition_prompt(
        &self,
        prompt_id: &str,
        transition: Transition,
    ) -> StoreResult<WriteOutcome> {
        let mut tables = self.tables.write().await;

        let prompt = tables
            .prompts
            .get(prompt_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "prompt",
                id: prompt_id.to_string(),
            })?;
        if prompt.status != transition.expected_status() {
            return Ok(WriteOutcome::Conflict);
        }
        let league_id = prompt.league_id.clone();
        let target = transition.target_status();

        // At most one ACTIVE and one VOTING prompt per league
        let clashes = |p: &Prompt| p.league_id == league_id && p.id != prompt_id;
        let blocked = match &transition {
            Transition::Activate { .. } => tables
                .prompts
                .values()
                .any(|p| clashes(p) && p.status.is_current()),
            Transition::StartVoting { .. } => tables
                .prompts
                .values()
                .any(|p| clashes(p) && p.status == PromptStatus::Voting),
            Transition::Complete { .. } => false,
        };
        if blocked {
            return Ok(WriteOutcome::Conflict);
        }

        let at = transition.at();
        match transition {
            Transition::Activate { .. } => {}
            Transition::StartVoting { .. } => {
                for response in tables
                    .responses
                    .values_mut()
                    .filter(|r| r.prompt_id == prompt_id && !r.is_published)
                {
                    response.is_published = true;
                    response.published_at = Some(at);
                }
            }
            Transition::Complete {
                results,
                mut tallied_votes,
                ..
            } => {
                // Votes must still be exactly the set that was tallied
                let mut stored_votes: Vec<&VoteId> = tables
                    .votes
                    .values()
                    .filter(|v| v.prompt_id == prompt_id)
                    .map(|v| &v.id)
                    .collect();
                stored_votes.sort();
                tallied_votes.sort();
                if !stored_votes.iter().copied().eq(tallied_votes.iter()) {
                    return Ok(WriteOutcome::Conflict);
                }

                // Validate everything before the first write
                for result in &results {
                    let belongs = tables
                        .responses
                        .get(&result.response_id)
                        .is_some_and(|r| r.prompt_id == prompt_id);
                    if !belongs {
                        return Err(StoreError::Constraint(format!(
                            "response '{}' does not belong to prompt '{}'",
                            result.response_id, prompt_id
                        )));
                    }
                }
                for result in results {
                    if let Some(response) = tables.responses.get_mut(&result.response_id) {
                        response.total_votes = result.total_votes;
                        response.total_points = result.total_points;
                        response.final_rank = Some(result.final_rank);
                    }
                }
            }
        }

        if let Some(prompt) = tables.prompts.get_mut(prompt_id) {
            prompt.status = target;
            prompt.phase_started_at = Some(at);
        }

        Ok(WriteOutcome::Applied)
    }

    async fn replace_ballot(&self, ballot: BallotWrite) -> StoreResult<WriteOutcome> {
        let mut tables = self.tables.write().await;

        let prompt = tables
            .prompts
            .get(&ballot.prompt_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "prompt",
                id: ballot.prompt_id.clone(),
            })?;
        if prompt.status != PromptStatus::Voting
            || phase::is_expired(prompt, &ballot.settings, ballot.cast_at)
        {
            return Ok(WriteOutcome::Conflict);
        }

        tables.votes.retain(|_, v| {
            v.prompt_id != ballot.prompt_id || v.voter_id != ballot.voter_id || v.is_self_vote
        });
        for vote in ballot.votes {
            tables.votes.insert(vote.id.clone(), vote);
        }

        if let Some(self_vote) = ballot.self_vote {
            let has_self_vote = tables.votes.values().any(|v| {
                v.prompt_id == ballot.prompt_id && v.voter_id == ballot.voter_id && v.is_self_vote
            });
            if !has_self_vote {
                tables.votes.insert(self_vote.id.clone(), self_vote);
            }
        }

        Ok(WriteOutcome::Applied)
    }
}
