//! Queue advancement: the per-league phase state machine.
//!
//! `advance_league` is an idempotent "advance if due" step. It reads the
//! league's prompts, decides from status and phase expiry which single
//! transition is due, and commits it with a conditional write. Losing a race
//! to another invocation shows up as `WriteOutcome::Conflict` and is a no-op.

use super::Competition;
use crate::error::AdvanceError;
use crate::phase;
use crate::ranking::rank_responses;
use crate::store::{Transition, WriteOutcome};
use crate::tally::tally_votes;
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tally attempts per trigger before a busy prompt is left for the next run
const FINALIZE_ATTEMPTS: u32 = 3;

/// What one league's advance step changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeagueAdvance {
    pub league_id: LeagueId,
    /// Prompt moved ACTIVE -> VOTING
    pub published: Option<PromptId>,
    /// Prompt moved VOTING -> COMPLETED
    pub finalized: Option<PromptId>,
    /// Prompt moved SCHEDULED -> ACTIVE
    pub activated: Option<PromptId>,
}

impl LeagueAdvance {
    fn new(league_id: &str) -> Self {
        Self {
            league_id: league_id.to_string(),
            ..Default::default()
        }
    }

    pub fn changed(&self) -> bool {
        self.published.is_some() || self.finalized.is_some() || self.activated.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Configuration,
    Persistence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeagueFailure {
    /// None when the league list itself could not be read
    pub league_id: Option<LeagueId>,
    pub kind: FailureKind,
    pub message: String,
}

/// Result of one trigger invocation across leagues
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdvanceSummary {
    pub leagues_advanced: Vec<LeagueId>,
    pub prompts_published: Vec<PromptId>,
    pub prompts_finalized: Vec<PromptId>,
    pub prompts_activated: Vec<PromptId>,
    pub errors: Vec<LeagueFailure>,
}

impl AdvanceSummary {
    pub fn changed(&self) -> bool {
        !self.leagues_advanced.is_empty()
    }

    fn record(&mut self, advance: LeagueAdvance) {
        if !advance.changed() {
            return;
        }
        self.prompts_published.extend(advance.published);
        self.prompts_finalized.extend(advance.finalized);
        self.prompts_activated.extend(advance.activated);
        self.leagues_advanced.push(advance.league_id);
    }

    fn fail(&mut self, league_id: Option<LeagueId>, error: &AdvanceError) {
        let kind = if error.is_configuration() {
            FailureKind::Configuration
        } else {
            FailureKind::Persistence
        };
        self.errors.push(LeagueFailure {
            league_id,
            kind,
            message: error.to_string(),
        });
    }
}

impl Competition {
    /// Process due transitions for one league, or every league when `league_id` is None.
    ///
    /// Leagues run concurrently and fail independently.
    pub async fn process_due_transitions(&self, league_id: Option<&str>) -> AdvanceSummary {
        let mut summary = AdvanceSummary::default();

        let league_ids = match league_id {
            Some(id) => vec![id.to_string()],
            None => match self.store.league_ids().await {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::error!("Failed to list leagues: {}", e);
                    summary.fail(None, &AdvanceError::Store(e));
                    return summary;
                }
            },
        };

        let tasks = league_ids.iter().map(|id| async move {
            let result = self.advance_league(id).await;
            (id.clone(), result)
        });

        for (id, result) in futures::future::join_all(tasks).await {
            match result {
                Ok(advance) => summary.record(advance),
                Err(e) => {
                    if e.is_configuration() {
                        tracing::warn!(league_id = %id, "Skipping league: {}", e);
                    } else {
                        tracing::error!(league_id = %id, "Failed to advance league: {}", e);
                    }
                    summary.fail(Some(id), &e);
                }
            }
        }

        tracing::debug!(
            advanced = summary.leagues_advanced.len(),
            errors = summary.errors.len(),
            "Processed due transitions"
        );
        summary
    }

    /// Perform whichever transition is due for a league, if any
    pub async fn advance_league(&self, league_id: &str) -> Result<LeagueAdvance, AdvanceError> {
        let settings = self
            .store
            .league_settings(league_id)
            .await?
            .ok_or_else(|| AdvanceError::MissingSettings(league_id.to_string()))?;
        settings
            .validate()
            .map_err(|source| AdvanceError::InvalidSettings {
                league_id: league_id.to_string(),
                source,
            })?;

        let now = self.clock.now();
        let prompts = self.store.prompts_for_league(league_id).await?;
        let mut advance = LeagueAdvance::new(league_id);

        let current = prompts
            .iter()
            .find(|p| p.status == PromptStatus::Voting)
            .or_else(|| prompts.iter().find(|p| p.status == PromptStatus::Active));

        match current {
            Some(prompt) if !phase::is_expired(prompt, &settings, now) => {
                if prompt.phase_started_at.is_none() {
                    tracing::warn!(
                        league_id,
                        prompt_id = %prompt.id,
                        "Current prompt has no phase start and will never expire"
                    );
                }
            }
            Some(prompt) if prompt.status == PromptStatus::Active => {
                if self.start_voting(prompt, now).await? {
                    advance.published = Some(prompt.id.clone());
                }
            }
            Some(prompt) => {
                if self.finalize_prompt(prompt, now).await? {
                    advance.finalized = Some(prompt.id.clone());
                }
                // Finalization is committed; a failure here only leaves activation for the next run
                advance.activated = self.activate_next(league_id, now).await?;
            }
            None => {
                advance.activated = self.activate_next(league_id, now).await?;
            }
        }

        Ok(advance)
    }

    async fn start_voting(&self, prompt: &Prompt, now: DateTime<Utc>) -> Result<bool, AdvanceError> {
        let outcome = self
            .store
            .transition_prompt(&prompt.id, Transition::StartVoting { at: now })
            .await?;

        match outcome {
            WriteOutcome::Applied => {
                tracing::info!(
                    league_id = %prompt.league_id,
                    prompt_id = %prompt.id,
                    "Submissions closed, voting open"
                );
                Ok(true)
            }
            WriteOutcome::Conflict => {
                tracing::debug!(prompt_id = %prompt.id, "Voting already opened elsewhere");
                Ok(false)
            }
        }
    }

    /// Tally, rank and close a VOTING prompt in one conditional write.
    ///
    /// The write carries the ids of the votes it tallied, so a ballot that
    /// lands in between turns it into a conflict and the tally is redone.
    async fn finalize_prompt(&self, prompt: &Prompt, now: DateTime<Utc>) -> Result<bool, AdvanceError> {
        for attempt in 1..=FINALIZE_ATTEMPTS {
            let responses = self.store.responses_for_prompt(&prompt.id).await?;
            let votes = self.store.votes_for_prompt(&prompt.id).await?;

            let tally = tally_votes(&responses, &votes);
            let results = rank_responses(&responses, &tally);
            let winner = results.first().map(|r| r.user_id.clone());
            let tallied_votes = votes.into_iter().map(|v| v.id).collect();

            let outcome = self
                .store
                .transition_prompt(
                    &prompt.id,
                    Transition::Complete {
                        at: now,
                        results,
                        tallied_votes,
                    },
                )
                .await?;

            if outcome.is_applied() {
                tracing::info!(
                    league_id = %prompt.league_id,
                    prompt_id = %prompt.id,
                    responses = responses.len(),
                    voters = tally.voter_count(),
                    winner = ?winner,
                    "Prompt completed"
                );
                return Ok(true);
            }

            let still_voting = self
                .store
                .get_prompt(&prompt.id)
                .await?
                .is_some_and(|p| p.status == PromptStatus::Voting);
            if !still_voting {
                tracing::debug!(prompt_id = %prompt.id, "Prompt already finalized elsewhere");
                return Ok(false);
            }
            tracing::debug!(prompt_id = %prompt.id, attempt, "Votes changed during tally, retrying");
        }

        tracing::warn!(
            prompt_id = %prompt.id,
            "Votes kept changing during finalization; leaving it for the next run"
        );
        Ok(false)
    }

    /// Activate the lowest-ordered SCHEDULED prompt if the league has no current prompt
    async fn activate_next(
        &self,
        league_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PromptId>, AdvanceError> {
        let prompts = self.store.prompts_for_league(league_id).await?;

        if prompts.iter().any(|p| p.status.is_current()) {
            return Ok(None);
        }

        let Some(next) = prompts
            .iter()
            .filter(|p| p.status == PromptStatus::Scheduled)
            .min_by(|a, b| {
                a.queue_order
                    .cmp(&b.queue_order)
                    .then_with(|| a.created_at.cmp(&b.created_at))
                    .then_with(|| a.id.cmp(&b.id))
            })
        else {
            tracing::debug!(league_id, "No scheduled prompts to activate");
            return Ok(None);
        };

        let outcome = self
            .store
            .transition_prompt(&next.id, Transition::Activate { at: now })
            .await?;

        match outcome {
            WriteOutcome::Applied => {
                tracing::info!(league_id, prompt_id = %next.id, "Prompt activated");
                Ok(Some(next.id.clone()))
            }
            WriteOutcome::Conflict => {
                tracing::debug!(league_id, prompt_id = %next.id, "Activation lost to another writer");
                Ok(None)
            }
        }
    }
}
