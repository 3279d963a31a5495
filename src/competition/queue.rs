use super::Competition;
use crate::error::{AdvanceError, QueueError, StoreResult};
use crate::phase;
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where a league's current round stands
#[derive(Debug, Clone, Serialize)]
pub struct PhaseStatus {
    pub prompt_id: PromptId,
    pub status: PromptStatus,
    pub phase_started_at: Option<DateTime<Utc>>,
    pub phase_ends_at: Option<DateTime<Utc>>,
    pub seconds_remaining: Option<i64>,
}

impl Competition {
    /// Add a SCHEDULED prompt to the end of the league's queue, or at `queue_order`
    pub async fn enqueue_prompt(
        &self,
        league_id: &str,
        text: &str,
        queue_order: Option<i64>,
    ) -> Result<Prompt, QueueError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QueueError::EmptyText);
        }
        if self.store.league_settings(league_id).await?.is_none() {
            return Err(QueueError::UnknownLeague(league_id.to_string()));
        }

        let queue_order = match queue_order {
            Some(order) => order,
            None => self
                .store
                .prompts_for_league(league_id)
                .await?
                .iter()
                .map(|p| p.queue_order)
                .max()
                .map_or(1, |max| max + 1),
        };

        let prompt = Prompt {
            id: new_id(),
            league_id: league_id.to_string(),
            text: text.to_string(),
            status: PromptStatus::Scheduled,
            queue_order,
            phase_started_at: None,
            created_at: self.clock.now(),
        };
        self.store.insert_prompt(prompt.clone()).await?;

        tracing::info!(league_id, prompt_id = %prompt.id, queue_order, "Prompt enqueued");
        Ok(prompt)
    }

    /// The league's ACTIVE or VOTING prompt, derived fresh from the store
    pub async fn current_prompt(&self, league_id: &str) -> StoreResult<Option<Prompt>> {
        let prompts = self.store.prompts_for_league(league_id).await?;
        Ok(prompts.into_iter().find(|p| p.status.is_current()))
    }

    /// SCHEDULED prompts in activation order
    pub async fn scheduled_prompts(&self, league_id: &str) -> StoreResult<Vec<Prompt>> {
        let mut prompts: Vec<Prompt> = self
            .store
            .prompts_for_league(league_id)
            .await?
            .into_iter()
            .filter(|p| p.status == PromptStatus::Scheduled)
            .collect();
        prompts.sort_by(|a, b| {
            a.queue_order
                .cmp(&b.queue_order)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(prompts)
    }

    pub async fn phase_status(&self, league_id: &str) -> Result<Option<PhaseStatus>, AdvanceError> {
        let settings = self
            .store
            .league_settings(league_id)
            .await?
            .ok_or_else(|| AdvanceError::MissingSettings(league_id.to_string()))?;

        let Some(prompt) = self.current_prompt(league_id).await? else {
            return Ok(None);
        };

        let now = self.clock.now();
        Ok(Some(PhaseStatus {
            phase_ends_at: phase::phase_end_time(&prompt, &settings),
            seconds_remaining: phase::time_remaining(&prompt, &settings, now)
                .map(|d| d.num_seconds()),
            prompt_id: prompt.id,
            status: prompt.status,
            phase_started_at: prompt.phase_started_at,
        }))
    }
}
