use super::Competition;
use crate::error::{ResponseError, StoreResult};
use crate::ranking::compare_finalized;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSubmission {
    pub league_id: LeagueId,
    pub user_id: UserId,
    pub photo_url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

impl Competition {
    /// Create or replace the user's response to the league's ACTIVE prompt
    pub async fn submit_response(
        &self,
        submission: ResponseSubmission,
    ) -> Result<Response, ResponseError> {
        let photo_url = submission.photo_url.trim().to_string();
        if photo_url.is_empty() {
            return Err(ResponseError::EmptyPhoto);
        }
        let caption = submission
            .caption
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let prompt = self
            .store
            .prompts_for_league(&submission.league_id)
            .await?
            .into_iter()
            .find(|p| p.status == PromptStatus::Active)
            .ok_or_else(|| ResponseError::NoActivePrompt(submission.league_id.clone()))?;

        let response = Response {
            id: new_id(),
            prompt_id: prompt.id.clone(),
            user_id: submission.user_id,
            photo_url,
            caption,
            submitted_at: self.clock.now(),
            is_published: false,
            published_at: None,
            total_votes: 0,
            total_points: 0,
            final_rank: None,
        };

        let stored = self
            .store
            .upsert_response(response)
            .await?
            .ok_or(ResponseError::SubmissionsClosed(prompt.id))?;

        tracing::info!(
            prompt_id = %stored.prompt_id,
            user_id = %stored.user_id,
            response_id = %stored.id,
            "Response submitted"
        );
        Ok(stored)
    }

    /// Responses visible to the league: only once voting has begun
    pub async fn published_responses(&self, prompt_id: &str) -> StoreResult<Vec<Response>> {
        let mut responses = self.store.responses_for_prompt(prompt_id).await?;
        responses.retain(|r| r.is_published);
        Ok(responses)
    }

    /// A prompt's responses in final ranking order
    pub async fn prompt_results(&self, prompt_id: &str) -> StoreResult<Vec<Response>> {
        let mut responses = self.published_responses(prompt_id).await?;
        responses.sort_by(compare_finalized);
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::store::{CompetitionStore, Transition};
    use chrono::Duration;

    async fn active_league() -> Harness {
        let h = harness(settings(7, 3, 3)).await;
        h.competition
            .enqueue_prompt("l1", "Long shadows", None)
            .await
            .unwrap();
        h.competition.advance_league("l1").await.unwrap();
        h
    }

    fn submission(user: &str, photo: &str) -> ResponseSubmission {
        ResponseSubmission {
            league_id: "l1".to_string(),
            user_id: user.to_string(),
            photo_url: photo.to_string(),
            caption: Some("  ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_submit_and_replace_response() {
        let h = active_league().await;

        let first = h
            .competition
            .submit_response(submission("alice", "https://photos.example/a1.jpg"))
            .await
            .unwrap();
        assert_eq!(first.caption, None);
        assert_eq!(first.submitted_at, start());

        h.clock.advance(Duration::hours(2));
        let second = h
            .competition
            .submit_response(submission("alice", "https://photos.example/a2.jpg"))
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.photo_url, "https://photos.example/a2.jpg");
        assert_eq!(second.submitted_at, start() + Duration::hours(2));
        assert_eq!(
            h.store
                .responses_for_prompt(&first.prompt_id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_empty_photo_rejected() {
        let h = active_league().await;
        let err = h
            .competition
            .submit_response(submission("alice", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ResponseError::EmptyPhoto));
    }

    #[tokio::test]
    async fn test_no_active_prompt() {
        let h = harness(settings(7, 3, 3)).await;
        let err = h
            .competition
            .submit_response(submission("alice", "https://photos.example/a.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResponseError::NoActivePrompt(_)));
    }

    #[tokio::test]
    async fn test_responses_hidden_until_voting() {
        let h = active_league().await;
        let response = h
            .competition
            .submit_response(submission("alice", "https://photos.example/a.jpg"))
            .await
            .unwrap();

        assert!(h
            .competition
            .published_responses(&response.prompt_id)
            .await
            .unwrap()
            .is_empty());

        h.store
            .transition_prompt(
                &response.prompt_id,
                Transition::StartVoting {
                    at: start() + Duration::days(7),
                },
            )
            .await
            .unwrap();

        let visible = h
            .competition
            .published_responses(&response.prompt_id)
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);
    }
}
