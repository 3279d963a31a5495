use super::Competition;
use crate::error::BallotError;
use crate::phase;
use crate::store::{BallotWrite, WriteOutcome};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A voter's complete ballot: response id -> points (always 1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotRequest {
    pub league_id: LeagueId,
    pub voter_id: UserId,
    pub votes: HashMap<ResponseId, u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BallotReceipt {
    pub prompt_id: PromptId,
    pub voter_id: UserId,
    pub response_ids: Vec<ResponseId>,
    /// Whether the voter has a response of their own on the prompt
    pub has_own_response: bool,
}

/// What a voter needs to fill in a ballot
#[derive(Debug, Clone, Serialize)]
pub struct BallotStatus {
    pub prompt_id: PromptId,
    pub required_votes: usize,
    pub votable_responses: Vec<ResponseId>,
    pub current_votes: Vec<ResponseId>,
}

/// Votes a ballot must contain: the league's allowance, capped by what the voter can vote on
pub fn required_vote_count(votable_responses: usize, settings: &LeagueSettings) -> usize {
    votable_responses.min(settings.votes_per_player as usize)
}

impl Competition {
    /// Validate a ballot and atomically replace the voter's previous one.
    ///
    /// Nothing is written unless every check passes.
    pub async fn submit_ballot(&self, request: BallotRequest) -> Result<BallotReceipt, BallotError> {
        let settings = self.ballot_settings(&request.league_id).await?;
        let prompt = self.voting_prompt(&request.league_id).await?;
        let now = self.clock.now();
        if phase::is_expired(&prompt, &settings, now) {
            return Err(BallotError::VotingClosed(prompt.id));
        }
        let responses = self.store.responses_for_prompt(&prompt.id).await?;

        let by_id: HashMap<&str, &Response> =
            responses.iter().map(|r| (r.id.as_str(), r)).collect();
        let own_response = responses.iter().find(|r| r.user_id == request.voter_id);
        let votable = responses.len() - usize::from(own_response.is_some());

        let expected = required_vote_count(votable, &settings);
        if request.votes.len() != expected {
            return Err(BallotError::WrongVoteCount {
                expected,
                actual: request.votes.len(),
            });
        }

        // Sorted for stable error reporting
        let picks: BTreeMap<&ResponseId, u32> = request.votes.iter().map(|(k, v)| (k, *v)).collect();
        for (response_id, points) in &picks {
            if *points != POINTS_PER_VOTE {
                return Err(BallotError::InvalidPoints((*response_id).clone()));
            }
            let Some(target) = by_id.get(response_id.as_str()) else {
                return Err(BallotError::UnknownResponse {
                    response_id: (*response_id).clone(),
                    prompt_id: prompt.id.clone(),
                });
            };
            if target.user_id == request.voter_id {
                return Err(BallotError::OwnResponse((*response_id).clone()));
            }
        }

        let response_ids: Vec<ResponseId> = picks.keys().map(|id| (*id).clone()).collect();
        let votes = response_ids
            .iter()
            .map(|id| Vote::ordinary(&prompt.id, &request.voter_id, id, now))
            .collect();
        let self_vote = own_response.map(|r| Vote::self_vote(&prompt.id, &request.voter_id, &r.id, now));

        let outcome = self
            .store
            .replace_ballot(BallotWrite {
                prompt_id: prompt.id.clone(),
                voter_id: request.voter_id.clone(),
                votes,
                self_vote,
                cast_at: now,
                settings,
            })
            .await?;

        if outcome == WriteOutcome::Conflict {
            return Err(BallotError::VotingClosed(prompt.id));
        }

        tracing::info!(
            league_id = %request.league_id,
            prompt_id = %prompt.id,
            voter_id = %request.voter_id,
            votes = response_ids.len(),
            "Ballot recorded"
        );

        Ok(BallotReceipt {
            prompt_id: prompt.id,
            voter_id: request.voter_id,
            response_ids,
            has_own_response: own_response.is_some(),
        })
    }

    /// The voter's view of the league's open ballot
    pub async fn ballot_status(
        &self,
        league_id: &str,
        voter_id: &str,
    ) -> Result<BallotStatus, BallotError> {
        let settings = self.ballot_settings(league_id).await?;
        let prompt = self.voting_prompt(league_id).await?;
        let responses = self.store.responses_for_prompt(&prompt.id).await?;
        let votes = self.store.votes_for_prompt(&prompt.id).await?;

        let votable_responses: Vec<ResponseId> = responses
            .iter()
            .filter(|r| r.user_id != voter_id)
            .map(|r| r.id.clone())
            .collect();
        let mut current_votes: Vec<ResponseId> = votes
            .iter()
            .filter(|v| v.voter_id == voter_id && !v.is_self_vote)
            .map(|v| v.response_id.clone())
            .collect();
        current_votes.sort();

        Ok(BallotStatus {
            required_votes: required_vote_count(votable_responses.len(), &settings),
            prompt_id: prompt.id,
            votable_responses,
            current_votes,
        })
    }

    async fn ballot_settings(&self, league_id: &str) -> Result<LeagueSettings, BallotError> {
        let settings = self
            .store
            .league_settings(league_id)
            .await?
            .ok_or_else(|| BallotError::MissingSettings(league_id.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    async fn voting_prompt(&self, league_id: &str) -> Result<Prompt, BallotError> {
        self.store
            .prompts_for_league(league_id)
            .await?
            .into_iter()
            .find(|p| p.status == PromptStatus::Voting)
            .ok_or_else(|| BallotError::NoVotingPrompt(league_id.to_string()))
    }
}
