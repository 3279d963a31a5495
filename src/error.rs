//! Error taxonomy for the competition core.
//!
//! Concurrency conflicts are not errors: a conditional write that loses a
//! race reports `WriteOutcome::Conflict` and callers treat it as a no-op.

use crate::types::{LeagueId, PromptId, ResponseId};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures of the shared Prompt/Response/Vote store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Snapshot failed: {0}")]
    Snapshot(String),
}

/// League settings outside their permitted ranges
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("submission_days must be between 1 and 14, got {0}")]
    SubmissionDays(u32),

    #[error("voting_days must be between 1 and 7, got {0}")]
    VotingDays(u32),

    #[error("votes_per_player must be between 1 and 10, got {0}")]
    VotesPerPlayer(u32),
}

/// Failures while advancing one league's queue
#[derive(Debug, thiserror::Error)]
pub enum AdvanceError {
    #[error("League '{0}' has no settings")]
    MissingSettings(LeagueId),

    #[error("League '{league_id}' has invalid settings: {source}")]
    InvalidSettings {
        league_id: LeagueId,
        #[source]
        source: SettingsError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdvanceError {
    /// Configuration problems are skipped and reported; everything else is a persistence failure
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AdvanceError::MissingSettings(_) | AdvanceError::InvalidSettings { .. }
        )
    }
}

/// Rejections at the ballot submission boundary
#[derive(Debug, thiserror::Error)]
pub enum BallotError {
    #[error("League '{0}' has no prompt open for voting")]
    NoVotingPrompt(LeagueId),

    #[error("Ballot must contain exactly {expected} votes, got {actual}")]
    WrongVoteCount { expected: usize, actual: usize },

    #[error("Vote for response '{0}' must be worth exactly 1 point")]
    InvalidPoints(ResponseId),

    #[error("Cannot vote for your own response '{0}'")]
    OwnResponse(ResponseId),

    #[error("Response '{response_id}' does not belong to prompt '{prompt_id}'")]
    UnknownResponse {
        response_id: ResponseId,
        prompt_id: PromptId,
    },

    #[error("Voting on prompt '{0}' closed before the ballot was recorded")]
    VotingClosed(PromptId),

    #[error("League '{0}' has no settings")]
    MissingSettings(LeagueId),

    #[error(transparent)]
    InvalidSettings(#[from] SettingsError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rejections when submitting or replacing a response
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("League '{0}' has no prompt open for submissions")]
    NoActivePrompt(LeagueId),

    #[error("Photo URL cannot be empty")]
    EmptyPhoto,

    #[error("Submissions for prompt '{0}' closed before the response was recorded")]
    SubmissionsClosed(PromptId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rejections when enqueueing prompts
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Prompt text cannot be empty")]
    EmptyText,

    #[error("League '{0}' has no settings")]
    UnknownLeague(LeagueId),

    #[error(transparent)]
    Store(#[from] StoreError),
}
