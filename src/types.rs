use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type LeagueId = String;
pub type PromptId = String;
pub type ResponseId = String;
pub type VoteId = String;
pub type UserId = String;

/// Generate a fresh sortable identifier
pub fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromptStatus {
    Scheduled,
    Active,
    Voting,
    Completed,
}

impl PromptStatus {
    /// The only status this one may move to, or None for the terminal state
    pub fn next(self) -> Option<PromptStatus> {
        match self {
            PromptStatus::Scheduled => Some(PromptStatus::Active),
            PromptStatus::Active => Some(PromptStatus::Voting),
            PromptStatus::Voting => Some(PromptStatus::Completed),
            PromptStatus::Completed => None,
        }
    }

    /// ACTIVE and VOTING prompts are the league's "current" round
    pub fn is_current(self) -> bool {
        matches!(self, PromptStatus::Active | PromptStatus::Voting)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    pub id: PromptId,
    pub league_id: LeagueId,
    pub text: String,
    pub status: PromptStatus,
    pub queue_order: i64,
    /// When the current status began. None only before first activation.
    pub phase_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Per-league round configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeagueSettings {
    pub submission_days: u32,
    pub voting_days: u32,
    pub votes_per_player: u32,
}

impl Default for LeagueSettings {
    fn default() -> Self {
        Self {
            submission_days: 7,
            voting_days: 3,
            votes_per_player: 3,
        }
    }
}

/// A user's photo submission to a prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub id: ResponseId,
    pub prompt_id: PromptId,
    pub user_id: UserId,
    pub photo_url: String,
    #[serde(default)]
    pub caption: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_votes: u32,
    #[serde(default)]
    pub total_points: u32,
    #[serde(default)]
    pub final_rank: Option<u32>,
}

/// Every counted vote is worth exactly one point
pub const POINTS_PER_VOTE: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub id: VoteId,
    pub prompt_id: PromptId,
    pub voter_id: UserId,
    pub response_id: ResponseId,
    pub points: u32,
    #[serde(default)]
    pub is_self_vote: bool,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn ordinary(
        prompt_id: &PromptId,
        voter_id: &UserId,
        response_id: &ResponseId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            prompt_id: prompt_id.clone(),
            voter_id: voter_id.clone(),
            response_id: response_id.clone(),
            points: POINTS_PER_VOTE,
            is_self_vote: false,
            created_at: at,
        }
    }

    /// Informational marker on the voter's own response
    pub fn self_vote(
        prompt_id: &PromptId,
        voter_id: &UserId,
        response_id: &ResponseId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            is_self_vote: true,
            ..Self::ordinary(prompt_id, voter_id, response_id, at)
        }
    }
}
