//! The shared Prompt/Response/Vote store.
//!
//! All cross-process coordination is expressed as conditional writes against
//! this trait: every mutating call checks the prompt's current status inside
//! the same atomic unit that applies the change, and reports
//! `WriteOutcome::Conflict` when another writer got there first.

pub mod export;
mod memory;

pub use memory::MemoryStore;

use crate::error::StoreResult;
use crate::ranking::RankedResponse;
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Result of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// The expected precondition no longer held; nothing was written
    Conflict,
}

impl WriteOutcome {
    pub fn is_applied(self) -> bool {
        self == WriteOutcome::Applied
    }
}

/// A single forward step of a prompt's lifecycle
#[derive(Debug, Clone)]
pub enum Transition {
    /// SCHEDULED -> ACTIVE. Conflicts if the league already has a current prompt.
    Activate { at: DateTime<Utc> },
    /// ACTIVE -> VOTING, publishing every response of the prompt
    StartVoting { at: DateTime<Utc> },
    /// VOTING -> COMPLETED, persisting the final tallies and ranks.
    /// Conflicts if the prompt's votes differ from `tallied_votes`.
    Complete {
        at: DateTime<Utc>,
        results: Vec<RankedResponse>,
        tallied_votes: Vec<VoteId>,
    },
}

impl Transition {
    /// Status the prompt must hold for the transition to apply
    pub fn expected_status(&self) -> PromptStatus {
        match self {
            Transition::Activate { .. } => PromptStatus::Scheduled,
            Transition::StartVoting { .. } => PromptStatus::Active,
            Transition::Complete { .. } => PromptStatus::Voting,
        }
    }

    pub fn target_status(&self) -> PromptStatus {
        match self {
            Transition::Activate { .. } => PromptStatus::Active,
            Transition::StartVoting { .. } => PromptStatus::Voting,
            Transition::Complete { .. } => PromptStatus::Completed,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Transition::Activate { at }
            | Transition::StartVoting { at }
            | Transition::Complete { at, .. } => *at,
        }
    }
}

/// A voter's complete ballot for one prompt, written as one unit
#[derive(Debug, Clone)]
pub struct BallotWrite {
    pub prompt_id: PromptId,
    pub voter_id: UserId,
    /// Replaces all of the voter's previous ordinary votes on the prompt
    pub votes: Vec<Vote>,
    /// Stored only if the voter has no self-vote on the prompt yet
    pub self_vote: Option<Vote>,
    pub cast_at: DateTime<Utc>,
    /// The voting window is re-checked against these under the write
    pub settings: LeagueSettings,
}

#[async_trait]
pub trait CompetitionStore: Send + Sync {
    /// Every league that has settings or prompts, sorted
    async fn league_ids(&self) -> StoreResult<Vec<LeagueId>>;

    async fn league_settings(&self, league_id: &str) -> StoreResult<Option<LeagueSettings>>;

    async fn prompts_for_league(&self, league_id: &str) -> StoreResult<Vec<Prompt>>;

    async fn get_prompt(&self, prompt_id: &str) -> StoreResult<Option<Prompt>>;

    async fn insert_prompt(&self, prompt: Prompt) -> StoreResult<()>;

    async fn responses_for_prompt(&self, prompt_id: &str) -> StoreResult<Vec<Response>>;

    /// Create or replace the user's response while the prompt is ACTIVE.
    /// Returns the stored response, or None if the prompt is no longer ACTIVE.
    async fn upsert_response(&self, response: Response) -> StoreResult<Option<Response>>;

    async fn votes_for_prompt(&self, prompt_id: &str) -> StoreResult<Vec<Vote>>;

    /// Apply `transition` only if the prompt currently holds its expected status
    async fn transition_prompt(
        &self,
        prompt_id: &str,
        transition: Transition,
    ) -> StoreResult<WriteOutcome>;

    /// Atomically replace a voter's ballot. Conflicts unless the prompt is
    /// VOTING and its voting window is still open at `cast_at`.
    async fn replace_ballot(&self, ballot: BallotWrite) -> StoreResult<WriteOutcome>;
}
