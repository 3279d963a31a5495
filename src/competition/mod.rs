mod advance;
mod ballot;
mod queue;
mod response;
mod standings;

pub use advance::{AdvanceSummary, FailureKind, LeagueAdvance, LeagueFailure};
pub use ballot::{required_vote_count, BallotReceipt, BallotRequest, BallotStatus};
pub use queue::PhaseStatus;
pub use response::ResponseSubmission;
pub use standings::Standing;

use crate::clock::Clock;
use crate::store::CompetitionStore;
use std::sync::Arc;

/// Entry point for every competition operation. Holds no state of its own:
/// each call re-derives the league's situation from the store.
#[derive(Clone)]
pub struct Competition {
    pub store: Arc<dyn CompetitionStore>,
    pub clock: Arc<dyn Clock>,
}

impl Competition {
    pub fn new(store: Arc<dyn CompetitionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}
