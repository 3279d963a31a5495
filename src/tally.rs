use crate::types::*;
use std::collections::{HashMap, HashSet};

/// Vote totals received by a single response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseTally {
    pub total_votes: u32,
    pub total_points: u32,
}

/// Aggregated votes for one prompt
#[derive(Debug, Clone, Default)]
pub struct Tally {
    totals: HashMap<ResponseId, ResponseTally>,
    voters: HashSet<UserId>,
}

impl Tally {
    /// Totals for a response; responses nobody voted for get zeros
    pub fn for_response(&self, response_id: &str) -> ResponseTally {
        self.totals.get(response_id).copied().unwrap_or_default()
    }

    /// Whether the user submitted a ballot in this round. Drives the
    /// must-vote-to-earn-points rule in cross-round standings; per-response
    /// totals stay unconditional.
    pub fn did_vote(&self, user_id: &str) -> bool {
        self.voters.contains(user_id)
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    /// Build a tally with arbitrary totals, e.g. points that differ from votes
    #[cfg(test)]
    pub(crate) fn from_totals<'a>(
        totals: impl IntoIterator<Item = (&'a str, ResponseTally)>,
    ) -> Self {
        Self {
            totals: totals
                .into_iter()
                .map(|(id, tally)| (id.to_string(), tally))
                .collect(),
            voters: HashSet::new(),
        }
    }
}

/// Aggregate a prompt's votes into per-response totals.
///
/// Self-votes only mark participation. Votes aimed at responses outside the
/// given set are ignored.
pub fn tally_votes(responses: &[Response], votes: &[Vote]) -> Tally {
    let mut totals: HashMap<ResponseId, ResponseTally> = responses
        .iter()
        .map(|r| (r.id.clone(), ResponseTally::default()))
        .collect();
    let mut voters = HashSet::new();

    for vote in votes {
        voters.insert(vote.voter_id.clone());

        if vote.is_self_vote {
            continue;
        }

        match totals.get_mut(&vote.response_id) {
            Some(entry) => {
                entry.total_votes += 1;
                entry.total_points += vote.points;
            }
            None => {
                tracing::debug!(
                    vote_id = %vote.id,
                    response_id = %vote.response_id,
                    "Ignoring vote for unknown response"
                );
            }
        }
    }

    Tally { totals, voters }
}
