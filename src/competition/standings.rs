use super::Competition;
use crate::error::StoreResult;
use crate::tally::tally_votes;
use crate::types::*;
use serde::Serialize;
use std::collections::HashMap;

/// A user's cumulative record across a league's completed prompts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub user_id: UserId,
    /// Points from rounds in which the user also voted
    pub points: u32,
    pub rounds_played: u32,
    /// Rounds whose points counted towards `points`
    pub rounds_counted: u32,
    pub wins: u32,
    pub podiums: u32,
}

impl Competition {
    /// Cumulative league leaderboard over COMPLETED prompts.
    ///
    /// A response's points only count if its author voted in that round.
    /// Wins and podiums come from final ranks and always count.
    pub async fn league_standings(&self, league_id: &str) -> StoreResult<Vec<Standing>> {
        let prompts = self.store.prompts_for_league(league_id).await?;
        let mut totals: HashMap<UserId, Standing> = HashMap::new();

        for prompt in prompts.iter().filter(|p| p.status == PromptStatus::Completed) {
            let responses = self.store.responses_for_prompt(&prompt.id).await?;
            let votes = self.store.votes_for_prompt(&prompt.id).await?;
            let tally = tally_votes(&responses, &votes);

            for response in &responses {
                let entry = totals
                    .entry(response.user_id.clone())
                    .or_insert_with(|| Standing {
                        user_id: response.user_id.clone(),
                        ..Default::default()
                    });

                entry.rounds_played += 1;
                if tally.did_vote(&response.user_id) {
                    entry.points += response.total_points;
                    entry.rounds_counted += 1;
                }
                match response.final_rank {
                    Some(1) => {
                        entry.wins += 1;
                        entry.podiums += 1;
                    }
                    Some(2..=3) => entry.podiums += 1,
                    _ => {}
                }
            }
        }

        let mut standings: Vec<Standing> = totals.into_values().collect();
        standings.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| b.wins.cmp(&a.wins))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(standings)
    }
}
