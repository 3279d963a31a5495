use crate::tally::Tally;
use crate::types::*;
use std::cmp::Ordering;

/// Final placement of one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedResponse {
    pub response_id: ResponseId,
    pub user_id: UserId,
    pub total_votes: u32,
    pub total_points: u32,
    pub final_rank: u32,
}

/// Order responses by points, then votes, then earliest submission, and
/// assign dense 1-based ranks. The response id settles identical
/// timestamps so the order is total.
pub fn rank_responses(responses: &[Response], tally: &Tally) -> Vec<RankedResponse> {
    let mut entries: Vec<(&Response, u32, u32)> = responses
        .iter()
        .map(|r| {
            let t = tally.for_response(&r.id);
            (r, t.total_points, t.total_votes)
        })
        .collect();

    entries.sort_by(|(a, a_points, a_votes), (b, b_points, b_votes)| {
        b_points
            .cmp(a_points)
            .then_with(|| b_votes.cmp(a_votes))
            .then_with(|| a.submitted_at.cmp(&b.submitted_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    entries
        .into_iter()
        .enumerate()
        .map(|(idx, (r, total_points, total_votes))| RankedResponse {
            response_id: r.id.clone(),
            user_id: r.user_id.clone(),
            total_votes,
            total_points,
            final_rank: idx as u32 + 1,
        })
        .collect()
}

/// Comparator for already-finalized responses, same key as `rank_responses`
pub fn compare_finalized(a: &Response, b: &Response) -> Ordering {
    match (a.final_rank, b.final_rank) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.submitted_at.cmp(&b.submitted_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tally::tally_votes;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn response(id: &str, submitted_minutes: i64) -> Response {
        Response {
            id: id.to_string(),
            prompt_id: "p1".to_string(),
            user_id: format!("user_{}", id),
            photo_url: format!("https://photos.example/{}.jpg", id),
            caption: None,
            submitted_at: base() + Duration::minutes(submitted_minutes),
            is_published: true,
            published_at: None,
            total_votes: 0,
            total_points: 0,
            final_rank: None,
        }
    }

    fn votes_for(response_id: &str, count: usize) -> Vec<Vote> {
        (0..count)
            .map(|i| {
                Vote::ordinary(
                    &"p1".to_string(),
                    &format!("voter_{}_{}", response_id, i),
                    &response_id.to_string(),
                    base(),
                )
            })
            .collect()
    }

    fn rank_of(ranked: &[RankedResponse], id: &str) -> u32 {
        ranked
            .iter()
            .find(|r| r.response_id == id)
            .map(|r| r.final_rank)
            .unwrap()
    }

    #[test]
    fn test_points_then_earliest_submission() {
        // R3 submitted before R2, both on 3 points
        let responses = vec![response("r1", 30), response("r2", 20), response("r3", 10)];
        let mut votes = votes_for("r1", 5);
        votes.extend(votes_for("r2", 3));
        votes.extend(votes_for("r3", 3));

        let tally = tally_votes(&responses, &votes);
        let ranked = rank_responses(&responses, &tally);

        assert_eq!(rank_of(&ranked, "r1"), 1);
        assert_eq!(rank_of(&ranked, "r3"), 2);
        assert_eq!(rank_of(&ranked, "r2"), 3);
    }

    #[test]
    fn test_equal_points_prefer_more_votes() {
        use crate::tally::ResponseTally;

        // "few" was submitted first but reached its points with fewer votes
        let responses = vec![response("few", 0), response("many", 30), response("other", 5)];
        let tally = Tally::from_totals([
            (
                "few",
                ResponseTally {
                    total_votes: 2,
                    total_points: 4,
                },
            ),
            (
                "many",
                ResponseTally {
                    total_votes: 4,
                    total_points: 4,
                },
            ),
            (
                "other",
                ResponseTally {
                    total_votes: 5,
                    total_points: 3,
                },
            ),
        ]);

        let ranked = rank_responses(&responses, &tally);

        assert_eq!(rank_of(&ranked, "many"), 1);
        assert_eq!(rank_of(&ranked, "few"), 2);
        assert_eq!(rank_of(&ranked, "other"), 3);
    }

    #[test]
    fn test_zero_vote_responses_rank_last() {
        let responses = vec![response("early", 0), response("late", 60)];
        let votes = votes_for("late", 1);

        let tally = tally_votes(&responses, &votes);
        let ranked = rank_responses(&responses, &tally);

        assert_eq!(ranked.len(), 2);
        assert_eq!(rank_of(&ranked, "late"), 1);
        assert_eq!(rank_of(&ranked, "early"), 2);
        let early = ranked.iter().find(|r| r.response_id == "early").unwrap();
        assert_eq!(early.total_points, 0);
        assert_eq!(early.total_votes, 0);
    }

    #[test]
    fn test_ranks_are_total_with_full_ties() {
        // Same points, same votes, same timestamp
        let responses: Vec<Response> = (0..6).map(|i| response(&format!("r{}", i), 0)).collect();
        let tally = tally_votes(&responses, &[]);

        let ranked = rank_responses(&responses, &tally);
        let mut ranks: Vec<u32> = ranked.iter().map(|r| r.final_rank).collect();
        ranks.sort_unstable();

        assert_eq!(ranks, (1..=6).collect::<Vec<u32>>());

        // Deterministic regardless of input order
        let mut reversed = responses.clone();
        reversed.reverse();
        let again = rank_responses(&reversed, &tally);
        assert_eq!(ranked, again);
    }

    #[test]
    fn test_empty_input() {
        let ranked = rank_responses(&[], &Tally::default());
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_compare_finalized_orders_by_rank() {
        let mut a = response("a", 0);
        let mut b = response("b", 5);
        a.final_rank = Some(2);
        b.final_rank = Some(1);
        assert_eq!(compare_finalized(&a, &b), Ordering::Greater);

        b.final_rank = None;
        assert_eq!(compare_finalized(&a, &b), Ordering::Less);
    }
}
