//! Phase boundary math.
//!
//! Everything here is a pure function of the prompt, the league settings and
//! an explicit `now`, so it can be tested without a live clock.

use crate::error::SettingsError;
use crate::types::{LeagueSettings, Prompt, PromptStatus};
use chrono::{DateTime, Duration, Utc};

impl LeagueSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(1..=14).contains(&self.submission_days) {
            return Err(SettingsError::SubmissionDays(self.submission_days));
        }
        if !(1..=7).contains(&self.voting_days) {
            return Err(SettingsError::VotingDays(self.voting_days));
        }
        if !(1..=10).contains(&self.votes_per_player) {
            return Err(SettingsError::VotesPerPlayer(self.votes_per_player));
        }
        Ok(())
    }

    /// Length of the timed phase for a status, None for untimed statuses
    pub fn phase_length(&self, status: PromptStatus) -> Option<Duration> {
        match status {
            PromptStatus::Active => Some(Duration::days(i64::from(self.submission_days))),
            PromptStatus::Voting => Some(Duration::days(i64::from(self.voting_days))),
            PromptStatus::Scheduled | PromptStatus::Completed => None,
        }
    }
}

/// When the prompt's current phase ends
pub fn phase_end_time(prompt: &Prompt, settings: &LeagueSettings) -> Option<DateTime<Utc>> {
    let length = settings.phase_length(prompt.status)?;
    prompt.phase_started_at.map(|started| started + length)
}

pub fn is_expired(prompt: &Prompt, settings: &LeagueSettings, now: DateTime<Utc>) -> bool {
    phase_end_time(prompt, settings).is_some_and(|end| now >= end)
}

/// Time left in the current phase, clamped at zero
pub fn time_remaining(
    prompt: &Prompt,
    settings: &LeagueSettings,
    now: DateTime<Utc>,
) -> Option<Duration> {
    phase_end_time(prompt, settings).map(|end| (end - now).max(Duration::zero()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn prompt(status: PromptStatus, started: Option<DateTime<Utc>>) -> Prompt {
        Prompt {
            id: "p1".to_string(),
            league_id: "l1".to_string(),
            text: "Something blue".to_string(),
            status,
            queue_order: 1,
            phase_started_at: started,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn settings() -> LeagueSettings {
        LeagueSettings {
            submission_days: 7,
            voting_days: 2,
            votes_per_player: 3,
        }
    }

    #[test]
    fn test_active_phase_uses_submission_days() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let p = prompt(PromptStatus::Active, Some(start));
        assert_eq!(
            phase_end_time(&p, &settings()),
            Some(start + Duration::days(7))
        );
    }

    #[test]
    fn test_voting_phase_uses_voting_days() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let p = prompt(PromptStatus::Voting, Some(start));
        assert_eq!(
            phase_end_time(&p, &settings()),
            Some(start + Duration::days(2))
        );
    }

    #[test]
    fn test_untimed_statuses_have_no_end() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let far_future = start + Duration::days(365);

        for status in [PromptStatus::Scheduled, PromptStatus::Completed] {
            let p = prompt(status, Some(start));
            assert_eq!(phase_end_time(&p, &settings()), None);
            assert!(!is_expired(&p, &settings(), far_future));
        }
    }

    #[test]
    fn test_missing_start_never_expires() {
        let p = prompt(PromptStatus::Active, None);
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert!(!is_expired(&p, &settings(), now));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let p = prompt(PromptStatus::Active, Some(start));

        assert!(!is_expired(&p, &settings(), start));
        assert!(!is_expired(
            &p,
            &settings(),
            start + Duration::days(7) - Duration::seconds(1)
        ));
        assert!(is_expired(&p, &settings(), start + Duration::days(7)));
        assert!(is_expired(&p, &settings(), start + Duration::days(8)));
    }

    #[test]
    fn test_time_remaining_clamps_at_zero() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let p = prompt(PromptStatus::Voting, Some(start));

        assert_eq!(
            time_remaining(&p, &settings(), start + Duration::days(1)),
            Some(Duration::days(1))
        );
        assert_eq!(
            time_remaining(&p, &settings(), start + Duration::days(5)),
            Some(Duration::zero())
        );
    }

    #[test]
    fn test_settings_ranges() {
        assert!(settings().validate().is_ok());

        let mut s = settings();
        s.submission_days = 15;
        assert_eq!(s.validate(), Err(SettingsError::SubmissionDays(15)));

        let mut s = settings();
        s.voting_days = 0;
        assert_eq!(s.validate(), Err(SettingsError::VotingDays(0)));

        let mut s = settings();
        s.votes_per_player = 11;
        assert_eq!(s.validate(), Err(SettingsError::VotesPerPlayer(11)));
    }
}
