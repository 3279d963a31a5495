//! Store snapshots for backup and restoration.
//!
//! A snapshot is the full contents of a `MemoryStore` as JSON. The binary
//! loads one at start-up and writes one after every trigger run that changed
//! state.

use crate::error::{StoreError, StoreResult};
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Schema version for snapshot format compatibility
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub schema_version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub settings: HashMap<LeagueId, LeagueSettings>,
    #[serde(default)]
    pub prompts: HashMap<PromptId, Prompt>,
    #[serde(default)]
    pub responses: HashMap<ResponseId, Response>,
    #[serde(default)]
    pub votes: HashMap<VoteId, Vote>,
}

impl StoreSnapshot {
    /// Validate the snapshot before import
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version > EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Snapshot schema version {} is newer than supported version {}. \
                 Please update the server.",
                self.schema_version, EXPORT_SCHEMA_VERSION
            ));
        }

        for (league_id, settings) in &self.settings {
            if let Err(e) = settings.validate() {
                return Err(format!("League '{}' has invalid settings: {}", league_id, e));
            }
        }

        let mut current: HashMap<(&str, PromptStatus), &str> = HashMap::new();
        for (prompt_id, prompt) in &self.prompts {
            if !self.settings.contains_key(&prompt.league_id) {
                return Err(format!(
                    "Prompt '{}' references league '{}' which has no settings",
                    prompt_id, prompt.league_id
                ));
            }
            if prompt.status.is_current() {
                if let Some(other) =
                    current.insert((prompt.league_id.as_str(), prompt.status), prompt_id)
                {
                    return Err(format!(
                        "League '{}' has more than one {:?} prompt ('{}', '{}')",
                        prompt.league_id, prompt.status, other, prompt_id
                    ));
                }
            }
        }

        for (response_id, response) in &self.responses {
            if !self.prompts.contains_key(&response.prompt_id) {
                return Err(format!(
                    "Response '{}' references prompt '{}' which doesn't exist",
                    response_id, response.prompt_id
                ));
            }
        }

        for (vote_id, vote) in &self.votes {
            match self.responses.get(&vote.response_id) {
                Some(response) if response.prompt_id == vote.prompt_id => {}
                Some(_) => {
                    return Err(format!(
                        "Vote '{}' targets response '{}' outside prompt '{}'",
                        vote_id, vote.response_id, vote.prompt_id
                    ));
                }
                None => {
                    return Err(format!(
                        "Vote '{}' references response '{}' which doesn't exist",
                        vote_id, vote.response_id
                    ));
                }
            }
        }

        Ok(())
    }

    pub async fn read_from(path: &Path) -> StoreResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Snapshot(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| StoreError::Snapshot(format!("{}: {}", path.display(), e)))
    }

    /// Write via a uniquely named sibling temp file and rename, so readers
    /// never see a partial file and concurrent writers never share a temp file
    pub async fn write_to(&self, path: &Path) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StoreError::Snapshot(e.to_string()))?;
        let tmp = path.with_extension(format!("json.{}.tmp", ulid::Ulid::new()));
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::Snapshot(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::Snapshot(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> StoreSnapshot {
        StoreSnapshot {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: Utc::now(),
            settings: HashMap::new(),
            prompts: HashMap::new(),
            responses: HashMap::new(),
            votes: HashMap::new(),
        }
    }

    fn prompt(id: &str, league: &str, status: PromptStatus) -> Prompt {
        Prompt {
            id: id.to_string(),
            league_id: league.to_string(),
            text: "Golden hour".to_string(),
            status,
            queue_order: 1,
            phase_started_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validation_future_schema() {
        let mut snapshot = empty();
        snapshot.schema_version = EXPORT_SCHEMA_VERSION + 1;

        let result = snapshot.validate();
        assert!(result.unwrap_err().contains("newer than supported"));
    }

    #[test]
    fn test_validation_prompt_without_league() {
        let mut snapshot = empty();
        snapshot
            .prompts
            .insert("p1".to_string(), prompt("p1", "l1", PromptStatus::Scheduled));

        let result = snapshot.validate();
        assert!(result.unwrap_err().contains("has no settings"));
    }

    #[test]
    fn test_validation_two_active_prompts() {
        let mut snapshot = empty();
        snapshot
            .settings
            .insert("l1".to_string(), LeagueSettings::default());
        snapshot
            .prompts
            .insert("p1".to_string(), prompt("p1", "l1", PromptStatus::Active));
        snapshot
            .prompts
            .insert("p2".to_string(), prompt("p2", "l1", PromptStatus::Active));

        let result = snapshot.validate();
        assert!(result.unwrap_err().contains("more than one"));
    }

    #[test]
    fn test_validation_invalid_settings() {
        let mut snapshot = empty();
        snapshot.settings.insert(
            "l1".to_string(),
            LeagueSettings {
                submission_days: 30,
                voting_days: 3,
                votes_per_player: 3,
            },
        );

        let result = snapshot.validate();
        assert!(result.unwrap_err().contains("invalid settings"));
    }

    #[tokio::test]
    async fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut snapshot = empty();
        snapshot
            .settings
            .insert("l1".to_string(), LeagueSettings::default());
        snapshot
            .prompts
            .insert("p1".to_string(), prompt("p1", "l1", PromptStatus::Scheduled));

        snapshot.write_to(&path).await.unwrap();
        let loaded = StoreSnapshot::read_from(&path).await.unwrap();

        assert!(loaded.validate().is_ok());
        assert_eq!(loaded.prompts.len(), 1);
        assert_eq!(loaded.settings.get("l1"), Some(&LeagueSettings::default()));
    }

    #[tokio::test]
    async fn test_concurrent_writes_leave_a_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut small = empty();
        small
            .settings
            .insert("l1".to_string(), LeagueSettings::default());
        let mut large = small.clone();
        for i in 0..200 {
            let id = format!("p{}", i);
            large
                .prompts
                .insert(id.clone(), prompt(&id, "l1", PromptStatus::Scheduled));
        }

        let (a, b) = tokio::join!(small.write_to(&path), large.write_to(&path));
        a.unwrap();
        b.unwrap();

        let loaded = StoreSnapshot::read_from(&path).await.unwrap();
        assert!(loaded.prompts.is_empty() || loaded.prompts.len() == 200);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = StoreSnapshot::read_from(&dir.path().join("absent.json")).await;
        assert!(matches!(result, Err(StoreError::Snapshot(_))));
    }
}
