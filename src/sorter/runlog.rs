use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::Vibe;
use crate::error::Result;
use crate::spotify::LikedTrack;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Added,
    AlreadyPresent,
    Planned,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub track_id: String,
    pub title: String,
    pub vibe: Vibe,
    pub playlist_id: Option<String>,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Assignment {
    pub fn new(
        track: &LikedTrack,
        vibe: Vibe,
        playlist_id: Option<String>,
        status: AssignmentStatus,
    ) -> Self {
        Self {
            track_id: track.id.clone(),
            title: track.title.clone(),
            vibe,
            playlist_id,
            status,
            assigned_at: Utc::now(),
            error: None,
        }
    }

    pub fn failed(
        track: &LikedTrack,
        vibe: Vibe,
        playlist_id: Option<String>,
        error: String,
    ) -> Self {
        Self {
            track_id: track.id.clone(),
            title: track.title.clone(),
            vibe,
            playlist_id,
            status: AssignmentStatus::Failed,
            assigned_at: Utc::now(),
            error: Some(error),
        }
    }
}

/// One run's worth of assignments, appended in processing order and
/// persisted as a single timestamped file once the run finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    pub started_at: DateTime<Utc>,
    pub prompt: Option<String>,
    pub tracks_processed: usize,
    pub playlists: HashMap<String, String>,
    pub entries: Vec<Assignment>,
}

impl RunLog {
    pub fn new(prompt: Option<String>) -> Self {
        Self {
            started_at: Utc::now(),
            prompt,
            tracks_processed: 0,
            playlists: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, assignment: Assignment) {
        self.entries.push(assignment);
        self.tracks_processed = self.entries.len();
    }

    pub fn count(&self, status: AssignmentStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    pub fn vibe_count(&self, vibe: Vibe) -> usize {
        self.entries.iter().filter(|e| e.vibe == vibe).count()
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let timestamp = self.started_at.format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("log_{}.json", timestamp));
        let json = serde_json::to_string_pretty(self)?;

        fs::write(&path, json)?;

        info!("Run log saved to: {}", path.display());

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> RunLog {
        let mut log = RunLog::new(Some("late night coding".to_string()));
        let track = LikedTrack::mock("T1", "Midnight City");
        log.record(Assignment::new(
            &track,
            Vibe::NightDrive,
            Some("pl1".to_string()),
            AssignmentStatus::Added,
        ));
        let track = LikedTrack::mock("T2", "Cursed Track");
        log.record(Assignment::failed(
            &track,
            Vibe::HypeGym,
            None,
            "quota exceeded".to_string(),
        ));
        log
    }

    #[test]
    fn test_record_keeps_order_and_counts() {
        let log = sample_log();

        assert_eq!(log.tracks_processed, 2);
        assert_eq!(log.entries[0].track_id, "T1");
        assert_eq!(log.entries[1].track_id, "T2");
        assert_eq!(log.count(AssignmentStatus::Added), 1);
        assert_eq!(log.count(AssignmentStatus::Failed), 1);
        assert_eq!(log.vibe_count(Vibe::NightDrive), 1);
    }

    #[test]
    fn test_vibe_serializes_under_display_name() {
        let log = sample_log();
        let json = serde_json::to_string(&log).unwrap();

        assert!(json.contains("\"Night Drive\""));
        assert!(json.contains("\"added\""));
        assert!(json.contains("\"failed\""));
    }

    #[test]
    fn test_save_writes_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = sample_log();

        let path = log.save(dir.path()).unwrap();

        assert!(path.file_name().unwrap().to_string_lossy().starts_with("log_"));
        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: RunLog = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.tracks_processed, 2);
        assert_eq!(parsed.prompt.as_deref(), Some("late night coding"));
    }
}
