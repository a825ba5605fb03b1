use std::path::PathBuf;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::classifier::{Classifier, Vibe};
use crate::config::Config;
use crate::error::Result;
use crate::openai::VibeModel;
use crate::sorter::assign::{PlaylistAssigner, PlaylistStore};
use crate::sorter::runlog::{AssignmentStatus, RunLog};
use crate::spotify::{LikedTrack, SpotifyClient};

pub struct VibeSorter {
    spotify_client: SpotifyClient,
    classifier: Classifier,
    log_dir: PathBuf,
}

impl VibeSorter {
    pub async fn new(config: &Config, prompt: Option<String>) -> Result<Self> {
        let spotify_client = SpotifyClient::new(config).await?;

        let model = config
            .openai_api_key
            .as_ref()
            .map(|key| VibeModel::new(key.clone()));
        if prompt.is_some() && model.is_none() {
            warn!("Prompt given but OPENAI_API_KEY is not set; classification uses the rule table");
        }
        let classifier = Classifier::new(model, prompt);

        Ok(Self {
            spotify_client,
            classifier,
            log_dir: config.log_dir.clone(),
        })
    }

    /// One full run: fetch the library, classify and assign each track in
    /// order, persist the log, print the summary. Per-track failures are
    /// recorded, not propagated; a log-write failure is.
    pub async fn sort_library(&self, dry_run: bool, limit: usize) -> Result<RunLog> {
        let tracks = self.spotify_client.liked_tracks(limit).await?;

        info!(
            "Sorting {} liked tracks (dry_run={})",
            tracks.len(),
            dry_run
        );

        let log = run_pipeline(&self.classifier, &self.spotify_client, &tracks, dry_run).await;

        log.save(&self.log_dir)?;
        self.print_summary(&log);

        Ok(log)
    }

    fn print_summary(&self, log: &RunLog) {
        let added = log.count(AssignmentStatus::Added);
        let already = log.count(AssignmentStatus::AlreadyPresent);
        let planned = log.count(AssignmentStatus::Planned);
        let failed = log.count(AssignmentStatus::Failed);

        println!();
        println!("{}", "=".repeat(60));
        println!("{}", "RUN SUMMARY".bold());
        println!("{}", "=".repeat(60));
        println!("Tracks processed: {}", log.tracks_processed);
        println!("Added to playlists: {}", added.to_string().green());
        println!("Already present: {}", already.to_string().cyan());
        if planned > 0 {
            println!("Planned (dry run): {}", planned.to_string().yellow());
        }
        println!("Failed: {}", failed.to_string().red());
        println!("{}", "=".repeat(60));

        println!("\nVibe breakdown:");
        for vibe in Vibe::ALL {
            let count = log.vibe_count(vibe);
            if count == 0 {
                continue;
            }
            match log.playlists.get(vibe.name()) {
                Some(id) => println!("  {}: {} tracks (playlist {})", vibe.name().green(), count, id),
                None => println!("  {}: {} tracks", vibe.name().green(), count),
            }
        }

        if failed > 0 {
            println!("\n{}", "Some tracks could not be assigned:".yellow());
            for entry in log.entries.iter().filter(|e| e.status == AssignmentStatus::Failed) {
                println!(
                    "  {} ({})",
                    entry.title,
                    entry.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }
}

/// The per-track pipeline, generic over the playlist store so the
/// fetch-to-log coverage can be exercised without a live account.
pub(crate) async fn run_pipeline<S: PlaylistStore>(
    classifier: &Classifier,
    store: &S,
    tracks: &[LikedTrack],
    dry_run: bool,
) -> RunLog {
    let mut assigner = PlaylistAssigner::new(store, dry_run);
    let mut log = RunLog::new(classifier.prompt().map(|p| p.to_string()));

    let pb = ProgressBar::new(tracks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    for track in tracks {
        pb.set_message(format!("Sorting: {}", track.title));
        let vibe = classifier.classify(track).await;
        let assignment = assigner.assign(track, vibe).await;
        log.record(assignment);
        pb.inc(1);
    }

    pb.finish_with_message("Sorting complete");

    log.playlists = assigner.playlist_index();
    log
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorter::assign::testing::FakeStore;

    fn library() -> Vec<LikedTrack> {
        vec![
            LikedTrack::mock("T1", "Study Session").with_genres(&["lo-fi beats"]),
            LikedTrack::mock("T2", "Cursed Track").with_traits(0.8, 0.9, 0.7, 109.0),
            LikedTrack::mock("T3", "Mystery Song"),
        ]
    }

    #[tokio::test]
    async fn test_every_fetched_track_is_logged_despite_failures() {
        let store = FakeStore {
            fail_adds_for: ["T2".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let classifier = Classifier::rules_only();

        let log = run_pipeline(&classifier, &store, &library(), false).await;

        assert_eq!(log.tracks_processed, 3);
        let ids: Vec<&str> = log.entries.iter().map(|e| e.track_id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2", "T3"]);

        assert_eq!(log.entries[0].status, AssignmentStatus::Added);
        assert_eq!(log.entries[0].vibe, Vibe::LoFiFocus);
        assert_eq!(log.entries[1].status, AssignmentStatus::Failed);
        assert_eq!(log.entries[2].status, AssignmentStatus::Added);
        assert_eq!(log.entries[2].vibe, Vibe::Unclassified);
    }

    #[tokio::test]
    async fn test_playlist_index_covers_touched_vibes() {
        let store = FakeStore::default();
        let classifier = Classifier::rules_only();

        let log = run_pipeline(&classifier, &store, &library(), false).await;

        assert!(log.playlists.contains_key("Lo-Fi Focus"));
        assert!(log.playlists.contains_key("Hype Gym"));
        assert!(log.playlists.contains_key("Unclassified"));
        assert_eq!(log.playlists.len(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_pipeline_only_plans() {
        let store = FakeStore::default();
        let classifier = Classifier::rules_only();

        let log = run_pipeline(&classifier, &store, &library(), true).await;

        assert_eq!(log.count(AssignmentStatus::Planned), 3);
        assert!(log.playlists.is_empty());

        let state = store.state.lock().unwrap();
        assert_eq!(state.creates, 0);
        assert_eq!(state.adds, 0);
    }
}
