use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tracing::warn;

use crate::classifier::Vibe;
use crate::error::Result;
use crate::sorter::runlog::{Assignment, AssignmentStatus};
use crate::spotify::{LikedTrack, PlaylistRef};

/// Playlist operations the assigner needs. Implemented by `SpotifyClient`
/// and by an in-memory store in tests.
#[async_trait]
pub trait PlaylistStore {
    async fn find_playlist(&self, name: &str) -> Result<Option<PlaylistRef>>;
    async fn create_playlist(&self, name: &str, description: &str) -> Result<PlaylistRef>;
    async fn playlist_track_ids(&self, playlist: &PlaylistRef) -> Result<HashSet<String>>;
    async fn add_track(&self, playlist: &PlaylistRef, track_id: &str) -> Result<()>;
}

/// Sorts (track, vibe) pairs into category playlists. One playlist per
/// vibe per run, resolved lazily; membership is fetched once per playlist
/// so repeated runs never duplicate entries.
pub struct PlaylistAssigner<'a, S: PlaylistStore> {
    store: &'a S,
    dry_run: bool,
    playlists: HashMap<Vibe, PlaylistRef>,
    members: HashMap<String, HashSet<String>>,
}

impl<'a, S: PlaylistStore> PlaylistAssigner<'a, S> {
    pub fn new(store: &'a S, dry_run: bool) -> Self {
        Self {
            store,
            dry_run,
            playlists: HashMap::new(),
            members: HashMap::new(),
        }
    }

    /// Assign one track to its vibe playlist. Always returns an
    /// `Assignment`; store failures are captured in the record instead of
    /// aborting the run.
    pub async fn assign(&mut self, track: &LikedTrack, vibe: Vibe) -> Assignment {
        if self.dry_run {
            return Assignment::new(track, vibe, None, AssignmentStatus::Planned);
        }

        let playlist = match self.ensure_playlist(vibe).await {
            Ok(playlist) => playlist,
            Err(e) => {
                warn!("Failed to resolve playlist for {}: {}", vibe, e);
                return Assignment::failed(track, vibe, None, e.to_string());
            }
        };

        let already_present = match self.is_member(&playlist, &track.id).await {
            Ok(present) => present,
            Err(e) => {
                warn!("Failed to read members of {}: {}", playlist.name, e);
                return Assignment::failed(track, vibe, Some(playlist.id.clone()), e.to_string());
            }
        };

        if already_present {
            return Assignment::new(
                track,
                vibe,
                Some(playlist.id.clone()),
                AssignmentStatus::AlreadyPresent,
            );
        }

        match self.store.add_track(&playlist, &track.id).await {
            Ok(()) => {
                if let Some(members) = self.members.get_mut(&playlist.id) {
                    members.insert(track.id.clone());
                }
                Assignment::new(track, vibe, Some(playlist.id.clone()), AssignmentStatus::Added)
            }
            Err(e) => {
                warn!("Failed to add {} to {}: {}", track.title, playlist.name, e);
                Assignment::failed(track, vibe, Some(playlist.id.clone()), e.to_string())
            }
        }
    }

    /// Vibe name to playlist ID, for every playlist touched this run.
    pub fn playlist_index(&self) -> HashMap<String, String> {
        self.playlists
            .values()
            .map(|p| (p.name.clone(), p.id.clone()))
            .collect()
    }

    async fn ensure_playlist(&mut self, vibe: Vibe) -> Result<PlaylistRef> {
        if let Some(playlist) = self.playlists.get(&vibe) {
            return Ok(playlist.clone());
        }

        let name = vibe.name();
        let playlist = match self.store.find_playlist(name).await? {
            Some(existing) => existing,
            None => {
                let description = format!("VibePilot - {}", name);
                let created = self.store.create_playlist(name, &description).await?;
                // A fresh playlist has no members to fetch
                self.members.insert(created.id.clone(), HashSet::new());
                created
            }
        };

        self.playlists.insert(vibe, playlist.clone());
        Ok(playlist)
    }

    async fn is_member(&mut self, playlist: &PlaylistRef, track_id: &str) -> Result<bool> {
        if !self.members.contains_key(&playlist.id) {
            let ids = self.store.playlist_track_ids(playlist).await?;
            self.members.insert(playlist.id.clone(), ids);
        }
        Ok(self
            .members
            .get(&playlist.id)
            .is_some_and(|members| members.contains(track_id)))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;
    use crate::error::AppError;

    #[derive(Default)]
    pub struct FakeState {
        pub playlists: Vec<PlaylistRef>,
        pub members: HashMap<String, HashSet<String>>,
        pub creates: usize,
        pub adds: usize,
    }

    /// In-memory playlist store. Tracks listed in `fail_adds_for` error on
    /// add, mimicking a quota or authorization failure mid-run.
    #[derive(Default)]
    pub struct FakeStore {
        pub state: Mutex<FakeState>,
        pub fail_adds_for: HashSet<String>,
        pub fail_creates: bool,
    }

    impl FakeStore {
        pub fn with_playlist(self, id: &str, name: &str, member_ids: &[&str]) -> Self {
            {
                let mut state = self.state.lock().unwrap();
                state.playlists.push(PlaylistRef {
                    id: id.to_string(),
                    name: name.to_string(),
                });
                state.members.insert(
                    id.to_string(),
                    member_ids.iter().map(|m| m.to_string()).collect(),
                );
            }
            self
        }
    }

    #[async_trait]
    impl PlaylistStore for FakeStore {
        async fn find_playlist(&self, name: &str) -> Result<Option<PlaylistRef>> {
            let state = self.state.lock().unwrap();
            Ok(state.playlists.iter().find(|p| p.name == name).cloned())
        }

        async fn create_playlist(&self, name: &str, _description: &str) -> Result<PlaylistRef> {
            if self.fail_creates {
                return Err(AppError::Auth("authorization expired".into()));
            }
            let mut state = self.state.lock().unwrap();
            state.creates += 1;
            let playlist = PlaylistRef {
                id: format!("pl{}", state.creates),
                name: name.to_string(),
            };
            state.playlists.push(playlist.clone());
            state.members.insert(playlist.id.clone(), HashSet::new());
            Ok(playlist)
        }

        async fn playlist_track_ids(&self, playlist: &PlaylistRef) -> Result<HashSet<String>> {
            let state = self.state.lock().unwrap();
            Ok(state.members.get(&playlist.id).cloned().unwrap_or_default())
        }

        async fn add_track(&self, playlist: &PlaylistRef, track_id: &str) -> Result<()> {
            if self.fail_adds_for.contains(track_id) {
                return Err(AppError::Auth("quota exceeded".into()));
            }
            let mut state = self.state.lock().unwrap();
            state.adds += 1;
            state
                .members
                .entry(playlist.id.clone())
                .or_default()
                .insert(track_id.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeStore;
    use super::*;

    #[tokio::test]
    async fn test_assign_is_idempotent() {
        let store = FakeStore::default();
        let mut assigner = PlaylistAssigner::new(&store, false);
        let track = LikedTrack::mock("T1", "Study Session").with_genres(&["lo-fi"]);

        let first = assigner.assign(&track, Vibe::LoFiFocus).await;
        let second = assigner.assign(&track, Vibe::LoFiFocus).await;

        assert_eq!(first.status, AssignmentStatus::Added);
        assert_eq!(second.status, AssignmentStatus::AlreadyPresent);
        assert_eq!(first.playlist_id, second.playlist_id);

        // Exactly one membership despite two assignments
        let state = store.state.lock().unwrap();
        let members = state.members.values().next().unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(state.adds, 1);
    }

    #[tokio::test]
    async fn test_playlist_created_once_per_vibe() {
        let store = FakeStore::default();
        let mut assigner = PlaylistAssigner::new(&store, false);

        let a = LikedTrack::mock("T1", "Hurt");
        let b = LikedTrack::mock("T2", "Everybody Hurts");
        assigner.assign(&a, Vibe::SadBops).await;
        assigner.assign(&b, Vibe::SadBops).await;

        assert_eq!(store.state.lock().unwrap().creates, 1);
    }

    #[tokio::test]
    async fn test_existing_playlist_reused_with_membership() {
        let store = FakeStore::default().with_playlist("existing", "Chill Vibes", &["T1"]);
        let mut assigner = PlaylistAssigner::new(&store, false);

        let present = LikedTrack::mock("T1", "Sunday Morning");
        let fresh = LikedTrack::mock("T2", "Banana Pancakes");

        let first = assigner.assign(&present, Vibe::ChillVibes).await;
        let second = assigner.assign(&fresh, Vibe::ChillVibes).await;

        assert_eq!(first.status, AssignmentStatus::AlreadyPresent);
        assert_eq!(first.playlist_id.as_deref(), Some("existing"));
        assert_eq!(second.status, AssignmentStatus::Added);

        let state = store.state.lock().unwrap();
        assert_eq!(state.creates, 0);
        assert_eq!(state.adds, 1);
    }

    #[tokio::test]
    async fn test_failed_add_is_recorded_and_run_continues() {
        let store = FakeStore {
            fail_adds_for: ["T1".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let mut assigner = PlaylistAssigner::new(&store, false);

        let failing = LikedTrack::mock("T1", "Cursed Track");
        let fine = LikedTrack::mock("T2", "Fine Track");

        let first = assigner.assign(&failing, Vibe::HypeGym).await;
        let second = assigner.assign(&fine, Vibe::HypeGym).await;

        assert_eq!(first.status, AssignmentStatus::Failed);
        assert!(first.error.as_deref().unwrap_or("").contains("quota"));
        assert_eq!(second.status, AssignmentStatus::Added);
    }

    #[tokio::test]
    async fn test_failed_create_is_recorded() {
        let store = FakeStore {
            fail_creates: true,
            ..Default::default()
        };
        let mut assigner = PlaylistAssigner::new(&store, false);

        let track = LikedTrack::mock("T1", "Hurt");
        let assignment = assigner.assign(&track, Vibe::SadBops).await;

        assert_eq!(assignment.status, AssignmentStatus::Failed);
        assert!(assignment.playlist_id.is_none());
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let store = FakeStore::default();
        let mut assigner = PlaylistAssigner::new(&store, true);

        let track = LikedTrack::mock("T1", "Hurt");
        let assignment = assigner.assign(&track, Vibe::SadBops).await;

        assert_eq!(assignment.status, AssignmentStatus::Planned);
        assert!(assignment.playlist_id.is_none());

        let state = store.state.lock().unwrap();
        assert_eq!(state.creates, 0);
        assert_eq!(state.adds, 0);
    }
}
