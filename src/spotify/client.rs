use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

use async_trait::async_trait;
use rspotify::{
    model::{ArtistId, PlayableId, PlaylistId, TrackId, UserId},
    prelude::*,
    scopes, AuthCodeSpotify, Credentials, OAuth,
};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::sorter::PlaylistStore;
use crate::spotify::models::{AudioTraits, LikedTrack, PlaylistRef};

pub struct SpotifyClient {
    client: AuthCodeSpotify,
    user_id: UserId<'static>,
}

impl SpotifyClient {
    pub async fn new(config: &Config) -> Result<Self> {
        let creds = Credentials::new(&config.spotify_client_id, &config.spotify_client_secret);

        let oauth = OAuth {
            redirect_uri: config.spotify_redirect_uri.clone(),
            scopes: scopes!(
                "user-library-read",
                "playlist-read-private",
                "playlist-modify-private",
                "playlist-modify-public"
            ),
            ..Default::default()
        };

        let client = AuthCodeSpotify::new(creds, oauth);

        // Get authorization URL
        let auth_url = client.get_authorize_url(false)?;
        println!("\nOpen this URL in your browser to authorize Spotify:");
        println!("{}\n", auth_url);

        print!("Enter the URL you were redirected to: ");
        io::stdout().flush()?;

        let mut redirect_url = String::new();
        io::stdin().read_line(&mut redirect_url)?;

        let code = client
            .parse_response_code(redirect_url.trim())
            .ok_or_else(|| AppError::Auth("Failed to parse authorization code".into()))?;

        client.request_token(&code).await?;

        // Get current user
        let user = client.current_user().await?;
        let user_id = user.id;
        let display_name = user.display_name.unwrap_or_else(|| user_id.id().to_string());

        info!("Successfully authenticated as Spotify user: {}", display_name);

        Ok(Self { client, user_id })
    }

    /// Fetch up to `limit` saved tracks from the user's library, in the
    /// order Spotify returns them, with audio traits and primary-artist
    /// genres attached where available.
    pub async fn liked_tracks(&self, limit: usize) -> Result<Vec<LikedTrack>> {
        let mut entries: Vec<(LikedTrack, Option<ArtistId<'static>>)> = Vec::new();
        let mut offset = 0;

        while entries.len() < limit {
            let page_limit = std::cmp::min(50, limit - entries.len()) as u32;
            let page = self
                .client
                .current_user_saved_tracks_manual(None, Some(page_limit), Some(offset))
                .await?;

            if page.items.is_empty() {
                break;
            }

            for saved in &page.items {
                let track = &saved.track;
                // Local tracks have no ID and cannot be added to playlists
                if track.id.is_none() {
                    debug!("Skipping local track: {}", track.name);
                    continue;
                }

                let liked = LikedTrack {
                    id: track.id.as_ref().map(|id| id.id().to_string()).unwrap_or_default(),
                    title: track.name.clone(),
                    artists: track.artists.iter().map(|a| a.name.clone()).collect(),
                    album: track.album.name.clone(),
                    traits: None,
                    genres: Vec::new(),
                };
                let primary_artist = track.artists.first().and_then(|a| a.id.clone());
                entries.push((liked, primary_artist));
            }

            offset += page.items.len() as u32;
            if page.next.is_none() {
                break;
            }
        }

        self.attach_audio_traits(&mut entries).await;
        self.attach_genres(&mut entries).await;

        info!("Fetched {} liked tracks", entries.len());
        Ok(entries.into_iter().map(|(track, _)| track).collect())
    }

    async fn attach_audio_traits(&self, entries: &mut [(LikedTrack, Option<ArtistId<'static>>)]) {
        let ids: Vec<TrackId<'static>> = entries
            .iter()
            .filter_map(|(track, _)| TrackId::from_id(track.id.clone()).ok())
            .collect();

        let mut traits_by_id: HashMap<String, AudioTraits> = HashMap::new();
        for chunk in ids.chunks(100) {
            match self.client.tracks_features(chunk.iter().cloned()).await {
                Ok(Some(features)) => {
                    for af in features {
                        traits_by_id.insert(
                            af.id.id().to_string(),
                            AudioTraits {
                                valence: af.valence,
                                energy: af.energy,
                                danceability: af.danceability,
                                tempo: af.tempo,
                            },
                        );
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to fetch audio features batch: {}", e),
            }
        }

        for (track, _) in entries.iter_mut() {
            track.traits = traits_by_id.get(&track.id).copied();
        }
    }

    async fn attach_genres(&self, entries: &mut [(LikedTrack, Option<ArtistId<'static>>)]) {
        let mut seen = HashSet::new();
        let wanted: Vec<ArtistId<'static>> = entries
            .iter()
            .filter_map(|(_, artist)| artist.clone())
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let mut genres_by_artist: HashMap<ArtistId<'static>, Vec<String>> = HashMap::new();
        for chunk in wanted.chunks(50) {
            match self.client.artists(chunk.iter().cloned()).await {
                Ok(artists) => {
                    for artist in artists {
                        genres_by_artist.insert(artist.id, artist.genres);
                    }
                }
                Err(e) => warn!("Failed to fetch artist genres batch: {}", e),
            }
        }

        for (track, artist) in entries.iter_mut() {
            if let Some(genres) = artist.as_ref().and_then(|id| genres_by_artist.get(id)) {
                track.genres = genres.clone();
            }
        }
    }
}

#[async_trait]
impl PlaylistStore for SpotifyClient {
    async fn find_playlist(&self, name: &str) -> Result<Option<PlaylistRef>> {
        let limit = 50;
        let mut offset = 0;

        loop {
            let page = self
                .client
                .current_user_playlists_manual(Some(limit), Some(offset))
                .await?;

            for playlist in &page.items {
                // Only playlists owned by the current user count as reusable
                if playlist.owner.id == self.user_id && playlist.name == name {
                    return Ok(Some(PlaylistRef {
                        id: playlist.id.id().to_string(),
                        name: playlist.name.clone(),
                    }));
                }
            }

            if page.next.is_none() {
                return Ok(None);
            }
            offset += limit;
        }
    }

    async fn create_playlist(&self, name: &str, description: &str) -> Result<PlaylistRef> {
        let playlist = self
            .client
            .user_playlist_create(
                self.user_id.clone(),
                name,
                Some(false),
                None,
                Some(description),
            )
            .await?;

        info!("Created playlist: {}", name);

        Ok(PlaylistRef {
            id: playlist.id.id().to_string(),
            name: playlist.name,
        })
    }

    async fn playlist_track_ids(&self, playlist: &PlaylistRef) -> Result<HashSet<String>> {
        let playlist_id = PlaylistId::from_id(playlist.id.clone())?;
        let mut track_ids = HashSet::new();
        let limit = 100;
        let mut offset = 0;

        loop {
            let page = self
                .client
                .playlist_items_manual(playlist_id.clone_static(), None, None, Some(limit), Some(offset))
                .await?;

            for item in &page.items {
                if let Some(rspotify::model::PlayableItem::Track(track)) = &item.track {
                    if let Some(id) = &track.id {
                        track_ids.insert(id.id().to_string());
                    }
                }
            }

            if page.next.is_none() {
                break;
            }
            offset += limit;
        }

        debug!(
            "Playlist {} currently holds {} tracks",
            playlist.name,
            track_ids.len()
        );
        Ok(track_ids)
    }

    async fn add_track(&self, playlist: &PlaylistRef, track_id: &str) -> Result<()> {
        let playlist_id = PlaylistId::from_id(playlist.id.clone())?;
        let track = TrackId::from_id(track_id.to_string())?;

        self.client
            .playlist_add_items(playlist_id, [PlayableId::Track(track)], None)
            .await?;

        Ok(())
    }
}
