use serde::{Deserialize, Serialize};

/// Normalized audio features for one track, as reported by Spotify.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AudioTraits {
    pub valence: f32,
    pub energy: f32,
    pub danceability: f32,
    pub tempo: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikedTrack {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    /// Missing when Spotify has no analysis for the track.
    pub traits: Option<AudioTraits>,
    /// Genre tags of the primary artist; empty when unknown.
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistRef {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
impl LikedTrack {
    pub fn mock(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            artists: vec!["Mock Artist".to_string()],
            album: "Mock Album".to_string(),
            traits: None,
            genres: Vec::new(),
        }
    }

    pub fn with_traits(mut self, valence: f32, energy: f32, danceability: f32, tempo: f32) -> Self {
        self.traits = Some(AudioTraits {
            valence,
            energy,
            danceability,
            tempo,
        });
        self
    }

    pub fn with_genres(mut self, genres: &[&str]) -> Self {
        self.genres = genres.iter().map(|g| g.to_string()).collect();
        self
    }
}
