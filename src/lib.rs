pub mod classifier;
pub mod config;
pub mod error;
pub mod openai;
pub mod sorter;
pub mod spotify;

pub use classifier::{classify_by_rules, parse_vibe_reply, Classifier, Vibe};
pub use config::Config;
pub use error::{AppError, Result};
pub use openai::VibeModel;
pub use sorter::{Assignment, AssignmentStatus, PlaylistStore, RunLog, VibeSorter};
pub use spotify::{AudioTraits, LikedTrack, PlaylistRef, SpotifyClient};
