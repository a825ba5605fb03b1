use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;
use tracing::{debug, warn};

use crate::openai::VibeModel;
use crate::spotify::LikedTrack;

const FUZZY_THRESHOLD: f64 = 0.85;

/// Genre tags and title keywords with a fixed vibe mapping.
/// First matching entry wins.
const KEYWORD_RULES: &[(&str, Vibe)] = &[
    ("lo-fi", Vibe::LoFiFocus),
    ("lofi", Vibe::LoFiFocus),
    ("chillhop", Vibe::LoFiFocus),
    ("ambient", Vibe::ChillVibes),
    ("sleep", Vibe::ChillVibes),
    ("workout", Vibe::HypeGym),
    ("edm", Vibe::HypeGym),
    ("synthwave", Vibe::NightDrive),
    ("r&b", Vibe::RomanticMood),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vibe {
    #[serde(rename = "Chill Vibes")]
    ChillVibes,
    #[serde(rename = "Sad Bops")]
    SadBops,
    #[serde(rename = "Hype Gym")]
    HypeGym,
    #[serde(rename = "Night Drive")]
    NightDrive,
    #[serde(rename = "Lo-Fi Focus")]
    LoFiFocus,
    #[serde(rename = "Romantic Mood")]
    RomanticMood,
    #[serde(rename = "Unclassified")]
    Unclassified,
}

impl Vibe {
    pub const ALL: [Vibe; 7] = [
        Vibe::ChillVibes,
        Vibe::SadBops,
        Vibe::HypeGym,
        Vibe::NightDrive,
        Vibe::LoFiFocus,
        Vibe::RomanticMood,
        Vibe::Unclassified,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Vibe::ChillVibes => "Chill Vibes",
            Vibe::SadBops => "Sad Bops",
            Vibe::HypeGym => "Hype Gym",
            Vibe::NightDrive => "Night Drive",
            Vibe::LoFiFocus => "Lo-Fi Focus",
            Vibe::RomanticMood => "Romantic Mood",
            Vibe::Unclassified => "Unclassified",
        }
    }

    /// Short phrases the model tends to use instead of the full name.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Vibe::ChillVibes => &["chill"],
            Vibe::SadBops => &["sad"],
            Vibe::HypeGym => &["hype", "gym"],
            Vibe::NightDrive => &["night drive"],
            Vibe::LoFiFocus => &["lo-fi", "lofi", "focus"],
            Vibe::RomanticMood => &["romantic", "romance"],
            Vibe::Unclassified => &[],
        }
    }

    pub fn rule_summary(&self) -> &'static str {
        match self {
            Vibe::ChillVibes => "valence > 0.6, danceability > 0.6, energy < 0.6",
            Vibe::SadBops => "valence < 0.3 and energy < 0.5",
            Vibe::HypeGym => "valence > 0.7 and energy > 0.7",
            Vibe::NightDrive => "tempo 100-130 bpm and energy >= 0.5",
            Vibe::LoFiFocus => "lo-fi genre tag or title keyword",
            Vibe::RomanticMood => "valence >= 0.5 and energy < 0.6",
            Vibe::Unclassified => "no rule matched",
        }
    }
}

impl std::fmt::Display for Vibe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Deterministic classification over audio traits, genre tags and title
/// keywords. First matching rule wins; no match means `Unclassified`.
/// Tracks without audio traits only consult the keyword table.
pub fn classify_by_rules(track: &LikedTrack) -> Vibe {
    if let Some(t) = &track.traits {
        if t.valence > 0.7 && t.energy > 0.7 {
            return Vibe::HypeGym;
        }
        if t.valence > 0.6 && t.danceability > 0.6 && t.energy < 0.6 {
            return Vibe::ChillVibes;
        }
        if t.valence < 0.3 && t.energy < 0.5 {
            return Vibe::SadBops;
        }
        if (100.0..=130.0).contains(&t.tempo) && t.energy >= 0.5 {
            return Vibe::NightDrive;
        }
    }

    if let Some(vibe) = keyword_vibe(track) {
        return vibe;
    }

    if let Some(t) = &track.traits {
        if t.valence >= 0.5 && t.energy < 0.6 {
            return Vibe::RomanticMood;
        }
    }

    Vibe::Unclassified
}

fn keyword_vibe(track: &LikedTrack) -> Option<Vibe> {
    let title = track.title.to_lowercase();

    for (needle, vibe) in KEYWORD_RULES {
        if track.genres.iter().any(|g| g.to_lowercase().contains(needle)) {
            return Some(*vibe);
        }
        if title.contains(needle) {
            return Some(*vibe);
        }
    }

    None
}

/// Extract a vibe from a free-text model reply. Matching is permissive:
/// case-insensitive name substring, then alias substring, then a
/// Jaro-Winkler pass against the vibe names.
pub fn parse_vibe_reply(reply: &str) -> Option<Vibe> {
    let reply = reply.trim().to_lowercase();
    if reply.is_empty() {
        return None;
    }

    for vibe in Vibe::ALL {
        if reply.contains(&vibe.name().to_lowercase()) {
            return Some(vibe);
        }
    }

    for vibe in Vibe::ALL {
        if vibe.aliases().iter().any(|alias| reply.contains(alias)) {
            return Some(vibe);
        }
    }

    let mut best_match: Option<Vibe> = None;
    let mut best_score: f64 = 0.0;

    for vibe in Vibe::ALL {
        let score = jaro_winkler(&reply, &vibe.name().to_lowercase());
        if score > best_score && score >= FUZZY_THRESHOLD {
            best_score = score;
            best_match = Some(vibe);
        }
    }

    best_match
}

pub struct Classifier {
    model: Option<VibeModel>,
    prompt: Option<String>,
}

impl Classifier {
    pub fn new(model: Option<VibeModel>, prompt: Option<String>) -> Self {
        Self { model, prompt }
    }

    pub fn rules_only() -> Self {
        Self {
            model: None,
            prompt: None,
        }
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Classify one track. When a prompt and a model credential are both
    /// present, a parseable model reply overrides the rule table; any
    /// model failure falls back to the rules and never aborts the run.
    pub async fn classify(&self, track: &LikedTrack) -> Vibe {
        if let (Some(model), Some(prompt)) = (&self.model, &self.prompt) {
            match model.suggest_vibe(track, prompt).await {
                Ok(reply) => {
                    if let Some(vibe) = parse_vibe_reply(&reply) {
                        return vibe;
                    }
                    debug!("Model reply named no known vibe: {}", reply);
                }
                Err(e) => {
                    warn!("Vibe model call failed, using rule table: {}", e);
                }
            }
        }

        classify_by_rules(track)
    }
}
