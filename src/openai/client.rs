use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::classifier::Vibe;
use crate::error::{AppError, Result};
use crate::spotify::LikedTrack;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Single-turn chat-completion client used to refine vibe classification.
pub struct VibeModel {
    http_client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl VibeModel {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            endpoint: OPENAI_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Point at a custom endpoint (e.g. a compatible local proxy).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Ask the model which vibe fits the track, steered by the user's
    /// prompt. Returns the raw reply text; the caller parses it.
    pub async fn suggest_vibe(&self, track: &LikedTrack, prompt: &str) -> Result<String> {
        let vibe_names: Vec<&str> = Vibe::ALL.iter().map(|v| v.name()).collect();
        let system = format!(
            "You sort songs into vibe playlists. Reply with exactly one of: {}.",
            vibe_names.join(", ")
        );

        let mut user = format!(
            "{}\n\nTrack: {} by {}\nAlbum: {}",
            prompt,
            track.title,
            track.artists.join(", "),
            track.album
        );
        if !track.genres.is_empty() {
            user.push_str(&format!("\nGenres: {}", track.genres.join(", ")));
        }
        if let Some(t) = &track.traits {
            user.push_str(&format!(
                "\nValence {:.2}, energy {:.2}, danceability {:.2}, tempo {:.0} bpm",
                t.valence, t.energy, t.danceability, t.tempo
            ));
        }

        let payload = serde_json::json!({
            "model": self.model,
            "temperature": 0.0,
            "max_tokens": 16,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ]
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::OpenAiApi(format!(
                "Completion request failed ({}): {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::OpenAiApi(format!("Malformed completion response: {}", e)))?;

        let content = completion
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        debug!("Model reply for {}: {}", track.title, content);

        Ok(content.trim().to_string())
    }
}
