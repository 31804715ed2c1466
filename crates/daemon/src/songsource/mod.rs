//! Client for the third-party song source. Authentication is a bearer
//! token buried in a browser cookie string the operator pastes into
//! the environment; when it expires the API answers 401 and the only
//! fix is logging in again.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;

const DEFAULT_API_BASE: &str = "https://studio-api.suno.ai";

fn api_base() -> String {
    std::env::var("SONG_SOURCE_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Pull the bearer credential out of a raw cookie string
/// (`__session=<jwt>; other=...`).
pub fn bearer_from_cookie(cookie: &str) -> Option<String> {
    cookie.split(';').find_map(|part| {
        let (name, value) = part.trim().split_once('=')?;
        if name == "__session" && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

fn credential() -> Result<String, PipelineError> {
    let cookie = std::env::var("SONG_SOURCE_COOKIE").map_err(|_| {
        PipelineError::InputMissing("SONG_SOURCE_COOKIE is not set".to_string())
    })?;
    bearer_from_cookie(&cookie).ok_or(PipelineError::CredentialExpired)
}

/// Fetch one song's metadata. 401 surfaces as the distinct
/// credential-expired error; any other non-2xx carries the upstream
/// status and body.
pub async fn fetch_song(id: &str) -> Result<SongInfo, PipelineError> {
    let token = credential()?;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/clip/{}", api_base(), id))
        .bearer_auth(token)
        .send()
        .await?;

    let status = response.status();
    if status.as_u16() == 401 {
        return Err(PipelineError::CredentialExpired);
    }
    if !status.is_success() {
        return Err(PipelineError::SongSource {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    let body: Value = response.json().await?;
    Ok(SongInfo {
        id: body
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or(id)
            .to_string(),
        title: body
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        audio_url: body
            .get("audio_url")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        duration: body
            .get("metadata")
            .and_then(|m| m.get("duration"))
            .and_then(|v| v.as_f64()),
    })
}

/// Download the song's audio to a local file.
pub async fn download_audio(info: &SongInfo, dest: &std::path::Path) -> Result<(), PipelineError> {
    let url = info.audio_url.as_deref().ok_or_else(|| {
        PipelineError::InputMissing(format!("song {} has no audio_url yet", info.id))
    })?;
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(PipelineError::SongSource {
            status: response.status().as_u16(),
            body: "audio download failed".to_string(),
        });
    }
    let bytes = response.bytes().await?;
    tokio::fs::write(dest, &bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_session_token_from_cookie() {
        let cookie = "ajs_anonymous_id=abc; __session=eyJhbGciOi.payload.sig; _ga=1";
        assert_eq!(
            bearer_from_cookie(cookie).as_deref(),
            Some("eyJhbGciOi.payload.sig")
        );
    }

    #[test]
    fn cookie_without_session_yields_nothing() {
        assert!(bearer_from_cookie("_ga=1; theme=dark").is_none());
        assert!(bearer_from_cookie("__session=").is_none());
    }
}
