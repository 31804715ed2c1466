//! Client for the external text-generation service.

use engine::timeline::Scene;
use serde_json::Value;

use crate::error::PipelineError;

const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8001";

fn service_url() -> String {
    std::env::var("GEN_SERVICE_URL").unwrap_or_else(|_| DEFAULT_SERVICE_URL.to_string())
}

/// Send one prompt, get back free text to mine for structure.
pub async fn generate(prompt: &str) -> Result<String, PipelineError> {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/generate", service_url()))
        .json(&serde_json::json!({ "prompt": prompt }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(PipelineError::ExternalProcess {
            stage: "generate".to_string(),
            code: response.status().to_string(),
            detail: response.text().await.unwrap_or_default(),
        });
    }

    let body: Value = response.json().await?;
    match body.get("text").and_then(|t| t.as_str()) {
        Some(text) => Ok(text.to_string()),
        None => Err(PipelineError::MalformedResponse),
    }
}

/// Locate the first well-formed JSON array literal anywhere in a
/// response. The service wraps its answers in prose (and sometimes
/// code fences), so every `[` is tried as a candidate start until one
/// parses.
pub fn extract_json_array(text: &str) -> Result<Value, PipelineError> {
    for (idx, ch) in text.char_indices() {
        if ch != '[' {
            continue;
        }
        let mut de = serde_json::Deserializer::from_str(&text[idx..]);
        if let Ok(value) = <Value as serde::Deserialize>::deserialize(&mut de) {
            if value.is_array() {
                return Ok(value);
            }
        }
    }
    Err(PipelineError::MalformedResponse)
}

/// Generate one keyframe prompt per scene. Rejects an empty scene list
/// before touching the network.
pub async fn generate_keyframe_prompts(scenes: &[Scene]) -> Result<Value, PipelineError> {
    if scenes.is_empty() {
        return Err(PipelineError::InputMissing(
            "no scenes; run the storyboard stage first".to_string(),
        ));
    }

    let descriptions: Vec<String> = scenes
        .iter()
        .map(|s| format!("{} ({:.1}-{:.1}s): {}", s.label, s.start, s.end, s.description))
        .collect();
    let prompt = format!(
        "For each scene below, write one image-generation prompt for its keyframe. \
         Respond with a JSON array of strings, one per scene, in order.\n\n{}",
        descriptions.join("\n")
    );

    let text = generate(&prompt).await?;
    let prompts = extract_json_array(&text)?;
    if prompts.as_array().map(|a| a.len()) != Some(scenes.len()) {
        return Err(PipelineError::MalformedResponse);
    }
    Ok(prompts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_array_wrapped_in_prose() {
        let text = "Sure! Here are the prompts:\n[\"a\", \"b\"]\nLet me know.";
        let value = extract_json_array(text).unwrap();
        assert_eq!(value, serde_json::json!(["a", "b"]));
    }

    #[test]
    fn finds_array_inside_code_fence() {
        let text = "```json\n[{\"label\": \"intro\"}]\n```";
        let value = extract_json_array(text).unwrap();
        assert_eq!(value[0]["label"], "intro");
    }

    #[test]
    fn skips_broken_bracket_before_real_array() {
        let text = "ranges like [0..5 are not JSON, but [1, 2, 3] is";
        let value = extract_json_array(text).unwrap();
        assert_eq!(value, serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn no_array_is_malformed() {
        assert!(matches!(
            extract_json_array("I could not produce that."),
            Err(PipelineError::MalformedResponse)
        ));
    }

    #[tokio::test]
    async fn empty_scenes_rejected_before_any_call() {
        // Would hang or error on the network if it ever got that far;
        // InputMissing must come back immediately.
        let result = generate_keyframe_prompts(&[]).await;
        assert!(matches!(result, Err(PipelineError::InputMissing(_))));
    }
}
