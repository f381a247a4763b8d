use crate::adapters::interface::{classify_adapter_error, AdapterError, TextGenerator};
use crate::adapters::providers::{GenerationSettings, ProviderKind};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl GeminiClient {
    pub fn new(settings: &GenerationSettings, api_key: String) -> CoreResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| CoreError::Config(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: settings.base_url().trim_end_matches('/').to_string(),
            model: settings
                .model()
                .trim()
                .trim_start_matches("models/")
                .to_string(),
            api_key,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }
}

impl TextGenerator for GeminiClient {
    fn provider_label(&self) -> &str {
        ProviderKind::Gemini.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> Result<String, AdapterError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let generation_config = if self.temperature.is_some() || self.max_tokens.is_some() {
            Some(GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            })
        } else {
            None
        };
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config,
        };

        debug!(model = %self.model, "gemini generateContent request");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(|e| classify_adapter_error(None, &e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(classify_adapter_error(
                Some(status.as_u16()),
                &format!("gemini API error ({}): {}", status, text),
            ));
        }

        let parsed: GeminiResponse = response.json().map_err(|e| {
            AdapterError::invalid_response(format!("failed to parse JSON: {}", e.without_url()))
        })?;
        first_candidate_text(parsed)
            .ok_or_else(|| AdapterError::invalid_response("response has no candidate text"))
    }
}

fn first_candidate_text(response: GeminiResponse) -> Option<String> {
    let candidate = response.candidates.into_iter().next()?;
    let text: String = candidate
        .content
        .parts
        .into_iter()
        .map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");
    Some(text).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_parts_are_concatenated() {
        let parsed: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"SECTION 1"},{"text":" FRS"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_candidate_text(parsed).as_deref(), Some("SECTION 1 FRS"));
    }

    #[test]
    fn blocked_response_has_no_text() {
        let parsed: GeminiResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert!(first_candidate_text(parsed).is_none());
    }
}
