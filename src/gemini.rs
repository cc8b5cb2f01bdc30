//! Gemini API client for the language-understanding backend
//!
//! Sends one statement per request and asks for a JSON object back.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::ExtractionError;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: format!("{}/{}:generateContent", BASE_URL, model),
        })
    }

    /// Generate a JSON response for `text` under `system_prompt`
    pub async fn generate_json(&self, system_prompt: &str, text: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(ExtractionError::ConfigError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.base_url, self.api_key);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                top_p: 1.0,
                max_output_tokens: 512,
                response_mime_type: "application/json".to_string(),
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            },
        };

        info!("Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                ExtractionError::LlmError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(ExtractionError::LlmError(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            ExtractionError::LlmError(format!("Gemini parse error: {}", e))
        })?;

        extract_answer(gemini_response)
    }
}

/// First text part of the first candidate, refusing blocked generations
fn extract_answer(response: GeminiResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ExtractionError::LlmError("No response from Gemini API".to_string()))?;

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(ExtractionError::LlmError(
            "Gemini blocked the response".to_string(),
        ));
    }

    let answer = candidate
        .content
        .parts
        .into_iter()
        .next()
        .map(|p| p.text)
        .ok_or_else(|| ExtractionError::LlmError("Empty response from Gemini".to_string()))?;

    info!(
        finish_reason = ?candidate.finish_reason,
        chars = answer.len(),
        "Gemini response received"
    );

    Ok(answer)
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: i32,
    response_mime_type: String,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
    #[serde(alias = "finishReason")]
    finish_reason: Option<String>,
}
