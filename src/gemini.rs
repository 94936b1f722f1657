//! Gemini API client used for optional answer enrichment
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::{AssistantError, ExternalServiceError};
use crate::generative::{GenerationRequest, GenerativeService};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()
            .map_err(AssistantError::HttpError)?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/{}:generateContent", BASE_URL, model),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<String, ExternalServiceError> {
        if self.api_key.is_empty() {
            return Err(ExternalServiceError::NotConfigured);
        }

        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let body = build_request(&request);

        info!("Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                ExternalServiceError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(map_status(status, error_text));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            ExternalServiceError::Malformed(format!("Gemini parse error: {}", e))
        })?;

        let answer = extract_text(gemini_response)?;
        info!(chars = answer.len(), "Gemini response received");
        Ok(answer)
    }
}

fn map_status(status: StatusCode, body: String) -> ExternalServiceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        ExternalServiceError::Quota(body)
    } else {
        ExternalServiceError::Status {
            status: status.as_u16(),
            body,
        }
    }
}

fn build_request(request: &GenerationRequest) -> GeminiRequest {
    GeminiRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: request.prompt.clone(),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        },
        system_instruction: SystemInstruction {
            parts: vec![Part {
                text: SYSTEM_PROMPT.to_string(),
            }],
        },
    }
}

fn extract_text(response: GeminiResponse) -> std::result::Result<String, ExternalServiceError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ExternalServiceError::Malformed("No candidates in Gemini response".to_string()))?
        .content
        .parts
        .into_iter()
        .map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(ExternalServiceError::Malformed(
            "Empty response from Gemini".to_string(),
        ));
    }

    Ok(text.trim().to_string())
}

const SYSTEM_PROMPT: &str = r#"You are a friendly, good-humored personal finance assistant.

Guidelines:
- Keep the figures you are given exactly as they are
- Be structured and concise
- Add practical, encouraging advice
- Light pop-culture references are welcome"#;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
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
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
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
}
