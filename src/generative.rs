//! External generative-language service contract
//!
//! The assistant works with this dependency absent; when present it gets one
//! bounded attempt per request.

use crate::error::ExternalServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait GenerativeService: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<String, ExternalServiceError>;
}
