//! Structured calls to a hosted multimodal model.
//!
//! Every call forces exactly one tool (function) invocation and hands back
//! the tool's JSON arguments. Callers deserialize those into their own types.

mod client;

pub use client::OpenAiClient;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model rate limit exceeded")]
    RateLimited,
    #[error("model quota exhausted")]
    QuotaExhausted,
    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Tool the model is forced to call; `parameters` is a JSON schema.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub system: String,
    pub user_text: String,
    /// Image URLs, usually `data:` URLs with base64 payloads.
    pub images: Vec<String>,
    pub tool: ToolSpec,
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn call_tool(&self, req: &ToolCallRequest) -> Result<Value, InferenceError>;
}
