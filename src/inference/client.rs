use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use super::{InferenceClient, InferenceError, ToolCallRequest};
use crate::config::InferenceConfig;

pub struct OpenAiClient {
    http: Client,
    config: InferenceConfig,
}

impl OpenAiClient {
    pub fn new(config: InferenceConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("build inference http client")?;
        Ok(Self { http, config })
    }

    fn build_body(&self, req: &ToolCallRequest) -> ChatRequest {
        let mut content = vec![json!({ "type": "text", "text": req.user_text })];
        content.extend(
            req.images
                .iter()
                .map(|url| json!({ "type": "image_url", "image_url": { "url": url } })),
        );

        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                json!({ "role": "system", "content": req.system }),
                json!({ "role": "user", "content": content }),
            ],
            tools: vec![json!({
                "type": "function",
                "function": {
                    "name": req.tool.name,
                    "description": req.tool.description,
                    "parameters": req.tool.parameters,
                }
            })],
            tool_choice: json!({ "type": "function", "function": { "name": req.tool.name } }),
        }
    }
}

#[async_trait]
impl InferenceClient for OpenAiClient {
    #[instrument(skip(self, req), fields(tool = req.tool.name, images = req.images.len()))]
    async fn call_tool(&self, req: &ToolCallRequest) -> Result<Value, InferenceError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&self.build_body(req))
            .send()
            .await
            .map_err(|err| InferenceError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "model request rejected");
            return Err(classify_status(status, body));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| InferenceError::InvalidResponse(err.to_string()))?;
        let args = extract_tool_arguments(payload, req.tool.name)?;
        debug!("tool call received");
        Ok(args)
    }
}

pub(crate) fn classify_status(status: StatusCode, body: String) -> InferenceError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => InferenceError::RateLimited,
        StatusCode::PAYMENT_REQUIRED => InferenceError::QuotaExhausted,
        other => InferenceError::Status {
            status: other.as_u16(),
            body,
        },
    }
}

/// Pulls the forced tool call out of the first choice and parses its
/// arguments, which the API delivers as a JSON-encoded string.
fn extract_tool_arguments(payload: ChatResponse, tool: &str) -> Result<Value, InferenceError> {
    let call = payload
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.tool_calls.into_iter().next())
        .ok_or_else(|| InferenceError::InvalidResponse("no tool call in response".into()))?;

    if call.function.name != tool {
        return Err(InferenceError::InvalidResponse(format!(
            "unexpected tool call {}",
            call.function.name
        )));
    }

    serde_json::from_str(&call.function.arguments)
        .map_err(|e| InferenceError::InvalidResponse(format!("tool arguments: {e}")))
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    tools: Vec<Value>,
    tool_choice: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}
