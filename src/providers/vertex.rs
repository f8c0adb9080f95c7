//! Vertex AI client for text generation and embeddings.
//!
//! Talks to the publisher-model REST endpoints:
//!
//! - `POST /v1/projects/{project}/locations/{location}/publishers/google/models/{model}:generateContent`
//! - `POST /v1/projects/{project}/locations/{location}/publishers/google/models/{model}:predict`
//! - `GET  /v1/publishers/google/models/{model}` (health probe)
//!
//! See: <https://cloud.google.com/vertex-ai/docs/reference/rest>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::traits::{EmbedRequest, GenerationBackend, ModelTarget, RemoteRequest};
use crate::types::{
    Embedding, FunctionCall, FunctionDeclaration, GenerateResponse, GenerationSettings,
    SafetySetting,
};
use crate::{GenkitError, Result};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the Vertex AI REST API.
///
/// Authenticates every call with a bearer access token.
#[derive(Clone)]
pub struct VertexClient {
    access_token: String,
    http: Client,
    /// Fixed base URL; `None` derives `https://{location}-aiplatform.googleapis.com`
    /// per request.
    base_url: Option<String>,
}

impl VertexClient {
    /// Create a client with the given access token and the default timeout.
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::builder(access_token).build()
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Self::builder(access_token).base_url(base_url).build()
    }

    pub fn builder(access_token: impl Into<String>) -> VertexClientBuilder {
        VertexClientBuilder {
            access_token: access_token.into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn base_url(&self, location: &str) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{location}-aiplatform.googleapis.com"),
        }
    }

    fn model_url(&self, target: &ModelTarget<'_>, method: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:{method}",
            self.base_url(target.location),
            target.project_id,
            target.location,
            target.model,
        )
    }

    /// Map non-success statuses to errors, reading the body for a message.
    async fn check_status(response: Response, model: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("Vertex AI API error: {status}"));

        match status.as_u16() {
            401 | 403 => Err(GenkitError::AuthenticationFailed),
            404 => Err(GenkitError::ModelNotFound(model.to_string())),
            429 => Err(GenkitError::RateLimited { retry_after }),
            code => Err(GenkitError::Api {
                status: code,
                message,
            }),
        }
    }
}

/// Builder for [`VertexClient`].
pub struct VertexClientBuilder {
    access_token: String,
    base_url: Option<String>,
    timeout: Duration,
}

impl VertexClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Transport timeout for every request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<VertexClient> {
        if self.access_token.trim().is_empty() {
            return Err(GenkitError::configuration(
                "credentials",
                "access token is empty",
            ));
        }
        let http = Client::builder()
            .timeout(self.timeout)
            .user_agent(crate::version::user_agent())
            .build()
            .map_err(|e| GenkitError::configuration("http", e.to_string()))?;
        Ok(VertexClient {
            access_token: self.access_token,
            http,
            base_url: self.base_url,
        })
    }
}

#[async_trait]
impl GenerationBackend for VertexClient {
    fn name(&self) -> &str {
        "vertex"
    }

    #[instrument(name = "vertex.generate", skip(self, request), fields(model = %request.target.model))]
    async fn generate(&self, request: &RemoteRequest<'_>) -> Result<GenerateResponse> {
        let url = self.model_url(&request.target, "generateContent");
        let body = GenerateContentRequest::new(request.prompt, request.settings, request.functions);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenkitError::Http(e.to_string()))?;

        let response = Self::check_status(response, request.target.model).await?;
        let text = response
            .text()
            .await
            .map_err(|e| GenkitError::Http(e.to_string()))?;
        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| GenkitError::MalformedResponse(e.to_string()))?;

        parsed.into_generate_response()
    }

    #[instrument(name = "vertex.embed", skip(self, request), fields(model = %request.target.model, count = request.texts.len()))]
    async fn embed(&self, request: &EmbedRequest<'_>) -> Result<Vec<Embedding>> {
        let url = self.model_url(&request.target, "predict");
        let body = PredictRequest {
            instances: request
                .texts
                .iter()
                .map(|text| EmbedInstance { content: text })
                .collect(),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenkitError::Http(e.to_string()))?;

        let response = Self::check_status(response, request.target.model).await?;
        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| GenkitError::MalformedResponse(e.to_string()))?;

        if parsed.predictions.len() != request.texts.len() {
            return Err(GenkitError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                request.texts.len(),
                parsed.predictions.len()
            )));
        }

        Ok(parsed
            .predictions
            .into_iter()
            .map(|p| Embedding::new(p.embeddings.values, request.target.model))
            .collect())
    }

    async fn health(&self, target: &ModelTarget<'_>) -> bool {
        let url = format!(
            "{}/v1/publishers/google/models/{}",
            self.base_url(target.location),
            target.model
        );
        match self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<&'a SafetySetting>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool<'a>>,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(
        prompt: &'a str,
        settings: &'a GenerationSettings,
        functions: &'a [FunctionDeclaration],
    ) -> Self {
        let tools = if functions.is_empty() {
            Vec::new()
        } else {
            vec![Tool {
                function_declarations: functions,
            }]
        };
        Self {
            contents: [Content {
                role: "user",
                parts: [TextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: settings.temperature,
                max_output_tokens: settings.max_output_tokens,
                top_p: settings.top_p,
                top_k: settings.top_k,
                candidate_count: settings.candidate_count,
                stop_sequences: &settings.stop_sequences,
            },
            safety_settings: settings.safety_settings.iter().collect(),
            tools,
        }
    }
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
    candidate_count: u32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop_sequences: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool<'a> {
    function_declarations: &'a [FunctionDeclaration],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<WireFunctionCall>,
}

#[derive(Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_generate_response(self) -> Result<GenerateResponse> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(GenkitError::Remote {
                    code: "CONTENT_BLOCKED".into(),
                    message: format!("prompt blocked: {reason}"),
                });
            }
            return Err(GenkitError::MalformedResponse(
                "response contained no candidates".into(),
            ));
        };

        let Some(content) = candidate.content else {
            let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".into());
            return Err(GenkitError::Remote {
                code: "CONTENT_BLOCKED".into(),
                message: format!("candidate has no content (finish reason {reason})"),
            });
        };

        let mut response = GenerateResponse::default();
        for part in content.parts {
            if let Some(text) = part.text {
                response.text.push_str(&text);
            }
            if let Some(call) = part.function_call {
                // Zero-argument calls may omit `args` or send null.
                let args = call
                    .args
                    .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
                response.function_calls.push(FunctionCall::new(call.name, args));
            }
        }

        if response.text.is_empty() && response.function_calls.is_empty() {
            return Err(GenkitError::MalformedResponse(
                "candidate contained neither text nor function calls".into(),
            ));
        }
        Ok(response)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: Vec<EmbedInstance<'a>>,
}

#[derive(Serialize)]
struct EmbedInstance<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
struct Prediction {
    embeddings: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: serde_json::Value) -> Result<GenerateResponse> {
        serde_json::from_value::<GenerateContentResponse>(body)
            .unwrap()
            .into_generate_response()
    }

    #[test]
    fn concatenates_text_parts() {
        let response = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.text, "Hello, world");
        assert!(response.function_calls.is_empty());
    }

    #[test]
    fn collects_function_calls() {
        let response = parse(json!({
            "candidates": [{
                "content": {"parts": [{"functionCall": {"name": "get_current_time", "args": {}}}]}
            }]
        }))
        .unwrap();
        assert_eq!(response.function_calls.len(), 1);
        assert_eq!(response.function_calls[0].name, "get_current_time");
    }

    #[test]
    fn missing_args_become_empty_object() {
        let response = parse(json!({
            "candidates": [{
                "content": {"parts": [
                    {"functionCall": {"name": "get_current_time"}},
                    {"functionCall": {"name": "get_current_time", "args": null}}
                ]}
            }]
        }))
        .unwrap();
        for call in &response.function_calls {
            assert_eq!(call.arguments, json!({}));
        }
        assert_eq!(response.function_calls.len(), 2);
    }

    #[test]
    fn blocked_prompt_is_remote_error() {
        let err = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap_err();
        assert_eq!(err.code(), "CONTENT_BLOCKED");
    }

    #[test]
    fn empty_candidates_are_malformed() {
        let err = parse(json!({"candidates": []})).unwrap_err();
        assert!(matches!(err, GenkitError::MalformedResponse(_)));
    }

    #[test]
    fn request_body_uses_vertex_field_names() {
        let settings = GenerationSettings::default();
        let functions = [FunctionDeclaration::new("f", "does f", json!({"type": "object"}))];
        let body = serde_json::to_value(GenerateContentRequest::new("hi", &settings, &functions))
            .unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert!(body["generationConfig"].get("stopSequences").is_none());
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 2);
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "f");
    }

    #[test]
    fn no_tools_without_functions() {
        let settings = GenerationSettings::default();
        let body = serde_json::to_value(GenerateContentRequest::new("hi", &settings, &[])).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(
            VertexClient::new("  "),
            Err(GenkitError::Configuration { .. })
        ));
    }
}
