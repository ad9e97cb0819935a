//! Hosted text-generation model access.
//!
//! [`TextModel`] is the transport seam: one prompt plus a system instruction
//! in, raw text out. [`ModelInvoker`] wraps it with the capability check and
//! turns provider failures into [`AdvisorError`] kinds. It never retries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::capability::Capability;
use crate::config::{AdvisorConfig, MAX_OUTPUT_TOKENS, TEMPERATURE};
use crate::error::{AdvisorError, ProviderError};

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub prompt: String,
    pub system_instruction: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

/// Gemini `generateContent` over HTTPS.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Builds a client only when the configuration carries a usable credential.
    pub fn from_config(config: &AdvisorConfig) -> anyhow::Result<Option<Self>> {
        match config.capability.credential() {
            Some(credential) => Ok(Some(Self::new(
                &config.endpoint,
                &config.model,
                credential.expose(),
            )?)),
            None => Ok(None),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn generate(&self, request: &ModelRequest) -> Result<String, ProviderError> {
        let body = json!({
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
            "generationConfig": {
                "maxOutputTokens": request.max_output_tokens,
                "temperature": request.temperature,
            },
        });

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let status = e.status();
                let err = ProviderError::new(format!("Request failed: {}", e.without_url()));
                match status {
                    Some(status) => err.with_status(status.as_u16()),
                    None => err,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = ProviderError::new(format!("HTTP {} from Gemini", status))
                .with_status(status.as_u16());
            return Err(match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => {
                    let err = ProviderError {
                        message: envelope.error.message,
                        ..err
                    };
                    match envelope.error.status {
                        Some(code) => err.with_code(code),
                        None => err,
                    }
                }
                Err(_) => err,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(format!("Failed to decode response: {}", e)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::new("Gemini returned an empty response"));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Capability-gated, single-attempt model call.
#[derive(Clone)]
pub struct ModelInvoker {
    capability: Capability,
    model: Option<Arc<dyn TextModel>>,
}

impl ModelInvoker {
    pub fn new(capability: Capability, model: Option<Arc<dyn TextModel>>) -> Self {
        Self { capability, model }
    }

    pub fn is_available(&self) -> bool {
        self.capability.is_available() && self.model.is_some()
    }

    pub async fn invoke(
        &self,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<String, AdvisorError> {
        let model = match (&self.model, self.capability.is_available()) {
            (Some(model), true) => model,
            _ => return Err(AdvisorError::Unavailable),
        };

        let request = ModelRequest {
            prompt: prompt.to_string(),
            system_instruction: system_instruction.to_string(),
            max_output_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        };

        model.generate(&request).await.map_err(|err| {
            let kind = err.classify();
            tracing::debug!(model = model.name(), error = %err, kind = kind.kind(), "model call failed");
            kind
        })
    }
}

type ScriptedReply = Result<String, ProviderError>;

/// In-process [`TextModel`] that answers from a script keyed by prompt
/// substrings. The first matching rule wins; unmatched prompts get the
/// default reply.
pub struct ScriptedModel {
    rules: Vec<(String, ScriptedReply)>,
    default: ScriptedReply,
    calls: AtomicUsize,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(default: ScriptedReply) -> Self {
        Self {
            rules: Vec::new(),
            default,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(text: impl Into<String>) -> Self {
        Self::new(Ok(text.into()))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(Err(error))
    }

    pub fn when(mut self, needle: impl Into<String>, reply: ScriptedReply) -> Self {
        self.rules.push((needle.into(), reply));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    async fn generate(&self, request: &ModelRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        self.rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available() -> Capability {
        Capability::from_sources(Some("AIzaSyA-0123456789abcdefghij".to_string()), None)
    }

    #[tokio::test]
    async fn unavailable_capability_skips_the_network() {
        let model = Arc::new(ScriptedModel::always("{}"));
        let invoker = ModelInvoker::new(Capability::unavailable(), Some(model.clone()));

        let result = invoker.invoke("prompt", "system").await;
        assert_eq!(result, Err(AdvisorError::Unavailable));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_model_is_unavailable() {
        let invoker = ModelInvoker::new(available(), None);
        assert!(!invoker.is_available());
        assert_eq!(invoker.invoke("p", "s").await, Err(AdvisorError::Unavailable));
    }

    #[tokio::test]
    async fn requests_carry_fixed_generation_settings() {
        let model = Arc::new(ScriptedModel::always("ok"));
        let invoker = ModelInvoker::new(available(), Some(model.clone()));

        let text = invoker.invoke("the prompt", "the system").await.unwrap();
        assert_eq!(text, "ok");

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_output_tokens, 4000);
        assert!((requests[0].temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(requests[0].system_instruction, "the system");
    }

    #[tokio::test]
    async fn provider_failures_are_classified_once() {
        let model = Arc::new(ScriptedModel::failing(
            ProviderError::new("Resource has been exhausted (e.g. check quota).").with_status(429),
        ));
        let invoker = ModelInvoker::new(available(), Some(model.clone()));

        assert_eq!(invoker.invoke("p", "s").await, Err(AdvisorError::Quota));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn scripted_rules_match_prompt_substrings() {
        let model = ScriptedModel::always("default").when("Avery", Ok("avery".to_string()));
        let request = |prompt: &str| ModelRequest {
            prompt: prompt.to_string(),
            system_instruction: String::new(),
            max_output_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        };

        assert_eq!(model.generate(&request("Student: Avery Lee")).await.unwrap(), "avery");
        assert_eq!(model.generate(&request("Student: Kiara")).await.unwrap(), "default");
    }

    #[test]
    fn gemini_client_is_only_built_with_a_credential() {
        let config = AdvisorConfig::with_capability(Capability::unavailable());
        assert!(GeminiClient::from_config(&config).unwrap().is_none());

        let config = AdvisorConfig::with_capability(available());
        let client = GeminiClient::from_config(&config).unwrap().unwrap();
        assert!(client.url().ends_with("/models/gemini-2.0-flash-exp:generateContent"));
    }
}
