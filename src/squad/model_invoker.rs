//! Model invocation (C3): the seam between an agent and whatever large
//! language model actually produces its output.
//!
//! [`ModelInvoker`] is intentionally narrow — one async method taking a
//! fully-built prompt and returning the model's raw text — because persona
//! injection and document-context rendering both happen before the call,
//! in [`crate::squad::agent`]. Swapping transports (a different model
//! provider, a scripted fixture in tests) never touches that prompt-building
//! logic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::{RuntimeError, RuntimeResult};

#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Invoke the model with a fully-assembled prompt and return its raw
    /// text response.
    async fn invoke(&self, prompt: &str, max_tokens: u32, temperature: f32) -> RuntimeResult<String>;
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

/// A [`ModelInvoker`] that speaks the Anthropic Messages API shape directly
/// over HTTP.
pub struct HttpModelInvoker {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model_id: String,
}

impl HttpModelInvoker {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        HttpModelInvoker {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl ModelInvoker for HttpModelInvoker {
    async fn invoke(&self, prompt: &str, max_tokens: u32, temperature: f32) -> RuntimeResult<String> {
        let body = AnthropicRequest {
            model: &self.model_id,
            max_tokens,
            temperature,
            messages: vec![AnthropicMessage { role: "user", content: prompt }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| RuntimeError::TransportFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RuntimeError::TransportFailure(format!(
                "model endpoint returned {}",
                response.status()
            )));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| RuntimeError::DecodeFailure(e.to_string()))?;

        parsed
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| RuntimeError::DecodeFailure("response had no content blocks".to_string()))
    }
}

/// Test doubles for [`ModelInvoker`]. Not gated behind `#[cfg(test)]` so
/// that both inline unit tests and the top-level `tests/` integration
/// suite can build agents against a scripted model without a real
/// transport.
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// A deterministic, in-memory [`ModelInvoker`] for tests: returns
    /// queued responses in order, recording every prompt it was handed so
    /// assertions can inspect exactly what was sent.
    pub struct ScriptedModelInvoker {
        responses: Mutex<Vec<RuntimeResult<String>>>,
        prompts_seen: Mutex<Vec<String>>,
    }

    impl ScriptedModelInvoker {
        pub fn new(responses: Vec<RuntimeResult<String>>) -> Self {
            // Responses are consumed front-to-back.
            let mut reversed = responses;
            reversed.reverse();
            ScriptedModelInvoker {
                responses: Mutex::new(reversed),
                prompts_seen: Mutex::new(Vec::new()),
            }
        }

        pub fn ok(texts: Vec<&str>) -> Self {
            Self::new(texts.into_iter().map(|t| Ok(t.to_string())).collect())
        }

        pub fn prompts_seen(&self) -> Vec<String> {
            self.prompts_seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelInvoker for ScriptedModelInvoker {
        async fn invoke(&self, prompt: &str, _max_tokens: u32, _temperature: f32) -> RuntimeResult<String> {
            self.prompts_seen.lock().unwrap().push(prompt.to_string());
            let mut responses = self.responses.lock().unwrap();
            responses
                .pop()
                .unwrap_or_else(|| Err(RuntimeError::TransportFailure("no scripted response left".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ScriptedModelInvoker;
    use super::*;

    #[tokio::test]
    async fn scripted_invoker_returns_queued_responses_in_order() {
        let invoker = ScriptedModelInvoker::ok(vec!["first", "second"]);
        assert_eq!(invoker.invoke("p1", 100, 0.5).await.unwrap(), "first");
        assert_eq!(invoker.invoke("p2", 100, 0.5).await.unwrap(), "second");
        assert_eq!(invoker.prompts_seen(), vec!["p1".to_string(), "p2".to_string()]);
    }

    #[tokio::test]
    async fn scripted_invoker_exhaustion_is_a_transport_failure() {
        let invoker = ScriptedModelInvoker::ok(vec![]);
        let err = invoker.invoke("p", 100, 0.5).await.unwrap_err();
        assert!(matches!(err, RuntimeError::TransportFailure(_)));
    }
}
