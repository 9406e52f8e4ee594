//! Model provider seam.
//!
//! The orchestrator treats language-model providers as an opaque capability:
//! given messages and options, return generated text, optional raw tool-call
//! requests and usage counters. Concrete HTTP integrations implement
//! [`ModelProvider`] outside this crate; nothing here knows about wire
//! formats beyond the raw tool-call values passed through for
//! [`crate::normalize`] to interpret.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use stockmind_context::TurnRole;
use stockmind_tools::FunctionSchema;

use crate::error::{OrchestratorError, Result};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// One message in the provider-facing conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: TurnRole,
    pub content: String,
}

impl ProviderMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// A full request handed to a provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub messages: Vec<ProviderMessage>,
    /// Function-call schemas the model may invoke.
    pub tools: Vec<FunctionSchema>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Token usage counters reported by a provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// The provider's answer for one completion.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Generated text.
    pub content: String,
    /// Raw tool-call requests exactly as the provider shaped them. Field
    /// naming varies between providers; [`crate::normalize`] maps them into
    /// the internal shape.
    pub tool_calls: Vec<Value>,
    pub usage: Usage,
    /// Model identifier that produced this response.
    pub model: String,
}

/// One incremental chunk of a streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Incremental text delta.
    pub delta: String,
    /// True on the provider's final chunk.
    pub done: bool,
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// An opaque language-model capability.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Stable provider identifier (e.g. `"anthropic"`, `"local"`).
    fn name(&self) -> &str;

    /// Whether the provider is currently able to serve requests.
    async fn is_available(&self) -> bool;

    /// Run one completion.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse>;

    /// Run one streaming completion, yielding incremental chunks.
    async fn stream(&self, request: ProviderRequest) -> Result<BoxStream<'static, StreamChunk>>;
}

// ---------------------------------------------------------------------------
// Fallback chain
// ---------------------------------------------------------------------------

/// Ordered provider chain; selection takes the first available entry.
///
/// Richer policies (cost, latency, health score) belong behind the same
/// `select` signature and are deliberately deferred.
#[derive(Clone, Default)]
pub struct FallbackChain {
    providers: Vec<Arc<dyn ModelProvider>>,
}

impl FallbackChain {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn ModelProvider>>) -> Self {
        Self { providers }
    }

    /// Builder: append a provider to the end of the chain.
    pub fn push(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Select the first available provider.
    pub async fn select(&self) -> Result<Arc<dyn ModelProvider>> {
        for provider in &self.providers {
            if provider.is_available().await {
                tracing::debug!(provider = provider.name(), "provider selected");
                return Ok(provider.clone());
            }
            tracing::warn!(provider = provider.name(), "provider unavailable, trying next");
        }
        Err(OrchestratorError::NoProvidersAvailable)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct FixedProvider {
        name: &'static str,
        available: bool,
    }

    #[async_trait]
    impl ModelProvider for FixedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse> {
            Ok(ProviderResponse {
                content: format!("answer from {}", self.name),
                tool_calls: Vec::new(),
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 5,
                },
                model: "fixed-1".into(),
            })
        }

        async fn stream(
            &self,
            _request: ProviderRequest,
        ) -> Result<BoxStream<'static, StreamChunk>> {
            let chunks = vec![
                StreamChunk {
                    delta: "hel".into(),
                    done: false,
                },
                StreamChunk {
                    delta: "lo".into(),
                    done: true,
                },
            ];
            Ok(futures::stream::iter(chunks).boxed())
        }
    }

    #[tokio::test]
    async fn chain_selects_first_available() {
        let chain = FallbackChain::default()
            .push(Arc::new(FixedProvider {
                name: "down",
                available: false,
            }))
            .push(Arc::new(FixedProvider {
                name: "up",
                available: true,
            }));

        let selected = chain.select().await.unwrap();
        assert_eq!(selected.name(), "up");
    }

    #[tokio::test]
    async fn exhausted_chain_reports_no_providers() {
        let chain = FallbackChain::default().push(Arc::new(FixedProvider {
            name: "down",
            available: false,
        }));

        let result = chain.select().await;
        assert!(matches!(result, Err(OrchestratorError::NoProvidersAvailable)));
    }

    #[tokio::test]
    async fn empty_chain_reports_no_providers() {
        let chain = FallbackChain::default();
        assert!(chain.is_empty());
        assert!(chain.select().await.is_err());
    }

    #[tokio::test]
    async fn stream_yields_chunks_in_order() {
        let provider = FixedProvider {
            name: "up",
            available: true,
        };
        let request = ProviderRequest {
            messages: vec![ProviderMessage::user("hi")],
            tools: Vec::new(),
            max_tokens: None,
            temperature: None,
        };

        let chunks: Vec<StreamChunk> = provider.stream(request).await.unwrap().collect().await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].delta, "hel");
        assert!(chunks[1].done);
    }

    #[test]
    fn usage_total() {
        let usage = Usage {
            input_tokens: 100,
            output_tokens: 42,
        };
        assert_eq!(usage.total(), 142);
    }
}
