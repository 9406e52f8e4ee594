//! Request orchestration façade.
//!
//! [`Orchestrator::process_request`] drives one request through validation,
//! session loading, provider selection, prompt assembly, a single completion,
//! tool-call normalization and execution, and response assembly. The
//! streaming variant shares the setup but yields incremental chunks and
//! performs no tool execution.
//!
//! The orchestrator tracks a coarse, process-wide state and publishes
//! lifecycle events for external observers. Cleanup is an explicit
//! [`Orchestrator::shutdown`] call by the host; nothing here binds to OS
//! signals.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::StreamExt;
use futures::stream::BoxStream;
use uuid::Uuid;

use stockmind_context::{ContextManager, ConversationTurn, Session, ToolCallOutcome, TurnRole};
use stockmind_planner::{ExecutionPlan, PlanError, PlanExecutionResult, Planner};
use stockmind_tools::{ExecuteOptions, ExecutionContext, ToolExecutor, ToolRegistry};

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::events::{Event, EventBus};
use crate::normalize::normalize_tool_calls;
use crate::provider::{FallbackChain, ProviderMessage, ProviderRequest, ProviderResponse};
use crate::request::{OrchestratorRequest, OrchestratorResponse, ResponseChunk, ToolCallWithResult};

/// Allowed band for per-request deadline overrides.
const TIMEOUT_BOUNDS: (Duration, Duration) = (Duration::from_secs(1), Duration::from_secs(300));

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Coarse orchestrator-wide processing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    ProcessingRequest,
    ExecutingTools,
    StreamingResponse,
    Completed,
    Error,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// The orchestration façade over providers, tools, sessions and planning.
///
/// All collaborators are injected at construction; the orchestrator owns no
/// ambient globals and can be instantiated per test.
pub struct Orchestrator {
    providers: FallbackChain,
    registry: ToolRegistry,
    executor: ToolExecutor,
    context: ContextManager,
    planner: Planner,
    events: EventBus,
    config: OrchestratorConfig,
    state: Arc<RwLock<OrchestratorState>>,
}

impl Orchestrator {
    pub fn new(
        providers: FallbackChain,
        registry: ToolRegistry,
        executor: ToolExecutor,
        context: ContextManager,
        config: OrchestratorConfig,
    ) -> Self {
        let planner = Planner::new(registry.clone());
        let events = EventBus::new(config.event_capacity);
        Self {
            providers,
            registry,
            executor,
            context,
            planner,
            events,
            config,
            state: Arc::new(RwLock::new(OrchestratorState::Idle)),
        }
    }

    /// Current coarse state.
    pub fn state(&self) -> OrchestratorState {
        *self.state.read().expect("state lock poisoned")
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Arc<Event>> {
        self.events.subscribe()
    }

    /// The session store this orchestrator serves.
    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    fn set_state(&self, state: OrchestratorState) {
        *self.state.write().expect("state lock poisoned") = state;
    }

    // -- request pipeline ---------------------------------------------------

    /// Process one request end to end.
    ///
    /// Any failure is classified into a typed [`OrchestratorError`] and
    /// published as an `ErrorOccurred` event before being returned; callers
    /// never see an unclassified error.
    pub async fn process_request(
        &self,
        request: OrchestratorRequest,
    ) -> Result<OrchestratorResponse> {
        let session_id = request.session_id;
        let start = Instant::now();

        self.set_state(OrchestratorState::ProcessingRequest);
        self.events.publish(Event::RequestReceived {
            session_id,
            timestamp: Utc::now(),
        });

        match self.run_pipeline(&request, start).await {
            Ok(response) => {
                self.set_state(OrchestratorState::Completed);
                self.events.publish(Event::ResponseGenerated {
                    session_id,
                    provider: response.provider.clone(),
                    duration_ms: response.duration_ms,
                });
                Ok(response)
            }
            Err(err) => {
                let err = self.reclassify(err);
                tracing::error!(
                    session_id = %session_id,
                    code = err.code(),
                    error = %err,
                    "request failed"
                );
                self.set_state(OrchestratorState::Error);
                self.events.publish(Event::ErrorOccurred {
                    session_id,
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_pipeline(
        &self,
        request: &OrchestratorRequest,
        start: Instant,
    ) -> Result<OrchestratorResponse> {
        if request.message.trim().is_empty() {
            return Err(OrchestratorError::Validation {
                reason: "request message is empty".into(),
            });
        }

        // Loading bumps the session's activity clock.
        let session = self.context.load_session(&request.session_id)?;

        let provider = self.providers.select().await?;
        self.events.publish(Event::ProviderSelected {
            session_id: session.id,
            provider: provider.name().to_string(),
        });

        let provider_request = self.build_provider_request(request, &session)?;

        self.context
            .add_turn(&session.id, ConversationTurn::user(&request.message))?;

        let deadline = self.effective_timeout(request);
        let response: ProviderResponse =
            match tokio::time::timeout(deadline, provider.complete(provider_request)).await {
                Ok(result) => result?,
                Err(_elapsed) => {
                    return Err(OrchestratorError::Timeout {
                        timeout_ms: deadline.as_millis() as u64,
                    });
                }
            };

        // Resolve any tool calls the provider requested, sequentially, under
        // the request's own capability envelope.
        let tool_calls = if response.tool_calls.is_empty() {
            Vec::new()
        } else {
            self.set_state(OrchestratorState::ExecutingTools);
            self.execute_tool_calls(&response, &session).await
        };

        let assistant_turn = ConversationTurn::assistant(&response.content)
            .with_tool_calls(normalize_tool_calls(&response.tool_calls))
            .with_tool_results(
                tool_calls
                    .iter()
                    .map(|c| ToolCallOutcome {
                        call_id: c.id.clone(),
                        result: c
                            .result
                            .clone()
                            .unwrap_or_else(|| serde_json::Value::String(
                                c.error.clone().unwrap_or_default(),
                            )),
                        success: c.success,
                        duration_ms: c.duration_ms,
                    })
                    .collect(),
            );
        self.context.add_turn(&session.id, assistant_turn)?;

        Ok(OrchestratorResponse {
            content: response.content,
            tool_calls,
            citations: Vec::new(),
            usage: response.usage,
            duration_ms: start.elapsed().as_millis() as u64,
            provider: provider.name().to_string(),
            model: response.model,
            metadata: std::collections::HashMap::new(),
        })
    }

    async fn execute_tool_calls(
        &self,
        response: &ProviderResponse,
        session: &Session,
    ) -> Vec<ToolCallWithResult> {
        let calls = normalize_tool_calls(&response.tool_calls);
        self.events.publish(Event::ToolExecutionStarted {
            session_id: session.id,
            tool_count: calls.len(),
        });

        let context = ExecutionContext::new(
            session.org_id.clone().unwrap_or_else(|| "default".into()),
            session.user_id.clone(),
            session.id.to_string(),
            session.id.to_string(),
        );

        let mut resolved = Vec::with_capacity(calls.len());
        for call in calls {
            let result = self
                .executor
                .execute(
                    &call.name,
                    call.arguments.clone(),
                    &context,
                    ExecuteOptions::default(),
                )
                .await;

            let duration_ms = result.duration.as_millis() as u64;
            self.events.publish(Event::ToolExecutionCompleted {
                session_id: session.id,
                tool_name: call.name.clone(),
                success: result.success,
                duration_ms,
            });

            resolved.push(ToolCallWithResult {
                id: call.id,
                name: call.name,
                arguments: call.arguments,
                result: result.data,
                success: result.success,
                error: result
                    .error
                    .map(|failure| format!("{}: {}", failure.code, failure.message)),
                duration_ms,
            });
        }

        resolved
    }

    // -- streaming ----------------------------------------------------------

    /// Process a request on the streaming path.
    ///
    /// Shares the non-streaming setup (validation, session, provider
    /// selection, prompt assembly) but yields incremental chunks tagged
    /// with session id and provider, followed by a terminal done marker.
    /// Tool calls are not handled on this path; chunks pass through
    /// untouched.
    pub async fn process_streaming_request(
        &self,
        request: OrchestratorRequest,
    ) -> Result<BoxStream<'static, ResponseChunk>> {
        if request.message.trim().is_empty() {
            return Err(OrchestratorError::Validation {
                reason: "request message is empty".into(),
            });
        }

        let session = self.context.load_session(&request.session_id)?;

        self.set_state(OrchestratorState::StreamingResponse);
        self.events.publish(Event::RequestReceived {
            session_id: session.id,
            timestamp: Utc::now(),
        });

        let provider = self.providers.select().await?;
        self.events.publish(Event::ProviderSelected {
            session_id: session.id,
            provider: provider.name().to_string(),
        });

        let provider_request = self.build_provider_request(&request, &session)?;
        self.context
            .add_turn(&session.id, ConversationTurn::user(&request.message))?;

        let inner = provider.stream(provider_request).await?;

        let session_id = session.id;
        let provider_name = provider.name().to_string();
        let terminal_provider = provider_name.clone();
        let state = self.state.clone();

        let chunks = inner.map(move |chunk| ResponseChunk {
            session_id,
            provider: provider_name.clone(),
            delta: chunk.delta,
            done: false,
        });
        let terminal = futures::stream::once(async move {
            if let Ok(mut guard) = state.write() {
                *guard = OrchestratorState::Completed;
            }
            ResponseChunk {
                session_id,
                provider: terminal_provider,
                delta: String::new(),
                done: true,
            }
        });

        Ok(chunks.chain(terminal).boxed())
    }

    // -- planning façade ----------------------------------------------------

    /// Create a validated execution plan for a session's intent.
    pub fn create_plan(&self, intent: &str, session_id: Uuid) -> Result<ExecutionPlan> {
        // The session must exist; creation also bumps its activity clock.
        self.context.load_session(&session_id)?;
        self.planner
            .create_plan(intent, session_id)
            .map_err(|e| OrchestratorError::Validation {
                reason: e.to_string(),
            })
    }

    /// Execute a plan under its session's capability envelope.
    pub async fn execute_plan(&self, plan: &ExecutionPlan) -> Result<PlanExecutionResult> {
        let session = self.context.load_session(&plan.session_id)?;
        let context = ExecutionContext::new(
            session.org_id.clone().unwrap_or_else(|| "default".into()),
            session.user_id.clone(),
            session.id.to_string(),
            session.id.to_string(),
        );

        self.planner
            .execute_plan(plan, &self.executor, &context)
            .await
            .map_err(|e| match e {
                PlanError::ValidationFailed { .. } => OrchestratorError::Validation {
                    reason: e.to_string(),
                },
                PlanError::Aborted { .. } => OrchestratorError::Internal {
                    reason: e.to_string(),
                },
            })
    }

    // -- lifecycle ----------------------------------------------------------

    /// Release in-memory session state and notify observers.
    ///
    /// Invoked explicitly by the host application when it decides to stop;
    /// the core never listens for process signals itself.
    pub fn shutdown(&self) {
        self.context.clear();
        self.events.publish(Event::Shutdown {
            timestamp: Utc::now(),
        });
        self.set_state(OrchestratorState::Idle);
        tracing::info!("orchestrator shut down");
    }

    // -- internals ----------------------------------------------------------

    /// Build the provider-facing request: system prompt, trailing
    /// conversation filtered to user/assistant roles, then the new message.
    fn build_provider_request(
        &self,
        request: &OrchestratorRequest,
        session: &Session,
    ) -> Result<ProviderRequest> {
        let system_prompt = self.build_system_prompt(session, &request.options.enabled_tools);

        let history = if request.history.is_empty() {
            self.context.conversation_history(
                &session.id,
                Some(self.config.max_conversation_history),
            )?
        } else {
            request.history.clone()
        };

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ProviderMessage::system(system_prompt));
        messages.extend(
            history
                .iter()
                .filter(|t| matches!(t.role, TurnRole::User | TurnRole::Assistant))
                .rev()
                .take(self.config.max_conversation_history)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .map(|t| ProviderMessage {
                    role: t.role,
                    content: t.content.clone(),
                }),
        );
        messages.push(ProviderMessage::user(&request.message));

        let enabled = if request.options.enabled_tools.is_empty() {
            None
        } else {
            Some(request.options.enabled_tools.as_slice())
        };

        Ok(ProviderRequest {
            messages,
            tools: self.registry.export_schema(enabled),
            max_tokens: request.options.max_tokens,
            temperature: request.options.temperature,
        })
    }

    /// System prompt embedding session identity and the descriptions of the
    /// tools enabled for this request (all registered tools if none named).
    fn build_system_prompt(&self, session: &Session, enabled_tools: &[String]) -> String {
        let tools = if enabled_tools.is_empty() {
            self.registry.list(None)
        } else {
            enabled_tools
                .iter()
                .filter_map(|name| self.registry.get(name).ok())
                .collect()
        };

        let tool_list = if tools.is_empty() {
            "(none)".to_string()
        } else {
            tools
                .iter()
                .map(|t| format!("- `{}`: {}", t.name, t.description))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            r#"You are Stockmind, the AI operations assistant for an inventory and supply platform.

Session: {session_id}
User: {user_id}

## Available Tools
{tool_list}

Use tools when the request needs live data or a state change; otherwise answer directly."#,
            session_id = session.id,
            user_id = session.user_id,
        )
    }

    fn effective_timeout(&self, request: &OrchestratorRequest) -> Duration {
        let (min, max) = TIMEOUT_BOUNDS;
        request
            .options
            .timeout
            .unwrap_or_else(|| self.config.request_timeout())
            .clamp(min, max)
    }

    /// Final error classification before a failure is surfaced.
    ///
    /// Timeout-flavored messages from providers or internals become a
    /// `Timeout` carrying the configured deadline; everything already typed
    /// passes through.
    fn reclassify(&self, err: OrchestratorError) -> OrchestratorError {
        match &err {
            OrchestratorError::Provider { reason, .. }
            | OrchestratorError::Internal { reason } => {
                let lowered = reason.to_lowercase();
                if lowered.contains("timeout") || lowered.contains("timed out") {
                    return OrchestratorError::Timeout {
                        timeout_ms: self.config.request_timeout().as_millis() as u64,
                    };
                }
                err
            }
            _ => err,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ModelProvider, StreamChunk, Usage};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use stockmind_tools::{
        AccessLevel, HandlerRegistry, StaticPermissions, ToolDefinition, ToolHandler,
    };

    struct ScriptedProvider {
        name: &'static str,
        content: String,
        tool_calls: Vec<Value>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(ProviderResponse {
                content: self.content.clone(),
                tool_calls: self.tool_calls.clone(),
                usage: Usage {
                    input_tokens: 25,
                    output_tokens: 10,
                },
                model: "scripted-1".into(),
            })
        }

        async fn stream(
            &self,
            _request: ProviderRequest,
        ) -> Result<BoxStream<'static, StreamChunk>> {
            let chunks = vec![
                StreamChunk {
                    delta: "par".into(),
                    done: false,
                },
                StreamChunk {
                    delta: "tial".into(),
                    done: false,
                },
            ];
            Ok(futures::stream::iter(chunks).boxed())
        }
    }

    struct StockHandler;

    #[async_trait]
    impl ToolHandler for StockHandler {
        async fn invoke(
            &self,
            _arguments: Value,
            _context: &ExecutionContext,
        ) -> stockmind_tools::Result<Value> {
            Ok(json!({"items": [{"sku": "WID-1", "quantity": 7}]}))
        }
    }

    fn harness(provider: ScriptedProvider) -> (Orchestrator, Uuid) {
        let registry = ToolRegistry::new();
        registry
            .register(
                ToolDefinition::new(
                    "search_inventory",
                    "Full-text search over products",
                    "inventory",
                    json!({"type": "object"}),
                    json!({"type": "object"}),
                    AccessLevel::ReadOnly,
                )
                .with_permission("inventory:read"),
            )
            .unwrap();

        let handlers = HandlerRegistry::new();
        handlers.bind("search_inventory", Arc::new(StockHandler));

        let permissions = StaticPermissions::new().grant("user-1", "inventory:read");
        let executor = ToolExecutor::new(registry.clone(), handlers, Arc::new(permissions));

        let context = ContextManager::new();
        let session = context.create_session("user-1", Some("org-1".into()));

        let orchestrator = Orchestrator::new(
            FallbackChain::default().push(Arc::new(provider)),
            registry,
            executor,
            context,
            OrchestratorConfig::default(),
        );
        (orchestrator, session.id)
    }

    fn text_provider(content: &str) -> ScriptedProvider {
        ScriptedProvider {
            name: "scripted",
            content: content.into(),
            tool_calls: Vec::new(),
            delay: None,
        }
    }

    #[tokio::test]
    async fn plain_request_round_trips() {
        let (orchestrator, session_id) = harness(text_provider("All stock levels look healthy."));

        let response = orchestrator
            .process_request(OrchestratorRequest::new(session_id, "how is stock?"))
            .await
            .unwrap();

        assert_eq!(response.content, "All stock levels look healthy.");
        assert_eq!(response.provider, "scripted");
        assert_eq!(response.model, "scripted-1");
        assert_eq!(response.usage.total(), 35);
        assert!(response.tool_calls.is_empty());
        assert!(response.citations.is_empty());
        assert_eq!(orchestrator.state(), OrchestratorState::Completed);

        // Both the user and assistant turns were recorded.
        let history = orchestrator
            .context()
            .conversation_history(&session_id, None)
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[1].role, TurnRole::Assistant);
    }

    #[tokio::test]
    async fn empty_message_is_a_validation_error() {
        let (orchestrator, session_id) = harness(text_provider("unused"));
        let err = orchestrator
            .process_request(OrchestratorRequest::new(session_id, "   "))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_session_is_a_validation_error() {
        let (orchestrator, _) = harness(text_provider("unused"));
        let err = orchestrator
            .process_request(OrchestratorRequest::new(Uuid::now_v7(), "hello"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(orchestrator.state(), OrchestratorState::Error);
    }

    #[tokio::test]
    async fn tool_calls_are_normalized_and_executed() {
        let provider = ScriptedProvider {
            name: "scripted",
            content: "Here is what I found.".into(),
            // Two different provider conventions in one response.
            tool_calls: vec![
                json!({
                    "id": "call_1",
                    "name": "search_inventory",
                    "arguments": {"query": "widgets"}
                }),
                json!({
                    "function": {
                        "name": "search_inventory",
                        "arguments": "{\"query\": \"gears\"}"
                    }
                }),
            ],
            delay: None,
        };
        let (orchestrator, session_id) = harness(provider);

        let response = orchestrator
            .process_request(OrchestratorRequest::new(session_id, "find widgets and gears"))
            .await
            .unwrap();

        assert_eq!(response.tool_calls.len(), 2);
        assert!(response.tool_calls.iter().all(|c| c.success));
        assert_eq!(response.tool_calls[0].id, "call_1");
        assert_eq!(response.tool_calls[1].id, "call_1"); // positional fallback

        // The assistant turn carries the resolved outcomes.
        let history = orchestrator
            .context()
            .conversation_history(&session_id, None)
            .unwrap();
        assert_eq!(history[1].tool_results.len(), 2);
        assert!(history[1].tool_results[0].success);
    }

    #[tokio::test]
    async fn failed_tool_call_is_partial_not_fatal() {
        let provider = ScriptedProvider {
            name: "scripted",
            content: "attempted".into(),
            tool_calls: vec![
                json!({"id": "a", "name": "search_inventory", "arguments": {}}),
                json!({"id": "b", "name": "not_a_tool", "arguments": {}}),
            ],
            delay: None,
        };
        let (orchestrator, session_id) = harness(provider);

        let response = orchestrator
            .process_request(OrchestratorRequest::new(session_id, "mixed calls"))
            .await
            .unwrap();

        assert_eq!(response.tool_calls.len(), 2);
        assert!(response.tool_calls[0].success);
        assert!(!response.tool_calls[1].success);
        assert!(
            response.tool_calls[1]
                .error
                .as_deref()
                .unwrap()
                .contains("TOOL_NOT_FOUND")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let provider = ScriptedProvider {
            name: "scripted",
            content: "too late".into(),
            tool_calls: Vec::new(),
            delay: Some(Duration::from_secs(120)),
        };
        let (orchestrator, session_id) = harness(provider);

        let mut request = OrchestratorRequest::new(session_id, "hello");
        request.options.timeout = Some(Duration::from_secs(2));

        let err = orchestrator.process_request(request).await.unwrap_err();
        assert_eq!(err.code(), "TIMEOUT");
        assert_eq!(orchestrator.state(), OrchestratorState::Error);
    }

    #[tokio::test]
    async fn timeout_flavored_provider_errors_reclassify() {
        struct TimeoutFlavoredProvider;

        #[async_trait]
        impl ModelProvider for TimeoutFlavoredProvider {
            fn name(&self) -> &str {
                "flaky"
            }
            async fn is_available(&self) -> bool {
                true
            }
            async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse> {
                Err(OrchestratorError::Provider {
                    provider: "flaky".into(),
                    reason: "upstream request timed out".into(),
                })
            }
            async fn stream(
                &self,
                _request: ProviderRequest,
            ) -> Result<BoxStream<'static, StreamChunk>> {
                Err(OrchestratorError::Provider {
                    provider: "flaky".into(),
                    reason: "unsupported".into(),
                })
            }
        }

        let registry = ToolRegistry::new();
        let executor = ToolExecutor::new(
            registry.clone(),
            HandlerRegistry::new(),
            Arc::new(StaticPermissions::new()),
        );
        let context = ContextManager::new();
        let session = context.create_session("user-1", None);
        let orchestrator = Orchestrator::new(
            FallbackChain::default().push(Arc::new(TimeoutFlavoredProvider)),
            registry,
            executor,
            context,
            OrchestratorConfig::default(),
        );

        let err = orchestrator
            .process_request(OrchestratorRequest::new(session.id, "hi"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TIMEOUT");
    }

    #[tokio::test]
    async fn streaming_tags_chunks_and_appends_done_marker() {
        let (orchestrator, session_id) = harness(text_provider("unused"));

        let stream = orchestrator
            .process_streaming_request(OrchestratorRequest::new(session_id, "stream please"))
            .await
            .unwrap();
        let chunks: Vec<ResponseChunk> = stream.collect().await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].delta, "par");
        assert_eq!(chunks[1].delta, "tial");
        assert!(chunks.iter().take(2).all(|c| !c.done));
        assert!(chunks[2].done);
        assert!(chunks.iter().all(|c| c.session_id == session_id));
        assert!(chunks.iter().all(|c| c.provider == "scripted"));
        assert_eq!(orchestrator.state(), OrchestratorState::Completed);
    }

    #[tokio::test]
    async fn lifecycle_events_are_published() {
        let (orchestrator, session_id) = harness(text_provider("ok"));
        let mut rx = orchestrator.subscribe();

        orchestrator
            .process_request(OrchestratorRequest::new(session_id, "hello"))
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert!(matches!(first.as_ref(), Event::RequestReceived { .. }));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second.as_ref(), Event::ProviderSelected { .. }));
        let third = rx.recv().await.unwrap();
        assert!(matches!(third.as_ref(), Event::ResponseGenerated { .. }));
    }

    #[tokio::test]
    async fn shutdown_clears_sessions_and_notifies() {
        let (orchestrator, session_id) = harness(text_provider("unused"));
        let mut rx = orchestrator.subscribe();

        orchestrator.shutdown();

        assert_eq!(orchestrator.state(), OrchestratorState::Idle);
        assert!(orchestrator.context().load_session(&session_id).is_err());
        let event = rx.recv().await.unwrap();
        assert!(matches!(event.as_ref(), Event::Shutdown { .. }));
    }

    #[tokio::test]
    async fn create_plan_requires_known_session() {
        let (orchestrator, _) = harness(text_provider("unused"));
        let err = orchestrator
            .create_plan("create a product", Uuid::now_v7())
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
