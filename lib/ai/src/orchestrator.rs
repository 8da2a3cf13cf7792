//! Provider fallback loop.
//!
//! [`Orchestrator::generate`] walks the provider order, skipping providers
//! that are not configured, and returns the first non-empty normalized
//! result. Safety blocks and transport failures are recorded and the loop
//! moves on; only running out of providers (or out of caller deadline) is an
//! error, and that error carries the whole attempt log.

use crate::config::OrchestratorConfig;
use crate::connection::ConnectionManager;
use crate::error::GenerateError;
use crate::normalize::NormalizedResult;
use crate::outcome::{AttemptRecord, AttemptStatus, RawOutcome};
use crate::provider::ProviderAdapter;
use crate::registry::ProviderRegistry;
use lamla_core::GenerationId;
use rootcause::prelude::Report;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// A single generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Opaque prompt text.
    pub prompt: String,
    /// Token budget; the orchestrator default applies when unset.
    pub max_tokens: Option<u32>,
    /// Provider names to try in order; empty means the default order.
    pub providers: Vec<String>,
    /// Bound on the whole call, across every attempt.
    pub deadline: Option<Duration>,
}

impl GenerationRequest {
    /// Creates a request with default budget and order.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: None,
            providers: Vec::new(),
            deadline: None,
        }
    }

    /// Sets the token budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Overrides the provider order.
    #[must_use]
    pub fn with_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = providers.into_iter().map(Into::into).collect();
        self
    }

    /// Bounds the whole call.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Result of a `generate()` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Identifier used in logs for this call.
    pub id: GenerationId,
    /// Normalized answer; empty only from [`Orchestrator::generate_or_empty`].
    pub result: NormalizedResult,
    /// Provider that answered, if any.
    pub provider: Option<String>,
    /// Every attempt in order, ending with the successful one.
    pub attempts: Vec<AttemptRecord>,
}

/// First-success-wins provider orchestrator.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    connections: Arc<ConnectionManager>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Creates an orchestrator over a registry and a connection manager.
    #[must_use]
    pub fn new(
        registry: Arc<ProviderRegistry>,
        connections: Arc<ConnectionManager>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            connections,
            config,
        }
    }

    /// Returns the provider registry.
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Generates an answer, falling back across providers.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::AllProvidersExhausted`] when no provider
    /// produced non-empty content, or [`GenerateError::DeadlineExceeded`]
    /// when the request deadline elapsed first.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Generation, Report<GenerateError>> {
        Ok(self.run(request, GenerationId::new()).await?)
    }

    /// Non-raising variant: on failure, returns an empty text result with
    /// the attempt log and no provider.
    pub async fn generate_or_empty(&self, request: &GenerationRequest) -> Generation {
        let id = GenerationId::new();
        match self.run(request, id).await {
            Ok(generation) => generation,
            Err(err) => {
                warn!(generation = %id, error = %err, "returning empty result");
                Generation {
                    id,
                    result: NormalizedResult::Text(String::new()),
                    provider: None,
                    attempts: err.into_attempts(),
                }
            }
        }
    }

    fn provider_order<'a>(&'a self, request: &'a GenerationRequest) -> &'a [String] {
        if request.providers.is_empty() {
            &self.config.provider_order
        } else {
            &request.providers
        }
    }

    #[instrument(skip_all, fields(generation = %id))]
    async fn run(
        &self,
        request: &GenerationRequest,
        id: GenerationId,
    ) -> Result<Generation, GenerateError> {
        let order = self.provider_order(request);
        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);
        let deadline = request.deadline.map(|d| Instant::now() + d);
        let mut attempts = Vec::with_capacity(order.len());
        let mut tried = HashSet::new();

        for requested in order {
            let Some(adapter) = self.registry.resolve(requested) else {
                attempts.push(AttemptRecord::new(
                    requested.trim().to_lowercase(),
                    AttemptStatus::Unconfigured,
                    "unknown provider",
                ));
                continue;
            };
            let provider = adapter.name().to_lowercase();
            if !tried.insert(provider.clone()) {
                debug!(%provider, "provider already attempted, skipping");
                continue;
            }
            if !adapter.configured() {
                debug!(%provider, "provider not configured");
                attempts.push(AttemptRecord::new(
                    provider,
                    AttemptStatus::Unconfigured,
                    "provider not configured",
                ));
                continue;
            }

            let call = self.call_provider(adapter.as_ref(), &request.prompt, max_tokens);
            let outcome = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, call).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(%provider, "request deadline elapsed during provider call");
                        attempts.push(AttemptRecord::new(
                            provider,
                            AttemptStatus::TransportFailure,
                            "request deadline elapsed",
                        ));
                        return Err(GenerateError::DeadlineExceeded { attempts });
                    }
                },
                None => call.await,
            };

            match outcome {
                RawOutcome::Success(payload) => {
                    let result = self.registry.normalizer().normalize(&provider, payload);
                    if result.is_empty() {
                        warn!(%provider, "provider returned empty content");
                        attempts.push(AttemptRecord::new(
                            provider,
                            AttemptStatus::TransportFailure,
                            "empty response",
                        ));
                        continue;
                    }
                    info!(%provider, "generation succeeded");
                    attempts.push(AttemptRecord::new(
                        provider.clone(),
                        AttemptStatus::Succeeded,
                        "ok",
                    ));
                    return Ok(Generation {
                        id,
                        result,
                        provider: Some(provider),
                        attempts,
                    });
                }
                RawOutcome::SafetyBlocked(reason) => {
                    warn!(%provider, %reason, "provider safety block, trying next provider");
                    attempts.push(AttemptRecord::new(
                        provider,
                        AttemptStatus::SafetyBlocked,
                        reason,
                    ));
                }
                RawOutcome::TransportFailure(reason) => {
                    warn!(%provider, %reason, "provider failed, trying next provider");
                    attempts.push(AttemptRecord::new(
                        provider,
                        AttemptStatus::TransportFailure,
                        reason,
                    ));
                }
                RawOutcome::Unconfigured => {
                    attempts.push(AttemptRecord::new(
                        provider,
                        AttemptStatus::Unconfigured,
                        "provider not configured",
                    ));
                }
            }
        }

        Err(GenerateError::AllProvidersExhausted { attempts })
    }

    async fn call_provider(
        &self,
        adapter: &dyn ProviderAdapter,
        prompt: &str,
        max_tokens: u32,
    ) -> RawOutcome {
        let client = match self.connections.acquire().await {
            Ok(client) => client,
            Err(e) => return RawOutcome::TransportFailure(e.to_string()),
        };
        let timeout = self.config.attempt_timeout();
        match tokio::time::timeout(timeout, adapter.call(&client, prompt, max_tokens)).await {
            Ok(outcome) => outcome,
            Err(_) => RawOutcome::TransportFailure(format!(
                "timed out after {}ms",
                timeout.as_millis()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AzureSettings, DeepSeekSettings, PoolConfig, ProviderSettings};
    use crate::connection::PooledClient;
    use crate::outcome::Payload;
    use crate::provider::{AzureOpenAi, DeepSeek};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Adapter returning a fixed outcome and counting calls.
    struct Scripted {
        name: &'static str,
        configured: bool,
        outcome: RawOutcome,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(name: &'static str, outcome: RawOutcome) -> Arc<Self> {
            Arc::new(Self {
                name,
                configured: true,
                outcome,
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn unconfigured(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                configured: false,
                outcome: RawOutcome::Unconfigured,
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(name: &'static str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name,
                configured: true,
                outcome: RawOutcome::Success(Payload::Text("late".into())),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderAdapter for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn configured(&self) -> bool {
            self.configured
        }

        async fn call(&self, _client: &PooledClient, _prompt: &str, _max: u32) -> RawOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.outcome.clone()
        }
    }

    fn text(s: &str) -> RawOutcome {
        RawOutcome::Success(Payload::Text(s.to_string()))
    }

    fn orchestrator(adapters: Vec<Arc<Scripted>>, config: OrchestratorConfig) -> Orchestrator {
        let mut registry = ProviderRegistry::new();
        for adapter in adapters {
            registry.register(adapter);
        }
        let connections =
            Arc::new(ConnectionManager::new(PoolConfig::default()).expect("manager"));
        Orchestrator::new(Arc::new(registry), connections, config)
    }

    fn order(names: &[&str]) -> OrchestratorConfig {
        OrchestratorConfig {
            provider_order: names.iter().map(|n| n.to_string()).collect(),
            ..OrchestratorConfig::default()
        }
    }

    fn statuses(attempts: &[AttemptRecord]) -> Vec<(&str, AttemptStatus)> {
        attempts
            .iter()
            .map(|a| (a.provider.as_str(), a.status))
            .collect()
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let first = Scripted::new("first", text("answer"));
        let second = Scripted::new("second", text("other"));
        let orch = orchestrator(
            vec![first.clone(), second.clone()],
            order(&["first", "second"]),
        );

        let generation = orch
            .run(&GenerationRequest::new("q"), GenerationId::new())
            .await
            .expect("generation");

        assert_eq!(generation.result, NormalizedResult::Text("answer".into()));
        assert_eq!(generation.provider.as_deref(), Some("first"));
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn safety_block_falls_through_to_next_provider() {
        let blocked = Scripted::new("p", RawOutcome::SafetyBlocked("policy".into()));
        let answering = Scripted::new("q", text("{\"response\": \"fine\"}"));
        let orch = orchestrator(vec![blocked, answering], order(&["p", "q"]));

        let generation = orch
            .run(&GenerationRequest::new("q"), GenerationId::new())
            .await
            .expect("generation");

        assert_eq!(
            generation.result,
            NormalizedResult::Structured(json!({"response": "fine"}))
        );
        assert_eq!(
            statuses(&generation.attempts),
            vec![
                ("p", AttemptStatus::SafetyBlocked),
                ("q", AttemptStatus::Succeeded)
            ]
        );
    }

    #[tokio::test]
    async fn empty_success_counts_as_transport_failure() {
        let empty = Scripted::new("empty", text("   "));
        let braces = Scripted::new("braces", RawOutcome::Success(Payload::Structured(json!({}))));
        let orch = orchestrator(vec![empty, braces], order(&["empty", "braces"]));

        let err = orch
            .run(&GenerationRequest::new("q"), GenerationId::new())
            .await
            .unwrap_err();

        assert_eq!(
            statuses(err.attempts()),
            vec![
                ("empty", AttemptStatus::TransportFailure),
                ("braces", AttemptStatus::TransportFailure)
            ]
        );
        assert!(matches!(err, GenerateError::AllProvidersExhausted { .. }));
    }

    #[tokio::test]
    async fn zero_configured_providers_exhausts_in_priority_order() {
        let names = ["azure", "deepseek", "gemini", "huggingface"];
        let adapters = names.iter().map(|n| Scripted::unconfigured(*n)).collect();
        let orch = orchestrator(adapters, order(&names));

        let err = orch
            .run(&GenerationRequest::new("q"), GenerationId::new())
            .await
            .unwrap_err();

        let expected: Vec<_> = names
            .iter()
            .map(|n| (*n, AttemptStatus::Unconfigured))
            .collect();
        assert_eq!(statuses(err.attempts()), expected);
    }

    #[tokio::test]
    async fn override_replaces_default_order_and_unknown_names_are_recorded() {
        let a = Scripted::new("a", text("from a"));
        let b = Scripted::new("b", text("from b"));
        let orch = orchestrator(vec![a.clone(), b.clone()], order(&["a", "b"]));

        let request = GenerationRequest::new("q").with_providers(["nope", "B"]);
        let generation = orch.run(&request, GenerationId::new()).await.expect("generation");

        assert_eq!(generation.provider.as_deref(), Some("b"));
        assert_eq!(a.calls(), 0);
        assert_eq!(generation.attempts[0].message, "unknown provider");
        assert_eq!(generation.attempts[0].status, AttemptStatus::Unconfigured);
    }

    #[tokio::test]
    async fn a_provider_is_tried_at_most_once() {
        let flaky = Scripted::new("flaky", RawOutcome::TransportFailure("boom".into()));
        let orch = orchestrator(vec![flaky.clone()], order(&["flaky"]));

        let request = GenerationRequest::new("q").with_providers(["flaky", "FLAKY", "flaky"]);
        let err = orch.run(&request, GenerationId::new()).await.unwrap_err();

        assert_eq!(flaky.calls(), 1);
        assert_eq!(err.attempts().len(), 1);
    }

    #[tokio::test]
    async fn attempt_timeout_moves_to_next_provider() {
        let slow = Scripted::slow("slow", Duration::from_millis(500));
        let fast = Scripted::new("fast", text("quick"));
        let config = OrchestratorConfig {
            attempt_timeout_ms: 50,
            ..order(&["slow", "fast"])
        };
        let orch = orchestrator(vec![slow, fast], config);

        let generation = orch
            .run(&GenerationRequest::new("q"), GenerationId::new())
            .await
            .expect("generation");

        assert_eq!(generation.attempts[0].status, AttemptStatus::TransportFailure);
        assert!(generation.attempts[0].message.contains("timed out"));
        assert_eq!(generation.result, NormalizedResult::Text("quick".into()));
    }

    #[tokio::test]
    async fn request_deadline_aborts_the_whole_call() {
        let slow = Scripted::slow("slow", Duration::from_millis(500));
        let never = Scripted::new("never", text("unused"));
        let orch = orchestrator(vec![slow, never.clone()], order(&["slow", "never"]));

        let request = GenerationRequest::new("q").with_deadline(Duration::from_millis(50));
        let err = orch.run(&request, GenerationId::new()).await.unwrap_err();

        assert!(matches!(err, GenerateError::DeadlineExceeded { .. }));
        assert_eq!(
            statuses(err.attempts()),
            vec![("slow", AttemptStatus::TransportFailure)]
        );
        assert_eq!(never.calls(), 0);
    }

    #[tokio::test]
    async fn generate_or_empty_returns_empty_text_on_exhaustion() {
        let orch = orchestrator(vec![Scripted::unconfigured("only")], order(&["only"]));

        let generation = orch.generate_or_empty(&GenerationRequest::new("q")).await;

        assert_eq!(generation.result, NormalizedResult::Text(String::new()));
        assert!(generation.provider.is_none());
        assert_eq!(generation.attempts.len(), 1);
    }

    #[tokio::test]
    async fn generate_surfaces_diagnostics_in_report() {
        let orch = orchestrator(
            vec![Scripted::new("down", RawOutcome::TransportFailure("HTTP 503".into()))],
            order(&["down"]),
        );

        let report = orch.generate(&GenerationRequest::new("q")).await.unwrap_err();
        let rendered = report.to_string();
        assert!(rendered.contains("all providers exhausted"));
        assert!(rendered.contains("down: transport failure: HTTP 503"));
    }

    #[tokio::test]
    async fn closed_connections_are_recorded_as_transport_failures() {
        let a = Scripted::new("a", text("unused"));
        let orch = orchestrator(vec![a.clone()], order(&["a"]));
        orch.connections.close().await;

        let err = orch
            .run(&GenerationRequest::new("q"), GenerationId::new())
            .await
            .unwrap_err();

        assert_eq!(a.calls(), 0);
        assert_eq!(err.attempts()[0].status, AttemptStatus::TransportFailure);
    }

    #[tokio::test]
    async fn end_to_end_unconfigured_azure_then_deepseek() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "4"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let settings = ProviderSettings {
            azure: AzureSettings::default(),
            deepseek: DeepSeekSettings {
                api_key: Some("ds-key".to_string()),
                url: format!("{}/v1/chat/completions", server.uri()),
                ..DeepSeekSettings::default()
            },
            ..ProviderSettings::default()
        };
        let registry = ProviderRegistry::new()
            .with_adapter(Arc::new(AzureOpenAi::new(settings.azure.clone())))
            .with_adapter(Arc::new(DeepSeek::new(settings.deepseek.clone())));
        let connections =
            Arc::new(ConnectionManager::new(PoolConfig::default()).expect("manager"));
        let orch = Orchestrator::new(
            Arc::new(registry),
            connections,
            order(&["azure", "deepseek"]),
        );

        let request = GenerationRequest::new("2+2?").with_max_tokens(50);
        let generation = orch.generate(&request).await.expect("generation");

        assert_eq!(generation.result, NormalizedResult::Text("4".into()));
        assert_eq!(
            statuses(&generation.attempts),
            vec![
                ("azure", AttemptStatus::Unconfigured),
                ("deepseek", AttemptStatus::Succeeded)
            ]
        );
    }
}
