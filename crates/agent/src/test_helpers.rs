//! Shared test helpers for session tests.

use lingochat_core::error::ProviderError;
use lingochat_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted results and records
/// every request it receives.
///
/// Panics if more calls are made than results provided.
pub struct ScriptedProvider {
    results: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(results: Vec<Result<String, ProviderError>>) -> Self {
        let mut results = results;
        results.reverse();
        Self {
            results: Mutex::new(results),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that replies with each text in turn.
    pub fn replies(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let next = self
            .results
            .lock()
            .unwrap()
            .pop()
            .expect("ScriptedProvider: no more scripted results");

        next.map(|content| ProviderResponse {
            content,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }
}

/// A provider whose replies never arrive.
pub struct PendingProvider;

#[async_trait::async_trait]
impl Provider for PendingProvider {
    fn name(&self) -> &str {
        "pending_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}
