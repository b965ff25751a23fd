//! Timeout and retry policy applied to every provider call

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Per-call deadline plus optional retry with exponential backoff
#[derive(Debug, Clone)]
pub struct CallPolicy {
    timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
}

impl CallPolicy {
    /// Attempt once with the given deadline
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            max_retries: 0,
            base_delay: Duration::from_secs(1),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(Duration::from_secs(config.timeout_secs)).with_retries(config.max_retries)
    }

    /// Retry failed attempts up to `max_retries` more times
    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before the first retry; doubles on each subsequent one
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Run `call` under the policy
    pub async fn run<T, F, Fut>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            let error = match tokio::time::timeout(self.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => Error::Timeout {
                    operation: operation.to_string(),
                    seconds: self.timeout.as_secs(),
                },
            };

            if attempt >= self.max_retries {
                return Err(error);
            }

            let delay = self.base_delay * 2u32.saturating_pow(attempt);
            tracing::warn!(
                "{} failed (attempt {}/{}): {}, retrying in {:?}",
                operation,
                attempt + 1,
                self.max_retries + 1,
                error,
                delay
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Embedding provider whose calls go through a `CallPolicy`
///
/// Batches are embedded text by text, each text under its own deadline.
pub struct PolicyEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    policy: CallPolicy,
}

impl PolicyEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, policy: CallPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl EmbeddingProvider for PolicyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.policy.run("Embedding", || self.inner.embed(text)).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Language model whose calls go through a `CallPolicy`
pub struct PolicyLlm {
    inner: Arc<dyn LlmProvider>,
    policy: CallPolicy,
}

impl PolicyLlm {
    pub fn new(inner: Arc<dyn LlmProvider>, policy: CallPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl LlmProvider for PolicyLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.policy.run("Generation", || self.inner.generate(prompt)).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyLlm {
        calls: AtomicU32,
        failures: u32,
    }

    #[async_trait]
    impl LlmProvider for FlakyLlm {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(Error::generation("model busy"))
            } else {
                Ok("done".to_string())
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }

        fn model(&self) -> &str {
            "flaky-1"
        }
    }

    struct SlowLlm;

    #[async_trait]
    impl LlmProvider for SlowLlm {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }

        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow-1"
        }
    }

    fn flaky(failures: u32) -> Arc<FlakyLlm> {
        Arc::new(FlakyLlm {
            calls: AtomicU32::new(0),
            failures,
        })
    }

    #[tokio::test]
    async fn test_default_policy_attempts_once() {
        let inner = flaky(1);
        let llm = PolicyLlm::new(inner.clone(), CallPolicy::new(Duration::from_secs(5)));

        assert!(matches!(llm.generate("q").await, Err(Error::Generation(_))));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let inner = flaky(2);
        let policy = CallPolicy::new(Duration::from_secs(5))
            .with_retries(2)
            .with_base_delay(Duration::from_millis(1));
        let llm = PolicyLlm::new(inner.clone(), policy);

        assert_eq!(llm.generate("q").await.unwrap(), "done");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(llm.model(), "flaky-1");
    }

    #[tokio::test]
    async fn test_deadline_becomes_timeout_error() {
        let llm = PolicyLlm::new(Arc::new(SlowLlm), CallPolicy::new(Duration::from_millis(20)));

        match llm.generate("q").await {
            Err(Error::Timeout { operation, .. }) => assert_eq!(operation, "Generation"),
            other => panic!("expected timeout, got {:?}", other.map(|_| ())),
        }
    }

    struct SlowEmbedder {
        calls: AtomicU32,
    }

    #[async_trait]
    impl EmbeddingProvider for SlowEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(30)).await;
            Ok(vec![1.0])
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_batch_deadline_applies_per_text() {
        let inner = Arc::new(SlowEmbedder {
            calls: AtomicU32::new(0),
        });
        let policy = CallPolicy::new(Duration::from_millis(200));
        let embedder = PolicyEmbedder::new(inner.clone(), policy);
        let texts: Vec<String> = (0..10).map(|i| format!("text {}", i)).collect();

        // ten calls take longer than one deadline in total
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 10);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 10);
    }
}
