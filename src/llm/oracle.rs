//! Completion oracle adapter
//!
//! Wraps an [`LlmClient`] with a fixed wait bound and, for structured calls,
//! JSON parse-and-validate of the answer. Every failure comes back as an
//! [`LlmError`]; nothing panics and nothing escapes as an untyped fault.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::client::{ChatRequest, LlmClient};
use super::error::{LlmError, LlmResult};
use super::prompt::{StructuredProfile, parse_structured};

/// Result of an oracle call together with its wall-clock duration
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub value: T,
    pub elapsed: Duration,
}

/// Completion oracle adapter
pub struct Oracle<C: LlmClient> {
    client: C,
    timeout: Duration,
    calls: AtomicUsize,
}

impl<C: LlmClient> Oracle<C> {
    /// Create an adapter with the given upper bound per call
    pub fn new(client: C, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of calls attempted through this adapter
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Get the underlying client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Model identifier of the underlying client
    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Configured wait bound
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Request a free-text answer
    pub async fn complete_text(&self, system: &str, user: &str) -> LlmResult<Timed<String>> {
        let request = ChatRequest::new(system, user);
        let timed = self.call(&request).await?;
        Ok(Timed {
            value: timed.value.trim().to_string(),
            elapsed: timed.elapsed,
        })
    }

    /// Request a `{summary, pros, cons, tags}` answer
    ///
    /// Missing keys are filled rather than rejected; see [`parse_structured`].
    pub async fn complete_structured(
        &self,
        system: &str,
        user: &str,
    ) -> LlmResult<Timed<StructuredProfile>> {
        let timed = self.attempt_structured(system, user).await?;
        Ok(Timed {
            value: timed.value?,
            elapsed: timed.elapsed,
        })
    }

    /// Like [`complete_structured`](Self::complete_structured), but an answer
    /// that arrived and failed to parse keeps its call duration
    ///
    /// The outer error is a transport failure or timeout; the inner one is
    /// malformed output.
    pub async fn attempt_structured(
        &self,
        system: &str,
        user: &str,
    ) -> LlmResult<Timed<LlmResult<StructuredProfile>>> {
        let request = ChatRequest::new(system, user).with_json_format(true);
        let timed = self.call(&request).await?;
        let parsed = parse_structured(&timed.value);

        if let Ok(profile) = &parsed
            && !profile.filled_keys.is_empty()
        {
            tracing::warn!(
                model = self.model_name(),
                filled = ?profile.filled_keys,
                "Structured answer was missing keys; filled with empty values"
            );
        }

        Ok(Timed {
            value: parsed,
            elapsed: timed.elapsed,
        })
    }

    async fn call(&self, request: &ChatRequest) -> LlmResult<Timed<String>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        match tokio::time::timeout(self.timeout, self.client.chat(request)).await {
            Ok(Ok(text)) => Ok(Timed {
                value: text,
                elapsed: start.elapsed(),
            }),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Oracle call failed");
                Err(e)
            }
            Err(_) => {
                tracing::debug!(
                    timeout_secs = self.timeout.as_secs(),
                    "Oracle call timed out"
                );
                Err(LlmError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}
