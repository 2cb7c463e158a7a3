use super::{ModelProvider, ModelRequest, ModelResponse};
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::fmt;
use std::sync::Arc;

/// Retrying wrapper around a [`ModelProvider`].
///
/// Constructed once at process entry and shared by the agent loop and the
/// judge.
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn ModelProvider>,
    config: LlmConfig,
}

impl fmt::Debug for ModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ModelClient {
    /// Create a new client over `provider`.
    pub fn new(provider: Arc<dyn ModelProvider>, config: LlmConfig) -> Self {
        Self { provider, config }
    }

    /// Get a reference to the client configuration.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Send a request, retrying transient failures.
    ///
    /// # Retry Behavior
    ///
    /// Errors for which [`LlmError::is_retryable`] holds are retried until
    /// `config.max_attempts` attempts have been made, sleeping
    /// `config.retry_delay(attempt)` between attempts. The last error is
    /// returned once attempts are exhausted. Other errors return immediately.
    pub async fn create(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..max_attempts {
            match self.provider.create(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                    let delay = self.config.retry_delay(attempt);
                    log::warn!(
                        "Model request failed (attempt {}/{}): {}, retrying in {:?}...",
                        attempt + 1,
                        max_attempts,
                        e,
                        delay
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Other("Retry loop exited unexpectedly".to_string())))
    }
}
