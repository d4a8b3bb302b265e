use anyhow::{Context, Result, anyhow};
use std::time::Duration;
use tracing::debug;

use crate::providers::{Provider, TranslationRequest};

/// Synchronous text translation, as the pipeline consumes it.
pub trait TranslateText {
    fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String>;
}

/// Drives an async [`Provider`] on a private current-thread runtime so the
/// pipeline can call it from a plain worker thread.
pub struct Translator<P: Provider> {
    provider: P,
    runtime: tokio::runtime::Runtime,
    timeout: Option<Duration>,
}

impl<P: Provider> Translator<P> {
    pub fn new(provider: P) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .with_context(|| "failed to start translation runtime")?;
        Ok(Self {
            provider,
            runtime,
            timeout: None,
        })
    }

    /// Bounds every call; `None` waits for the provider indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|value| !value.is_zero());
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: Provider> TranslateText for Translator<P> {
    fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        let request = TranslationRequest {
            text: text.to_string(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        };
        debug!(
            "translating {} chars {} -> {} via {}",
            text.chars().count(),
            source_lang,
            target_lang,
            self.provider.name()
        );
        let future = self.provider.translate(request);
        match self.timeout {
            Some(limit) => self.runtime.block_on(async move {
                tokio::time::timeout(limit, future).await.map_err(|_| {
                    anyhow!("translation timed out after {}s", limit.as_secs_f32())
                })?
            }),
            None => self.runtime.block_on(future),
        }
    }
}
