//! Capture-to-text pipeline.
//!
//! capture → crop → configure → dispatch → normalize, strictly in that
//! order. The first failure ends the session with its typed error; there
//! are no retries in here. Only the network step can be cancelled, and only
//! by the request timeout.

use crate::capture::{self, ScreenSource, SelectionRect};
use crate::error::{OcrError, Result};
use crate::llm::{finish_answer, HttpTransport, OcrProvider, ProviderKind};
use crate::settings::ConfigSource;
use std::time::{Duration, Instant};

pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Builds the provider client for a configured kind.
pub type ProviderFactory = fn(ProviderKind) -> Box<dyn OcrProvider>;

pub struct CaptureCoordinator<S, T, C> {
    screen: S,
    transport: T,
    config: C,
    providers: ProviderFactory,
    timeout: Duration,
}

impl<S, T, C> CaptureCoordinator<S, T, C>
where
    S: ScreenSource,
    T: HttpTransport,
    C: ConfigSource,
{
    pub fn new(screen: S, transport: T, config: C) -> Self {
        Self {
            screen,
            transport,
            config,
            providers: ProviderKind::client,
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    /// Swap the provider factory (custom endpoints, proxies).
    pub fn with_providers(mut self, providers: ProviderFactory) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one session for a selection drawn at `scale_factor`.
    pub async fn handle(&self, rect: &SelectionRect, scale_factor: f64) -> Result<String> {
        let pipeline_start = Instant::now();
        log::info!(
            "[PIPELINE] Selection received: {{x: {}, y: {}, w: {}, h: {}}} scale {}",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            scale_factor
        );

        // Stage 1: visible surface
        let screenshot = self.screen.capture_visible().await.map_err(|e| {
            log::error!("[PIPELINE] Capture failed: {}", e);
            e
        })?;

        // Stage 2: crop + encode. The full screenshot is dropped right after.
        let cropped = capture::crop(&screenshot, rect, scale_factor)?;
        drop(screenshot);

        // Stage 3: configuration
        let config = self.config.load()?;
        let provider = (self.providers)(config.provider);

        // Stage 4: one request, bounded by the timeout
        let request = provider.encode(&cropped, &config.prompt, &config.model, &config.api_key);
        let api_start = Instant::now();
        let response = match tokio::time::timeout(self.timeout, self.transport.post(request)).await {
            Ok(result) => result?,
            Err(_) => {
                log::error!(
                    "[PIPELINE] {} request timed out after {}s",
                    config.provider,
                    self.timeout.as_secs()
                );
                return Err(OcrError::NetworkTimeout(self.timeout.as_secs()));
            }
        };
        log::info!(
            "[LLM] {} responded {} in {}ms",
            config.provider,
            response.status,
            api_start.elapsed().as_millis()
        );

        if !response.is_success() {
            let err = provider.map_error(response.status, &response.body);
            log::error!("[LLM] {} API returned {}: {}", config.provider, response.status, err);
            return Err(err);
        }

        // Stage 5: decode + normalize
        let raw = provider.decode(&response.body)?;
        let text = finish_answer(provider.as_ref(), &raw);

        log::info!(
            "[PIPELINE] Session complete: {} chars in {}ms",
            text.chars().count(),
            pipeline_start.elapsed().as_millis()
        );
        Ok(text)
    }
}
