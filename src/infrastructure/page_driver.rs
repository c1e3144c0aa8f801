//! Page driver - infrastructure layer.
//!
//! Holds the page resource and exposes JS evaluation plus a few navigation
//! helpers. Does not know about dropdowns, combos or jobs.

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;

use crate::error::{BrowserError, Result};
use crate::infrastructure::wait::wait_for_condition;

/// JS executor over one page.
///
/// Cloning is cheap (the underlying page handle is reference counted), but
/// ownership discipline is by convention: one driver per bucket worker, never
/// shared across workers.
#[derive(Clone)]
pub struct PageDriver {
    page: Page,
}

impl PageDriver {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Evaluate a JS expression and return its JSON result.
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self
            .page
            .evaluate(js_code.into())
            .await
            .map_err(BrowserError::from)?;
        let json_value = result
            .into_value()
            .map_err(|e| BrowserError::ScriptFailed {
                source: Box::new(e),
            })?;
        Ok(json_value)
    }

    /// Evaluate a JS expression and deserialize the result.
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed = serde_json::from_value(json_value)?;
        Ok(typed)
    }

    /// Current page URL, if the session still answers.
    pub async fn current_url(&self) -> Result<Option<String>> {
        let url = self.page.url().await.map_err(BrowserError::from)?;
        Ok(url)
    }

    /// Navigate and wait until the document is interactive.
    ///
    /// Readiness is probed, not slept for: `document.readyState` must leave
    /// `"loading"` within the timeout.
    pub async fn goto(&self, url: &str, timeout: Duration, poll: Duration) -> Result<()> {
        debug!("navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed {
                url: url.to_string(),
                source: Box::new(e),
            })?;

        let ready = wait_for_condition(
            move || async move {
                matches!(
                    self.eval_as::<String>("document.readyState").await.as_deref(),
                    Ok("interactive") | Ok("complete")
                )
            },
            timeout,
            poll,
        )
        .await;

        if !ready {
            return Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }
            .into());
        }
        Ok(())
    }
}
