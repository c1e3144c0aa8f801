//! Launch a private headless browser.

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{BrowserError, Result};
use crate::infrastructure::wait::wait_for_condition;

/// Launch a headless browser and navigate a fresh page to `url`.
///
/// Each bucket worker launches its own instance: a hung or crashed session
/// then takes down only that worker's bucket.
pub async fn launch_headless_browser(url: &str) -> Result<(Browser, Page)> {
    info!("launching headless browser");
    debug!("initial url: {}", url);

    let config = BrowserConfig::builder()
        .new_headless_mode()
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--remote-debugging-port=0",
        ])
        .build()
        .map_err(BrowserError::LaunchFailed)?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    let browser_ref = &browser;
    let synced = wait_for_condition(
        move || async move { browser_ref.pages().await.is_ok() },
        Duration::from_secs(10),
        Duration::from_millis(50),
    )
    .await;
    if !synced {
        return Err(BrowserError::LaunchFailed("browser never became responsive".into()).into());
    }

    let page = browser
        .new_page(url)
        .await
        .map_err(|e| BrowserError::PageCreationFailed {
            source: Box::new(e),
        })?;

    info!("headless browser ready at {}", url);
    Ok((browser, page))
}
