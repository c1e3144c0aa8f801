//! Attach to a running browser over its debug port.

use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{BrowserError, Result};
use crate::infrastructure::wait::wait_for_condition;

/// Connect to the browser and obtain a page.
///
/// When `target_url` is given, a fresh page is created and navigated there;
/// otherwise a blank page is returned. The caller owns both handles; dropping
/// the browser ends the session.
pub async fn connect_to_browser_and_page(
    port: u16,
    target_url: Option<&str>,
) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("connecting to browser at {}", browser_url);

    let (browser, mut handler) =
        Browser::connect(&browser_url)
            .await
            .map_err(|e| BrowserError::ConnectionFailed {
                port,
                source: Box::new(e),
            })?;

    // Drive browser events in the background for the life of the session.
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // The session is usable once the browser answers a page listing.
    let browser_ref = &browser;
    let synced = wait_for_condition(
        move || async move { browser_ref.pages().await.is_ok() },
        Duration::from_secs(5),
        Duration::from_millis(50),
    )
    .await;
    if !synced {
        return Err(BrowserError::SessionLost("browser never answered page listing".into()).into());
    }

    let page = match target_url {
        Some(url) => {
            debug!("creating page at {}", url);
            let page =
                browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| BrowserError::PageCreationFailed {
                        source: Box::new(e),
                    })?;
            page.goto(url)
                .await
                .map_err(|e| BrowserError::NavigationFailed {
                    url: url.to_string(),
                    source: Box::new(e),
                })?;
            info!("navigated to {}", url);
            page
        }
        None => browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed {
                source: Box::new(e),
            })?,
    };

    Ok((browser, page))
}
