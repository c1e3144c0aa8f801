//! Detail-content fetcher.
//!
//! Visits a result row's link and returns the readable text. Kept behind its
//! own cache because a batch run frequently resolves many rows to the same
//! detail page.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

/// Fetched detail content.
#[derive(Clone, Debug)]
pub struct Detail {
    pub text: String,
    pub fetched_at: DateTime<Utc>,
}

pub struct DetailFetcher {
    client: reqwest::Client,
    cache: Mutex<HashMap<String, Detail>>,
    tag_strip: Regex,
    block_strip: Regex,
}

impl DetailFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client with static configuration");
        Self {
            client,
            cache: Mutex::new(HashMap::new()),
            tag_strip: Regex::new(r"<[^>]+>").expect("static pattern"),
            block_strip: Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>")
                .expect("static pattern"),
        }
    }

    /// Fetch one detail page, from cache when possible.
    pub async fn fetch_detail(&self, url: &str) -> Result<Detail> {
        if let Some(hit) = self.cache.lock().await.get(url) {
            debug!("detail cache hit: {url}");
            return Ok(hit.clone());
        }

        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let detail = Detail {
            text: self.to_text(&body),
            fetched_at: Utc::now(),
        };
        self.cache
            .lock()
            .await
            .insert(url.to_string(), detail.clone());
        Ok(detail)
    }

    /// Crude readable-text extraction: drop script/style blocks, strip tags,
    /// collapse whitespace.
    fn to_text(&self, html: &str) -> String {
        let without_blocks = self.block_strip.replace_all(html, " ");
        let without_tags = self.tag_strip.replace_all(&without_blocks, " ");
        without_tags.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Truncate detail text to a summary length on a char boundary.
pub fn summarize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect::<String>() + "..."
}
