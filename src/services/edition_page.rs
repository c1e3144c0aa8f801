//! Edition page operations.
//!
//! Navigate to an edition, force the list layout, and collect result rows.
//! The selectors here are the volatile, site-specific part of the system;
//! they are kept in one place on purpose.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{ScrapeDefaults, WaitTuning};
use crate::error::Result;
use crate::infrastructure::wait::wait_for_condition;
use crate::infrastructure::PageDriver;
use crate::models::report::ResultRow;

/// Result row selectors, tried in order.
const ROW_SELECTOR: &str = ".resultado, article.materia, li.resultado-item";
/// List-layout toggle and its active marker.
const LIST_TOGGLE_SELECTOR: &str = "[data-view=\"list\"], .btn-visualizacao-lista";
const LIST_ACTIVE_SELECTOR: &str =
    "[data-view=\"list\"].active, .btn-visualizacao-lista.ativo, .visualizacao-em-lista";

/// One page holding (at most) one navigated edition. Tracks where it is so
/// consecutive jobs on the same `(date, secao)` skip the navigation cost -
/// by far the most expensive phase when it happens.
pub struct EditionPage {
    driver: PageDriver,
    waits: WaitTuning,
    current: Option<(String, String)>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRow {
    title: String,
    org_label: String,
    link: String,
    detail_url: Option<String>,
}

impl EditionPage {
    pub fn new(driver: PageDriver, waits: WaitTuning) -> Self {
        Self {
            driver,
            waits,
            current: None,
        }
    }

    pub fn driver(&self) -> &PageDriver {
        &self.driver
    }

    /// Go to the edition at `(date, secao)`. Returns `true` when an actual
    /// navigation happened, `false` when the page was already there.
    pub async fn navigate(&mut self, url: &str, date: &str, secao: &str) -> Result<bool> {
        if self
            .current
            .as_ref()
            .is_some_and(|(d, s)| d == date && s == secao)
        {
            debug!("page already at ({date}, {secao}); skipping navigation");
            return Ok(false);
        }

        // invalidate before navigating: a failed goto must not leave a
        // stale "already there" claim behind
        self.current = None;
        self.driver
            .goto(
                url,
                Duration::from_millis(self.waits.navigation_ms),
                Duration::from_millis(self.waits.poll_ms),
            )
            .await?;
        self.current = Some((date.to_string(), secao.to_string()));
        info!("navigated to edition ({date}, {secao})");
        Ok(true)
    }

    /// Forget the tracked position, forcing the next job to re-navigate.
    /// Called after any failure that may have left the page somewhere odd.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Switch the results to list layout. A no-op when already active.
    pub async fn ensure_list_view(&self) -> Result<()> {
        let js = format!(
            r#"
            (() => {{
                if (document.querySelector('{active}')) return true;
                const toggle = document.querySelector('{toggle}');
                if (toggle) toggle.click();
                return document.querySelector('{active}') !== null;
            }})()
            "#,
            active = LIST_ACTIVE_SELECTOR,
            toggle = LIST_TOGGLE_SELECTOR,
        );

        let active: bool = self.driver.eval_as(js.clone()).await?;
        if active {
            return Ok(());
        }
        // Some deployments apply the class only after an async re-render.
        let settled = wait_for_condition(
            move || {
                let js = js.clone();
                async move { self.driver.eval_as::<bool>(js).await.unwrap_or(false) }
            },
            Duration::from_millis(self.waits.settle_ms),
            Duration::from_millis(self.waits.poll_ms),
        )
        .await;
        if !settled {
            debug!("list-view marker never appeared; proceeding with current layout");
        }
        Ok(())
    }

    /// Scroll the result list until no new rows appear for
    /// `scroll_stable_rounds` consecutive rounds, then scrape every row.
    ///
    /// Returns the rows plus a partial flag: a scrape failure after at least
    /// one good read keeps what was captured instead of failing the job.
    pub async fn collect_rows(&self, defaults: &ScrapeDefaults) -> Result<(Vec<ResultRow>, bool)> {
        let mut last_good: Vec<ResultRow> = Vec::new();
        let mut prev_count = 0usize;
        let mut stable_rounds = 0usize;

        for round in 0..defaults.max_scroll_rounds {
            match self.read_rows(defaults.max_results).await {
                Ok(rows) => {
                    let count = rows.len();
                    last_good = rows;
                    if count > prev_count {
                        stable_rounds = 0;
                        prev_count = count;
                    } else {
                        stable_rounds += 1;
                    }
                    if count >= defaults.max_results
                        || stable_rounds >= defaults.scroll_stable_rounds
                    {
                        debug!("collection settled after {} round(s): {} row(s)", round, count);
                        return Ok((last_good, false));
                    }
                }
                Err(e) if !last_good.is_empty() => {
                    warn!("row scrape failed mid-collection, keeping {} row(s): {}", last_good.len(), e);
                    return Ok((last_good, true));
                }
                Err(e) => return Err(e),
            }

            self.scroll_step().await?;
            // wait for growth; giving up just means one more stable round
            let prev = prev_count;
            wait_for_condition(
                move || async move { self.row_count().await.map(|n| n > prev).unwrap_or(false) },
                Duration::from_millis(defaults.scroll_pause_ms),
                Duration::from_millis(self.waits.poll_ms),
            )
            .await;
        }

        debug!("scroll budget exhausted at {} row(s)", last_good.len());
        Ok((last_good, false))
    }

    async fn read_rows(&self, max: usize) -> Result<Vec<ResultRow>> {
        let js = format!(
            r#"
            (() => {{
                const rows = Array.from(document.querySelectorAll('{rows}')).slice(0, {max});
                return rows.map(r => {{
                    const anchor = r.querySelector('a[href]');
                    const heading = r.querySelector('h2, h3, h5, .titulo');
                    const marker = r.querySelector('.orgao, .hierarchy-marker, .breadcrumb');
                    return {{
                        title: (heading ? heading.textContent : r.textContent || '').trim(),
                        orgLabel: (marker ? marker.textContent : '').trim(),
                        link: anchor ? anchor.href : '',
                        detailUrl: anchor ? anchor.href : null
                    }};
                }}).filter(r => r.title.length > 0);
            }})()
            "#,
            rows = ROW_SELECTOR,
            max = max,
        );
        let raw: Vec<RawRow> = self.driver.eval_as(js).await?;
        Ok(raw
            .into_iter()
            .map(|r| ResultRow {
                title: r.title,
                org_label: r.org_label,
                link: r.link,
                detail_url: r.detail_url,
                detail_text: None,
            })
            .collect())
    }

    async fn row_count(&self) -> Result<usize> {
        let js = format!(
            "document.querySelectorAll('{rows}').length",
            rows = ROW_SELECTOR
        );
        self.driver.eval_as(js).await
    }

    async fn scroll_step(&self) -> Result<()> {
        let _: bool = self
            .driver
            .eval_as("(() => { window.scrollTo(0, document.body.scrollHeight); return true; })()")
            .await?;
        Ok(())
    }
}
