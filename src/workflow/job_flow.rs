//! Edition runner - the flow of one job.
//!
//! A job is a deterministic replay: the combo already names the labels to
//! pick, so selection here re-walks the cascade path without enumeration.
//! Every phase is timed separately; the timings justify (and verify) the
//! page-reuse optimization in the scheduler.

use async_trait::async_trait;
use chromiumoxide::Browser;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::browser;
use crate::config::Config;
use crate::dropdown::actor::select_and_wait;
use crate::dropdown::control::{ControlKind, OptionMatcher, SelectionControl};
use crate::dropdown::dialect::DropdownPort;
use crate::dropdown::native_select::NativeSelectPort;
use crate::dropdown::token_widget::TokenWidgetPort;
use crate::error::{CascadeError, Result};
use crate::infrastructure::PageDriver;
use crate::models::job::Job;
use crate::models::report::{JobResult, PhaseTimings};
use crate::services::detail_fetcher::{summarize, DetailFetcher};
use crate::services::edition_page::EditionPage;
use crate::workflow::job_ctx::JobCtx;

/// The scheduler's execution seam. One executor per bucket worker; jobs run
/// strictly sequentially on it.
#[async_trait]
pub trait ExecuteJob: Send {
    async fn run_job(&mut self, job: &Job, ctx: &JobCtx) -> Result<JobResult>;

    /// Replace the page/context after a failure or timeout so the next job
    /// starts from a known-good state.
    async fn recycle(&mut self) -> Result<()>;
}

/// Live runner: owns one browser session and one edition page.
pub struct EditionRunner {
    browser: Browser,
    page: EditionPage,
    config: Config,
    detail_fetcher: DetailFetcher,
}

impl EditionRunner {
    /// Launch (or attach to) a browser and prepare an empty page. One runner
    /// per bucket; the browser is owned exclusively by it.
    pub async fn launch(config: Config) -> Result<Self> {
        let (browser, page) = if config.browser_debug_port > 0 {
            browser::connect_to_browser_and_page(config.browser_debug_port, None).await?
        } else {
            browser::launch_headless_browser("about:blank").await?
        };

        let driver = PageDriver::new(page);
        Ok(Self {
            browser,
            page: EditionPage::new(driver, config.waits),
            config,
            detail_fetcher: DetailFetcher::new(Duration::from_secs(30)),
        })
    }

    fn port_for(&self, kind: ControlKind) -> Box<dyn DropdownPort> {
        let driver = self.page.driver().clone();
        match kind {
            ControlKind::NativeSelect => Box::new(NativeSelectPort::new(driver, self.config.waits)),
            ControlKind::TokenWidget => Box::new(TokenWidgetPort::new(driver, self.config.waits)),
        }
    }

    async fn run_phases(&mut self, job: &Job, ctx: &JobCtx) -> Result<JobResult> {
        let mut timings = PhaseTimings::default();

        // ---- phase 1: navigate ----
        let started = Instant::now();
        let url = job.site.edition_url(&self.config, &job.date, &job.secao);
        let navigated = self.page.navigate(&url, &job.date, &job.secao).await?;
        timings.nav = started.elapsed().as_millis() as u64;
        log_navigate(ctx, navigated, timings.nav);

        // ---- phase 2: view ----
        let started = Instant::now();
        self.page.ensure_list_view().await?;
        timings.view = started.elapsed().as_millis() as u64;

        // ---- phase 3: select (deterministic replay) ----
        let started = Instant::now();
        self.replay_selection(job).await?;
        timings.select = started.elapsed().as_millis() as u64;
        log_select(ctx, timings.select);

        // ---- phase 4: collect ----
        let started = Instant::now();
        let (mut items, partial) = self.page.collect_rows(&job.defaults).await?;
        if job.defaults.fetch_details {
            self.fetch_details(&mut items, job, ctx).await;
        }
        timings.collect = started.elapsed().as_millis() as u64;
        log_collect(ctx, items.len(), partial);

        Ok(JobResult {
            job_id: job.id.clone(),
            success: true,
            partial,
            items,
            timings,
            error: None,
            attempts: 0,
        })
    }

    /// Re-walk the cascade path named by the combo. Uses the same actor as
    /// live resolution; only the matchers differ (recorded labels, with the
    /// prefix fallback absorbing drift since plan time).
    async fn replay_selection(&self, job: &Job) -> Result<()> {
        let port = self.port_for(job.site.dialect());
        let levels = job.site.levels();

        let labels: Vec<&str> = [
            Some(job.combo.label1.as_str()),
            Some(job.combo.label2.as_str()),
            job.combo.label3.as_deref(),
        ]
        .into_iter()
        .flatten()
        .take(levels)
        .collect();

        for (i, label) in labels.iter().enumerate() {
            let level = i + 1;
            let Some(control) = self.control_at(port.as_ref(), i).await? else {
                return Err(CascadeError::ControlNotFound { level }.into());
            };
            // the level below must repopulate before we touch it; the last
            // level instead repopulates the result list itself
            let downstream = if i + 1 < levels {
                self.control_at(port.as_ref(), i + 1).await?
            } else {
                None
            };

            let matcher = OptionMatcher::Label(label.to_string());
            let selected =
                select_and_wait(port.as_ref(), &control, downstream.as_ref(), &matcher, &self.config.waits)
                    .await?;
            if !selected {
                return Err(CascadeError::SelectionUnconfirmed {
                    level,
                    label: label.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    async fn control_at(
        &self,
        port: &dyn DropdownPort,
        position: usize,
    ) -> Result<Option<SelectionControl>> {
        Ok(port.discover().await?.into_iter().nth(position))
    }

    /// Detail enrichment is best-effort: a fetch failure leaves the row
    /// without text rather than failing a job that already has its listing.
    async fn fetch_details(
        &self,
        items: &mut [crate::models::report::ResultRow],
        job: &Job,
        ctx: &JobCtx,
    ) {
        for item in items.iter_mut() {
            let Some(url) = item.detail_url.clone() else {
                continue;
            };
            match self.detail_fetcher.fetch_detail(&url).await {
                Ok(detail) => {
                    item.detail_text = Some(summarize(&detail.text, job.defaults.summary_chars));
                }
                Err(e) => warn!("{ctx} detail fetch failed for {url}: {e}"),
            }
        }
    }
}

#[async_trait]
impl ExecuteJob for EditionRunner {
    async fn run_job(&mut self, job: &Job, ctx: &JobCtx) -> Result<JobResult> {
        match self.run_phases(job, ctx).await {
            Ok(result) => Ok(result),
            Err(e) => {
                // the page may be anywhere now; force re-navigation next job
                self.page.reset();
                Err(e)
            }
        }
    }

    async fn recycle(&mut self) -> Result<()> {
        info!("recycling browser page");
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| crate::error::BrowserError::PageCreationFailed {
                source: Box::new(e),
            })?;
        self.page = EditionPage::new(PageDriver::new(page), self.config.waits);
        Ok(())
    }
}

// ========== log helpers ==========

fn log_navigate(ctx: &JobCtx, navigated: bool, ms: u64) {
    if navigated {
        info!("{ctx} navigated in {ms}ms");
    } else {
        info!("{ctx} page reused, navigation skipped");
    }
}

fn log_select(ctx: &JobCtx, ms: u64) {
    info!("{ctx} selection replayed in {ms}ms");
}

fn log_collect(ctx: &JobCtx, items: usize, partial: bool) {
    if partial {
        warn!("{ctx} collected {items} item(s) (partial)");
    } else {
        info!("{ctx} collected {items} item(s)");
    }
}
