//! Native `<select>` dialect (DOU).
//!
//! Options live inside the element, so reading needs no open/close dance;
//! selection sets the value and fires the framework events the site listens
//! for.

use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::debug;

use crate::config::WaitTuning;
use crate::dropdown::control::{dedup_options, ControlKind, OptionEntry, SelectionControl};
use crate::dropdown::dialect::{DropdownPort, RawControl, IDENTITY_ATTR};
use crate::dropdown::sentinel::SentinelRule;
use crate::error::Result;
use crate::infrastructure::wait::wait_for_condition;
use crate::infrastructure::PageDriver;

pub struct NativeSelectPort {
    driver: PageDriver,
    waits: WaitTuning,
}

impl NativeSelectPort {
    pub fn new(driver: PageDriver, waits: WaitTuning) -> Self {
        Self { driver, waits }
    }

    fn poll(&self) -> Duration {
        Duration::from_millis(self.waits.poll_ms)
    }

    async fn raw_options(&self, identity: &str) -> Result<Vec<OptionEntry>> {
        let js = format!(
            r#"
            (() => {{
                const el = document.querySelector('[{attr}={id}]');
                if (!el) return [];
                return Array.from(el.options).map((o, i) => ({{
                    label: (o.label || o.text || '').trim(),
                    value: o.value,
                    index: i
                }}));
            }})()
            "#,
            attr = IDENTITY_ATTR,
            id = serde_json::to_string(identity)?,
        );
        self.driver.eval_as(js).await
    }
}

#[async_trait]
impl DropdownPort for NativeSelectPort {
    fn kind(&self) -> ControlKind {
        ControlKind::NativeSelect
    }

    async fn discover(&self) -> Result<Vec<SelectionControl>> {
        let js = format!(
            r#"
            (() => {{
                const found = [];
                for (const el of document.querySelectorAll('select')) {{
                    if (!el.hasAttribute('{attr}')) {{
                        window.__douRoboSeq = (window.__douRoboSeq || 0) + 1;
                        el.setAttribute('{attr}', 'ns-' + window.__douRoboSeq);
                    }}
                    const rect = el.getBoundingClientRect();
                    const style = window.getComputedStyle(el);
                    found.push({{
                        identity: el.getAttribute('{attr}'),
                        disabled: el.disabled,
                        optionCount: el.options.length,
                        visible: rect.width > 0 && rect.height > 0
                            && style.visibility !== 'hidden' && style.display !== 'none'
                    }});
                }}
                // visible controls first; sort is stable so document order holds
                found.sort((a, b) => Number(b.visible) - Number(a.visible));
                return found;
            }})()
            "#,
            attr = IDENTITY_ATTR,
        );
        let raw: Vec<RawControl> = self.driver.eval_as(js).await?;
        debug!("native-select discovery found {} control(s)", raw.len());
        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.into_control(ControlKind::NativeSelect, i + 1))
            .collect())
    }

    async fn relocate(&self, identity: &str) -> Result<Option<SelectionControl>> {
        let js = format!(
            r#"
            (() => {{
                const el = document.querySelector('[{attr}={id}]');
                if (!el) return null;
                const rect = el.getBoundingClientRect();
                return {{
                    identity: el.getAttribute('{attr}'),
                    disabled: el.disabled,
                    optionCount: el.options.length,
                    visible: rect.width > 0 && rect.height > 0
                }};
            }})()
            "#,
            attr = IDENTITY_ATTR,
            id = serde_json::to_string(identity)?,
        );
        let raw: Option<RawControl> = self.driver.eval_as(js).await?;
        Ok(raw.map(|r| r.into_control(ControlKind::NativeSelect, 0)))
    }

    async fn read_options(
        &self,
        control: &SelectionControl,
        exclude: &[Regex],
    ) -> Result<Vec<OptionEntry>> {
        // Wait until the element holds at least one real entry; a control
        // freshly repopulating often carries only its placeholder for a while.
        let populated = wait_for_condition(
            move || async move { matches!(self.option_count(control).await, Ok(n) if n > 0) },
            Duration::from_millis(self.waits.options_ms),
            self.poll(),
        )
        .await;
        if !populated {
            debug!(
                "control {} produced no options within {}ms",
                control.identity, self.waits.options_ms
            );
            return Ok(Vec::new());
        }

        let rule = SentinelRule::standard().with_excludes(exclude);
        let options = self.raw_options(&control.identity).await?;
        Ok(dedup_options(options)
            .into_iter()
            .filter(|o| !rule.is_sentinel(&o.label))
            .collect())
    }

    async fn option_count(&self, control: &SelectionControl) -> Result<usize> {
        let js = format!(
            r#"
            (() => {{
                const el = document.querySelector('[{attr}={id}]');
                return el ? el.options.length : 0;
            }})()
            "#,
            attr = IDENTITY_ATTR,
            id = serde_json::to_string(&control.identity)?,
        );
        self.driver.eval_as(js).await
    }

    async fn select(&self, control: &SelectionControl, option: &OptionEntry) -> Result<bool> {
        let js = format!(
            r#"
            (() => {{
                const el = document.querySelector('[{attr}={id}]');
                if (!el) return false;
                el.value = {value};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return el.value === {value};
            }})()
            "#,
            attr = IDENTITY_ATTR,
            id = serde_json::to_string(&control.identity)?,
            value = serde_json::to_string(&option.value)?,
        );
        let confirmed: bool = self.driver.eval_as(js).await?;
        Ok(confirmed)
    }

    async fn close(&self, _control: &SelectionControl) -> Result<()> {
        Ok(())
    }
}
