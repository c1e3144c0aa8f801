//! Tokenized combobox dialect (e-agendas).
//!
//! The widget library renders its option panel at body level, sometimes
//! keeping the container in the DOM but hidden. Reading therefore has a
//! fallback: when no visible panel holds options, use the last
//! structurally-present container that does.

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

/// Selectors for the widget containers and their option nodes. These cover
/// the combobox library both target deployments use, plus the generic ARIA
/// shape as insurance against site upgrades.
const CONTAINER_SELECTOR: &str = ".ng-select, [role=\"combobox\"]";
const OPTION_SELECTOR: &str = "[role=\"option\"], .ng-option";
const PANEL_SELECTOR: &str = ".ng-dropdown-panel, [role=\"listbox\"]";

pub struct TokenWidgetPort {
    driver: PageDriver,
    waits: WaitTuning,
}

impl TokenWidgetPort {
    pub fn new(driver: PageDriver, waits: WaitTuning) -> Self {
        Self { driver, waits }
    }

    fn poll(&self) -> Duration {
        Duration::from_millis(self.waits.poll_ms)
    }

    /// Open the widget's panel by clicking its container.
    async fn open(&self, identity: &str) -> Result<()> {
        let js = format!(
            r#"
            (() => {{
                const el = document.querySelector('[{attr}={id}]');
                if (!el) return false;
                el.dispatchEvent(new MouseEvent('mousedown', {{ bubbles: true }}));
                el.click();
                return true;
            }})()
            "#,
            attr = IDENTITY_ATTR,
            id = serde_json::to_string(identity)?,
        );
        let _: bool = self.driver.eval_as(js).await?;
        Ok(())
    }

    /// Read option nodes, visible panel first, hidden-container fallback
    /// second.
    async fn raw_options(&self, identity: &str) -> Result<Vec<OptionEntry>> {
        let js = format!(
            r#"
            (() => {{
                const root = document.querySelector('[{attr}={id}]');
                if (!root) return [];
                const optionSel = '{opt_sel}';
                let nodes = Array.from(root.querySelectorAll(optionSel));
                if (nodes.length === 0) {{
                    const panels = Array.from(document.querySelectorAll('{panel_sel}'))
                        .filter(p => p.querySelectorAll(optionSel).length > 0);
                    const visible = panels.filter(p => {{
                        const r = p.getBoundingClientRect();
                        return r.width > 0 && r.height > 0;
                    }});
                    const panel = visible.length
                        ? visible[visible.length - 1]
                        : panels[panels.length - 1];
                    if (panel) nodes = Array.from(panel.querySelectorAll(optionSel));
                }}
                return nodes.map((n, i) => ({{
                    label: (n.textContent || '').trim(),
                    value: n.getAttribute('data-value') || (n.textContent || '').trim(),
                    index: i
                }}));
            }})()
            "#,
            attr = IDENTITY_ATTR,
            id = serde_json::to_string(identity)?,
            opt_sel = OPTION_SELECTOR,
            panel_sel = PANEL_SELECTOR,
        );
        self.driver.eval_as(js).await
    }
}

#[async_trait]
impl DropdownPort for TokenWidgetPort {
    fn kind(&self) -> ControlKind {
        ControlKind::TokenWidget
    }

    async fn discover(&self) -> Result<Vec<SelectionControl>> {
        let js = format!(
            r#"
            (() => {{
                const found = [];
                for (const el of document.querySelectorAll('{container_sel}')) {{
                    if (!el.hasAttribute('{attr}')) {{
                        window.__douRoboSeq = (window.__douRoboSeq || 0) + 1;
                        el.setAttribute('{attr}', 'tw-' + window.__douRoboSeq);
                    }}
                    const rect = el.getBoundingClientRect();
                    const style = window.getComputedStyle(el);
                    const disabled = el.getAttribute('aria-disabled') === 'true'
                        || el.classList.contains('ng-select-disabled');
                    found.push({{
                        identity: el.getAttribute('{attr}'),
                        disabled: disabled,
                        optionCount: el.querySelectorAll('{opt_sel}').length,
                        visible: rect.width > 0 && rect.height > 0
                            && style.visibility !== 'hidden' && style.display !== 'none'
                    }});
                }}
                found.sort((a, b) => Number(b.visible) - Number(a.visible));
                return found;
            }})()
            "#,
            container_sel = CONTAINER_SELECTOR,
            attr = IDENTITY_ATTR,
            opt_sel = OPTION_SELECTOR,
        );
        let raw: Vec<RawControl> = self.driver.eval_as(js).await?;
        debug!("token-widget discovery found {} control(s)", raw.len());
        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.into_control(ControlKind::TokenWidget, i + 1))
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
                    disabled: el.getAttribute('aria-disabled') === 'true'
                        || el.classList.contains('ng-select-disabled'),
                    optionCount: el.querySelectorAll('{opt_sel}').length,
                    visible: rect.width > 0 && rect.height > 0
                }};
            }})()
            "#,
            attr = IDENTITY_ATTR,
            id = serde_json::to_string(identity)?,
            opt_sel = OPTION_SELECTOR,
        );
        let raw: Option<RawControl> = self.driver.eval_as(js).await?;
        Ok(raw.map(|r| r.into_control(ControlKind::TokenWidget, 0)))
    }

    async fn read_options(
        &self,
        control: &SelectionControl,
        exclude: &[Regex],
    ) -> Result<Vec<OptionEntry>> {
        self.open(&control.identity).await?;

        let identity = control.identity.as_str();
        let populated = wait_for_condition(
            move || async move { matches!(self.raw_options(identity).await, Ok(o) if !o.is_empty()) },
            Duration::from_millis(self.waits.options_ms),
            self.poll(),
        )
        .await;
        if !populated {
            debug!(
                "widget {} produced no options within {}ms",
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
        Ok(self.raw_options(&control.identity).await?.len())
    }

    async fn select(&self, control: &SelectionControl, option: &OptionEntry) -> Result<bool> {
        self.open(&control.identity).await?;

        // Click the option node whose text matches; confirmation is the
        // widget's displayed token containing the chosen label.
        let js = format!(
            r#"
            (() => {{
                const root = document.querySelector('[{attr}={id}]');
                if (!root) return false;
                const optionSel = '{opt_sel}';
                let nodes = Array.from(root.querySelectorAll(optionSel));
                if (nodes.length === 0) {{
                    const panels = Array.from(document.querySelectorAll('{panel_sel}'))
                        .filter(p => p.querySelectorAll(optionSel).length > 0);
                    const panel = panels[panels.length - 1];
                    if (panel) nodes = Array.from(panel.querySelectorAll(optionSel));
                }}
                const wanted = {label};
                const target = nodes.find(n => (n.textContent || '').trim() === wanted)
                    || nodes[{index}];
                if (!target) return false;
                target.dispatchEvent(new MouseEvent('mousedown', {{ bubbles: true }}));
                target.click();
                return (root.textContent || '').includes(wanted.slice(0, 5));
            }})()
            "#,
            attr = IDENTITY_ATTR,
            id = serde_json::to_string(&control.identity)?,
            opt_sel = OPTION_SELECTOR,
            panel_sel = PANEL_SELECTOR,
            label = serde_json::to_string(&option.label)?,
            index = option.index,
        );
        let confirmed: bool = self.driver.eval_as(js).await?;
        Ok(confirmed)
    }

    async fn close(&self, control: &SelectionControl) -> Result<()> {
        let js = format!(
            r#"
            (() => {{
                const el = document.querySelector('[{attr}={id}]');
                if (el) el.dispatchEvent(new KeyboardEvent('keydown', {{ key: 'Escape', bubbles: true }}));
                return true;
            }})()
            "#,
            attr = IDENTITY_ATTR,
            id = serde_json::to_string(&control.identity)?,
        );
        let _: bool = self.driver.eval_as(js).await?;
        Ok(())
    }
}
