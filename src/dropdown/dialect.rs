//! The dropdown capability.
//!
//! The cascade resolver and the job executor depend on this trait only.
//! Concrete dialects translate each capability into injected JS against a
//! page; tests script it in memory.

use async_trait::async_trait;
use regex::Regex;

use crate::dropdown::control::{ControlKind, OptionEntry, SelectionControl};
use crate::error::Result;

/// Polymorphic capability over one page's cascading dropdowns.
#[async_trait]
pub trait DropdownPort: Send + Sync {
    /// Dialect implemented by this port.
    fn kind(&self) -> ControlKind;

    /// Scan the page for candidate controls, best first (visible before
    /// hidden, then document order). Levels are assigned by that order.
    /// Zero matches is an empty vec, not an error.
    async fn discover(&self) -> Result<Vec<SelectionControl>>;

    /// Re-find a previously-discovered control after a page mutation.
    async fn relocate(&self, identity: &str) -> Result<Option<SelectionControl>>;

    /// Read the control's current options: opened if needed, waited on until
    /// at least one option is present or timeout, deduplicated, sentinels and
    /// `exclude` patterns removed. Empty on timeout, not an error.
    async fn read_options(
        &self,
        control: &SelectionControl,
        exclude: &[Regex],
    ) -> Result<Vec<OptionEntry>>;

    /// Cheap raw option count (placeholders included); the repopulation
    /// probe compares this against a pre-selection snapshot.
    async fn option_count(&self, control: &SelectionControl) -> Result<usize>;

    /// Select `option` on the control and confirm it took. `false` when the
    /// selection could not be confirmed.
    async fn select(&self, control: &SelectionControl, option: &OptionEntry) -> Result<bool>;

    /// Collapse any open option panel. A no-op for native selects.
    async fn close(&self, control: &SelectionControl) -> Result<()>;
}

/// Attribute stamped on discovered controls so they can be re-located after
/// cascade mutations replace surrounding DOM.
pub(crate) const IDENTITY_ATTR: &str = "data-dou-robo-id";

/// Control shape as returned by the dialects' discovery scripts.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawControl {
    pub identity: String,
    pub disabled: bool,
    pub option_count: usize,
    #[allow(dead_code)]
    pub visible: bool,
}

impl RawControl {
    pub fn into_control(self, kind: ControlKind, level: usize) -> SelectionControl {
        SelectionControl {
            identity: self.identity,
            kind,
            level,
            is_disabled: self.disabled,
            option_count: self.option_count,
        }
    }
}
