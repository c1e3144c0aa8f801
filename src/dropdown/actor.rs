//! Selection actor.
//!
//! Performs one selection and waits for the dependent control to repopulate.
//! That wait is the slowest, most failure-prone step in the whole system
//! (it covers a full server round-trip) and is always a conditional poll,
//! never a fixed sleep.

use std::time::Duration;
use tracing::{debug, warn};

use crate::config::WaitTuning;
use crate::dropdown::control::{OptionMatcher, SelectionControl};
use crate::dropdown::dialect::DropdownPort;
use crate::error::Result;
use crate::infrastructure::wait::wait_for_condition;

/// Select an option on `control` and, when `downstream` is given, wait for
/// that control to finish repopulating.
///
/// Repopulation is detected as any of:
/// - the downstream option count moving away from its pre-selection snapshot,
/// - the downstream control becoming enabled with options present,
/// - the downstream DOM node being replaced (identity no longer resolvable;
///   the caller re-discovers in that case).
///
/// Returns `false` when the selection could not be confirmed or the
/// downstream never settled. Does not raise for either condition.
pub async fn select_and_wait(
    port: &dyn DropdownPort,
    control: &SelectionControl,
    downstream: Option<&SelectionControl>,
    matcher: &OptionMatcher,
    waits: &WaitTuning,
) -> Result<bool> {
    let options = port.read_options(control, &[]).await?;
    let Some(option) = matcher.find(&options) else {
        warn!(
            "option '{}' not found on level {} ({} candidates)",
            matcher.describe(),
            control.level,
            options.len()
        );
        return Ok(false);
    };

    let snapshot = match downstream {
        Some(d) => Some(port.option_count(d).await.unwrap_or(0)),
        None => None,
    };

    if !port.select(control, option).await? {
        warn!(
            "selection of '{}' on level {} not confirmed",
            option.label, control.level
        );
        return Ok(false);
    }
    port.close(control).await?;
    debug!("selected '{}' on level {}", option.label, control.level);

    let (Some(downstream), Some(before)) = (downstream, snapshot) else {
        return Ok(true);
    };

    let repopulated = wait_for_condition(
        move || async move {
            match port.relocate(&downstream.identity).await {
                // node replaced: the cascade rebuilt it, caller re-discovers
                Ok(None) => true,
                Ok(Some(current)) => {
                    let count = port.option_count(&current).await.unwrap_or(before);
                    count != before || (!current.is_disabled && count > 0)
                }
                Err(_) => false,
            }
        },
        Duration::from_millis(waits.repopulate_ms),
        Duration::from_millis(waits.poll_ms),
    )
    .await;

    if !repopulated {
        warn!(
            "level {} did not repopulate within {}ms after selecting '{}'",
            downstream.level, waits.repopulate_ms, option.label
        );
    }
    Ok(repopulated)
}
