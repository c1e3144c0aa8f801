//! Plan building.
//!
//! Turns resolved combinations into a persisted plan, either by driving the
//! live cascade or by filtering a pairs artifact in memory. The unattended
//! updater that refreshes those artifacts lives here too.

pub mod builder;
pub mod updater;

pub use builder::{PlanBuilder, PlanRequest, PlanSource};
pub use updater::PairsUpdater;
