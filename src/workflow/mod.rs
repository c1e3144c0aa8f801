//! Flow layer.
//!
//! Defines the complete processing flow of one job: navigate → view →
//! select → collect, each phase timed. The scheduler above depends on the
//! [`ExecuteJob`] seam, never on the concrete runner, so batches can be
//! exercised without a browser.

pub mod job_ctx;
pub mod job_flow;

pub use job_ctx::JobCtx;
pub use job_flow::{EditionRunner, ExecuteJob};
