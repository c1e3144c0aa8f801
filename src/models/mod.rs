//! Wire types: everything that is persisted or crosses a worker boundary.

pub mod combo;
pub mod job;
pub mod pairs;
pub mod plan;
pub mod report;
pub mod site;

pub use combo::Combo;
pub use job::Job;
pub use pairs::{PairsArtifact, PairsBody, PairsMetadata, Staleness};
pub use plan::Plan;
pub use report::{BatchReport, JobResult, JobState, PhaseTimings, ResultRow};
pub use site::Site;
