//! # dou-robo
//!
//! Batch automation for Brazil's official gazette (DOU) and the e-agendas
//! calendar: cascading dropdown resolution, plan building, and parallel
//! edition runs.
//!
//! ## Architecture
//!
//! The system is layered strictly; each layer only depends downward:
//!
//! ### ① Infrastructure
//! - `infrastructure/` - holds the scarce resource (the page), exposes
//!   capabilities: JS evaluation and the condition-polling primitive
//! - `browser/` - session setup (debug-port attach or headless launch)
//!
//! ### ② Capabilities
//! - `dropdown/` - the cascading dropdown protocol behind the
//!   `DropdownPort` trait, with one dialect per site widget style
//! - `services/` - edition page operations, detail fetching, result
//!   persistence, the advisory run lock
//!
//! ### ③ Flow
//! - `cascade/` - filter specs and the N-level cascade resolver
//! - `workflow/` - one job's complete flow (navigate → view → select →
//!   collect), timed per phase
//!
//! ### ④ Orchestration
//! - `planner/` - turns resolved combos into persisted plans; refreshes
//!   pairs artifacts
//! - `orchestrator/` - the batch scheduler: buckets, worker pools, retries,
//!   report aggregation
//!
//! ## Module structure

pub mod browser;
pub mod cascade;
pub mod cli;
pub mod config;
pub mod dropdown;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod planner;
pub mod services;
pub mod utils;
pub mod workflow;

// re-export the common types
pub use cascade::{CascadeResolver, FilterSpec};
pub use config::{Config, ScrapeDefaults, WaitTuning};
pub use dropdown::{DropdownPort, OptionEntry, OptionMatcher, SelectionControl};
pub use error::{AppError, Result};
pub use infrastructure::{wait_for_condition, PageDriver};
pub use models::{BatchReport, Combo, Job, JobResult, Plan, ResultRow, Site};
pub use orchestrator::{BatchOptions, BatchRunner, ExecutorFactory, PoolKind};
pub use planner::{PairsUpdater, PlanBuilder, PlanRequest, PlanSource};
pub use workflow::{EditionRunner, ExecuteJob, JobCtx};
