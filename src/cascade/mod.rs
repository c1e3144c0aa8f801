//! Cascade resolution.
//!
//! Walks the dependent dropdown levels (2 for DOU, 3 for e-agendas),
//! enumerating the combinations that survive the per-level filters. Depends
//! only on the [`DropdownPort`](crate::dropdown::DropdownPort) capability.

pub mod filter;
pub mod resolver;

pub use filter::FilterSpec;
pub use resolver::CascadeResolver;
