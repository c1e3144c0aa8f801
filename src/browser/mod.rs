//! Browser session management.
//!
//! Two ways in: attach to an already-running browser through its debug port,
//! or launch a private headless instance (one per bucket worker).

pub mod connection;
pub mod headless;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_headless_browser;
