//! Web dashboard HTTP server module.
//!
//! Serves the catalog, prompt and todo pages plus a small JSON API.

mod server;
pub mod templates;

pub use server::{DashboardServer, build_router, start_server};
