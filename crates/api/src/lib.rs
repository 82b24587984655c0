//! Pulp 3 REST client for pulpdeploy.
//!
//! Wraps `reqwest` with basic authentication, maps unexpected statuses to
//! [`ApiError`] and waits for server-side tasks with [`TaskPoller`].

pub mod client;
pub mod error;
pub mod poller;
mod resources;

pub use client::{ClientConfig, PulpClient, expect_status, normalize_server};
pub use error::ApiError;
pub use poller::{TaskPoller, TaskSource};
