//! RPM publish flow on a Pulp 3 server.
//!
//! # Pipeline
//!
//! 1. **Add**: upload the package file and link its content unit into a
//!    new repository version
//! 2. **Publish**: create a publication of the latest repository version
//! 3. **Distribute**: serve the publication from the default environment,
//!    or create one distribution per environment on first release
//!
//! Removal, promotion between environments (`set_version`), remote sync
//! and orphan cleanup reuse the same building blocks.

pub mod error;
pub mod publisher;
pub mod types;

pub use error::PublishError;
pub use publisher::Publisher;
pub use types::{ActiveDistribution, AddedPackage, Distributed, Released, SyncOutcome};
