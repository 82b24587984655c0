//! Wire types for the Pulp 3 REST API as used by pulpdeploy.

pub mod constants;
pub mod messages;
pub mod names;
pub mod types;

// Re-export primary types for convenience.
pub use messages::{TaskHandle, UploadCommit, UploadStart};
pub use names::{NameError, PackageDetails, RepoDetails};
pub use types::{
    Artifact, Distribution, PackageContent, Page, ProgressReport, Publication, Repository,
    TaskError, TaskQuery, TaskState, UploadSession,
};
