//! Publish error types.

use pulpdeploy_api::ApiError;
use pulpdeploy_protocol::NameError;
use pulpdeploy_transfer::TransferError;

/// Errors produced by the publish workflows.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error("Pulp API status check returned {0}, try running 'config' again")]
    Offline(u16),

    #[error("repository {0} does not exist")]
    RepositoryNotFound(String),

    #[error("repository {0} has no version yet")]
    NoRepositoryVersion(String),

    #[error("{0} is not an rpm package")]
    NotRpm(String),

    #[error("package {0} already exists")]
    PackageExists(String),

    #[error("contents of {0} not found")]
    ContentNotFound(String),

    #[error("content of package {package} is not linked with repo {repo}")]
    NotInRepository { package: String, repo: String },

    #[error("publication for repository {0} already exists")]
    PublicationExists(String),

    #[error("publication version {version} from repository {repo} could not be found")]
    PublicationNotFound { repo: String, version: u64 },

    #[error("publication version {version} is currently still being used by distribution {distribution}")]
    PublicationInUse { version: u64, distribution: String },

    #[error("distribution {0} does not exist")]
    DistributionNotFound(String),

    #[error("remote is not set for repo {0}")]
    NoRemote(String),
}
