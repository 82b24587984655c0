//! Results of the publish workflows.

use pulpdeploy_protocol::{Artifact, Distribution, Publication};
use pulpdeploy_transfer::PoolReport;

/// Package uploaded and linked into a repository.
#[derive(Debug, Clone)]
pub struct AddedPackage {
    pub artifact: Artifact,
    /// Content units created from the artifact.
    pub content: Vec<String>,
    /// Set when the file went through the chunked path.
    pub chunked: Option<PoolReport>,
}

/// What [`Publisher::distribute`](crate::Publisher::distribute) changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Distributed {
    /// The default environment distribution was moved to the publication.
    Updated { distribution: String },
    /// First publication: one distribution per environment was created.
    Created { distributions: Vec<String> },
}

/// A publication together with the distributions that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Released {
    pub publication: String,
    pub distributed: Distributed,
}

/// Outcome of a repository sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote brought nothing new; the latest version is already published.
    AlreadyInSync,
    Released(Released),
}

/// Distribution of one environment with the publication it serves.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDistribution {
    pub environment: &'static str,
    pub distribution: Distribution,
    /// `None` when the served publication no longer belongs to the repository.
    pub publication: Option<Publication>,
}

impl ActiveDistribution {
    /// Repository version number of the served publication.
    pub fn version(&self) -> Option<u64> {
        self.publication.as_ref().and_then(Publication::version)
    }
}
