use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Opens a chunked upload of `size` bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadStart {
    pub size: u64,
}

/// Commits a chunked upload; the server checks the assembled bytes against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadCommit {
    pub sha256: String,
}

/// Creates an RPM package content unit from an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePackage {
    pub artifact: String,
    pub relative_path: String,
}

/// Adds or removes content units to produce a new repository version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyContent {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_content_units: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_content_units: Vec<String>,
}

/// Publishes a repository version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePublication {
    pub repository_version: String,
}

/// Body used both to create and to update a distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSpec {
    pub base_path: String,
    pub content_guard: Option<String>,
    pub name: String,
    pub publication: String,
}

/// Synchronises a repository with its remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub mirror: bool,
    pub skip_types: Vec<String>,
    pub optimize: bool,
}

impl Default for SyncRequest {
    fn default() -> Self {
        Self {
            mirror: true,
            skip_types: vec!["srpm".into()],
            optimize: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Returned by every call that spawns an asynchronous task (HTTP 202).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task: String,
}
