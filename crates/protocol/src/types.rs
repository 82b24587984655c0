use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a server-side task.
///
/// Pulp may grow new states; anything unknown is kept verbatim in
/// [`TaskState::Other`] so error messages can show the raw name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    Waiting,
    Running,
    Completed,
    Canceled,
    Failed,
    Other(String),
}

impl TaskState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }

    /// Returns `true` once the task will not change state anymore.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Waiting | Self::Running)
    }
}

impl From<String> for TaskState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "waiting" => Self::Waiting,
            "running" => Self::Running,
            "completed" => Self::Completed,
            "canceled" => Self::Canceled,
            "failed" => Self::Failed,
            _ => Self::Other(s),
        }
    }
}

impl From<TaskState> for String {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure detail attached to a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub traceback: Option<String>,
}

/// Progress entry of a long-running task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub total: Option<i64>,
    #[serde(default)]
    pub done: i64,
    #[serde(default)]
    pub suffix: Option<String>,
}

/// Full task document as returned by `GET <task href>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskQuery {
    pub pulp_href: String,
    #[serde(default)]
    pub pulp_created: Option<DateTime<Utc>>,
    pub state: TaskState,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub logging_cid: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<TaskError>,
    #[serde(default)]
    pub worker: Option<String>,
    #[serde(default)]
    pub parent_task: Option<String>,
    #[serde(default)]
    pub child_tasks: Vec<String>,
    #[serde(default)]
    pub task_group: Option<String>,
    #[serde(default)]
    pub progress_reports: Vec<ProgressReport>,
    #[serde(default)]
    pub created_resources: Vec<String>,
    #[serde(default)]
    pub reserved_resources_record: Vec<String>,
}

impl TaskQuery {
    /// Returns the server-supplied failure description, if any.
    pub fn error_description(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|e| e.description.as_deref())
            .filter(|d| !d.is_empty())
    }
}

/// Staging area of a chunked upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSession {
    pub pulp_href: String,
    #[serde(default)]
    pub pulp_created: Option<DateTime<Utc>>,
    pub size: u64,
    /// Set by the server once the upload has been committed.
    #[serde(default)]
    pub completed: Option<DateTime<Utc>>,
}

/// Permanent, content-addressed file stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub pulp_href: String,
    #[serde(default)]
    pub pulp_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub sha224: Option<String>,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub sha384: Option<String>,
    #[serde(default)]
    pub sha512: Option<String>,
}

/// RPM repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub pulp_href: String,
    #[serde(default)]
    pub pulp_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub versions_href: String,
    #[serde(default)]
    pub latest_version_href: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub remote: Option<String>,
}

/// Published, immutable snapshot of a repository version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub pulp_href: String,
    #[serde(default)]
    pub pulp_created: Option<DateTime<Utc>>,
    pub repository_version: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub metadata_checksum_type: Option<String>,
    #[serde(default)]
    pub package_checksum_type: Option<String>,
    #[serde(default)]
    pub gpgcheck: Option<i64>,
    #[serde(default)]
    pub repo_gpgcheck: Option<i64>,
    #[serde(default)]
    pub sqlite_metadata: Option<bool>,
}

impl Publication {
    /// Number of the repository version this publication was built from.
    pub fn version(&self) -> Option<u64> {
        version_number(&self.repository_version)
    }
}

/// Serving point exposing one publication under a base path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub pulp_href: String,
    #[serde(default)]
    pub pulp_created: Option<DateTime<Utc>>,
    pub base_path: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub content_guard: Option<String>,
    pub name: String,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub publication: Option<String>,
}

/// RPM package content unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageContent {
    pub pulp_href: String,
    #[serde(default)]
    pub pulp_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub artifact: Option<String>,
    pub name: String,
    #[serde(default)]
    pub epoch: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub arch: String,
    #[serde(rename = "pkgId", default)]
    pub pkg_id: String,
    #[serde(default)]
    pub checksum_type: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub location_href: String,
}

/// One page of a paginated list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Returns the first result, if the page has any.
    pub fn first(&self) -> Option<&T> {
        self.results.first()
    }

    pub fn into_first(self) -> Option<T> {
        self.results.into_iter().next()
    }
}

/// Extracts the trailing version number of a repository version href
/// (`.../versions/3/` -> `3`).
pub fn version_number(href: &str) -> Option<u64> {
    href.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_state_known_values() {
        let s: TaskState = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(s, TaskState::Running);
        assert!(!s.is_terminal());
        let s: TaskState = serde_json::from_str("\"canceled\"").unwrap();
        assert!(s.is_terminal());
    }

    #[test]
    fn task_state_unknown_is_kept_and_terminal() {
        let s: TaskState = serde_json::from_str("\"skipped\"").unwrap();
        assert_eq!(s, TaskState::Other("skipped".into()));
        assert!(s.is_terminal());
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"skipped\"");
    }

    #[test]
    fn task_query_minimal_document() {
        let json = r#"{
            "pulp_href": "/pulp/api/v3/tasks/1/",
            "state": "completed",
            "error": null,
            "created_resources": ["/pulp/api/v3/artifacts/9/"],
            "progress_reports": [
                {"message": "Clean up orphan Content", "code": "clean-up.content",
                 "state": "completed", "total": 3, "done": 3, "suffix": null}
            ]
        }"#;
        let task: TaskQuery = serde_json::from_str(json).unwrap();
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.created_resources.len(), 1);
        assert_eq!(task.progress_reports[0].done, 3);
        assert!(task.error_description().is_none());
    }

    #[test]
    fn task_error_description() {
        let json = r#"{
            "pulp_href": "/pulp/api/v3/tasks/2/",
            "state": "failed",
            "error": {"description": "boom", "traceback": "File x"}
        }"#;
        let task: TaskQuery = serde_json::from_str(json).unwrap();
        assert_eq!(task.error_description(), Some("boom"));
    }

    #[test]
    fn upload_session_with_timestamps() {
        let json = r#"{
            "pulp_href": "/pulp/api/v3/uploads/abc/",
            "pulp_created": "2021-08-19T10:00:00.123456Z",
            "size": 20971520,
            "completed": null
        }"#;
        let s: UploadSession = serde_json::from_str(json).unwrap();
        assert_eq!(s.size, 20 * 1024 * 1024);
        assert!(s.pulp_created.is_some());
        assert!(s.completed.is_none());
    }

    #[test]
    fn publication_version_from_href() {
        let p = Publication {
            pulp_href: "/pulp/api/v3/publications/rpm/rpm/p1/".into(),
            pulp_created: None,
            repository_version: "/pulp/api/v3/repositories/rpm/rpm/r1/versions/12/".into(),
            repository: "/pulp/api/v3/repositories/rpm/rpm/r1/".into(),
            metadata_checksum_type: None,
            package_checksum_type: None,
            gpgcheck: None,
            repo_gpgcheck: None,
            sqlite_metadata: None,
        };
        assert_eq!(p.version(), Some(12));
        assert_eq!(version_number("/x/versions/abc/"), None);
    }

    #[test]
    fn package_content_pkg_id_field_name() {
        let json = r#"{"pulp_href":"/c/1/","name":"foo","version":"1.0","release":"1",
                       "arch":"x86_64","pkgId":"deadbeef"}"#;
        let c: PackageContent = serde_json::from_str(json).unwrap();
        assert_eq!(c.pkg_id, "deadbeef");
    }

    #[test]
    fn page_first() {
        let json = r#"{"count":1,"next":null,"previous":null,"results":[{"pulp_href":"/r/1/","name":"repo"}]}"#;
        let page: Page<Repository> = serde_json::from_str(json).unwrap();
        assert_eq!(page.first().map(|r| r.name.as_str()), Some("repo"));
    }
}
