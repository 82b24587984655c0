use std::time::Duration;

/// Path prefix of every Pulp 3 REST endpoint.
pub const API_ROOT: &str = "/pulp/api/v3";

/// Login redirect used as a cheap authenticated liveness probe.
pub const STATUS_PATH: &str = "/auth/login/?next=/pulp/api/v3/status/";

/// Distribution environments, in promotion order.
///
/// The first entry is the default environment: a fresh publication is
/// always pointed at it, the others are only moved with `set`.
pub const ENVIRONMENTS: [&str; 4] = ["dev", "uat", "oat", "prd"];

/// Architecture accepted in repository names.
pub const SUPPORTED_ARCH: &str = "x86_64";

/// Timeout for regular API requests.
pub const API_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for requests carrying file data (chunks, direct uploads).
///
/// A chunk is up to 8 MiB and the server may be slow to acknowledge it
/// under load, so this is much larger than [`API_REQUEST_TIMEOUT`].
pub const UPLOAD_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Fixed interval between two task state fetches.
pub const TASK_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Returns the default distribution environment.
pub fn default_environment() -> &'static str {
    ENVIRONMENTS[0]
}

/// Joins `path` onto the API root, e.g. `uploads/` -> `/pulp/api/v3/uploads/`.
pub fn api_path(path: &str) -> String {
    format!("{API_ROOT}/{}", path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_path_joins_without_double_slash() {
        assert_eq!(api_path("uploads/"), "/pulp/api/v3/uploads/");
        assert_eq!(api_path("/artifacts/"), "/pulp/api/v3/artifacts/");
    }

    #[test]
    fn dev_is_default_environment() {
        assert_eq!(default_environment(), "dev");
    }
}
