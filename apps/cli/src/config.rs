//! Credentials file management.
//!
//! Reads/writes JSON at `~/.pulp/admin.conf`, the same file and format the
//! previous `pulp` tool used, so existing setups keep working.

use std::path::{Path, PathBuf};

use anyhow::Context;
use pulpdeploy_api::ClientConfig;
use serde::{Deserialize, Serialize};

/// Server address and basic auth credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
    pub url: String,
}

impl Credentials {
    /// Loads credentials from `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "could not read credentials from '{}', try running 'config'",
                path.display()
            )
        })?;
        let creds: Credentials = serde_json::from_str(&content)
            .with_context(|| format!("malformed credentials file '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), url = %creds.url, "credentials loaded");
        Ok(creds)
    }

    /// Saves credentials to `path`, readable by the owner only.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
            set_permissions(parent, 0o700);
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, &json)?;
        set_permissions(path, 0o600);

        tracing::debug!(path = %path.display(), "credentials saved");
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.url, &self.user, &self.pass)
    }
}

fn set_permissions(path: &Path, mode: u32) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode));
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }
}

/// Default location of the credentials file.
pub fn default_path() -> anyhow::Result<PathBuf> {
    let home = std::env::var_os("HOME").context("HOME is not set, pass --config")?;
    Ok(PathBuf::from(home).join(".pulp").join("admin.conf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Credentials {
        Credentials {
            user: "admin".into(),
            pass: "secret".into(),
            url: "https://pulp.example.com".into(),
        }
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pulp").join("admin.conf");
        sample().save(&path).unwrap();
        assert_eq!(Credentials::load(&path).unwrap(), sample());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pulp").join("admin.conf");
        sample().save(&path).unwrap();

        let file_mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }

    #[test]
    fn reads_existing_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.conf");
        std::fs::write(
            &path,
            r#"{"user":"admin","pass":"secret","url":"https://pulp.example.com"}"#,
        )
        .unwrap();
        assert_eq!(Credentials::load(&path).unwrap(), sample());
    }

    #[test]
    fn missing_file_points_at_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = Credentials::load(&dir.path().join("nope.conf")).unwrap_err();
        assert!(err.to_string().contains("try running 'config'"));
    }

    #[test]
    fn malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.conf");
        std::fs::write(&path, "user=admin").unwrap();
        let err = Credentials::load(&path).unwrap_err();
        assert!(err.to_string().starts_with("malformed credentials file"));
    }

    #[test]
    fn client_config_uses_credentials() {
        let config = sample().client_config();
        assert_eq!(config.server, "https://pulp.example.com");
        assert_eq!(config.user, "admin");
        assert_eq!(config.password, "secret");
    }
}
