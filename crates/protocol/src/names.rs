//! Naming conventions for repositories, distributions and RPM files.
//!
//! Repositories are named `<name>-<os><release>-<arch>`, e.g.
//! `tools-co8-x86_64`. Each repository is served through one distribution
//! per environment, named `<repository>-<env>`.

use crate::constants::{ENVIRONMENTS, SUPPORTED_ARCH};

/// Errors produced while decomposing a name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("{0} is not a valid repository name, expected <name>-<os><release>-<arch>")]
    Repository(String),

    #[error("{0} is an unsupported hardware platform abbreviation")]
    Architecture(String),

    #[error("{0} is an unknown operating system abbreviation")]
    OperatingSystem(String),

    #[error("{0} is not a valid package file name, expected <name>-<version>-<release>.<arch>.rpm")]
    Package(String),

    #[error("{0} is not a valid distribution name, expected <repository>-<environment>")]
    Distribution(String),

    #[error("{0} is not a known environment")]
    Environment(String),
}

/// Parts of a repository name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDetails {
    pub name: String,
    pub distribution: String,
    pub release: String,
    pub architecture: String,
}

impl RepoDetails {
    /// Parses `<name>-<os><release>-<arch>`.
    pub fn parse(repo: &str) -> Result<Self, NameError> {
        let parts: Vec<&str> = repo.split('-').collect();
        if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(NameError::Repository(repo.to_string()));
        }

        let architecture = parts[parts.len() - 1];
        if architecture != SUPPORTED_ARCH {
            return Err(NameError::Architecture(architecture.to_string()));
        }

        let os_release = parts[parts.len() - 2];
        let (release, os): (String, String) = os_release.chars().partition(char::is_ascii_digit);
        let distribution = match os.as_str() {
            "co" => "centos",
            "fe" => "fedora",
            "ol" => "oraclelinux",
            "rh" => "redhat",
            "rl" => "rockylinux",
            _ => return Err(NameError::OperatingSystem(os)),
        };

        Ok(Self {
            name: parts[..parts.len() - 2].join("-"),
            distribution: distribution.to_string(),
            release,
            architecture: architecture.to_string(),
        })
    }

    /// Base path served by the distribution of `environment`.
    pub fn base_path(&self, environment: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.distribution, self.release, self.architecture, self.name, environment
        )
    }
}

/// Parts of an RPM file name used to look up its content unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDetails {
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
}

impl PackageDetails {
    /// Parses `<name>-<version>[-<release>].<arch>.rpm`.
    ///
    /// The version is the first dash-separated segment after the name that
    /// contains a digit, the release the next such segment. The release
    /// defaults to `1` when absent.
    pub fn parse(file_name: &str) -> Result<Self, NameError> {
        let invalid = || NameError::Package(file_name.to_string());

        let dots: Vec<&str> = file_name.split('.').collect();
        if dots.len() < 3 {
            return Err(invalid());
        }
        let arch = dots[dots.len() - 2];
        let stem = dots[..dots.len() - 2].join(".");
        let segments: Vec<&str> = stem.split('-').collect();

        let has_digit = |s: &&str| s.chars().any(|c| c.is_ascii_digit());
        let version_idx = segments
            .iter()
            .skip(1)
            .position(has_digit)
            .map(|i| i + 1)
            .ok_or_else(invalid)?;
        let release = segments[version_idx + 1..]
            .iter()
            .find(|s| has_digit(s))
            .map_or("1", |s| *s);

        if arch.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            name: segments[..version_idx].join("-"),
            version: segments[version_idx].to_string(),
            release: release.to_string(),
            arch: arch.to_string(),
        })
    }
}

/// Name of the distribution serving `repo` in `environment`.
pub fn distribution_name(repo: &str, environment: &str) -> String {
    format!("{repo}-{environment}")
}

/// Splits `<repository>-<environment>` on its last dash.
pub fn split_distribution(dist: &str) -> Result<(&str, &str), NameError> {
    let (repo, env) = dist
        .rsplit_once('-')
        .filter(|(repo, env)| !repo.is_empty() && !env.is_empty())
        .ok_or_else(|| NameError::Distribution(dist.to_string()))?;
    if !ENVIRONMENTS.contains(&env) {
        return Err(NameError::Environment(env.to_string()));
    }
    Ok((repo, env))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_repository() {
        let r = RepoDetails::parse("internal-tools-rl9-x86_64").unwrap();
        assert_eq!(r.name, "internal-tools");
        assert_eq!(r.distribution, "rockylinux");
        assert_eq!(r.release, "9");
        assert_eq!(r.architecture, "x86_64");
        assert_eq!(r.base_path("uat"), "rockylinux/9/x86_64/internal-tools/uat");
    }

    #[test]
    fn parse_repository_rejects_arch() {
        assert_eq!(
            RepoDetails::parse("tools-co8-aarch64"),
            Err(NameError::Architecture("aarch64".into()))
        );
    }

    #[test]
    fn parse_repository_rejects_os() {
        assert_eq!(
            RepoDetails::parse("tools-xx8-x86_64"),
            Err(NameError::OperatingSystem("xx".into()))
        );
    }

    #[test]
    fn parse_repository_too_short() {
        assert!(matches!(
            RepoDetails::parse("x86_64"),
            Err(NameError::Repository(_))
        ));
    }

    #[test]
    fn parse_package_full() {
        let p = PackageDetails::parse("my-tool-1.2.3-4.el8.x86_64.rpm").unwrap();
        assert_eq!(p.name, "my-tool");
        assert_eq!(p.version, "1.2.3");
        assert_eq!(p.release, "4.el8");
        assert_eq!(p.arch, "x86_64");
    }

    #[test]
    fn parse_package_default_release() {
        let p = PackageDetails::parse("tool-2.0.noarch.rpm").unwrap();
        assert_eq!(p.name, "tool");
        assert_eq!(p.version, "2.0");
        assert_eq!(p.release, "1");
        assert_eq!(p.arch, "noarch");
    }

    #[test]
    fn parse_package_name_with_digit() {
        let p = PackageDetails::parse("python3-foo-0.9-2.x86_64.rpm").unwrap();
        assert_eq!(p.name, "python3-foo");
        assert_eq!(p.version, "0.9");
        assert_eq!(p.release, "2");
    }

    #[test]
    fn parse_package_without_version() {
        assert!(PackageDetails::parse("tool.x86_64.rpm").is_err());
        assert!(PackageDetails::parse("tool.rpm").is_err());
    }

    #[test]
    fn split_distribution_on_last_dash() {
        assert_eq!(
            split_distribution("tools-co8-x86_64-prd").unwrap(),
            ("tools-co8-x86_64", "prd")
        );
        assert!(matches!(
            split_distribution("tools-co8-x86_64-qa"),
            Err(NameError::Environment(_))
        ));
        assert!(split_distribution("nodash").is_err());
    }

    #[test]
    fn distribution_name_joins() {
        assert_eq!(distribution_name("r-co8-x86_64", "dev"), "r-co8-x86_64-dev");
    }
}
