//! Repository workflows: add, remove, publish, distribute, sync and clean.
//!
//! Every write goes through a server-side task which is awaited before the
//! next step starts, so each workflow observes the repository version its
//! previous step produced.

use std::path::Path;
use std::time::Duration;

use pulpdeploy_api::{ApiError, PulpClient, TaskPoller};
use pulpdeploy_protocol::constants::{ENVIRONMENTS, TASK_POLL_INTERVAL, default_environment};
use pulpdeploy_protocol::messages::{DistributionSpec, ModifyContent};
use pulpdeploy_protocol::names::{distribution_name, split_distribution};
use pulpdeploy_protocol::{
    Distribution, PackageDetails, ProgressReport, Publication, RepoDetails, Repository,
    TaskHandle, TaskQuery,
};
use pulpdeploy_transfer::{UploadConfig, Uploader, file_sha256};
use tracing::{debug, info};

use crate::error::PublishError;
use crate::types::{ActiveDistribution, AddedPackage, Distributed, Released, SyncOutcome};

/// Runs the publish workflows against one server.
pub struct Publisher<'a> {
    client: &'a PulpClient,
    upload: UploadConfig,
    poll_interval: Duration,
}

impl<'a> Publisher<'a> {
    pub fn new(client: &'a PulpClient) -> Self {
        Self {
            client,
            upload: UploadConfig::default(),
            poll_interval: TASK_POLL_INTERVAL,
        }
    }

    /// Overrides chunk size, worker count and chunk timeout of uploads. The
    /// commit task is polled at the publisher's interval.
    pub fn with_upload_config(mut self, config: UploadConfig) -> Self {
        self.upload = config;
        self
    }

    /// Overrides the interval between two task state fetches.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn run_task(&self, handle: TaskHandle) -> Result<TaskQuery, PublishError> {
        let task = TaskPoller::new(self.client)
            .with_interval(self.poll_interval)
            .wait(&handle)
            .await?;
        Ok(task)
    }

    /// Fails unless the server answers the status probe with 200.
    pub async fn ensure_online(&self) -> Result<(), PublishError> {
        let status = self.client.status().await?;
        debug!(status, "Pulp API status check");
        if status != 200 {
            return Err(PublishError::Offline(status));
        }
        Ok(())
    }

    /// Looks up a repository by its exact name.
    pub async fn repository(&self, name: &str) -> Result<Repository, PublishError> {
        self.client
            .repository_by_name(name)
            .await?
            .into_first()
            .ok_or_else(|| PublishError::RepositoryNotFound(name.to_string()))
    }

    pub async fn repository_names(&self) -> Result<Vec<String>, PublishError> {
        let repos = self.client.repositories().await?;
        Ok(repos.into_iter().map(|r| r.name).collect())
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    /// Uploads an RPM file and adds it to the latest version of `repo_name`.
    ///
    /// A file whose SHA-256 the server already stores is refused before
    /// anything is uploaded.
    pub async fn add_package(
        &self,
        repo_name: &str,
        path: &Path,
    ) -> Result<AddedPackage, PublishError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| n.ends_with(".rpm"))
            .ok_or_else(|| PublishError::NotRpm(path.display().to_string()))?;

        let repo = self.repository(repo_name).await?;
        let size = tokio::fs::metadata(path).await?.len();

        let sha256 = file_sha256(path).await?;
        if self.client.artifacts_by_sha256(&sha256).await?.count > 0 {
            return Err(PublishError::PackageExists(file_name.to_string()));
        }

        let upload = UploadConfig {
            poll_interval: self.poll_interval,
            ..self.upload
        };
        let outcome = Uploader::new(self.client, upload).upload(path, size).await?;
        info!(artifact = %outcome.artifact.pulp_href, package = file_name, "artifact created");

        let handle = self
            .client
            .create_package(&outcome.artifact.pulp_href, file_name)
            .await?;
        let task = self.run_task(handle).await?;
        if task.created_resources.is_empty() {
            return Err(ApiError::NoCreatedResource(task.pulp_href).into());
        }
        let content = task.created_resources;

        let change = ModifyContent {
            add_content_units: content.clone(),
            ..ModifyContent::default()
        };
        let handle = self
            .client
            .modify_repository(&repo.pulp_href, &change)
            .await?;
        self.run_task(handle).await?;
        info!(repo = repo_name, package = file_name, "content added to repository");

        Ok(AddedPackage {
            artifact: outcome.artifact,
            content,
            chunked: outcome.chunked,
        })
    }

    /// Removes the package named by `file_name` from the latest version of
    /// `repo_name`.
    pub async fn remove_package(&self, repo_name: &str, file_name: &str) -> Result<(), PublishError> {
        let package = PackageDetails::parse(file_name)?;
        let content = self
            .client
            .package_content(&package)
            .await?
            .into_first()
            .ok_or_else(|| PublishError::ContentNotFound(file_name.to_string()))?;

        let repo = self.repository(repo_name).await?;
        let version = latest_version(&repo)?;
        if !self
            .client
            .package_in_version(version, &content.pkg_id)
            .await?
        {
            return Err(PublishError::NotInRepository {
                package: file_name.to_string(),
                repo: repo_name.to_string(),
            });
        }

        let change = ModifyContent {
            remove_content_units: vec![content.pulp_href],
            ..ModifyContent::default()
        };
        let handle = self
            .client
            .modify_repository(&repo.pulp_href, &change)
            .await?;
        self.run_task(handle).await?;
        info!(repo = repo_name, package = file_name, "content removed from repository");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Publications and distributions
    // -----------------------------------------------------------------------

    /// Publishes the latest version of `repo_name` and returns the href of
    /// the new publication.
    pub async fn publish(&self, repo_name: &str) -> Result<String, PublishError> {
        let repo = self.repository(repo_name).await?;
        let version = latest_version(&repo)?;

        if self.client.publications_for_version(version).await?.count > 0 {
            return Err(PublishError::PublicationExists(repo_name.to_string()));
        }

        let handle = self.client.create_publication(version).await?;
        let task = self.run_task(handle).await?;
        let publication = task
            .created_resources
            .into_iter()
            .next()
            .ok_or(ApiError::NoCreatedResource(task.pulp_href))?;
        info!(repo = repo_name, %publication, "repository publication created");
        Ok(publication)
    }

    /// Points the distributions of `repo_name` at `publication`.
    ///
    /// Once the default environment distribution exists only that one is
    /// moved; the other environments change through
    /// [`set_version`](Self::set_version). A repository without any
    /// distribution gets one per environment.
    pub async fn distribute(
        &self,
        repo_name: &str,
        publication: &str,
    ) -> Result<Distributed, PublishError> {
        let details = RepoDetails::parse(repo_name)?;
        let spec_for = |environment: &str| DistributionSpec {
            base_path: details.base_path(environment),
            content_guard: None,
            name: distribution_name(repo_name, environment),
            publication: publication.to_string(),
        };

        let default_env = default_environment();
        let default_name = distribution_name(repo_name, default_env);
        if let Some(existing) = self
            .client
            .distribution_by_name(&default_name)
            .await?
            .into_first()
        {
            let handle = self
                .client
                .update_distribution(&existing.pulp_href, &spec_for(default_env))
                .await?;
            self.run_task(handle).await?;
            info!(distribution = %default_name, "default repository distribution updated");
            return Ok(Distributed::Updated {
                distribution: default_name,
            });
        }

        let mut distributions = Vec::with_capacity(ENVIRONMENTS.len());
        for environment in ENVIRONMENTS {
            let spec = spec_for(environment);
            let handle = self.client.create_distribution(&spec).await?;
            self.run_task(handle).await?;
            info!(distribution = %spec.name, base_path = %spec.base_path, "repository distribution created");
            distributions.push(spec.name);
        }
        Ok(Distributed::Created { distributions })
    }

    /// Publishes the latest version of `repo_name` and distributes it.
    pub async fn release(&self, repo_name: &str) -> Result<Released, PublishError> {
        let publication = self.publish(repo_name).await?;
        let distributed = self.distribute(repo_name, &publication).await?;
        Ok(Released {
            publication,
            distributed,
        })
    }

    /// Publications built from versions of `repo_name`, in server order.
    pub async fn publications(&self, repo_name: &str) -> Result<Vec<Publication>, PublishError> {
        let repo = self.repository(repo_name).await?;
        let publications = self.client.publications().await?;
        Ok(publications
            .into_iter()
            .filter(|p| p.repository_version.starts_with(&repo.pulp_href))
            .collect())
    }

    async fn publication_by_version(
        &self,
        repo_name: &str,
        version: u64,
    ) -> Result<Publication, PublishError> {
        self.publications(repo_name)
            .await?
            .into_iter()
            .find(|p| p.version() == Some(version))
            .ok_or_else(|| PublishError::PublicationNotFound {
                repo: repo_name.to_string(),
                version,
            })
    }

    /// Existing environment distributions of `repo_name`.
    async fn environment_distributions(
        &self,
        repo_name: &str,
    ) -> Result<Vec<(&'static str, Distribution)>, PublishError> {
        let mut found = Vec::with_capacity(ENVIRONMENTS.len());
        for environment in ENVIRONMENTS {
            let name = distribution_name(repo_name, environment);
            match self.client.distribution_by_name(&name).await?.into_first() {
                Some(distribution) => found.push((environment, distribution)),
                None => debug!(distribution = %name, "distribution not found"),
            }
        }
        Ok(found)
    }

    /// The publication each environment distribution of `repo_name` serves.
    pub async fn active_distributions(
        &self,
        repo_name: &str,
    ) -> Result<Vec<ActiveDistribution>, PublishError> {
        let publications = self.publications(repo_name).await?;
        let active = self
            .environment_distributions(repo_name)
            .await?
            .into_iter()
            .map(|(environment, distribution)| {
                let publication = distribution
                    .publication
                    .as_deref()
                    .and_then(|href| publications.iter().find(|p| p.pulp_href == href))
                    .cloned();
                ActiveDistribution {
                    environment,
                    distribution,
                    publication,
                }
            })
            .collect();
        Ok(active)
    }

    /// Deletes the publication of repository version `version`.
    ///
    /// A publication still served by one of the environment distributions
    /// is refused.
    pub async fn delete_publication(
        &self,
        repo_name: &str,
        version: u64,
    ) -> Result<Publication, PublishError> {
        let publication = self.publication_by_version(repo_name, version).await?;

        for (_, distribution) in self.environment_distributions(repo_name).await? {
            if distribution.publication.as_deref() == Some(publication.pulp_href.as_str()) {
                return Err(PublishError::PublicationInUse {
                    version,
                    distribution: distribution.name,
                });
            }
        }

        self.client.delete_publication(&publication.pulp_href).await?;
        info!(repo = repo_name, version, publication = %publication.pulp_href, "publication deleted");
        Ok(publication)
    }

    /// Points distribution `dist_name` (`<repository>-<environment>`) at the
    /// publication of repository version `version`.
    pub async fn set_version(&self, dist_name: &str, version: u64) -> Result<(), PublishError> {
        let (repo_name, environment) = split_distribution(dist_name)?;
        let details = RepoDetails::parse(repo_name)?;

        let publication = self.publication_by_version(repo_name, version).await?;
        let distribution = self
            .client
            .distribution_by_name(dist_name)
            .await?
            .into_first()
            .ok_or_else(|| PublishError::DistributionNotFound(dist_name.to_string()))?;

        let spec = DistributionSpec {
            base_path: details.base_path(environment),
            content_guard: None,
            name: dist_name.to_string(),
            publication: publication.pulp_href,
        };
        let handle = self
            .client
            .update_distribution(&distribution.pulp_href, &spec)
            .await?;
        self.run_task(handle).await?;
        info!(distribution = dist_name, version, "distribution set to version");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Syncs `repo_name` with its remote, then publishes and distributes
    /// the resulting version.
    pub async fn sync(&self, repo_name: &str) -> Result<SyncOutcome, PublishError> {
        let repo = self.repository(repo_name).await?;
        if repo.remote.as_deref().is_none_or(str::is_empty) {
            return Err(PublishError::NoRemote(repo_name.to_string()));
        }

        let handle = self.client.sync_repository(&repo.pulp_href).await?;
        self.run_task(handle).await?;
        info!(repo = repo_name, "repository synced with remote");

        match self.release(repo_name).await {
            Ok(released) => Ok(SyncOutcome::Released(released)),
            // An unchanged remote leaves the latest version as it was.
            Err(PublishError::PublicationExists(_)) => Ok(SyncOutcome::AlreadyInSync),
            Err(e) => Err(e),
        }
    }

    /// Deletes orphaned content and artifacts and returns the progress
    /// reports of the cleanup task.
    pub async fn clean(&self) -> Result<Vec<ProgressReport>, PublishError> {
        let handle = self.client.delete_orphans().await?;
        let task = self.run_task(handle).await?;
        Ok(task.progress_reports)
    }
}

fn latest_version(repo: &Repository) -> Result<&str, PublishError> {
    repo.latest_version_href
        .as_deref()
        .ok_or_else(|| PublishError::NoRepositoryVersion(repo.name.clone()))
}
