//! Resource calls of the Pulp RPM plugin API.

use std::path::Path;

use pulpdeploy_protocol::constants::{STATUS_PATH, UPLOAD_REQUEST_TIMEOUT, api_path};
use pulpdeploy_protocol::messages::{
    CreatePackage, CreatePublication, DistributionSpec, ModifyContent, SyncRequest,
};
use pulpdeploy_protocol::{
    Artifact, Distribution, PackageContent, PackageDetails, Page, Publication, Repository,
    TaskHandle, UploadCommit, UploadSession, UploadStart,
};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::PulpClient;
use crate::error::ApiError;

const REPOSITORIES: &str = "repositories/rpm/rpm/";
const PUBLICATIONS: &str = "publications/rpm/rpm/";
const DISTRIBUTIONS: &str = "distributions/rpm/rpm/";
const PACKAGES: &str = "content/rpm/packages/";
const ARTIFACTS: &str = "artifacts/";
const UPLOADS: &str = "uploads/";
const ORPHANS: &str = "orphans/";

impl PulpClient {
    // -----------------------------------------------------------------------
    // Server
    // -----------------------------------------------------------------------

    /// Probes the server with the configured credentials and returns the HTTP
    /// status. Anything but 200 means the server or the credentials are bad.
    pub async fn status(&self) -> Result<u16, ApiError> {
        let resp = self.request(Method::GET, STATUS_PATH).send().await?;
        Ok(resp.status().as_u16())
    }

    /// Deletes every orphaned content unit and artifact.
    pub async fn delete_orphans(&self) -> Result<TaskHandle, ApiError> {
        let body = self.delete(&api_path(ORPHANS), 202).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    /// Fetches `href` and every following page.
    pub async fn all_pages<T: DeserializeOwned>(&self, href: &str) -> Result<Vec<T>, ApiError> {
        let mut results = Vec::new();
        let mut next = Some(href.to_string());
        while let Some(href) = next {
            let page: Page<T> = self.get(&href).await?;
            debug!(%href, count = page.count, "fetched page");
            results.extend(page.results);
            next = page.next;
        }
        Ok(results)
    }

    pub async fn repositories(&self) -> Result<Vec<Repository>, ApiError> {
        self.all_pages(&api_path(REPOSITORIES)).await
    }

    pub async fn repository_by_name(&self, name: &str) -> Result<Page<Repository>, ApiError> {
        let req = self
            .request(Method::GET, &api_path(REPOSITORIES))
            .query(&[("name", name)]);
        let body = self.execute(req, 200).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn publications(&self) -> Result<Vec<Publication>, ApiError> {
        self.all_pages(&api_path(PUBLICATIONS)).await
    }

    /// Publications built from one repository version.
    pub async fn publications_for_version(
        &self,
        version_href: &str,
    ) -> Result<Page<Publication>, ApiError> {
        let req = self
            .request(Method::GET, &api_path(PUBLICATIONS))
            .query(&[("repository_version", version_href)]);
        let body = self.execute(req, 200).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn distribution_by_name(&self, name: &str) -> Result<Page<Distribution>, ApiError> {
        let req = self
            .request(Method::GET, &api_path(DISTRIBUTIONS))
            .query(&[("name", name)]);
        let body = self.execute(req, 200).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Looks up a package content unit by its NEVRA parts.
    pub async fn package_content(
        &self,
        package: &PackageDetails,
    ) -> Result<Page<PackageContent>, ApiError> {
        let req = self.request(Method::GET, &api_path(PACKAGES)).query(&[
            ("name", package.name.as_str()),
            ("version", package.version.as_str()),
            ("release", package.release.as_str()),
            ("arch", package.arch.as_str()),
        ]);
        let body = self.execute(req, 200).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Returns `true` if the content unit with `pkg_id` is part of the
    /// repository version.
    pub async fn package_in_version(
        &self,
        version_href: &str,
        pkg_id: &str,
    ) -> Result<bool, ApiError> {
        let req = self
            .request(Method::GET, &api_path(PACKAGES))
            .query(&[("repository_version", version_href), ("pkgId", pkg_id)]);
        let body = self.execute(req, 200).await?;
        let page: Page<PackageContent> = serde_json::from_slice(&body)?;
        Ok(page.count > 0)
    }

    // -----------------------------------------------------------------------
    // Artifacts and uploads
    // -----------------------------------------------------------------------

    pub async fn artifacts_by_sha256(&self, sha256: &str) -> Result<Page<Artifact>, ApiError> {
        let req = self
            .request(Method::GET, &api_path(ARTIFACTS))
            .query(&[("sha256", sha256)]);
        let body = self.execute(req, 200).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn artifact(&self, href: &str) -> Result<Artifact, ApiError> {
        self.get(href).await
    }

    /// Uploads a whole file in one multipart request.
    pub async fn create_artifact(&self, path: &Path) -> Result<Artifact, ApiError> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        debug!(file = %file_name, size = data.len(), "direct upload");

        let form = Form::new().part("file", Part::bytes(data).file_name(file_name));
        let req = self
            .request(Method::POST, &api_path(ARTIFACTS))
            .timeout(UPLOAD_REQUEST_TIMEOUT)
            .multipart(form);
        let body = self.execute(req, 201).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Opens an upload session of `size` bytes.
    pub async fn init_upload(&self, size: u64) -> Result<UploadSession, ApiError> {
        self.send_json(Method::POST, &api_path(UPLOADS), &UploadStart { size }, 201)
            .await
    }

    /// Commits an upload session; the task creates the artifact.
    pub async fn commit_upload(
        &self,
        session_href: &str,
        sha256: &str,
    ) -> Result<TaskHandle, ApiError> {
        let commit = UploadCommit {
            sha256: sha256.to_string(),
        };
        self.submit(Method::POST, &format!("{session_href}commit/"), &commit)
            .await
    }

    /// Deletes an upload session and its staged chunks.
    pub async fn abort_upload(&self, session_href: &str) -> Result<(), ApiError> {
        self.delete(session_href, 204).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Content, repositories, publications, distributions
    // -----------------------------------------------------------------------

    pub async fn create_package(
        &self,
        artifact_href: &str,
        relative_path: &str,
    ) -> Result<TaskHandle, ApiError> {
        let body = CreatePackage {
            artifact: artifact_href.to_string(),
            relative_path: relative_path.to_string(),
        };
        self.submit(Method::POST, &api_path(PACKAGES), &body).await
    }

    pub async fn modify_repository(
        &self,
        repo_href: &str,
        change: &ModifyContent,
    ) -> Result<TaskHandle, ApiError> {
        self.submit(Method::POST, &format!("{repo_href}modify/"), change)
            .await
    }

    pub async fn sync_repository(&self, repo_href: &str) -> Result<TaskHandle, ApiError> {
        self.submit(
            Method::POST,
            &format!("{repo_href}sync/"),
            &SyncRequest::default(),
        )
        .await
    }

    pub async fn create_publication(&self, version_href: &str) -> Result<TaskHandle, ApiError> {
        let body = CreatePublication {
            repository_version: version_href.to_string(),
        };
        self.submit(Method::POST, &api_path(PUBLICATIONS), &body)
            .await
    }

    pub async fn delete_publication(&self, href: &str) -> Result<(), ApiError> {
        self.delete(href, 204).await?;
        Ok(())
    }

    pub async fn create_distribution(
        &self,
        spec: &DistributionSpec,
    ) -> Result<TaskHandle, ApiError> {
        self.submit(Method::POST, &api_path(DISTRIBUTIONS), spec)
            .await
    }

    pub async fn update_distribution(
        &self,
        href: &str,
        spec: &DistributionSpec,
    ) -> Result<TaskHandle, ApiError> {
        self.submit(Method::PATCH, href, spec).await
    }
}
