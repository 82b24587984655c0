//! Upload session manager.
//!
//! Decides between a direct upload and a chunked one, drives the chunk pool
//! inside a server-side upload session, and commits or aborts the session.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use pulpdeploy_api::{ApiError, PulpClient, TaskPoller};
use pulpdeploy_protocol::{Artifact, TaskHandle, TaskQuery, UploadSession};
use tracing::{error, info, warn};

use crate::checksum::file_sha256;
use crate::plan::ChunkPlan;
use crate::pool::{ChunkPool, PoolReport};
use crate::source::LocalFile;
use crate::transport::{ChunkTransport, HttpChunkTransport};
use crate::{TransferError, UploadConfig};

/// Future returned by [`UploadApi`] calls.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Server calls needed to upload a file.
///
/// Implemented by [`PulpClient`]; tests substitute scripted fakes.
pub trait UploadApi: Send + Sync {
    /// Single multipart upload of a whole file.
    fn create_artifact<'a>(&'a self, path: &'a Path) -> ApiFuture<'a, Artifact>;
    fn init_upload(&self, size: u64) -> ApiFuture<'_, UploadSession>;
    fn commit_upload<'a>(&'a self, session_href: &'a str, sha256: &'a str)
    -> ApiFuture<'a, TaskHandle>;
    fn abort_upload<'a>(&'a self, session_href: &'a str) -> ApiFuture<'a, ()>;
    /// Polls the task every `interval` until it reaches a final state.
    fn wait_for_task<'a>(
        &'a self,
        handle: &'a TaskHandle,
        interval: Duration,
    ) -> ApiFuture<'a, TaskQuery>;
    fn artifact<'a>(&'a self, href: &'a str) -> ApiFuture<'a, Artifact>;
    /// Transport handing out one connection per chunk worker.
    fn chunk_transport(&self, timeout: Duration) -> Arc<dyn ChunkTransport>;
}

impl UploadApi for PulpClient {
    fn create_artifact<'a>(&'a self, path: &'a Path) -> ApiFuture<'a, Artifact> {
        Box::pin(PulpClient::create_artifact(self, path))
    }

    fn init_upload(&self, size: u64) -> ApiFuture<'_, UploadSession> {
        Box::pin(PulpClient::init_upload(self, size))
    }

    fn commit_upload<'a>(
        &'a self,
        session_href: &'a str,
        sha256: &'a str,
    ) -> ApiFuture<'a, TaskHandle> {
        Box::pin(PulpClient::commit_upload(self, session_href, sha256))
    }

    fn abort_upload<'a>(&'a self, session_href: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(PulpClient::abort_upload(self, session_href))
    }

    fn wait_for_task<'a>(
        &'a self,
        handle: &'a TaskHandle,
        interval: Duration,
    ) -> ApiFuture<'a, TaskQuery> {
        Box::pin(async move {
            TaskPoller::new(self)
                .with_interval(interval)
                .wait(handle)
                .await
        })
    }

    fn artifact<'a>(&'a self, href: &'a str) -> ApiFuture<'a, Artifact> {
        Box::pin(PulpClient::artifact(self, href))
    }

    fn chunk_transport(&self, timeout: Duration) -> Arc<dyn ChunkTransport> {
        Arc::new(HttpChunkTransport::new(self, timeout))
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub artifact: Artifact,
    /// Chunk totals, `None` for a direct upload.
    pub chunked: Option<PoolReport>,
}

/// Uploads files and turns them into artifacts.
pub struct Uploader<'a> {
    api: &'a dyn UploadApi,
    config: UploadConfig,
}

impl<'a> Uploader<'a> {
    pub fn new(api: &'a dyn UploadApi, config: UploadConfig) -> Self {
        Self { api, config }
    }

    /// Uploads the file at `path`, whose size is `size` bytes.
    ///
    /// Files no larger than the chunk size go through a single multipart
    /// request. Larger files are uploaded in chunks and committed under the
    /// SHA-256 of the whole file; on any failure the session is aborted.
    pub async fn upload(&self, path: &Path, size: u64) -> Result<UploadOutcome, TransferError> {
        self.config.validate()?;

        if size <= self.config.chunk_size {
            info!(file = %path.display(), size, "uploading in a single request");
            let artifact = self.api.create_artifact(path).await?;
            return Ok(UploadOutcome {
                artifact,
                chunked: None,
            });
        }

        let session = self.api.init_upload(size).await?;
        info!(
            file = %path.display(),
            session = %session.pulp_href,
            size,
            chunk_size = self.config.chunk_size,
            workers = self.config.workers,
            "upload session created"
        );

        let report = match self.upload_chunks(&session.pulp_href, path, size).await {
            Ok(report) => report,
            Err(e) => return Err(self.abort(&session.pulp_href, e).await),
        };

        let task = match self.commit(&session.pulp_href, path).await {
            Ok(task) => task,
            Err(e) => return Err(self.abort(&session.pulp_href, e).await),
        };

        let href = task
            .created_resources
            .first()
            .ok_or_else(|| ApiError::NoCreatedResource(task.pulp_href.clone()))?;
        let artifact = self.api.artifact(href).await?;
        info!(artifact = %artifact.pulp_href, chunks = report.chunks, "upload committed");

        Ok(UploadOutcome {
            artifact,
            chunked: Some(report),
        })
    }

    async fn upload_chunks(
        &self,
        session_href: &str,
        path: &Path,
        size: u64,
    ) -> Result<PoolReport, TransferError> {
        let plan = ChunkPlan::new(size, self.config.chunk_size)?;
        let pool = ChunkPool::new(
            plan,
            self.config.workers,
            Arc::new(LocalFile::new(path)),
            self.api.chunk_transport(self.config.chunk_timeout),
        )?;
        pool.run(session_href).await
    }

    async fn commit(&self, session_href: &str, path: &Path) -> Result<TaskQuery, TransferError> {
        let sha256 = file_sha256(path).await?;
        let handle = self.api.commit_upload(session_href, &sha256).await?;
        info!(session = %session_href, task = %handle.task, %sha256, "upload commit submitted");
        Ok(self
            .api
            .wait_for_task(&handle, self.config.poll_interval)
            .await?)
    }

    /// Deletes the session after `original` failed the upload. An abort
    /// failure replaces the original error, which is logged first.
    async fn abort(&self, session_href: &str, original: TransferError) -> TransferError {
        match self.api.abort_upload(session_href).await {
            Ok(()) => {
                warn!(session = %session_href, error = %original, "upload aborted");
                original
            }
            Err(abort_err) => {
                error!(session = %session_href, error = %original, "upload failed");
                error!(session = %session_href, error = %abort_err, "could not abort upload session");
                abort_err.into()
            }
        }
    }
}
