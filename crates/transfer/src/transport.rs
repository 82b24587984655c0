use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use pulpdeploy_api::{PulpClient, expect_status};
use reqwest::Method;
use reqwest::header::CONTENT_RANGE;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::TransferError;
use crate::plan::ByteRange;

/// Future returned by [`ChunkConnection::put_chunk`].
pub type PutChunkFuture<'a> = Pin<Box<dyn Future<Output = Result<u64, TransferError>> + Send + 'a>>;

/// Opens one connection per chunk worker.
pub trait ChunkTransport: Send + Sync {
    fn connect(&self) -> Result<Box<dyn ChunkConnection>, TransferError>;
}

/// A worker-owned connection to the upload session.
pub trait ChunkConnection: Send {
    /// Uploads `data` as `range` of the session and returns the number of
    /// bytes attached to the request body.
    ///
    /// A payload whose length differs from `range.len` is refused with
    /// [`TransferError::ByteCountMismatch`] before anything is sent.
    fn put_chunk<'a>(
        &'a mut self,
        session_href: &'a str,
        range: ByteRange,
        data: Vec<u8>,
    ) -> PutChunkFuture<'a>;
}

/// Sends chunks to a Pulp server, one HTTP client per worker.
#[derive(Debug, Clone)]
pub struct HttpChunkTransport {
    client: PulpClient,
    timeout: Duration,
}

impl HttpChunkTransport {
    /// Uses the server and credentials of `client` with a per-request
    /// `timeout` suited to chunk-sized bodies.
    pub fn new(client: &PulpClient, timeout: Duration) -> Self {
        Self {
            client: client.clone(),
            timeout,
        }
    }
}

impl ChunkTransport for HttpChunkTransport {
    fn connect(&self) -> Result<Box<dyn ChunkConnection>, TransferError> {
        // A fresh client means a fresh connection pool, so workers never
        // share a socket.
        let config = self.client.config().clone().with_timeout(self.timeout);
        let client = PulpClient::new(config)?;
        Ok(Box::new(HttpChunkConnection { client }))
    }
}

struct HttpChunkConnection {
    client: PulpClient,
}

impl ChunkConnection for HttpChunkConnection {
    fn put_chunk<'a>(
        &'a mut self,
        session_href: &'a str,
        range: ByteRange,
        data: Vec<u8>,
    ) -> PutChunkFuture<'a> {
        Box::pin(async move {
            let attached = data.len() as u64;
            if attached != range.len {
                return Err(TransferError::ByteCountMismatch {
                    offset: range.start,
                    read: attached,
                    sent: range.len,
                });
            }
            let part = Part::bytes(data).file_name(format!("chunk_offset_{}", range.start));
            let form = Form::new().part("file", part);

            let req = self
                .client
                .request(Method::PUT, session_href)
                .header(CONTENT_RANGE, range.content_range())
                .multipart(form);
            let resp = req.send().await.map_err(pulpdeploy_api::ApiError::from)?;
            expect_status(resp, 200).await?;

            debug!(chunk = %range, bytes = attached, "chunk accepted");
            Ok(attached)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::PUT;
    use httpmock::MockServer;
    use pulpdeploy_api::ClientConfig;

    use crate::plan::ChunkPlan;

    const SESSION: &str = "/pulp/api/v3/uploads/u1/";

    fn transport(server: &MockServer) -> HttpChunkTransport {
        let client = PulpClient::new(ClientConfig::new(server.base_url(), "admin", "pw")).unwrap();
        HttpChunkTransport::new(&client, Duration::from_secs(30))
    }

    #[tokio::test]
    async fn put_chunk_sends_range_and_part() {
        let server = MockServer::start_async().await;
        let chunk = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path(SESSION)
                    .header("content-range", "bytes 10-19/25")
                    .header_exists("authorization")
                    .body_contains("name=\"file\"")
                    .body_contains("filename=\"chunk_offset_10\"")
                    .body_contains("0123456789");
                then.status(200).body("{}");
            })
            .await;

        let plan = ChunkPlan::new(25, 10).unwrap();
        let mut conn = transport(&server).connect().unwrap();
        let sent = conn
            .put_chunk(SESSION, plan.range(10), b"0123456789".to_vec())
            .await
            .unwrap();
        assert_eq!(sent, 10);
        chunk.assert_async().await;
    }

    #[tokio::test]
    async fn non_200_is_protocol_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path(SESSION);
                then.status(500).body("oops");
            })
            .await;

        let plan = ChunkPlan::new(4, 10).unwrap();
        let err = transport(&server)
            .connect()
            .unwrap()
            .put_chunk(SESSION, plan.range(0), b"abcd".to_vec())
            .await
            .unwrap_err();
        match err {
            TransferError::Api(e) => {
                assert_eq!(e.status(), Some(500));
                assert!(e.to_string().contains("oops"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn payload_shorter_than_range_is_not_sent() {
        let server = MockServer::start_async().await;
        let chunk = server
            .mock_async(|when, then| {
                when.method(PUT).path(SESSION);
                then.status(200).body("{}");
            })
            .await;

        let plan = ChunkPlan::new(25, 10).unwrap();
        let err = transport(&server)
            .connect()
            .unwrap()
            .put_chunk(SESSION, plan.range(10), b"0123".to_vec())
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                TransferError::ByteCountMismatch {
                    offset: 10,
                    read: 4,
                    sent: 10
                }
            ),
            "{err}"
        );
        chunk.assert_hits_async(0).await;
    }
}
