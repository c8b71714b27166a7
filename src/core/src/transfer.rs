//! HTTP client for the artifact service.
//!
//! Uploads stream the archive from disk inside a multipart body; downloads
//! stream the response body to disk. Neither buffers the whole archive.

use std::path::Path;

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, StatusCode};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::catalog::{CatalogResponse, PipeCatalog};
use crate::config::{validate_server_url, StageTimeouts};
use crate::error::{PipeError, Result};
use crate::manifest::{EnvironmentSchema, Manifest};
use crate::progress::{ProgressSession, SharedProgress, TransferState};
use crate::reference::ArtifactReference;

/// Outcome of an upload. Upload failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub success: bool,
    pub error: Option<String>,
}

impl UploadResult {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Result of asking the server for a package archive.
pub enum Download {
    /// Package exists; the body has not been read yet.
    Stream(PackageStream),
    /// Server answered 404.
    NotFound,
}

/// An open download response body.
pub struct PackageStream {
    response: Response,
}

impl PackageStream {
    /// Size announced by the server, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Stream the body into `dest`, reporting progress per chunk.
    ///
    /// Fails if the server declared a length and a different number of bytes
    /// arrived. The caller owns `dest` and removes it on failure.
    pub async fn write_to(self, dest: &Path, progress: SharedProgress) -> Result<u64> {
        let declared = self.content_length();
        let session = ProgressSession::start(progress, declared.unwrap_or(0));
        let mut state = TransferState::new(declared.unwrap_or(0));

        let mut file = tokio::fs::File::create(dest).await?;
        let mut body = self.response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| PipeError::Transfer(format!("Download interrupted: {e}")))?;
            file.write_all(&chunk).await?;
            state.advance(chunk.len() as u64);
            session.update(&state);
        }
        file.flush().await?;
        session.finish();

        if let Some(expected) = declared {
            if state.transferred_bytes != expected {
                return Err(PipeError::Transfer(format!(
                    "Download incomplete: received {} of {} bytes",
                    state.transferred_bytes, expected
                )));
            }
        }

        tracing::debug!(path = %dest.display(), bytes = state.transferred_bytes, "Download complete");
        Ok(state.transferred_bytes)
    }
}

/// Client for the artifact service HTTP contract.
pub struct TransferClient {
    http: Client,
    base_url: String,
    timeouts: StageTimeouts,
}

impl TransferClient {
    /// Create a client for `server_url`, rejecting anything but http(s).
    pub fn new(server_url: &str, timeouts: StageTimeouts) -> Result<Self> {
        let base_url = validate_server_url(server_url)?;
        let http = Client::builder()
            .build()
            .map_err(|e| PipeError::Transfer(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            timeouts,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload `archive` with the manifest metadata to `POST /pipes`.
    ///
    /// A single attempt; only HTTP 201 counts as success. Never returns `Err`.
    pub async fn upload(
        &self,
        manifest: &Manifest,
        archive: &Path,
        progress: SharedProgress,
    ) -> UploadResult {
        match self.try_upload(manifest, archive, progress).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Upload failed");
                UploadResult::failed(e.to_string())
            }
        }
    }

    async fn try_upload(
        &self,
        manifest: &Manifest,
        archive: &Path,
        progress: SharedProgress,
    ) -> Result<UploadResult> {
        let file = tokio::fs::File::open(archive).await?;
        let total = file.metadata().await?.len();

        let session = ProgressSession::start(progress, total);
        let sink = session.sink();
        let mut state = TransferState::new(total);
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                state.advance(bytes.len() as u64);
                sink.update(state.transferred_bytes);
            }
            chunk
        });

        let file_part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(manifest.archive_file_name())
            .mime_str("application/x-tar")?;

        let form = Form::new()
            .text("name", manifest.name.clone())
            .text("version", manifest.version.clone())
            .text("description", manifest.description.clone())
            .text("envSchema", serde_json::to_string(&manifest.env_schema)?)
            .part("file", file_part);

        let url = format!("{}/pipes", self.base_url);
        tracing::debug!(%url, bytes = total, "Uploading archive");

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .timeout(self.timeouts.upload())
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        session.finish();

        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(UploadResult::ok());
        }

        let message = server_error_message(response).await;
        Ok(UploadResult::failed(
            PipeError::ServerError {
                status: status.as_u16(),
                message,
            }
            .to_string(),
        ))
    }

    /// `GET /pipes/{name}/download/{version}`.
    ///
    /// Only locating the package is bounded by the locate timeout; reading the
    /// body afterwards is not.
    pub async fn download(&self, reference: &ArtifactReference) -> Result<Download> {
        let url = format!(
            "{}/pipes/{}/download/{}",
            self.base_url, reference.name, reference.version
        );
        tracing::debug!(%url, "Locating package");

        let timeout = self.timeouts.locate();
        let response = tokio::time::timeout(timeout, self.http.get(&url).send())
            .await
            .map_err(|_| {
                PipeError::Timeout(format!(
                    "Server did not respond within {}s",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| self.request_error(e))?;

        match response.status() {
            StatusCode::OK => Ok(Download::Stream(PackageStream { response })),
            StatusCode::NOT_FOUND => Ok(Download::NotFound),
            status => Err(PipeError::ServerError {
                status: status.as_u16(),
                message: server_error_message(response).await,
            }),
        }
    }

    /// `GET /versions/{name}/env-schema/{version}`.
    ///
    /// `Ok(None)` when the server answers but has no schema for this version.
    pub async fn fetch_env_schema(
        &self,
        reference: &ArtifactReference,
    ) -> Result<Option<EnvironmentSchema>> {
        let url = format!(
            "{}/versions/{}/env-schema/{}",
            self.base_url, reference.name, reference.version
        );
        tracing::debug!(%url, "Fetching environment schema");

        let response = self
            .http
            .get(&url)
            .timeout(self.timeouts.env_schema())
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(PipeError::ServerError {
                status: status.as_u16(),
                message: server_error_message(response).await,
            });
        }

        let body: serde_json::Value = response.json().await?;
        match body.get("data") {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(data) => Ok(Some(serde_json::from_value(data.clone())?)),
        }
    }

    /// `GET /pipes?includeVersions=true`. `Ok(None)` on 404.
    pub async fn list_pipes(&self) -> Result<Option<PipeCatalog>> {
        let url = format!("{}/pipes?includeVersions=true", self.base_url);
        tracing::debug!(%url, "Listing pipes");

        let response = self
            .http
            .get(&url)
            .timeout(self.timeouts.list())
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status != StatusCode::OK {
            return Err(PipeError::ServerError {
                status: status.as_u16(),
                message: server_error_message(response).await,
            });
        }

        let body: CatalogResponse = response.json().await?;
        match (body.success, body.data) {
            (true, Some(catalog)) => Ok(Some(catalog)),
            _ => Err(PipeError::ServerError {
                status: status.as_u16(),
                message: body.error,
            }),
        }
    }

    fn request_error(&self, e: reqwest::Error) -> PipeError {
        if e.is_timeout() {
            PipeError::Timeout("Request timed out. Server may be slow to respond.".to_string())
        } else if e.is_connect() {
            PipeError::Transfer(format!("Could not connect to server at {}", self.base_url))
        } else {
            PipeError::from(e)
        }
    }
}

/// Extract `error` (or `message`) from a JSON error body, if present.
async fn server_error_message(response: Response) -> Option<String> {
    let text = response.text().await.ok()?;
    let value: serde_json::Value = serde_json::from_str(&text).ok()?;
    value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
