use std::time::Duration;

use reqwest::{Client, Response};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::error::ServiceError;
use super::types::{ExportStarted, ExportStatus, InlineExportRequest};
use crate::config::{Credentials, ExportConfig, ExportScheme};

const API_PREFIX: &str = "rest/scroll-html/1.0";

/// The three operations the pipeline needs from the remote export service.
pub trait ExportService {
    /// Start an export of the space rooted at `root_page_id`; returns the job id.
    async fn start_export(
        &self,
        root_page_id: &str,
        scheme: &ExportScheme,
    ) -> Result<String, ServiceError>;

    /// Fetch the current status of a running job.
    async fn check_status(&self, job_id: &str) -> Result<ExportStatus, ServiceError>;

    /// Stream the finished artifact into `sink`; returns the number of bytes written.
    async fn download_artifact<W>(
        &self,
        job_id: &str,
        filename: &str,
        sink: &mut W,
    ) -> Result<u64, ServiceError>
    where
        W: AsyncWrite + Unpin + Send;
}

pub struct ExportClient {
    credentials: Credentials,
    client: Client,
    base_url: String,
    // Whole-request bound for start and status calls.
    request_timeout: Duration,
}

impl ExportClient {
    pub fn new(config: &ExportConfig) -> Result<Self, ServiceError> {
        // Downloads only get a read timeout so large archives are not cut off.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(config.request_timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self {
            credentials: config.credentials.clone(),
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{API_PREFIX}/{path}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header("x-atlassian-token", "no-check")
    }

    async fn checked(response: Response) -> Result<Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        Err(ServiceError::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}

impl ExportService for ExportClient {
    async fn start_export(
        &self,
        root_page_id: &str,
        scheme: &ExportScheme,
    ) -> Result<String, ServiceError> {
        let url = self.endpoint("export");
        let request = match scheme {
            ExportScheme::SchemeId(scheme_id) => self.client.get(&url).query(&[
                ("exportSchemeId", scheme_id.as_str()),
                ("rootPageId", root_page_id),
            ]),
            ExportScheme::Settings(settings) => self.client.post(&url).json(&InlineExportRequest {
                root_page_id: root_page_id.to_string(),
                export_settings: settings.clone(),
            }),
        };

        let request = self.authorize(request).timeout(self.request_timeout);
        let response = Self::checked(request.send().await?).await?;
        let started = response.json::<ExportStarted>().await?;
        if started.id.is_empty() {
            return Err(ServiceError::MissingJobId);
        }
        Ok(started.id)
    }

    async fn check_status(&self, job_id: &str) -> Result<ExportStatus, ServiceError> {
        let url = self.endpoint(&format!("async-tasks/{job_id}"));
        let request = self.authorize(self.client.get(&url)).timeout(self.request_timeout);
        let response = Self::checked(request.send().await?).await?;
        Ok(response.json::<ExportStatus>().await?)
    }

    async fn download_artifact<W>(
        &self,
        job_id: &str,
        filename: &str,
        sink: &mut W,
    ) -> Result<u64, ServiceError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let url = self.endpoint(&format!(
            "export/{job_id}/{}",
            urlencoding::encode(filename)
        ));
        debug!(%url, "downloading export artifact");

        let mut response =
            Self::checked(self.authorize(self.client.get(&url)).send().await?).await?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;
        Ok(written)
    }
}
