//! Executing `HttpRequest`s against the network.
//!
//! `Transport` is the only seam between the sans-IO client and real I/O.
//! `HttpTransport` implements it on top of `reqwest`; tests can substitute
//! their own implementation.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{AdminError, Result};
use crate::http::{attachment_file_name, Download, HttpMethod, HttpRequest, HttpResponse, RequestBody};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one round trip and return the full response as data.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Perform one round trip whose body is a file attachment, streaming it
    /// into `dest_dir` under the name given by `Content-Disposition`.
    async fn download(&self, request: HttpRequest, dest_dir: &Path) -> Result<Download>;
}

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    timeout: Duration,
    user_agent: String,
    accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("convertigo-admin/", env!("CARGO_PKG_VERSION")).to_string(),
            accept_invalid_certs: false,
        }
    }
}

impl TransportConfig {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Allow self-signed server certificates.
    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }
}

/// `reqwest`-backed transport. Cheap to clone; clones share a pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| AdminError::Config(e.to_string()))?;
        Ok(Self { client })
    }

    fn prepare(&self, request: HttpRequest) -> RequestBuilder {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.path),
            HttpMethod::Post => self.client.post(&request.path),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Xml(document) => builder.header(CONTENT_TYPE, "text/xml; charset=utf-8").body(document),
            RequestBody::File { field, attachment } => {
                let part = Part::bytes(attachment.bytes).file_name(attachment.file_name);
                builder.multipart(Form::new().part(field, part))
            }
        }
    }

    async fn into_data(response: Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers = header_pairs(&response);
        let body = response.text().await?;
        debug!(status, bytes = body.len(), "received response");
        Ok(HttpResponse { status, headers, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = ?request.method, path = %request.path, "sending request");
        let response = self.prepare(request).send().await?;
        Self::into_data(response).await
    }

    async fn download(&self, request: HttpRequest, dest_dir: &Path) -> Result<Download> {
        debug!(path = %request.path, dest = %dest_dir.display(), "downloading");
        let response = self.prepare(request).send().await?;
        if !response.status().is_success() {
            return Ok(Download::Response(Self::into_data(response).await?));
        }

        let disposition = match response.headers().get(CONTENT_DISPOSITION) {
            Some(value) => value
                .to_str()
                .map_err(|_| AdminError::Attachment("Content-Disposition is not ASCII".to_string()))?
                .to_string(),
            None => return Ok(Download::Response(Self::into_data(response).await?)),
        };
        let file_name = attachment_file_name(&disposition)?;
        let path = dest_dir.join(&file_name);

        let file = tokio::fs::File::create(&path).await?;
        match save_body(response, file).await {
            Ok(written) => {
                debug!(file = %path.display(), bytes = written, "attachment saved");
                Ok(Download::Saved(path))
            }
            Err(err) => {
                if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                    warn!(file = %path.display(), error = %cleanup, "could not remove partial download");
                }
                Err(err)
            }
        }
    }
}

/// Stream the body into `file`, returning the bytes written.
async fn save_body(mut response: Response, mut file: tokio::fs::File) -> Result<usize> {
    let mut written = 0usize;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;
    Ok(written)
}

fn header_pairs(response: &Response) -> Vec<(String, String)> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect()
}
