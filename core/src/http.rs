//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe admin requests and responses as plain data.
//! `AdminClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network; a `Transport` executes them. Keeping the
//! boundary explicit lets every normalizer be tested against literal XML.

use std::path::{Path, PathBuf};

use crate::error::{AdminError, Result};

/// HTTP method for a request. The admin API only uses these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A file sent as the single part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an attachment from disk, keeping only the final path component
    /// as the uploaded file name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| AdminError::Attachment(format!("no file name in {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { file_name, bytes })
    }
}

/// Body of an `HttpRequest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    /// `application/x-www-form-urlencoded`. Repeating a key sends an array.
    Form(Vec<(String, String)>),
    /// Raw XML document.
    Xml(String),
    /// `multipart/form-data` with one file under `field`.
    File { field: String, attachment: Attachment },
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn post(path: String) -> Self {
        Self {
            method: HttpMethod::Post,
            path,
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: String) -> Self {
        Self {
            method: HttpMethod::Get,
            ..Self::post(path)
        }
    }

    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn xml(mut self, document: String) -> Self {
        self.body = RequestBody::Xml(document);
        self
    }

    pub fn file(mut self, attachment: Attachment) -> Self {
        self.body = RequestBody::File {
            field: "userfile".to_string(),
            attachment,
        };
        self
    }

    pub fn query<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query.extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach the session cookie, if any.
    pub fn with_cookie(mut self, cookie: Option<&str>) -> Self {
        if let Some(cookie) = cookie {
            self.headers.push(("cookie".to_string(), cookie.to_string()));
        }
        self
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All values of a header, matched case-insensitively.
    pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Session cookie assembled from every `Set-Cookie` header, keeping only
    /// the `name=value` pair of each and dropping attributes.
    pub fn session_cookie(&self) -> Option<String> {
        let pairs: Vec<&str> = self
            .headers_named("set-cookie")
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Result of `Transport::download`.
#[derive(Debug)]
pub enum Download {
    /// The body was an attachment and has been written to this path.
    Saved(PathBuf),
    /// No `Content-Disposition`; the body is returned for error reporting.
    Response(HttpResponse),
}

/// Recover the file name from a `Content-Disposition` header value such as
/// `attachment; filename="TestProject.car"`.
///
/// Names that would escape the destination directory are rejected.
pub fn attachment_file_name(content_disposition: &str) -> Result<String> {
    let name = content_disposition
        .split(';')
        .map(str::trim)
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim().eq_ignore_ascii_case("filename").then_some(value.trim())
        })
        .map(|value| value.trim_matches('"'))
        .ok_or_else(|| AdminError::Attachment(format!("no filename in {content_disposition:?}")))?;

    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(AdminError::Attachment(format!("unsafe file name {name:?}")));
    }
    Ok(name.to_string())
}
