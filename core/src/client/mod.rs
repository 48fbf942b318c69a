//! Stateless request builder and response normalizer for the admin API.
//!
//! # Design
//! `AdminClient` holds only a `base_url`. Each remote operation is split into
//! a `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse` and yields a typed result. Parsing goes
//! through the generic tree in `crate::xml`, which never escapes this module.
//!
//! Resource areas live in submodules, each adding an `impl AdminClient`.

mod certificates;
mod config;
mod engine;
mod keys;
mod projects;
mod roles;
mod symbols;

pub use keys::is_valid_key;

use crate::error::{AdminError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::types::Message;
use crate::xml::{parse_document, XmlNode};

const SERVICES_PATH: &str = "/admin/services";

/// Synchronous, stateless client for the admin API.
#[derive(Debug, Clone)]
pub struct AdminClient {
    base_url: String,
}

impl AdminClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of an admin service, e.g. `global_symbols.List`.
    fn endpoint(&self, service: &str) -> String {
        format!("{}{SERVICES_PATH}/{service}", self.base_url)
    }

    fn post(&self, service: &str) -> HttpRequest {
        HttpRequest::post(self.endpoint(service))
    }
}

/// Decode the body and return the `<admin>` root.
///
/// A root `<error>` document is the server's generic failure report and wins
/// over the HTTP status; otherwise non-2xx statuses are `Http` errors.
pub(crate) fn admin_root(response: &HttpResponse) -> Result<XmlNode> {
    let root = match parse_document(&response.body) {
        Ok(root) => root,
        Err(_) if !response.is_success() => {
            return Err(AdminError::Http {
                status: response.status,
                body: response.body.clone(),
            })
        }
        Err(err) => return Err(err),
    };

    if root.name == "error" {
        return Err(AdminError::Domain(error_text(&root)));
    }
    if !response.is_success() {
        return Err(AdminError::Http {
            status: response.status,
            body: response.body.clone(),
        });
    }
    if root.name != "admin" {
        return Err(AdminError::UnexpectedResponse(format!(
            "expected <admin> root, found <{}>",
            root.name
        )));
    }
    Ok(root)
}

/// Text of an `<error>` element: its `<message>` child when present,
/// otherwise its own text.
fn error_text(error: &XmlNode) -> String {
    match error.child("message") {
        Some(message) => message.text().to_string(),
        None => error.text().to_string(),
    }
}

/// `<admin><error>..</error></admin>` as a domain failure.
pub(crate) fn inline_error(root: &XmlNode) -> Option<String> {
    root.child("error").map(error_text)
}

/// Operations answering `<message>` on success and `<error>` on failure.
pub(crate) fn parse_message(response: &HttpResponse) -> Result<Message> {
    let root = admin_root(response)?;
    if let Some(error) = inline_error(&root) {
        return Err(AdminError::Domain(error));
    }
    let message = root
        .child("message")
        .map(|m| m.text().to_string())
        .unwrap_or_default();
    Ok(Message(message))
}

/// Operations answering `<response state=".." message=".."/>`.
pub(crate) fn parse_state_response(response: &HttpResponse) -> Result<Message> {
    let root = admin_root(response)?;
    if let Some(error) = inline_error(&root) {
        return Err(AdminError::Domain(error));
    }
    let node = root.required_child("response")?;
    let message = node.attr_or_empty("message");
    match node.required_attr("state")? {
        "success" => Ok(Message(message)),
        _ => Err(AdminError::Domain(message)),
    }
}

/// Empty filter keeps everything; otherwise only listed names.
pub(crate) fn name_allowed(names: &[&str], name: &str) -> bool {
    names.is_empty() || names.contains(&name)
}
