//! License keys (`keys.*`).

use super::{admin_root, inline_error, AdminClient};
use crate::error::{AdminError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{KeyOutcome, KeyReport, LicenseKey};
use crate::xml::escape_attr;

const SEGMENT_LEN: usize = 16;

/// Length-only check: two 16-character segments and a separator. The
/// segments are not checked for hexadecimal content.
///
/// Length is counted in UTF-16 code units, as the admin console does, so a
/// character outside the Basic Multilingual Plane counts twice.
pub fn is_valid_key(key: &str) -> bool {
    key.encode_utf16().count() == SEGMENT_LEN + 1 + SEGMENT_LEN
}

fn keys_xml(keys: &[&str]) -> String {
    let mut xml = String::from("<keys>");
    for key in keys {
        xml.push_str(&format!("<key text=\"{}\"/>", escape_attr(key)));
    }
    xml.push_str("</keys>");
    xml
}

impl AdminClient {
    pub fn build_list_keys(&self) -> HttpRequest {
        self.post("keys.List")
    }

    pub fn parse_list_keys(&self, response: HttpResponse) -> Result<Vec<LicenseKey>> {
        let root = admin_root(&response)?;
        if let Some(error) = inline_error(&root) {
            return Err(AdminError::Domain(error));
        }
        let mut keys = Vec::new();
        for category in root.children_named("category") {
            for key in category.descend(&["keys", "key"]) {
                keys.push(LicenseKey {
                    category: category.attr_or_empty("name"),
                    text: key.required_attr("text")?.to_string(),
                    value: key.attr_or_empty("value"),
                    evaluation: key.attr("evaluation") == Some("true"),
                    expiration: key.attr_or_empty("expiration"),
                    expired: key.attr("expired") == Some("true"),
                });
            }
        }
        Ok(keys)
    }

    pub fn build_update_keys(&self, keys: &[&str]) -> HttpRequest {
        self.post("keys.Update").xml(keys_xml(keys))
    }

    pub fn parse_update_keys(&self, response: HttpResponse) -> Result<KeyReport> {
        parse_key_report(&response)
    }

    pub fn build_remove_keys(&self, keys: &[&str]) -> HttpRequest {
        self.post("keys.Remove").xml(keys_xml(keys))
    }

    pub fn parse_remove_keys(&self, response: HttpResponse) -> Result<KeyReport> {
        parse_key_report(&response)
    }
}

/// Per-key outcomes. Fails only when every submitted key was rejected.
fn parse_key_report(response: &HttpResponse) -> Result<KeyReport> {
    let root = admin_root(response)?;
    if let Some(error) = inline_error(&root) {
        return Err(AdminError::Domain(error));
    }
    let outcomes = root
        .descend(&["keys", "key"])
        .into_iter()
        .map(|key| -> Result<KeyOutcome> {
            Ok(KeyOutcome {
                text: key.required_attr("text")?.to_string(),
                valid: key.attr("valid") == Some("true"),
                error_message: key.attr("errorMessage").filter(|m| !m.is_empty()).map(str::to_string),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let report = KeyReport { outcomes };
    if report.all_failed() {
        return Err(AdminError::Domain(report.summary()));
    }
    Ok(report)
}
