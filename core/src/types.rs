//! Domain results returned by the admin API.
//!
//! # Design
//! One explicit record per response shape. Collections are `Vec`s in server
//! order so name filters can preserve it. Everything derives `Serialize` /
//! `Deserialize` so results can be dumped as JSON and compared against the
//! test vectors.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Conflict-resolution strategy for bulk imports of symbols and roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportMode {
    /// Wipe the server's entities, then load the file.
    ClearImport,
    /// Merge; on conflict keep the server's entity.
    MergePriorityServer,
    /// Merge; on conflict keep the imported entity.
    MergePriorityImport,
}

impl ImportMode {
    pub fn query_params(self) -> &'static [(&'static str, &'static str)] {
        match self {
            ImportMode::ClearImport => &[("action-import", "clear-import")],
            ImportMode::MergePriorityServer => &[("action-import", ""), ("priority", "priority-server")],
            ImportMode::MergePriorityImport => &[("action-import", ""), ("priority", "priority-import")],
        }
    }
}

/// Success text returned by operations that only report a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message(pub String);

impl Message {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Started,
    Stopped,
    #[serde(untagged)]
    Other(String),
}

impl From<&str> for EngineState {
    fn from(value: &str) -> Self {
        match value {
            "started" => EngineState::Started,
            "stopped" => EngineState::Stopped,
            other => EngineState::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uptime {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    /// Human-readable rendering supplied by the server.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub version: String,
    pub state: EngineState,
    pub uptime: Uptime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigProperty {
    pub category: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub version: String,
    pub comment: String,
    pub deploy_date: String,
    pub exported: String,
}

/// Local path of a project archive written by `export`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedArchive {
    pub path: PathBuf,
}

/// Certificate configuration, both as listed and as submitted to
/// `add` / `edit` / `configure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub name: String,
    /// `server` or `client`.
    pub kind: String,
    pub password: String,
    pub group: String,
    #[serde(default)]
    pub valid_pass: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateBinding {
    pub certificate_name: String,
    /// `anonymous` or `carioca`.
    pub scope: String,
    pub target: String,
    pub project: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInventory {
    pub certificates: Vec<Certificate>,
    /// Store files present on the server but not configured.
    pub candidates: Vec<String>,
    pub bindings: Vec<CertificateBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSymbol {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoles {
    pub name: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseKey {
    pub category: String,
    pub text: String,
    pub value: String,
    pub evaluation: bool,
    pub expiration: String,
    pub expired: bool,
}

/// Outcome of one key in an update/remove request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOutcome {
    pub text: String,
    pub valid: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyReport {
    pub outcomes: Vec<KeyOutcome>,
}

impl KeyReport {
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.error_message.is_some())
    }

    /// `Success` / `Error: <msg>` for a single key, or
    /// `{KEY:"Success", KEY:"Error: <msg>"}` for several.
    pub fn summary(&self) -> String {
        fn verdict(outcome: &KeyOutcome) -> String {
            match &outcome.error_message {
                Some(msg) => format!("Error: {msg}"),
                None => "Success".to_string(),
            }
        }

        match self.outcomes.as_slice() {
            [] => String::new(),
            [single] => verdict(single),
            many => {
                let parts: Vec<String> = many
                    .iter()
                    .map(|o| format!("{}:\"{}\"", o.text, verdict(o)))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
        }
    }
}
