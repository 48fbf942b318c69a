use tracing::{info, warn};

use super::AdminService;
use crate::connection::Connection;
use crate::error::Result;
use crate::transport::Transport;
use crate::types::{KeyReport, LicenseKey};

/// License keys.
pub struct KeysService<'a, T> {
    pub(super) service: &'a AdminService<T>,
}

impl<T: Transport> KeysService<'_, T> {
    pub async fn list(&self, con: &Connection) -> Result<Vec<LicenseKey>> {
        let op = async {
            info!("listing keys");
            self.service
                .round_trip(con, |c| c.build_list_keys(), |c, r| c.parse_list_keys(r))
                .await
        };
        self.service.scoped("keys.list", con.server_label(), op).await
    }

    /// Register keys. Succeeds unless every key was rejected; inspect the
    /// report for per-key outcomes.
    pub async fn update(&self, con: &Connection, keys: &[&str]) -> Result<KeyReport> {
        let op = async {
            info!(count = keys.len(), "adding keys");
            let report = self
                .service
                .round_trip(con, |c| c.build_update_keys(keys), |c, r| c.parse_update_keys(r))
                .await?;
            log_report(&report);
            Ok(report)
        };
        self.service.scoped("keys.update", con.server_label(), op).await
    }

    pub async fn remove(&self, con: &Connection, keys: &[&str]) -> Result<KeyReport> {
        let op = async {
            info!(count = keys.len(), "removing keys");
            let report = self
                .service
                .round_trip(con, |c| c.build_remove_keys(keys), |c, r| c.parse_remove_keys(r))
                .await?;
            log_report(&report);
            Ok(report)
        };
        self.service.scoped("keys.remove", con.server_label(), op).await
    }
}

fn log_report(report: &KeyReport) {
    for outcome in &report.outcomes {
        if let Some(error) = &outcome.error_message {
            warn!(key = %outcome.text, error = %error, "key rejected");
        }
    }
    info!(summary = %report.summary(), "keys processed");
}
