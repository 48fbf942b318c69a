use tracing::{debug, info};

use super::AdminService;
use crate::connection::Connection;
use crate::error::{AdminError, Result};
use crate::http::Attachment;
use crate::transport::Transport;
use crate::types::{Certificate, CertificateInventory, Message};

/// Certificate stores, their configuration and project mappings.
pub struct CertificatesService<'a, T> {
    pub(super) service: &'a AdminService<T>,
}

impl<T: Transport> CertificatesService<'_, T> {
    pub async fn list(&self, con: &Connection, names: &[&str]) -> Result<CertificateInventory> {
        let op = async {
            info!("listing certificates");
            let inventory = self
                .service
                .round_trip(con, |c| c.build_list_certificates(), |c, r| c.parse_list_certificates(r, names))
                .await?;
            debug!(
                certificates = inventory.certificates.len(),
                candidates = inventory.candidates.len(),
                bindings = inventory.bindings.len(),
                "certificates listed"
            );
            Ok(inventory)
        };
        self.service.scoped("certificates.list", con.server_label(), op).await
    }

    /// The configured certificate called `name`.
    pub async fn get(&self, con: &Connection, name: &str) -> Result<Certificate> {
        self.list(con, &[name])
            .await?
            .certificates
            .into_iter()
            .next()
            .ok_or_else(|| AdminError::NotFound {
                kind: "certificate",
                name: name.to_string(),
            })
    }

    /// Upload a `.store` / `.p12` file.
    pub async fn install(&self, con: &Connection, store: Attachment) -> Result<Message> {
        let op = async {
            info!(file = %store.file_name, "installing certificate");
            self.service
                .round_trip(con, |c| c.build_install_certificate(store), |c, r| c.parse_install_certificate(r))
                .await
        };
        self.service.scoped("certificates.install", con.server_label(), op).await
    }

    pub async fn add(&self, con: &Connection, cert: &Certificate) -> Result<Message> {
        let op = async {
            info!(name = %cert.name, "adding certificate");
            self.service
                .round_trip(con, |c| c.build_add_certificate(cert), |c, r| c.parse_add_certificate(r))
                .await
        };
        self.service.scoped("certificates.add", con.server_label(), op).await
    }

    pub async fn edit(&self, con: &Connection, old_name: &str, cert: &Certificate) -> Result<Message> {
        let op = async {
            info!(old_name, name = %cert.name, "editing certificate");
            self.service
                .round_trip(con, |c| c.build_edit_certificate(old_name, cert), |c, r| c.parse_edit_certificate(r))
                .await
        };
        self.service.scoped("certificates.edit", con.server_label(), op).await
    }

    /// Set type, password and group of an installed certificate.
    pub async fn configure(&self, con: &Connection, cert: &Certificate) -> Result<Message> {
        let op = async {
            info!(name = %cert.name, "configuring certificate");
            self.service
                .round_trip(con, |c| c.build_configure_certificate(cert), |c, r| c.parse_configure_certificate(r))
                .await
        };
        self.service.scoped("certificates.configure", con.server_label(), op).await
    }

    /// Drop the configuration of `name`, keeping its store file.
    pub async fn delete(&self, con: &Connection, name: &str) -> Result<Message> {
        let op = async {
            info!(name, "deleting certificate configuration");
            self.service
                .round_trip(con, |c| c.build_delete_certificate(name), |c, r| c.parse_delete_certificate(r))
                .await
        };
        self.service.scoped("certificates.delete", con.server_label(), op).await
    }

    /// Remove the store file `name` from the server.
    pub async fn remove(&self, con: &Connection, name: &str) -> Result<Message> {
        let op = async {
            info!(name, "removing certificate file");
            self.service
                .round_trip(con, |c| c.build_remove_certificate(name), |c, r| c.parse_remove_certificate(r))
                .await
        };
        self.service.scoped("certificates.remove", con.server_label(), op).await
    }

    /// Bind certificate `name` to `project`.
    pub async fn configure_mapping(&self, con: &Connection, name: &str, project: &str) -> Result<Message> {
        let op = async {
            info!(name, project, "configuring certificate mapping");
            self.service
                .round_trip(con, |c| c.build_configure_mapping(name, project), |c, r| c.parse_configure_mapping(r))
                .await
        };
        self.service.scoped("certificates.mappings.configure", con.server_label(), op).await
    }
}
