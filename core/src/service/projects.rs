use std::path::Path;

use tracing::{debug, info};

use super::AdminService;
use crate::client::AdminClient;
use crate::connection::Connection;
use crate::error::Result;
use crate::http::Attachment;
use crate::transport::Transport;
use crate::types::{ExportedArchive, Message, Project};

/// Deployed projects.
pub struct ProjectsService<'a, T> {
    pub(super) service: &'a AdminService<T>,
}

impl<T: Transport> ProjectsService<'_, T> {
    pub async fn list(&self, con: &Connection, names: &[&str]) -> Result<Vec<Project>> {
        let op = async {
            info!("listing projects");
            let projects = self
                .service
                .round_trip(con, |c| c.build_list_projects(), |c, r| c.parse_list_projects(r, names))
                .await?;
            debug!(count = projects.len(), "projects listed");
            Ok(projects)
        };
        self.service.scoped("projects.list", con.server_label(), op).await
    }

    /// Upload and deploy a `.car` archive.
    pub async fn deploy(&self, con: &Connection, archive: Attachment) -> Result<Message> {
        let op = async {
            info!(file = %archive.file_name, "deploying project");
            let message = self
                .service
                .round_trip(con, |c| c.build_deploy_project(archive), |c, r| c.parse_deploy_project(r))
                .await?;
            info!(message = message.as_str(), "project deployed");
            Ok(message)
        };
        self.service.scoped("projects.deploy", con.server_label(), op).await
    }

    /// Export project `name` as an archive into `dest_dir`.
    pub async fn export(&self, con: &Connection, name: &str, dest_dir: &Path) -> Result<ExportedArchive> {
        let op = async {
            info!(project = name, "exporting project");
            let client = AdminClient::new(con.base_url());
            let request = client.build_export_project(name).with_cookie(con.session_cookie());
            let download = self.service.transport.download(request, dest_dir).await?;
            let archive = client.parse_export_project(download)?;
            info!(path = %archive.path.display(), "project exported");
            Ok(archive)
        };
        self.service.scoped("projects.export", con.server_label(), op).await
    }
}
