//! Project deployment and export (`projects.*`).

use super::{admin_root, inline_error, name_allowed, parse_message, AdminClient};
use crate::error::{AdminError, Result};
use crate::http::{Attachment, Download, HttpRequest, HttpResponse};
use crate::types::{ExportedArchive, Message, Project};

impl AdminClient {
    pub fn build_list_projects(&self) -> HttpRequest {
        self.post("projects.List")
    }

    pub fn parse_list_projects(&self, response: HttpResponse, names: &[&str]) -> Result<Vec<Project>> {
        let root = admin_root(&response)?;
        if let Some(error) = inline_error(&root) {
            return Err(AdminError::Domain(error));
        }
        let mut projects = Vec::new();
        for project in root.descend(&["projects", "project"]) {
            let name = project.required_attr("name")?;
            if name_allowed(names, name) {
                projects.push(Project {
                    name: name.to_string(),
                    version: project.attr_or_empty("version"),
                    comment: project.attr_or_empty("comment"),
                    deploy_date: project.attr_or_empty("deployDate"),
                    exported: project.attr_or_empty("exported"),
                });
            }
        }
        Ok(projects)
    }

    pub fn build_deploy_project(&self, archive: Attachment) -> HttpRequest {
        self.post("projects.Deploy")
            .query([("bAssembleXsl", "false")])
            .file(archive)
    }

    pub fn parse_deploy_project(&self, response: HttpResponse) -> Result<Message> {
        parse_message(&response)
    }

    pub fn build_export_project(&self, name: &str) -> HttpRequest {
        HttpRequest::get(self.endpoint("projects.Export")).query([("projectName", name)])
    }

    /// A body without attachment is the server explaining why it refused.
    pub fn parse_export_project(&self, download: Download) -> Result<ExportedArchive> {
        match download {
            Download::Saved(path) => Ok(ExportedArchive { path }),
            Download::Response(response) => {
                let root = admin_root(&response)?;
                match inline_error(&root) {
                    Some(error) => Err(AdminError::Domain(error)),
                    None => Err(AdminError::Attachment(
                        "response has no Content-Disposition header".to_string(),
                    )),
                }
            }
        }
    }
}
