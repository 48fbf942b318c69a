use tracing::{debug, info};

use super::AdminService;
use crate::connection::Connection;
use crate::error::{AdminError, Result};
use crate::http::Attachment;
use crate::transport::Transport;
use crate::types::{ImportMode, Message, UserRoles};

/// Users and their roles.
pub struct RolesService<'a, T> {
    pub(super) service: &'a AdminService<T>,
}

impl<T: Transport> RolesService<'_, T> {
    pub async fn list(&self, con: &Connection, names: &[&str]) -> Result<Vec<UserRoles>> {
        let op = async {
            info!("listing users");
            let users = self
                .service
                .round_trip(con, |c| c.build_list_roles(), |c, r| c.parse_list_roles(r, names))
                .await?;
            debug!(count = users.len(), "users listed");
            Ok(users)
        };
        self.service.scoped("roles.list", con.server_label(), op).await
    }

    pub async fn get(&self, con: &Connection, username: &str) -> Result<UserRoles> {
        self.list(con, &[username])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AdminError::NotFound {
                kind: "user",
                name: username.to_string(),
            })
    }

    pub async fn add(&self, con: &Connection, username: &str, password: &str, roles: &[&str]) -> Result<Message> {
        let op = async {
            info!(username, ?roles, "adding user");
            self.service
                .round_trip(con, |c| c.build_add_user(username, password, roles), |c, r| c.parse_add_user(r))
                .await
        };
        self.service.scoped("roles.add", con.server_label(), op).await
    }

    pub async fn edit(
        &self,
        con: &Connection,
        old_username: &str,
        username: &str,
        password: &str,
        roles: &[&str],
    ) -> Result<Message> {
        let op = async {
            info!(old_username, username, ?roles, "editing user");
            self.service
                .round_trip(
                    con,
                    |c| c.build_edit_user(old_username, username, password, roles),
                    |c, r| c.parse_edit_user(r),
                )
                .await
        };
        self.service.scoped("roles.edit", con.server_label(), op).await
    }

    pub async fn delete(&self, con: &Connection, username: &str) -> Result<Message> {
        let op = async {
            info!(username, "deleting user");
            self.service
                .round_trip(con, |c| c.build_delete_user(username), |c, r| c.parse_delete_user(r))
                .await
        };
        self.service.scoped("roles.delete", con.server_label(), op).await
    }

    pub async fn delete_all(&self, con: &Connection) -> Result<Message> {
        let op = async {
            info!("deleting all users");
            self.service
                .round_trip(con, |c| c.build_delete_all_users(), |c, r| c.parse_delete_all_users(r))
                .await
        };
        self.service.scoped("roles.delete_all", con.server_label(), op).await
    }

    /// Load a users file using `mode` to resolve conflicts.
    pub async fn import(&self, con: &Connection, file: Attachment, mode: ImportMode) -> Result<Message> {
        let op = async {
            info!(file = %file.file_name, ?mode, "importing users");
            let message = self
                .service
                .round_trip(con, |c| c.build_import_roles(file, mode), |c, r| c.parse_import_roles(r))
                .await?;
            info!(message = message.as_str(), "users imported");
            Ok(message)
        };
        self.service.scoped("roles.import", con.server_label(), op).await
    }

    pub async fn clear_import(&self, con: &Connection, file: Attachment) -> Result<Message> {
        self.import(con, file, ImportMode::ClearImport).await
    }

    pub async fn merge_priority_server(&self, con: &Connection, file: Attachment) -> Result<Message> {
        self.import(con, file, ImportMode::MergePriorityServer).await
    }

    pub async fn merge_priority_import(&self, con: &Connection, file: Attachment) -> Result<Message> {
        self.import(con, file, ImportMode::MergePriorityImport).await
    }
}
