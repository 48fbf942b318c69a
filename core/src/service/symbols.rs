use tracing::{debug, info};

use super::AdminService;
use crate::connection::Connection;
use crate::error::{AdminError, Result};
use crate::http::Attachment;
use crate::transport::Transport;
use crate::types::{GlobalSymbol, ImportMode, Message};

/// Global symbol table.
pub struct GlobalSymbolsService<'a, T> {
    pub(super) service: &'a AdminService<T>,
}

impl<T: Transport> GlobalSymbolsService<'_, T> {
    pub async fn list(&self, con: &Connection, names: &[&str]) -> Result<Vec<GlobalSymbol>> {
        let op = async {
            info!("listing global symbols");
            debug!(?names, "name filter");
            let symbols = self
                .service
                .round_trip(con, |c| c.build_list_symbols(), |c, r| c.parse_list_symbols(r, names))
                .await?;
            debug!(count = symbols.len(), "global symbols listed");
            Ok(symbols)
        };
        self.service.scoped("global_symbols.list", con.server_label(), op).await
    }

    pub async fn get(&self, con: &Connection, name: &str) -> Result<GlobalSymbol> {
        self.list(con, &[name])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AdminError::NotFound {
                kind: "global symbol",
                name: name.to_string(),
            })
    }

    /// Declare a new symbol; fails if it already exists.
    pub async fn add(&self, con: &Connection, name: &str, value: &str) -> Result<Message> {
        let op = async {
            info!(name, "adding global symbol");
            self.service
                .round_trip(con, |c| c.build_add_symbol(name, value), |c, r| c.parse_add_symbol(r))
                .await
        };
        self.service.scoped("global_symbols.add", con.server_label(), op).await
    }

    pub async fn edit(&self, con: &Connection, old_name: &str, name: &str, value: &str) -> Result<Message> {
        let op = async {
            info!(old_name, name, "editing global symbol");
            self.service
                .round_trip(con, |c| c.build_edit_symbol(old_name, name, value), |c, r| c.parse_edit_symbol(r))
                .await
        };
        self.service.scoped("global_symbols.edit", con.server_label(), op).await
    }

    /// Change the value of an existing symbol.
    pub async fn update(&self, con: &Connection, name: &str, value: &str) -> Result<Message> {
        self.edit(con, name, name, value).await
    }

    /// Rename a symbol, keeping its value.
    pub async fn rename(&self, con: &Connection, old_name: &str, new_name: &str) -> Result<Message> {
        let current = self.get(con, old_name).await?;
        self.edit(con, old_name, new_name, &current.value).await
    }

    pub async fn delete(&self, con: &Connection, name: &str) -> Result<Message> {
        let op = async {
            info!(name, "deleting global symbol");
            self.service
                .round_trip(con, |c| c.build_delete_symbol(name), |c, r| c.parse_delete_symbol(r))
                .await
        };
        self.service.scoped("global_symbols.delete", con.server_label(), op).await
    }

    /// Load a `.properties` file using `mode` to resolve conflicts.
    pub async fn import(&self, con: &Connection, file: Attachment, mode: ImportMode) -> Result<Message> {
        let op = async {
            info!(file = %file.file_name, ?mode, "importing global symbols");
            let message = self
                .service
                .round_trip(con, |c| c.build_import_symbols(file, mode), |c, r| c.parse_import_symbols(r))
                .await?;
            info!(message = message.as_str(), "global symbols imported");
            Ok(message)
        };
        self.service.scoped("global_symbols.import", con.server_label(), op).await
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
