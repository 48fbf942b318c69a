//! Global symbol table (`global_symbols.*`).

use super::{admin_root, inline_error, name_allowed, parse_message, parse_state_response, AdminClient};
use crate::error::{AdminError, Result};
use crate::http::{Attachment, HttpRequest, HttpResponse};
use crate::types::{GlobalSymbol, ImportMode, Message};

impl AdminClient {
    pub fn build_list_symbols(&self) -> HttpRequest {
        self.post("global_symbols.List")
    }

    pub fn parse_list_symbols(&self, response: HttpResponse, names: &[&str]) -> Result<Vec<GlobalSymbol>> {
        let root = admin_root(&response)?;
        if let Some(error) = inline_error(&root) {
            return Err(AdminError::Domain(error));
        }
        let mut symbols = Vec::new();
        for symbol in root.descend(&["symbols", "symbol"]) {
            let name = symbol.required_attr("name")?;
            if name_allowed(names, name) {
                symbols.push(GlobalSymbol {
                    name: name.to_string(),
                    value: symbol.attr_or_empty("value"),
                });
            }
        }
        Ok(symbols)
    }

    pub fn build_add_symbol(&self, name: &str, value: &str) -> HttpRequest {
        self.post("global_symbols.Add")
            .form([("symbolName", name), ("symbolValue", value)])
    }

    pub fn parse_add_symbol(&self, response: HttpResponse) -> Result<Message> {
        parse_state_response(&response)
    }

    pub fn build_edit_symbol(&self, old_name: &str, name: &str, value: &str) -> HttpRequest {
        self.post("global_symbols.Edit").form([
            ("oldSymbolName", old_name),
            ("symbolName", name),
            ("symbolValue", value),
        ])
    }

    pub fn parse_edit_symbol(&self, response: HttpResponse) -> Result<Message> {
        parse_state_response(&response)
    }

    pub fn build_delete_symbol(&self, name: &str) -> HttpRequest {
        self.post("global_symbols.Delete").form([("symbolName", name)])
    }

    pub fn parse_delete_symbol(&self, response: HttpResponse) -> Result<Message> {
        parse_state_response(&response)
    }

    pub fn build_import_symbols(&self, file: Attachment, mode: ImportMode) -> HttpRequest {
        self.post("global_symbols.Import")
            .query(mode.query_params().iter().copied())
            .file(file)
    }

    pub fn parse_import_symbols(&self, response: HttpResponse) -> Result<Message> {
        parse_message(&response)
    }
}
