//! Server configuration properties (`configuration.*`).

use super::{admin_root, inline_error, name_allowed, AdminClient};
use crate::error::{AdminError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::types::ConfigProperty;
use crate::xml::escape_attr;

impl AdminClient {
    pub fn build_list_config(&self) -> HttpRequest {
        self.post("configuration.List")
    }

    pub fn parse_list_config(&self, response: HttpResponse, names: &[&str]) -> Result<Vec<ConfigProperty>> {
        let root = admin_root(&response)?;
        if let Some(error) = inline_error(&root) {
            return Err(AdminError::Domain(error));
        }
        let mut properties = Vec::new();
        for category in root.children_named("category") {
            for property in category.children_named("property") {
                let name = property.required_attr("name")?;
                if name_allowed(names, name) {
                    properties.push(ConfigProperty {
                        category: category.attr_or_empty("name"),
                        name: name.to_string(),
                        value: property.attr_or_empty("value"),
                    });
                }
            }
        }
        Ok(properties)
    }

    pub fn build_update_config<K, V>(&self, properties: &[(K, V)]) -> HttpRequest
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut xml = String::from("<configuration>");
        for (key, value) in properties {
            xml.push_str(&format!(
                "<property key=\"{}\" value=\"{}\"/>",
                escape_attr(key.as_ref()),
                escape_attr(value.as_ref())
            ));
        }
        xml.push_str("</configuration>");
        self.post("configuration.Update").xml(xml)
    }

    pub fn parse_update_config(&self, response: HttpResponse) -> Result<()> {
        let root = admin_root(&response)?;
        if let Some(error) = inline_error(&root) {
            return Err(AdminError::Domain(error));
        }
        match root.required_child("update")?.attr("status") {
            Some("ok") => Ok(()),
            status => Err(AdminError::Domain(format!(
                "Bad response status: {}",
                status.unwrap_or_default()
            ))),
        }
    }
}
