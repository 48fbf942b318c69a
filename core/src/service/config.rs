use tracing::{debug, info};

use super::AdminService;
use crate::connection::Connection;
use crate::error::Result;
use crate::transport::Transport;
use crate::types::ConfigProperty;

/// Server configuration properties.
pub struct ConfigService<'a, T> {
    pub(super) service: &'a AdminService<T>,
}

impl<T: Transport> ConfigService<'_, T> {
    /// Properties named in `names`, or all of them when `names` is empty.
    pub async fn list(&self, con: &Connection, names: &[&str]) -> Result<Vec<ConfigProperty>> {
        let op = async {
            info!("listing configuration");
            debug!(?names, "name filter");
            let properties = self
                .service
                .round_trip(con, |c| c.build_list_config(), |c, r| c.parse_list_config(r, names))
                .await?;
            debug!(count = properties.len(), "configuration listed");
            Ok(properties)
        };
        self.service.scoped("configuration.list", con.server_label(), op).await
    }

    pub async fn update<K, V>(&self, con: &Connection, properties: &[(K, V)]) -> Result<()>
    where
        K: AsRef<str> + Sync,
        V: AsRef<str> + Sync,
    {
        let op = async {
            info!(count = properties.len(), "updating configuration");
            self.service
                .round_trip(con, |c| c.build_update_config(properties), |c, r| c.parse_update_config(r))
                .await
        };
        self.service.scoped("configuration.update", con.server_label(), op).await
    }
}
