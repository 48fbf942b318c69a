//! Async client for the Convertigo server administration API.
//!
//! # Overview
//! Every admin operation is one HTTP round trip whose XML reply is normalized
//! into a typed result. The work is split in two layers:
//!
//! - `AdminClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network (host-does-IO pattern), one
//!   `build_*` / `parse_*` pair per remote operation.
//! - `AdminService` composes it with a `Transport` (by default the
//!   `reqwest`-backed `HttpTransport`) and exposes one facade per resource
//!   area: engine, configuration, projects, certificates, global symbols,
//!   roles and keys.
//!
//! # Design
//! - `Connection` carries the base URL, credentials and session cookie; only
//!   `login` / `logout` mutate it.
//! - Collections are normalized uniformly: absent, empty and single-element
//!   containers all become a `Vec` in server order.
//! - Logging goes through `tracing`; a `Dispatch` can be handed to
//!   `AdminService::with_dispatch` to scope it explicitly.
//!
//! ```no_run
//! # async fn demo() -> convertigo_admin::Result<()> {
//! use convertigo_admin::{AdminService, Connection, TransportConfig};
//!
//! let service = AdminService::new(TransportConfig::default())?;
//! let mut con = Connection::new("http://localhost:28080/convertigo", "admin", "admin");
//! service.engine().login(&mut con).await?;
//! let symbols = service.global_symbols().list(&con, &[]).await?;
//! println!("{} symbols", symbols.len());
//! service.engine().logout(&mut con).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod http;
pub mod service;
pub mod transport;
pub mod types;
mod xml;

pub use client::{is_valid_key, AdminClient};
pub use connection::Connection;
pub use error::{AdminError, Result};
pub use http::{Attachment, Download, HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use service::AdminService;
pub use transport::{HttpTransport, Transport, TransportConfig};
pub use types::{
    Certificate, CertificateBinding, CertificateInventory, ConfigProperty, EngineState, EngineStatus,
    ExportedArchive, GlobalSymbol, ImportMode, KeyOutcome, KeyReport, LicenseKey, Message, Project,
    Uptime, UserRoles,
};
