//! Async facades over the admin API, one per resource area.
//!
//! # Design
//! `AdminService` owns a `Transport` and a `tracing::Dispatch`.
//! Every facade method builds a request with `AdminClient`, attaches the
//! connection's session cookie, executes it and hands the response to the
//! matching `parse_*`. Each call runs inside an `admin` span tagged with the
//! operation and the server. The whole call is scoped to the service's
//! dispatch, which is `Dispatch::none()` unless `with_dispatch` replaced it,
//! so a subscriber installed by the host never sees these events.

mod certificates;
mod config;
mod engine;
mod keys;
mod projects;
mod roles;
mod symbols;

pub use certificates::CertificatesService;
pub use config::ConfigService;
pub use engine::EngineService;
pub use keys::KeysService;
pub use projects::ProjectsService;
pub use roles::RolesService;
pub use symbols::GlobalSymbolsService;

use std::future::Future;

use tracing::instrument::WithSubscriber;
use tracing::{info_span, warn, Dispatch, Instrument};

use crate::client::AdminClient;
use crate::connection::Connection;
use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{HttpTransport, Transport, TransportConfig};

pub struct AdminService<T = HttpTransport> {
    transport: T,
    dispatch: Dispatch,
}

impl AdminService<HttpTransport> {
    pub fn new(config: TransportConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }
}

impl<T: Transport> AdminService<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            dispatch: Dispatch::none(),
        }
    }

    /// Send every event emitted by this service to `dispatch`.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn engine(&self) -> EngineService<'_, T> {
        EngineService { service: self }
    }

    pub fn config(&self) -> ConfigService<'_, T> {
        ConfigService { service: self }
    }

    pub fn projects(&self) -> ProjectsService<'_, T> {
        ProjectsService { service: self }
    }

    pub fn certificates(&self) -> CertificatesService<'_, T> {
        CertificatesService { service: self }
    }

    pub fn global_symbols(&self) -> GlobalSymbolsService<'_, T> {
        GlobalSymbolsService { service: self }
    }

    pub fn roles(&self) -> RolesService<'_, T> {
        RolesService { service: self }
    }

    pub fn keys(&self) -> KeysService<'_, T> {
        KeysService { service: self }
    }

    /// Run `fut` inside an `admin` span, scoped to the configured dispatch.
    pub(crate) async fn scoped<F, R>(&self, op: &'static str, server: String, fut: F) -> Result<R>
    where
        F: Future<Output = Result<R>>,
    {
        let traced = async move {
            let span = info_span!("admin", op, %server);
            let result = fut.instrument(span.clone()).await;
            if let Err(err) = &result {
                span.in_scope(|| warn!(error = %err, "operation failed"));
            }
            result
        };
        traced.with_subscriber(self.dispatch.clone()).await
    }

    /// One round trip: build, authorize, execute, parse.
    pub(crate) async fn round_trip<R>(
        &self,
        con: &Connection,
        build: impl FnOnce(&AdminClient) -> HttpRequest,
        parse: impl FnOnce(&AdminClient, HttpResponse) -> Result<R>,
    ) -> Result<R> {
        let client = AdminClient::new(con.base_url());
        let request = build(&client).with_cookie(con.session_cookie());
        let response = self.transport.execute(request).await?;
        parse(&client, response)
    }
}
