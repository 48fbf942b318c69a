use tracing::{debug, info};

use super::AdminService;
use crate::connection::Connection;
use crate::error::{AdminError, Result};
use crate::transport::Transport;
use crate::types::{EngineStatus, Message};

/// Authentication and engine lifecycle.
pub struct EngineService<'a, T> {
    pub(super) service: &'a AdminService<T>,
}

impl<T: Transport> EngineService<'_, T> {
    /// Authenticate and store the session cookie on `con`.
    ///
    /// On failure the connection keeps whatever session it had before.
    pub async fn login(&self, con: &mut Connection) -> Result<()> {
        let server = con.server_label();
        let op = async {
            info!(user = con.username(), "logging in");
            let (user, password) = (con.username().to_string(), con.password().to_string());
            let cookie = self
                .service
                .round_trip(con, |c| c.build_login(&user, &password), |c, r| c.parse_login(r))
                .await?;
            match (cookie, con.is_logged_in()) {
                (Some(cookie), _) => {
                    debug!("session cookie received");
                    con.set_session(cookie);
                }
                (None, true) => debug!("server kept the existing session"),
                (None, false) => {
                    return Err(AdminError::Auth("server did not return a session cookie".to_string()))
                }
            }
            info!("login successful");
            Ok(())
        };
        self.service.scoped("engine.login", server, op).await
    }

    /// End the session. The local cookie is cleared even when the request
    /// fails; without a session this does nothing.
    pub async fn logout(&self, con: &mut Connection) -> Result<()> {
        let server = con.server_label();
        let op = async {
            if !con.is_logged_in() {
                debug!("not logged in, nothing to do");
                return Ok(());
            }
            info!(user = con.username(), "logging out");
            let result = self
                .service
                .round_trip(con, |c| c.build_logout(), |c, r| c.parse_logout(r))
                .await;
            con.clear_session();
            result?;
            info!("logout successful");
            Ok(())
        };
        self.service.scoped("engine.logout", server, op).await
    }

    pub async fn status(&self, con: &Connection) -> Result<EngineStatus> {
        let op = async {
            let status = self
                .service
                .round_trip(con, |c| c.build_engine_status(), |c, r| c.parse_engine_status(r))
                .await?;
            debug!(version = %status.version, state = ?status.state, "engine status");
            Ok(status)
        };
        self.service.scoped("engine.status", con.server_label(), op).await
    }

    pub async fn start(&self, con: &Connection) -> Result<Message> {
        let op = async {
            info!("starting engine");
            self.service
                .round_trip(con, |c| c.build_engine_start(), |c, r| c.parse_engine_start(r))
                .await
        };
        self.service.scoped("engine.start", con.server_label(), op).await
    }

    pub async fn stop(&self, con: &Connection) -> Result<Message> {
        let op = async {
            info!("stopping engine");
            self.service
                .round_trip(con, |c| c.build_engine_stop(), |c, r| c.parse_engine_stop(r))
                .await
        };
        self.service.scoped("engine.stop", con.server_label(), op).await
    }

    /// `stop` then `start`. Not atomic: a failed start leaves the engine
    /// stopped.
    pub async fn restart(&self, con: &Connection) -> Result<Message> {
        let op = async {
            self.stop(con).await?;
            self.start(con).await
        };
        self.service.scoped("engine.restart", con.server_label(), op).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::fake::FakeTransport;
    use super::*;
    use crate::http::RequestBody;

    const BASE: &str = "http://localhost:28080/convertigo";
    const OK_LOGIN: &str = r#"<admin service="engine.Authenticate"><success/></admin>"#;

    fn connection() -> Connection {
        Connection::new(BASE, "admin", "admin")
    }

    #[tokio::test]
    async fn login_then_logout_clears_cookie() {
        let transport = FakeTransport::replying(&[
            (200, &[("Set-Cookie", "JSESSIONID=abc; Path=/")], OK_LOGIN),
            (200, &[], OK_LOGIN),
        ]);
        let service = AdminService::with_transport(transport);
        let mut con = connection();

        service.engine().login(&mut con).await.unwrap();
        assert_eq!(con.session_cookie(), Some("JSESSIONID=abc"));

        service.engine().logout(&mut con).await.unwrap();
        assert!(!con.is_logged_in());

        let sent = service.transport().sent();
        assert!(sent[0].headers.is_empty());
        assert_eq!(sent[1].headers, vec![("cookie".to_string(), "JSESSIONID=abc".to_string())]);
        assert_eq!(sent[1].body, RequestBody::Form(vec![("authType".into(), "logout".into())]));
    }

    #[tokio::test]
    async fn logout_without_login_is_a_no_op() {
        let service = AdminService::with_transport(FakeTransport::default());
        let mut con = connection();
        service.engine().logout(&mut con).await.unwrap();
        assert!(service.transport().sent().is_empty());
    }

    #[tokio::test]
    async fn rejected_login_leaves_cookie_unset() {
        let transport = FakeTransport::replying(&[(
            200,
            &[],
            "<admin><error>Invalid authentication!</error></admin>",
        )]);
        let service = AdminService::with_transport(transport);
        let mut con = connection();
        let err = service.engine().login(&mut con).await.unwrap_err();
        assert!(matches!(err, AdminError::Auth(ref m) if m == "Invalid authentication!"));
        assert!(!con.is_logged_in());
    }

    #[tokio::test]
    async fn failed_logout_still_clears_cookie() {
        let transport = FakeTransport::replying(&[(200, &[("set-cookie", "JSESSIONID=1")], OK_LOGIN)]);
        let service = AdminService::with_transport(transport);
        let mut con = connection();
        service.engine().login(&mut con).await.unwrap();

        let err = service.engine().logout(&mut con).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!con.is_logged_in());
    }

    #[tokio::test]
    async fn restart_is_stop_then_start() {
        let transport = FakeTransport::replying(&[
            (200, &[], "<admin><message>stopped</message></admin>"),
            (200, &[], "<admin><message>started</message></admin>"),
        ]);
        let service = AdminService::with_transport(transport);
        let msg = service.engine().restart(&connection()).await.unwrap();
        assert_eq!(msg.as_str(), "started");
        let paths: Vec<String> = service.transport().sent().into_iter().map(|r| r.path).collect();
        assert!(paths[0].ends_with("engine.Stop"));
        assert!(paths[1].ends_with("engine.Start"));
    }

    #[tokio::test]
    async fn restart_aborts_when_stop_fails() {
        let transport = FakeTransport::replying(&[(500, &[], "<error><message>busy</message></error>")]);
        let service = AdminService::with_transport(transport);
        let err = service.engine().restart(&connection()).await.unwrap_err();
        assert_eq!(err.to_string(), "busy");
        assert_eq!(service.transport().sent().len(), 1);
    }
}
