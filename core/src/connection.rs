//! Session state for one admin login.
//!
//! A `Connection` is LoggedIn while it holds a session cookie. Only `login`,
//! `logout` and `clear_session` change that, and they all need `&mut`, so a
//! single `Connection` cannot be logged in and out concurrently.

use std::fmt;

use url::Url;

use crate::error::{AdminError, Result};

#[derive(Clone)]
pub struct Connection {
    base_url: String,
    username: String,
    password: String,
    session_cookie: Option<String>,
}

impl Connection {
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            session_cookie: None,
        }
    }

    /// Build a connection from `CONVERTIGO_URL`, `CONVERTIGO_USER` and
    /// `CONVERTIGO_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| AdminError::Config(format!("{name} is not set")))
        };
        Ok(Self::new(var("CONVERTIGO_URL")?, var("CONVERTIGO_USER")?, var("CONVERTIGO_PASSWORD")?))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn session_cookie(&self) -> Option<&str> {
        self.session_cookie.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session_cookie.is_some()
    }

    pub(crate) fn set_session(&mut self, cookie: String) {
        self.session_cookie = Some(cookie);
    }

    /// Forget the session locally without telling the server.
    pub fn clear_session(&mut self) {
        self.session_cookie = None;
    }

    /// `host:port` tag used in log spans. The first DNS label is kept unless
    /// the host is an IP address.
    pub fn server_label(&self) -> String {
        let Ok(url) = Url::parse(&self.base_url) else {
            return "[no server]".to_string();
        };
        let host = match url.host() {
            Some(url::Host::Domain(domain)) => domain.split('.').next().unwrap_or(domain).to_string(),
            Some(other) => other.to_string(),
            None => return "[no server]".to_string(),
        };
        match url.port_or_known_default() {
            Some(port) => format!("{host}:{port}"),
            None => host,
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("logged_in", &self.is_logged_in())
            .finish()
    }
}
