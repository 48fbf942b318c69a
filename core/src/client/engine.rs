//! Engine lifecycle and authentication (`engine.*`).

use super::{admin_root, inline_error, parse_message, AdminClient};
use crate::error::{AdminError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{EngineState, EngineStatus, Message, Uptime};
use crate::xml::XmlNode;

const AUTHENTICATE: &str = "engine.Authenticate";

impl AdminClient {
    pub fn build_login(&self, username: &str, password: &str) -> HttpRequest {
        self.post(AUTHENTICATE).form([
            ("authType", "login"),
            ("authUserName", username),
            ("authPassword", password),
        ])
    }

    /// Returns the session cookie sent by the server, if any.
    pub fn parse_login(&self, response: HttpResponse) -> Result<Option<String>> {
        let root = admin_root(&response).map_err(|err| match err {
            AdminError::Domain(msg) => AdminError::Auth(msg),
            other => other,
        })?;
        if let Some(error) = inline_error(&root) {
            return Err(AdminError::Auth(error));
        }
        Ok(response.session_cookie())
    }

    pub fn build_logout(&self) -> HttpRequest {
        self.post(AUTHENTICATE).form([("authType", "logout")])
    }

    pub fn parse_logout(&self, response: HttpResponse) -> Result<()> {
        let root = admin_root(&response)?;
        match inline_error(&root) {
            Some(error) => Err(AdminError::Domain(error)),
            None => Ok(()),
        }
    }

    pub fn build_engine_status(&self) -> HttpRequest {
        self.post("engine.GetStatus")
    }

    pub fn parse_engine_status(&self, response: HttpResponse) -> Result<EngineStatus> {
        let root = admin_root(&response)?;
        if let Some(error) = inline_error(&root) {
            return Err(AdminError::Domain(error));
        }
        let version = root.required_child("version")?.required_attr("engine")?.to_string();
        let state = EngineState::from(root.required_child("engineState")?.text());
        let uptime = match root.child("runningElapse") {
            Some(elapse) => parse_uptime(elapse)?,
            None => Uptime::default(),
        };
        Ok(EngineStatus { version, state, uptime })
    }

    pub fn build_engine_start(&self) -> HttpRequest {
        self.post("engine.Start")
    }

    pub fn parse_engine_start(&self, response: HttpResponse) -> Result<Message> {
        parse_message(&response)
    }

    pub fn build_engine_stop(&self) -> HttpRequest {
        self.post("engine.Stop")
    }

    pub fn parse_engine_stop(&self, response: HttpResponse) -> Result<Message> {
        parse_message(&response)
    }
}

fn parse_uptime(elapse: &XmlNode) -> Result<Uptime> {
    let field = |name: &str| -> Result<u64> {
        match elapse.attr(name) {
            None | Some("") => Ok(0),
            Some(raw) => raw.trim().parse().map_err(|_| {
                AdminError::UnexpectedResponse(format!("runningElapse {name}={raw:?} is not a number"))
            }),
        }
    };
    Ok(Uptime {
        days: field("days")?,
        hours: field("hours")?,
        minutes: field("minutes")?,
        seconds: field("seconds")?,
        text: elapse.text().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::ok;
    use super::*;
    use crate::http::{HttpMethod, RequestBody};

    fn client() -> AdminClient {
        AdminClient::new("http://localhost:28080/convertigo")
    }

    #[test]
    fn build_login_sends_credentials_as_form() {
        let req = client().build_login("admin", "secret");
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.path,
            "http://localhost:28080/convertigo/admin/services/engine.Authenticate"
        );
        assert_eq!(
            req.body,
            RequestBody::Form(vec![
                ("authType".into(), "login".into()),
                ("authUserName".into(), "admin".into()),
                ("authPassword".into(), "secret".into()),
            ])
        );
    }

    #[test]
    fn parse_login_returns_cookie() {
        let mut resp = ok(r#"<admin service="engine.Authenticate"><success/></admin>"#);
        resp.headers.push(("set-cookie".into(), "JSESSIONID=42; Path=/".into()));
        let cookie = client().parse_login(resp).unwrap();
        assert_eq!(cookie.as_deref(), Some("JSESSIONID=42"));
    }

    #[test]
    fn parse_login_rejected_is_auth_error() {
        let resp = ok(r#"<admin service="engine.Authenticate"><error>Invalid password</error></admin>"#);
        let err = client().parse_login(resp).unwrap_err();
        assert!(matches!(err, AdminError::Auth(ref m) if m == "Invalid password"));
    }

    #[test]
    fn build_logout() {
        let req = client().build_logout();
        assert_eq!(req.body, RequestBody::Form(vec![("authType".into(), "logout".into())]));
    }

    #[test]
    fn parse_engine_status() {
        let resp = ok(r#"<admin service="engine.GetStatus"><version engine="7.x"/><engineState>started</engineState><runningElapse days="1" hours="2">some text</runningElapse></admin>"#);
        let status = client().parse_engine_status(resp).unwrap();
        assert_eq!(status.version, "7.x");
        assert_eq!(status.state, EngineState::Started);
        assert_eq!(status.uptime.days, 1);
        assert_eq!(status.uptime.hours, 2);
        assert_eq!(status.uptime.minutes, 0);
        assert_eq!(status.uptime.text, "some text");
    }

    #[test]
    fn parse_engine_status_missing_version() {
        let resp = ok("<admin><engineState>stopped</engineState></admin>");
        let err = client().parse_engine_status(resp).unwrap_err();
        assert!(matches!(err, AdminError::UnexpectedResponse(_)));
    }

    #[test]
    fn parse_engine_status_bad_number() {
        let resp = ok(r#"<admin><version engine="7"/><engineState>started</engineState><runningElapse days="x"/></admin>"#);
        assert!(client().parse_engine_status(resp).is_err());
    }

    #[test]
    fn parse_engine_start_message() {
        let resp = ok("<admin service=\"engine.Start\"><message>The Convertigo engine has been successfully started.</message></admin>");
        let msg = client().parse_engine_start(resp).unwrap();
        assert!(msg.as_str().contains("started"));
    }
}
