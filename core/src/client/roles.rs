//! Users and their roles (`roles.*`).

use super::{admin_root, inline_error, name_allowed, parse_message, parse_state_response, AdminClient};
use crate::error::{AdminError, Result};
use crate::http::{Attachment, HttpRequest, HttpResponse};
use crate::types::{ImportMode, Message, UserRoles};

fn user_form(username: &str, password: &str, roles: &[&str]) -> Vec<(String, String)> {
    let mut form = vec![
        ("username".to_string(), username.to_string()),
        ("password".to_string(), password.to_string()),
    ];
    form.extend(roles.iter().map(|role| ("roles".to_string(), role.to_string())));
    form
}

impl AdminClient {
    pub fn build_list_roles(&self) -> HttpRequest {
        self.post("roles.List")
    }

    pub fn parse_list_roles(&self, response: HttpResponse, names: &[&str]) -> Result<Vec<UserRoles>> {
        let root = admin_root(&response)?;
        if let Some(error) = inline_error(&root) {
            return Err(AdminError::Domain(error));
        }
        let mut users = Vec::new();
        for user in root.descend(&["users", "user"]) {
            let name = user.required_attr("name")?;
            if !name_allowed(names, name) {
                continue;
            }
            let roles = user
                .children_named("role")
                .map(|role| role.required_attr("name").map(str::to_string))
                .collect::<Result<Vec<_>>>()?;
            users.push(UserRoles {
                name: name.to_string(),
                roles,
            });
        }
        Ok(users)
    }

    pub fn build_add_user(&self, username: &str, password: &str, roles: &[&str]) -> HttpRequest {
        self.post("roles.Add").form(user_form(username, password, roles))
    }

    pub fn parse_add_user(&self, response: HttpResponse) -> Result<Message> {
        parse_state_response(&response)
    }

    pub fn build_edit_user(&self, old_username: &str, username: &str, password: &str, roles: &[&str]) -> HttpRequest {
        let mut form = vec![("oldUsername".to_string(), old_username.to_string())];
        form.extend(user_form(username, password, roles));
        self.post("roles.Edit").form(form)
    }

    pub fn parse_edit_user(&self, response: HttpResponse) -> Result<Message> {
        parse_state_response(&response)
    }

    pub fn build_delete_user(&self, username: &str) -> HttpRequest {
        self.post("roles.Delete").form([("username", username)])
    }

    pub fn parse_delete_user(&self, response: HttpResponse) -> Result<Message> {
        parse_state_response(&response)
    }

    pub fn build_delete_all_users(&self) -> HttpRequest {
        self.post("roles.DeleteAll")
    }

    pub fn parse_delete_all_users(&self, response: HttpResponse) -> Result<Message> {
        parse_state_response(&response)
    }

    pub fn build_import_roles(&self, file: Attachment, mode: ImportMode) -> HttpRequest {
        self.post("roles.Import")
            .query(mode.query_params().iter().copied())
            .file(file)
    }

    pub fn parse_import_roles(&self, response: HttpResponse) -> Result<Message> {
        parse_message(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::ok;
    use super::*;
    use crate::http::RequestBody;

    fn client() -> AdminClient {
        AdminClient::new("http://localhost:28080/convertigo")
    }

    #[test]
    fn list_users_with_roles() {
        let resp = ok(r#"<admin service="roles.List"><users>
            <user name="alice"><role name="WEB_ADMIN"/><role name="PROJECTS_VIEW"/></user>
            <user name="bob"/>
        </users></admin>"#);
        let users = client().parse_list_roles(resp, &[]).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].roles, ["WEB_ADMIN", "PROJECTS_VIEW"]);
        assert!(users[1].roles.is_empty());
    }

    #[test]
    fn list_filtered() {
        let resp = ok(r#"<admin><users><user name="alice"/><user name="bob"/></users></admin>"#);
        let users = client().parse_list_roles(resp, &["bob"]).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "bob");
    }

    #[test]
    fn add_repeats_roles_field() {
        let req = client().build_add_user("alice", "pw", &["WEB_ADMIN", "PROJECTS_VIEW"]);
        assert_eq!(
            req.body,
            RequestBody::Form(vec![
                ("username".into(), "alice".into()),
                ("password".into(), "pw".into()),
                ("roles".into(), "WEB_ADMIN".into()),
                ("roles".into(), "PROJECTS_VIEW".into()),
            ])
        );
    }

    #[test]
    fn edit_leads_with_old_username() {
        let req = client().build_edit_user("alice", "alicia", "", &[]);
        assert_eq!(
            req.body,
            RequestBody::Form(vec![
                ("oldUsername".into(), "alice".into()),
                ("username".into(), "alicia".into()),
                ("password".into(), "".into()),
            ])
        );
    }

    #[test]
    fn delete_all_has_no_body() {
        let req = client().build_delete_all_users();
        assert!(req.path.ends_with("roles.DeleteAll"));
        assert_eq!(req.body, RequestBody::Empty);
    }

    #[test]
    fn add_existing_user_fails() {
        let resp = ok(r#"<admin><response state="error" message="User 'alice' already exists"/></admin>"#);
        let err = client().parse_add_user(resp).unwrap_err();
        assert_eq!(err.to_string(), "User 'alice' already exists");
    }

    #[test]
    fn import_message() {
        let resp = ok(r#"<admin service="roles.Import"><message>The users file has been successfully imported.</message></admin>"#);
        let msg = client().parse_import_roles(resp).unwrap();
        assert_eq!(msg.as_str(), "The users file has been successfully imported.");
    }
}
