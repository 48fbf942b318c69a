//! Certificate stores, their configuration and project mappings
//! (`certificates.*`).
//!
//! Two failure shapes coexist here: `.Install` answers `<admin><error>` while
//! the form-based operations answer a root `<error><message>` document. Both
//! are handled by `parse_message`.

use super::{admin_root, inline_error, name_allowed, parse_message, AdminClient};
use crate::error::{AdminError, Result};
use crate::http::{Attachment, HttpRequest, HttpResponse};
use crate::types::{Certificate, CertificateBinding, CertificateInventory, Message};

const BINDING_SCOPES: [&str; 2] = ["anonymous", "carioca"];

fn indexed_form(cert: &Certificate) -> Vec<(String, String)> {
    vec![
        ("name_0".to_string(), cert.name.clone()),
        ("type_0".to_string(), cert.kind.clone()),
        ("pwd_0".to_string(), cert.password.clone()),
        ("group_0".to_string(), cert.group.clone()),
    ]
}

impl AdminClient {
    pub fn build_list_certificates(&self) -> HttpRequest {
        self.post("certificates.List")
    }

    pub fn parse_list_certificates(
        &self,
        response: HttpResponse,
        names: &[&str],
    ) -> Result<CertificateInventory> {
        let root = admin_root(&response)?;
        if let Some(error) = inline_error(&root) {
            return Err(AdminError::Domain(error));
        }

        let mut inventory = CertificateInventory::default();
        for cert in root.descend(&["certificates", "certificate"]) {
            let name = cert.required_attr("name")?;
            if name_allowed(names, name) {
                inventory.certificates.push(Certificate {
                    name: name.to_string(),
                    kind: cert.attr_or_empty("type"),
                    password: cert.attr_or_empty("password"),
                    group: cert.attr_or_empty("group"),
                    valid_pass: cert.attr("validPass") == Some("true"),
                });
            }
        }
        for candidate in root.descend(&["candidates", "candidate"]) {
            let name = candidate.required_attr("name")?;
            if name_allowed(names, name) {
                inventory.candidates.push(name.to_string());
            }
        }
        for scope in BINDING_SCOPES {
            for binding in root.descend(&["bindings", scope, "binding"]) {
                let cert_name = binding.required_attr("certificateName")?;
                if name_allowed(names, cert_name) {
                    inventory.bindings.push(CertificateBinding {
                        certificate_name: cert_name.to_string(),
                        scope: scope.to_string(),
                        target: binding.attr_or_empty("targettedObject"),
                        project: binding.attr_or_empty("convProject"),
                    });
                }
            }
        }
        Ok(inventory)
    }

    pub fn build_install_certificate(&self, store: Attachment) -> HttpRequest {
        self.post("certificates.Install").file(store)
    }

    pub fn parse_install_certificate(&self, response: HttpResponse) -> Result<Message> {
        parse_message(&response)
    }

    pub fn build_add_certificate(&self, cert: &Certificate) -> HttpRequest {
        self.post("certificates.Add").form(indexed_form(cert))
    }

    pub fn parse_add_certificate(&self, response: HttpResponse) -> Result<Message> {
        parse_message(&response)
    }

    pub fn build_edit_certificate(&self, old_name: &str, cert: &Certificate) -> HttpRequest {
        let mut form = vec![("oldName_0".to_string(), old_name.to_string())];
        form.extend(indexed_form(cert));
        self.post("certificates.Edit").form(form)
    }

    pub fn parse_edit_certificate(&self, response: HttpResponse) -> Result<Message> {
        parse_message(&response)
    }

    pub fn build_configure_certificate(&self, cert: &Certificate) -> HttpRequest {
        self.post("certificates.Configure").form(indexed_form(cert))
    }

    pub fn parse_configure_certificate(&self, response: HttpResponse) -> Result<Message> {
        parse_message(&response)
    }

    /// Drops the certificate configuration; the store file stays.
    pub fn build_delete_certificate(&self, name: &str) -> HttpRequest {
        self.post("certificates.Delete").form([("certificateName_1", name)])
    }

    pub fn parse_delete_certificate(&self, response: HttpResponse) -> Result<Message> {
        parse_message(&response)
    }

    /// Drops the store file itself.
    pub fn build_remove_certificate(&self, name: &str) -> HttpRequest {
        self.post("certificates.Remove").form([("certificateName", name)])
    }

    pub fn parse_remove_certificate(&self, response: HttpResponse) -> Result<Message> {
        parse_message(&response)
    }

    pub fn build_configure_mapping(&self, cert_name: &str, project: &str) -> HttpRequest {
        self.post("certificates.mappings.Configure").form([
            ("targettedObject_0", "projects"),
            ("cert_0", cert_name),
            ("convProject_0", project),
        ])
    }

    pub fn parse_configure_mapping(&self, response: HttpResponse) -> Result<Message> {
        parse_message(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{ok, status};
    use super::*;
    use crate::http::RequestBody;

    const LIST: &str = r#"<admin service="certificates.List">
        <certificates>
            <certificate group="" name="test.store" password="secret" type="server" validPass="true"/>
            <certificate group="g" name="client.p12" password="" type="client" validPass="false"/>
        </certificates>
        <candidates><candidate name="cacerts.store"/></candidates>
        <bindings>
            <anonymous><binding certificateName="test.store" targettedObject="projects" convProject="TestProject"/></anonymous>
            <carioca/>
        </bindings>
    </admin>"#;

    fn client() -> AdminClient {
        AdminClient::new("http://localhost:28080/convertigo")
    }

    fn cert() -> Certificate {
        Certificate {
            name: "test.store".into(),
            kind: "server".into(),
            password: "secret".into(),
            group: "".into(),
            valid_pass: false,
        }
    }

    #[test]
    fn list_full_inventory() {
        let inv = client().parse_list_certificates(ok(LIST), &[]).unwrap();
        assert_eq!(inv.certificates.len(), 2);
        assert_eq!(inv.certificates[0].kind, "server");
        assert!(inv.certificates[0].valid_pass);
        assert!(!inv.certificates[1].valid_pass);
        assert_eq!(inv.candidates, ["cacerts.store"]);
        assert_eq!(inv.bindings.len(), 1);
        assert_eq!(inv.bindings[0].scope, "anonymous");
        assert_eq!(inv.bindings[0].project, "TestProject");
    }

    #[test]
    fn list_filter_applies_to_every_section() {
        let inv = client().parse_list_certificates(ok(LIST), &["test.store"]).unwrap();
        assert_eq!(inv.certificates.len(), 1);
        assert!(inv.candidates.is_empty());
        assert_eq!(inv.bindings.len(), 1);
    }

    #[test]
    fn list_with_empty_containers() {
        let inv = client()
            .parse_list_certificates(ok("<admin><certificates/><candidates/><bindings><anonymous/></bindings></admin>"), &[])
            .unwrap();
        assert_eq!(inv, CertificateInventory::default());
    }

    #[test]
    fn configure_uses_indexed_form() {
        let req = client().build_configure_certificate(&cert());
        assert!(req.path.ends_with("/admin/services/certificates.Configure"));
        assert_eq!(
            req.body,
            RequestBody::Form(vec![
                ("name_0".into(), "test.store".into()),
                ("type_0".into(), "server".into()),
                ("pwd_0".into(), "secret".into()),
                ("group_0".into(), "".into()),
            ])
        );
    }

    #[test]
    fn edit_carries_old_name() {
        let req = client().build_edit_certificate("old.store", &cert());
        match req.body {
            RequestBody::Form(fields) => {
                assert_eq!(fields[0], ("oldName_0".to_string(), "old.store".to_string()));
                assert_eq!(fields.len(), 5);
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn delete_and_remove_use_different_fields() {
        let delete = client().build_delete_certificate("test.store");
        assert_eq!(
            delete.body,
            RequestBody::Form(vec![("certificateName_1".into(), "test.store".into())])
        );
        let remove = client().build_remove_certificate("test.store");
        assert_eq!(
            remove.body,
            RequestBody::Form(vec![("certificateName".into(), "test.store".into())])
        );
    }

    #[test]
    fn mapping_form() {
        let req = client().build_configure_mapping("test.store", "TestProject");
        assert!(req.path.ends_with("certificates.mappings.Configure"));
        assert_eq!(
            req.body,
            RequestBody::Form(vec![
                ("targettedObject_0".into(), "projects".into()),
                ("cert_0".into(), "test.store".into()),
                ("convProject_0".into(), "TestProject".into()),
            ])
        );
    }

    #[test]
    fn delete_failure_document() {
        let err = client()
            .parse_delete_certificate(status(
                500,
                "<error><message>Certificate test.store didn't exist</message><exception>e</exception><stacktrace>s</stacktrace></error>",
            ))
            .unwrap_err();
        assert_eq!(err.to_string(), "Certificate test.store didn't exist");
    }

    #[test]
    fn install_success_message() {
        let msg = client()
            .parse_install_certificate(ok(
                "<admin service=\"certificates.Install\"><message>The certificate \"test.store\" has been successfully uploaded</message></admin>",
            ))
            .unwrap();
        assert!(msg.as_str().contains("successfully uploaded"));
    }
}
