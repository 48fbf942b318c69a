//! End-to-end scenarios against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port, then drives it through
//! `AdminService` with the real `reqwest` transport. This validates request
//! building, cookie handling, multipart uploads, attachment streaming and
//! response parsing together.

use convertigo_admin::{
    AdminError, AdminService, Attachment, Connection, EngineState, GlobalSymbol, ImportMode, TransportConfig,
};

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}/convertigo")
}

async fn logged_in() -> (AdminService, Connection) {
    let base = start_server().await;
    let service = AdminService::new(TransportConfig::default()).unwrap();
    let mut con = Connection::new(base, "admin", "admin");
    service.engine().login(&mut con).await.unwrap();
    (service, con)
}

#[tokio::test]
async fn login_and_logout() {
    let base = start_server().await;
    let service = AdminService::new(TransportConfig::default()).unwrap();

    let mut bad = Connection::new(base.clone(), "admin", "wrong");
    let err = service.engine().login(&mut bad).await.unwrap_err();
    assert!(matches!(err, AdminError::Auth(_)), "got {err:?}");
    assert!(!bad.is_logged_in());

    let mut con = Connection::new(base, "admin", "admin");
    service.engine().login(&mut con).await.unwrap();
    assert!(con.session_cookie().unwrap().starts_with("JSESSIONID="));

    let status = service.engine().status(&con).await.unwrap();
    assert_eq!(status.version, "8.0.0");

    service.engine().logout(&mut con).await.unwrap();
    assert!(!con.is_logged_in());

    // Without the cookie the server answers with a root error document.
    let err = service.global_symbols().list(&con, &[]).await.unwrap_err();
    assert_eq!(err.server_message(), Some("Authentication required"));
}

#[tokio::test]
async fn engine_restart_keeps_it_running() {
    let (service, con) = logged_in().await;
    service.engine().restart(&con).await.unwrap();
    let status = service.engine().status(&con).await.unwrap();
    assert_eq!(status.state, EngineState::Started);

    service.engine().stop(&con).await.unwrap();
    let status = service.engine().status(&con).await.unwrap();
    assert_eq!(status.state, EngineState::Stopped);
    assert_eq!((status.uptime.days, status.uptime.hours, status.uptime.minutes), (0, 0, 0));
}

#[tokio::test]
async fn added_symbol_is_listed_and_cannot_be_added_twice() {
    let (service, con) = logged_in().await;
    let symbols = service.global_symbols();

    symbols.add(&con, "test", "test").await.unwrap();
    let listed = symbols.list(&con, &[]).await.unwrap();
    assert!(listed.contains(&GlobalSymbol {
        name: "test".to_string(),
        value: "test".to_string(),
    }));

    let err = symbols.add(&con, "test", "test").await.unwrap_err();
    assert!(matches!(err, AdminError::Domain(_)), "got {err:?}");
}

#[tokio::test]
async fn global_symbols_lifecycle() {
    let (service, con) = logged_in().await;
    let symbols = service.global_symbols();

    symbols.add(&con, "test", "value").await.unwrap();
    let err = symbols.add(&con, "test", "value").await.unwrap_err();
    assert_eq!(err.to_string(), "Global symbol 'test' already exists.");

    symbols.update(&con, "test", "changed").await.unwrap();
    symbols.rename(&con, "test", "renamed").await.unwrap();
    let found = symbols.get(&con, "renamed").await.unwrap();
    assert_eq!(found.value, "changed");

    let err = symbols.get(&con, "test").await.unwrap_err();
    assert!(matches!(err, AdminError::NotFound { .. }));

    symbols.delete(&con, "renamed").await.unwrap();
    assert!(symbols.list(&con, &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn global_symbols_import_modes() {
    let (service, con) = logged_in().await;
    let symbols = service.global_symbols();
    symbols.add(&con, "env", "server").await.unwrap();

    let file = || Attachment::new("symbols.properties", "env=file\nextra=1\n");
    symbols.merge_priority_server(&con, file()).await.unwrap();
    assert_eq!(symbols.get(&con, "env").await.unwrap().value, "server");
    assert_eq!(symbols.get(&con, "extra").await.unwrap().value, "1");

    symbols.import(&con, file(), ImportMode::MergePriorityImport).await.unwrap();
    assert_eq!(symbols.get(&con, "env").await.unwrap().value, "file");

    symbols.add(&con, "stale", "x").await.unwrap();
    symbols.clear_import(&con, file()).await.unwrap();
    let names: Vec<String> = symbols.list(&con, &[]).await.unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["env", "extra"]);
}

#[tokio::test]
async fn deploy_list_and_export_project() {
    let (service, con) = logged_in().await;
    let projects = service.projects();

    let archive = Attachment::new("TestProject.car", b"PK\x03\x04demo".to_vec());
    let msg = projects.deploy(&con, archive).await.unwrap();
    assert!(msg.as_str().contains("TestProject"));

    let listed = projects.list(&con, &[]).await.unwrap();
    assert!(listed.iter().any(|project| project.name == "TestProject"));

    let filtered = projects.list(&con, &["TestProject"]).await.unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name, "TestProject");

    let dir = tempfile::tempdir().unwrap();
    let exported = projects.export(&con, "TestProject", dir.path()).await.unwrap();
    assert_eq!(exported.path, dir.path().join("TestProject.car"));
    assert_eq!(std::fs::read(&exported.path).unwrap(), b"PK\x03\x04demo");

    let err = projects.export(&con, "Missing", dir.path()).await.unwrap_err();
    assert_eq!(err.to_string(), "The project 'Missing' does not exist");
}

#[tokio::test]
async fn configuration_update_round_trip() {
    let (service, con) = logged_in().await;
    service
        .config()
        .update(&con, &[("FULLSYNC_COUCH_URL", "http://couch:5984")])
        .await
        .unwrap();
    let props = service.config().list(&con, &["FULLSYNC_COUCH_URL"]).await.unwrap();
    assert_eq!(props.len(), 1);
    assert_eq!(props[0].category, "FullSync");
    assert_eq!(props[0].value, "http://couch:5984");

    let err = service.config().update(&con, &[("NOT_A_KEY", "x")]).await.unwrap_err();
    assert_eq!(err.to_string(), "Bad response status: unknown-property");
}

#[tokio::test]
async fn user_roles_lifecycle() {
    let (service, con) = logged_in().await;
    let roles = service.roles();

    roles.add(&con, "alice", "pw", &["WEB_ADMIN", "TEST_PLATFORM"]).await.unwrap();
    let err = roles.add(&con, "alice", "pw", &[]).await.unwrap_err();
    assert!(matches!(err, AdminError::Domain(_)));

    roles.edit(&con, "alice", "alice", "", &["WEB_ADMIN"]).await.unwrap();
    assert_eq!(roles.get(&con, "alice").await.unwrap().roles, vec!["WEB_ADMIN"]);

    let file = Attachment::new(
        "users.json",
        r#"{"users":[{"name":"bob","password":"pw","roles":["WEB_VIEWER"]}]}"#,
    );
    roles.clear_import(&con, file).await.unwrap();
    let names: Vec<String> = roles.list(&con, &[]).await.unwrap().into_iter().map(|u| u.name).collect();
    assert_eq!(names, vec!["bob"]);

    roles.delete(&con, "bob").await.unwrap();
    assert!(roles.delete(&con, "bob").await.is_err());

    roles.add(&con, "carol", "pw", &[]).await.unwrap();
    roles.delete_all(&con).await.unwrap();
    assert!(roles.list(&con, &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn certificate_lifecycle() {
    let (service, con) = logged_in().await;
    let certs = service.certificates();

    let err = certs.install(&con, Attachment::new("notes.txt", "x")).await.unwrap_err();
    assert!(err.to_string().contains("isn't valid"));

    certs.install(&con, Attachment::new("client.p12", vec![0u8; 4])).await.unwrap();
    assert_eq!(certs.list(&con, &[]).await.unwrap().candidates, vec!["client.p12"]);

    let cert = convertigo_admin::Certificate {
        name: "client.p12".to_string(),
        kind: "client".to_string(),
        password: "secret".to_string(),
        group: String::new(),
        valid_pass: false,
    };
    certs.add(&con, &cert).await.unwrap();
    assert!(certs.add(&con, &cert).await.is_err());

    service
        .projects()
        .deploy(&con, Attachment::new("Secured.car", "PK"))
        .await
        .unwrap();
    certs.configure_mapping(&con, "client.p12", "Secured").await.unwrap();

    let inventory = certs.list(&con, &["client.p12"]).await.unwrap();
    assert_eq!(inventory.certificates.len(), 1);
    assert!(inventory.candidates.is_empty());
    assert_eq!(inventory.bindings[0].project, "Secured");

    certs.delete(&con, "client.p12").await.unwrap();
    let err = certs.get(&con, "client.p12").await.unwrap_err();
    assert_eq!(err.to_string(), "certificate does not exist: client.p12");

    certs.remove(&con, "client.p12").await.unwrap();
    assert_eq!(certs.list(&con, &[]).await.unwrap(), Default::default());
}

#[tokio::test]
async fn license_keys() {
    let (service, con) = logged_in().await;
    let keys = service.keys();
    let good = "38CE723612053DF4-8505DDDF26664A50";

    let report = keys.update(&con, &[good, "short"]).await.unwrap();
    assert_eq!(report.outcomes.len(), 2);
    assert!(report.outcomes[0].valid);
    assert!(!report.outcomes[1].valid);

    let err = keys.update(&con, &[good]).await.unwrap_err();
    assert_eq!(err.to_string(), "Error: The key has already been added!");

    let listed = keys.list(&con).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].text, good);

    keys.remove(&con, &[good]).await.unwrap();
    assert!(keys.list(&con).await.unwrap().is_empty());
}
