//! In-memory stand-in for the Convertigo admin services.
//!
//! Serves the same XML shapes as the real server under
//! `/convertigo/admin/services/*`, keeps all state in one `AdminState`
//! behind an `RwLock`, and requires the `JSESSIONID` cookie handed out by
//! `engine.Authenticate` on every other call.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Instant,
};

use axum::{
    extract::{Multipart, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "JSESSIONID";

const CERTIFICATE_EXTENSIONS: [&str; 4] = ["store", "p12", "pfx", "jks"];

#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Project {
    pub name: String,
    pub version: String,
    pub deploy_date: String,
    pub archive: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct CertificateConfig {
    pub name: String,
    pub kind: String,
    pub password: String,
    pub group: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Deserialize)]
struct UsersFile {
    users: Vec<User>,
}

pub struct AdminState {
    credentials: Credentials,
    sessions: HashSet<String>,
    started_at: Option<Instant>,
    /// (category, name, value) in display order.
    pub config: Vec<(String, String, String)>,
    pub symbols: Vec<(String, String)>,
    pub users: Vec<User>,
    pub projects: Vec<Project>,
    pub certificate_files: Vec<String>,
    pub certificates: Vec<CertificateConfig>,
    /// (certificate, project)
    pub mappings: Vec<(String, String)>,
    pub keys: Vec<String>,
}

impl AdminState {
    pub fn new(credentials: Credentials) -> Self {
        let config = [
            ("Main", "APPLICATION_SERVER_CONVERTIGO_URL", "http://localhost:28080/convertigo"),
            ("FullSync", "FULLSYNC_COUCH_URL", "http://localhost:5984"),
            ("FullSync", "FULLSYNC_COUCH_USERNAME", ""),
            ("FullSync", "FULLSYNC_COUCH_PASSWORD", ""),
            ("Logs", "LOG4J_LOGGER_CEMS", "INFO"),
        ]
        .into_iter()
        .map(|(c, n, v)| (c.to_string(), n.to_string(), v.to_string()))
        .collect();

        Self {
            credentials,
            sessions: HashSet::new(),
            started_at: Some(Instant::now()),
            config,
            symbols: Vec::new(),
            users: Vec::new(),
            projects: Vec::new(),
            certificate_files: Vec::new(),
            certificates: Vec::new(),
            mappings: Vec::new(),
            keys: Vec::new(),
        }
    }
}

pub type Db = Arc<RwLock<AdminState>>;

pub fn app() -> Router {
    app_with(Credentials::default())
}

pub fn app_with(credentials: Credentials) -> Router {
    let db: Db = Arc::new(RwLock::new(AdminState::new(credentials)));
    let services = Router::new()
        .route("/engine.Authenticate", post(authenticate))
        .route("/engine.GetStatus", post(engine_status))
        .route("/engine.Start", post(engine_start))
        .route("/engine.Stop", post(engine_stop))
        .route("/configuration.List", post(config_list))
        .route("/configuration.Update", post(config_update))
        .route("/projects.List", post(projects_list))
        .route("/projects.Deploy", post(projects_deploy))
        .route("/projects.Export", get(projects_export))
        .route("/certificates.List", post(certificates_list))
        .route("/certificates.Install", post(certificates_install))
        .route("/certificates.Add", post(certificates_add))
        .route("/certificates.Edit", post(certificates_edit))
        .route("/certificates.Configure", post(certificates_configure))
        .route("/certificates.Delete", post(certificates_delete))
        .route("/certificates.Remove", post(certificates_remove))
        .route("/certificates.mappings.Configure", post(certificates_mapping))
        .route("/global_symbols.List", post(symbols_list))
        .route("/global_symbols.Add", post(symbols_add))
        .route("/global_symbols.Edit", post(symbols_edit))
        .route("/global_symbols.Delete", post(symbols_delete))
        .route("/global_symbols.Import", post(symbols_import))
        .route("/roles.List", post(roles_list))
        .route("/roles.Add", post(roles_add))
        .route("/roles.Edit", post(roles_edit))
        .route("/roles.Delete", post(roles_delete))
        .route("/roles.DeleteAll", post(roles_delete_all))
        .route("/roles.Import", post(roles_import))
        .route("/keys.List", post(keys_list))
        .route("/keys.Update", post(keys_update))
        .route("/keys.Remove", post(keys_remove));
    Router::new()
        .nest("/convertigo/admin/services", services)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, credentials: Credentials) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(credentials)).await
}

// ---------------------------------------------------------------------------
// XML helpers
// ---------------------------------------------------------------------------

type Fields = Form<Vec<(String, String)>>;

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn xml(body: String) -> Response {
    ([(CONTENT_TYPE, "text/xml; charset=UTF-8")], body).into_response()
}

fn admin(service: &str, inner: &str) -> Response {
    xml(format!(r#"<admin service="{service}">{inner}</admin>"#))
}

fn message(service: &str, text: &str) -> Response {
    admin(service, &format!("<message><![CDATA[{text}]]></message>"))
}

fn inline_error(service: &str, text: &str) -> Response {
    admin(service, &format!("<error>{}</error>", escape(text)))
}

/// Root `<error>` document used by the servlet-level failure handler.
fn error_document(status: StatusCode, text: &str) -> Response {
    let body = format!(
        "<error><message>{}</message><exception>com.twinsoft.convertigo.engine.EngineException</exception><stacktrace/></error>",
        escape(text)
    );
    (status, [(CONTENT_TYPE, "text/xml; charset=UTF-8")], body).into_response()
}

fn state_response(service: &str, success: bool, text: &str) -> Response {
    let state = if success { "success" } else { "error" };
    admin(
        service,
        &format!(r#"<response state="{state}" message="{}"/>"#, escape(text)),
    )
}

fn field<'a>(fields: &'a [(String, String)], name: &str) -> &'a str {
    fields
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .unwrap_or_default()
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, id)| id.to_string())
}

async fn authorized(db: &Db, headers: &HeaderMap) -> Result<(), Response> {
    let logged_in = match session_id(headers) {
        Some(id) => db.read().await.sessions.contains(&id),
        None => false,
    };
    if logged_in {
        Ok(())
    } else {
        Err(error_document(StatusCode::UNAUTHORIZED, "Authentication required"))
    }
}

/// First multipart field carrying a file, as (file name, bytes).
async fn upload(mut multipart: Multipart) -> Option<(String, Vec<u8>)> {
    while let Ok(Some(part)) = multipart.next_field().await {
        let Some(name) = part.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = part.bytes().await.ok()?;
        return Some((name, bytes.to_vec()));
    }
    None
}

/// Attributes of every `element` in `body`, in document order.
fn element_attrs(body: &str, element: &str) -> Option<Vec<Vec<(String, String)>>> {
    let doc = roxmltree::Document::parse(body).ok()?;
    Some(
        doc.descendants()
            .filter(|n| n.has_tag_name(element))
            .map(|n| {
                n.attributes()
                    .map(|a| (a.name().to_string(), a.value().to_string()))
                    .collect()
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// engine
// ---------------------------------------------------------------------------

async fn authenticate(State(db): State<Db>, headers: HeaderMap, Form(fields): Fields) -> Response {
    const SERVICE: &str = "engine.Authenticate";
    match field(&fields, "authType") {
        "login" => {
            let mut state = db.write().await;
            let user = field(&fields, "authUserName");
            if user != state.credentials.username || field(&fields, "authPassword") != state.credentials.password {
                info!(user, "login rejected");
                return inline_error(SERVICE, "Invalid authentication!");
            }
            let id = Uuid::new_v4().simple().to_string();
            state.sessions.insert(id.clone());
            info!(user, "login");
            let cookie = format!("{SESSION_COOKIE}={id}; Path=/convertigo; HttpOnly");
            ([(SET_COOKIE, cookie)], admin(SERVICE, "<success/>")).into_response()
        }
        "logout" => {
            if let Some(id) = session_id(&headers) {
                db.write().await.sessions.remove(&id);
            }
            admin(SERVICE, "<success/>")
        }
        other => inline_error(SERVICE, &format!("Unknown authType '{other}'")),
    }
}

async fn engine_status(State(db): State<Db>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let state = db.read().await;
    let (engine_state, elapsed) = match state.started_at {
        Some(at) => ("started", at.elapsed().as_secs()),
        None => ("stopped", 0),
    };
    let (days, hours, minutes, seconds) = (
        elapsed / 86_400,
        elapsed % 86_400 / 3_600,
        elapsed % 3_600 / 60,
        elapsed % 60,
    );
    admin(
        "engine.GetStatus",
        &format!(
            r#"<version engine="8.0.0" product="Convertigo Mock"/><engineState>{engine_state}</engineState><runningElapse days="{days}" hours="{hours}" minutes="{minutes}" seconds="{seconds}">{days}d {hours}h {minutes}m {seconds}s</runningElapse>"#
        ),
    )
}

async fn engine_start(State(db): State<Db>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let mut state = db.write().await;
    if state.started_at.is_some() {
        return inline_error("engine.Start", "The Convertigo engine is already started.");
    }
    state.started_at = Some(Instant::now());
    message("engine.Start", "The Convertigo engine has been successfully started.")
}

async fn engine_stop(State(db): State<Db>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    db.write().await.started_at = None;
    message("engine.Stop", "The Convertigo engine has been successfully stopped.")
}

// ---------------------------------------------------------------------------
// configuration
// ---------------------------------------------------------------------------

async fn config_list(State(db): State<Db>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let state = db.read().await;
    let mut inner = String::new();
    let mut current: Option<&str> = None;
    for (category, name, value) in &state.config {
        if current != Some(category.as_str()) {
            if current.is_some() {
                inner.push_str("</category>");
            }
            inner.push_str(&format!(r#"<category name="{}">"#, escape(category)));
            current = Some(category.as_str());
        }
        inner.push_str(&format!(
            r#"<property name="{}" value="{}" description=""/>"#,
            escape(name),
            escape(value)
        ));
    }
    if current.is_some() {
        inner.push_str("</category>");
    }
    admin("configuration.List", &inner)
}

async fn config_update(State(db): State<Db>, headers: HeaderMap, body: String) -> Response {
    const SERVICE: &str = "configuration.Update";
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let Some(properties) = element_attrs(&body, "property") else {
        return error_document(StatusCode::BAD_REQUEST, "Unable to parse the configuration");
    };
    let mut state = db.write().await;
    let known = |attrs: &Vec<(String, String)>| {
        let key = field(attrs, "key");
        state.config.iter().any(|(_, name, _)| name == key)
    };
    if !properties.iter().all(known) {
        return admin(SERVICE, r#"<update status="unknown-property"/>"#);
    }
    for attrs in &properties {
        let key = field(attrs, "key");
        if let Some(entry) = state.config.iter_mut().find(|(_, name, _)| name == key) {
            entry.2 = field(attrs, "value").to_string();
        }
    }
    admin(SERVICE, r#"<update status="ok"/>"#)
}

// ---------------------------------------------------------------------------
// projects
// ---------------------------------------------------------------------------

async fn projects_list(State(db): State<Db>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let state = db.read().await;
    let projects: String = state
        .projects
        .iter()
        .map(|p| {
            format!(
                r#"<project comment="" deployDate="{}" exported="" name="{}" version="{}"/>"#,
                escape(&p.deploy_date),
                escape(&p.name),
                escape(&p.version)
            )
        })
        .collect();
    admin("projects.List", &format!("<projects>{projects}</projects>"))
}

async fn projects_deploy(State(db): State<Db>, headers: HeaderMap, multipart: Multipart) -> Response {
    const SERVICE: &str = "projects.Deploy";
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let Some((file_name, archive)) = upload(multipart).await else {
        return inline_error(SERVICE, "No file uploaded");
    };
    let Some(name) = file_name.strip_suffix(".car").filter(|n| !n.is_empty()) else {
        return inline_error(SERVICE, &format!("The deployment file '{file_name}' is not a .car archive"));
    };
    let project = Project {
        name: name.to_string(),
        version: String::new(),
        deploy_date: "now".to_string(),
        archive,
    };
    let mut state = db.write().await;
    state.projects.retain(|p| p.name != project.name);
    state.projects.push(project);
    debug!(project = name, "deployed");
    message(SERVICE, &format!("The project '{name}' has been successfully deployed."))
}

async fn projects_export(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let name = query.get("projectName").map(String::as_str).unwrap_or_default();
    let state = db.read().await;
    match state.projects.iter().find(|p| p.name == name) {
        Some(project) => (
            [
                (CONTENT_TYPE, "application/octet-stream".to_string()),
                (CONTENT_DISPOSITION, format!("attachment; filename=\"{name}.car\"")),
            ],
            project.archive.clone(),
        )
            .into_response(),
        None => error_document(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("The project '{name}' does not exist"),
        ),
    }
}

// ---------------------------------------------------------------------------
// certificates
// ---------------------------------------------------------------------------

async fn certificates_list(State(db): State<Db>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let state = db.read().await;
    let certificates: String = state
        .certificates
        .iter()
        .map(|c| {
            format!(
                r#"<certificate group="{}" name="{}" password="{}" type="{}" validPass="true"/>"#,
                escape(&c.group),
                escape(&c.name),
                escape(&c.password),
                escape(&c.kind)
            )
        })
        .collect();
    let candidates: String = state
        .certificate_files
        .iter()
        .filter(|file| !state.certificates.iter().any(|c| &c.name == *file))
        .map(|file| format!(r#"<candidate name="{}"/>"#, escape(file)))
        .collect();
    let bindings: String = state
        .mappings
        .iter()
        .map(|(cert, project)| {
            format!(
                r#"<binding certificateName="{}" targettedObject="projects" convProject="{}"/>"#,
                escape(cert),
                escape(project)
            )
        })
        .collect();
    admin(
        "certificates.List",
        &format!(
            "<certificates>{certificates}</certificates><candidates>{candidates}</candidates><bindings><anonymous>{bindings}</anonymous><carioca/></bindings>"
        ),
    )
}

async fn certificates_install(State(db): State<Db>, headers: HeaderMap, multipart: Multipart) -> Response {
    const SERVICE: &str = "certificates.Install";
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let Some((file_name, _)) = upload(multipart).await else {
        return inline_error(SERVICE, "No file uploaded");
    };
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    if !CERTIFICATE_EXTENSIONS.contains(&extension) {
        return inline_error(SERVICE, &format!("The extension \"{extension}\" isn't valid"));
    }
    let mut state = db.write().await;
    if !state.certificate_files.contains(&file_name) {
        state.certificate_files.push(file_name.clone());
    }
    message(SERVICE, &format!("The certificate \"{file_name}\" has been successfully uploaded"))
}

fn certificate_from(fields: &[(String, String)]) -> CertificateConfig {
    CertificateConfig {
        name: field(fields, "name_0").to_string(),
        kind: field(fields, "type_0").to_string(),
        password: field(fields, "pwd_0").to_string(),
        group: field(fields, "group_0").to_string(),
    }
}

async fn certificates_add(State(db): State<Db>, headers: HeaderMap, Form(fields): Fields) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let cert = certificate_from(&fields);
    let mut state = db.write().await;
    if state.certificates.iter().any(|c| c.name == cert.name) {
        return error_document(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Certificate {} already exists", cert.name),
        );
    }
    if !state.certificate_files.contains(&cert.name) {
        return error_document(
            StatusCode::INTERNAL_SERVER_ERROR,
            "You tried to configure an uninstalled certificate!",
        );
    }
    state.certificates.push(cert);
    message("certificates.Add", "The certificate has successfully been added.")
}

async fn certificates_edit(State(db): State<Db>, headers: HeaderMap, Form(fields): Fields) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let old_name = field(&fields, "oldName_0").to_string();
    let cert = certificate_from(&fields);
    let mut state = db.write().await;
    if !state.certificate_files.contains(&cert.name) {
        return error_document(
            StatusCode::INTERNAL_SERVER_ERROR,
            "You tried to configure an uninstalled certificate!",
        );
    }
    match state.certificates.iter_mut().find(|c| c.name == old_name) {
        Some(existing) => *existing = cert,
        None => {
            return error_document(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Certificate {old_name} didn't exist"),
            )
        }
    }
    message("certificates.Edit", "The certificate has successfully been edited.")
}

async fn certificates_configure(State(db): State<Db>, headers: HeaderMap, Form(fields): Fields) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let cert = certificate_from(&fields);
    let mut state = db.write().await;
    if !state.certificate_files.contains(&cert.name) {
        return error_document(
            StatusCode::INTERNAL_SERVER_ERROR,
            "You tried to configure an uninstalled certificate!",
        );
    }
    state.certificates.retain(|c| c.name != cert.name);
    state.certificates.push(cert);
    message("certificates.Configure", "The certificates have successfully been updated.")
}

async fn certificates_delete(State(db): State<Db>, headers: HeaderMap, Form(fields): Fields) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let name = field(&fields, "certificateName_1").to_string();
    let mut state = db.write().await;
    let before = state.certificates.len();
    state.certificates.retain(|c| c.name != name);
    if state.certificates.len() == before {
        return error_document(StatusCode::INTERNAL_SERVER_ERROR, &format!("Certificate {name} didn't exist"));
    }
    state.mappings.retain(|(cert, _)| *cert != name);
    message("certificates.Delete", &format!("Certificate {name} has successfully been deleted."))
}

async fn certificates_remove(State(db): State<Db>, headers: HeaderMap, Form(fields): Fields) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let name = field(&fields, "certificateName").to_string();
    let mut state = db.write().await;
    let before = state.certificate_files.len();
    state.certificate_files.retain(|file| *file != name);
    if state.certificate_files.len() == before {
        return error_document(StatusCode::INTERNAL_SERVER_ERROR, &format!("Certificate {name} didn't exist"));
    }
    state.certificates.retain(|c| c.name != name);
    state.mappings.retain(|(cert, _)| *cert != name);
    message("certificates.Remove", &format!("Certificate {name} has successfully been removed."))
}

async fn certificates_mapping(State(db): State<Db>, headers: HeaderMap, Form(fields): Fields) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let cert = field(&fields, "cert_0").to_string();
    let project = field(&fields, "convProject_0").to_string();
    let mut state = db.write().await;
    if !state.certificates.iter().any(|c| c.name == cert) {
        return error_document(
            StatusCode::INTERNAL_SERVER_ERROR,
            "You tried to configure an uninstalled certificate!",
        );
    }
    state.mappings.retain(|(_, p)| *p != project);
    state.mappings.push((cert, project));
    message("certificates.mappings.Configure", "The mappings have successfully been updated.")
}

// ---------------------------------------------------------------------------
// global symbols
// ---------------------------------------------------------------------------

async fn symbols_list(State(db): State<Db>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let state = db.read().await;
    let symbols: String = state
        .symbols
        .iter()
        .map(|(name, value)| format!(r#"<symbol name="{}" value="{}"/>"#, escape(name), escape(value)))
        .collect();
    admin("global_symbols.List", &format!("<symbols>{symbols}</symbols>"))
}

async fn symbols_add(State(db): State<Db>, headers: HeaderMap, Form(fields): Fields) -> Response {
    const SERVICE: &str = "global_symbols.Add";
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let name = field(&fields, "symbolName").to_string();
    let value = field(&fields, "symbolValue").to_string();
    let mut state = db.write().await;
    if state.symbols.iter().any(|(n, _)| *n == name) {
        return state_response(SERVICE, false, &format!("Global symbol '{name}' already exists."));
    }
    state.symbols.push((name.clone(), value));
    state_response(SERVICE, true, &format!("Global symbol '{name}' have been successfully declared!"))
}

async fn symbols_edit(State(db): State<Db>, headers: HeaderMap, Form(fields): Fields) -> Response {
    const SERVICE: &str = "global_symbols.Edit";
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let old_name = field(&fields, "oldSymbolName").to_string();
    let name = field(&fields, "symbolName").to_string();
    let value = field(&fields, "symbolValue").to_string();
    let mut state = db.write().await;
    if old_name != name && state.symbols.iter().any(|(n, _)| *n == name) {
        return state_response(SERVICE, false, &format!("Global symbol '{name}' already exists."));
    }
    match state.symbols.iter_mut().find(|(n, _)| *n == old_name) {
        Some(entry) => *entry = (name.clone(), value),
        None => return state_response(SERVICE, false, &format!("Global symbol '{old_name}' doesn't exist.")),
    }
    state_response(SERVICE, true, &format!("Global symbol '{name}' have been successfully edited!"))
}

async fn symbols_delete(State(db): State<Db>, headers: HeaderMap, Form(fields): Fields) -> Response {
    const SERVICE: &str = "global_symbols.Delete";
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let name = field(&fields, "symbolName").to_string();
    let mut state = db.write().await;
    let before = state.symbols.len();
    state.symbols.retain(|(n, _)| *n != name);
    if state.symbols.len() == before {
        return state_response(SERVICE, false, &format!("Global symbol '{name}' doesn't exist."));
    }
    state_response(SERVICE, true, &format!("Global symbol '{name}' have been successfully deleted!"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ImportMode {
    Clear,
    KeepServer,
    KeepImport,
}

fn import_mode(query: &HashMap<String, String>) -> Option<ImportMode> {
    match (
        query.get("action-import").map(String::as_str),
        query.get("priority").map(String::as_str),
    ) {
        (Some("clear-import"), _) => Some(ImportMode::Clear),
        (Some(_), Some("priority-server")) => Some(ImportMode::KeepServer),
        (Some(_), Some("priority-import")) => Some(ImportMode::KeepImport),
        _ => None,
    }
}

/// Merge `incoming` into `existing` by key according to `mode`.
fn merge<T>(existing: &mut Vec<T>, incoming: Vec<T>, mode: ImportMode, key: impl Fn(&T) -> &str) {
    if mode == ImportMode::Clear {
        existing.clear();
    }
    for item in incoming {
        match existing.iter().position(|e| key(e) == key(&item)) {
            Some(index) if mode == ImportMode::KeepImport => existing[index] = item,
            Some(_) => {}
            None => existing.push(item),
        }
    }
}

fn parse_properties(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| line.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

async fn symbols_import(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> Response {
    const SERVICE: &str = "global_symbols.Import";
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let Some(mode) = import_mode(&query) else {
        return inline_error(SERVICE, "Missing import action");
    };
    let Some((_, bytes)) = upload(multipart).await else {
        return inline_error(SERVICE, "No file uploaded");
    };
    let incoming = parse_properties(&String::from_utf8_lossy(&bytes));
    let mut state = db.write().await;
    merge(&mut state.symbols, incoming, mode, |(name, _)| name.as_str());
    message(SERVICE, "The global symbols file has been successfully imported.")
}

// ---------------------------------------------------------------------------
// roles
// ---------------------------------------------------------------------------

async fn roles_list(State(db): State<Db>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let state = db.read().await;
    let users: String = state
        .users
        .iter()
        .map(|user| {
            let roles: String = user
                .roles
                .iter()
                .map(|role| format!(r#"<role name="{}"/>"#, escape(role)))
                .collect();
            format!(r#"<user name="{}">{roles}</user>"#, escape(&user.name))
        })
        .collect();
    admin("roles.List", &format!("<users>{users}</users>"))
}

fn user_from(fields: &[(String, String)]) -> User {
    User {
        name: field(fields, "username").to_string(),
        password: field(fields, "password").to_string(),
        roles: fields
            .iter()
            .filter(|(k, _)| k == "roles")
            .map(|(_, v)| v.clone())
            .collect(),
    }
}

async fn roles_add(State(db): State<Db>, headers: HeaderMap, Form(fields): Fields) -> Response {
    const SERVICE: &str = "roles.Add";
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let user = user_from(&fields);
    if user.name.is_empty() {
        return state_response(SERVICE, false, "The username is empty");
    }
    let mut state = db.write().await;
    if state.users.iter().any(|u| u.name == user.name) {
        return state_response(SERVICE, false, &format!("User '{}' already exists", user.name));
    }
    let text = format!("User '{}' have been successfully declared!", user.name);
    state.users.push(user);
    state_response(SERVICE, true, &text)
}

async fn roles_edit(State(db): State<Db>, headers: HeaderMap, Form(fields): Fields) -> Response {
    const SERVICE: &str = "roles.Edit";
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let old_name = field(&fields, "oldUsername").to_string();
    let mut user = user_from(&fields);
    let mut state = db.write().await;
    if old_name != user.name && state.users.iter().any(|u| u.name == user.name) {
        return state_response(SERVICE, false, &format!("User '{}' already exists", user.name));
    }
    let Some(existing) = state.users.iter_mut().find(|u| u.name == old_name) else {
        return state_response(SERVICE, false, &format!("User '{old_name}' doesn't exist"));
    };
    if user.password.is_empty() {
        user.password = existing.password.clone();
    }
    let text = format!("User '{}' have been successfully edited!", user.name);
    *existing = user;
    state_response(SERVICE, true, &text)
}

async fn roles_delete(State(db): State<Db>, headers: HeaderMap, Form(fields): Fields) -> Response {
    const SERVICE: &str = "roles.Delete";
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let name = field(&fields, "username").to_string();
    let mut state = db.write().await;
    let before = state.users.len();
    state.users.retain(|u| u.name != name);
    if state.users.len() == before {
        return state_response(SERVICE, false, &format!("User '{name}' doesn't exist"));
    }
    state_response(SERVICE, true, &format!("User '{name}' have been successfully deleted!"))
}

async fn roles_delete_all(State(db): State<Db>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    db.write().await.users.clear();
    state_response("roles.DeleteAll", true, "All users have been successfully deleted!")
}

async fn roles_import(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> Response {
    const SERVICE: &str = "roles.Import";
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let Some(mode) = import_mode(&query) else {
        return inline_error(SERVICE, "Missing import action");
    };
    let Some((_, bytes)) = upload(multipart).await else {
        return inline_error(SERVICE, "No file uploaded");
    };
    let Ok(file) = serde_json::from_slice::<UsersFile>(&bytes) else {
        return inline_error(SERVICE, "The users file is not valid JSON");
    };
    let mut state = db.write().await;
    merge(&mut state.users, file.users, mode, |user| user.name.as_str());
    message(SERVICE, "The users file has been successfully imported.")
}

// ---------------------------------------------------------------------------
// keys
// ---------------------------------------------------------------------------

fn key_is_well_formed(key: &str) -> bool {
    key.encode_utf16().count() == 33
}

async fn keys_list(State(db): State<Db>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let state = db.read().await;
    let keys: String = state
        .keys
        .iter()
        .map(|key| {
            format!(
                r#"<key evaluation="false" expiration="0" expired="false" text="{}" value="5"/>"#,
                escape(key)
            )
        })
        .collect();
    let total = state.keys.len() * 5;
    admin(
        "keys.List",
        &format!(
            r#"<category name="Standard" overflow="false" remaining="{total}" total="{total}"><keys>{keys}</keys></category><nb_valid_key>{}</nb_valid_key>"#,
            state.keys.len()
        ),
    )
}

fn submitted_keys(body: &str) -> Option<Vec<String>> {
    let keys = element_attrs(body, "key")?;
    Some(keys.iter().map(|attrs| field(attrs, "text").to_string()).collect())
}

fn key_line(text: &str, error: Option<&str>) -> String {
    match error {
        Some(msg) => format!(
            r#"<key errorMessage="{}" text="{}" valid="false"/>"#,
            escape(msg),
            escape(text)
        ),
        None => format!(r#"<key text="{}" valid="true"/>"#, escape(text)),
    }
}

async fn keys_update(State(db): State<Db>, headers: HeaderMap, body: String) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let Some(keys) = submitted_keys(&body) else {
        return error_document(StatusCode::BAD_REQUEST, "Unable to parse the keys");
    };
    let mut state = db.write().await;
    let mut lines = String::new();
    for key in keys {
        let error = if !key_is_well_formed(&key) {
            Some("The key is not valid!")
        } else if state.keys.contains(&key) {
            Some("The key has already been added!")
        } else {
            state.keys.push(key.clone());
            None
        };
        lines.push_str(&key_line(&key, error));
    }
    admin("keys.Update", &format!("<keys>{lines}</keys>"))
}

async fn keys_remove(State(db): State<Db>, headers: HeaderMap, body: String) -> Response {
    if let Err(resp) = authorized(&db, &headers).await {
        return resp;
    }
    let Some(keys) = submitted_keys(&body) else {
        return error_document(StatusCode::BAD_REQUEST, "Unable to parse the keys");
    };
    let mut state = db.write().await;
    let mut lines = String::new();
    for key in keys {
        let before = state.keys.len();
        state.keys.retain(|k| *k != key);
        let error = (state.keys.len() == before).then_some("The key doesn't exist!");
        lines.push_str(&key_line(&key, error));
    }
    admin("keys.Remove", &format!("<keys>{lines}</keys>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn import_modes_from_query() {
        assert_eq!(import_mode(&query(&[("action-import", "clear-import")])), Some(ImportMode::Clear));
        assert_eq!(
            import_mode(&query(&[("action-import", ""), ("priority", "priority-server")])),
            Some(ImportMode::KeepServer)
        );
        assert_eq!(
            import_mode(&query(&[("action-import", ""), ("priority", "priority-import")])),
            Some(ImportMode::KeepImport)
        );
        assert_eq!(import_mode(&query(&[])), None);
    }

    #[test]
    fn merge_respects_priority() {
        let pair = |n: &str, v: &str| (n.to_string(), v.to_string());
        fn key(p: &(String, String)) -> &str {
            p.0.as_str()
        }

        let mut existing = vec![pair("a", "server"), pair("b", "server")];
        merge(&mut existing, vec![pair("a", "file"), pair("c", "file")], ImportMode::KeepServer, key);
        assert_eq!(existing, vec![pair("a", "server"), pair("b", "server"), pair("c", "file")]);

        let mut existing = vec![pair("a", "server")];
        merge(&mut existing, vec![pair("a", "file")], ImportMode::KeepImport, key);
        assert_eq!(existing, vec![pair("a", "file")]);

        let mut existing = vec![pair("a", "server"), pair("b", "server")];
        merge(&mut existing, vec![pair("c", "file")], ImportMode::Clear, key);
        assert_eq!(existing, vec![pair("c", "file")]);
    }

    #[test]
    fn properties_skip_comments_and_blanks() {
        let parsed = parse_properties("# comment\n\nenv=prod\n! other\nurl = http://x\n");
        assert_eq!(
            parsed,
            vec![
                ("env".to_string(), "prod".to_string()),
                ("url".to_string(), "http://x".to_string())
            ]
        );
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "route=1; JSESSIONID=abc".parse().unwrap());
        assert_eq!(session_id(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn escape_quotes_and_markup() {
        assert_eq!(escape(r#"<a href="x">&"#), "&lt;a href=&quot;x&quot;&gt;&amp;");
    }
}
