//! Sample service exercising every routing feature: literal paths, path
//! variables, query and form parameters, JSON bodies and an intercepted
//! route.

use crate::dispatcher::{HandlerRequest, HandlerResult, Reply};
use crate::error::{RegisterError, ServiceError};
use crate::methods::{GET, POST};
use crate::middleware::{InterceptorError, Session};
use crate::router::RouteTable;
use serde::{Deserialize, Serialize};
use tracing::info;

const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

fn zero_time() -> String {
    ZERO_TIME.to_string()
}

/// Body accepted by `POST /api/createinfoPOSTjson`.
///
/// Missing fields take their defaults and unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoRequest {
    pub userid: String,
    pub anrede: String,
    pub title: String,
    pub vorname: String,
    pub nachname: String,
    pub exported: bool,
    pub kartennr: String,
    pub vertragsnr: String,
    pub tarif: String,
    pub mobilnr: String,
    pub email: String,
    pub plz: String,
    pub ort: String,
    pub strhausnr: String,
    /// RFC 3339 timestamp
    pub ts: String,
}

impl Default for InfoRequest {
    fn default() -> Self {
        Self {
            userid: String::new(),
            anrede: String::new(),
            title: String::new(),
            vorname: String::new(),
            nachname: String::new(),
            exported: false,
            kartennr: String::new(),
            vertragsnr: String::new(),
            tarif: String::new(),
            mobilnr: String::new(),
            email: String::new(),
            plz: String::new(),
            ort: String::new(),
            strhausnr: String::new(),
            ts: zero_time(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoResponse {
    pub userid: String,
    pub anrede: String,
    pub title: String,
    pub vorname: String,
    pub nachname: String,
    pub exported: bool,
    pub kartennr: String,
    pub vertragsnr: String,
    pub tarif: String,
    pub mobilnr: String,
    pub email: String,
    pub plz: String,
    pub ort: String,
    pub strhausnr: String,
    pub ts: String,
}

impl InfoResponse {
    fn person(userid: &str, anrede: &str, vorname: &str, nachname: &str) -> Self {
        Self {
            userid: userid.to_string(),
            anrede: anrede.to_string(),
            title: String::new(),
            vorname: vorname.to_string(),
            nachname: nachname.to_string(),
            exported: false,
            kartennr: String::new(),
            vertragsnr: String::new(),
            tarif: String::new(),
            mobilnr: String::new(),
            email: String::new(),
            plz: String::new(),
            ort: String::new(),
            strhausnr: String::new(),
            ts: zero_time(),
        }
    }
}

fn two_people() -> [InfoResponse; 2] {
    [
        InfoResponse::person("u123456", "Herr", "Sascha1", "Friedensfrau1"),
        InfoResponse::person("u654321", "Frau", "Sascha2", "Friedensfrau2"),
    ]
}

/// `GET /api/createinfo`, also served behind the interceptor.
pub fn create_info(req: HandlerRequest) -> HandlerResult {
    info!(
        request_id = %req.request_id,
        session = ?req.session.as_ref().and_then(|s| s.get::<bool>()),
        "create_info called"
    );
    Ok(Reply::json(InfoResponse::person(
        "u123456",
        "Herr",
        "Sascha2",
        "Friedensfrau2",
    )))
}

/// `GET /{test}/api/{test2}/createinfoPathVar/{username}/{password}`
pub fn create_info_path_var(req: HandlerRequest) -> HandlerResult {
    info!(
        request_id = %req.request_id,
        path_params = ?req.path_params_map(),
        "create_info_path_var called"
    );
    Ok(Reply::json(two_people()))
}

/// `GET /api/createinfoQueryParamData`
pub fn create_info_query(req: HandlerRequest) -> HandlerResult {
    info!(
        request_id = %req.request_id,
        query_params = ?req.query_params_map(),
        "create_info_query called"
    );
    Ok(Reply::json(two_people()))
}

/// `POST /api/createinfoPOSTjson`
pub fn create_info_json(req: HandlerRequest) -> HandlerResult {
    let request: InfoRequest = serde_json::from_slice(&req.body)
        .map_err(|_| ServiceError::bad_request("Unmarshalling of request json failed"))?;
    info!(
        request_id = %req.request_id,
        userid = %request.userid,
        "create_info_json called"
    );
    Ok(Reply::json(InfoResponse::person(
        "u123456",
        "Herr",
        "Sascha",
        "Friedensfrau",
    )))
}

/// `POST /api/createinfoPOSTformdata`
pub fn create_info_form(req: HandlerRequest) -> HandlerResult {
    info!(
        request_id = %req.request_id,
        form_params = ?req.form_params_map(),
        "create_info_form called"
    );
    Ok(Reply::json(InfoResponse::person(
        "u123456",
        "Herr",
        "Sascha",
        "Friedensfrau",
    )))
}

/// Admits every request, handing over a `false` session flag.
pub fn admit_all(req: &HandlerRequest) -> Result<Option<Session>, InterceptorError> {
    info!(request_id = %req.request_id, route = %req.route, "admit_all interceptor");
    Ok(Some(Session::new(false)))
}

/// Register the sample routes on `routes`.
///
/// # Errors
///
/// Only if a route fails to compile, which the fixed set here does not.
pub fn register_demo_routes(routes: &mut RouteTable) -> Result<(), RegisterError> {
    routes.register(GET, "/api/createinfo", create_info)?;
    routes.register(
        GET,
        "/{test}/api/{test2}/createinfoPathVar/{username}/{password}",
        create_info_path_var,
    )?;
    routes.register(GET, "/api/createinfoQueryParamData", create_info_query)?;
    routes.register(POST, "/api/createinfoPOSTjson", create_info_json)?;
    routes.register(POST, "/api/createinfoPOSTformdata", create_info_form)?;
    routes.register_with_interceptor(GET, "/api/intercepted", create_info, admit_all)?;
    Ok(())
}

/// A fresh table holding only the sample routes.
///
/// # Errors
///
/// See [`register_demo_routes`].
pub fn demo_routes() -> Result<RouteTable, RegisterError> {
    let mut routes = RouteTable::new();
    register_demo_routes(&mut routes)?;
    Ok(routes)
}
