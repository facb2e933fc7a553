//! Scripted HTTP transport and session helpers shared by the integration tests

#![allow(dead_code)]

use chrono::Utc;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

use gmail_wrapper::gmail::http::{Body, HttpTransport, Method, Request, Response};
use gmail_wrapper::{GmailClient, GmailCredentials, Result, Session, TokenSet};

pub const CLIENT_ID: &str = "client-123.apps.googleusercontent.com";
pub const SUBJECT_ID: &str = "110169484474386276334";
pub const USER_EMAIL: &str = "jon@example.com";

struct Route {
    method: Method,
    url: String,
    response: Response,
}

/// Transport answering from a fixed table and recording every request.
/// Later routes for the same method and URL replace earlier ones.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, method: Method, url: impl Into<String>, status: u16, body: Value) {
        self.routes.lock().unwrap().push(Route {
            method,
            url: url.into(),
            response: Response {
                status,
                body: body.to_string(),
            },
        });
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, url: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.url == url)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

impl HttpTransport for ScriptedTransport {
    fn execute(&self, request: &Request) -> Result<Response> {
        self.requests.lock().unwrap().push(request.clone());
        let routes = self.routes.lock().unwrap();
        let response = routes
            .iter()
            .rev()
            .find(|r| r.method == request.method && r.url == request.url)
            .map(|r| r.response.clone())
            .unwrap_or_else(|| Response {
                status: 404,
                body: json!({ "error": { "code": 404, "message": "Requested entity was not found." } })
                    .to_string(),
            });
        Ok(response)
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn credentials() -> GmailCredentials {
    GmailCredentials::new(CLIENT_ID, "secret")
}

pub fn api_url(path: &str) -> String {
    format!("{}/{}", GmailClient::BASE_URL, path)
}

/// Answer tokeninfo with claims for the test user
pub fn accept_id_tokens(transport: &ScriptedTransport) {
    transport.on(
        Method::Get,
        Session::TOKENINFO_URL,
        200,
        json!({
            "iss": "https://accounts.google.com",
            "sub": SUBJECT_ID,
            "aud": CLIENT_ID,
            "email": USER_EMAIL,
            "exp": (Utc::now().timestamp() + 3600).to_string()
        }),
    );
}

pub fn profile(transport: &ScriptedTransport) {
    transport.on(
        Method::Get,
        Session::PROFILE_URL,
        200,
        json!({ "emailAddress": USER_EMAIL, "messagesTotal": 12, "threadsTotal": 9, "historyId": "4321" }),
    );
}

pub fn token_set(expires_in: i64) -> TokenSet {
    TokenSet {
        access_token: "ya29.access".to_string(),
        refresh_token: Some("1//refresh".to_string()),
        id_token: Some("eyJ.id.token".to_string()),
        token_type: Some("Bearer".to_string()),
        scope: Some("openid".to_string()),
        expires_at: Some(Utc::now().timestamp() + expires_in),
    }
}

/// A session authenticated through a stored, unexpired token set
pub fn authenticated_session(transport: &Arc<ScriptedTransport>) -> Arc<Session> {
    init_logging();
    accept_id_tokens(transport);
    let session = Session::with_transport(credentials(), transport.clone());
    assert!(session.is_token_valid(&token_set(3600)));
    transport.clear_requests();
    Arc::new(session)
}

/// Form field of a recorded request
pub fn form_value<'a>(request: &'a Request, key: &str) -> Option<&'a str> {
    match &request.body {
        Body::Form(fields) => fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str()),
        _ => None,
    }
}

/// JSON body of a recorded request
pub fn json_body(request: &Request) -> Value {
    match &request.body {
        Body::Json(value) => value.clone(),
        other => panic!("expected JSON body, got {:?}", other),
    }
}
