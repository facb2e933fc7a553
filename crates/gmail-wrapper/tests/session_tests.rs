//! Session lifecycle against a scripted Google backend

mod common;

use serde_json::json;
use std::sync::Arc;
use std::thread;

use common::*;
use gmail_wrapper::gmail::http::Method;
use gmail_wrapper::{Error, ErrorKind, GmailCredentials, LoginUrlOptions, Session};

fn grant(with_refresh: bool) -> serde_json::Value {
    let mut body = json!({
        "access_token": "ya29.fresh",
        "expires_in": 3599,
        "id_token": "eyJ.fresh.id",
        "scope": "openid",
        "token_type": "Bearer"
    });
    if with_refresh {
        body["refresh_token"] = json!("1//issued");
    }
    body
}

fn session(transport: &Arc<ScriptedTransport>) -> Session {
    init_logging();
    Session::with_transport(credentials(), transport.clone())
}

#[test]
fn test_log_in_exchanges_code_and_verifies_identity() {
    let transport = ScriptedTransport::new();
    transport.on(Method::Post, Session::TOKEN_URL, 200, grant(true));
    accept_id_tokens(&transport);
    let session = session(&transport);

    session
        .login_url(&LoginUrlOptions::new("https://app.example.com/callback"))
        .unwrap();
    session.log_in("4/0Ab-code").unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.user_id().unwrap(), SUBJECT_ID);
    let tokens = session.tokens().unwrap();
    assert_eq!(tokens.access_token, "ya29.fresh");
    assert_eq!(tokens.refresh_token.as_deref(), Some("1//issued"));
    assert!(!tokens.is_expired());

    let exchange = &transport.requests_to(Method::Post, Session::TOKEN_URL)[0];
    assert_eq!(form_value(exchange, "code"), Some("4/0Ab-code"));
    assert_eq!(form_value(exchange, "grant_type"), Some("authorization_code"));
    assert_eq!(
        form_value(exchange, "redirect_uri"),
        Some("https://app.example.com/callback")
    );

    let verify = &transport.requests_to(Method::Get, Session::TOKENINFO_URL)[0];
    assert_eq!(verify.query_value("id_token"), Some("eyJ.fresh.id"));
}

#[test]
fn test_log_in_reports_token_endpoint_error() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::Post,
        Session::TOKEN_URL,
        400,
        json!({ "error": "invalid_grant", "error_description": "Bad Request" }),
    );
    let session = session(&transport);
    session.set_redirect_uri("https://app.example.com/callback");

    let err = session.log_in("expired-code").unwrap_err();
    assert!(matches!(err, Error::AuthExchange(_)));
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(err.to_string(), "Bad Request");
    assert!(!session.is_authenticated());
    assert!(session.tokens().is_none());
}

#[test]
fn test_log_in_rejects_token_for_other_client() {
    let transport = ScriptedTransport::new();
    transport.on(Method::Post, Session::TOKEN_URL, 200, grant(true));
    transport.on(
        Method::Get,
        Session::TOKENINFO_URL,
        200,
        json!({ "iss": "https://accounts.google.com", "sub": SUBJECT_ID, "aud": "someone-else" }),
    );
    let session = session(&transport);
    session.set_redirect_uri("https://app.example.com/callback");

    let err = session.log_in("code").unwrap_err();
    assert!(matches!(err, Error::AuthExchange(_)));
    assert!(!session.is_authenticated());
}

#[test]
fn test_valid_stored_token_authenticates() {
    let transport = ScriptedTransport::new();
    accept_id_tokens(&transport);
    let session = session(&transport);

    assert!(session.is_token_valid(&token_set(3600)));
    assert!(session.is_authenticated());
    assert_eq!(session.user_id().unwrap(), SUBJECT_ID);
    assert_eq!(session.access_token().unwrap(), "ya29.access");
}

#[test]
fn test_expired_token_leaves_flag_unchanged() {
    let transport = ScriptedTransport::new();
    accept_id_tokens(&transport);
    let session = session(&transport);

    // Not yet authenticated: stays unauthenticated
    assert!(!session.is_token_valid(&token_set(-60)));
    assert!(!session.is_authenticated());
    assert!(transport.requests().is_empty());

    // Already authenticated: flag survives, tokens are replaced
    assert!(session.is_token_valid(&token_set(3600)));
    let expired = token_set(-60);
    assert!(!session.is_token_valid(&expired));
    assert!(session.is_authenticated());
    assert_eq!(session.tokens(), Some(expired));
}

#[test]
fn test_rejected_id_token_keeps_previous_identity() {
    let transport = ScriptedTransport::new();
    accept_id_tokens(&transport);
    let session = session(&transport);
    let original = token_set(3600);
    assert!(session.is_token_valid(&original));

    transport.on(
        Method::Get,
        Session::TOKENINFO_URL,
        400,
        json!({ "error": "invalid_token", "error_description": "Invalid Value" }),
    );
    let mut rejected = token_set(3600);
    rejected.access_token = "ya29.other-user".to_string();

    assert!(!session.is_token_valid(&rejected));
    assert!(session.is_authenticated());
    assert_eq!(session.user_id().unwrap(), SUBJECT_ID);
    assert_eq!(session.tokens(), Some(original));
    assert_eq!(session.access_token().unwrap(), "ya29.access");
}

#[test]
fn test_token_for_other_client_is_not_installed() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::Get,
        Session::TOKENINFO_URL,
        200,
        json!({ "iss": "https://accounts.google.com", "sub": "999", "aud": "someone-else" }),
    );
    let session = session(&transport);

    assert!(!session.is_token_valid(&token_set(3600)));
    assert!(!session.is_authenticated());
    assert!(session.tokens().is_none());
    assert!(matches!(session.user_id(), Err(Error::NotAuthenticated)));
}

#[test]
fn test_token_without_expiry_is_expired() {
    let transport = ScriptedTransport::new();
    accept_id_tokens(&transport);
    let session = session(&transport);

    let mut tokens = token_set(3600);
    tokens.expires_at = None;
    assert!(!session.is_token_valid(&tokens));
}

#[test]
fn test_refresh_keeps_refresh_token() {
    let transport = ScriptedTransport::new();
    transport.on(Method::Post, Session::TOKEN_URL, 200, grant(false));
    accept_id_tokens(&transport);
    let session = session(&transport);

    session.refresh("1//stored").unwrap();

    let tokens = session.tokens().unwrap();
    assert_eq!(tokens.access_token, "ya29.fresh");
    assert_eq!(tokens.refresh_token.as_deref(), Some("1//stored"));
    assert!(session.is_authenticated());

    let request = &transport.requests_to(Method::Post, Session::TOKEN_URL)[0];
    assert_eq!(form_value(request, "grant_type"), Some("refresh_token"));
    assert_eq!(form_value(request, "refresh_token"), Some("1//stored"));
}

#[test]
fn test_refresh_without_id_token_fails() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::Post,
        Session::TOKEN_URL,
        200,
        json!({ "access_token": "ya29.fresh", "expires_in": 3599 }),
    );
    let session = session(&transport);

    let err = session.refresh("1//stored").unwrap_err();
    assert!(matches!(err, Error::AuthRefresh(_)));
    assert_eq!(err.to_string(), "Token is invalid.");
    assert!(!session.is_authenticated());
}

#[test]
fn test_refresh_revoked_token() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::Post,
        Session::TOKEN_URL,
        400,
        json!({ "error": "invalid_grant", "error_description": "Token has been expired or revoked." }),
    );
    let session = session(&transport);

    let err = session.refresh("1//revoked").unwrap_err();
    assert!(matches!(err, Error::AuthRefresh(_)));
    assert_eq!(err.to_string(), "Token has been expired or revoked.");
}

#[test]
fn test_current_user() {
    let transport = ScriptedTransport::new();
    let session = authenticated_session(&transport);
    profile(&transport);

    let user = session.current_user().unwrap();
    assert_eq!(user.user_id, SUBJECT_ID);
    assert_eq!(user.email, USER_EMAIL);

    let request = &transport.requests_to(Method::Get, Session::PROFILE_URL)[0];
    assert_eq!(request.bearer.as_deref(), Some("ya29.access"));
    assert_eq!(request.query_value("key"), None);
}

#[test]
fn test_developer_key_is_sent() {
    let transport = ScriptedTransport::new();
    accept_id_tokens(&transport);
    profile(&transport);
    let session = Session::with_transport(
        credentials().with_developer_key("AIza-dev-key"),
        transport.clone(),
    );
    assert!(session.is_token_valid(&token_set(3600)));

    session.current_user().unwrap();
    let request = &transport.requests_to(Method::Get, Session::PROFILE_URL)[0];
    assert_eq!(request.query_value("key"), Some("AIza-dev-key"));
}

#[test]
fn test_log_out() {
    let transport = ScriptedTransport::new();
    let session = authenticated_session(&transport);

    session.log_out();
    assert!(!session.is_authenticated());
    assert!(session.tokens().is_none());
    assert!(matches!(session.current_user(), Err(Error::NotAuthenticated)));
    assert!(transport.requests().is_empty());
}

#[test]
fn test_concurrent_validation() {
    let transport = ScriptedTransport::new();
    accept_id_tokens(&transport);
    let session = Arc::new(session(&transport));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let session = session.clone();
            thread::spawn(move || session.is_token_valid(&token_set(3600)))
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert!(session.is_authenticated());
    assert_eq!(transport.requests_to(Method::Get, Session::TOKENINFO_URL).len(), 8);
}

#[test]
fn test_shared_session_is_created_once() {
    let first = Session::shared(GmailCredentials::new("first-client", "s"));
    let second = Session::shared(GmailCredentials::new("second-client", "s"));

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.credentials().client_id, "first-client");
}
