//! Gmail OAuth2 session
//!
//! Implements the authorization code flow for web-style callers: the caller
//! sends the user to [`Session::login_url`], receives the code on its own
//! redirect endpoint and hands it to [`Session::log_in`]. Token storage is
//! left to the caller; [`Session::is_token_valid`] and [`Session::refresh`]
//! re-install a stored [`TokenSet`] on later requests.
//!
//! ID tokens are verified through Google's `tokeninfo` endpoint.

use log::{debug, info, warn};
use serde::Deserialize;
use std::sync::{
    Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use super::http::{HttpTransport, Request, UreqTransport, call_json};
use crate::config::GmailCredentials;
use crate::error::{Error, Result};
use crate::gmail::api::ProfileResponse;
use crate::models::{TokenSet, UserDetails};

/// Process-wide session handed out by [`Session::shared`]
static SHARED_SESSION: OnceLock<Arc<Session>> = OnceLock::new();

/// Whether Google should issue a refresh token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    Online,
    Offline,
}

impl AccessType {
    fn as_str(self) -> &'static str {
        match self {
            AccessType::Online => "online",
            AccessType::Offline => "offline",
        }
    }
}

/// Consent screen behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Always show the consent screen (forces a fresh refresh token)
    Consent,
    SelectAccount,
    None,
}

impl Prompt {
    fn as_str(self) -> &'static str {
        match self {
            Prompt::Consent => "consent",
            Prompt::SelectAccount => "select_account",
            Prompt::None => "none",
        }
    }
}

/// Settings for the authorization URL
#[derive(Debug, Clone)]
pub struct LoginUrlOptions {
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub access_type: Option<AccessType>,
    pub prompt: Option<Prompt>,
    /// Opaque value echoed back on the redirect
    pub state: Option<String>,
}

impl LoginUrlOptions {
    /// Options requesting only the `openid` scope
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            scopes: vec![Session::OPENID_SCOPE.to_string()],
            access_type: None,
            prompt: None,
            state: None,
        }
    }

    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn access_type(mut self, access_type: AccessType) -> Self {
        self.access_type = Some(access_type);
        self
    }

    pub fn prompt(mut self, prompt: Prompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    id_token: Option<String>,
    expires_in: Option<u64>,
    token_type: Option<String>,
    scope: Option<String>,
}

impl TokenResponse {
    fn into_token_set(self) -> TokenSet {
        TokenSet::from_grant(
            self.access_token,
            self.refresh_token,
            self.id_token,
            self.token_type,
            self.scope,
            self.expires_in,
        )
    }
}

/// Claims returned by the tokeninfo endpoint
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    aud: String,
    iss: String,
}

#[derive(Debug, Default)]
struct SessionState {
    tokens: Option<TokenSet>,
    authenticated: bool,
    user_id: Option<String>,
    redirect_uri: Option<String>,
}

/// One authenticated Gmail user and the HTTP transport used to reach Google
///
/// Token state only changes through [`log_in`](Self::log_in),
/// [`is_token_valid`](Self::is_token_valid), [`refresh`](Self::refresh) and
/// [`log_out`](Self::log_out). Those transitions are serialized, so a session
/// can be shared across threads.
pub struct Session {
    credentials: GmailCredentials,
    transport: Arc<dyn HttpTransport>,
    state: RwLock<SessionState>,
    transition: Mutex<()>,
}

impl Session {
    /// Google OAuth2 endpoints
    pub const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    pub const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";
    pub const TOKENINFO_URL: &'static str = "https://oauth2.googleapis.com/tokeninfo";
    pub const PROFILE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1/users/me/profile";

    pub const OPENID_SCOPE: &'static str = "openid";

    const ISSUERS: [&'static str; 2] = ["accounts.google.com", "https://accounts.google.com"];

    /// Create a session talking to Google over HTTPS
    pub fn new(credentials: GmailCredentials) -> Self {
        Self::with_transport(credentials, Arc::new(UreqTransport::new()))
    }

    /// Create a session with a custom transport
    pub fn with_transport(credentials: GmailCredentials, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            credentials,
            transport,
            state: RwLock::new(SessionState::default()),
            transition: Mutex::new(()),
        }
    }

    /// The process-wide session, created on first call.
    ///
    /// Later calls return the same session and ignore `credentials`.
    /// Prefer owning a [`Session`] explicitly where the caller controls
    /// startup.
    pub fn shared(credentials: GmailCredentials) -> Arc<Session> {
        SHARED_SESSION
            .get_or_init(|| {
                debug!("Creating shared session for {}", credentials.application_name);
                Arc::new(Session::new(credentials))
            })
            .clone()
    }

    pub fn credentials(&self) -> &GmailCredentials {
        &self.credentials
    }

    pub(crate) fn transport(&self) -> &dyn HttpTransport {
        self.transport.as_ref()
    }

    /// Build the URL the user must visit to grant access
    pub fn login_url(&self, options: &LoginUrlOptions) -> Result<String> {
        if self.credentials.client_id.is_empty() {
            return Err(Error::AuthConfig("Missing OAuth client id.".to_string()));
        }
        url::Url::parse(&options.redirect_uri).map_err(|e| {
            Error::AuthConfig(format!("Invalid redirect URI '{}': {}", options.redirect_uri, e))
        })?;
        if options.scopes.is_empty() || options.scopes.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::AuthConfig("At least one non-empty scope is required.".to_string()));
        }

        let scope = options.scopes.join(" ");
        let mut auth_url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}",
            Self::AUTH_URL,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(&options.redirect_uri),
            urlencoding::encode(&scope),
        );
        if let Some(access_type) = options.access_type {
            auth_url.push_str(&format!("&access_type={}", access_type.as_str()));
        }
        if let Some(prompt) = options.prompt {
            auth_url.push_str(&format!("&prompt={}", prompt.as_str()));
        }
        if let Some(state) = &options.state {
            auth_url.push_str(&format!("&state={}", urlencoding::encode(state)));
        }

        let _guard = self.lock_transition();
        self.write_state().redirect_uri = Some(options.redirect_uri.clone());
        Ok(auth_url)
    }

    /// Set the redirect URI used by the code exchange without building a login URL
    pub fn set_redirect_uri(&self, redirect_uri: impl Into<String>) {
        let _guard = self.lock_transition();
        self.write_state().redirect_uri = Some(redirect_uri.into());
    }

    /// Exchange an authorization code for tokens and verify the user's identity
    pub fn log_in(&self, code: &str) -> Result<()> {
        let _guard = self.lock_transition();

        let redirect_uri = self.read_state().redirect_uri.clone().ok_or_else(|| {
            Error::AuthExchange(
                "No redirect URI configured; build the login URL first.".to_string(),
            )
        })?;

        let request = Request::post(Self::TOKEN_URL).form([
            ("code", code),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ]);
        let grant: TokenResponse = call_json(self.transport(), &request).map_err(|e| {
            warn!("Authorization code exchange failed: {}", e);
            Error::AuthExchange(e.to_string())
        })?;

        let tokens = grant.into_token_set();
        let claims = self
            .verify_id_token(tokens.id_token.as_deref())
            .map_err(|e| Error::AuthExchange(e.to_string()))?;

        self.install(tokens, claims.sub);
        info!("Successfully authenticated.");
        Ok(())
    }

    /// Install a stored token set and report whether it is still usable.
    ///
    /// Expired tokens stay installed and return `false` without touching the
    /// authenticated flag. Unexpired tokens have their ID token re-verified;
    /// if that fails the previous token set is put back, so the installed
    /// tokens always belong to the recorded user. No refresh is attempted.
    pub fn is_token_valid(&self, tokens: &TokenSet) -> bool {
        let _guard = self.lock_transition();

        let previous = self.write_state().tokens.replace(tokens.clone());
        if tokens.is_expired() {
            debug!("Access token expired");
            return false;
        }

        match self.verify_id_token(tokens.id_token.as_deref()) {
            Ok(claims) => {
                let mut state = self.write_state();
                state.authenticated = true;
                state.user_id = Some(claims.sub);
                true
            }
            Err(e) => {
                warn!("Stored token failed verification: {}", e);
                self.write_state().tokens = previous;
                false
            }
        }
    }

    /// Obtain a new access token from a refresh token.
    ///
    /// Google does not return the refresh token again, so the one passed
    /// in is kept on the new token set.
    pub fn refresh(&self, refresh_token: &str) -> Result<()> {
        let _guard = self.lock_transition();

        let request = Request::post(Self::TOKEN_URL).form([
            ("refresh_token", refresh_token),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ]);
        let grant: TokenResponse = call_json(self.transport(), &request).map_err(|e| {
            warn!("Token refresh failed: {}", e);
            Error::AuthRefresh(e.to_string())
        })?;

        let mut tokens = grant.into_token_set();
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }

        if tokens.id_token.is_none() {
            return Err(Error::AuthRefresh("Token is invalid.".to_string()));
        }
        let claims = self
            .verify_id_token(tokens.id_token.as_deref())
            .map_err(|e| Error::AuthRefresh(e.to_string()))?;

        self.install(tokens, claims.sub);
        info!("Access token refreshed");
        Ok(())
    }

    /// Forget tokens and identity
    pub fn log_out(&self) {
        let _guard = self.lock_transition();
        let mut state = self.write_state();
        state.tokens = None;
        state.authenticated = false;
        state.user_id = None;
    }

    /// Identity of the logged in user, looked up through the Gmail profile
    pub fn current_user(&self) -> Result<UserDetails> {
        let user_id = {
            let state = self.read_state();
            match (&state.user_id, state.authenticated) {
                (Some(user_id), true) => user_id.clone(),
                _ => return Err(Error::NotAuthenticated),
            }
        };

        let request = self.authorize(Request::get(Self::PROFILE_URL))?;
        let profile: ProfileResponse = call_json(self.transport(), &request)?;

        Ok(UserDetails {
            user_id,
            email: profile.email_address,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_state().authenticated
    }

    /// Subject identifier of the verified user
    pub fn user_id(&self) -> Result<String> {
        self.read_state().user_id.clone().ok_or(Error::NotAuthenticated)
    }

    /// Current token set, for the caller to persist
    pub fn tokens(&self) -> Option<TokenSet> {
        self.read_state().tokens.clone()
    }

    /// Access token for API calls; requires an authenticated session
    pub fn access_token(&self) -> Result<String> {
        let state = self.read_state();
        match (&state.tokens, state.authenticated) {
            (Some(tokens), true) => Ok(tokens.access_token.clone()),
            _ => Err(Error::NotAuthenticated),
        }
    }

    /// Attach the bearer token and developer key to an API request
    pub(crate) fn authorize(&self, request: Request) -> Result<Request> {
        let request = request.bearer(self.access_token()?);
        Ok(match self.credentials.api_key() {
            Some(key) => request.query("key", key),
            None => request,
        })
    }

    fn verify_id_token(&self, id_token: Option<&str>) -> Result<IdTokenClaims> {
        let id_token = id_token.ok_or_else(|| {
            Error::InvalidResponse("Token response did not include an ID token.".to_string())
        })?;

        let request = Request::get(Self::TOKENINFO_URL).query("id_token", id_token);
        let claims: IdTokenClaims = call_json(self.transport(), &request)?;

        if claims.aud != self.credentials.client_id {
            return Err(Error::InvalidResponse(
                "ID token was issued for a different client.".to_string(),
            ));
        }
        if !Self::ISSUERS.contains(&claims.iss.as_str()) {
            return Err(Error::InvalidResponse(format!(
                "ID token has unexpected issuer '{}'.",
                claims.iss
            )));
        }

        Ok(claims)
    }

    fn install(&self, tokens: TokenSet, user_id: String) {
        let mut state = self.write_state();
        state.tokens = Some(tokens);
        state.authenticated = true;
        state.user_id = Some(user_id);
    }

    fn lock_transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::http::Response;

    /// Transport that fails every request; login URL building never calls it
    struct Offline;

    impl HttpTransport for Offline {
        fn execute(&self, _request: &Request) -> Result<Response> {
            Err(Error::Transport("offline".to_string()))
        }
    }

    fn session() -> Session {
        Session::with_transport(
            GmailCredentials::new("client-123.apps.googleusercontent.com", "secret"),
            Arc::new(Offline),
        )
    }

    #[test]
    fn test_login_url_defaults() {
        let url = session()
            .login_url(&LoginUrlOptions::new("https://app.example.com/callback"))
            .unwrap();

        assert!(url.starts_with(Session::AUTH_URL));
        assert!(url.contains("client_id=client-123.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fcallback"));
        assert!(url.contains("scope=openid"));
        assert!(!url.contains("access_type"));
        assert!(!url.contains("prompt"));
    }

    #[test]
    fn test_login_url_with_offline_access() {
        let options = LoginUrlOptions::new("http://localhost:8080/cb")
            .scopes(["openid", "https://www.googleapis.com/auth/gmail.modify"])
            .access_type(AccessType::Offline)
            .prompt(Prompt::Consent)
            .state("xyz 1");
        let url = session().login_url(&options).unwrap();

        assert!(url.contains(
            "scope=openid%20https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fgmail.modify"
        ));
        assert!(url.contains("&access_type=offline"));
        assert!(url.contains("&prompt=consent"));
        assert!(url.contains("&state=xyz%201"));
    }

    #[test]
    fn test_login_url_rejects_bad_config() {
        let session = session();

        let err = session
            .login_url(&LoginUrlOptions::new("not a url"))
            .unwrap_err();
        assert!(matches!(err, Error::AuthConfig(_)));

        let err = session
            .login_url(&LoginUrlOptions::new("https://app.example.com/cb").scopes(Vec::<String>::new()))
            .unwrap_err();
        assert!(matches!(err, Error::AuthConfig(_)));

        let no_client = Session::with_transport(GmailCredentials::new("", "s"), Arc::new(Offline));
        let err = no_client
            .login_url(&LoginUrlOptions::new("https://app.example.com/cb"))
            .unwrap_err();
        assert!(matches!(err, Error::AuthConfig(_)));
    }

    #[test]
    fn test_redirect_uri_is_remembered_for_exchange() {
        let session = session();
        session
            .login_url(&LoginUrlOptions::new("https://app.example.com/first"))
            .unwrap();
        assert_eq!(
            session.read_state().redirect_uri.as_deref(),
            Some("https://app.example.com/first")
        );

        session.set_redirect_uri("https://app.example.com/second");
        assert_eq!(
            session.read_state().redirect_uri.as_deref(),
            Some("https://app.example.com/second")
        );
        // Neither call may leave the transition lock held
        assert!(session.transition.try_lock().is_ok());
    }

    #[test]
    fn test_log_in_requires_redirect_uri() {
        let err = session().log_in("4/0Ab-code").unwrap_err();
        assert!(matches!(err, Error::AuthExchange(_)));
    }

    #[test]
    fn test_unauthenticated_accessors() {
        let session = session();
        assert!(!session.is_authenticated());
        assert!(session.tokens().is_none());
        assert!(matches!(session.access_token(), Err(Error::NotAuthenticated)));
        assert!(matches!(session.user_id(), Err(Error::NotAuthenticated)));
        assert!(matches!(session.current_user(), Err(Error::NotAuthenticated)));
    }

    #[test]
    fn test_login_failure_leaves_state_untouched() {
        let session = session();
        session.set_redirect_uri("https://app.example.com/cb");
        let err = session.log_in("code").unwrap_err();
        assert_eq!(err.to_string(), "offline");
        assert!(!session.is_authenticated());
    }
}
