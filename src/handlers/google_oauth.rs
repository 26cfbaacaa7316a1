use crate::config::YOUTUBE_SCOPE;
use crate::error::DeckError;
use crate::google_oauth::client_secrets::ClientSecrets;
use crate::google_oauth::credentials::Credential;
use crate::google_oauth::endpoints::GoogleOauthEndpoints;
use crate::google_oauth::service::apply_token_response;
use crate::handlers::dashboard::error_page;
use crate::middleware::session::{build_cookie, clear_cookie, clear_session, store_session};
use crate::router::DeckState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeChallenge, PkceCodeVerifier};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use time::Duration;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

const CSRF_COOKIE: &str = "oauth_csrf_token";
const PKCE_COOKIE: &str = "oauth_pkce_verifier";

/// GET /login -> redirects to Google's consent page.
pub async fn login(State(state): State<DeckState>, jar: PrivateCookieJar) -> Response {
    let secrets = match ClientSecrets::resolve(&state.config) {
        Ok(s) => s,
        Err(err) => return respond_with_error(jar, err),
    };
    let redirect_uri = match state.config.redirect_uri() {
        Ok(u) => u,
        Err(err) => return respond_with_error(jar, err.into()),
    };

    let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
    let (auth_url, csrf_token) =
        match GoogleOauthEndpoints::build_authorize_url(&secrets, &redirect_uri, challenge) {
            Ok(pair) => pair,
            Err(err) => return respond_with_error(jar, err),
        };

    let jar = store_oauth_cookies(
        jar,
        &csrf_token,
        verifier.secret(),
        state.config.insecure_cookie,
    );

    info!("Dispatching OAuth redirect");
    (jar, Redirect::to(auth_url.as_str())).into_response()
}

/// GET /oauth2callback -> exchanges the code, persists the credential and
/// starts the session.
pub async fn oauth2callback(
    State(state): State<DeckState>,
    Query(query): Query<AuthCallbackQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let (pkce_verifier, csrf_cookie, jar) = match load_oauth_session(jar) {
        Ok(data) => data,
        Err((jar, err)) => return respond_with_error(jar, err),
    };

    if let Some(error) = query.error.as_deref() {
        return respond_with_error(
            jar,
            DeckError::OauthFlowError(format!("authorization denied: {error}")),
        );
    }

    let Some(state_param) = query.state.as_deref() else {
        return respond_with_error(
            jar,
            DeckError::OauthFlowError("missing `state` in callback".to_string()),
        );
    };

    if !bool::from(state_param.as_bytes().ct_eq(csrf_cookie.as_bytes())) {
        return respond_with_error(
            jar,
            DeckError::OauthFlowError("CSRF token mismatch".to_string()),
        );
    }

    let Some(code) = query.code.as_deref() else {
        return respond_with_error(
            jar,
            DeckError::OauthFlowError("missing `code` in callback".to_string()),
        );
    };

    let mut credential = match exchange(&state, code, pkce_verifier).await {
        Ok(cred) => cred,
        Err(err) => return respond_with_error(jar, err),
    };

    // Google only hands out a refresh token on first consent; keep the stored one.
    if credential.refresh_token.is_none() {
        credential.refresh_token = state
            .lifecycle
            .store()
            .load()
            .and_then(|previous| previous.refresh_token);
    }
    if credential.refresh_token.is_none() {
        warn!("OAuth response carried no refresh_token; session will end when the access token expires");
    }

    state.lifecycle.store().persist_best_effort(&credential);
    let jar = store_session(jar, &credential, state.config.insecure_cookie);

    info!("OAuth callback stored credential");
    (jar, Redirect::to("/")).into_response()
}

/// GET /logout -> drops the session cookie and the persisted token.
pub async fn logout(State(state): State<DeckState>, jar: PrivateCookieJar) -> impl IntoResponse {
    if let Err(err) = state.lifecycle.store().clear() {
        warn!(error = %err, "Failed to remove token file");
    }
    info!("Signed out");
    (clear_session(jar), Redirect::to("/"))
}

async fn exchange(
    state: &DeckState,
    code: &str,
    pkce_verifier: String,
) -> Result<Credential, DeckError> {
    let secrets = ClientSecrets::resolve(&state.config)?;
    let redirect_uri = state.config.redirect_uri()?;
    let response = GoogleOauthEndpoints::exchange_authorization_code(
        &secrets,
        &redirect_uri,
        AuthorizationCode::new(code.to_owned()),
        PkceCodeVerifier::new(pkce_verifier),
        &state.client,
    )
    .await?;

    let base = Credential {
        access_token: String::new(),
        refresh_token: None,
        token_uri: Url::parse(&secrets.token_uri)?,
        client_id: Some(secrets.client_id),
        client_secret: Some(secrets.client_secret),
        scopes: [YOUTUBE_SCOPE.to_string()].into(),
        expiry: None,
    };
    Ok(apply_token_response(base, &response, Utc::now()))
}

fn store_oauth_cookies(
    jar: PrivateCookieJar,
    csrf: &CsrfToken,
    pkce_verifier: &str,
    insecure_cookie: bool,
) -> PrivateCookieJar {
    let ttl = Duration::minutes(15);
    jar.add(build_cookie(
        CSRF_COOKIE,
        csrf.secret().to_string(),
        ttl,
        insecure_cookie,
    ))
    .add(build_cookie(
        PKCE_COOKIE,
        pkce_verifier.to_string(),
        ttl,
        insecure_cookie,
    ))
}

fn load_oauth_session(
    jar: PrivateCookieJar,
) -> Result<(String, String, PrivateCookieJar), (PrivateCookieJar, DeckError)> {
    let Some(csrf_cookie) = jar.get(CSRF_COOKIE).map(|c| c.value().to_owned()) else {
        return Err((
            clear_oauth_cookies(jar),
            DeckError::OauthFlowError("Missing CSRF token in cookie".to_string()),
        ));
    };

    let Some(pkce_cookie) = jar.get(PKCE_COOKIE).map(|c| c.value().to_owned()) else {
        return Err((
            clear_oauth_cookies(jar),
            DeckError::OauthFlowError("Missing PKCE verifier in cookie".to_string()),
        ));
    };

    Ok((pkce_cookie, csrf_cookie, clear_oauth_cookies(jar)))
}

fn clear_oauth_cookies(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(clear_cookie(CSRF_COOKIE))
        .remove(clear_cookie(PKCE_COOKIE))
}

fn respond_with_error(jar: PrivateCookieJar, err: DeckError) -> Response {
    warn!(error = %err, "OAuth flow failed");
    (jar, error_page(&err)).into_response()
}
