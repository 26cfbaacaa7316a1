use crate::api::youtube_api::YoutubeApi;
use crate::error::DeckError;
use crate::google_oauth::credentials::{ClientDefaults, Credential};
use crate::router::DeckState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use serde_json::Value;
use std::convert::Infallible;
use time::Duration;
use tracing::debug;

pub const SESSION_COOKIE: &str = "tubedeck_session";

/// Cookie jar plus state; nothing is checked until [`Session::signed_in`].
///
/// Handlers validate their payload between `signed_in` (no network) and
/// [`SignedIn::authorize`] (may refresh the token), so a rejected request
/// never reaches Google.
pub struct Session {
    jar: PrivateCookieJar,
    state: DeckState,
}

/// A credential was found, not yet checked for expiry.
pub struct SignedIn {
    jar: PrivateCookieJar,
    state: DeckState,
    credential: Credential,
    from_store: bool,
}

/// Ready to call YouTube. `jar` carries the refreshed session cookie, if any,
/// and must be returned with the response.
pub struct Authorized {
    pub api: YoutubeApi,
    pub jar: PrivateCookieJar,
}

impl FromRequestParts<DeckState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &DeckState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_request_parts(parts, state).await?;
        Ok(Self {
            jar,
            state: state.clone(),
        })
    }
}

impl Session {
    /// Session cookie first, persisted token file second.
    pub fn signed_in(self) -> Result<SignedIn, DeckError> {
        let store = self.state.lifecycle.store();
        if let Some(credential) = read_session(&self.jar, store.defaults()) {
            return Ok(SignedIn {
                jar: self.jar,
                state: self.state,
                credential,
                from_store: false,
            });
        }
        let credential = store.load().ok_or(DeckError::AuthorizationMissing)?;
        debug!("session restored from token file");
        Ok(SignedIn {
            jar: self.jar,
            state: self.state,
            credential,
            from_store: true,
        })
    }
}

impl SignedIn {
    pub async fn authorize(self) -> Result<Authorized, DeckError> {
        let (credential, refreshed) = self.state.lifecycle.ensure_valid(self.credential).await?;
        let jar = if refreshed || self.from_store {
            store_session(self.jar, &credential, self.state.config.insecure_cookie)
        } else {
            self.jar
        };
        let api = YoutubeApi::new(
            self.state.client.clone(),
            self.state.config.api_base.clone(),
            credential.access_token,
            self.state.usage.clone(),
        );
        Ok(Authorized { api, jar })
    }
}

fn read_session(jar: &PrivateCookieJar, defaults: &ClientDefaults) -> Option<Credential> {
    let cookie = jar.get(SESSION_COOKIE)?;
    let value: Value = serde_json::from_str(cookie.value()).ok()?;
    Credential::from_value(&value, defaults)
}

/// Keep the canonical credential snapshot in the encrypted session cookie.
pub fn store_session(
    jar: PrivateCookieJar,
    credential: &Credential,
    insecure_cookie: bool,
) -> PrivateCookieJar {
    match serde_json::to_string(&credential.to_canonical()) {
        Ok(value) => jar.add(build_cookie(SESSION_COOKIE, value, Duration::days(30), insecure_cookie)),
        Err(_) => jar,
    }
}

pub fn clear_session(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(clear_cookie(SESSION_COOKIE))
}

pub fn build_cookie(
    name: &str,
    value: String,
    max_age: Duration,
    insecure_cookie: bool,
) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(!insecure_cookie)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

pub fn clear_cookie(name: &str) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
