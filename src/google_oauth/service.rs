use super::endpoints::{GoogleOauthEndpoints, GoogleTokenResponse};
use crate::error::DeckError;
use crate::google_oauth::credentials::{Credential, truncate_millis};
use crate::service::credential_store::CredentialStore;
use chrono::{DateTime, TimeDelta, Utc};
use oauth2::TokenResponse;
use std::collections::BTreeSet;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Tokens expiring within this window are refreshed ahead of time.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Keeps the signed-in credential usable: refreshes expired access tokens and
/// writes the result back to the store.
pub struct CredentialLifecycle {
    store: CredentialStore,
    http: reqwest::Client,
    refresh_lock: Mutex<()>,
    skew: TimeDelta,
}

impl CredentialLifecycle {
    pub fn new(store: CredentialStore, http: reqwest::Client) -> Self {
        Self {
            store,
            http,
            refresh_lock: Mutex::new(()),
            skew: TimeDelta::seconds(EXPIRY_SKEW_SECS),
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Return a credential fit for an API call and whether it was refreshed.
    ///
    /// An expired credential without a refresh token is handed back unchanged;
    /// the API call made with it reports the authorization failure.
    pub async fn ensure_valid(&self, cred: Credential) -> Result<(Credential, bool), DeckError> {
        if !cred.is_expired(Utc::now(), self.skew) {
            return Ok((cred, false));
        }
        let Some(refresh_token) = cred.refresh_token.clone() else {
            warn!("Access token expired and no refresh token is available");
            return Ok((cred, false));
        };

        // One refresh at a time; a request that waited on the lock picks up
        // the token the previous holder just stored.
        let _guard = self.refresh_lock.lock().await;
        if let Some(stored) = self.store.load()
            && stored.refresh_token.as_deref() == Some(refresh_token.as_str())
            && stored.access_token != cred.access_token
            && !stored.is_expired(Utc::now(), self.skew)
        {
            debug!("Reusing credential refreshed by a concurrent request");
            return Ok((stored, true));
        }

        let response =
            GoogleOauthEndpoints::refresh_access_token(&cred, &refresh_token, &self.http).await?;
        let updated = apply_token_response(cred, &response, Utc::now());
        self.store.persist_best_effort(&updated);
        info!(expiry = ?updated.expiry, "Credential refreshed");
        Ok((updated, true))
    }
}

/// Fold a token endpoint reply into `cred`. Fields the reply omits (refresh
/// token, scopes) are inherited from `cred`.
pub(crate) fn apply_token_response(
    mut cred: Credential,
    response: &GoogleTokenResponse,
    now: DateTime<Utc>,
) -> Credential {
    cred.access_token = response.access_token().secret().clone();
    if let Some(refresh) = response.refresh_token() {
        cred.refresh_token = Some(refresh.secret().clone());
    }
    if let Some(scopes) = response.scopes() {
        let scopes: BTreeSet<String> = scopes.iter().map(|s| s.as_str().to_owned()).collect();
        if !scopes.is_empty() {
            cred.scopes = scopes;
        }
    }
    cred.expiry = response
        .expires_in()
        .and_then(|d| TimeDelta::from_std(d).ok())
        .map(|d| truncate_millis(now + d));
    cred
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google_oauth::credentials::ClientDefaults;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, method, path},
    };

    fn expired_credential(token_uri: &str, refresh: Option<&str>) -> Credential {
        let mut raw = json!({
            "token": "stale-token",
            "token_uri": token_uri,
            "client_id": "cid",
            "client_secret": "cs",
            "scopes": ["https://www.googleapis.com/auth/youtube"],
            "expiry": "2020-01-01T00:00:00.000Z",
        });
        if let Some(r) = refresh {
            raw["refresh_token"] = json!(r);
        }
        Credential::from_value(&raw, &ClientDefaults::default()).unwrap()
    }

    fn lifecycle(dir: &TempDir) -> CredentialLifecycle {
        let store = CredentialStore::new(dir.path().join("token.json"), ClientDefaults::default());
        CredentialLifecycle::new(store, reqwest::Client::new())
    }

    #[tokio::test]
    async fn valid_credential_is_returned_untouched() {
        let dir = TempDir::new().unwrap();
        let lc = lifecycle(&dir);
        let mut cred = expired_credential("http://127.0.0.1:9/token", Some("r"));
        cred.expiry = Some(Utc::now() + TimeDelta::hours(1));

        let (out, refreshed) = lc.ensure_valid(cred.clone()).await.unwrap();
        assert!(!refreshed);
        assert_eq!(out, cred);
        assert!(lc.store().load().is_none());
    }

    #[tokio::test]
    async fn expired_credential_is_refreshed_and_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh-token",
                "token_type": "Bearer",
                "expires_in": 3599,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let lc = lifecycle(&dir);
        let cred = expired_credential(&format!("{}/token", server.uri()), Some("old-refresh"));

        let (out, refreshed) = lc.ensure_valid(cred).await.unwrap();
        assert!(refreshed);
        assert_eq!(out.access_token, "fresh-token");
        assert_eq!(out.refresh_token.as_deref(), Some("old-refresh"));
        assert!(out.expiry.unwrap() > Utc::now() + TimeDelta::minutes(50));

        let stored = lc.store().load().unwrap();
        assert_eq!(stored, out);
    }

    #[tokio::test]
    async fn refresh_replaces_rotated_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh-token",
                "refresh_token": "rotated",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "https://www.googleapis.com/auth/youtube openid",
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let lc = lifecycle(&dir);
        let cred = expired_credential(&format!("{}/token", server.uri()), Some("old-refresh"));
        let (out, _) = lc.ensure_valid(cred).await.unwrap();
        assert_eq!(out.refresh_token.as_deref(), Some("rotated"));
        assert!(out.scopes.contains("openid"));
    }

    #[tokio::test]
    async fn expired_without_refresh_token_is_returned_as_is() {
        let dir = TempDir::new().unwrap();
        let lc = lifecycle(&dir);
        let cred = expired_credential("http://127.0.0.1:9/token", None);
        let (out, refreshed) = lc.ensure_valid(cred.clone()).await.unwrap();
        assert!(!refreshed);
        assert_eq!(out, cred);
    }

    #[tokio::test]
    async fn provider_rejection_surfaces_as_authorization_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked.",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let lc = lifecycle(&dir);
        let cred = expired_credential(&format!("{}/token", server.uri()), Some("revoked"));
        let err = lc.ensure_valid(cred).await.unwrap_err();
        assert!(matches!(err, DeckError::Oauth2Server { ref error } if error == "invalid_grant"));
        assert!(lc.store().load().is_none());
    }

    #[tokio::test]
    async fn concurrent_refresh_result_in_store_is_reused() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let lc = lifecycle(&dir);
        let cred = expired_credential(&format!("{}/token", server.uri()), Some("shared"));

        let mut already = cred.clone();
        already.access_token = "refreshed-elsewhere".into();
        already.expiry = Some(truncate_millis(Utc::now() + TimeDelta::hours(1)));
        lc.store().save(&already).unwrap();

        let (out, refreshed) = lc.ensure_valid(cred).await.unwrap();
        assert!(refreshed);
        assert_eq!(out.access_token, "refreshed-elsewhere");
    }
}
