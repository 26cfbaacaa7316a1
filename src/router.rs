use crate::config::Config;
use crate::error::DeckError;
use crate::google_oauth::client_secrets::ClientSecrets;
use crate::google_oauth::credentials::ClientDefaults;
use crate::google_oauth::service::CredentialLifecycle;
use crate::handlers::{dashboard, google_oauth, items, playlists};
use crate::service::credential_store::CredentialStore;
use crate::service::usage::UsageCounter;
use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct DeckState {
    pub config: Arc<Config>,
    pub client: reqwest::Client,
    pub lifecycle: Arc<CredentialLifecycle>,
    pub usage: UsageCounter,
    cookie_key: Key,
}

impl DeckState {
    pub fn new(config: Config, usage: UsageCounter) -> Result<Self, DeckError> {
        let client = build_http_client(&config)?;

        // Records without their own client id/secret borrow the app's.
        let defaults = match ClientSecrets::resolve(&config) {
            Ok(secrets) => secrets.defaults(),
            Err(e) => {
                warn!(error = %e, "OAuth client secrets unavailable; sign-in disabled until configured");
                ClientDefaults {
                    client_id: config.client_id.clone(),
                    client_secret: config.client_secret.clone(),
                }
            }
        };
        let store = CredentialStore::new(config.token_file.clone(), defaults);
        let lifecycle = Arc::new(CredentialLifecycle::new(store, client.clone()));

        let cookie_key = match config.cookie_key.as_deref() {
            Some(raw) => Key::try_from(raw.as_bytes()).map_err(|_| {
                DeckError::Validation("cookie_key must be at least 64 bytes".to_string())
            })?,
            None => {
                info!("No cookie_key configured; generated a random one");
                Key::generate()
            }
        };

        Ok(Self {
            config: Arc::new(config),
            client,
            lifecycle,
            usage,
            cookie_key,
        })
    }
}

impl FromRef<DeckState> for Key {
    fn from_ref(state: &DeckState) -> Self {
        state.cookie_key.clone()
    }
}

fn build_http_client(cfg: &Config) -> Result<reqwest::Client, DeckError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("tubedeck/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        // oauth2 requires redirects to be disabled for token requests
        .redirect(reqwest::redirect::Policy::none());
    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }
    Ok(builder.build()?)
}

pub fn deck_router(state: DeckState) -> Router {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/api/playlists", get(playlists::list_playlists))
        .route("/api/usage", get(playlists::usage_today))
        .route("/delete/{playlist_id}", post(playlists::delete_playlist))
        .route("/delete-bulk", post(playlists::delete_bulk))
        .route("/playlists/merge", post(playlists::merge))
        .route("/playlist/{playlist_id}/rename", post(playlists::rename))
        .route("/playlist/{playlist_id}/items", get(items::list_items))
        .route("/playlist/{playlist_id}/dedupe", post(items::dedupe))
        .route(
            "/playlist/{playlist_id}/items/delete-bulk",
            post(items::delete_items_bulk),
        )
        .route("/playlist/{playlist_id}/items/transfer", post(items::transfer))
        .route("/playlist/{playlist_id}/import", post(items::import))
        .route("/login", get(google_oauth::login))
        .route("/oauth2callback", get(google_oauth::oauth2callback))
        .route("/logout", get(google_oauth::logout))
        .with_state(state)
}
