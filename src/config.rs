use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3/";
pub const YOUTUBE_SCOPE: &str = "https://www.googleapis.com/auth/youtube";

/// Runtime configuration, assembled from defaults and `TUBEDECK_*` env vars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub listen_addr: String,
    /// Externally reachable origin; the OAuth redirect URI is derived from it.
    pub public_url: Url,
    pub loglevel: String,
    pub database_url: String,
    /// Persisted credential record.
    pub token_file: PathBuf,
    /// Google-downloaded OAuth client file, used when no client id/secret is set.
    pub client_secrets_file: PathBuf,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Master key for the private cookie jar (at least 64 bytes). A random key
    /// is generated when unset, which signs everybody out on restart.
    pub cookie_key: Option<String>,
    pub proxy: Option<Url>,
    pub api_base: Url,
    pub insecure_cookie: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            public_url: Url::parse("http://127.0.0.1:3000").expect("static url"),
            loglevel: "info".to_string(),
            database_url: "sqlite://tubedeck.sqlite".to_string(),
            token_file: PathBuf::from("token.json"),
            client_secrets_file: PathBuf::from("client_secret.json"),
            client_id: None,
            client_secret: None,
            cookie_key: None,
            proxy: None,
            api_base: Url::parse(YOUTUBE_API_BASE).expect("static url"),
            insecure_cookie: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("TUBEDECK_"))
            .extract()
            .map_err(Box::new)
    }

    pub fn redirect_uri(&self) -> Result<Url, url::ParseError> {
        self.public_url.join("/oauth2callback")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_uri_replaces_path() {
        let mut cfg = Config::default();
        cfg.public_url = Url::parse("https://deck.example.com/some/page").unwrap();
        assert_eq!(
            cfg.redirect_uri().unwrap().as_str(),
            "https://deck.example.com/oauth2callback"
        );
    }

    #[test]
    fn api_base_keeps_trailing_slash_for_joins() {
        let cfg = Config::default();
        assert_eq!(
            cfg.api_base.join("playlists").unwrap().as_str(),
            "https://www.googleapis.com/youtube/v3/playlists"
        );
    }
}
