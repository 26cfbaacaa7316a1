use crate::config::{Config, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URI};
use crate::error::DeckError;
use crate::google_oauth::credentials::ClientDefaults;
use serde::Deserialize;
use std::{fs, path::Path};

/// OAuth client registration for this web application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
}

/// Layout of the `client_secret.json` downloaded from Google Cloud Console.
#[derive(Debug, Deserialize)]
struct SecretsFile {
    web: Option<SecretsSection>,
    installed: Option<SecretsSection>,
}

#[derive(Debug, Deserialize)]
struct SecretsSection {
    client_id: String,
    client_secret: String,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

impl ClientSecrets {
    /// Configured id/secret win; otherwise the secrets file is read.
    pub fn resolve(cfg: &Config) -> Result<Self, DeckError> {
        if let (Some(id), Some(secret)) = (cfg.client_id.as_ref(), cfg.client_secret.as_ref()) {
            return Ok(Self {
                client_id: id.clone(),
                client_secret: secret.clone(),
                auth_uri: GOOGLE_AUTH_URL.to_string(),
                token_uri: GOOGLE_TOKEN_URI.to_string(),
            });
        }
        Self::from_file(&cfg.client_secrets_file)
    }

    pub fn from_file(path: &Path) -> Result<Self, DeckError> {
        let missing = || {
            DeckError::MissingClientSecrets(format!(
                "Missing OAuth client secrets file. Download it from Google Cloud Console and save it as '{}'.",
                path.display()
            ))
        };
        let contents = fs::read_to_string(path).map_err(|_| missing())?;
        let file: SecretsFile = serde_json::from_str(&contents)?;
        let section = file.web.or(file.installed).ok_or_else(missing)?;
        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
            auth_uri: section
                .auth_uri
                .unwrap_or_else(|| GOOGLE_AUTH_URL.to_string()),
            token_uri: section
                .token_uri
                .unwrap_or_else(|| GOOGLE_TOKEN_URI.to_string()),
        })
    }

    pub fn defaults(&self) -> ClientDefaults {
        ClientDefaults {
            client_id: Some(self.client_id.clone()),
            client_secret: Some(self.client_secret.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn configured_pair_skips_the_file() {
        let mut cfg = Config::default();
        cfg.client_id = Some("id".into());
        cfg.client_secret = Some("secret".into());
        cfg.client_secrets_file = "/definitely/not/here.json".into();
        let secrets = ClientSecrets::resolve(&cfg).unwrap();
        assert_eq!(secrets.client_id, "id");
        assert_eq!(secrets.token_uri, GOOGLE_TOKEN_URI);
    }

    #[test]
    fn installed_section_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client_secret.json");
        fs::write(
            &path,
            r#"{"installed":{"client_id":"cid","client_secret":"cs","token_uri":"https://example.com/token"}}"#,
        )
        .unwrap();
        let secrets = ClientSecrets::from_file(&path).unwrap();
        assert_eq!(secrets.client_id, "cid");
        assert_eq!(secrets.token_uri, "https://example.com/token");
        assert_eq!(secrets.auth_uri, GOOGLE_AUTH_URL);
    }

    #[test]
    fn missing_file_names_the_expected_path() {
        let err = ClientSecrets::from_file(Path::new("nowhere/client_secret.json")).unwrap_err();
        assert!(matches!(err, DeckError::MissingClientSecrets(_)));
        assert!(err.to_string().contains("nowhere/client_secret.json"));
    }
}
