use crate::error::DeckError;
use crate::google_oauth::credentials::{CanonicalShape, ClientDefaults, Credential, CredentialShape};
use serde_json::Value;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// JSON-file backed store for the signed-in account's credential.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    defaults: ClientDefaults,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>, defaults: ClientDefaults) -> Self {
        Self {
            path: path.into(),
            defaults,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn defaults(&self) -> &ClientDefaults {
        &self.defaults
    }

    /// Last persisted credential. Missing, unreadable or unrecognised files
    /// are all reported as `None`.
    pub fn load(&self) -> Option<Credential> {
        let value = self.read_raw().ok()??;
        let cred = Credential::from_value(&value, &self.defaults);
        if cred.is_none() {
            debug!(path = %self.path.display(), "token file has an unrecognised shape");
        }
        cred
    }

    /// Persist `cred`, keeping any refresh token, token uri, client id or
    /// client secret from the previous record that `cred` lacks.
    pub fn save(&self, cred: &Credential) -> Result<(), DeckError> {
        let mut record = cred.to_canonical();
        if let Some(previous) = self.previous_record() {
            merge_missing(&mut record, previous);
        }
        let body = serde_json::to_string(&record)?;
        fs::write(&self.path, body)?;
        debug!(path = %self.path.display(), "credential persisted");
        Ok(())
    }

    /// Best-effort persistence: a failed write only costs the next process
    /// start its cached sign-in, so the error is logged and dropped here.
    pub fn persist_best_effort(&self, cred: &Credential) {
        if let Err(e) = self.save(cred) {
            warn!(path = %self.path.display(), error = %e, "failed to persist credential");
        }
    }

    /// Remove the record on sign-out.
    pub fn clear(&self) -> Result<(), DeckError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_raw(&self) -> Result<Option<Value>, DeckError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn previous_record(&self) -> Option<CanonicalShape> {
        let value = self.read_raw().ok()??;
        match CredentialShape::detect(&value)? {
            CredentialShape::Canonical(c) => Some(c),
            CredentialShape::ProviderNative(p) => Some(CanonicalShape {
                token: p.access_token,
                refresh_token: p.refresh_token,
                token_uri: p.token_uri,
                client_id: p.client_id,
                client_secret: p.client_secret,
                scopes: None,
                expiry: None,
            }),
        }
    }
}

fn merge_missing(record: &mut CanonicalShape, previous: CanonicalShape) {
    fn keep(slot: &mut Option<String>, old: Option<String>) {
        if slot.as_deref().is_none_or(str::is_empty) {
            if let Some(old) = old.filter(|s| !s.is_empty()) {
                *slot = Some(old);
            }
        }
    }
    keep(&mut record.refresh_token, previous.refresh_token);
    keep(&mut record.token_uri, previous.token_uri);
    keep(&mut record.client_id, previous.client_id);
    keep(&mut record.client_secret, previous.client_secret);
}
