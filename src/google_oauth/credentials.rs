//! Credential record and the token shapes it can be read from.
//!
//! Two on-disk shapes are understood: the canonical one this crate writes
//! (`token`, `token_uri`, ISO-8601 `expiry`) and the provider-native one written
//! by Google's client libraries (`access_token`, space-joined `scope`,
//! `expiry_date` in epoch milliseconds). Both are parsed into typed structs and
//! converted into a single [`Credential`].

use crate::config::{GOOGLE_TOKEN_URI, YOUTUBE_SCOPE};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::BTreeSet;
use url::Url;

/// Client id/secret used when a record does not carry its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientDefaults {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Canonical, usable credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_uri: Url,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scopes: BTreeSet<String>,
    pub expiry: Option<DateTime<Utc>>,
}

/// Scope list as found on disk: either a list or one space-joined string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeField {
    List(Vec<String>),
    Joined(String),
}

impl ScopeField {
    fn into_set(self) -> BTreeSet<String> {
        match self {
            ScopeField::List(list) => list.into_iter().filter(|s| !s.is_empty()).collect(),
            ScopeField::Joined(joined) => joined.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// The shape this crate persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalShape {
    pub token: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub scopes: Option<ScopeField>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

/// Token file written by Google's own client libraries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderNativeShape {
    pub access_token: String,
    #[serde(default, deserialize_with = "lenient")]
    pub refresh_token: Option<String>,
    #[serde(default, alias = "scopes", deserialize_with = "lenient")]
    pub scope: Option<ScopeField>,
    #[serde(default, deserialize_with = "lenient")]
    pub expiry_date: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub token_uri: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub client_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub client_secret: Option<String>,
}

/// A recognised token record.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialShape {
    Canonical(CanonicalShape),
    ProviderNative(ProviderNativeShape),
}

impl CredentialShape {
    /// Detect the shape of a raw JSON record: a non-empty `token` wins over a
    /// non-empty `access_token`. Anything else is unrecognised.
    pub fn detect(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let non_empty = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty())
        };
        if non_empty("token") {
            return serde_json::from_value(value.clone())
                .ok()
                .map(CredentialShape::Canonical);
        }
        if non_empty("access_token") {
            return serde_json::from_value(value.clone())
                .ok()
                .map(CredentialShape::ProviderNative);
        }
        None
    }
}

impl Credential {
    /// Normalize a raw JSON record into a credential. Unknown shapes yield `None`.
    pub fn from_value(value: &Value, defaults: &ClientDefaults) -> Option<Self> {
        CredentialShape::detect(value).map(|shape| Self::from_shape(shape, defaults))
    }

    pub fn from_shape(shape: CredentialShape, defaults: &ClientDefaults) -> Self {
        match shape {
            CredentialShape::Canonical(c) => Credential {
                access_token: c.token,
                refresh_token: c.refresh_token.filter(|s| !s.is_empty()),
                token_uri: parse_token_uri(c.token_uri.as_deref()),
                client_id: or_default(c.client_id, &defaults.client_id),
                client_secret: or_default(c.client_secret, &defaults.client_secret),
                scopes: scopes_or_default(c.scopes),
                expiry: c.expiry.as_deref().and_then(parse_iso_expiry),
            },
            CredentialShape::ProviderNative(p) => Credential {
                access_token: p.access_token,
                refresh_token: p.refresh_token.filter(|s| !s.is_empty()),
                token_uri: parse_token_uri(p.token_uri.as_deref()),
                client_id: or_default(p.client_id, &defaults.client_id),
                client_secret: or_default(p.client_secret, &defaults.client_secret),
                scopes: scopes_or_default(p.scope),
                expiry: p
                    .expiry_date
                    .and_then(|ms| DateTime::from_timestamp_millis(ms as i64)),
            },
        }
    }

    /// Canonical on-disk representation.
    pub fn to_canonical(&self) -> CanonicalShape {
        CanonicalShape {
            token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            token_uri: Some(self.token_uri.to_string()),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scopes: Some(ScopeField::List(self.scopes.iter().cloned().collect())),
            expiry: self
                .expiry
                .map(|e| e.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }

    /// True when the access token is expired or will be within `skew`.
    /// A credential without an expiry is never considered expired.
    pub fn is_expired(&self, now: DateTime<Utc>, skew: TimeDelta) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now + skew)
    }
}

/// Drop sub-millisecond precision so expiries survive the canonical round-trip.
pub fn truncate_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

/// Optional fields of a recognised record: a value of the wrong type is
/// dropped instead of rejecting the whole record.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn or_default(own: Option<String>, fallback: &Option<String>) -> Option<String> {
    own.filter(|s| !s.is_empty())
        .or_else(|| fallback.clone().filter(|s| !s.is_empty()))
}

fn parse_token_uri(raw: Option<&str>) -> Url {
    raw.and_then(|s| Url::parse(s).ok())
        .or_else(|| Url::parse(GOOGLE_TOKEN_URI).ok())
        .expect("GOOGLE_TOKEN_URI is a valid url")
}

fn scopes_or_default(scopes: Option<ScopeField>) -> BTreeSet<String> {
    let set = scopes.map(ScopeField::into_set).unwrap_or_default();
    if set.is_empty() {
        BTreeSet::from([YOUTUBE_SCOPE.to_string()])
    } else {
        set
    }
}

fn parse_iso_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(truncate_millis(dt.with_timezone(&Utc)));
    }
    // Offset-less timestamps (Python's isoformat on naive datetimes) are UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| truncate_millis(naive.and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> ClientDefaults {
        ClientDefaults {
            client_id: Some("default-id".into()),
            client_secret: Some("default-secret".into()),
        }
    }

    #[test]
    fn provider_native_shape_is_normalized() {
        let raw = json!({
            "access_token": "ya29.abc",
            "refresh_token": "1//refresh",
            "scope": "https://www.googleapis.com/auth/youtube openid",
            "token_type": "Bearer",
            "expiry_date": 1_760_868_000_123_i64,
        });
        let cred = Credential::from_value(&raw, &defaults()).unwrap();
        assert_eq!(cred.access_token, "ya29.abc");
        assert_eq!(cred.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(cred.token_uri.as_str(), GOOGLE_TOKEN_URI);
        assert_eq!(cred.client_id.as_deref(), Some("default-id"));
        assert_eq!(cred.client_secret.as_deref(), Some("default-secret"));
        assert_eq!(cred.scopes.len(), 2);
        assert!(cred.scopes.contains("openid"));
        assert_eq!(cred.expiry.unwrap().timestamp_millis(), 1_760_868_000_123);
    }

    #[test]
    fn canonical_token_field_wins_over_access_token() {
        let raw = json!({ "token": "canonical", "access_token": "native" });
        match CredentialShape::detect(&raw) {
            Some(CredentialShape::Canonical(c)) => assert_eq!(c.token, "canonical"),
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn unrecognised_shapes_normalize_to_none() {
        assert!(Credential::from_value(&json!({ "foo": "bar" }), &defaults()).is_none());
        assert!(Credential::from_value(&json!({ "token": "" }), &defaults()).is_none());
        assert!(Credential::from_value(&json!(["token"]), &defaults()).is_none());
        assert!(Credential::from_value(&json!("token"), &defaults()).is_none());
    }

    #[test]
    fn renormalizing_canonical_output_is_idempotent() {
        let raw = json!({
            "access_token": "ya29.abc",
            "scope": "b a",
            "expiry_date": 1_760_868_000_999_i64,
        });
        let first = Credential::from_value(&raw, &defaults()).unwrap();
        let canonical = serde_json::to_value(first.to_canonical()).unwrap();
        let second = Credential::from_value(&canonical, &defaults()).unwrap();
        assert_eq!(first, second);
        let again = serde_json::to_value(second.to_canonical()).unwrap();
        assert_eq!(canonical, again);
    }

    #[test]
    fn naive_iso_expiry_is_read_as_utc() {
        let raw = json!({ "token": "t", "expiry": "2026-10-19T08:30:00.250000" });
        let cred = Credential::from_value(&raw, &ClientDefaults::default()).unwrap();
        assert_eq!(
            cred.expiry.unwrap().to_rfc3339_opts(SecondsFormat::Millis, true),
            "2026-10-19T08:30:00.250Z"
        );
    }

    #[test]
    fn invalid_expiry_is_dropped() {
        let raw = json!({ "token": "t", "expiry": "tomorrow-ish" });
        let cred = Credential::from_value(&raw, &ClientDefaults::default()).unwrap();
        assert!(cred.expiry.is_none());
        assert!(cred.client_id.is_none());
        assert!(cred.scopes.contains(YOUTUBE_SCOPE));
    }

    #[test]
    fn mistyped_optional_fields_keep_the_credential() {
        let native = json!({
            "access_token": "ya29",
            "refresh_token": "r",
            "expiry_date": "1760868000000",
        });
        let cred = Credential::from_value(&native, &defaults()).unwrap();
        assert_eq!(cred.access_token, "ya29");
        assert_eq!(cred.refresh_token.as_deref(), Some("r"));
        assert!(cred.expiry.is_none());

        let canonical = json!({
            "token": "t",
            "refresh_token": "r",
            "expiry": 1_760_868_000,
            "scopes": 42,
            "client_id": false,
        });
        let cred = Credential::from_value(&canonical, &defaults()).unwrap();
        assert_eq!(cred.access_token, "t");
        assert_eq!(cred.refresh_token.as_deref(), Some("r"));
        assert!(cred.expiry.is_none());
        assert!(cred.scopes.contains(YOUTUBE_SCOPE));
        assert_eq!(cred.client_id.as_deref(), Some("default-id"));
    }

    #[test]
    fn empty_client_fields_fall_back_to_defaults() {
        let raw = json!({ "token": "t", "client_id": "", "client_secret": "" });
        let cred = Credential::from_value(&raw, &defaults()).unwrap();
        assert_eq!(cred.client_id.as_deref(), Some("default-id"));
        assert_eq!(cred.client_secret.as_deref(), Some("default-secret"));

        let raw = json!({ "access_token": "a", "client_id": "" });
        let cred = Credential::from_value(&raw, &ClientDefaults::default()).unwrap();
        assert!(cred.client_id.is_none());
    }

    #[test]
    fn expiry_check_honours_skew() {
        let now = Utc::now();
        let mut cred = Credential::from_value(&json!({ "token": "t" }), &defaults()).unwrap();
        assert!(!cred.is_expired(now, TimeDelta::seconds(60)));
        cred.expiry = Some(now + TimeDelta::seconds(30));
        assert!(cred.is_expired(now, TimeDelta::seconds(60)));
        assert!(!cred.is_expired(now, TimeDelta::zero()));
    }
}
