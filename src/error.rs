use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::{Deserialize, Serialize};
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum DeckError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not authenticated")]
    AuthorizationMissing,

    #[error("Authorization expired: {0}")]
    AuthorizationExpired(String),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("OAuth flow error: {0}")]
    OauthFlowError(String),

    #[error("{0}")]
    MissingClientSecrets(String),

    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),
}

impl DeckError {
    /// Build an upstream error from a non-2xx YouTube reply body.
    pub fn from_upstream(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<YoutubeError>(body)
            .map(|e| e.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    status.to_string()
                } else {
                    trimmed.to_string()
                }
            });
        if status == StatusCode::UNAUTHORIZED {
            DeckError::AuthorizationExpired(message)
        } else {
            DeckError::Upstream { status, message }
        }
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for DeckError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => DeckError::Oauth2Server {
                error: err.error().to_string(),
            },
            RequestTokenError::Request(req_e) => {
                DeckError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => DeckError::Json(parse_err.into_inner()),
            RequestTokenError::Other(s) => DeckError::Oauth2Token(s),
        }
    }
}

impl IntoResponse for DeckError {
    fn into_response(self) -> axum::response::Response {
        let message = self.to_string();
        let (status, code) = match &self {
            DeckError::AuthorizationMissing => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            DeckError::AuthorizationExpired(_)
            | DeckError::Oauth2Token(_)
            | DeckError::Oauth2Server { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            DeckError::OauthFlowError(_) | DeckError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            DeckError::Upstream { status, .. } => {
                let code = match *status {
                    StatusCode::FORBIDDEN => "FORBIDDEN",
                    StatusCode::NOT_FOUND => "NOT_FOUND",
                    StatusCode::TOO_MANY_REQUESTS => "RATE_LIMIT",
                    _ => "UPSTREAM_ERROR",
                };
                (StatusCode::BAD_REQUEST, code)
            }
            DeckError::Reqwest(_) | DeckError::UrlParse(_) => {
                (StatusCode::BAD_GATEWAY, "BAD_GATEWAY")
            }
            DeckError::MissingClientSecrets(_)
            | DeckError::Json(_)
            | DeckError::Io(_)
            | DeckError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };
        let body = ApiErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// YouTube Data API error envelope.
#[derive(Deserialize, Debug)]
pub struct YoutubeError {
    pub error: YoutubeErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct YoutubeErrorBody {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_is_taken_verbatim_from_envelope() {
        let body = r#"{"error":{"code":404,"message":"Playlist not found.","errors":[]}}"#;
        match DeckError::from_upstream(StatusCode::NOT_FOUND, body) {
            DeckError::Upstream { status, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "Playlist not found.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn upstream_falls_back_to_raw_body() {
        let err = DeckError::from_upstream(StatusCode::BAD_GATEWAY, "gateway down\n");
        assert_eq!(err.to_string(), "gateway down");
    }

    #[test]
    fn unauthorized_maps_to_expired_authorization() {
        let body = r#"{"error":{"code":401,"message":"Invalid Credentials"}}"#;
        let err = DeckError::from_upstream(StatusCode::UNAUTHORIZED, body);
        assert!(matches!(err, DeckError::AuthorizationExpired(ref m) if m == "Invalid Credentials"));
    }
}
