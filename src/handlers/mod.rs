pub mod dashboard;
pub mod google_oauth;
pub mod items;
pub mod playlists;

use crate::error::DeckError;
use axum::{Json, extract::rejection::JsonRejection};

/// Malformed or missing bodies read as an empty payload; the emptiness
/// checks that follow turn that into a validation error.
pub(crate) fn lenient<T: Default>(payload: Result<Json<T>, JsonRejection>) -> T {
    payload.map(|Json(p)| p).unwrap_or_default()
}

pub(crate) fn require_non_empty<T>(items: Vec<T>, message: &str) -> Result<Vec<T>, DeckError> {
    if items.is_empty() {
        return Err(DeckError::Validation(message.to_string()));
    }
    Ok(items)
}
