use crate::error::DeckError;
use crate::handlers::{lenient, require_non_empty};
use crate::middleware::session::Session;
use crate::service::playlist_ops::{self, TransferItem, TransferMode};
use axum::{
    Json,
    extract::{Path, rejection::JsonRejection},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteItemsPayload {
    pub playlist_item_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferPayload {
    pub target_playlist_id: String,
    pub mode: TransferMode,
    pub items: Vec<TransferItem>,
}

/// `video_ids` may be a list or one string of comma/whitespace separated refs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum VideoRefs {
    List(Vec<String>),
    Text(String),
}

impl Default for VideoRefs {
    fn default() -> Self {
        VideoRefs::List(Vec::new())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImportPayload {
    pub video_ids: VideoRefs,
}

/// GET /playlist/{playlist_id}/items -> items, with orphans pruned.
pub async fn list_items(
    session: Session,
    Path(playlist_id): Path<String>,
) -> Result<impl IntoResponse, DeckError> {
    let auth = session.signed_in()?.authorize().await?;
    let items = playlist_ops::list_items_pruned(&auth.api, &playlist_id).await?;
    Ok((auth.jar, Json(json!({ "items": items }))))
}

/// POST /playlist/{playlist_id}/dedupe
pub async fn dedupe(
    session: Session,
    Path(playlist_id): Path<String>,
) -> Result<impl IntoResponse, DeckError> {
    let auth = session.signed_in()?.authorize().await?;
    let outcome = playlist_ops::dedupe_playlist(&auth.api, &playlist_id).await?;
    Ok((auth.jar, Json(outcome)))
}

/// POST /playlist/{playlist_id}/items/delete-bulk {playlist_item_ids}
pub async fn delete_items_bulk(
    session: Session,
    Path(_playlist_id): Path<String>,
    payload: Result<Json<DeleteItemsPayload>, JsonRejection>,
) -> Result<impl IntoResponse, DeckError> {
    let signed_in = session.signed_in()?;
    let ids = require_non_empty(lenient(payload).playlist_item_ids, "No items provided")?;
    let auth = signed_in.authorize().await?;
    let result = playlist_ops::delete_items(&auth.api, ids).await;
    Ok((auth.jar, Json(result)))
}

/// POST /playlist/{playlist_id}/items/transfer {target_playlist_id, mode, items}
pub async fn transfer(
    session: Session,
    Path(playlist_id): Path<String>,
    payload: Result<Json<TransferPayload>, JsonRejection>,
) -> Result<impl IntoResponse, DeckError> {
    let signed_in = session.signed_in()?;
    let Json(payload) = payload.map_err(|e| DeckError::Validation(e.body_text()))?;
    let target = payload.target_playlist_id.trim().to_string();
    if target.is_empty() {
        return Err(DeckError::Validation("No target playlist provided".to_string()));
    }
    if target == playlist_id {
        return Err(DeckError::Validation(
            "Target playlist must differ from the source".to_string(),
        ));
    }
    let items = require_non_empty(payload.items, "No items provided")?;
    let auth = signed_in.authorize().await?;
    let result = playlist_ops::transfer_items(&auth.api, items, &target, payload.mode).await;
    Ok((auth.jar, Json(result)))
}

/// POST /playlist/{playlist_id}/import {video_ids}
pub async fn import(
    session: Session,
    Path(playlist_id): Path<String>,
    payload: Result<Json<ImportPayload>, JsonRejection>,
) -> Result<impl IntoResponse, DeckError> {
    let signed_in = session.signed_in()?;
    let refs = match lenient(payload).video_ids {
        VideoRefs::List(list) => playlist_ops::split_video_refs(list),
        VideoRefs::Text(text) => playlist_ops::split_video_refs([text]),
    };
    let refs = require_non_empty(refs, "No videos provided")?;
    let auth = signed_in.authorize().await?;
    let result = playlist_ops::import_videos(&auth.api, &playlist_id, refs).await;
    Ok((auth.jar, Json(result)))
}
