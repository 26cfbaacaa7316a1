use crate::api::youtube_api::PlaylistApi;
use crate::error::DeckError;
use crate::handlers::dashboard::{SortQuery, error_page};
use crate::handlers::{lenient, require_non_empty};
use crate::middleware::session::Session;
use crate::router::DeckState;
use crate::service::playlist_ops;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteBulkPayload {
    pub playlist_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MergePayload {
    pub source_ids: Vec<String>,
    pub target_id: String,
    pub new_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenamePayload {
    pub title: String,
}

/// GET /api/playlists -> sorted playlists with totals.
pub async fn list_playlists(
    session: Session,
    Query(query): Query<SortQuery>,
) -> Result<impl IntoResponse, DeckError> {
    let auth = session.signed_in()?.authorize().await?;
    let playlists = playlist_ops::sort_playlists(
        auth.api.list_playlists().await?,
        query.key(),
        query.order(),
    );
    let total_videos: u64 = playlists.iter().map(|p| p.item_count).sum();
    Ok((
        auth.jar,
        Json(json!({
            "playlists": playlists,
            "total_playlists": playlists.len(),
            "total_videos": total_videos,
        })),
    ))
}

/// GET /api/usage -> API calls made today.
pub async fn usage_today(State(state): State<DeckState>) -> Result<impl IntoResponse, DeckError> {
    let today = state.usage.count_today().await?;
    let by_call = state.usage.breakdown_today().await?;
    Ok(Json(json!({ "today": today, "by_call": by_call })))
}

/// POST /delete/{playlist_id}. Browser forms are redirected back to the
/// dashboard; XHR callers get JSON.
pub async fn delete_playlist(
    session: Session,
    Path(playlist_id): Path<String>,
    Query(query): Query<SortQuery>,
    headers: HeaderMap,
) -> Response {
    let xhr = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

    let outcome = async {
        let auth = session.signed_in()?.authorize().await?;
        let res = auth.api.delete_playlist(&playlist_id).await;
        Ok::<_, DeckError>((auth.jar, res))
    }
    .await;

    match (outcome, xhr) {
        (Ok((jar, Ok(()))), true) => (jar, Json(json!({ "success": true }))).into_response(),
        (Ok((jar, Ok(()))), false) => {
            info!(playlist_id, "playlist deleted");
            let back = format!(
                "/?sort={}&order={}",
                query.key().as_str(),
                query.order().as_str()
            );
            (jar, Redirect::to(&back)).into_response()
        }
        (Ok((jar, Err(e))), true) => (jar, e).into_response(),
        (Ok((jar, Err(e))), false) => (jar, error_page(&e)).into_response(),
        (Err(DeckError::AuthorizationMissing), false) => Redirect::to("/").into_response(),
        (Err(e), true) => e.into_response(),
        (Err(e), false) => error_page(&e),
    }
}

/// POST /delete-bulk {playlist_ids}
pub async fn delete_bulk(
    session: Session,
    payload: Result<Json<DeleteBulkPayload>, JsonRejection>,
) -> Result<impl IntoResponse, DeckError> {
    let signed_in = session.signed_in()?;
    let ids = require_non_empty(lenient(payload).playlist_ids, "No playlists provided")?;
    let auth = signed_in.authorize().await?;
    let result = playlist_ops::delete_playlists(&auth.api, ids).await;
    Ok((auth.jar, Json(result)))
}

/// POST /playlists/merge {source_ids, target_id, new_name?}
pub async fn merge(
    session: Session,
    payload: Result<Json<MergePayload>, JsonRejection>,
) -> Result<impl IntoResponse, DeckError> {
    let signed_in = session.signed_in()?;
    let payload = lenient(payload);
    let target = payload.target_id.trim().to_string();
    if target.is_empty() {
        return Err(DeckError::Validation("No target playlist provided".to_string()));
    }
    let mut sources = require_non_empty(payload.source_ids, "No source playlists provided")?;
    if sources.contains(&target) {
        return Err(DeckError::Validation(
            "Target playlist cannot also be a source".to_string(),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    sources.retain(|s| seen.insert(s.clone()));

    let auth = signed_in.authorize().await?;
    let result =
        playlist_ops::merge_playlists(&auth.api, &sources, &target, payload.new_name.as_deref())
            .await;
    Ok((auth.jar, Json(result)))
}

/// POST /playlist/{playlist_id}/rename {title}
pub async fn rename(
    session: Session,
    Path(playlist_id): Path<String>,
    payload: Result<Json<RenamePayload>, JsonRejection>,
) -> Result<impl IntoResponse, DeckError> {
    let signed_in = session.signed_in()?;
    let title = lenient(payload).title.trim().to_string();
    if title.is_empty() {
        return Err(DeckError::Validation("Title must not be empty".to_string()));
    }
    let auth = signed_in.authorize().await?;
    playlist_ops::rename_playlist(&auth.api, &playlist_id, &title).await?;
    Ok((auth.jar, Json(json!({ "success": true }))))
}
