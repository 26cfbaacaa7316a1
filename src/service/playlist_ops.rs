//! Playlist operations composed from single API calls and [`run_bulk`].

use crate::api::youtube_api::PlaylistApi;
use crate::error::DeckError;
use crate::service::bulk::{BulkResult, run_bulk, run_bulk_with};
use crate::types::youtube::{Playlist, PlaylistItem};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Title,
    Count,
}

impl SortKey {
    /// Unknown or missing values fall back to title.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("count") => SortKey::Count,
            _ => SortKey::Title,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Title => "title",
            SortKey::Count => "count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Stable sort; titles compare case-insensitively.
pub fn sort_playlists(mut playlists: Vec<Playlist>, key: SortKey, order: SortOrder) -> Vec<Playlist> {
    let cmp = |a: &Playlist, b: &Playlist| -> Ordering {
        match key {
            SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortKey::Count => a.item_count.cmp(&b.item_count),
        }
    };
    match order {
        SortOrder::Asc => playlists.sort_by(cmp),
        SortOrder::Desc => playlists.sort_by(|a, b| cmp(b, a)),
    }
    playlists
}

pub async fn delete_playlists<A, I>(api: &A, playlist_ids: I) -> BulkResult
where
    A: PlaylistApi,
    I: IntoIterator<Item = String>,
{
    run_bulk(playlist_ids, move |id| async move {
        api.delete_playlist(&id).await
    })
    .await
}

pub async fn delete_items<A, I>(api: &A, item_ids: I) -> BulkResult
where
    A: PlaylistApi,
    I: IntoIterator<Item = String>,
{
    run_bulk(item_ids, move |id| async move { api.delete_item(&id).await }).await
}

/// Items of `playlist_id` minus orphans. Orphans are deleted on the way; that
/// cleanup was not asked for, so its failures are logged and dropped.
pub async fn list_items_pruned<A: PlaylistApi>(
    api: &A,
    playlist_id: &str,
) -> Result<Vec<PlaylistItem>, DeckError> {
    let (orphans, kept): (Vec<_>, Vec<_>) = api
        .list_items(playlist_id)
        .await?
        .into_iter()
        .partition(PlaylistItem::is_orphan);
    if !orphans.is_empty() {
        let pruned = delete_items(api, orphans.into_iter().map(|i| i.playlist_item_id)).await;
        debug!(
            playlist_id,
            pruned = pruned.success_count,
            failed = pruned.failures.len(),
            "pruned orphaned playlist items"
        );
    }
    Ok(kept)
}

/// Playlist item ids of every repeat of an already-seen video, in list order.
/// The first occurrence of each video is kept.
pub fn find_duplicates(items: &[PlaylistItem]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| {
            let video = item.video_id.as_deref()?;
            (!seen.insert(video)).then(|| item.playlist_item_id.clone())
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupeOutcome {
    /// Duplicates queued for deletion.
    pub removed: usize,
    #[serde(flatten)]
    pub result: BulkResult,
}

pub async fn dedupe_playlist<A: PlaylistApi>(
    api: &A,
    playlist_id: &str,
) -> Result<DedupeOutcome, DeckError> {
    let items = api.list_items(playlist_id).await?;
    let duplicates = find_duplicates(&items);
    let removed = duplicates.len();
    let result = delete_items(api, duplicates).await;
    info!(playlist_id, removed, failed = result.failures.len(), "dedupe finished");
    Ok(DedupeOutcome { removed, result })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    Copy,
    Move,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransferItem {
    pub playlist_item_id: String,
    pub video_id: String,
}

/// Insert each item's video into `target`. In move mode the source entry is
/// deleted after, and only after, its insert went through.
pub async fn transfer_items<A: PlaylistApi>(
    api: &A,
    items: Vec<TransferItem>,
    target: &str,
    mode: TransferMode,
) -> BulkResult {
    run_bulk_with(
        items,
        |item| item.playlist_item_id.clone(),
        move |item| async move {
            api.insert_item(target, &item.video_id).await?;
            if mode == TransferMode::Move {
                api.delete_item(&item.playlist_item_id).await?;
            }
            Ok(())
        },
    )
    .await
}

/// Fan every source into `target`, delete the sources, then optionally rename
/// the target. Each pass runs whatever the previous one reported.
pub async fn merge_playlists<A: PlaylistApi>(
    api: &A,
    sources: &[String],
    target: &str,
    new_title: Option<&str>,
) -> BulkResult {
    let mut result = BulkResult::default();

    for source in sources {
        match api.list_items(source).await {
            Ok(items) => {
                let videos = items.into_iter().filter_map(|i| i.video_id);
                let copied = run_bulk(videos, move |video| async move {
                    api.insert_item(target, &video).await
                })
                .await;
                result.absorb(copied);
            }
            Err(e) => result.fail(source.clone(), &e),
        }
    }

    result.absorb(delete_playlists(api, sources.iter().cloned()).await);

    if let Some(title) = new_title.map(str::trim).filter(|t| !t.is_empty()) {
        match api.rename_playlist(target, title).await {
            Ok(()) => result.success_count += 1,
            Err(e) => result.fail(target, &e),
        }
    }

    info!(
        sources = sources.len(),
        target,
        failed = result.failures.len(),
        "merge finished"
    );
    result
}

pub async fn rename_playlist<A: PlaylistApi>(
    api: &A,
    playlist_id: &str,
    title: &str,
) -> Result<(), DeckError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DeckError::Validation("Title must not be empty".to_string()));
    }
    api.rename_playlist(playlist_id, title).await
}

/// Split free-form input (lists, commas, whitespace) into video references.
pub fn split_video_refs<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .flat_map(|chunk| {
            chunk
                .as_ref()
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Video id from a bare id or a YouTube watch/short/embed/youtu.be URL.
pub fn video_id_from_ref(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let candidate = match Url::parse(raw) {
        Ok(url) => {
            let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
            let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
            match host {
                "youtu.be" => segments.next()?.to_string(),
                "youtube.com" | "music.youtube.com" => match segments.next()? {
                    "watch" => url
                        .query_pairs()
                        .find(|(k, _)| k == "v")
                        .map(|(_, v)| v.into_owned())?,
                    "shorts" | "embed" | "live" | "v" => segments.next()?.to_string(),
                    _ => return None,
                },
                _ => return None,
            }
        }
        Err(_) => raw.to_string(),
    };
    let valid = !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(candidate)
}

/// Insert every referenced video into `playlist_id`. Unparseable references
/// are reported as failures alongside rejected inserts.
pub async fn import_videos<A: PlaylistApi>(
    api: &A,
    playlist_id: &str,
    refs: Vec<String>,
) -> BulkResult {
    run_bulk(refs, move |raw| async move {
        let video = video_id_from_ref(&raw).ok_or_else(|| {
            DeckError::Validation(format!("'{raw}' is not a YouTube video id or URL"))
        })?;
        api.insert_item(playlist_id, &video).await
    })
    .await
}
