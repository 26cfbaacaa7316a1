//! YouTube Data API v3 wire types and the flattened views served to the browser.

use serde::{Deserialize, Serialize};

/// Titles YouTube substitutes for videos that were removed or made private.
pub const ORPHAN_TITLES: [&str; 2] = ["Deleted video", "Private video"];

/// One page of a `list` call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub default: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistResource {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<PlaylistSnippet>,
    #[serde(default)]
    pub content_details: Option<PlaylistContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaylistSnippet {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistContentDetails {
    #[serde(default)]
    pub item_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemResource {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<PlaylistSnippet>,
    #[serde(default)]
    pub content_details: Option<ItemContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemContentDetails {
    #[serde(default)]
    pub video_id: Option<String>,
}

/// Playlist as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub item_count: u64,
    pub thumbnail: Option<String>,
}

impl From<PlaylistResource> for Playlist {
    fn from(p: PlaylistResource) -> Self {
        let snippet = p.snippet.unwrap_or_default();
        Self {
            id: p.id,
            title: snippet.title.unwrap_or_default(),
            item_count: p
                .content_details
                .and_then(|d| d.item_count)
                .unwrap_or_default(),
            thumbnail: thumbnail_url(snippet.thumbnails),
        }
    }
}

/// Playlist entry as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub playlist_item_id: String,
    pub video_id: Option<String>,
    pub title: String,
    pub thumbnail: Option<String>,
}

impl PlaylistItem {
    /// The video behind this entry is gone or no longer visible to us.
    pub fn is_orphan(&self) -> bool {
        ORPHAN_TITLES.contains(&self.title.as_str())
    }
}

impl From<PlaylistItemResource> for PlaylistItem {
    fn from(i: PlaylistItemResource) -> Self {
        let snippet = i.snippet.unwrap_or_default();
        Self {
            playlist_item_id: i.id,
            video_id: i.content_details.and_then(|d| d.video_id),
            title: snippet.title.unwrap_or_default(),
            thumbnail: thumbnail_url(snippet.thumbnails),
        }
    }
}

fn thumbnail_url(thumbnails: Option<Thumbnails>) -> Option<String> {
    thumbnails.and_then(|t| t.default).map(|t| t.url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_resource_flattens() {
        let raw = json!({
            "id": "PLI1",
            "snippet": {
                "title": "Some video",
                "thumbnails": { "default": { "url": "https://i.ytimg.com/vi/abc/default.jpg" } }
            },
            "contentDetails": { "videoId": "abc" }
        });
        let item: PlaylistItem = serde_json::from_value::<PlaylistItemResource>(raw)
            .unwrap()
            .into();
        assert_eq!(item.playlist_item_id, "PLI1");
        assert_eq!(item.video_id.as_deref(), Some("abc"));
        assert_eq!(
            item.thumbnail.as_deref(),
            Some("https://i.ytimg.com/vi/abc/default.jpg")
        );
        assert!(!item.is_orphan());
    }

    #[test]
    fn sparse_playlist_resource_uses_defaults() {
        let p: Playlist = serde_json::from_value::<PlaylistResource>(json!({ "id": "PL1" }))
            .unwrap()
            .into();
        assert_eq!(p.title, "");
        assert_eq!(p.item_count, 0);
        assert!(p.thumbnail.is_none());
    }

    #[test]
    fn sentinel_titles_mark_orphans() {
        for title in ORPHAN_TITLES {
            let item = PlaylistItem {
                playlist_item_id: "x".into(),
                video_id: None,
                title: title.into(),
                thumbnail: None,
            };
            assert!(item.is_orphan());
        }
    }
}
