use crate::error::DeckError;
use crate::service::usage::UsageCounter;
use crate::types::youtube::{
    ListPage, Playlist, PlaylistItem, PlaylistItemResource, PlaylistResource,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::future::Future;
use tracing::debug;
use url::Url;

const PAGE_SIZE: &str = "50";

/// Playlist operations the bulk layer is written against.
pub trait PlaylistApi: Send + Sync {
    fn list_playlists(&self) -> impl Future<Output = Result<Vec<Playlist>, DeckError>> + Send;

    fn list_items(
        &self,
        playlist_id: &str,
    ) -> impl Future<Output = Result<Vec<PlaylistItem>, DeckError>> + Send;

    fn delete_playlist(&self, playlist_id: &str)
    -> impl Future<Output = Result<(), DeckError>> + Send;

    fn delete_item(&self, item_id: &str) -> impl Future<Output = Result<(), DeckError>> + Send;

    fn insert_item(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> impl Future<Output = Result<(), DeckError>> + Send;

    fn rename_playlist(
        &self,
        playlist_id: &str,
        title: &str,
    ) -> impl Future<Output = Result<(), DeckError>> + Send;
}

/// YouTube Data API v3 client bound to one access token.
#[derive(Clone)]
pub struct YoutubeApi {
    http: reqwest::Client,
    base: Url,
    access_token: String,
    usage: UsageCounter,
}

impl YoutubeApi {
    pub fn new(
        http: reqwest::Client,
        base: Url,
        access_token: impl Into<String>,
        usage: UsageCounter,
    ) -> Self {
        Self {
            http,
            base,
            access_token: access_token.into(),
            usage,
        }
    }

    /// Fetch every page of `resource`, in provider order.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, DeckError> {
        let url = self.base.join(resource)?;
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut req = self
                .http
                .get(url.clone())
                .bearer_auth(&self.access_token)
                .query(query)
                .query(&[("maxResults", PAGE_SIZE)]);
            if let Some(token) = page_token.as_deref() {
                req = req.query(&[("pageToken", token)]);
            }
            self.usage.record(resource, "list").await;
            let resp = req.send().await?;
            let page: ListPage<T> = Self::check(resp).await?.json().await?;
            items.extend(page.items);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        debug!(resource, count = items.len(), "list_all complete");
        Ok(items)
    }

    pub async fn insert(
        &self,
        resource: &str,
        part: &str,
        body: &Value,
    ) -> Result<(), DeckError> {
        self.write(Method::POST, resource, "insert", &[("part", part)], Some(body))
            .await?;
        Ok(())
    }

    pub async fn update(
        &self,
        resource: &str,
        part: &str,
        body: &Value,
    ) -> Result<(), DeckError> {
        self.write(Method::PUT, resource, "update", &[("part", part)], Some(body))
            .await?;
        Ok(())
    }

    pub async fn delete(&self, resource: &str, id: &str) -> Result<(), DeckError> {
        self.write(Method::DELETE, resource, "delete", &[("id", id)], None)
            .await?;
        Ok(())
    }

    /// One mutating call, no retry.
    async fn write(
        &self,
        method: Method,
        resource: &str,
        operation: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<reqwest::Response, DeckError> {
        let url = self.base.join(resource)?;
        let mut req = self
            .http
            .request(method, url)
            .bearer_auth(&self.access_token)
            .query(query);
        if let Some(body) = body {
            req = req.json(body);
        }
        self.usage.record(resource, operation).await;
        let resp = req.send().await?;
        Self::check(resp).await
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, DeckError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(DeckError::from_upstream(status, &body))
    }
}

impl PlaylistApi for YoutubeApi {
    async fn list_playlists(&self) -> Result<Vec<Playlist>, DeckError> {
        let raw: Vec<PlaylistResource> = self
            .list_all(
                "playlists",
                &[("part", "snippet,contentDetails"), ("mine", "true")],
            )
            .await?;
        Ok(raw.into_iter().map(Playlist::from).collect())
    }

    async fn list_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, DeckError> {
        let raw: Vec<PlaylistItemResource> = self
            .list_all(
                "playlistItems",
                &[("part", "snippet,contentDetails"), ("playlistId", playlist_id)],
            )
            .await?;
        Ok(raw.into_iter().map(PlaylistItem::from).collect())
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<(), DeckError> {
        self.delete("playlists", playlist_id).await
    }

    async fn delete_item(&self, item_id: &str) -> Result<(), DeckError> {
        self.delete("playlistItems", item_id).await
    }

    async fn insert_item(&self, playlist_id: &str, video_id: &str) -> Result<(), DeckError> {
        let body = json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": { "kind": "youtube#video", "videoId": video_id },
            }
        });
        self.insert("playlistItems", "snippet", &body).await
    }

    async fn rename_playlist(&self, playlist_id: &str, title: &str) -> Result<(), DeckError> {
        let body = json!({ "id": playlist_id, "snippet": { "title": title } });
        self.update("playlists", "snippet", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use axum::http::StatusCode;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path, query_param, query_param_is_missing},
    };

    async fn api(server: &MockServer) -> (YoutubeApi, UsageCounter) {
        let usage = UsageCounter::new(db::connect("sqlite::memory:").await.unwrap());
        let base = Url::parse(&format!("{}/youtube/v3/", server.uri())).unwrap();
        (
            YoutubeApi::new(reqwest::Client::new(), base, "tok", usage.clone()),
            usage,
        )
    }

    fn item(id: &str, video: &str) -> Value {
        json!({
            "id": id,
            "snippet": { "title": format!("title {video}") },
            "contentDetails": { "videoId": video }
        })
    }

    #[tokio::test]
    async fn list_all_follows_cursor_and_counts_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/playlistItems"))
            .and(query_param("playlistId", "PL1"))
            .and(query_param_is_missing("pageToken"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [item("i1", "a"), item("i2", "b")],
                "nextPageToken": "P2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/playlistItems"))
            .and(query_param("pageToken", "P2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [item("i3", "a")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (api, usage) = api(&server).await;
        let items = api.list_items("PL1").await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.playlist_item_id.as_str()).collect();
        assert_eq!(ids, ["i1", "i2", "i3"]);
        assert_eq!(usage.count_today().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn insert_posts_resource_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/youtube/v3/playlistItems"))
            .and(query_param("part", "snippet"))
            .and(body_partial_json(json!({
                "snippet": { "playlistId": "PL1", "resourceId": { "videoId": "vid" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "new" })))
            .expect(1)
            .mount(&server)
            .await;

        let (api, usage) = api(&server).await;
        api.insert_item("PL1", "vid").await.unwrap();
        assert_eq!(usage.count_today().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_delete_carries_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/youtube/v3/playlists"))
            .and(query_param("id", "gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": 404, "message": "Playlist not found." }
            })))
            .mount(&server)
            .await;

        let (api, _) = api(&server).await;
        match api.delete_playlist("gone").await.unwrap_err() {
            DeckError::Upstream { status, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "Playlist not found.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rename_sends_update() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/youtube/v3/playlists"))
            .and(body_partial_json(json!({ "id": "PL1", "snippet": { "title": "X" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "PL1" })))
            .expect(1)
            .mount(&server)
            .await;

        let (api, _) = api(&server).await;
        api.rename_playlist("PL1", "X").await.unwrap();
    }

    #[tokio::test]
    async fn write_with_empty_success_body_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/youtube/v3/playlistItems"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/youtube/v3/playlists"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        let (api, _) = api(&server).await;
        api.insert_item("PL1", "vid").await.unwrap();
        api.rename_playlist("PL1", "X").await.unwrap();
    }
}
