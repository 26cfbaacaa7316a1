//! Server-rendered pages. The interactive bits (bulk actions, item views)
//! talk to the JSON routes from the browser.

use crate::api::youtube_api::PlaylistApi;
use crate::error::DeckError;
use crate::middleware::session::Session;
use crate::router::DeckState;
use crate::service::playlist_ops::{SortKey, SortOrder, sort_playlists};
use crate::types::youtube::Playlist;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::fmt::Write;
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
pub struct SortQuery {
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl SortQuery {
    pub fn key(&self) -> SortKey {
        SortKey::parse(self.sort.as_deref())
    }

    pub fn order(&self) -> SortOrder {
        SortOrder::parse(self.order.as_deref())
    }
}

/// GET / -> sign-in page, or the sorted playlist table.
pub async fn index(
    State(state): State<DeckState>,
    session: Session,
    Query(query): Query<SortQuery>,
) -> Response {
    let Ok(signed_in) = session.signed_in() else {
        return Html(sign_in_page()).into_response();
    };
    let auth = match signed_in.authorize().await {
        Ok(auth) => auth,
        Err(e) => return error_page(&e),
    };
    let playlists = match auth.api.list_playlists().await {
        Ok(p) => sort_playlists(p, query.key(), query.order()),
        Err(e) => return (auth.jar, error_page(&e)).into_response(),
    };
    let calls_today = state.usage.count_today().await.unwrap_or_else(|e| {
        warn!(error = %e, "usage count unavailable");
        0
    });
    let page = playlists_page(&playlists, query.key(), query.order(), calls_today);
    (auth.jar, Html(page)).into_response()
}

pub fn error_page(err: &DeckError) -> Response {
    let status = match err {
        DeckError::AuthorizationMissing | DeckError::AuthorizationExpired(_) => {
            StatusCode::UNAUTHORIZED
        }
        DeckError::MissingClientSecrets(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    let body = layout(
        "Error",
        &format!(
            "<h1>Something went wrong</h1><p class=\"error\">{}</p><p><a href=\"/\">Back</a> · <a href=\"/logout\">Sign out</a></p>",
            escape(&err.to_string())
        ),
    );
    (status, Html(body)).into_response()
}

fn sign_in_page() -> String {
    layout(
        "Sign in",
        "<h1>tubedeck</h1><p>Manage your YouTube playlists.</p><p><a class=\"button\" href=\"/login\">Sign in with Google</a></p>",
    )
}

fn playlists_page(
    playlists: &[Playlist],
    key: SortKey,
    order: SortOrder,
    calls_today: i64,
) -> String {
    let total_videos: u64 = playlists.iter().map(|p| p.item_count).sum();
    let mut body = String::new();
    let _ = write!(
        body,
        "<h1>Your playlists</h1><p>{} playlists · {} videos · {} API calls today · <a href=\"/logout\">Sign out</a></p>",
        playlists.len(),
        total_videos,
        calls_today
    );
    let _ = write!(
        body,
        "<table><thead><tr><th></th><th>{}</th><th>{}</th><th></th></tr></thead><tbody>",
        sort_link("Title", SortKey::Title, key, order),
        sort_link("Videos", SortKey::Count, key, order)
    );
    for p in playlists {
        let thumb = p
            .thumbnail
            .as_deref()
            .map(|url| format!("<img src=\"{}\" alt=\"\">", escape(url)))
            .unwrap_or_default();
        let _ = write!(
            body,
            "<tr data-id=\"{id}\"><td>{thumb}</td><td>{title}</td><td>{count}</td>\
             <td><form method=\"post\" action=\"/delete/{id}?sort={sort}&amp;order={order}\">\
             <button type=\"submit\">Delete</button></form></td></tr>",
            id = escape(&p.id),
            title = escape(&p.title),
            count = p.item_count,
            sort = key.as_str(),
            order = order.as_str(),
        );
    }
    body.push_str("</tbody></table>");
    layout("Playlists", &body)
}

/// Header link; clicking the active column flips the order.
fn sort_link(label: &str, column: SortKey, active: SortKey, order: SortOrder) -> String {
    let next = if column == active && order == SortOrder::Asc {
        SortOrder::Desc
    } else {
        SortOrder::Asc
    };
    format!(
        "<a href=\"/?sort={}&amp;order={}\">{}</a>",
        column.as_str(),
        next.as_str(),
        label
    )
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{} · tubedeck</title></head><body>{}</body></html>",
        escape(title),
        body
    )
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<b>"Tom & Jerry's"</b>"#),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn table_shows_totals_and_escaped_titles() {
        let playlists = vec![
            Playlist {
                id: "PL1".into(),
                title: "<script>".into(),
                item_count: 3,
                thumbnail: None,
            },
            Playlist {
                id: "PL2".into(),
                title: "Mix".into(),
                item_count: 4,
                thumbnail: None,
            },
        ];
        let page = playlists_page(&playlists, SortKey::Count, SortOrder::Asc, 12);
        assert!(page.contains("2 playlists · 7 videos · 12 API calls today"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
        assert!(page.contains("/?sort=count&amp;order=desc"));
        assert!(page.contains("/delete/PL2?sort=count&amp;order=asc"));
    }
}
