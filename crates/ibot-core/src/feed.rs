//! Upstream news feed: item model, source port and the HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{domain::ItemId, errors::Error, Result};

/// One news/injury update from the feed. Only these fields are read.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Port for anything that yields the current feed, newest first.
///
/// Implementations are lossy: failures produce an empty list, never an error.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Vec<NewsItem>;
}

/// Parse a feed document: `{ "news": [ {id, title, created_at}, ... ] }`.
///
/// Only entries that are not objects are skipped. Fields are read one by one
/// so a single odd field never drops the item.
pub fn parse_feed(body: &str) -> Result<Vec<NewsItem>> {
    let doc: Value = serde_json::from_str(body)?;
    let Some(news) = doc.get("news").and_then(Value::as_array) else {
        return Err(Error::Feed("response has no \"news\" array".to_string()));
    };

    let items = news
        .iter()
        .filter_map(|raw| {
            let item = item_from_value(raw);
            if item.is_none() {
                tracing::debug!(entry = %raw, "skipping non-object feed entry");
            }
            item
        })
        .collect();
    Ok(items)
}

fn item_from_value(raw: &Value) -> Option<NewsItem> {
    let obj = raw.as_object()?;
    Some(NewsItem {
        id: obj.get("id").and_then(item_id),
        title: obj
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        created_at: obj
            .get("created_at")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Integers that fit `i64` stay numeric; other numbers keep their JSON text
/// as a string id. Anything else counts as no id.
fn item_id(raw: &Value) -> Option<ItemId> {
    match raw {
        Value::Number(n) => Some(
            n.as_i64()
                .map(ItemId::Int)
                .unwrap_or_else(|| ItemId::Str(n.to_string())),
        ),
        Value::String(s) => Some(ItemId::Str(s.clone())),
        Value::Null => None,
        other => {
            tracing::debug!(id = %other, "unusable item id, treating as missing");
            None
        }
    }
}

#[derive(Clone, Debug)]
pub struct FeedClient {
    url: String,
    http: reqwest::Client,
}

impl FeedClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }

    /// Single request, no retries. Errors carry the cause.
    pub async fn try_fetch(&self) -> Result<Vec<NewsItem>> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Feed(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Feed(format!("unexpected status {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Feed(format!("read body failed: {e}")))?;
        parse_feed(&body)
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch(&self) -> Vec<NewsItem> {
        match self.try_fetch().await {
            Ok(items) => items,
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "feed fetch failed, treating as empty");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Serve a single canned HTTP response and return the URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let Ok((mut sock, _)) = listener.accept().await else {
                return;
            };
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let resp = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = sock.write_all(resp.as_bytes()).await;
            let _ = sock.shutdown().await;
        });
        format!("http://{addr}/news")
    }

    #[test]
    fn parses_mixed_id_types_and_missing_fields() {
        let body = r#"{"news":[
            {"id": 7, "title": "A OUT", "created_at": "2024-01-01T00:00:00Z", "extra": true},
            {"id": "abc", "title": "B"},
            {"title": "C"},
            42
        ]}"#;
        let items = parse_feed(body).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id, Some(ItemId::Int(7)));
        assert_eq!(items[1].id, Some(ItemId::Str("abc".into())));
        assert_eq!(items[1].created_at, None);
        assert_eq!(items[2].id, None);
    }

    #[test]
    fn odd_fields_never_drop_the_item() {
        let body = r#"{"news":[
            {"id": 1, "title": null},
            {"id": 18446744073709551615, "title": "Big id"},
            {"id": 2.0, "title": "Float id"},
            {"id": [3], "title": "Array id", "created_at": 5},
            {"id": 3, "title": "Ok OUT"}
        ]}"#;
        let items = parse_feed(body).unwrap();
        assert_eq!(items.len(), 5);

        assert_eq!(items[0].id, Some(ItemId::Int(1)));
        assert_eq!(items[0].title, "");
        assert_eq!(
            items[1].id,
            Some(ItemId::Str("18446744073709551615".into()))
        );
        assert_eq!(items[2].id, Some(ItemId::Str("2.0".into())));
        assert_eq!(items[3].id, None);
        assert_eq!(items[3].created_at, None);
        assert_eq!(items[4].title, "Ok OUT");
    }

    #[test]
    fn missing_news_key_is_an_error() {
        assert!(matches!(parse_feed(r#"{"data": []}"#), Err(Error::Feed(_))));
        assert!(matches!(parse_feed("<html>"), Err(Error::Json(_))));
    }

    #[tokio::test]
    async fn fetch_returns_items_on_success() {
        let url = serve_once("200 OK", r#"{"news":[{"id":1,"title":"X"}]}"#).await;
        let client = FeedClient::new(url, Duration::from_secs(5)).unwrap();
        let items = client.fetch().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "X");
    }

    #[tokio::test]
    async fn fetch_is_lossy_on_bad_responses() {
        for (status, body) in [
            ("200 OK", "not json"),
            ("200 OK", r#"{"items":[]}"#),
            ("503 Service Unavailable", r#"{"news":[{"id":1}]}"#),
        ] {
            let url = serve_once(status, body).await;
            let client = FeedClient::new(url, Duration::from_secs(5)).unwrap();
            assert!(client.fetch().await.is_empty(), "{status} {body}");
        }
    }

    #[tokio::test]
    async fn fetch_is_lossy_on_connection_errors() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = FeedClient::new(format!("http://{addr}/"), Duration::from_secs(2)).unwrap();
        assert!(client.fetch().await.is_empty());
        assert!(client.try_fetch().await.is_err());
    }
}
