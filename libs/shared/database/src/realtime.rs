use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;

use crate::store::{snapshot_from_value, RemoteStore, Snapshot, SnapshotCallback, Subscription};

/// REST client for a realtime JSON tree database (`{url}/{path}.json`).
#[derive(Clone)]
pub struct RealtimeDbClient {
    client: Client,
    base_url: String,
    auth_token: String,
    timeout: Duration,
    reconnect_delay: Duration,
}

impl RealtimeDbClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.store_base_url().to_string(),
            auth_token: config.store_auth_token.clone(),
            timeout: Duration::from_secs(config.store_timeout_secs),
            reconnect_delay: Duration::from_secs(config.store_reconnect_secs),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path)
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn auth_query(&self) -> Vec<(&'static str, &str)> {
        if self.auth_token.is_empty() {
            Vec::new()
        } else {
            vec![("auth", self.auth_token.as_str())]
        }
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.get_headers())
            .query(&self.auth_query())
            .timeout(self.timeout);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Store error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("Store error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Follows the event stream of one collection until it ends or fails.
    async fn stream_changes(&self, collection: &str, on_change: &SnapshotCallback) -> Result<()> {
        let response = self
            .client
            .get(self.url(collection))
            .header(ACCEPT, "text/event-stream")
            .query(&self.auth_query())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Event stream for {} refused ({})", collection, status));
        }

        info!("Listening for changes on {}", collection);

        let mut body = response.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();
        let mut frame = EventFrame::default();

        while let Some(chunk) = body.next().await {
            pending.extend_from_slice(&chunk?);

            while let Some(newline) = pending.iter().position(|byte| *byte == b'\n') {
                let raw: Vec<u8> = pending.drain(..=newline).collect();
                let line = String::from_utf8_lossy(&raw);

                let Some(event) = frame.feed(line.trim_end_matches(['\r', '\n'])) else {
                    continue;
                };

                match event.as_str() {
                    "put" | "patch" => {
                        let snapshot = self.read_once(collection).await?;
                        debug!("{} changed, delivering {} records", collection, snapshot.len());
                        on_change(snapshot);
                    }
                    "keep-alive" => {}
                    "cancel" | "auth_revoked" => {
                        return Err(anyhow!("Event stream for {} closed by store: {}", collection, event));
                    }
                    other => debug!("Ignoring {} event on {}", other, collection),
                }
            }
        }

        Ok(())
    }
}

/// Accumulates `event:` lines until the blank line that ends an event.
#[derive(Default)]
struct EventFrame {
    name: Option<String>,
}

impl EventFrame {
    fn feed(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.name.take();
        }
        if let Some(name) = line.strip_prefix("event:") {
            self.name = Some(name.trim().to_string());
        }
        None
    }
}

#[async_trait]
impl RemoteStore for RealtimeDbClient {
    async fn read_once(&self, collection: &str) -> Result<Snapshot> {
        let value: Value = self.request(Method::GET, collection, None).await?;
        Ok(snapshot_from_value(value))
    }

    async fn subscribe(&self, collection: &str, on_change: SnapshotCallback) -> Result<Subscription> {
        let client = self.clone();
        let collection = collection.to_string();

        let task = tokio::spawn(async move {
            loop {
                match client.stream_changes(&collection, &on_change).await {
                    Ok(()) => warn!("Event stream for {} ended", collection),
                    Err(e) => error!("Event stream for {} failed: {}", collection, e),
                }
                // Mirrors keep their last snapshot while disconnected.
                tokio::time::sleep(client.reconnect_delay).await;
                info!("Reconnecting to {}", collection);
            }
        });

        Ok(Subscription::new(move || task.abort()))
    }

    async fn create(&self, collection: &str, record: Value) -> Result<String> {
        let response: Value = self.request(Method::POST, collection, Some(record)).await?;
        response
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Store did not return a key for new {} record", collection))
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<()> {
        let path = format!("{}/{}", collection, id);
        let _: Value = self.request(Method::PATCH, &path, Some(partial)).await?;
        Ok(())
    }

    async fn set(&self, collection: &str, id: &str, record: Value) -> Result<()> {
        let path = format!("{}/{}", collection, id);
        let _: Value = self.request(Method::PUT, &path, Some(record)).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let path = format!("{}/{}", collection, id);
        let _: Value = self.request(Method::DELETE, &path, None).await?;
        Ok(())
    }
}
