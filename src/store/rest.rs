//! Hosted Table Store Client
//!
//! HTTP client for a PostgREST-style backend-as-a-service. Tables are
//! addressed as `{base_url}/rest/v1/{table}` and filtered with query
//! operators (`column=eq.value`).

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::*;

const ANNOUNCEMENTS_TABLE: &str = "announcements";
const READS_TABLE: &str = "announcement_reads";
const MESSAGES_TABLE: &str = "messages";

/// REST store client
pub struct RestStore {
    client: Client,
    config: RestStoreConfig,
}

/// Configuration for the REST store client
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Project URL (e.g., "https://xyz.supabase.co")
    pub base_url: String,
    /// Anonymous or service API key, sent as `apikey` and bearer token
    pub api_key: Option<String>,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum attempts for retried writes
    pub max_retries: u32,
}

impl Default for RestStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: None,
            request_timeout_ms: 5000,
            max_retries: 3,
        }
    }
}

impl RestStore {
    pub fn new(config: RestStoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RestStoreConfig {
        &self.config
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            table
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => builder
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }

    /// Check that the REST endpoint answers
    pub async fn health_check(&self) -> StoreResult<()> {
        let url = format!("{}/rest/v1/", self.config.base_url.trim_end_matches('/'));
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    async fn get_rows<T: DeserializeOwned>(&self, url: &str) -> StoreResult<Vec<T>> {
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    /// Longest single wait honoured for a `Retry-After` header
    fn max_retry_wait(&self) -> Duration {
        Duration::from_millis(
            self.config
                .request_timeout_ms
                .saturating_mul(u64::from(self.config.max_retries.max(1))),
        )
    }

    /// POST with retry on transport errors and rate limiting
    async fn send_post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        prefer: &str,
    ) -> StoreResult<()> {
        let mut last_error = StoreError::Unavailable;

        for attempt in 0..self.config.max_retries.max(1) {
            if attempt > 0 {
                // 1s, 4s, 9s...
                let delay = Duration::from_secs((attempt as u64).pow(2));
                tokio::time::sleep(delay).await;
            }

            match self
                .request(Method::POST, url)
                .header("Prefer", prefer)
                .json(body)
                .send()
                .await
            {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(());
                    } else if response.status().as_u16() == 429 {
                        let retry_after = response
                            .headers()
                            .get("Retry-After")
                            .and_then(|v| v.to_str().ok());
                        if let Some(delay) = retry_after_delay(retry_after, self.max_retry_wait()) {
                            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Store rate limited");
                            tokio::time::sleep(delay).await;
                        }
                        last_error = StoreError::RateLimited;
                        continue;
                    } else {
                        return Err(api_error(response).await);
                    }
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "Store write attempt failed");
                    last_error = transport_error(e);
                    continue;
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl AnnouncementStore for RestStore {
    async fn list_all(&self) -> StoreResult<Vec<AnnouncementId>> {
        let url = format!("{}?select=id", self.table_url(ANNOUNCEMENTS_TABLE));
        let rows: Vec<IdRow> = self.get_rows(&url).await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    async fn list_read_by_user(&self, user_id: &UserId) -> StoreResult<Vec<AnnouncementId>> {
        let url = format!(
            "{}?select=announcement_id&user_id=eq.{}",
            self.table_url(READS_TABLE),
            urlencoding::encode(user_id.as_str())
        );
        let rows: Vec<ReadRow> = self.get_rows(&url).await?;
        Ok(rows.into_iter().map(|r| r.announcement_id).collect())
    }

    async fn upsert_reads(&self, records: Vec<ReadRecord>) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let url = format!(
            "{}?on_conflict=user_id,announcement_id",
            self.table_url(READS_TABLE)
        );
        self.send_post(
            &url,
            &records,
            "resolution=ignore-duplicates,return=minimal",
        )
        .await
    }
}

#[async_trait]
impl ChatStore for RestStore {
    async fn insert_message(&self, message: NewChatMessage) -> StoreResult<ChatMessage> {
        // Inserts are not retried: a lost response would duplicate the message
        let url = self.table_url(MESSAGES_TABLE);
        let response = self
            .request(Method::POST, &url)
            .header("Prefer", "return=representation")
            .json(&message)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        let rows: Vec<ChatMessage> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()))
    }

    async fn list_messages(&self, limit: usize) -> StoreResult<Vec<ChatMessage>> {
        let url = format!(
            "{}?select=id,sender_id,content,created_at&order=created_at.desc&limit={}",
            self.table_url(MESSAGES_TABLE),
            limit
        );
        let mut rows: Vec<ChatMessage> = self.get_rows(&url).await?;
        rows.reverse();
        Ok(rows)
    }
}

fn transport_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else if e.is_connect() {
        StoreError::Unavailable
    } else {
        StoreError::Request(e)
    }
}

async fn check_status(response: Response) -> StoreResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else if response.status().as_u16() == 429 {
        Err(StoreError::RateLimited)
    } else {
        Err(api_error(response).await)
    }
}

async fn api_error(response: Response) -> StoreError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    StoreError::Api {
        status: status.as_u16(),
        message: text,
    }
}

/// Seconds from a `Retry-After` header, capped at `max`
fn retry_after_delay(header: Option<&str>, max: Duration) -> Option<Duration> {
    let secs = header?.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(secs).min(max))
}

// ============================================
// Row DTOs
// ============================================

#[derive(Debug, Deserialize)]
struct IdRow {
    id: AnnouncementId,
}

#[derive(Debug, Deserialize)]
struct ReadRow {
    announcement_id: AnnouncementId,
}
