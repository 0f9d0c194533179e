//! HTTP client for the remote collection endpoints.
//!
//! - `GET  /api/<collection>` -> `{ success, data?: Snapshot }`
//! - `GET  /api/<collection>/sync?lastModified=<int>` -> `{ success, needsUpdate? }`
//! - `POST /api/<collection>` with `{ data: Snapshot }`; any 2xx is success

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RemoteStore;
use crate::config::{normalize_base_url, RequestTimeouts};
use crate::error::{Error, Result};
use crate::models::{Collection, Snapshot};

#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    base_url: String,
    client: reqwest::Client,
    timeouts: RequestTimeouts,
}

impl HttpRemoteStore {
    /// Builds a client for an explicit API base URL.
    pub fn new(base_url: impl Into<String>, timeouts: RequestTimeouts) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| Error::Config(format!("Failed to construct HTTP client: {error}")))?;
        Ok(Self {
            base_url,
            client,
            timeouts,
        })
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/api/{}", self.base_url, collection)
    }

    async fn read_envelope<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await.map_err(classify)?;
        if !status.is_success() {
            return Err(Error::RemoteUnavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                excerpt(&body)
            )));
        }
        serde_json::from_str(&body).map_err(|error| Error::MalformedResponse(error.to_string()))
    }
}

impl<R: Collection> RemoteStore<R> for HttpRemoteStore {
    async fn fetch_all(&self) -> Result<Snapshot<R>> {
        let url = self.collection_url(R::NAME);
        bounded(self.timeouts.fetch, async {
            let response = self
                .client
                .get(&url)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(classify)?;

            let envelope: FetchEnvelope<R> = Self::read_envelope(response).await?;
            if !envelope.success {
                return Err(Error::RemoteUnavailable(envelope.failure_message()));
            }
            envelope.data.ok_or_else(|| {
                Error::MalformedResponse("successful response did not include data".to_string())
            })
        })
        .await
    }

    async fn check_stale(&self, known_version: i64) -> Result<bool> {
        let url = format!("{}/sync", self.collection_url(R::NAME));
        bounded(self.timeouts.check, async {
            let response = self
                .client
                .get(&url)
                .query(&[("lastModified", known_version)])
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(classify)?;

            let envelope: SyncCheckEnvelope = Self::read_envelope(response).await?;
            if !envelope.success {
                return Err(Error::RemoteUnavailable(envelope.failure_message()));
            }
            Ok(envelope.needs_update.unwrap_or(false))
        })
        .await
    }

    async fn save(&self, snapshot: &Snapshot<R>) -> Result<()> {
        let url = self.collection_url(R::NAME);
        bounded(self.timeouts.save, async {
            let response = self
                .client
                .post(&url)
                .json(&SaveEnvelope { data: snapshot })
                .send()
                .await
                .map_err(classify)?;

            if response.status().is_success() {
                return Ok(());
            }
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(Error::RemoteUnavailable(format!(
                "HTTP {status}: {}",
                excerpt(&body)
            )))
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
struct FetchEnvelope<R> {
    success: bool,
    data: Option<Snapshot<R>>,
    #[serde(default)]
    error: Option<String>,
}

impl<R> FetchEnvelope<R> {
    fn failure_message(&self) -> String {
        failure_message(self.error.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncCheckEnvelope {
    success: bool,
    #[serde(default)]
    needs_update: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

impl SyncCheckEnvelope {
    fn failure_message(&self) -> String {
        failure_message(self.error.as_deref())
    }
}

#[derive(Serialize)]
struct SaveEnvelope<'a, R> {
    data: &'a Snapshot<R>,
}

fn failure_message(error: Option<&str>) -> String {
    error.map_or_else(
        || "remote reported success=false".to_string(),
        |message| format!("remote reported success=false: {}", excerpt(message)),
    )
}

/// Run `operation` with an upper bound; on expiry the future is dropped,
/// which aborts the underlying request.
async fn bounded<T>(bound: Duration, operation: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(bound, operation)
        .await
        .unwrap_or_else(|_| Err(Error::Timeout(duration_millis(bound))))
}

/// Longest slice of a response body quoted in an error message.
const EXCERPT_CHARS: usize = 180;

fn excerpt(body: &str) -> String {
    body.trim().chars().take(EXCERPT_CHARS).collect()
}

fn classify(error: reqwest::Error) -> Error {
    if error.is_decode() {
        Error::MalformedResponse(error.to_string())
    } else {
        Error::Network(error.to_string())
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
