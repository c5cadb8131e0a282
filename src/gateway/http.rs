use super::{BatchGateway, CreateResponse};
use crate::config::IngestConfig;
use crate::regex_edit::{RegexApplyResponse, RegexEditRequest, RegexPreviewResponse};
use crate::types::{CanonicalItem, ContentKind, GroupMeta};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};
use url::Url;

/// Admin API client.
///
/// Routes (relative to `base_url`):
/// - `POST api/admin/{videos|games}/batch`
/// - `POST api/admin/{videos|games}/regex/preview`
/// - `POST api/admin/{videos|games}/regex/apply`
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

#[derive(Serialize)]
struct CreateBody<'a> {
    items: &'a [CanonicalItem],
    #[serde(skip_serializing_if = "Option::is_none")]
    series: Option<&'a GroupMeta>,
}

impl HttpGateway {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let raw = config.base_url.as_deref().ok_or_else(|| {
            Error::configuration_with_context(
                "base URL is not configured",
                ErrorContext::new()
                    .with_field_path("CATALOG_BASE_URL")
                    .with_source("http_gateway"),
            )
        })?;
        // Url::join drops the last segment unless the base ends with '/'.
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base URL: {e}"),
                ErrorContext::new()
                    .with_field_path("CATALOG_BASE_URL")
                    .with_details(raw.to_string())
                    .with_source("http_gateway"),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| Error::transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, kind: ContentKind, action: &str) -> Result<Url> {
        let path = format!("api/admin/{}/{}", kind.resource(), action);
        self.base_url.join(&path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot build endpoint URL: {e}"),
                ErrorContext::new().with_details(path).with_source("http_gateway"),
            )
        })
    }

    async fn post_json<B, R>(&self, url: Url, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let start = Instant::now();
        let mut req = self.client.post(url.clone()).json(body);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            info!(
                http_status = status.as_u16(),
                endpoint = url.path(),
                duration_ms = start.elapsed().as_millis(),
                "admin API call failed"
            );
            return Err(Error::Remote {
                status: status.as_u16(),
                message: remote_message(&text),
            });
        }

        let bytes = resp.bytes().await?;
        debug!(
            http_status = status.as_u16(),
            endpoint = url.path(),
            bytes = bytes.len(),
            duration_ms = start.elapsed().as_millis(),
            "admin API call succeeded"
        );
        serde_json::from_slice(&bytes).map_err(|e| Error::transport(format!("undecodable response: {e}")))
    }
}

/// Pull a human-readable message out of an error body.
fn remote_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(msg) = v.get(key).and_then(|m| m.as_str()) {
                return msg.to_string();
            }
        }
    }
    body.trim().to_string()
}

#[async_trait]
impl BatchGateway for HttpGateway {
    async fn create(
        &self,
        kind: ContentKind,
        items: &[CanonicalItem],
        meta: Option<&GroupMeta>,
    ) -> Result<CreateResponse> {
        let url = self.endpoint(kind, "batch")?;
        let body = CreateBody {
            items,
            series: meta.filter(|m| !m.is_empty()),
        };
        self.post_json(url, &body).await
    }

    async fn regex_preview(&self, request: &RegexEditRequest) -> Result<RegexPreviewResponse> {
        let url = self.endpoint(request.kind, "regex/preview")?;
        self.post_json(url, request).await
    }

    async fn regex_apply(&self, request: &RegexEditRequest) -> Result<RegexApplyResponse> {
        let url = self.endpoint(request.kind, "regex/apply")?;
        self.post_json(url, request).await
    }
}
