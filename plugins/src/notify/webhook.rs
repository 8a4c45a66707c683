use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;

use docflow_core::api::{NotificationSink, NotifyConfig, ProgressMessage};

use crate::http::{build_client, ensure_success, send};

const SERVICE: &str = "webhook";

/// POSTs each progress message as JSON to a fixed URL with fixed headers.
///
/// One attempt per message; failures are logged and reported as `false`.
pub struct WebhookSink {
    http: reqwest::Client,
    url: Url,
    headers: HeaderMap,
}

fn parse_endpoint(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|err| anyhow::anyhow!("invalid webhook url {raw:?}: {err}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => anyhow::bail!("invalid webhook url {raw:?}: unsupported scheme {other}"),
    }
}

impl WebhookSink {
    pub fn new(cfg: &NotifyConfig) -> anyhow::Result<Self> {
        let url = parse_endpoint(&cfg.url)?;
        let mut headers = HeaderMap::new();
        for (name, value) in &cfg.headers {
            let name = HeaderName::from_bytes(name.trim().as_bytes())
                .map_err(|err| anyhow::anyhow!("invalid webhook header name {name:?}: {err}"))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| anyhow::anyhow!("invalid value for webhook header {name}: {err}"))?;
            headers.insert(name, value);
        }
        Ok(Self {
            http: build_client(cfg.timeout_ms)?,
            url,
            headers,
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn post(&self, message: &ProgressMessage) -> anyhow::Result<()> {
        let req = self
            .http
            .post(self.url.clone())
            .headers(self.headers.clone())
            .json(message);
        let resp = send(SERVICE, self.url.as_str(), req).await?;
        ensure_success(SERVICE, resp).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn send(&self, message: &ProgressMessage) -> bool {
        match self.post(message).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    target: "docflow.notify",
                    url = %self.url,
                    status = %message.status(),
                    error = %format!("{err:#}"),
                    "webhook notification failed"
                );
                false
            }
        }
    }
}
