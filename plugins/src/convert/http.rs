use async_trait::async_trait;
use serde_json::Value;

use docflow_core::api::{ConverterConfig, ConverterPlugin};

use super::extract::extract_json_from_string;
use crate::http::{build_client, read_text, send};

const SERVICE: &str = "converter";

/// Posts raw document bytes to an extraction endpoint.
///
/// The endpoint may answer with a JSON body or with text that wraps the
/// record; both are accepted.
pub struct HttpConverter {
    http: reqwest::Client,
    api_key: String,
    url: String,
}

impl HttpConverter {
    pub fn new(cfg: &ConverterConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(cfg.timeout_ms)?,
            api_key: cfg.api_key.clone(),
            url: cfg.url.trim().to_string(),
        })
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.trim().is_empty() {
            req
        } else {
            req.bearer_auth(&self.api_key)
        }
    }
}

#[async_trait]
impl ConverterPlugin for HttpConverter {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn convert(&self, bytes: Vec<u8>, filename: &str) -> anyhow::Result<Option<Value>> {
        let url = &self.url;
        tracing::debug!(
            target: "docflow.convert",
            stage = "converter.http.in",
            url = %url,
            file = %filename,
            bytes = bytes.len()
        );
        let req = self
            .http
            .post(url)
            .query(&[("filename", filename)])
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(bytes);
        let resp = send(SERVICE, url, self.auth(req)).await?;
        let status = resp.status();
        let body = read_text(SERVICE, resp).await?;
        let record = extract_json_from_string(&body);
        tracing::debug!(
            target: "docflow.convert",
            stage = "converter.http.out",
            status = %status,
            file = %filename,
            produced = record.is_some()
        );
        Ok(record)
    }
}
