use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use docflow_core::api::{
    DocumentRef, DocumentSourcePlugin, EnvelopeRef, FetchedDocument, SourceConfig,
};

use crate::http::{build_client, ensure_success, parse_json_response, send, HttpError};

const SERVICE: &str = "docusign";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusChanges {
    #[serde(default)]
    envelopes: Option<Vec<EnvelopeSummary>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeSummary {
    envelope_id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    email_subject: Option<String>,
    #[serde(default)]
    sent_date_time: Option<String>,
    #[serde(default)]
    last_modified_date_time: Option<String>,
}

impl From<EnvelopeSummary> for EnvelopeRef {
    fn from(e: EnvelopeSummary) -> Self {
        EnvelopeRef {
            envelope_id: e.envelope_id,
            status: e.status.unwrap_or_default(),
            subject: e.email_subject.unwrap_or_default(),
            sent_date: e.sent_date_time.unwrap_or_default(),
            last_modified: e.last_modified_date_time.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentsList {
    #[serde(default)]
    envelope_documents: Vec<EnvelopeDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeDocument {
    document_id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    doc_type: String,
}

/// eSignature REST v2.1 client authenticated with a pre-issued bearer token.
pub struct DocuSignSource {
    http: reqwest::Client,
    token: String,
    account_id: String,
    lookback_days: i64,
    url_envelopes: String,
}

impl DocuSignSource {
    pub fn new(cfg: &SourceConfig) -> anyhow::Result<Self> {
        let http = build_client(cfg.timeout_ms)?;
        let base = cfg.base_uri.trim().trim_end_matches('/');
        let account_id = cfg.account_id.trim().to_string();
        Ok(Self {
            http,
            token: cfg.token.clone(),
            url_envelopes: format!("{}/restapi/v2.1/accounts/{}/envelopes", base, account_id),
            account_id,
            lookback_days: cfg.lookback_days.max(0),
        })
    }

    fn from_date(&self) -> String {
        (chrono::Utc::now() - chrono::Duration::days(self.lookback_days))
            .format("%Y-%m-%d")
            .to_string()
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.http.get(url);
        if self.token.trim().is_empty() {
            req
        } else {
            req.bearer_auth(&self.token)
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        req: reqwest::RequestBuilder,
    ) -> anyhow::Result<T> {
        let resp = send(SERVICE, url, req).await?;
        let value = parse_json_response(SERVICE, resp).await?;
        if value.is_null() {
            return Ok(serde_json::from_value(serde_json::json!({}))?);
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl DocumentSourcePlugin for DocuSignSource {
    fn name(&self) -> &str {
        SERVICE
    }

    fn account_id(&self) -> &str {
        &self.account_id
    }

    async fn list_completed_envelopes(&self) -> anyhow::Result<Vec<EnvelopeRef>> {
        let url = &self.url_envelopes;
        let from_date = self.from_date();
        tracing::debug!(
            target: "docflow.source",
            stage = "docusign.envelopes.in",
            url = %url,
            from_date = %from_date
        );
        let req = self.get(url).query(&[
            ("from_date", from_date.as_str()),
            ("from_to_status", "completed"),
            ("status", "completed"),
        ]);
        let changes: StatusChanges = self.get_json(url, req).await?;
        let envelopes: Vec<EnvelopeRef> = changes
            .envelopes
            .unwrap_or_default()
            .into_iter()
            .map(EnvelopeRef::from)
            .collect();
        tracing::debug!(
            target: "docflow.source",
            stage = "docusign.envelopes.out",
            count = envelopes.len()
        );
        Ok(envelopes)
    }

    async fn list_documents(&self, envelope_id: &str) -> anyhow::Result<Vec<DocumentRef>> {
        let url = format!("{}/{}/documents", self.url_envelopes, envelope_id);
        let list: DocumentsList = self.get_json(&url, self.get(&url)).await?;
        let docs: Vec<DocumentRef> = list
            .envelope_documents
            .into_iter()
            .filter(|d| d.doc_type != "summary")
            .map(|d| DocumentRef::new(d.document_id, d.name, d.doc_type))
            .collect();
        tracing::debug!(
            target: "docflow.source",
            stage = "docusign.documents.out",
            envelope_id = %envelope_id,
            count = docs.len()
        );
        Ok(docs)
    }

    async fn fetch_document(
        &self,
        envelope_id: &str,
        document_id: &str,
    ) -> anyhow::Result<FetchedDocument> {
        let doc = self
            .list_documents(envelope_id)
            .await?
            .into_iter()
            .find(|d| d.document_id == document_id)
            .ok_or_else(|| {
                anyhow::anyhow!("document {document_id} not found in envelope {envelope_id}")
            })?;

        let url = format!(
            "{}/{}/documents/{}",
            self.url_envelopes, envelope_id, document_id
        );
        let resp = send(SERVICE, &url, self.get(&url)).await?;
        let resp = ensure_success(SERVICE, resp).await?;

        let scratch = tempfile::NamedTempFile::new()?;
        let mut file = tokio::fs::File::from_std(scratch.reopen()?);
        let mut stream = resp.bytes_stream();
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| HttpError::from_reqwest(SERVICE, err, url.clone()))?;
            written += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!(
            target: "docflow.source",
            stage = "docusign.download.out",
            envelope_id = %envelope_id,
            document_id = %document_id,
            bytes = written
        );

        Ok(FetchedDocument {
            temp_path: scratch.into_temp_path(),
            content_type: doc.content_type().to_string(),
            filename: doc.file_name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;

    fn source_for(url: String) -> DocuSignSource {
        DocuSignSource::new(&SourceConfig {
            base_uri: url,
            account_id: "acct-1".to_string(),
            token: "secret-token".to_string(),
            timeout_ms: 1_000,
            ..SourceConfig::default()
        })
        .unwrap()
    }

    const DOCUMENTS: &str = r#"{"envelopeDocuments":[
        {"documentId":"1","name":"Lease","type":"content"},
        {"documentId":"certificate","name":"Summary","type":"summary"},
        {"documentId":"2","name":"Bundle.zip","type":"zip"}
    ]}"#;

    #[tokio::test]
    async fn test_lists_completed_envelopes_with_bearer_token() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/restapi/v2.1/accounts/acct-1/envelopes")
            .match_header("authorization", "Bearer secret-token")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("status".into(), "completed".into()),
                Matcher::UrlEncoded("from_to_status".into(), "completed".into()),
                Matcher::Regex("from_date=\\d{4}-\\d{2}-\\d{2}".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"envelopes":[{"envelopeId":"env-1","status":"completed","emailSubject":"Please sign"}]}"#,
            )
            .create_async()
            .await;

        let envelopes = source_for(server.url())
            .list_completed_envelopes()
            .await
            .unwrap();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].envelope_id, "env-1");
        assert_eq!(envelopes[0].subject, "Please sign");
        assert_eq!(envelopes[0].sent_date, "");
    }

    #[tokio::test]
    async fn test_missing_envelopes_field_is_empty() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/restapi/v2.1/accounts/acct-1/envelopes")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"resultSetSize":"0"}"#)
            .create_async()
            .await;

        let envelopes = source_for(server.url())
            .list_completed_envelopes()
            .await
            .unwrap();
        assert!(envelopes.is_empty());
    }

    #[tokio::test]
    async fn test_documents_exclude_summary() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/restapi/v2.1/accounts/acct-1/envelopes/env-1/documents")
            .with_status(200)
            .with_body(DOCUMENTS)
            .create_async()
            .await;

        let docs = source_for(server.url())
            .list_documents("env-1")
            .await
            .unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.document_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_fetch_streams_into_scratch_file() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/restapi/v2.1/accounts/acct-1/envelopes/env-1/documents")
            .with_status(200)
            .with_body(DOCUMENTS)
            .create_async()
            .await;
        let _doc = server
            .mock("GET", "/restapi/v2.1/accounts/acct-1/envelopes/env-1/documents/1")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(b"%PDF-1.4 lease".as_slice())
            .create_async()
            .await;

        let fetched = source_for(server.url())
            .fetch_document("env-1", "1")
            .await
            .unwrap();
        assert_eq!(fetched.content_type, "application/pdf");
        assert_eq!(fetched.filename, "Lease.pdf");
        assert_eq!(std::fs::read(&fetched.temp_path).unwrap(), b"%PDF-1.4 lease");
    }

    #[tokio::test]
    async fn test_fetch_summary_document_is_not_found() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/restapi/v2.1/accounts/acct-1/envelopes/env-1/documents")
            .with_status(200)
            .with_body(DOCUMENTS)
            .create_async()
            .await;

        let err = source_for(server.url())
            .fetch_document("env-1", "certificate")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"), "{err}");
    }

    #[tokio::test]
    async fn test_status_error_is_typed() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/restapi/v2.1/accounts/acct-1/envelopes/env-1/documents")
            .with_status(401)
            .with_body("token expired")
            .create_async()
            .await;

        let err = source_for(server.url())
            .list_documents("env-1")
            .await
            .unwrap_err();
        let http_err = err.downcast_ref::<HttpError>().expect("expected HttpError");
        assert_eq!(http_err.status(), Some(401));
        assert_eq!(http_err.service(), "docusign");
    }
}
