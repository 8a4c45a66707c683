use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};

use docflow_core::api::{GraphConfig, GraphStorePlugin};

use super::statements::{
    COMPUTE_EMBEDDINGS, CREATE_GRAPH, CREATE_VECTOR_INDEX, EMBEDDING_DIMENSIONS, INDICES,
};
use crate::http::{build_client, parse_json_response, send};

const SERVICE: &str = "neo4j";

/// Graph store speaking the Neo4j HTTP transactional endpoint
/// (`/db/{database}/tx/commit`) with basic auth.
pub struct Neo4jStore {
    http: reqwest::Client,
    user: String,
    password: String,
    embedding_token: String,
    embedding_model: String,
    url_commit: String,
    next_contract_id: AtomicU64,
}

impl Neo4jStore {
    pub fn new(cfg: &GraphConfig) -> anyhow::Result<Self> {
        let base = cfg.uri.trim().trim_end_matches('/');
        Ok(Self {
            http: build_client(cfg.timeout_ms)?,
            user: cfg.user.clone(),
            password: cfg.password.clone(),
            embedding_token: cfg.embedding_token.clone(),
            embedding_model: cfg.embedding_model.clone(),
            url_commit: format!("{}/db/{}/tx/commit", base, cfg.database.trim()),
            next_contract_id: AtomicU64::new(1),
        })
    }

    /// Runs one statement in its own auto-committed transaction.
    async fn run(&self, statement: &str, parameters: Value) -> anyhow::Result<Value> {
        let url = &self.url_commit;
        let body = json!({
            "statements": [{ "statement": statement, "parameters": parameters }]
        });
        let req = self
            .http
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body);
        let resp = send(SERVICE, url, req).await?;
        let value = parse_json_response(SERVICE, resp).await?;

        if let Some(first) = value
            .get("errors")
            .and_then(Value::as_array)
            .and_then(|errors| errors.first())
        {
            let code = first.get("code").and_then(Value::as_str).unwrap_or("unknown");
            let message = first.get("message").and_then(Value::as_str).unwrap_or("");
            anyhow::bail!("{SERVICE} statement failed: {code}: {message}");
        }
        Ok(value)
    }
}

#[async_trait]
impl GraphStorePlugin for Neo4jStore {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn store(&self, record: &Value) -> anyhow::Result<()> {
        let mut data = record.clone();
        let Some(agreement) = data.get_mut("agreement").and_then(Value::as_object_mut) else {
            anyhow::bail!("record has no agreement object");
        };
        let contract_id = self.next_contract_id.fetch_add(1, Ordering::SeqCst);
        agreement.insert("contract_id".to_string(), json!(contract_id));

        self.run(CREATE_GRAPH, json!({ "data": data })).await?;
        tracing::debug!(target: "docflow.graph", contract_id, "agreement merged");
        Ok(())
    }

    async fn build_indices(&self) -> anyhow::Result<()> {
        for (name, statement) in INDICES {
            match self.run(statement, json!({})).await {
                Ok(_) => tracing::info!(target: "docflow.graph", index = %name, "index ready"),
                Err(err) => tracing::error!(
                    target: "docflow.graph",
                    index = %name,
                    error = %format!("{err:#}"),
                    "index creation failed"
                ),
            }
        }
        self.run(CREATE_VECTOR_INDEX, json!({})).await?;
        tracing::info!(target: "docflow.graph", index = "excerpt_embedding", "index ready");
        Ok(())
    }

    async fn compute_embeddings(&self) -> anyhow::Result<()> {
        if self.embedding_token.trim().is_empty() {
            anyhow::bail!("embedding token is not configured");
        }
        tracing::info!(
            target: "docflow.graph",
            model = %self.embedding_model,
            "computing excerpt embeddings"
        );
        self.run(
            COMPUTE_EMBEDDINGS,
            json!({
                "token": self.embedding_token,
                "model": self.embedding_model,
                "dimensions": EMBEDDING_DIMENSIONS,
            }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const COMMIT: &str = "/db/neo4j/tx/commit";
    const OK: &str = r#"{"results":[{"columns":[],"data":[]}],"errors":[]}"#;

    fn store_for(url: String, embedding_token: &str) -> Neo4jStore {
        Neo4jStore::new(&GraphConfig {
            uri: url,
            password: "pw".to_string(),
            embedding_token: embedding_token.to_string(),
            timeout_ms: 1_000,
            ..GraphConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_store_assigns_increasing_contract_ids() {
        let mut server = Server::new_async().await;
        // neo4j:pw
        let first = server
            .mock("POST", COMMIT)
            .match_header("authorization", "Basic bmVvNGo6cHc=")
            .match_body(Matcher::PartialJson(json!({
                "statements": [{"parameters": {"data": {"agreement": {"contract_id": 1}}}}]
            })))
            .with_status(200)
            .with_body(OK)
            .create_async()
            .await;
        let second = server
            .mock("POST", COMMIT)
            .match_body(Matcher::PartialJson(json!({
                "statements": [{"parameters": {"data": {"agreement": {"contract_id": 2}}}}]
            })))
            .with_status(200)
            .with_body(OK)
            .create_async()
            .await;

        let store = store_for(server.url(), "");
        let record = json!({"agreement": {"agreement_name": "Lease"}});
        store.store(&record).await.unwrap();
        store.store(&record).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert!(record["agreement"].get("contract_id").is_none());
    }

    #[tokio::test]
    async fn test_store_rejects_record_without_agreement() {
        let store = store_for("http://127.0.0.1:9".to_string(), "");
        let err = store.store(&json!({"parties": []})).await.unwrap_err();
        assert!(err.to_string().contains("no agreement"), "{err}");
    }

    #[tokio::test]
    async fn test_statement_errors_surface() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", COMMIT)
            .with_status(200)
            .with_body(
                r#"{"results":[],"errors":[{"code":"Neo.ClientError.Statement.SyntaxError","message":"bad"}]}"#,
            )
            .create_async()
            .await;

        let err = store_for(server.url(), "")
            .store(&json!({"agreement": {}}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SyntaxError"), "{err}");
    }

    #[tokio::test]
    async fn test_build_indices_continues_past_failed_index() {
        let mut server = Server::new_async().await;
        let _broken = server
            .mock("POST", COMMIT)
            .match_body(Matcher::Regex("riskTypeIndex".into()))
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;
        let healthy: Vec<Matcher> = INDICES
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| *name != "riskTypeIndex")
            .chain(std::iter::once("excerpt_embedding"))
            .map(|name| Matcher::Regex(name.to_string()))
            .collect();
        let others = server
            .mock("POST", COMMIT)
            .match_body(Matcher::AnyOf(healthy))
            .with_status(200)
            .with_body(OK)
            .expect(INDICES.len())
            .create_async()
            .await;

        store_for(server.url(), "").build_indices().await.unwrap();
        others.assert_async().await;
    }

    #[tokio::test]
    async fn test_embeddings_need_token() {
        let err = store_for("http://127.0.0.1:9".to_string(), "")
            .compute_embeddings()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("embedding token"));
    }

    #[tokio::test]
    async fn test_embeddings_pass_token_and_model() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", COMMIT)
            .match_body(Matcher::PartialJson(json!({
                "statements": [{"parameters": {
                    "token": "sk-test",
                    "model": "text-embedding-3-small",
                    "dimensions": 1536
                }}]
            })))
            .with_status(200)
            .with_body(OK)
            .create_async()
            .await;

        store_for(server.url(), "sk-test")
            .compute_embeddings()
            .await
            .unwrap();
        m.assert_async().await;
    }
}
