//! PostgREST table calls

use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;

use super::SupabaseClient;
use crate::error::StoreError;
use crate::query::{Filter, Query};
use crate::TableStore;

#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn map_store_error(status: u16, body: &str) -> StoreError {
    let parsed: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    StoreError::Rejected {
        code: parsed.code.unwrap_or_else(|| status.to_string()),
        message: parsed.message.unwrap_or_else(|| body.to_string()),
    }
}

/// PostgREST answers with an array, or an object for single-row requests
fn into_rows(body: Value) -> Vec<Value> {
    match body {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        row => vec![row],
    }
}

impl SupabaseClient {
    fn rest(&self, method: Method, relation: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(&format!("/rest/v1/{}", relation)))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }

    async fn send_rest(&self, request: RequestBuilder) -> Result<Vec<Value>, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Response(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let err = map_store_error(status.as_u16(), &text);
            tracing::warn!(status = %status, error = %err, "PostgREST request rejected");
            return Err(err);
        }

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(into_rows(serde_json::from_str(&text)?))
    }
}

#[async_trait::async_trait]
impl TableStore for SupabaseClient {
    async fn select(&self, relation: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        let request = self.rest(Method::GET, relation).query(&query.to_params());
        let rows = self.send_rest(request).await?;
        tracing::debug!(relation, rows = rows.len(), "Selected rows");
        Ok(rows)
    }

    async fn insert(&self, relation: &str, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let request = self
            .rest(Method::POST, relation)
            .header("Prefer", "return=representation")
            .json(&rows);
        self.send_rest(request).await
    }

    async fn upsert(
        &self,
        relation: &str,
        rows: Vec<Value>,
        on_conflict: &str,
        ignore_duplicates: bool,
    ) -> Result<Vec<Value>, StoreError> {
        let resolution = if ignore_duplicates {
            "resolution=ignore-duplicates"
        } else {
            "resolution=merge-duplicates"
        };
        let request = self
            .rest(Method::POST, relation)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", format!("return=representation,{}", resolution))
            .json(&rows);
        self.send_rest(request).await
    }

    async fn update(
        &self,
        relation: &str,
        fields: Value,
        filter: &Filter,
    ) -> Result<Vec<Value>, StoreError> {
        let request = self
            .rest(Method::PATCH, relation)
            .query(&[filter.to_param()])
            .header("Prefer", "return=representation")
            .json(&fields);
        self.send_rest(request).await
    }

    async fn delete(&self, relation: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let request = self
            .rest(Method::DELETE, relation)
            .query(&[filter.to_param()])
            .header("Prefer", "return=representation");
        self.send_rest(request).await
    }
}
