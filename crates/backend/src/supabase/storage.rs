//! Storage bucket uploads

use super::SupabaseClient;
use crate::error::StorageError;
use crate::ObjectStorage;

#[async_trait::async_trait]
impl ObjectStorage for SupabaseClient {
    async fn upload(
        &self,
        bucket: &str,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let size = bytes.len();
        let response = self
            .http
            .post(self.url(&format!("/storage/v1/object/{}/{}", bucket, filename)))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(bucket, filename, status = %status, "Storage upload rejected");
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(bucket, filename, size, "Object uploaded");
        Ok(())
    }

    fn public_url(&self, bucket: &str, filename: &str) -> String {
        self.url(&format!("/storage/v1/object/public/{}/{}", bucket, filename))
    }
}
