//! Read a captured image into memory

use std::path::Path;

use crate::error::ReadError;

/// Read `uri` into bytes.
///
/// Accepts `file://` URIs, plain filesystem paths and `http(s)://` URLs.
pub async fn read_resource(http: &reqwest::Client, uri: &str) -> Result<Vec<u8>, ReadError> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return download(http, uri).await;
    }

    let path = uri.strip_prefix("file://").unwrap_or(uri);
    tokio::fs::read(Path::new(path))
        .await
        .map_err(|source| ReadError::Io {
            uri: uri.to_string(),
            source,
        })
}

async fn download(http: &reqwest::Client, uri: &str) -> Result<Vec<u8>, ReadError> {
    let to_error = |source| ReadError::Http {
        uri: uri.to_string(),
        source,
    };

    let response = http
        .get(uri)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(to_error)?;
    let bytes = response.bytes().await.map_err(to_error)?;
    Ok(bytes.to_vec())
}
