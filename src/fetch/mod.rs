//! Loading of dataset sources from disk or over HTTP(S).

mod http;

pub use http::{BasicClient, HttpClient};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::debug;

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Reads a source given as a local path or an `http(s)://` URL.
///
/// Sources ending in `.gz` are decompressed.
#[tracing::instrument(skip(client))]
pub async fn read_source<C: HttpClient>(client: &C, source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_bytes(client, source)
            .await
            .with_context(|| format!("failed to fetch {source}"))?
    } else {
        tokio::fs::read(source)
            .await
            .with_context(|| format!("failed to read {source}"))?
    };
    debug!(bytes = bytes.len(), "Source loaded");

    if source.ends_with(".gz") {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut decoded)
            .with_context(|| format!("failed to decompress {source}"))?;
        Ok(decoded)
    } else {
        Ok(bytes)
    }
}

/// Like [`read_source`], but decodes the content as UTF-8 text.
pub async fn read_source_text<C: HttpClient>(client: &C, source: &str) -> Result<String> {
    let bytes = read_source(client, source).await?;
    String::from_utf8(bytes).with_context(|| format!("{source} is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::env;
    use std::fs;
    use std::io::Write;

    /// Answers every request with a fixed status and body.
    struct StubClient {
        status: u16,
        body: &'static str,
    }

    #[async_trait::async_trait]
    impl HttpClient for StubClient {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let response = ::http::Response::builder()
                .status(self.status)
                .body(self.body)
                .unwrap();
            Ok(reqwest::Response::from(response))
        }
    }

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[tokio::test]
    async fn test_read_plain_file() {
        let path = temp_path("route_survey_test_plain.csv");
        fs::write(&path, "WGSX,WGSY\n").unwrap();

        let text = read_source_text(&BasicClient::new().unwrap(), &path).await.unwrap();
        assert_eq!(text, "WGSX,WGSY\n");

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_read_gzipped_file() {
        let path = temp_path("route_survey_test_gzip.csv.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all("WGSX,WGSY\n121.5,31.2\n".as_bytes()).unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let text = read_source_text(&BasicClient::new().unwrap(), &path).await.unwrap();
        assert_eq!(text, "WGSX,WGSY\n121.5,31.2\n");

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let path = temp_path("route_survey_test_missing.csv");
        let _ = fs::remove_file(&path);
        assert!(read_source(&BasicClient::new().unwrap(), &path).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_url_through_client() {
        let client = StubClient {
            status: 200,
            body: "WGSX,WGSY\n",
        };

        let bytes = fetch_bytes(&client, "https://example.com/llm_data.csv").await.unwrap();
        assert_eq!(bytes, b"WGSX,WGSY\n");

        let text = read_source_text(&client, "https://example.com/llm_data.csv").await.unwrap();
        assert_eq!(text, "WGSX,WGSY\n");
    }

    #[tokio::test]
    async fn test_http_error_status_is_an_error() {
        let client = StubClient {
            status: 404,
            body: "not found",
        };

        assert!(fetch_bytes(&client, "https://example.com/missing.csv").await.is_err());
        let err = read_source(&client, "https://example.com/missing.csv").await.unwrap_err();
        assert!(err.to_string().contains("failed to fetch"));
    }
}
