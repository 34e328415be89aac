//! Image download behind a trait so the store never talks HTTP directly.

use std::time::Duration;

use async_trait::async_trait;

use super::StoreError;

/// Source of image bytes for a URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError>;
}

/// `reqwest` based fetcher with a timeout and size cap.
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Download(e.to_string()))?;
        Ok(Self { client, max_bytes })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError> {
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::Download(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(StoreError::Download(format!(
                "{} returned {}",
                url,
                resp.status()
            )));
        }

        if let Some(len) = resp.content_length() {
            if len > self.max_bytes as u64 {
                return Err(too_large(len, self.max_bytes));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| StoreError::Download(e.to_string()))?
        {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(too_large((bytes.len() + chunk.len()) as u64, self.max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        tracing::debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes)
    }
}

fn too_large(len: u64, limit: usize) -> StoreError {
    StoreError::Download(format!("Image is too large ({} bytes, limit {})", len, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `response` to a single connection and return a URL for it.
    async fn serve_once(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(response).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}/image.png", addr)
    }

    fn fetcher(max_bytes: usize) -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5), max_bytes).unwrap()
    }

    #[tokio::test]
    async fn downloads_body_within_limit() {
        let url = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\nabcd").await;
        assert_eq!(fetcher(16).fetch(&url).await.unwrap(), b"abcd");
    }

    #[tokio::test]
    async fn error_status_fails() {
        let url = serve_once(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let err = fetcher(16).fetch(&url).await.unwrap_err();
        assert!(err.to_string().contains("404"), "{}", err);
    }

    #[tokio::test]
    async fn declared_length_over_limit_fails_early() {
        let url = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nabcd").await;
        let err = fetcher(10).fetch(&url).await.unwrap_err();
        assert_eq!(err.to_string(), "Download failed: Image is too large (100 bytes, limit 10)");
    }

    #[tokio::test]
    async fn undeclared_body_over_limit_fails() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n0123456789abcdefghijklmnopqrstuvwxyz",
        )
        .await;
        let err = fetcher(10).fetch(&url).await.unwrap_err();
        assert!(err.to_string().starts_with("Download failed: Image is too large"), "{}", err);
    }
}
