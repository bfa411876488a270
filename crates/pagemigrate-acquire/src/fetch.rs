use pagemigrate_model::{ConfigurationError, FetchFailure, FetchResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;

/// Header that identifies the importer to the legacy site.
pub const IMPORTER_HEADER: &str = "x-user-agent";

/// Anything that can turn a URL into a page body.
///
/// The pipeline awaits one fetch at a time; implementations never retry.
pub trait Fetch {
    fn fetch(&self, url: &str) -> impl Future<Output = FetchResult> + Send;
}

/// Fetches pages over HTTP with the importer header and a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(importer_id: &str, timeout: Duration) -> Result<Self, ConfigurationError> {
        let value = HeaderValue::from_str(importer_id)
            .map_err(|e| ConfigurationError::invalid_setting("importer_id", e.to_string()))?;
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(IMPORTER_HEADER), value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigurationError::invalid_setting("http client", e.to_string()))?;

        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        tracing::debug!(url = %url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchFailure::Network(describe(&e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchFailure::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchFailure::Network(describe(&e)))?;
        tracing::debug!(url = %url, bytes = body.len(), "Received HTML");
        Ok(body)
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a loopback port; the join handle
    /// yields the raw request text.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
        delay: Duration,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            tokio::time::sleep(delay).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{addr}/news/story.cfm"), handle)
    }

    #[tokio::test]
    async fn test_ok_returns_body_and_sends_importer_header() {
        let (url, server) = serve_once("200 OK", "<html><title>Hi</title></html>", Duration::ZERO).await;
        let fetcher = HttpFetcher::new("AU-AEM-Importer", Duration::from_secs(5)).unwrap();

        let body = fetcher.fetch(&url).await.unwrap();
        assert_eq!(body, "<html><title>Hi</title></html>");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /news/story.cfm"));
        assert!(request.contains("x-user-agent: au-aem-importer"));
    }

    #[tokio::test]
    async fn test_non_200_is_http_failure() {
        let (url, server) = serve_once("404 Not Found", "missing", Duration::ZERO).await;
        let fetcher = HttpFetcher::new("AU-AEM-Importer", Duration::from_secs(5)).unwrap();

        let err = fetcher.fetch(&url).await.unwrap_err();
        assert_eq!(err, FetchFailure::Http { status: 404 });
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_other_success_codes_are_not_ok() {
        let (url, server) = serve_once("204 No Content", "", Duration::ZERO).await;
        let fetcher = HttpFetcher::new("AU-AEM-Importer", Duration::from_secs(5)).unwrap();

        let err = fetcher.fetch(&url).await.unwrap_err();
        assert_eq!(err.status(), Some(204));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new("AU-AEM-Importer", Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch(&format!("http://{addr}/")).await.unwrap_err();
        assert!(matches!(err, FetchFailure::Network(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let (url, _server) = serve_once("200 OK", "late", Duration::from_secs(3)).await;
        let fetcher = HttpFetcher::new("AU-AEM-Importer", Duration::from_millis(200)).unwrap();

        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchFailure::Network(_)));
    }

    #[test]
    fn test_invalid_importer_id() {
        assert!(HttpFetcher::new("bad\nvalue", Duration::from_secs(1)).is_err());
    }
}
