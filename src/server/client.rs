//! HTTP client for the token server

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokenrelay_shared::AuthRequestRecord;
use tracing::debug;

use crate::config::ServerConfig;

/// Errors raised while polling for the pending request
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned HTTP {0}")]
    Status(u16),

    #[error("Response is not a JSON object")]
    NotAnObject,

    #[error("Malformed request record: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Errors raised while posting a received packet
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server rejected rx submission: HTTP {0}")]
    Status(u16),
}

/// Server endpoints used by the poll cycle
#[async_trait]
pub trait TokenServer: Send + Sync {
    /// Fetch the current authorization request
    async fn fetch_request(&self) -> Result<AuthRequestRecord, FetchError>;

    /// Post a received packet description as form field `rx`
    async fn submit_rx(&self, description: &str) -> Result<(), SubmitError>;
}

/// Interpret a polled body as a request record
pub fn parse_record(body: serde_json::Value) -> Result<AuthRequestRecord, FetchError> {
    if !body.is_object() {
        return Err(FetchError::NotAnObject);
    }
    serde_json::from_value(body).map_err(FetchError::Parse)
}

/// Token server reached over HTTP with optional basic auth
pub struct HttpServerClient {
    http: reqwest::Client,
    poll_url: String,
    submit_url: String,
    credentials: Option<(String, String)>,
}

impl HttpServerClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        };

        Ok(Self {
            http,
            poll_url: join_url(&config.base_url, &config.poll_path),
            submit_url: join_url(&config.base_url, &config.submit_path),
            credentials,
        })
    }

    pub fn poll_url(&self) -> &str {
        &self.poll_url
    }

    pub fn submit_url(&self) -> &str {
        &self.submit_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some((username, password)) => request.basic_auth(username, Some(password)),
            None => request,
        }
    }
}

#[async_trait]
impl TokenServer for HttpServerClient {
    async fn fetch_request(&self) -> Result<AuthRequestRecord, FetchError> {
        let response = self.authorize(self.http.get(&self.poll_url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let value: serde_json::Value = serde_json::from_str(&body).map_err(FetchError::Parse)?;
        parse_record(value)
    }

    async fn submit_rx(&self, description: &str) -> Result<(), SubmitError> {
        let response = self
            .authorize(self.http.post(&self.submit_url))
            .form(&[("rx", description)])
            .send()
            .await?;

        let status = response.status();
        // Body is not used
        let _ = response.text().await?;
        debug!("[SERVER] rx submission answered HTTP {}", status.as_u16());

        if !status.is_success() {
            return Err(SubmitError::Status(status.as_u16()));
        }
        Ok(())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= end + 4 + content_length
    }

    /// Answer one HTTP request with `response`; the handle yields the raw request
    async fn serve_once(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
        let addr = listener.local_addr().expect("no local address");

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept failed");
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request_complete(&request) {
                let n = socket.read(&mut chunk).await.expect("read failed");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write failed");
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{}", addr), handle)
    }

    fn client(base_url: String) -> HttpServerClient {
        let config = ServerConfig {
            base_url,
            username: Some("admin".into()),
            password: Some("secret".into()),
            ..Default::default()
        };
        HttpServerClient::new(&config).expect("client")
    }

    #[tokio::test]
    async fn test_fetch_request() {
        let (url, server) =
            serve_once(http_response("200 OK", r#"{"time": 1000, "token": "abcd"}"#)).await;

        let record = client(url).fetch_request().await.expect("fetch failed");
        assert_eq!(record.created_at_ms, 1000);
        assert_eq!(record.token, "abcd");

        let request = server.await.expect("server task failed");
        assert!(request.starts_with("GET /token-requests/1 HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let (url, _server) = serve_once(http_response("500 Internal Server Error", "")).await;
        let result = client(url).fetch_request().await;
        assert!(matches!(result, Err(FetchError::Status(500))));
    }

    #[tokio::test]
    async fn test_fetch_non_json_body() {
        let (url, _server) = serve_once(http_response("200 OK", "not json")).await;
        let result = client(url).fetch_request().await;
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_json_array() {
        let (url, _server) =
            serve_once(http_response("200 OK", r#"[{"time": 1, "token": "ab"}]"#)).await;
        let result = client(url).fetch_request().await;
        assert!(matches!(result, Err(FetchError::NotAnObject)));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
        let addr = listener.local_addr().expect("no local address");
        drop(listener);

        let result = client(format!("http://{}", addr)).fetch_request().await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn test_submit_rx_posts_form_with_basic_auth() {
        let (url, server) = serve_once(http_response("200 OK", "ok")).await;

        client(url)
            .submit_rx("RX16 source=0x0002 rssi=-48dBm options=0x00 data=0102")
            .await
            .expect("submit failed");

        let request = server.await.expect("server task failed");
        let lowered = request.to_ascii_lowercase();
        assert!(request.starts_with("POST / HTTP/1.1"));
        // base64("admin:secret")
        assert!(lowered.contains("authorization: basic ywrtaw46c2vjcmv0"));
        assert!(lowered.contains("content-type: application/x-www-form-urlencoded"));
        assert!(request.ends_with("rx=RX16+source%3D0x0002+rssi%3D-48dBm+options%3D0x00+data%3D0102"));
    }

    #[tokio::test]
    async fn test_submit_rx_rejected() {
        let (url, _server) = serve_once(http_response("500 Internal Server Error", "")).await;
        let result = client(url).submit_rx("RX16").await;
        assert!(matches!(result, Err(SubmitError::Status(500))));
    }

    #[test]
    fn test_parse_record() {
        let record = parse_record(json!({"time": 1000, "token": "abcd"})).expect("valid record");
        assert_eq!(record.created_at_ms, 1000);
        assert_eq!(record.token, "abcd");
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(matches!(parse_record(json!(null)), Err(FetchError::NotAnObject)));
        assert!(matches!(
            parse_record(json!([{"time": 1, "token": "ab"}])),
            Err(FetchError::NotAnObject)
        ));
    }

    #[test]
    fn test_parse_rejects_bad_fields() {
        assert!(matches!(
            parse_record(json!({"time": "later", "token": "abcd"})),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(
            parse_record(json!({"time": 1000})),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_urls() {
        let config = ServerConfig {
            base_url: "http://10.0.0.5:3000/".into(),
            ..Default::default()
        };
        let client = HttpServerClient::new(&config).expect("client");
        assert_eq!(client.poll_url(), "http://10.0.0.5:3000/token-requests/1");
        assert_eq!(client.submit_url(), "http://10.0.0.5:3000/");
    }
}
