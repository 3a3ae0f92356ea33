use async_trait::async_trait;
use reqwest::{Client, Method, header};
use serde_json::Value;
use tracing::{debug, error};

use super::config::UpdaterConfig;
use super::error::RequestError;

const REST_PREFIX: &str = "rest/v1";
const PREVIEW_CHARS: usize = 500;
const LIST_PREVIEW_THRESHOLD: usize = 5;

/// Value of the PostgREST `Prefer` header for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefer {
    /// Echo the affected rows back.
    Representation,
    /// Empty response body.
    Minimal,
    /// Insert, or update the row that conflicts on the `on_conflict` column.
    MergeDuplicates,
}

impl Prefer {
    pub fn header_value(&self) -> &'static str {
        match self {
            Prefer::Representation => "return=representation",
            Prefer::Minimal => "return=minimal",
            Prefer::MergeDuplicates => "resolution=merge-duplicates,return=minimal",
        }
    }

    pub fn for_method(method: &Method) -> Self {
        if *method == Method::GET {
            Prefer::Representation
        } else {
            Prefer::Minimal
        }
    }
}

/// One HTTP round trip against the REST endpoint.
///
/// Implementations report failures themselves and hand them back as `Err`;
/// they never retry.
#[async_trait]
pub trait RestTransport: Send + Sync {
    /// Sends `method` to `path` (relative to the REST root, query string
    /// included). Returns `None` when the response has no body.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        prefer: Prefer,
    ) -> Result<Option<Value>, RequestError>;
}

/// `reqwest`-backed transport for a Supabase project.
pub struct PostgrestClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestClient {
    pub fn new(config: &UpdaterConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            api_key: config.supabase_key.clone(),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            REST_PREFIX,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl RestTransport for PostgrestClient {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        prefer: Prefer,
    ) -> Result<Option<Value>, RequestError> {
        let url = self.url_for(path);
        debug!(%method, %url, "Making request.");

        let mut request_builder = self
            .client
            .request(method.clone(), &url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .header("Prefer", prefer.header_value());

        if let Some(body) = body {
            debug!(body = %serde_json::to_string_pretty(body).unwrap_or_default(), "Request data.");
            request_builder = request_builder.json(body);
        }

        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(%method, %url, error = %e, "Error making request.");
                return Err(RequestError::Transport(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(
                %method,
                %url,
                status = status.as_u16(),
                body = %error_body,
                "Request returned non-success status."
            );
            return Err(RequestError::Status {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let text = response.text().await.map_err(|e| {
            error!(%method, %url, error = %e, "Failed to read response body.");
            RequestError::Transport(e)
        })?;
        debug!(status = status.as_u16(), "Request successful.");

        if text.trim().is_empty() {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            error!(%url, error = %e, "Response body is not valid JSON.");
            RequestError::from(e)
        })?;
        log_response_preview(&value);
        Ok(Some(value))
    }
}

fn log_response_preview(value: &Value) {
    match value {
        Value::Array(items) if items.len() > LIST_PREVIEW_THRESHOLD => {
            debug!(count = items.len(), "Received items.");
        }
        _ => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
            let preview: String = pretty.chars().take(PREVIEW_CHARS).collect();
            debug!(data = %preview, "Response data.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn client_for(url: &str) -> PostgrestClient {
        PostgrestClient::new(&UpdaterConfig {
            supabase_url: url.to_string(),
            supabase_key: "anon".to_string(),
        })
    }

    #[test]
    fn test_url_for_joins_rest_root() {
        let client = client_for("https://abc.supabase.co");
        assert_eq!(
            client.url_for("assets?mac_address=eq.aa"),
            "https://abc.supabase.co/rest/v1/assets?mac_address=eq.aa"
        );
        assert_eq!(
            client.url_for("/device_load_stats"),
            "https://abc.supabase.co/rest/v1/device_load_stats"
        );
    }

    #[test]
    fn test_prefer_header_by_method() {
        assert_eq!(
            Prefer::for_method(&Method::GET).header_value(),
            "return=representation"
        );
        assert_eq!(Prefer::for_method(&Method::PATCH), Prefer::Minimal);
        assert_eq!(Prefer::for_method(&Method::POST), Prefer::Minimal);
        assert_eq!(Prefer::for_method(&Method::DELETE), Prefer::Minimal);
        assert!(
            Prefer::MergeDuplicates
                .header_value()
                .starts_with("resolution=merge-duplicates")
        );
    }

    /// Accepts one connection, answers it with `status_line` and `body`, and
    /// hands back the raw request text.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (url, handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    return text;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    #[tokio::test]
    async fn test_send_sets_auth_and_prefer_headers_and_maps_status() {
        let (url, server) = serve_once("409 Conflict", "duplicate").await;
        let client = client_for(&url);
        let body = serde_json::json!({ "metric_name": "avg_cpu_load", "metric_value": 1.5 });

        let result = client
            .send(
                Method::POST,
                "device_metrics_summary?on_conflict=metric_name",
                Some(&body),
                Prefer::MergeDuplicates,
            )
            .await;

        match result {
            Err(RequestError::Status { status, body }) => {
                assert_eq!(status, 409);
                assert_eq!(body, "duplicate");
            }
            other => panic!("expected status error, got {other:?}"),
        }

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with(
            "post /rest/v1/device_metrics_summary?on_conflict=metric_name http/1.1"
        ));
        assert!(request.contains("apikey: anon\r\n"));
        assert!(request.contains("authorization: bearer anon\r\n"));
        assert!(request.contains("content-type: application/json\r\n"));
        assert!(request.contains("prefer: resolution=merge-duplicates,return=minimal\r\n"));
        assert!(request.contains("\"metric_name\":\"avg_cpu_load\""));
    }

    #[tokio::test]
    async fn test_send_empty_success_body_is_none() {
        let (url, server) = serve_once("201 Created", "").await;
        let client = client_for(&url);
        let body = serde_json::json!({ "device_name": "router-main" });

        let result = client
            .send(Method::POST, "device_load_stats", Some(&body), Prefer::Minimal)
            .await
            .unwrap();
        assert!(result.is_none());

        let request = server.await.unwrap().to_lowercase();
        assert!(request.contains("prefer: return=minimal\r\n"));
    }

    #[tokio::test]
    async fn test_send_decodes_json_list() {
        let (url, server) = serve_once("200 OK", r#"[{"id":1},{"id":2}]"#).await;
        let client = client_for(&url);

        let result = client
            .send(Method::GET, "device_load_stats", None, Prefer::Representation)
            .await
            .unwrap();
        assert_eq!(result, Some(serde_json::json!([{ "id": 1 }, { "id": 2 }])));

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /rest/v1/device_load_stats http/1.1"));
        assert!(request.contains("prefer: return=representation\r\n"));
    }

    #[tokio::test]
    async fn test_send_invalid_json_body_is_decode_error() {
        let (url, server) = serve_once("200 OK", "not json").await;
        let client = client_for(&url);

        let result = client
            .send(Method::GET, "assets", None, Prefer::Representation)
            .await;
        assert!(matches!(result, Err(RequestError::Decode(_))));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_host_returns_error() {
        // Nothing listens on port 9 locally.
        let client = client_for("http://127.0.0.1:9");
        let result = client
            .send(Method::GET, "assets", None, Prefer::Representation)
            .await;
        assert!(result.is_err());
    }
}
