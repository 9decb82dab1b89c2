use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};

use crate::config::GistLogConfig;
use crate::errors::{GistLogError, GistLogResult};
use crate::store::backend::DocumentStore;
use crate::store::types::{Gist, GistUpdate};

/// Document store backed by the GitHub Gists REST API.
pub struct GitHubGistStore {
    config: GistLogConfig,
    client: reqwest::Client,
}

impl GitHubGistStore {
    pub fn new(config: GistLogConfig) -> GistLogResult<Self> {
        config.validate()?;
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;
        Ok(Self { config, client })
    }

    /// Uses a caller-built client; `user_agent` and `timeout_secs` are then up to that client.
    pub fn with_client(config: GistLogConfig, client: reqwest::Client) -> GistLogResult<Self> {
        config.validate()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GistLogConfig {
        &self.config
    }

    fn request(&self, method: reqwest::Method, url: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(ACCEPT, &self.config.accept)
            .header(AUTHORIZATION, format!("token {token}"))
    }

    /// GitHub cuts file content over 1 MB out of the gist response; fetch the rest from `raw_url`.
    async fn fetch_raw(&self, raw_url: &str, token: &str) -> GistLogResult<String> {
        tracing::debug!(url = %raw_url, "gist file truncated, fetching raw content");
        let response = self.request(reqwest::Method::GET, raw_url, token).send().await?;
        let response = check_response(response).await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl DocumentStore for GitHubGistStore {
    fn name(&self) -> &str {
        "github"
    }

    async fn fetch_file(&self, gist_id: &str, token: &str, filename: &str) -> GistLogResult<String> {
        let url = self.config.gist_url(gist_id);
        tracing::debug!(gist = %gist_id, file = %filename, "GET gist");

        let response = self.request(reqwest::Method::GET, &url, token).send().await?;
        let response = check_response(response).await?;
        let bytes = response.bytes().await?;
        let gist: Gist = serde_json::from_slice(&bytes)?;

        match gist.files.get(filename) {
            Some(file) if file.truncated => match file.raw_url.as_deref() {
                Some(raw_url) => self.fetch_raw(raw_url, token).await,
                None => Ok(file.content.clone().unwrap_or_default()),
            },
            _ => Ok(gist.file_content(filename).to_string()),
        }
    }

    async fn push_file(
        &self,
        gist_id: &str,
        token: &str,
        filename: &str,
        content: &str,
    ) -> GistLogResult<()> {
        let url = self.config.gist_url(gist_id);
        let update = GistUpdate::single(filename, content);
        tracing::debug!(gist = %gist_id, file = %filename, bytes = content.len(), "PATCH gist");

        let response = self
            .request(reqwest::Method::PATCH, &url, token)
            .json(&update)
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }
}

/// Maps any status >= 400 to `GistLogError::Store`, keeping the raw body for diagnostics.
async fn check_response(response: reqwest::Response) -> GistLogResult<reqwest::Response> {
    let status = response.status();
    if status.as_u16() >= 400 {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "gist API rejected request");
        return Err(GistLogError::Store {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[derive(Debug, Clone)]
    struct Recorded {
        method: String,
        path: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Recorded {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }
    }

    type Log = Arc<Mutex<Vec<Recorded>>>;

    async fn bind_stub() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, format!("http://{addr}"))
    }

    /// Answers one connection per canned response, in order.
    fn serve(listener: TcpListener, responses: Vec<(u16, String)>) -> Log {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let seen = log.clone();
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await;
                seen.lock().unwrap().push(request);
                let reply = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).await.unwrap();
                let _ = stream.shutdown().await;
            }
        });
        log
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> Recorded {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers completed");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.split("\r\n");
        let mut request_line = lines.next().unwrap().split(' ');
        let method = request_line.next().unwrap().to_string();
        let path = request_line.next().unwrap().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();

        let content_length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

        Recorded {
            method,
            path,
            headers,
            body,
        }
    }

    fn store_for(base: &str) -> GitHubGistStore {
        let config = GistLogConfig {
            api_base: format!("{base}/gists/"),
            ..GistLogConfig::default()
        };
        let client = reqwest::Client::builder()
            .no_proxy()
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap();
        GitHubGistStore::with_client(config, client).unwrap()
    }

    #[tokio::test]
    async fn fetch_sends_accept_and_token_headers() {
        let (listener, base) = bind_stub().await;
        let body = r#"{"files":{"log.csv":{"filename":"log.csv","content":"\nval1,val3\n"}}}"#;
        let log = serve(listener, vec![(200, body.to_string())]);

        let store = store_for(&base);
        let content = store.fetch_file("g123", "secret", "log.csv").await.unwrap();
        assert_eq!(content, "\nval1,val3\n");

        let requests = log.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/gists/g123");
        assert_eq!(requests[0].header("accept"), Some("application/vnd.github.v3+json"));
        assert_eq!(requests[0].header("authorization"), Some("token secret"));
        assert!(requests[0].header("user-agent").unwrap().starts_with("gistlog/"));
    }

    #[tokio::test]
    async fn fetch_missing_file_is_empty() {
        let (listener, base) = bind_stub().await;
        let body = r#"{"files":{"other.csv":{"filename":"other.csv","content":"x"}}}"#;
        let _log = serve(listener, vec![(200, body.to_string())]);

        let store = store_for(&base);
        let content = store.fetch_file("g123", "secret", "log.csv").await.unwrap();
        assert_eq!(content, "");
    }

    #[tokio::test]
    async fn fetch_error_status_carries_body() {
        let (listener, base) = bind_stub().await;
        let body = r#"{"message":"Not Found"}"#;
        let _log = serve(listener, vec![(404, body.to_string())]);

        let store = store_for(&base);
        let err = store.fetch_file("nope", "secret", "log.csv").await.unwrap_err();
        match err {
            GistLogError::Store { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("Not Found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_follows_raw_url_when_truncated() {
        let (listener, base) = bind_stub().await;
        let gist = format!(
            r#"{{"files":{{"log.csv":{{"filename":"log.csv","content":"\na,b","truncated":true,"raw_url":"{base}/raw/log.csv"}}}}}}"#
        );
        let log = serve(listener, vec![(200, gist), (200, "\na,b\nc,d\n".to_string())]);

        let store = store_for(&base);
        let content = store.fetch_file("g123", "secret", "log.csv").await.unwrap();
        assert_eq!(content, "\na,b\nc,d\n");

        let requests = log.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].path, "/raw/log.csv");
        assert_eq!(requests[1].header("authorization"), Some("token secret"));
    }

    #[tokio::test]
    async fn push_patches_single_file_without_html_escaping() {
        let (listener, base) = bind_stub().await;
        let log = serve(listener, vec![(200, "{}".to_string())]);

        let store = store_for(&base);
        store
            .push_file("g123", "secret", "log.csv", "\n<a>&b\n")
            .await
            .unwrap();

        let requests = log.lock().unwrap().clone();
        assert_eq!(requests[0].method, "PATCH");
        assert_eq!(requests[0].path, "/gists/g123");
        assert_eq!(requests[0].header("authorization"), Some("token secret"));
        assert!(requests[0].body.contains("<a>&b"));

        let sent: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        let files = sent["files"].as_object().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(sent["files"]["log.csv"]["filename"], "log.csv");
        assert_eq!(sent["files"]["log.csv"]["content"], "\n<a>&b\n");
    }

    #[tokio::test]
    async fn push_rejection_is_store_error() {
        let (listener, base) = bind_stub().await;
        let _log = serve(listener, vec![(422, r#"{"message":"Validation Failed"}"#.to_string())]);

        let store = store_for(&base);
        let err = store
            .push_file("g123", "secret", "log.csv", "\nx\n")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(422));
    }

    #[tokio::test]
    async fn unreachable_store_is_transport_error() {
        let (listener, base) = bind_stub().await;
        drop(listener);

        let store = store_for(&base);
        let err = store.fetch_file("g123", "secret", "log.csv").await.unwrap_err();
        assert!(matches!(err, GistLogError::Transport(_)));
    }

    #[test]
    fn invalid_config_fails_construction() {
        let config = GistLogConfig {
            api_base: String::new(),
            ..GistLogConfig::default()
        };
        assert!(matches!(
            GitHubGistStore::new(config),
            Err(GistLogError::Config(_))
        ));
    }
}
