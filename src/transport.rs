use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::error::{Error, Result};

/// Delivers encoded payloads to the backend.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send one JSON payload to `uri`, giving up after `timeout`.
    async fn send(&self, uri: &str, body: Vec<u8>, timeout: Duration) -> Result<()>;
}

/// POSTs payloads as `application/json`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, uri: &str, body: Vec<u8>, timeout: Duration) -> Result<()> {
        let response = self
            .client
            .post(uri)
            .header(CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Status(response.status()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        http::{HeaderMap, StatusCode},
        routing::post,
        Router,
    };
    use parking_lot::Mutex;
    use tokio::net::TcpListener;

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/api/v4/publish")
    }

    #[tokio::test]
    async fn posts_json() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().route(
            "/api/v4/publish",
            post({
                let seen = seen.clone();
                move |headers: HeaderMap, body: String| async move {
                    let content_type = headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    seen.lock().push((content_type, body));
                    StatusCode::OK
                }
            }),
        );
        let uri = serve(app).await;

        let transport = HttpTransport::new().unwrap();
        transport
            .send(&uri, b"[0]".to_vec(), Duration::from_secs(1))
            .await
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.as_deref(), Some("application/json"));
        assert_eq!(seen[0].1, "[0]");
    }

    #[tokio::test]
    async fn non_success_is_an_error() {
        let app = Router::new().route(
            "/api/v4/publish",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let uri = serve(app).await;

        let err = HttpTransport::new()
            .unwrap()
            .send(&uri, b"[0]".to_vec(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Status(s) if s.as_u16() == 500));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let app = Router::new().route(
            "/api/v4/publish",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        );
        let uri = serve(app).await;

        let err = HttpTransport::new()
            .unwrap()
            .send(&uri, b"[0]".to_vec(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(e) if e.is_timeout()));
    }
}
