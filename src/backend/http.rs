//! HTTP client for the experiment backend.

use super::{paths, Backend};
use crate::error::{AppResult, MonitorError};
use crate::experiment::{
    CaptureReceipt, DataEntry, EntryId, Experiment, ExperimentId, LiveReading, NewExperiment,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Parse a backend base URL.
///
/// A bare `host:port` is treated as `http://host:port`, and the path always
/// ends in `/` so request paths resolve beneath it.
pub fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let raw = raw.trim();
    let mut base = if raw.starts_with("http://") || raw.starts_with("https://") {
        Url::parse(raw)?
    } else {
        Url::parse(&format!("http://{raw}"))?
    };
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

/// High-level REST client for the droplet backend
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    /// Build a client for the backend at `base_url`.
    ///
    /// See [`parse_base_url`] for the accepted forms.
    pub fn new(base_url: &str, request_timeout: Duration) -> AppResult<Self> {
        let base = parse_base_url(base_url)?;
        let client = Client::builder().timeout(request_timeout).build()?;

        info!("Using experiment backend at {}", base);
        Ok(Self { client, base })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a request path under the base URL, keeping any path prefix
    /// the base carries (e.g. behind a reverse proxy).
    fn url(&self, path: &str) -> AppResult<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    /// Send a request and fail on transport errors or non-success status.
    async fn send(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> AppResult<reqwest::Response> {
        debug!("{} {}", method, path);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Status {
                method,
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> AppResult<T> {
        let body = self.send(method, path, request).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| MonitorError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_experiments(&self) -> AppResult<Vec<Experiment>> {
        let path = paths::EXPERIMENTS;
        self.send_json("GET", path, self.client.get(self.url(path)?))
            .await
    }

    async fn create_experiment(&self, new: &NewExperiment) -> AppResult<Experiment> {
        let path = paths::EXPERIMENTS;
        self.send_json("POST", path, self.client.post(self.url(path)?).json(new))
            .await
    }

    async fn delete_experiment(&self, id: &ExperimentId) -> AppResult<()> {
        let path = paths::experiment(id);
        self.send("DELETE", &path, self.client.delete(self.url(&path)?))
            .await?;
        Ok(())
    }

    async fn select_experiment(&self, id: &ExperimentId) -> AppResult<()> {
        let path = paths::select(id);
        let request = self
            .client
            .post(self.url(&path)?)
            .json(&serde_json::json!({}));
        // The acknowledgement body carries nothing we use.
        self.send("POST", &path, request).await?;
        Ok(())
    }

    async fn export_experiment(&self, id: &ExperimentId) -> AppResult<Bytes> {
        let path = paths::export(id);
        let response = self
            .send("GET", &path, self.client.get(self.url(&path)?))
            .await?;
        Ok(response.bytes().await?)
    }

    async fn trigger_capture(&self) -> AppResult<CaptureReceipt> {
        let path = paths::CAPTURE;
        let request = self
            .client
            .post(self.url(path)?)
            .json(&serde_json::json!({}));
        self.send_json("POST", path, request).await
    }

    async fn fetch_entry(
        &self,
        experiment: &ExperimentId,
        entry: &EntryId,
    ) -> AppResult<DataEntry> {
        let path = paths::entry(experiment, entry);
        self.send_json("GET", &path, self.client.get(self.url(&path)?))
            .await
    }

    async fn fetch_live_reading(&self) -> AppResult<LiveReading> {
        let path = paths::LIVE;
        self.send_json("GET", path, self.client.get(self.url(path)?))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_bare_address_gets_scheme() {
        let backend = HttpBackend::new("127.0.0.1:5000", Duration::from_secs(1)).unwrap();
        assert_eq!(backend.base_url().as_str(), "http://127.0.0.1:5000/");
    }

    #[test]
    fn test_paths_resolve_against_base() {
        let backend =
            HttpBackend::new("http://droplet.local:8080", Duration::from_secs(1)).unwrap();
        let url = backend
            .url(&paths::entry(&ExperimentId::new("4"), &EntryId::new("99")))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://droplet.local:8080/api/experiments/4/data/99"
        );
        assert_eq!(
            backend.url(&paths::select(&"7".into())).unwrap().path(),
            "/api/experiments/select/7"
        );
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        for base in ["http://host/droplet", "http://host/droplet/"] {
            let backend = HttpBackend::new(base, Duration::from_secs(1)).unwrap();
            assert_eq!(backend.base_url().as_str(), "http://host/droplet/");
            assert_eq!(
                backend.url(paths::LIVE).unwrap().as_str(),
                "http://host/droplet/api/data"
            );
            assert_eq!(
                backend
                    .url(&paths::experiment(&ExperimentId::new("5")))
                    .unwrap()
                    .as_str(),
                "http://host/droplet/api/experiments/5"
            );
        }
    }

    #[test]
    fn test_parse_base_url_forms() {
        assert_eq!(
            parse_base_url("droplet.local:5000/station").unwrap().as_str(),
            "http://droplet.local:5000/station/"
        );
        assert_eq!(
            parse_base_url("https://droplet.local").unwrap().as_str(),
            "https://droplet.local/"
        );
        assert!(parse_base_url("not a url").is_err());
    }

    /// Serve one canned HTTP response on a local port, return its base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 4096];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_error_status_maps_to_status_error() {
        let base = serve_once("503 Service Unavailable", "").await;
        let backend = HttpBackend::new(&base, Duration::from_secs(5)).unwrap();

        let err = backend.fetch_live_reading().await.unwrap_err();
        match err {
            MonitorError::Status {
                method,
                path,
                status,
            } => {
                assert_eq!(method, "GET");
                assert_eq!(path, paths::LIVE);
                assert_eq!(status, 503);
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_decode_error() {
        let base = serve_once("200 OK", r#"{"temperature":null,"humidity":"wet"}"#).await;
        let backend = HttpBackend::new(&base, Duration::from_secs(5)).unwrap();

        let err = backend.fetch_live_reading().await.unwrap_err();
        assert!(matches!(err, MonitorError::Decode { ref path, .. } if path == paths::LIVE));
        assert!(err.is_backend_failure());
    }

    #[tokio::test]
    async fn test_live_reading_decoded() {
        let base = serve_once("200 OK", r#"{"temperature":22.5,"humidity":41.0}"#).await;
        let backend = HttpBackend::new(&base, Duration::from_secs(5)).unwrap();

        let reading = backend.fetch_live_reading().await.unwrap();
        assert_eq!(
            reading,
            LiveReading {
                temperature: 22.5,
                humidity: 41.0
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) is closed on test machines; the connect fails fast.
        let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = backend.fetch_live_reading().await.unwrap_err();
        assert!(matches!(err, MonitorError::Transport(_)));
    }
}
