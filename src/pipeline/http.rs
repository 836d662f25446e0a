//! HTTP request pipeline layouts
//!
//! Two-layer blueprint mirroring the connect/request split of the outbound
//! path: `HttpConnectLayout` owns the connection half (client construction,
//! per-request deadline), `HttpRequestLayout` the request half (method,
//! headers, URL). The instance sends each fed body as one request; a failed
//! or timed-out request is logged and dropped - this is a best-effort
//! telemetry path, not a durable queue.

use super::{Layout, Pipeline};
use crate::error::{Error, Result};
use crate::worker::EventLoopHandle;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Connection half of the outbound path.
pub struct HttpConnectLayout {
    url: Url,
    timeout: Duration,
}

impl HttpConnectLayout {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { url, timeout })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn connect(&self) -> reqwest::Result<Client> {
        Client::builder().timeout(self.timeout).build()
    }
}

/// Request half of the outbound path.
pub struct HttpRequestLayout {
    connect: HttpConnectLayout,
    method: Method,
    headers: HeaderMap,
}

impl HttpRequestLayout {
    pub fn new(
        connect: HttpConnectLayout,
        method: &str,
        headers: &HashMap<String, String>,
    ) -> Result<Arc<Self>> {
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| Error::InvalidMethod {
            method: method.to_string(),
        })?;

        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                Error::InvalidHeader { name: name.clone() }
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader {
                name: name.to_string(),
            })?;
            header_map.insert(name, value);
        }

        Ok(Arc::new(Self {
            connect,
            method,
            headers: header_map,
        }))
    }
}

impl Layout for HttpRequestLayout {
    fn name(&self) -> &str {
        "http-request"
    }

    fn instantiate(self: Arc<Self>, ctx: &EventLoopHandle) -> Pipeline {
        ctx.spawn_pipeline("http-request", move |mut rx| async move {
            let client = match self.connect.connect() {
                Ok(client) => client,
                Err(e) => {
                    tracing::error!(url = %self.connect.url(), error = %e, "HTTP client creation failed");
                    while rx.recv().await.is_some() {}
                    return;
                }
            };

            while let Some(body) = rx.recv().await {
                let request = client
                    .request(self.method.clone(), self.connect.url().clone())
                    .headers(self.headers.clone())
                    .body(body);
                match request.send().await {
                    Ok(response) => {
                        tracing::trace!(url = %self.connect.url(), status = %response.status(), "batch shipped");
                    }
                    Err(e) => {
                        // Bounded loss over unbounded queueing: the batch is gone.
                        tracing::debug!(url = %self.connect.url(), error = %e, "batch dropped");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_layout_rejects_bad_url() {
        let result = HttpConnectLayout::new("not a url", Duration::from_secs(5));
        assert!(matches!(result, Err(Error::InvalidUrl { .. })));
    }

    #[test]
    fn test_request_layout_rejects_bad_method() {
        let connect = HttpConnectLayout::new("http://127.0.0.1:1/logs", Duration::from_secs(5))
            .unwrap();
        let result = HttpRequestLayout::new(connect, "NOT A METHOD", &HashMap::new());
        assert!(matches!(result, Err(Error::InvalidMethod { .. })));
    }

    #[test]
    fn test_request_layout_rejects_bad_header() {
        let connect = HttpConnectLayout::new("http://127.0.0.1:1/logs", Duration::from_secs(5))
            .unwrap();
        let mut headers = HashMap::new();
        headers.insert("bad header name".to_string(), "x".to_string());
        let result = HttpRequestLayout::new(connect, "POST", &headers);
        assert!(matches!(result, Err(Error::InvalidHeader { .. })));
    }

    #[test]
    fn test_request_layout_accepts_custom_method_and_headers() {
        let connect = HttpConnectLayout::new("http://127.0.0.1:1/logs", Duration::from_secs(5))
            .unwrap();
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let layout = HttpRequestLayout::new(connect, "PUT", &headers).unwrap();
        assert_eq!(layout.name(), "http-request");
        assert_eq!(layout.method, Method::PUT);
        assert_eq!(
            layout.headers.get("content-type").unwrap(),
            "application/json"
        );
    }
}
