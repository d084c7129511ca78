//! Request/response seam between the mirror and the automation service.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::TransportError;

/// JSON-over-HTTP operations the mirror needs. `path` is relative to the
/// service root, without a leading slash (`"processes"`, `"tasks/retrain"`).
pub trait Transport: Send + Sync + 'static {
    fn get(&self, path: &str) -> impl Future<Output = Result<Value, TransportError>> + Send;

    fn patch<B>(&self, path: &str, body: &B) -> impl Future<Output = Result<Value, TransportError>> + Send
    where
        B: Serialize + Sync;

    fn post<B>(&self, path: &str, body: &B) -> impl Future<Output = Result<Value, TransportError>> + Send
    where
        B: Serialize + Sync;
}

impl<T: Transport> Transport for Arc<T> {
    fn get(&self, path: &str) -> impl Future<Output = Result<Value, TransportError>> + Send {
        (**self).get(path)
    }

    fn patch<B>(&self, path: &str, body: &B) -> impl Future<Output = Result<Value, TransportError>> + Send
    where
        B: Serialize + Sync,
    {
        (**self).patch(path, body)
    }

    fn post<B>(&self, path: &str, body: &B) -> impl Future<Output = Result<Value, TransportError>> + Send
    where
        B: Serialize + Sync,
    {
        (**self).post(path, body)
    }
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// `timeout` bounds each request as a whole; `None` leaves it to the OS.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        let resp = self.client.get(self.url(path)).send().await?;
        read_json(resp).await
    }

    async fn patch<B>(&self, path: &str, body: &B) -> Result<Value, TransportError>
    where
        B: Serialize + Sync,
    {
        let resp = self.client.patch(self.url(path)).json(body).send().await?;
        read_json(resp).await
    }

    async fn post<B>(&self, path: &str, body: &B) -> Result<Value, TransportError>
    where
        B: Serialize + Sync,
    {
        let resp = self.client.post(self.url(path)).json(body).send().await?;
        read_json(resp).await
    }
}

async fn read_json(resp: Response) -> Result<Value, TransportError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        return Err(TransportError::from_status(status.as_u16(), &bytes));
    }
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let t = HttpTransport::new("http://127.0.0.1:8000/", None).unwrap();
        assert_eq!(t.base_url(), "http://127.0.0.1:8000");
        assert_eq!(t.url("processes"), "http://127.0.0.1:8000/processes");
        assert_eq!(t.url("/tasks/retrain"), "http://127.0.0.1:8000/tasks/retrain");
    }
}
