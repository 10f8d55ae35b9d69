use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use bytes::Bytes;
use log::debug;
use serde_json::Value;
use thiserror::Error;

pub type HttpFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + 'a>>;

pub type SharedBackend = Arc<dyn HttpBackend + Send + Sync>;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Failures below the HTTP layer. A non-200 status is not a transport error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("timed out")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// The two request shapes the Hugging Face endpoints need, both bearer-authenticated.
pub trait HttpBackend {
    fn get<'a>(&'a self, url: &'a str, bearer: &'a str, timeout: Duration) -> HttpFuture<'a>;

    fn post_json<'a>(
        &'a self,
        url: &'a str,
        bearer: &'a str,
        body: &'a Value,
        timeout: Duration,
    ) -> HttpFuture<'a>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn shared() -> SharedBackend {
        Arc::new(Self::new())
    }
}

impl HttpBackend for ReqwestBackend {
    fn get<'a>(&'a self, url: &'a str, bearer: &'a str, timeout: Duration) -> HttpFuture<'a> {
        let req = self.client.get(url).bearer_auth(bearer).timeout(timeout);
        Box::pin(send(req))
    }

    fn post_json<'a>(
        &'a self,
        url: &'a str,
        bearer: &'a str,
        body: &'a Value,
        timeout: Duration,
    ) -> HttpFuture<'a> {
        let req = self
            .client
            .post(url)
            .bearer_auth(bearer)
            .json(body)
            .timeout(timeout);
        Box::pin(send(req))
    }
}

async fn send(req: reqwest::RequestBuilder) -> Result<HttpResponse, TransportError> {
    let resp = req.send().await?;
    let status = resp.status().as_u16();
    let body = resp.bytes().await?;
    debug!("Response status {status}, {} bytes", body.len());
    Ok(HttpResponse { status, body })
}
