use crate::config::HttpSettings;
use crate::entity::{EntityError, EntityResult};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport seam between repositories and the remote service. Tests
/// substitute an in-memory implementation; production uses
/// [`ReqwestTransport`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> EntityResult<HttpResponse>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    settings: HttpSettings,
}

impl ReqwestTransport {
    pub fn new(settings: HttpSettings) -> EntityResult<Self> {
        settings
            .validate()
            .map_err(|message| EntityError::InvalidConfig { message })?;

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self { client, settings })
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> EntityResult<HttpResponse> {
        let url = self.url_for(path);
        debug!(%method, %url, "sending request");

        let mut request = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };

        if !self.settings.query_defaults.is_empty() {
            request = request.query(&self.settings.query_defaults);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            None
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => Some(value),
                Err(_) => Some(Value::String(text)),
            }
        };

        debug!(%method, %url, status, "received response");
        Ok(HttpResponse { status, body })
    }
}
