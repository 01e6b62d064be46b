//! HTTP transport seam and its reqwest implementation
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::error::{KnoxError, KnoxResult, TransportError};
use async_trait::async_trait;
use knox_config::KnoxConfig;
use reqwest::{header, Method, Url};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("knox-client/", env!("CARGO_PKG_VERSION"));

/// A request as the protocol layer sees it: no host, no headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    /// Query parameters in caller order
    pub query: Vec<(String, String)>,
    /// Form fields in insertion order, sent url-encoded
    pub form: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            form: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    /// First form value named `name`
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Performs one HTTP exchange and hands back the raw body.
///
/// Implementations return the body whatever the HTTP status is; the response
/// envelope decides success. They must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>, TransportError>;
}

/// Transport over a shared `reqwest::Client`
#[derive(Clone)]
pub struct ReqwestTransport {
    base_url: Url,
    client: reqwest::Client,
    auth_token: Option<String>,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(config: &KnoxConfig) -> KnoxResult<Self> {
        config
            .validate()
            .map_err(|e| KnoxError::Configuration(e.to_string()))?;

        let mut base_url = Url::parse(config.base_url.trim()).map_err(|e| {
            KnoxError::Configuration(format!("Invalid base_url '{}': {}", config.base_url, e))
        })?;
        // a path prefix such as `/knox` must survive joining
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| KnoxError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            client,
            auth_token: config.auth_token.clone(),
            timeout: config.timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a request path below the base URL, keeping any prefix
    pub fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>, TransportError> {
        let url = self.endpoint(&request.path)?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .timeout(self.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }
        if let Some(ref token) = self.auth_token {
            builder = builder.header(header::AUTHORIZATION, token);
        }

        let response = builder.send().await.map_err(TransportError::from_send)?;
        let status = response.status();
        let body = response.bytes().await?;

        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            bytes = body.len(),
            "Knox response received"
        );

        Ok(body.to_vec())
    }
}
