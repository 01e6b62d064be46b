//! Knox protocol client
//!
//! One method per server capability. Every method validates its input before
//! building a request, so a rejected input never produces network traffic.
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


use crate::codec::{decode_response, encode_data, encode_field, Empty};
use crate::error::{KnoxError, KnoxResult};
use crate::key_types::{validate_key_id, Access, Acl, Key, KeyId, VersionStatus};
use crate::transport::{HttpRequest, ReqwestTransport, Transport};
use knox_config::KnoxConfig;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

const KEYS_PATH: &str = "/v0/keys/";

fn key_path(key_id: &str) -> String {
    format!("{}{}/", KEYS_PATH, key_id)
}

fn versions_path(key_id: &str) -> String {
    format!("{}{}/versions/", KEYS_PATH, key_id)
}

fn version_path(key_id: &str, version_id: u64) -> String {
    format!("{}{}/versions/{}/", KEYS_PATH, key_id, version_id)
}

fn access_path(key_id: &str) -> String {
    format!("{}{}/access/", KEYS_PATH, key_id)
}

fn validate_status(status: VersionStatus) -> KnoxResult<()> {
    if status.is_valid() {
        Ok(())
    } else {
        Err(KnoxError::Validation(format!("invalid version status {}", status)))
    }
}

/// Stateless client for the Knox key API.
///
/// Cloning is cheap and clones share the transport.
#[derive(Clone)]
pub struct KnoxClient {
    transport: Arc<dyn Transport>,
}

impl KnoxClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Client over HTTP(S) as described by `config`
    pub fn from_config(config: &KnoxConfig) -> KnoxResult<Self> {
        Ok(Self::new(Arc::new(ReqwestTransport::new(config)?)))
    }

    async fn call<T: DeserializeOwned>(&self, request: HttpRequest) -> KnoxResult<T> {
        debug!(method = %request.method, path = %request.path, "Sending Knox request");
        let body = self.transport.execute(request).await?;
        decode_response(&body)
    }

    /// Fetch a key with its primary and active versions
    pub async fn get_key(&self, key_id: &str) -> KnoxResult<Key> {
        validate_key_id(key_id)?;
        self.call(HttpRequest::get(key_path(key_id))).await
    }

    /// Fetch a key including every version at or above `status`
    pub async fn get_key_with_status(&self, key_id: &str, status: VersionStatus) -> KnoxResult<Key> {
        validate_key_id(key_id)?;
        validate_status(status)?;
        let request = HttpRequest::get(key_path(key_id)).with_query("status", encode_field(&status)?);
        self.call(request).await
    }

    /// List key identifiers.
    ///
    /// Each pair becomes one query parameter, in iteration order. The server
    /// treats them as `key id = version hash` and omits keys whose hash still
    /// matches; an empty parameter set lists every key the caller may see.
    pub async fn get_keys<I, K, V>(&self, params: I) -> KnoxResult<Vec<KeyId>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let request = params
            .into_iter()
            .fold(HttpRequest::get(KEYS_PATH), |request, (name, value)| {
                request.with_query(name, value)
            });
        self.call(request).await
    }

    /// Create a key whose first version holds `data`; returns that version's id
    pub async fn create_key(&self, key_id: &str, data: &[u8], acl: &Acl) -> KnoxResult<u64> {
        validate_key_id(key_id)?;
        acl.validate()?;
        let request = HttpRequest::post(KEYS_PATH)
            .with_form("id", key_id)
            .with_form("data", encode_data(data))
            .with_form("acl", encode_field(acl)?);
        self.call(request).await
    }

    /// Add a new version to a key; returns the new version id
    pub async fn add_version(&self, key_id: &str, data: &[u8]) -> KnoxResult<u64> {
        validate_key_id(key_id)?;
        let request = HttpRequest::post(versions_path(key_id)).with_form("data", encode_data(data));
        self.call(request).await
    }

    pub async fn delete_key(&self, key_id: &str) -> KnoxResult<()> {
        validate_key_id(key_id)?;
        let _: Empty = self.call(HttpRequest::delete(key_path(key_id))).await?;
        Ok(())
    }

    /// Request a status change for one version.
    ///
    /// Only the enumeration is checked locally; whether the transition is
    /// legal is the server's decision.
    pub async fn update_version(
        &self,
        key_id: &str,
        version_id: u64,
        status: VersionStatus,
    ) -> KnoxResult<()> {
        validate_key_id(key_id)?;
        validate_status(status)?;
        let request = HttpRequest::put(version_path(key_id, version_id))
            .with_form("status", encode_field(&status)?);
        let _: Empty = self.call(request).await?;
        Ok(())
    }

    pub async fn get_acl(&self, key_id: &str) -> KnoxResult<Acl> {
        validate_key_id(key_id)?;
        self.call(HttpRequest::get(access_path(key_id))).await
    }

    /// Grant, change or (with `AccessType::None`) revoke one principal's access
    pub async fn put_access(&self, key_id: &str, access: &Access) -> KnoxResult<()> {
        validate_key_id(key_id)?;
        access.validate()?;
        let request = HttpRequest::put(access_path(key_id)).with_form("access", encode_field(access)?);
        let _: Empty = self.call(request).await?;
        Ok(())
    }
}
