//! Primary/active key material for consumers
//!
//! Code that signs or encrypts depends on [`KeyProvider`] only, so the same code
//! runs against a live Knox key or against fixed material in tests.
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


use crate::client::KnoxClient;
use crate::error::{KnoxError, KnoxResult};
use crate::key_types::{Key, KeyId, KeyVersion};
use arc_swap::ArcSwap;
use knox_config::KnoxConfig;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Read-only view of the current key material
pub trait KeyProvider: Send + Sync {
    /// Material for new cryptographic operations
    fn get_primary(&self) -> String;

    /// Every usable material, primary included, in server order
    fn get_active(&self) -> Vec<String>;
}

/// Fixed material, set at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticKeyProvider {
    primary: String,
    active: Vec<String>,
}

impl StaticKeyProvider {
    pub fn new<I, S>(primary: impl Into<String>, active: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            primary: primary.into(),
            active: active.into_iter().map(Into::into).collect(),
        }
    }
}

impl KeyProvider for StaticKeyProvider {
    fn get_primary(&self) -> String {
        self.primary.clone()
    }

    fn get_active(&self) -> Vec<String> {
        self.active.clone()
    }
}

/// Provider returning `primary` and `active` for its whole lifetime
pub fn static_provider<I, S>(primary: impl Into<String>, active: I) -> Arc<dyn KeyProvider>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Arc::new(StaticKeyProvider::new(primary, active))
}

/// Provider backed by one key on a Knox server
pub async fn live_provider(
    client: KnoxClient,
    key_id: impl Into<KeyId>,
) -> KnoxResult<Arc<dyn KeyProvider>> {
    let provider: Arc<dyn KeyProvider> = LiveKeyProvider::connect(client, key_id).await?;
    Ok(provider)
}

/// Live provider for `key_id` that re-fetches on the configured refresh interval
pub async fn refreshing_provider(
    config: &KnoxConfig,
    key_id: impl Into<KeyId>,
) -> KnoxResult<Arc<dyn KeyProvider>> {
    let client = KnoxClient::from_config(config)?;
    let provider = LiveKeyProvider::connect(client, key_id).await?;
    // detached; the task ends with the last provider handle
    provider.spawn_refresh(config.refresh_interval())?;
    Ok(provider)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct KeySnapshot {
    primary: String,
    active: Vec<String>,
    version_hash: String,
}

impl KeySnapshot {
    fn from_key(key: &Key) -> KnoxResult<Self> {
        key.validate()?;
        let primary = key
            .version_list
            .primary()
            .ok_or_else(|| KnoxError::InvalidKey(format!("{}: no primary version", key.id)))?;

        Ok(Self {
            primary: material(&key.id, primary)?,
            active: key
                .version_list
                .active()
                .into_iter()
                .map(|v| material(&key.id, v))
                .collect::<KnoxResult<Vec<_>>>()?,
            version_hash: key.version_list.hash(),
        })
    }
}

fn material(key_id: &str, version: &KeyVersion) -> KnoxResult<String> {
    String::from_utf8(version.data.clone()).map_err(|e| {
        KnoxError::InvalidKey(format!(
            "{}: version {} is not valid UTF-8 ({})",
            key_id,
            version.id,
            e.utf8_error()
        ))
    })
}

/// Keeps the last good snapshot of a key and swaps it atomically on refresh
pub struct LiveKeyProvider {
    client: KnoxClient,
    key_id: KeyId,
    snapshot: ArcSwap<KeySnapshot>,
}

impl LiveKeyProvider {
    /// Fetch and validate the key once
    pub async fn connect(client: KnoxClient, key_id: impl Into<KeyId>) -> KnoxResult<Arc<Self>> {
        let key_id = key_id.into();
        let key = client.get_key(&key_id).await?;
        let snapshot = KeySnapshot::from_key(&key)?;

        info!(
            key_id = %key_id,
            active_versions = snapshot.active.len(),
            "Live key provider connected"
        );

        Ok(Arc::new(Self {
            client,
            key_id,
            snapshot: ArcSwap::from_pointee(snapshot),
        }))
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Fingerprint of the material currently served
    pub fn version_hash(&self) -> String {
        self.snapshot.load().version_hash.clone()
    }

    /// Re-fetch the key; returns whether the material changed.
    ///
    /// On error the previous snapshot stays in place.
    pub async fn refresh(&self) -> KnoxResult<bool> {
        let key = self.client.get_key(&self.key_id).await?;
        let snapshot = KeySnapshot::from_key(&key)?;

        if **self.snapshot.load() == snapshot {
            return Ok(false);
        }

        debug!(key_id = %self.key_id, hash = %snapshot.version_hash, "Key material changed");
        self.snapshot.store(Arc::new(snapshot));
        Ok(true)
    }

    /// Refresh every `period` until the last handle to the provider is dropped
    pub fn spawn_refresh(self: &Arc<Self>, period: Duration) -> KnoxResult<JoinHandle<()>> {
        if period.is_zero() {
            return Err(KnoxError::Validation(
                "refresh period must be greater than zero".to_string(),
            ));
        }
        let handle: Weak<Self> = Arc::downgrade(self);

        Ok(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately; connect() already fetched
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(provider) = handle.upgrade() else {
                    break;
                };
                if let Err(e) = provider.refresh().await {
                    warn!(
                        key_id = %provider.key_id,
                        error = %e,
                        "Key refresh failed, keeping previous material"
                    );
                }
            }
        }))
    }
}

impl KeyProvider for LiveKeyProvider {
    fn get_primary(&self) -> String {
        self.snapshot.load().primary.clone()
    }

    fn get_active(&self) -> Vec<String> {
        self.snapshot.load().active.clone()
    }
}
