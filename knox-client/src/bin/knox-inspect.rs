//! Print the shape of a Knox key without revealing its material
//!
//! Usage:
//!   knox-inspect <key-id> [<key-id> ...]
//!
//! Server location and credentials come from `KNOX_*` environment variables
//! (see `knox-config`).

use anyhow::{bail, Context};
use knox_client::{KnoxClient, KnoxError};
use knox_config::KnoxConfig;
use std::env;
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = KnoxConfig::from_env().context("loading Knox configuration")?;
    knox_logging::init_console_logging("knox-inspect", config.log_level());

    let key_ids: Vec<String> = env::args().skip(1).collect();
    if key_ids.is_empty() {
        bail!("usage: knox-inspect <key-id> [<key-id> ...]");
    }

    let client = KnoxClient::from_config(&config)?;
    let mut failures = 0;

    for key_id in &key_ids {
        match client.get_key(key_id).await {
            Ok(key) => {
                println!("key      {}", key.id);
                println!("hash     {}", key.version_hash);
                if key.version_hash != key.version_list.hash() {
                    println!("         (differs from local fingerprint {})", key.version_list.hash());
                }
                for access in &key.acl {
                    println!(
                        "acl      {:<14} {:<6} {}",
                        access.principal_type, access.access_type, access.id
                    );
                }
                for version in &key.version_list {
                    println!(
                        "version  {:<20} {:<8} {}",
                        version.id,
                        version.status,
                        version.created_at().to_rfc3339()
                    );
                }
                if let Err(e) = key.validate() {
                    warn!(key_id = %key_id, error = %e, "Key failed validation");
                }
                println!();
            }
            Err(e @ KnoxError::Server { .. }) if e.is_not_found() => {
                warn!(key_id = %key_id, "Key not found");
                failures += 1;
            }
            Err(e) => {
                warn!(key_id = %key_id, error = %e, "Failed to fetch key");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} keys could not be inspected", failures, key_ids.len());
    }
    Ok(())
}
