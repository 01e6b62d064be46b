//! Knox client library
//!
//! Typed access to a Knox key-management server: the key/version/ACL model,
//! the form/JSON wire codec, a protocol client over a pluggable transport, and
//! the primary/active key provider consumed by code that needs key material.
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


pub mod error;
pub mod key_types;
pub mod codec;
pub mod transport;
pub mod client;
pub mod provider;

pub use client::KnoxClient;
pub use codec::ResponseCode;
pub use error::{KnoxError, KnoxResult, TransportError};
pub use key_types::{
    AccessType, Access, Acl, Key, KeyId, KeyVersion, KeyVersionList, PrincipalType, VersionStatus,
};
pub use provider::{
    live_provider, refreshing_provider, static_provider, KeyProvider, LiveKeyProvider,
    StaticKeyProvider,
};
pub use transport::{HttpRequest, ReqwestTransport, Transport};
