//! Wire format: form field encoding and the response envelope
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


use crate::error::{KnoxError, KnoxResult};
use base64::engine::general_purpose::STANDARD as Base64Engine;
use base64::Engine;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Result type of operations whose success payload carries nothing
pub type Empty = IgnoredAny;

/// Outcome code carried by every response envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Ok,
    InternalServerError,
    KeyIdentifierExists,
    KeyVersionDoesNotExist,
    KeyIdentifierDoesNotExist,
    Unauthenticated,
    Unauthorized,
    NotYetImplemented,
    NotFound,
    NoKeyId,
    NoKeyData,
    BadRequestData,
    BadKeyFormat,
    BadPrincipalIdentifier,
    Unrecognized(i64),
}

impl ResponseCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ResponseCode::Ok,
            1 => ResponseCode::InternalServerError,
            2 => ResponseCode::KeyIdentifierExists,
            3 => ResponseCode::KeyVersionDoesNotExist,
            4 => ResponseCode::KeyIdentifierDoesNotExist,
            5 => ResponseCode::Unauthenticated,
            6 => ResponseCode::Unauthorized,
            7 => ResponseCode::NotYetImplemented,
            8 => ResponseCode::NotFound,
            9 => ResponseCode::NoKeyId,
            10 => ResponseCode::NoKeyData,
            11 => ResponseCode::BadRequestData,
            12 => ResponseCode::BadKeyFormat,
            13 => ResponseCode::BadPrincipalIdentifier,
            other => ResponseCode::Unrecognized(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            ResponseCode::Ok => 0,
            ResponseCode::InternalServerError => 1,
            ResponseCode::KeyIdentifierExists => 2,
            ResponseCode::KeyVersionDoesNotExist => 3,
            ResponseCode::KeyIdentifierDoesNotExist => 4,
            ResponseCode::Unauthenticated => 5,
            ResponseCode::Unauthorized => 6,
            ResponseCode::NotYetImplemented => 7,
            ResponseCode::NotFound => 8,
            ResponseCode::NoKeyId => 9,
            ResponseCode::NoKeyData => 10,
            ResponseCode::BadRequestData => 11,
            ResponseCode::BadKeyFormat => 12,
            ResponseCode::BadPrincipalIdentifier => 13,
            ResponseCode::Unrecognized(other) => *other,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == ResponseCode::Ok
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::Unrecognized(code) => write!(f, "code {}", code),
            known => write!(f, "{:?}", known),
        }
    }
}

impl Serialize for ResponseCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for ResponseCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(ResponseCode::from_code)
    }
}

/// Uniform response wrapper; `data` is left raw until the caller knows its shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T = serde_json::Value> {
    #[serde(default)]
    pub status: String,
    pub code: ResponseCode,
    #[serde(default)]
    pub host: String,
    /// Server clock at response time
    #[serde(rename = "ts", alias = "timestamp", default)]
    pub timestamp: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: T,
}

impl Envelope {
    /// Map the envelope to the operation result or a server error
    pub fn into_result<T: DeserializeOwned>(self) -> KnoxResult<T> {
        if !self.code.is_success() {
            return Err(KnoxError::Server {
                code: self.code,
                message: self.message,
            });
        }
        serde_json::from_value(self.data).map_err(KnoxError::Decode)
    }
}

impl<T> Envelope<T> {
    /// Success envelope around `data`, as a server would produce it
    pub fn ok(host: impl Into<String>, timestamp: i64, data: T) -> Self {
        Self {
            status: "ok".to_string(),
            code: ResponseCode::Ok,
            host: host.into(),
            timestamp,
            message: String::new(),
            data,
        }
    }
}

/// Decode a raw response body into the expected result type
pub fn decode_response<T: DeserializeOwned>(body: &[u8]) -> KnoxResult<T> {
    let envelope: Envelope = serde_json::from_slice(body).map_err(KnoxError::Decode)?;
    envelope.into_result()
}

/// Secret bytes travel as standard base64
pub fn encode_data(data: &[u8]) -> String {
    Base64Engine.encode(data)
}

/// Structured form values travel as their JSON text
pub fn encode_field<T: Serialize + ?Sized>(value: &T) -> KnoxResult<String> {
    serde_json::to_string(value).map_err(KnoxError::Encode)
}

/// Serde adapter for byte fields carried as base64 strings (`null` reads as empty)
pub mod base64_bytes {
    use super::Base64Engine;
    use base64::Engine;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64Engine.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => Base64Engine.decode(encoded.as_bytes()).map_err(de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
