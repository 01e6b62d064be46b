//! Error types for the Knox client
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


use crate::codec::ResponseCode;
use thiserror::Error;

/// Failures of the underlying HTTP exchange
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    Connection(String),
}

impl TransportError {
    /// Classify a failed send; refused or unreachable hosts become `Connection`
    pub fn from_send(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Http(err)
        }
    }
}

/// Knox client errors
#[derive(Error, Debug)]
pub enum KnoxError {
    /// Input rejected locally; nothing was sent
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-success envelope
    #[error("Server error ({code}): {message}")]
    Server { code: ResponseCode, message: String },

    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Version transition refused: {0}")]
    Lifecycle(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl KnoxError {
    /// True when the request was never sent because the input was invalid
    pub fn is_validation(&self) -> bool {
        matches!(self, KnoxError::Validation(_))
    }

    /// Envelope code of a server rejection
    pub fn server_code(&self) -> Option<ResponseCode> {
        match self {
            KnoxError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.server_code(),
            Some(
                ResponseCode::NotFound
                    | ResponseCode::KeyIdentifierDoesNotExist
                    | ResponseCode::KeyVersionDoesNotExist
            )
        )
    }
}

/// Result type for Knox client operations
pub type KnoxResult<T> = Result<T, KnoxError>;
