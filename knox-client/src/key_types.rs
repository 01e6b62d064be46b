//! Key, version and access-control types
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
use chrono::{DateTime, TimeZone, Utc};
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a key
pub type KeyId = String;

/// Closed enumeration with integer codes and JSON string names.
///
/// Raw codes outside the known set map to `Unrecognized` so that values read
/// from untrusted sources stay representable, but such values are never valid
/// and refuse to serialize.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A raw code outside the known set
            Unrecognized(i64),
        }

        impl $name {
            /// Every member of the closed set, in code order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn from_code(code: i64) -> Self {
                match code {
                    $( $code => $name::$variant, )+
                    other => $name::Unrecognized(other),
                }
            }

            pub fn code(&self) -> i64 {
                match self {
                    $( $name::$variant => $code, )+
                    $name::Unrecognized(other) => *other,
                }
            }

            /// Wire name, `None` for unrecognized codes
            pub fn name(&self) -> Option<&'static str> {
                match self {
                    $( $name::$variant => Some(stringify!($variant)), )+
                    $name::Unrecognized(_) => None,
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                $(
                    if name == stringify!($variant) {
                        return Some($name::$variant);
                    }
                )+
                None
            }

            pub fn is_valid(&self) -> bool {
                !matches!(self, $name::Unrecognized(_))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.name() {
                    Some(name) => f.pad(name),
                    None => write!(f, "Unrecognized({})", self.code()),
                }
            }
        }

        impl From<i64> for $name {
            fn from(code: i64) -> Self {
                $name::from_code(code)
            }
        }

        impl FromStr for $name {
            type Err = KnoxError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::from_name(s).ok_or_else(|| {
                    KnoxError::Validation(format!("unknown {} '{}'", $what, s))
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match self.name() {
                    Some(name) => serializer.serialize_str(name),
                    None => Err(ser::Error::custom(format!(
                        "invalid {} code {}",
                        $what,
                        self.code()
                    ))),
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let name = String::deserialize(deserializer)?;
                $name::from_name(&name).ok_or_else(|| {
                    de::Error::custom(format!("unknown {} '{}'", $what, name))
                })
            }
        }
    };
}

closed_enum! {
    /// Kind of principal an access grant applies to
    PrincipalType, "principal type" {
        User = 0,
        UserGroup = 1,
        Machine = 2,
        /// Every machine whose hostname starts with the id
        MachinePrefix = 3,
        Service = 4,
        /// Every service whose identifier starts with the id
        ServicePrefix = 5,
    }
}

closed_enum! {
    /// Permission level of an access grant
    AccessType, "access type" {
        /// Revokes a previous grant
        None = 0,
        Read = 1,
        Write = 2,
        Admin = 3,
    }
}

closed_enum! {
    /// Lifecycle status of a key version
    VersionStatus, "version status" {
        Primary = 0,
        Active = 1,
        Inactive = 2,
    }
}

impl AccessType {
    /// Whether a grant at this level satisfies `required`
    pub fn can_access(&self, required: AccessType) -> bool {
        self.is_valid() && required.is_valid() && self.code() >= required.code()
    }
}

/// A single grant of `access_type` to the principal `id`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Access {
    #[serde(rename = "type")]
    pub principal_type: PrincipalType,
    pub id: String,
    #[serde(rename = "access")]
    pub access_type: AccessType,
}

impl Access {
    pub fn new(principal_type: PrincipalType, id: impl Into<String>, access_type: AccessType) -> Self {
        Self {
            principal_type,
            id: id.into(),
            access_type,
        }
    }

    /// Both enumerations must hold a member of their closed set
    pub fn is_valid(&self) -> bool {
        self.principal_type.is_valid() && self.access_type.is_valid()
    }

    pub(crate) fn validate(&self) -> KnoxResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(KnoxError::Validation(format!(
                "invalid access for '{}': type {}, access {}",
                self.id, self.principal_type, self.access_type
            )))
        }
    }

    fn same_principal(&self, other: &Access) -> bool {
        self.principal_type == other.principal_type && self.id == other.id
    }
}

/// Ordered list of access grants
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Acl(Vec<Access>);

impl Acl {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// An empty ACL is valid
    pub fn is_valid(&self) -> bool {
        self.0.iter().all(Access::is_valid)
    }

    pub(crate) fn validate(&self) -> KnoxResult<()> {
        self.0.iter().try_for_each(Access::validate)
    }

    /// Copy of this ACL with `access` applied.
    ///
    /// An entry for the same principal is replaced in place, a new principal
    /// is appended and a grant of `AccessType::None` drops the principal.
    pub fn with_access(&self, access: Access) -> Acl {
        let mut entries = self.0.clone();
        match entries.iter().position(|a| a.same_principal(&access)) {
            Some(index) if access.access_type == AccessType::None => {
                entries.remove(index);
            }
            Some(index) => entries[index] = access,
            None if access.access_type == AccessType::None => {}
            None => entries.push(access),
        }
        Acl(entries)
    }

    pub fn entries(&self) -> &[Access] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Access> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Access>> for Acl {
    fn from(entries: Vec<Access>) -> Self {
        Acl(entries)
    }
}

impl FromIterator<Access> for Acl {
    fn from_iter<I: IntoIterator<Item = Access>>(iter: I) -> Self {
        Acl(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Acl {
    type Item = &'a Access;
    type IntoIter = std::slice::Iter<'a, Access>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One generation of secret material under a key
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyVersion {
    pub id: u64,
    #[serde(with = "crate::codec::base64_bytes")]
    pub data: Vec<u8>,
    pub status: VersionStatus,
    /// Creation time in nanoseconds since the epoch
    #[serde(rename = "ts", default)]
    pub creation_time: i64,
}

impl KeyVersion {
    pub fn new(id: u64, data: impl Into<Vec<u8>>, status: VersionStatus) -> Self {
        Self {
            id,
            data: data.into(),
            status,
            creation_time: 0,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.creation_time)
    }
}

impl fmt::Debug for KeyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVersion")
            .field("id", &self.id)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .field("status", &self.status)
            .field("creation_time", &self.creation_time)
            .finish()
    }
}

/// Versions of a key in server order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyVersionList(Vec<KeyVersion>);

impl KeyVersionList {
    pub fn new(versions: Vec<KeyVersion>) -> Self {
        Self(versions)
    }

    pub fn primary(&self) -> Option<&KeyVersion> {
        self.0.iter().find(|v| v.status == VersionStatus::Primary)
    }

    /// Every usable version, the primary included
    pub fn active(&self) -> Vec<&KeyVersion> {
        self.0
            .iter()
            .filter(|v| matches!(v.status, VersionStatus::Primary | VersionStatus::Active))
            .collect()
    }

    pub fn find(&self, version_id: u64) -> Option<&KeyVersion> {
        self.0.iter().find(|v| v.id == version_id)
    }

    /// Fingerprint of the usable versions and their statuses.
    ///
    /// Lowercase hex SHA-256 over each non-inactive version, sorted by id,
    /// as its little-endian id followed by its status code byte.
    pub fn hash(&self) -> String {
        let mut usable: Vec<&KeyVersion> = self
            .0
            .iter()
            .filter(|v| v.status != VersionStatus::Inactive)
            .collect();
        usable.sort_by_key(|v| v.id);

        let mut hasher = Sha256::new();
        for version in usable {
            hasher.update(version.id.to_le_bytes());
            hasher.update([version.status.code() as u8]);
        }
        hex::encode(hasher.finalize())
    }

    /// Preview the list the server would hold after a status change.
    ///
    /// Promoting an active version demotes the current primary to active.
    /// A primary cannot be demoted directly and an inactive version must be
    /// activated before it can be promoted.
    pub fn with_status(&self, version_id: u64, status: VersionStatus) -> KnoxResult<KeyVersionList> {
        if !status.is_valid() {
            return Err(KnoxError::Validation(format!(
                "invalid version status {}",
                status
            )));
        }
        let current = self
            .find(version_id)
            .ok_or_else(|| KnoxError::Lifecycle(format!("version {} does not exist", version_id)))?
            .status;

        if current == status {
            return Ok(self.clone());
        }

        match (current, status) {
            (VersionStatus::Active, VersionStatus::Primary) => Ok(KeyVersionList(
                self.0
                    .iter()
                    .cloned()
                    .map(|mut v| {
                        if v.id == version_id {
                            v.status = VersionStatus::Primary;
                        } else if v.status == VersionStatus::Primary {
                            v.status = VersionStatus::Active;
                        }
                        v
                    })
                    .collect(),
            )),
            (VersionStatus::Active, VersionStatus::Inactive)
            | (VersionStatus::Inactive, VersionStatus::Active) => Ok(KeyVersionList(
                self.0
                    .iter()
                    .cloned()
                    .map(|mut v| {
                        if v.id == version_id {
                            v.status = status;
                        }
                        v
                    })
                    .collect(),
            )),
            (VersionStatus::Primary, _) => Err(KnoxError::Lifecycle(format!(
                "primary version {} cannot become {}; promote another version instead",
                version_id, status
            ))),
            (VersionStatus::Inactive, VersionStatus::Primary) => Err(KnoxError::Lifecycle(format!(
                "inactive version {} must be activated before promotion",
                version_id
            ))),
            (from, to) => Err(KnoxError::Lifecycle(format!(
                "version {} cannot move from {} to {}",
                version_id, from, to
            ))),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyVersion> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<KeyVersion>> for KeyVersionList {
    fn from(versions: Vec<KeyVersion>) -> Self {
        KeyVersionList(versions)
    }
}

impl<'a> IntoIterator for &'a KeyVersionList {
    type Item = &'a KeyVersion;
    type IntoIter = std::slice::Iter<'a, KeyVersion>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Snapshot of a named secret as returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub id: KeyId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub acl: Acl,
    #[serde(rename = "versions", default, deserialize_with = "null_as_default")]
    pub version_list: KeyVersionList,
    #[serde(rename = "hash", default)]
    pub version_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Key {
    /// Structural checks a usable key must pass
    pub fn validate(&self) -> KnoxResult<()> {
        validate_key_id(&self.id).map_err(|e| KnoxError::InvalidKey(e.to_string()))?;
        self.acl
            .validate()
            .map_err(|e| KnoxError::InvalidKey(format!("{}: {}", self.id, e)))?;

        let mut seen = HashSet::new();
        for version in &self.version_list {
            if !seen.insert(version.id) {
                return Err(KnoxError::InvalidKey(format!(
                    "{}: duplicate version id {}",
                    self.id, version.id
                )));
            }
        }

        let primaries = self
            .version_list
            .iter()
            .filter(|v| v.status == VersionStatus::Primary)
            .count();
        if primaries != 1 {
            return Err(KnoxError::InvalidKey(format!(
                "{}: expected exactly one primary version, found {}",
                self.id, primaries
            )));
        }
        Ok(())
    }
}

/// Key identifiers travel as a single path segment
pub fn validate_key_id(id: &str) -> KnoxResult<()> {
    if id.is_empty() {
        return Err(KnoxError::Validation("key id must not be empty".to_string()));
    }
    if id == "." || id == ".." {
        return Err(KnoxError::Validation(format!(
            "key id '{}' is a relative path segment",
            id
        )));
    }
    if let Some(c) = id
        .chars()
        .find(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace() || c.is_control())
    {
        return Err(KnoxError::Validation(format!(
            "key id '{}' contains forbidden character {:?}",
            id.escape_debug(),
            c
        )));
    }
    Ok(())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
