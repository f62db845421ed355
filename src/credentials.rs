//! Typed credential values read from and written to the profile stores.

use std::fmt;

use chrono::{DateTime, Utc};

pub const ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
pub const SESSION_TOKEN: &str = "aws_session_token";
/// Informational only; AWS tooling ignores it.
pub const EXPIRATION: &str = "expiration";
pub const MFA_SERIAL: &str = "mfa_serial";
/// Older key name for the device serial, accepted when reading the credentials store.
pub const LEGACY_MFA_DEVICE: &str = "aws_mfa_device";

/// Suffix naming the permanent twin of a working profile (`work` -> `work_permanent`).
pub const PERMANENT_SUFFIX: &str = "_permanent";

pub fn permanent_profile_name(profile: &str) -> String {
    format!("{profile}{PERMANENT_SUFFIX}")
}

/// An access key id / secret pair.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessKeys {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl AccessKeys {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for AccessKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessKeys")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// A named credential bundle.
///
/// Permanent profiles carry no session token; temporary ones carry all three fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialProfile {
    pub name: String,
    pub keys: AccessKeys,
    pub session_token: Option<String>,
}

impl CredentialProfile {
    pub fn is_temporary(&self) -> bool {
        self.session_token.is_some()
    }
}

/// Result of a successful STS exchange. Lives only between the exchange and the write-back.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime<Utc>,
}

impl SessionGrant {
    /// ISO 8601 form written next to the keys.
    pub fn expiration_string(&self) -> String {
        self.expiration.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }
}

impl fmt::Debug for SessionGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGrant")
            .field("access_key_id", &self.access_key_id)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

/// Renders a session length as "4 hours, 0 minutes, and 0 seconds".
pub fn describe_duration(seconds: u32) -> String {
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{hours} hours, {minutes} minutes, and {seconds} seconds")
}
