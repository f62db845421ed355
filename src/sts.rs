//! STS exchange adapter.
//!
//! [`StsClient`] is the seam between the login flow and whatever actually talks to STS:
//! the `aws` command-line client ([`cli::AwsCli`]) or the Rust SDK ([`sdk::SdkClient`]).

pub mod cli;
pub mod sdk;

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::credentials::{AccessKeys, SessionGrant};

/// Why an exchange did not produce a grant.
///
/// These are kept apart so a user can tell a rejected MFA code from a missing `aws`
/// binary from an output format the parser does not understand.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// The client could not be started, crashed, or failed before answering.
    #[error("{0}")]
    Invocation(String),

    /// The client answered on stdout with something that is not a valid response.
    #[error("{0}")]
    ResponseParse(String),

    /// The client (or STS behind it) reported an error.
    #[error("{0}")]
    Rejected(String),
}

/// Where the exchange takes its source credentials from.
///
/// The CLI backend reads `profile` out of `credentials_file`; the SDK backend uses `keys`
/// directly and fails when the section holds none. Both describe the same section.
#[derive(Clone, Debug)]
pub struct CredentialSource {
    pub profile: String,
    pub config_file: PathBuf,
    pub credentials_file: PathBuf,
    pub keys: Option<AccessKeys>,
    pub session_token: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SessionTokenRequest {
    pub source: CredentialSource,
    pub mfa_code: String,
    pub serial_number: String,
    pub duration_seconds: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[allow(async_fn_in_trait)]
pub trait StsClient {
    /// `sts get-session-token`: exchange permanent keys plus an MFA code for a session.
    async fn get_session_token(
        &self,
        request: &SessionTokenRequest,
    ) -> Result<SessionGrant, ExchangeError>;

    /// `sts get-caller-identity`: succeeds only if `source` holds working credentials.
    async fn get_caller_identity(
        &self,
        source: &CredentialSource,
    ) -> Result<CallerIdentity, ExchangeError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SessionTokenResponse {
    credentials: ResponseCredentials,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResponseCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    #[serde(default)]
    expiration: Option<String>,
}

/// Parses a `get-session-token` JSON document into a grant.
///
/// A missing or unparseable `Expiration` falls back to `now + duration_seconds`.
pub fn parse_session_token(body: &str, duration_seconds: u32) -> Result<SessionGrant, ExchangeError> {
    let response: SessionTokenResponse = serde_json::from_str(body)
        .map_err(|e| ExchangeError::ResponseParse(format!("invalid get-session-token output: {e}")))?;
    let ResponseCredentials {
        access_key_id,
        secret_access_key,
        session_token,
        expiration,
    } = response.credentials;

    if [&access_key_id, &secret_access_key, &session_token]
        .iter()
        .any(|value| value.trim().is_empty())
    {
        return Err(ExchangeError::ResponseParse(
            "get-session-token returned an empty credential field".to_string(),
        ));
    }

    let expiration = expiration
        .and_then(|value| DateTime::parse_from_rfc3339(&value).ok())
        .map(|value| value.with_timezone(&Utc))
        .unwrap_or_else(|| Utc::now() + Duration::seconds(i64::from(duration_seconds)));

    Ok(SessionGrant {
        access_key_id,
        secret_access_key,
        session_token,
        expiration,
    })
}

/// Parses a `get-caller-identity` JSON document.
pub fn parse_caller_identity(body: &str) -> Result<CallerIdentity, ExchangeError> {
    serde_json::from_str(body)
        .map_err(|e| ExchangeError::ResponseParse(format!("invalid get-caller-identity output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_token() {
        let body = r#"{
            "Credentials": {
                "AccessKeyId": "ASIAEXAMPLE",
                "SecretAccessKey": "secret",
                "SessionToken": "tok",
                "Expiration": "2025-03-01T12:00:00+00:00"
            }
        }"#;
        let grant = parse_session_token(body, 900).unwrap();
        assert_eq!(grant.access_key_id, "ASIAEXAMPLE");
        assert_eq!(grant.secret_access_key, "secret");
        assert_eq!(grant.session_token, "tok");
        assert_eq!(grant.expiration_string(), "2025-03-01T12:00:00Z");
    }

    #[test]
    fn test_parse_session_token_without_expiration() {
        let body = r#"{"Credentials":{"AccessKeyId":"AKIA...","SecretAccessKey":"secret","SessionToken":"tok"}}"#;
        let before = Utc::now();
        let grant = parse_session_token(body, 14400).unwrap();
        assert!(grant.expiration >= before + Duration::seconds(14400));
        assert!(grant.expiration <= Utc::now() + Duration::seconds(14400));
    }

    #[test]
    fn test_parse_session_token_rejects_garbage() {
        let err = parse_session_token("<html>not json</html>", 900).unwrap_err();
        assert!(matches!(err, ExchangeError::ResponseParse(_)));
    }

    #[test]
    fn test_parse_session_token_requires_credentials_triple() {
        let body = r#"{"Credentials":{"AccessKeyId":"ASIA","SecretAccessKey":"s"}}"#;
        assert!(matches!(
            parse_session_token(body, 900),
            Err(ExchangeError::ResponseParse(_))
        ));

        let body = r#"{"Credentials":{"AccessKeyId":"ASIA","SecretAccessKey":"s","SessionToken":" "}}"#;
        assert!(matches!(
            parse_session_token(body, 900),
            Err(ExchangeError::ResponseParse(_))
        ));
    }

    #[test]
    fn test_parse_caller_identity() {
        let body = r#"{"UserId":"AIDA","Account":"123456789012","Arn":"arn:aws:iam::123456789012:user/alice"}"#;
        let identity = parse_caller_identity(body).unwrap();
        assert_eq!(identity.account, "123456789012");
        assert_eq!(identity.arn, "arn:aws:iam::123456789012:user/alice");
        assert_eq!(identity.user_id.as_deref(), Some("AIDA"));
    }
}
