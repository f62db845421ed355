//! STS calls through `aws-sdk-sts`, authenticating with keys taken from the profile store.

use aws_config::{Region, meta::region::RegionProviderChain};
use aws_sdk_sts::{
    Client,
    config::Credentials,
    error::{DisplayErrorContext, SdkError},
};
use chrono::{DateTime, Utc};
use log::debug;

use super::{CallerIdentity, CredentialSource, ExchangeError, SessionTokenRequest, StsClient};
use crate::credentials::SessionGrant;

/// STS answers on a global endpoint, but the SDK still wants a region to sign for.
const FALLBACK_REGION: &str = "us-east-1";

/// [`StsClient`] that calls STS in-process.
///
/// Unlike [`super::cli::AwsCli`] it never reads the credentials file; it signs with the keys
/// carried in the [`CredentialSource`], and the region comes from the usual environment
/// and profile chain with `us-east-1` as the fallback.
#[derive(Default)]
pub struct SdkClient;

impl SdkClient {
    pub fn new() -> Self {
        Self
    }

    async fn client(&self, source: &CredentialSource) -> Result<Client, ExchangeError> {
        let keys = source.keys.as_ref().ok_or_else(|| {
            ExchangeError::Invocation(format!(
                "profile '{}' holds no access keys to sign the STS call with",
                source.profile
            ))
        })?;
        let credentials = Credentials::new(
            keys.access_key_id.clone(),
            keys.secret_access_key.clone(),
            source.session_token.clone(),
            None,
            "aws-mfa-login",
        );
        let config = aws_config::from_env()
            .region(RegionProviderChain::default_provider().or_else(Region::new(FALLBACK_REGION)))
            .credentials_provider(credentials)
            .load()
            .await;
        Ok(Client::new(&config))
    }
}

fn to_utc(time: &aws_sdk_sts::primitives::DateTime) -> Result<DateTime<Utc>, ExchangeError> {
    DateTime::<Utc>::from_timestamp(time.secs(), time.subsec_nanos())
        .ok_or_else(|| ExchangeError::ResponseParse("Expiration out of range".to_string()))
}

fn classify<E, R>(err: SdkError<E, R>) -> ExchangeError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::ServiceError(_) => ExchangeError::Rejected(message),
        SdkError::ResponseError(_) => ExchangeError::ResponseParse(message),
        _ => ExchangeError::Invocation(message),
    }
}

impl StsClient for SdkClient {
    async fn get_session_token(
        &self,
        request: &SessionTokenRequest,
    ) -> Result<SessionGrant, ExchangeError> {
        debug!("Calling STS GetSessionToken for profile {}", request.source.profile);
        let output = self
            .client(&request.source)
            .await?
            .get_session_token()
            .duration_seconds(request.duration_seconds as i32)
            .serial_number(&request.serial_number)
            .token_code(&request.mfa_code)
            .send()
            .await
            .map_err(classify)?;

        let credentials = output.credentials().ok_or_else(|| {
            ExchangeError::ResponseParse("No credentials returned".to_string())
        })?;
        let expiration = to_utc(credentials.expiration())?;

        Ok(SessionGrant {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            expiration,
        })
    }

    async fn get_caller_identity(
        &self,
        source: &CredentialSource,
    ) -> Result<CallerIdentity, ExchangeError> {
        debug!("Calling STS GetCallerIdentity for profile {}", source.profile);
        let output = self
            .client(source)
            .await?
            .get_caller_identity()
            .send()
            .await
            .map_err(classify)?;

        let field = |value: Option<&str>, name: &str| {
            value
                .map(str::to_string)
                .ok_or_else(|| ExchangeError::ResponseParse(format!("No {name} returned")))
        };
        Ok(CallerIdentity {
            account: field(output.account(), "Account")?,
            arn: field(output.arn(), "Arn")?,
            user_id: output.user_id().map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    type TestError = SdkError<io::Error, ()>;

    #[test]
    fn test_service_error_is_rejection() {
        let err = TestError::service_error(
            io::Error::other("AccessDenied: MultiFactorAuthentication failed"),
            (),
        );
        match classify(err) {
            ExchangeError::Rejected(msg) => assert!(msg.contains("MultiFactorAuthentication")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_response_error_is_parse_error() {
        let err = TestError::response_error(io::Error::other("unexpected XML"), ());
        assert!(matches!(classify(err), ExchangeError::ResponseParse(_)));
    }

    #[test]
    fn test_transport_failures_are_invocation_errors() {
        let err = TestError::construction_failure(io::Error::other("missing region"));
        assert!(matches!(classify(err), ExchangeError::Invocation(_)));

        let err = TestError::timeout_error(io::Error::other("timed out"));
        assert!(matches!(classify(err), ExchangeError::Invocation(_)));
    }

    #[test]
    fn test_expiration_conversion() {
        let time = aws_sdk_sts::primitives::DateTime::from_secs(1_700_000_000);
        assert_eq!(
            to_utc(&time).unwrap(),
            DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_keys_fail_before_any_call() {
        let source = CredentialSource {
            profile: "work".into(),
            config_file: PathBuf::from("config"),
            credentials_file: PathBuf::from("credentials"),
            keys: None,
            session_token: None,
        };
        let err = SdkClient::new().get_caller_identity(&source).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Invocation(msg) if msg.contains("no access keys")));
    }
}
