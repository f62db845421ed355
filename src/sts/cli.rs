//! STS calls through the `aws` command-line client.
//!
//! The client is executed directly (no shell) with stdin closed. stdout and stderr are
//! captured separately and the call blocks until the process exits; no timeout is
//! applied on top of the client's own.

use std::path::PathBuf;
use std::process::{Output, Stdio};

use log::debug;
use tokio::process::Command;

use super::{
    CallerIdentity, CredentialSource, ExchangeError, SessionTokenRequest, StsClient,
    parse_caller_identity, parse_session_token,
};
use crate::credentials::SessionGrant;

/// [`StsClient`] that runs the AWS command-line client once per call.
///
/// The client is pointed at the run's config and credentials files through
/// `AWS_CONFIG_FILE` and `AWS_SHARED_CREDENTIALS_FILE`, so it authenticates with whatever
/// the profile holds on disk at that moment.
pub struct AwsCli {
    program: PathBuf,
}

impl AwsCli {
    /// Creates a client that invokes `program`.
    ///
    /// # Arguments
    ///
    /// * `program` - Name or path of the `aws` executable; a bare name is looked up on `PATH`
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, source: &CredentialSource, args: &[&str]) -> Result<String, ExchangeError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("sts")
            .args(args)
            .args(["--profile", source.profile.as_str(), "--output", "json"])
            .env("AWS_CONFIG_FILE", &source.config_file)
            .env("AWS_SHARED_CREDENTIALS_FILE", &source.credentials_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(
            "Running {} sts {} --profile {}",
            self.program.display(),
            args.first().unwrap_or(&""),
            source.profile
        );

        let output = cmd.output().await.map_err(|e| {
            ExchangeError::Invocation(format!("failed to run {}: {e}", self.program.display()))
        })?;
        interpret(output)
    }
}

/// Anything on stderr is a failure, even a lone newline and even when stdout also carries
/// a payload.
fn interpret(output: Output) -> Result<String, ExchangeError> {
    if !output.stderr.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = match stderr.trim() {
            "" => format!("STS client wrote {} blank byte(s) to stderr", output.stderr.len()),
            text => text.to_string(),
        };
        return Err(ExchangeError::Rejected(message));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        return Err(if output.status.success() {
            ExchangeError::ResponseParse("STS client produced no output".to_string())
        } else {
            ExchangeError::Invocation(format!("STS client {}", output.status))
        });
    }
    Ok(stdout)
}

impl StsClient for AwsCli {
    async fn get_session_token(
        &self,
        request: &SessionTokenRequest,
    ) -> Result<SessionGrant, ExchangeError> {
        let duration = request.duration_seconds.to_string();
        let stdout = self
            .run(
                &request.source,
                &[
                    "get-session-token",
                    "--token-code",
                    request.mfa_code.as_str(),
                    "--serial-number",
                    request.serial_number.as_str(),
                    "--duration-seconds",
                    duration.as_str(),
                ],
            )
            .await?;
        parse_session_token(&stdout, request.duration_seconds)
    }

    async fn get_caller_identity(
        &self,
        source: &CredentialSource,
    ) -> Result<CallerIdentity, ExchangeError> {
        let stdout = self.run(source, &["get-caller-identity"]).await?;
        parse_caller_identity(&stdout)
    }
}
