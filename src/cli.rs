//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::{AwsPaths, Backend, MfaSerialSource, Settings, Strictness, Variant};

/// AWS CLI MFA login.
///
/// Prompts for a profile and an MFA code, exchanges the profile's permanent keys for
/// temporary STS credentials, and writes them where the AWS CLI reads them. Every flag is
/// optional; without any the tool refreshes `[PROFILE]` in `~/.aws/credentials` from
/// `[PROFILE_permanent]`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Login flow to run
    #[arg(long, value_enum, env = "AWS_MFA_VARIANT", default_value = "refresh-in-place")]
    pub variant: Variant,

    /// Directory holding the AWS files [default: ~/.aws]
    #[arg(long, env = "AWS_MFA_DIR")]
    pub aws_dir: Option<PathBuf>,

    /// Path to the AWS config file [default: <aws-dir>/config]
    #[arg(long, env = "AWS_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Path to the AWS credentials file [default: <aws-dir>/credentials]
    #[arg(long, env = "AWS_SHARED_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// Side-channel session file [default: <aws-dir>/temp_creds]
    #[arg(long, env = "AWS_MFA_TEMP_CREDENTIALS_FILE")]
    pub temp_credentials_file: Option<PathBuf>,

    /// Directory for credentials backups [default: <aws-dir>/credentials_backup]
    #[arg(long, env = "AWS_MFA_BACKUP_DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Session duration in seconds (900-129600) [default: 14400, or 900 for side-channel]
    #[arg(short, long, env = "AWS_SESSION_DURATION",
          value_parser = clap::value_parser!(u32).range(900..=129600))]
    pub duration: Option<u32>,

    /// AWS command-line client used for the STS calls
    #[arg(long, env = "AWS_MFA_CLI", default_value = "aws")]
    pub aws_cli: PathBuf,

    /// How STS is reached
    #[arg(long, value_enum, env = "AWS_MFA_BACKEND", default_value = "cli")]
    pub backend: Backend,

    /// Where the MFA device serial is read from
    #[arg(long, value_enum, env = "AWS_MFA_SERIAL_SOURCE", default_value = "config")]
    pub mfa_serial_source: MfaSerialSource,

    /// Abort if the permanent keys cannot be copied into the profile
    #[arg(long, env = "AWS_MFA_STRICT")]
    pub strict: bool,
}

impl Args {
    /// Resolves every path and default into the run's [`Settings`].
    pub fn settings(&self) -> Result<Settings> {
        let aws_dir = self
            .aws_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|d| d.join(".aws")))
            .context("Could not determine home directory")?;

        let defaults = AwsPaths::under(&aws_dir);
        let paths = AwsPaths {
            config_file: self.config_file.clone().unwrap_or(defaults.config_file),
            credentials_file: self
                .credentials_file
                .clone()
                .unwrap_or(defaults.credentials_file),
            temp_credentials_file: self
                .temp_credentials_file
                .clone()
                .unwrap_or(defaults.temp_credentials_file),
            backup_dir: self.backup_dir.clone().unwrap_or(defaults.backup_dir),
        };

        let mut settings = Settings::new(self.variant, paths);
        if let Some(duration) = self.duration {
            settings.duration = duration;
        }
        if self.strict {
            settings.strictness = Strictness::FailFast;
        }
        settings.mfa_serial_source = self.mfa_serial_source;
        Ok(settings)
    }
}
