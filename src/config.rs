//! Run configuration, resolved once at startup and passed by reference.

use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// Which of the two login flows to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    /// Swap the active profile's keys for a session in `~/.aws/credentials`.
    RefreshInPlace,
    /// Leave the active profile alone and write the session to `~/.aws/temp_creds`.
    SideChannel,
}

impl Variant {
    pub fn default_duration(self) -> u32 {
        match self {
            Variant::RefreshInPlace => 14400,
            Variant::SideChannel => 900,
        }
    }
}

/// What to do when copying the permanent keys into the working profile fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strictness {
    /// Warn and attempt the exchange anyway.
    BestEffort,
    /// Abort the run.
    FailFast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MfaSerialSource {
    /// `mfa_serial` in the config store.
    Config,
    /// `mfa_serial` (or `aws_mfa_device`) in the credentials store.
    Credentials,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Shell out to the `aws` command-line client.
    Cli,
    /// Call STS in-process with the AWS SDK.
    Sdk,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AwsPaths {
    pub config_file: PathBuf,
    pub credentials_file: PathBuf,
    pub temp_credentials_file: PathBuf,
    pub backup_dir: PathBuf,
}

impl AwsPaths {
    /// Standard layout under an `.aws` directory.
    pub fn under(aws_dir: &Path) -> Self {
        Self {
            config_file: aws_dir.join("config"),
            credentials_file: aws_dir.join("credentials"),
            temp_credentials_file: aws_dir.join("temp_creds"),
            backup_dir: aws_dir.join("credentials_backup"),
        }
    }

    /// Lock file guarding the credentials file: a hidden sibling such as
    /// `~/.aws/.credentials.lock`.
    ///
    /// Derived from the credentials path alone, so every run against the same file contends
    /// for the same lock however the file was located, and its directory is known to exist
    /// once the credentials file does.
    pub fn lock_file(&self) -> PathBuf {
        let name = self
            .credentials_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "credentials".to_string());
        self.credentials_file.with_file_name(format!(".{name}.lock"))
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub variant: Variant,
    pub paths: AwsPaths,
    pub duration: u32,
    pub strictness: Strictness,
    pub mfa_serial_source: MfaSerialSource,
}

impl Settings {
    /// Settings for `variant` with its default duration and best-effort substitution.
    pub fn new(variant: Variant, paths: AwsPaths) -> Self {
        Self {
            variant,
            paths,
            duration: variant.default_duration(),
            strictness: Strictness::BestEffort,
            mfa_serial_source: MfaSerialSource::Config,
        }
    }

    /// The store file a successful run rewrites.
    pub fn target_file(&self) -> &Path {
        match self.variant {
            Variant::RefreshInPlace => &self.paths.credentials_file,
            Variant::SideChannel => &self.paths.temp_credentials_file,
        }
    }
}
