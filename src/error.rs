//! Error taxonomy for a single login run.
//!
//! Variants are grouped by how far the run got before failing: pre-flight errors
//! leave every file untouched, exchange errors happen after the backup exists, and
//! [`Error::WriteBack`] means a valid grant was obtained but could not be persisted.

use std::path::PathBuf;

use thiserror::Error;

use crate::sts::ExchangeError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not locate {kind} file at {}", path.display())]
    MissingFile { kind: &'static str, path: PathBuf },

    #[error("profile '{profile}' is not present in the {store} file")]
    MissingSection { store: &'static str, profile: String },

    #[error("profile '{profile}' has no {field} in the {store} file")]
    MissingField {
        store: &'static str,
        profile: String,
        field: &'static str,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("MFA code provided is either null or empty")]
    EmptyMfaCode,

    #[error("failed to read from the terminal: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("could not lock {}: {reason}", path.display())]
    Lock { path: PathBuf, reason: String },

    #[error("failed to back up {}: {source}", path.display())]
    BackupIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("replacing '{profile}' with permanent credentials failed: {reason}")]
    Substitution { profile: String, reason: String },

    #[error("could not run the STS client: {0}")]
    Invocation(String),

    #[error("error parsing the output of the STS call: {0}")]
    ResponseParse(String),

    #[error("STS call failed: {0}")]
    ExchangeRejected(String),

    #[error("failed to write session credentials to {}: {source}", path.display())]
    WriteBack {
        path: PathBuf,
        backup: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },
}

impl From<ExchangeError> for Error {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::Invocation(msg) => Error::Invocation(msg),
            ExchangeError::ResponseParse(msg) => Error::ResponseParse(msg),
            ExchangeError::Rejected(msg) => Error::ExchangeRejected(msg),
        }
    }
}

impl Error {
    /// True for failures that happen before anything on disk has been touched.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Error::MissingFile { .. }
                | Error::MissingSection { .. }
                | Error::MissingField { .. }
                | Error::Parse { .. }
                | Error::EmptyMfaCode
                | Error::Prompt(_)
                | Error::Lock { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
