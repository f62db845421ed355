//! Interactive MFA login for the AWS command-line tool.
//!
//! Trades the long-lived keys in `~/.aws/credentials` plus an MFA code for an STS session
//! and writes the session back where the `aws` tool will pick it up. See [`updater`] for
//! the flow and the two supported variants.

pub mod backup;
pub mod cli;
pub mod config;
pub mod console;
pub mod credentials;
pub mod error;
pub mod lock;
pub mod store;
pub mod sts;
pub mod updater;

pub use config::{Settings, Variant};
pub use error::{Error, Result};
pub use updater::{AwsMfaUpdater, Outcome};
