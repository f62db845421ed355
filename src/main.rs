//! AWS MFA login
//!
//! Interactive one-shot tool that refreshes AWS CLI credentials with an MFA code:
//! 1. Resolves the AWS files and the login variant from flags and environment
//! 2. Asks for the profile and MFA code
//! 3. Backs up the credentials before changing them
//! 4. Exchanges the permanent keys for an STS session
//! 5. Writes the session where the AWS CLI reads it
//!
//! Exits 0 on success (or when an existing session is kept) and 1 on any failure.

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use aws_mfa_login::{
    AwsMfaUpdater, Error,
    cli::Args,
    config::Backend,
    console::TerminalConsole,
    sts::{StsClient, cli::AwsCli, sdk::SdkClient},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Users can override the level with RUST_LOG.
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let settings = match args.settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {e:#}", "ERROR:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    println!(
        "{}",
        "Welcome to AWS CLI 2F authentication!".cyan().bold()
    );

    let result = match args.backend {
        Backend::Cli => run(&settings, AwsCli::new(&args.aws_cli)).await,
        Backend::Sdk => run(&settings, SdkClient::new()).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run<S: StsClient>(settings: &aws_mfa_login::Settings, sts: S) -> Result<(), Error> {
    AwsMfaUpdater::new(settings, sts, TerminalConsole::stdio())
        .run()
        .await
        .map(|_| ())
}

fn report_error(err: &Error) {
    eprintln!("\n{} {err}", "ERROR:".red().bold());

    match err {
        Error::WriteBack { backup, .. } => {
            eprintln!(
                "{}",
                "The new session was issued but could NOT be saved; it is lost. Run the login again."
                    .red()
                    .bold()
            );
            if let Some(backup) = backup {
                eprintln!(
                    "{} {}",
                    "Your previous credentials file is preserved at".yellow(),
                    backup.display()
                );
            }
        }
        Error::BackupIo { .. } => {
            eprintln!(
                "{}",
                "No backup could be made, so the run stopped before changing any file."
                    .yellow()
                    .bold()
            );
        }
        e if e.is_preflight() => {
            eprintln!("{}", "No files were changed.".yellow().dimmed());
        }
        _ => {
            eprintln!(
                "{}",
                "A backup of your credentials was taken before any change; see the backup directory."
                    .yellow()
                    .dimmed()
            );
        }
    }
}
