//! AWS MFA login flow.
//!
//! One run walks a fixed sequence of states and never retries:
//!
//! ```text
//! Idle -> Validated -> BackedUp -> KeysSubstituted -> ExchangePending -> GrantWritten -> Reported
//!   \__________\___________\______________\________________\________________\_____-> Failed
//! ```
//!
//! ## Profile layout
//!
//! The refresh-in-place variant keeps each working profile next to a permanent twin in
//! the credentials file and rewrites the working one on every login:
//!
//! ```ini
//! [work]
//! aws_access_key_id = ASIA...           # temporary access key
//! aws_secret_access_key = ...           # temporary secret key
//! aws_session_token = ...               # present only in temporary state
//! expiration = 2024-05-01T13:30:00Z     # informational
//!
//! [work_permanent]
//! aws_access_key_id = AKIA...           # long-term IAM user key
//! aws_secret_access_key = ...
//! ```
//!
//! The MFA device comes from `mfa_serial` in the config file (`[work]` or `[profile work]`).
//!
//! The side-channel variant never touches the credentials file. It writes the session into
//! the same-named section of `~/.aws/temp_creds`, after first offering to keep a session
//! that is still valid there.
//!
//! ## Safety
//!
//! Nothing is written before validation and the MFA prompt have both passed. The first
//! write of any run is a byte-for-byte backup of the file that is about to change.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::backup::BackupSnapshot;
use crate::config::{MfaSerialSource, Settings, Strictness, Variant};
use crate::console::{Console, Tone, parse_yes_no};
use crate::credentials::{
    LEGACY_MFA_DEVICE, MFA_SERIAL, SESSION_TOKEN, describe_duration, permanent_profile_name,
};
use crate::error::{Error, Result};
use crate::lock::RunLock;
use crate::store::{ProfileStore, StoreKind};
use crate::sts::{CallerIdentity, CredentialSource, SessionTokenRequest, StsClient};

pub const DEFAULT_PROFILE: &str = "default";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Validated,
    BackedUp,
    KeysSubstituted,
    ExchangePending,
    GrantWritten,
    Reported,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A new session was written into `target`.
    Refreshed {
        profile: String,
        target: PathBuf,
        backup: Option<PathBuf>,
        expiration: DateTime<Utc>,
    },
    /// The user chose to keep a session that is still valid; nothing was written.
    KeptExistingSession {
        profile: String,
        identity: CallerIdentity,
    },
}

/// Empty input selects the `default` profile.
pub fn resolve_profile_name(input: &str) -> String {
    match input.trim() {
        "" => DEFAULT_PROFILE.to_string(),
        name => name.to_string(),
    }
}

/// Everything established by validation, held until the run ends.
struct Session {
    profile: String,
    serial_number: String,
    credentials: ProfileStore,
    /// Present only for the side-channel variant.
    temp: Option<ProfileStore>,
    _lock: RunLock,
}

/// Drives one interactive login from validation to the final report.
///
/// The updater owns the STS client and the console for the length of the run and borrows
/// the resolved [`Settings`]. It is single-use: [`AwsMfaUpdater::run`] performs exactly one
/// attempt and leaves the updater in [`State::Reported`] or [`State::Failed`].
pub struct AwsMfaUpdater<'a, S, C> {
    settings: &'a Settings,
    sts: S,
    console: C,
    state: State,
}

impl<'a, S: StsClient, C: Console> AwsMfaUpdater<'a, S, C> {
    /// Creates an updater in [`State::Idle`].
    ///
    /// # Arguments
    ///
    /// * `settings` - Paths, variant, duration and policies for this run
    /// * `sts` - Backend used for `GetSessionToken` and the session pre-check
    /// * `console` - Where prompts are asked and progress is reported
    pub fn new(settings: &'a Settings, sts: S, console: C) -> Self {
        Self {
            settings,
            sts,
            console,
            state: State::Idle,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Runs one login attempt.
    ///
    /// # Returns
    ///
    /// The [`Outcome`] of the run. On error the state is [`State::Failed`] and the error
    /// tells how far the run got: pre-flight errors leave every file untouched.
    pub async fn run(&mut self) -> Result<Outcome> {
        let result = self.drive().await;
        if result.is_err() {
            self.enter(State::Failed);
        }
        result
    }

    fn enter(&mut self, next: State) {
        debug!("{:?} -> {next:?}", self.state);
        self.state = next;
    }

    async fn drive(&mut self) -> Result<Outcome> {
        let mut session = self.validate()?;
        self.enter(State::Validated);

        if let Some(identity) = self.existing_session(&session).await {
            if self.confirm_keep(&identity)? {
                self.console.say(
                    Tone::Success,
                    &format!("Continuing with the existing session for '{}'.", session.profile),
                );
                self.enter(State::Reported);
                return Ok(Outcome::KeptExistingSession {
                    profile: session.profile,
                    identity,
                });
            }
        }

        let mfa_code = self.ask_mfa_code()?;

        let backup = self.back_up().await?;
        self.enter(State::BackedUp);

        if self.settings.variant == Variant::RefreshInPlace {
            self.substitute_permanent_keys(&mut session).await?;
            self.enter(State::KeysSubstituted);
        }

        // After a best-effort substitution the working section may hold no keys at all;
        // the backend decides whether it needs them.
        let request = SessionTokenRequest {
            source: CredentialSource {
                profile: session.profile.clone(),
                config_file: self.settings.paths.config_file.clone(),
                credentials_file: self.settings.paths.credentials_file.clone(),
                keys: session.credentials.access_keys(&session.profile),
                session_token: session
                    .credentials
                    .optional_field(&session.profile, SESSION_TOKEN),
            },
            mfa_code,
            serial_number: session.serial_number.clone(),
            duration_seconds: self.settings.duration,
        };
        self.enter(State::ExchangePending);
        info!("Fetching credentials - Duration: {}s", self.settings.duration);
        let grant = self.sts.get_session_token(&request).await?;

        let target = match session.temp.as_mut() {
            Some(temp) => temp,
            None => &mut session.credentials,
        };
        target.write_grant(&session.profile, &grant);
        target.save().await.map_err(|source| Error::WriteBack {
            path: target.path().to_path_buf(),
            backup: backup.as_ref().map(|b| b.path.clone()),
            source,
        })?;
        let target = target.path().to_path_buf();
        self.enter(State::GrantWritten);

        self.report(&session.profile, &target, grant.expiration);
        self.enter(State::Reported);

        Ok(Outcome::Refreshed {
            profile: session.profile,
            target,
            backup: backup.map(|b| b.path),
            expiration: grant.expiration,
        })
    }

    fn validate(&mut self) -> Result<Session> {
        let settings = self.settings;
        let paths = &settings.paths;
        for (kind, path) in [
            (StoreKind::Config, &paths.config_file),
            (StoreKind::Credentials, &paths.credentials_file),
        ] {
            if !path.exists() {
                return Err(Error::MissingFile {
                    kind: kind.label(),
                    path: path.clone(),
                });
            }
        }
        let lock = RunLock::acquire(&paths.lock_file())?;

        self.console.say(
            Tone::Note,
            "If you do not specify a profile name, the 'default' profile from your credentials file is used.",
        );
        let answer = self
            .console
            .ask("Specify your AWS profile name:")
            .map_err(Error::Prompt)?;
        let profile = resolve_profile_name(&answer);
        if answer.is_empty() {
            self.console.say(
                Tone::Note,
                "AWS profile name not provided. Continuing with 'default' profile settings.",
            );
        }

        let config = ProfileStore::load(StoreKind::Config, &paths.config_file)?;
        let config_section = config.section(&profile)?;
        let credentials = ProfileStore::load(StoreKind::Credentials, &paths.credentials_file)?;

        let serial_number = match settings.mfa_serial_source {
            MfaSerialSource::Config => config.field(&config_section, MFA_SERIAL)?,
            MfaSerialSource::Credentials => {
                credentials.section(&profile)?;
                credentials
                    .optional_field(&profile, MFA_SERIAL)
                    .or_else(|| credentials.optional_field(&profile, LEGACY_MFA_DEVICE))
                    .ok_or_else(|| Error::MissingField {
                        store: StoreKind::Credentials.label(),
                        profile: profile.clone(),
                        field: MFA_SERIAL,
                    })?
            }
        };

        let temp = match settings.variant {
            Variant::RefreshInPlace => {
                credentials.section(&permanent_profile_name(&profile))?;
                credentials.section(&profile)?;
                None
            }
            Variant::SideChannel => {
                credentials.profile(&profile)?;
                Some(ProfileStore::load_or_empty(
                    StoreKind::TempCredentials,
                    &paths.temp_credentials_file,
                )?)
            }
        };

        info!("Validated profile '{profile}' (MFA device {serial_number})");
        Ok(Session {
            profile,
            serial_number,
            credentials,
            temp,
            _lock: lock,
        })
    }

    /// Asks STS whether the side-channel session for this profile still works.
    async fn existing_session(&mut self, session: &Session) -> Option<CallerIdentity> {
        let temp = session.temp.as_ref()?;
        let current = temp.profile(&session.profile).ok()?;
        let source = CredentialSource {
            profile: session.profile.clone(),
            config_file: self.settings.paths.config_file.clone(),
            credentials_file: temp.path().to_path_buf(),
            keys: Some(current.keys),
            session_token: current.session_token,
        };

        match self.sts.get_caller_identity(&source).await {
            Ok(identity) => Some(identity),
            Err(e) => {
                info!("Existing session for '{}' is not usable: {e}", session.profile);
                self.console.say(
                    Tone::Note,
                    &format!("No valid session found for '{}'.", session.profile),
                );
                None
            }
        }
    }

    fn confirm_keep(&mut self, identity: &CallerIdentity) -> Result<bool> {
        self.console.say(
            Tone::Success,
            &format!(
                "Existing session is valid (account {}, {}).",
                identity.account, identity.arn
            ),
        );
        loop {
            let answer = self
                .console
                .ask("Continue with the existing session? [Y/n]")
                .map_err(Error::Prompt)?;
            match parse_yes_no(&answer, true) {
                Some(keep) => return Ok(keep),
                None => self.console.say(Tone::Warning, "Please answer 'y' or 'n'."),
            }
        }
    }

    fn ask_mfa_code(&mut self) -> Result<String> {
        let code = self
            .console
            .ask("Provide your valid 6-digit MFA code:")
            .map_err(Error::Prompt)?;
        if code.is_empty() {
            return Err(Error::EmptyMfaCode);
        }
        Ok(code)
    }

    /// Snapshots the file this run will overwrite. A side-channel target that does not
    /// exist yet has nothing to lose and is skipped.
    async fn back_up(&mut self) -> Result<Option<BackupSnapshot>> {
        let settings = self.settings;
        let source = settings.target_file();
        if !source.exists() {
            debug!("{} does not exist yet, nothing to back up", source.display());
            return Ok(None);
        }
        let snapshot = BackupSnapshot::create(source, &settings.paths.backup_dir).await?;
        self.console.say(
            Tone::Note,
            &format!(
                "{} backed up as '{}'.",
                source.display(),
                snapshot.path.display()
            ),
        );
        Ok(Some(snapshot))
    }

    /// Copies the permanent keys into the working profile and saves, so the external
    /// client authenticates with them. Failure is fatal only under [`Strictness::FailFast`].
    async fn substitute_permanent_keys(&mut self, session: &mut Session) -> Result<()> {
        let profile = session.profile.as_str();
        let substitution_err = |reason: String| Error::Substitution {
            profile: profile.to_string(),
            reason,
        };

        let result = match session.credentials.profile(&permanent_profile_name(profile)) {
            Ok(permanent) => {
                session.credentials.set_permanent_keys(profile, &permanent.keys);
                session
                    .credentials
                    .save()
                    .await
                    .map_err(|e| substitution_err(e.to_string()))
            }
            Err(e) => Err(substitution_err(e.to_string())),
        };

        match (result, self.settings.strictness) {
            (Ok(()), _) => Ok(()),
            (Err(e), Strictness::FailFast) => Err(e),
            (Err(e), Strictness::BestEffort) => {
                warn!("{e}");
                self.console.say(
                    Tone::Warning,
                    &format!(
                        "WARNING: Replacing '{profile}' with permanent credentials may have some issue(s). Please check!"
                    ),
                );
                Ok(())
            }
        }
    }

    fn report(&mut self, profile: &str, target: &std::path::Path, expiration: DateTime<Utc>) {
        info!("Success! Credentials expire at: {expiration}");
        match self.settings.variant {
            Variant::RefreshInPlace => {
                self.console.say(
                    Tone::Success,
                    "Congratulations! You are now successfully 2FA authenticated with AWS CLI.",
                );
                self.console.say(
                    Tone::Success,
                    &format!(
                        "The session will expire after {}.",
                        describe_duration(self.settings.duration)
                    ),
                );
            }
            Variant::SideChannel => {
                self.console.say(
                    Tone::Success,
                    &format!(
                        "Temporary credentials for '{profile}' written to {}.",
                        target.display()
                    ),
                );
                self.console.say(
                    Tone::Note,
                    &format!(
                        "Use them with AWS_SHARED_CREDENTIALS_FILE={} aws --profile {profile} ...",
                        target.display()
                    ),
                );
            }
        }
    }
}
