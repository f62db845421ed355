//! INI-backed profile stores (`~/.aws/config`, `~/.aws/credentials`, `~/.aws/temp_creds`).
//!
//! A store is loaded once, mutated in memory, and written back with [`ProfileStore::save`],
//! which is the only place this module touches the disk after loading.

use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use log::debug;
use tokio::fs;

use crate::credentials::{
    ACCESS_KEY_ID, AccessKeys, CredentialProfile, EXPIRATION, SECRET_ACCESS_KEY, SESSION_TOKEN,
    SessionGrant,
};
use crate::error::{Error, Result};

/// configparser writes its default section without a `[header]`, which would turn the
/// AWS `[default]` profile into loose top-level keys. Route loose keys here instead.
const TOP_LEVEL: &str = "aws-mfa-login:top-level";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Config,
    Credentials,
    TempCredentials,
}

impl StoreKind {
    pub fn label(self) -> &'static str {
        match self {
            StoreKind::Config => "config",
            StoreKind::Credentials => "credentials",
            StoreKind::TempCredentials => "temp credentials",
        }
    }
}

/// One AWS INI file held in memory.
///
/// Section names are case-sensitive and keep their order on save. A section with the same
/// name as the AWS default section (`[default]`) is an ordinary profile here.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use aws_mfa_login::store::{ProfileStore, StoreKind};
///
/// let store = ProfileStore::parse(
///     StoreKind::Credentials,
///     Path::new("credentials"),
///     "[work]\naws_access_key_id = AKIA\naws_secret_access_key = s\n",
/// )
/// .unwrap();
/// assert_eq!(store.field("work", "aws_access_key_id").unwrap(), "AKIA");
/// ```
pub struct ProfileStore {
    kind: StoreKind,
    path: PathBuf,
    ini: Ini,
}

impl ProfileStore {
    fn empty(kind: StoreKind, path: &Path) -> Self {
        let mut ini = Ini::new_cs();
        ini.set_default_section(TOP_LEVEL);
        Self {
            kind,
            path: path.to_path_buf(),
            ini,
        }
    }

    /// Loads an existing store file.
    pub fn load(kind: StoreKind, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingFile {
                kind: kind.label(),
                path: path.to_path_buf(),
            });
        }
        let mut store = Self::empty(kind, path);
        store.ini.load(path).map_err(|message| Error::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        debug!(
            "Loaded {} store from {} ({} sections)",
            kind.label(),
            path.display(),
            store.ini.sections().len()
        );
        Ok(store)
    }

    /// Loads the store if its file exists, otherwise starts an empty one bound to `path`.
    pub fn load_or_empty(kind: StoreKind, path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(kind, path)
        } else {
            Ok(Self::empty(kind, path))
        }
    }

    /// Parses store content from memory without binding it to an existing file.
    pub fn parse(kind: StoreKind, path: &Path, content: &str) -> Result<Self> {
        let mut store = Self::empty(kind, path);
        store
            .ini
            .read(content.to_string())
            .map_err(|message| Error::Parse {
                path: path.to_path_buf(),
                message,
            })?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.ini.get_map_ref().contains_key(name)
    }

    /// Resolves the section holding `profile`, matching case-sensitively.
    ///
    /// The config store also accepts the AWS CLI's `[profile NAME]` spelling.
    pub fn section(&self, profile: &str) -> Result<String> {
        if self.has_section(profile) {
            return Ok(profile.to_string());
        }
        if self.kind == StoreKind::Config {
            let prefixed = format!("profile {profile}");
            if self.has_section(&prefixed) {
                return Ok(prefixed);
            }
        }
        Err(Error::MissingSection {
            store: self.kind.label(),
            profile: profile.to_string(),
        })
    }

    /// Returns a field's value, treating blank values the same as absent ones.
    pub fn field(&self, section: &str, key: &'static str) -> Result<String> {
        self.optional_field(section, key)
            .ok_or_else(|| Error::MissingField {
                store: self.kind.label(),
                profile: section.to_string(),
                field: key,
            })
    }

    pub fn optional_field(&self, section: &str, key: &str) -> Option<String> {
        self.ini
            .get(section, key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Extracts the typed credential bundle stored under `name`.
    pub fn profile(&self, name: &str) -> Result<CredentialProfile> {
        let section = self.section(name)?;
        Ok(CredentialProfile {
            name: name.to_string(),
            keys: AccessKeys::new(
                self.field(&section, ACCESS_KEY_ID)?,
                self.field(&section, SECRET_ACCESS_KEY)?,
            ),
            session_token: self.optional_field(&section, SESSION_TOKEN),
        })
    }

    /// Reads the key pair under `section` without failing on a partial or missing one.
    ///
    /// # Returns
    ///
    /// `Some` only when both the access key ID and the secret access key are non-blank.
    pub fn access_keys(&self, section: &str) -> Option<AccessKeys> {
        Some(AccessKeys::new(
            self.optional_field(section, ACCESS_KEY_ID)?,
            self.optional_field(section, SECRET_ACCESS_KEY)?,
        ))
    }

    /// Sets `key` in `section`, creating the section when it does not exist yet.
    ///
    /// # Arguments
    ///
    /// * `section` - Exact section name, e.g. `work` or `work_permanent`
    /// * `key` - Field name such as `aws_access_key_id`
    /// * `value` - New value; an existing value is replaced
    pub fn set_field(&mut self, section: &str, key: &str, value: &str) {
        self.ini.set(section, key, Some(value.to_string()));
    }

    /// Removes a field, reporting whether it was present.
    pub fn remove_field(&mut self, section: &str, key: &str) -> bool {
        self.ini.remove_key(section, key).is_some()
    }

    /// Puts a profile back into permanent state with the given keys.
    pub fn set_permanent_keys(&mut self, section: &str, keys: &AccessKeys) {
        self.set_field(section, ACCESS_KEY_ID, &keys.access_key_id);
        self.set_field(section, SECRET_ACCESS_KEY, &keys.secret_access_key);
        self.remove_field(section, SESSION_TOKEN);
        self.remove_field(section, EXPIRATION);
    }

    /// Puts a profile into temporary state, creating the section if needed.
    pub fn write_grant(&mut self, section: &str, grant: &SessionGrant) {
        self.set_field(section, ACCESS_KEY_ID, &grant.access_key_id);
        self.set_field(section, SECRET_ACCESS_KEY, &grant.secret_access_key);
        self.set_field(section, SESSION_TOKEN, &grant.session_token);
        self.set_field(section, EXPIRATION, &grant.expiration_string());
    }

    /// Serializes the whole store back to its path, overwriting the file.
    pub async fn save(&self) -> std::io::Result<()> {
        let created = !self.path.exists();
        fs::write(&self.path, self.ini.writes()).await?;

        #[cfg(unix)]
        if created {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }
        #[cfg(not(unix))]
        let _ = created;

        debug!("Wrote {} store to {}", self.kind.label(), self.path.display());
        Ok(())
    }
}
