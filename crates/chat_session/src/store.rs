//! Persisted login state for the chat client.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use webdriver_api::Cookie;

use crate::error::StoreError;

pub const SESSION_STATE_VERSION: u32 = 1;

/// Authentication blob captured after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionState {
    pub version: u32,
    /// Origin the cookies and storage belong to.
    pub origin: String,
    /// RFC 3339 capture time.
    pub saved_at: String,
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    #[serde(default)]
    pub local_storage: BTreeMap<String, String>,
}

impl SessionState {
    /// Stamps a freshly captured state with the current UTC time.
    pub fn captured_now(
        origin: impl Into<String>,
        cookies: Vec<Cookie>,
        local_storage: BTreeMap<String, String>,
    ) -> Result<Self, StoreError> {
        let saved_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(StoreError::ClockFormat)?;
        Ok(Self {
            version: SESSION_STATE_VERSION,
            origin: origin.into(),
            saved_at,
            cookies,
            local_storage,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.local_storage.is_empty()
    }
}

/// One JSON file holding a [`SessionState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where [`Self::quarantine`] moves a rejected state.
    pub fn stale_path(&self) -> PathBuf {
        with_suffix(&self.path, ".stale")
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the stored state; `None` when no file exists.
    pub fn load(&self) -> Result<Option<SessionState>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::io("reading session state", &self.path, source))
            }
        };

        let state: SessionState =
            serde_json::from_str(&text).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        if state.version != SESSION_STATE_VERSION {
            return Err(StoreError::UnsupportedVersion {
                path: self.path.clone(),
                found: state.version,
                expected: SESSION_STATE_VERSION,
            });
        }
        Ok(Some(state))
    }

    /// Writes `state` through a sibling temp file and a rename.
    pub fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| StoreError::io("creating session directory", parent, source))?;
        }

        let json = serde_json::to_vec_pretty(state).map_err(|source| StoreError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        let temp = with_suffix(&self.path, ".tmp");
        fs::write(&temp, json)
            .map_err(|source| StoreError::io("writing session state", &temp, source))?;
        fs::rename(&temp, &self.path)
            .map_err(|source| StoreError::io("replacing session state", &self.path, source))
    }

    /// Moves the stored state aside so the next run starts a fresh login.
    ///
    /// Returns the new location, or `None` when there was nothing to move.
    pub fn quarantine(&self) -> Result<Option<PathBuf>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let stale = self.stale_path();
        fs::rename(&self.path, &stale)
            .map_err(|source| StoreError::io("quarantining session state", &self.path, source))?;
        Ok(Some(stale))
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
