use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{LcoxError, Result};

pub const API_KEY_ENV: &str = "ARCGIS_API_KEY";
const API_KEY_LEN: usize = 40;

/// ArcGIS developer key. Debug output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let len = key.chars().count();
        if len != API_KEY_LEN {
            return Err(LcoxError::Config(format!(
                "API key must be {} characters, got {}",
                API_KEY_LEN, len
            )));
        }
        Ok(Self(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey(****)")
    }
}

impl TryFrom<String> for ApiKey {
    type Error = LcoxError;

    fn try_from(key: String) -> Result<Self> {
        Self::new(key)
    }
}

impl From<ApiKey> for String {
    fn from(key: ApiKey) -> Self {
        key.0
    }
}

/// Credentials section of the application config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// `.env` file to read; the nearest `.env` is used when unset or missing
    pub env_file: Option<PathBuf>,
    pub arcgis_api_key: Option<ApiKey>,
}

impl Credentials {
    /// The configured key, else one loaded from the environment.
    pub fn api_key(&self) -> Result<Option<ApiKey>> {
        match &self.arcgis_api_key {
            Some(key) => Ok(Some(key.clone())),
            None => load_api_key(self.env_file.as_deref(), API_KEY_ENV),
        }
    }
}

/// Loads `.env` (explicit path if it exists, else the nearest one) and reads
/// `var`. Variables already set in the process win over the file.
pub fn load_api_key(env_file: Option<&Path>, var: &str) -> Result<Option<ApiKey>> {
    match env_file.filter(|p| p.exists()) {
        Some(path) => {
            dotenvy::from_path(path)
                .map_err(|e| LcoxError::Config(format!("{}: {}", path.display(), e)))?;
            debug!(path = %path.display(), "loaded env file");
        }
        None => {
            if let Ok(path) = dotenvy::dotenv() {
                debug!(path = %path.display(), "loaded env file");
            }
        }
    }
    std::env::var(var).ok().map(ApiKey::new).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KEY: &str = "abcdefghijklmnopqrstuvwxyz0123456789ABCD";

    #[test]
    fn test_key_length() {
        assert!(ApiKey::new(KEY).is_ok());
        assert!(matches!(ApiKey::new("short"), Err(LcoxError::Config(_))));
        assert_eq!(format!("{:?}", ApiKey::new(KEY).unwrap()), "ApiKey(****)");
    }

    #[test]
    fn test_deserialize_rejects_bad_key() {
        let creds: Credentials =
            serde_json::from_value(serde_json::json!({ "arcgis_api_key": KEY })).unwrap();
        assert_eq!(creds.api_key().unwrap().unwrap().expose(), KEY);
        assert!(serde_json::from_value::<Credentials>(
            serde_json::json!({ "arcgis_api_key": "too-short" })
        )
        .is_err());
    }

    #[test]
    fn test_load_from_explicit_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "LCOX_TEST_EXPLICIT_KEY={}", KEY).unwrap();

        let key = load_api_key(Some(&path), "LCOX_TEST_EXPLICIT_KEY").unwrap();
        assert_eq!(key.unwrap().expose(), KEY);
    }

    #[test]
    fn test_missing_variable_is_none() {
        let key = load_api_key(None, "LCOX_TEST_UNSET_KEY").unwrap();
        assert!(key.is_none());
    }
}
