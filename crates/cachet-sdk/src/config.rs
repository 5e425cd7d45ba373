use std::path::{Path, PathBuf};

use cachet_types::validate_segment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or reading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A setting required by the requested operation is not configured.
    #[error("setting `{key}` is not configured")]
    Missing { key: &'static str },

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to read settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for connecting cachet to its backends.
///
/// ```toml
/// project_id = "inventory-prod"
/// credentials_path = "/etc/cachet/service-account.json"
/// storage_bucket = "inventory-media"
/// data_root = "/var/lib/cachet"
/// ```
///
/// Every field may be omitted from the file. Settings that only some
/// operations need are read through accessors that fail with
/// [`SettingsError::Missing`] naming the absent key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachetSettings {
    pub project_id: Option<String>,
    pub credentials_path: Option<PathBuf>,
    /// Bucket used for blob and directory operations.
    pub storage_bucket: Option<String>,
    /// Root directory of the local filesystem backends.
    pub data_root: PathBuf,
}

impl Default for CachetSettings {
    fn default() -> Self {
        Self {
            project_id: None,
            credentials_path: None,
            storage_bucket: None,
            data_root: PathBuf::from(".cachet"),
        }
    }
}

impl CachetSettings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn with_storage_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.storage_bucket = Some(bucket.into());
        self
    }

    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = root.into();
        self
    }

    pub fn project_id(&self) -> Result<&str, SettingsError> {
        self.project_id
            .as_deref()
            .ok_or(SettingsError::Missing { key: "project_id" })
    }

    pub fn credentials_path(&self) -> Result<&Path, SettingsError> {
        self.credentials_path
            .as_deref()
            .ok_or(SettingsError::Missing {
                key: "credentials_path",
            })
    }

    /// The configured bucket, checked to be a valid bucket name.
    pub fn storage_bucket(&self) -> Result<&str, SettingsError> {
        let bucket = self
            .storage_bucket
            .as_deref()
            .ok_or(SettingsError::Missing {
                key: "storage_bucket",
            })?;
        validate_segment(bucket).map_err(|e| SettingsError::Invalid {
            key: "storage_bucket",
            reason: e.to_string(),
        })?;
        Ok(bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let s = CachetSettings::default();
        assert_eq!(s.data_root, PathBuf::from(".cachet"));
        assert!(s.project_id.is_none());
        assert!(s.storage_bucket.is_none());
    }

    #[test]
    fn parse_full_file() {
        let s = CachetSettings::from_toml_str(
            r#"
            project_id = "inventory"
            credentials_path = "/etc/cachet/key.json"
            storage_bucket = "media"
            data_root = "/var/lib/cachet"
            "#,
        )
        .unwrap();
        assert_eq!(s.project_id().unwrap(), "inventory");
        assert_eq!(s.credentials_path().unwrap(), Path::new("/etc/cachet/key.json"));
        assert_eq!(s.storage_bucket().unwrap(), "media");
        assert_eq!(s.data_root, PathBuf::from("/var/lib/cachet"));
    }

    #[test]
    fn missing_settings_name_the_key() {
        let s = CachetSettings::from_toml_str("").unwrap();
        let err = s.project_id().unwrap_err();
        assert!(matches!(err, SettingsError::Missing { key: "project_id" }));
        assert!(err.to_string().contains("project_id"));
        assert!(s.credentials_path().is_err());
        assert!(s.storage_bucket().is_err());
    }

    #[test]
    fn invalid_bucket_is_rejected() {
        let s = CachetSettings::default().with_storage_bucket("a/b");
        assert!(matches!(
            s.storage_bucket().unwrap_err(),
            SettingsError::Invalid { key: "storage_bucket", .. }
        ));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let err = CachetSettings::from_toml_str("project_id = [").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cachet.toml");
        std::fs::write(&path, "storage_bucket = \"media\"\n").unwrap();
        let s = CachetSettings::load(&path).unwrap();
        assert_eq!(s.storage_bucket().unwrap(), "media");

        let err = CachetSettings::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
