use std::{
    borrow::Cow,
    path::{Path, PathBuf},
    time::Duration,
};

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

const SETTINGS_FILE_NAME: &str = "foldertree.yaml";
const DEFAULT_SNAPSHOT_PATH: &str = ".foldertree/tree.snapshot";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn get_settings_file_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE_NAME)
}

fn key(name: &str) -> Yaml<'_> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub base_url: String,
    pub timeout: Duration,
}

impl RemoteSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Contents of the optional `foldertree.yaml` next to the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub remote: Option<RemoteSettings>,
    pub snapshot: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote: None,
            snapshot: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
        }
    }
}

impl Settings {
    /// Reads `foldertree.yaml` under `root`, falling back to defaults when
    /// the file does not exist
    pub async fn read(root: &Path) -> Result<Self, SettingsError> {
        let path = get_settings_file_path(root);
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_path(path).await
    }

    pub async fn from_path(path: PathBuf) -> Result<Self, SettingsError> {
        debug!("Reading settings file: {}", path.display());
        let bytes = fs::read(&path).await.context(ReadSnafu {
            file_path: path.display().to_string(),
        })?;
        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.display().to_string(),
        })?;
        contents.as_str().try_into()
    }

    fn parse_remote(
        remote: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<RemoteSettings, SettingsError> {
        let base_url = remote
            .get(&key("base_url"))
            .and_then(|v| v.as_str())
            .context(MissingBaseUrlSnafu)?;

        let timeout = match remote.get(&key("timeout_secs")) {
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Some(Yaml::Value(Scalar::Integer(secs))) => u64::try_from(*secs)
                .map(Duration::from_secs)
                .ok()
                .context(InvalidTimeoutSnafu)?,
            Some(_) => return InvalidTimeoutSnafu.fail(),
        };

        Ok(RemoteSettings {
            base_url: base_url.to_string(),
            timeout,
        })
    }
}

impl TryFrom<&str> for Settings {
    type Error = SettingsError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(document) = documents.first() else {
            // An empty file is as good as no file
            return Ok(Self::default());
        };

        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;

        let remote = match top_level.get(&key("remote")) {
            None => None,
            Some(remote) => {
                let remote = remote.as_mapping().context(RemoteNotMapSnafu)?;
                Some(Self::parse_remote(remote)?)
            }
        };

        let snapshot = match top_level.get(&key("snapshot")) {
            None => PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            Some(value) => PathBuf::from(value.as_str().context(InvalidSnapshotSnafu)?),
        };

        Ok(Settings { remote, snapshot })
    }
}

#[derive(Debug, Snafu)]
pub enum SettingsError {
    #[snafu(display("Failed to read the settings file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Settings file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the settings file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of the settings file should be a map"))]
    TopLevelNotMap,
    #[snafu(display("The remote section should be a map"))]
    RemoteNotMap,
    #[snafu(display("The remote section needs a base_url string"))]
    MissingBaseUrl,
    #[snafu(display("remote.timeout_secs should be a non-negative integer"))]
    InvalidTimeout,
    #[snafu(display("snapshot should be a path string"))]
    InvalidSnapshot,
}
