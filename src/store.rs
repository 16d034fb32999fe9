use camino::Utf8Path;
use camino::Utf8PathBuf;

use crate::color::Color;
use crate::frame::Frame;
use crate::frame::ZoneId;

/// Zones of the keyboard backlight
pub const KEYBOARD_ZONES: [&str; 4] = ["1", "2", "3", "4"];

pub const DEFAULT_CONFIG_NAME: &str = "default";

/// A named zone configuration, stored as `<name>.json`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct RgbConfig {
    pub name: String,
    pub zones: Frame,
}

impl RgbConfig {
    /// All keyboard zones white, static
    pub fn default_config() -> Self {
        let zones = KEYBOARD_ZONES.map(ZoneId::new);
        Self {
            name: String::from(DEFAULT_CONFIG_NAME),
            zones: Frame::uniform(&zones, Color::WHITE),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: Utf8PathBuf,
}

impl ConfigStore {
    pub fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Create the directory and `default.json` if they are missing
    pub async fn ensure(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::CreatingDir {
                path: self.dir.clone(),
                source,
            })?;

        if !self.exists(DEFAULT_CONFIG_NAME).await? {
            tracing::info!(dir = %self.dir, "Writing default config");
            self.save(&RgbConfig::default_config()).await?;
        }

        Ok(())
    }

    pub fn path_of(&self, name: &str) -> Result<Utf8PathBuf, StoreError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\', '\0']);

        if !valid {
            return Err(StoreError::InvalidName(name.to_string()));
        }

        Ok(self.dir.join(format!("{name}.json")))
    }

    pub async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.path_of(name)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|source| StoreError::Reading { path, source })
    }

    /// Load `<name>.json`, `None` if there is no such file.
    ///
    /// The returned config is named after the file, whatever the name inside says.
    pub async fn load(&self, name: &str) -> Result<Option<RgbConfig>, StoreError> {
        let path = self.path_of(name)?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Reading { path, source }),
        };

        let mut config: RgbConfig = serde_json::from_str(&content)
            .map_err(|source| StoreError::Parsing { path, source })?;
        config.name = name.to_string();

        Ok(Some(config))
    }

    pub async fn save(&self, config: &RgbConfig) -> Result<(), StoreError> {
        let path = self.path_of(&config.name)?;
        let content = serde_json::to_string(config).map_err(StoreError::Serializing)?;

        tracing::debug!(%path, "Saving config");
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| StoreError::Writing { path, source })
    }

    /// Names of all stored configs, sorted
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let listing_error = |source| StoreError::Listing {
            path: self.dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(listing_error)?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(listing_error)? {
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };

            if path.extension() != Some("json") {
                continue;
            }

            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid config name '{0}'")]
    InvalidName(String),

    #[error("Failed to create config directory '{}'", .path)]
    CreatingDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list config directory '{}'", .path)]
    Listing {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config '{}'", .path)]
    Reading {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config '{}'", .path)]
    Parsing {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize config")]
    Serializing(#[source] serde_json::Error),

    #[error("Failed to write config '{}'", .path)]
    Writing {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
