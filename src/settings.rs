use camino::Utf8Path;
use camino::Utf8PathBuf;

/// Name of the lighting executable looked up on `PATH` if none is configured
pub const DEFAULT_EXECUTABLE: &str = "asusctl";

pub const DEFAULT_API_PORT: u16 = 52813;

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Settings {
    /// Directory holding `<name>.json` zone configs, relative to the settings file
    #[serde(default = "default_configs_dir")]
    pub configs_dir: Utf8PathBuf,

    #[serde(default = "default_config_name")]
    pub default_config: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<Utf8PathBuf>,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub animation: AnimationSettings,
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct ApiSettings {
    pub bind: std::net::SocketAddr,
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct AnimationSettings {
    #[serde(with = "humantime_serde")]
    pub default_delay: std::time::Duration,
}

fn default_configs_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("configs")
}

fn default_config_name() -> String {
    String::from("default")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            configs_dir: default_configs_dir(),
            default_config: default_config_name(),
            executable_path: None,
            api: ApiSettings::default(),
            animation: AnimationSettings::default(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind: std::net::SocketAddr::from(([127, 0, 0, 1], DEFAULT_API_PORT)),
        }
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            default_delay: std::time::Duration::from_millis(50),
        }
    }
}

impl Settings {
    pub async fn load(path: &Utf8Path) -> Result<Self, SettingsError> {
        let settings_str =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| SettingsError::ReadingFile {
                    path: path.to_path_buf(),
                    source,
                })?;

        toml::from_str(&settings_str).map_err(|source| SettingsError::ParsingSettings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the settings, writing the defaults to `path` first if there is no file yet
    pub async fn load_or_create(path: &Utf8Path) -> Result<Self, SettingsError> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|source| SettingsError::ReadingFile {
                path: path.to_path_buf(),
                source,
            })?;

        if !exists {
            tracing::info!(%path, "No settings file found, writing defaults");
            Settings::default().save(path).await?;
        }

        Self::load(path).await
    }

    pub async fn save(&self, path: &Utf8Path) -> Result<(), SettingsError> {
        let writing_error = |source| SettingsError::WritingFile {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(writing_error)?;
        }

        let content = toml::to_string_pretty(self).map_err(SettingsError::Serializing)?;
        tokio::fs::write(path, content)
            .await
            .map_err(writing_error)
    }

    /// Config directory, with relative paths resolved against the directory of `settings_path`
    pub fn configs_dir(&self, settings_path: &Utf8Path) -> Utf8PathBuf {
        if self.configs_dir.is_absolute() {
            return self.configs_dir.clone();
        }

        settings_path
            .parent()
            .unwrap_or_else(|| Utf8Path::new("."))
            .join(&self.configs_dir)
    }

    /// Configured executable, or `asusctl` from `PATH`
    pub fn resolve_executable(&self) -> Result<Utf8PathBuf, SettingsError> {
        match self.executable_path.as_deref() {
            Some(path) => check_executable(path).map(|()| path.to_path_buf()),
            None => find_on_path(DEFAULT_EXECUTABLE, std::env::var_os("PATH")),
        }
    }
}

fn check_executable(path: &Utf8Path) -> Result<(), SettingsError> {
    let metadata = std::fs::metadata(path).map_err(|source| SettingsError::ExecutableMissing {
        path: path.to_path_buf(),
        source,
    })?;

    if !metadata.is_file() {
        return Err(SettingsError::ExecutableNotAFile {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

fn find_on_path(
    name: &str,
    path_var: Option<std::ffi::OsString>,
) -> Result<Utf8PathBuf, SettingsError> {
    path_var
        .iter()
        .flat_map(std::env::split_paths)
        .filter_map(|dir| Utf8PathBuf::from_path_buf(dir).ok())
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| SettingsError::ExecutableNotFound {
            name: name.to_string(),
        })
}

/// `$XDG_CONFIG_HOME/kbd-color/settings.toml`, then `~/.config/...`, then `/etc/kbd-color/...`
pub fn default_settings_path() -> Utf8PathBuf {
    let from_env = |var: &str| {
        std::env::var_os(var)
            .filter(|v| !v.is_empty())
            .and_then(|v| Utf8PathBuf::from_path_buf(v.into()).ok())
    };

    let base = from_env("XDG_CONFIG_HOME")
        .or_else(|| from_env("HOME").map(|home| home.join(".config")))
        .unwrap_or_else(|| Utf8PathBuf::from("/etc"));

    base.join(env!("CARGO_PKG_NAME")).join("settings.toml")
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file from path '{}'", .path)]
    ReadingFile {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file '{}'", .path)]
    ParsingSettings {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize settings")]
    Serializing(#[source] toml::ser::Error),

    #[error("Failed to write settings file to path '{}'", .path)]
    WritingFile {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Executable '{}' not found", .path)]
    ExecutableMissing {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Executable '{}' is not a file", .path)]
    ExecutableNotAFile { path: Utf8PathBuf },

    #[error("'{name}' not found on PATH")]
    ExecutableNotFound { name: String },
}
