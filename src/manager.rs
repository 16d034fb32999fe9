use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::frame::Frame;
use crate::store::ConfigStore;
use crate::store::RgbConfig;
use crate::store::StoreError;
use crate::store::DEFAULT_CONFIG_NAME;

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("Config '{0}' not found")]
    UnknownConfig(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// In-memory view of the stored configs plus the currently selected one.
///
/// Changes stay in memory until [`Manager::save_configs`].
#[derive(Debug)]
pub struct Manager {
    store: ConfigStore,
    configs: BTreeMap<String, RgbConfig>,
    current: String,
}

impl Manager {
    /// Load every stored config and select `default_config`, falling back to `default`
    pub async fn open(store: ConfigStore, default_config: &str) -> Result<Self, StoreError> {
        store.ensure().await?;

        let mut configs = BTreeMap::new();
        for name in store.list().await? {
            match store.load(&name).await {
                Ok(Some(config)) => {
                    configs.insert(name, config);
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(%name, %error, "Skipping unreadable config");
                }
            }
        }

        let current = if configs.contains_key(default_config) {
            default_config.to_string()
        } else {
            tracing::warn!(default_config, "Default config not found, using '{DEFAULT_CONFIG_NAME}'");
            String::from(DEFAULT_CONFIG_NAME)
        };

        tracing::info!(count = configs.len(), %current, dir = %store.dir(), "Loaded configs");
        Ok(Self {
            store,
            configs,
            current,
        })
    }

    pub fn current_config_name(&self) -> &str {
        &self.current
    }

    /// Names on disk and in memory, sorted, without duplicates
    pub async fn config_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = self.store.list().await?.into_iter().collect::<BTreeSet<_>>();
        names.extend(self.configs.keys().cloned());
        Ok(names.into_iter().collect())
    }

    /// Config from memory, or (re)loaded from disk if it is not in memory yet
    pub async fn load_config(&mut self, name: &str) -> Result<Option<&RgbConfig>, StoreError> {
        if !self.configs.contains_key(name) {
            if let Some(config) = self.store.load(name).await? {
                self.configs.insert(name.to_string(), config);
            }
        }
        Ok(self.configs.get(name))
    }

    /// Whether `name` could be stored as a config file
    pub fn check_name(&self, name: &str) -> Result<(), StoreError> {
        self.store.path_of(name).map(drop)
    }

    pub fn set_config_data(&mut self, config: RgbConfig) {
        tracing::debug!(name = %config.name, "Updating config data");
        self.configs.insert(config.name.clone(), config);
    }

    /// Overlay `zones` onto the zones of config `name`
    pub async fn merge_zones(&mut self, name: &str, zones: &Frame) -> Result<(), ManagerError> {
        let Some(config) = self.load_config(name).await? else {
            return Err(ManagerError::UnknownConfig(name.to_string()));
        };

        let merged = RgbConfig {
            name: config.name.clone(),
            zones: config.zones.merged(zones),
        };
        self.set_config_data(merged);
        Ok(())
    }

    pub async fn set_current_config(&mut self, name: &str) -> Result<(), ManagerError> {
        if self.load_config(name).await?.is_none() {
            return Err(ManagerError::UnknownConfig(name.to_string()));
        }

        tracing::info!(name, "Selecting config");
        self.current = name.to_string();
        Ok(())
    }

    /// Frame of the current config, loading it if needed
    pub async fn current_frame(&mut self) -> Result<Frame, ManagerError> {
        let current = self.current.clone();
        self.load_config(&current)
            .await?
            .map(|config| config.zones.clone())
            .ok_or(ManagerError::UnknownConfig(current))
    }

    /// Frames of the named configs, in the given order
    pub async fn frames(&mut self, names: &[String]) -> Result<Vec<Frame>, ManagerError> {
        let mut frames = Vec::with_capacity(names.len());
        for name in names {
            let config = self
                .load_config(name)
                .await?
                .ok_or_else(|| ManagerError::UnknownConfig(name.clone()))?;
            frames.push(config.zones.clone());
        }
        Ok(frames)
    }

    pub async fn save_configs(&self) -> Result<(), StoreError> {
        for config in self.configs.values() {
            self.store.save(config).await?;
        }
        Ok(())
    }
}
