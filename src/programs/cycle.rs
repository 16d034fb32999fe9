use crate::manager::Manager;
use crate::manager::ManagerError;
use crate::source::ArraySource;
use crate::source::Delay;
use crate::source::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Step through the named configs, one per tick, over and over.
///
/// An empty `names` list cycles through every known config.
pub async fn source(
    manager: &mut Manager,
    names: &[String],
    delay: Delay,
) -> Result<ArraySource, CycleError> {
    let names = if names.is_empty() {
        manager
            .config_names()
            .await
            .map_err(ManagerError::from)?
    } else {
        names.to_vec()
    };

    let frames = manager.frames(&names).await?;
    let source = ArraySource::new(frames, delay)?;
    tracing::debug!(?names, frames = source.len(), "Built config cycle");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;

    use super::*;
    use crate::color::Color;
    use crate::frame::Frame;
    use crate::store::ConfigStore;
    use crate::store::RgbConfig;

    async fn manager(temp: &tempfile::TempDir) -> Manager {
        let dir = Utf8Path::from_path(temp.path()).unwrap().join("configs");
        let mut manager = Manager::open(ConfigStore::new(dir), "default").await.unwrap();
        manager.set_config_data(RgbConfig {
            name: String::from("red"),
            zones: Frame::new().with_zone("1", Color::new(0xff0000)),
        });
        manager
    }

    #[tokio::test]
    async fn test_named_configs_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let mut manager = manager(&temp).await;

        let names = [String::from("red"), String::from("default")];
        let source = source(&mut manager, &names, Delay::ZERO).await.unwrap();

        assert_eq!(source.len(), 2);
        assert_eq!(source.frame_at(0).get("1").unwrap().color, Color::new(0xff0000));
        assert_eq!(source.frame_at(1).get("1").unwrap().color, Color::WHITE);
        assert_eq!(source.frame_at(2), source.frame_at(0));
    }

    #[tokio::test]
    async fn test_empty_names_use_all_configs() {
        let temp = tempfile::tempdir().unwrap();
        let mut manager = manager(&temp).await;

        let source = source(&mut manager, &[], Delay::ZERO).await.unwrap();
        assert_eq!(source.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_config() {
        let temp = tempfile::tempdir().unwrap();
        let mut manager = manager(&temp).await;

        let names = [String::from("nope")];
        let result = source(&mut manager, &names, Delay::ZERO).await;
        assert!(matches!(
            result,
            Err(CycleError::Manager(ManagerError::UnknownConfig(_)))
        ));
    }
}
