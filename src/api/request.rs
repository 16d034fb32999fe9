use crate::frame::Frame;
use crate::programs::Program;
use crate::source::Delay;
use crate::store::RgbConfig;

/// Body of `POST /config`
#[derive(Debug, serde::Deserialize)]
pub struct SetConfigRequest {
    pub config: RgbConfig,
}

/// Body of `POST /configs/{config}`: zones to overlay onto the config
#[derive(Debug, serde::Deserialize)]
pub struct UpdateZonesRequest {
    pub config: Frame,
}

/// Body of `POST /setcurrentconfig`
#[derive(Debug, serde::Deserialize)]
pub struct SelectConfigRequest {
    pub config: String,
}

/// Query of `GET /setcurrentconfig`
#[derive(Debug, serde::Deserialize)]
pub struct SelectConfigQuery {
    pub config: Option<String>,
}

/// Body of `POST /animation`
#[derive(Debug, serde::Deserialize)]
pub struct StartAnimationRequest {
    pub program: Program,

    /// Falls back to the configured default delay
    pub delay_ms: Option<Delay>,

    /// Configs to step through, only used by [`Program::Cycle`]
    #[serde(default)]
    pub configs: Vec<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct AnimationStatus {
    pub running: bool,
}
