use std::sync::Arc;

use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use tokio::sync::Mutex;

use super::request::AnimationStatus;
use super::request::SelectConfigQuery;
use super::request::SelectConfigRequest;
use super::request::SetConfigRequest;
use super::request::StartAnimationRequest;
use super::request::UpdateZonesRequest;
use crate::animation::AnimationEngine;
use crate::animation::AnimationHandle;
use crate::frame::FrameError;
use crate::frame::ZoneState;
use crate::manager::Manager;
use crate::manager::ManagerError;
use crate::programs::cycle::CycleError;
use crate::settings::Settings;
use crate::sink::HardwareSink;
use crate::sink::ZoneError;
use crate::source::Delay;
use crate::source::SourceError;
use crate::store::RgbConfig;
use crate::store::StoreError;

pub const ROUTES: &[(&str, &str)] = &[
    ("GET", "/"),
    ("POST", "/config"),
    ("GET", "/configs"),
    ("GET", "/configs/{config}"),
    ("POST", "/configs/{config}"),
    ("GET", "/configs/{config}/{zone}"),
    ("GET", "/setcurrentconfig?config={config}"),
    ("POST", "/setcurrentconfig"),
    ("GET", "/currentconfig"),
    ("GET", "/settings"),
    ("GET", "/update"),
    ("POST", "/save"),
    ("GET", "/animation"),
    ("POST", "/animation"),
    ("POST", "/animation/stop"),
];

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Invalid zones: {0}")]
    InvalidFrame(#[from] FrameError),

    #[error("Invalid animation: {0}")]
    InvalidAnimation(#[from] SourceError),

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Applying config failed: {0}")]
    Apply(#[from] ZoneError),
}

impl From<CycleError> for ApiError {
    fn from(value: CycleError) -> Self {
        match value {
            CycleError::Manager(error) => ApiError::Manager(error),
            CycleError::Source(error) => ApiError::InvalidAnimation(error),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::InvalidFrame(_)
            | ApiError::InvalidAnimation(_)
            | ApiError::Store(StoreError::InvalidName(_))
            | ApiError::Manager(ManagerError::Store(StoreError::InvalidName(_))) => {
                StatusCode::BAD_REQUEST
            }

            ApiError::NotFound(_) | ApiError::Manager(ManagerError::UnknownConfig(_)) => {
                StatusCode::NOT_FOUND
            }

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
        }

        (status, self.to_string()).into_response()
    }
}

/// Shared state of all handlers
pub struct ApiState<S> {
    pub manager: Arc<Mutex<Manager>>,
    pub engine: Arc<AnimationEngine<S>>,
    pub animation: Arc<Mutex<Option<AnimationHandle>>>,
    pub settings: Arc<Settings>,
}

impl<S> ApiState<S> {
    pub fn new(manager: Manager, engine: Arc<AnimationEngine<S>>, settings: Settings) -> Self {
        Self {
            manager: Arc::new(Mutex::new(manager)),
            engine,
            animation: Arc::new(Mutex::new(None)),
            settings: Arc::new(settings),
        }
    }
}

impl<S> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            engine: self.engine.clone(),
            animation: self.animation.clone(),
            settings: self.settings.clone(),
        }
    }
}

async fn finish(handle: AnimationHandle) {
    match handle.shutdown().await {
        Ok(report) => tracing::debug!(?report, "Animation stopped"),
        Err(error) => tracing::warn!(?error, "Animation had failed"),
    }
}

impl<S> ApiState<S>
where
    S: HardwareSink + 'static,
{
    /// Stop the animation started through the API, if any
    pub async fn stop_animation(&self) {
        let previous = self.animation.lock().await.take();
        if let Some(handle) = previous {
            finish(handle).await;
        }
    }
}

pub async fn index() -> String {
    ROUTES
        .iter()
        .map(|(method, path)| format!("{method} {path}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn set_config<S>(
    State(state): State<ApiState<S>>,
    Json(request): Json<SetConfigRequest>,
) -> Result<&'static str, ApiError>
where
    S: HardwareSink + 'static,
{
    let config = request.config;
    if config.name.is_empty() {
        return Err(ApiError::BadRequest("No config name specified"));
    }
    config.zones.validate()?;

    let mut manager = state.manager.lock().await;
    manager.check_name(&config.name)?;
    manager.set_config_data(config);
    Ok("OK")
}

pub async fn list_configs<S>(
    State(state): State<ApiState<S>>,
) -> Result<Json<Vec<String>>, ApiError>
where
    S: HardwareSink + 'static,
{
    let names = state.manager.lock().await.config_names().await?;
    Ok(Json(names))
}

pub async fn get_config<S>(
    State(state): State<ApiState<S>>,
    Path(name): Path<String>,
) -> Result<Json<RgbConfig>, ApiError>
where
    S: HardwareSink + 'static,
{
    let mut manager = state.manager.lock().await;
    manager.check_name(&name)?;
    manager
        .load_config(&name)
        .await?
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound("Config not found"))
}

pub async fn update_zones<S>(
    State(state): State<ApiState<S>>,
    Path(name): Path<String>,
    Json(request): Json<UpdateZonesRequest>,
) -> Result<&'static str, ApiError>
where
    S: HardwareSink + 'static,
{
    request.config.validate()?;

    let mut manager = state.manager.lock().await;
    manager.check_name(&name)?;
    manager.merge_zones(&name, &request.config).await?;
    Ok("OK")
}

pub async fn get_zone<S>(
    State(state): State<ApiState<S>>,
    Path((name, zone)): Path<(String, String)>,
) -> Result<Json<ZoneState>, ApiError>
where
    S: HardwareSink + 'static,
{
    let mut manager = state.manager.lock().await;
    manager.check_name(&name)?;
    let config = manager
        .load_config(&name)
        .await?
        .ok_or(ApiError::NotFound("Config not found"))?;

    config
        .zones
        .get(&zone)
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound("Zone not found"))
}

pub async fn select_config<S>(
    State(state): State<ApiState<S>>,
    Json(request): Json<SelectConfigRequest>,
) -> Result<&'static str, ApiError>
where
    S: HardwareSink + 'static,
{
    select(&state, &request.config).await
}

pub async fn select_config_query<S>(
    State(state): State<ApiState<S>>,
    Query(query): Query<SelectConfigQuery>,
) -> Result<&'static str, ApiError>
where
    S: HardwareSink + 'static,
{
    let Some(name) = query.config.filter(|name| !name.is_empty()) else {
        return Err(ApiError::BadRequest("No config specified"));
    };
    select(&state, &name).await
}

async fn select<S>(state: &ApiState<S>, name: &str) -> Result<&'static str, ApiError> {
    let mut manager = state.manager.lock().await;
    manager.check_name(name)?;
    manager.set_current_config(name).await?;
    Ok("OK")
}

pub async fn current_config<S>(State(state): State<ApiState<S>>) -> String
where
    S: HardwareSink + 'static,
{
    state.manager.lock().await.current_config_name().to_string()
}

pub async fn settings<S>(State(state): State<ApiState<S>>) -> Json<Settings>
where
    S: HardwareSink + 'static,
{
    Json(state.settings.as_ref().clone())
}

/// Stop any animation and apply the current config
pub async fn update<S>(State(state): State<ApiState<S>>) -> Result<&'static str, ApiError>
where
    S: HardwareSink + 'static,
{
    state.stop_animation().await;

    let frame = state.manager.lock().await.current_frame().await?;
    state.engine.apply(&frame).await?;
    Ok("OK")
}

pub async fn save<S>(State(state): State<ApiState<S>>) -> Result<&'static str, ApiError>
where
    S: HardwareSink + 'static,
{
    state.manager.lock().await.save_configs().await?;
    Ok("OK")
}

pub async fn animation_status<S>(State(state): State<ApiState<S>>) -> Json<AnimationStatus>
where
    S: HardwareSink + 'static,
{
    Json(AnimationStatus {
        running: state.engine.is_running(),
    })
}

pub async fn start_animation<S>(
    State(state): State<ApiState<S>>,
    Json(request): Json<StartAnimationRequest>,
) -> Result<&'static str, ApiError>
where
    S: HardwareSink + 'static,
{
    let delay = request
        .delay_ms
        .unwrap_or_else(|| Delay::from(state.settings.animation.default_delay));

    let sequence = {
        let mut manager = state.manager.lock().await;
        request
            .program
            .sequence(&mut manager, &request.configs, delay)
            .await?
    };

    let mut animation = state.animation.lock().await;
    if let Some(previous) = animation.take() {
        finish(previous).await;
    }

    tracing::info!(program = ?request.program, ?delay, "Starting animation");
    *animation = Some(state.engine.spawn(sequence));
    Ok("OK")
}

pub async fn stop_animation<S>(State(state): State<ApiState<S>>) -> &'static str
where
    S: HardwareSink + 'static,
{
    state.stop_animation().await;
    state.engine.stop();
    "OK"
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use camino::Utf8Path;

    use super::*;
    use crate::color::Color;
    use crate::frame::Frame;
    use crate::programs::Program;
    use crate::sink::testing::RecordingSink;
    use crate::store::ConfigStore;

    async fn state(temp: &tempfile::TempDir) -> (ApiState<RecordingSink>, RecordingSink) {
        let dir = Utf8Path::from_path(temp.path()).unwrap().join("configs");
        let manager = Manager::open(ConfigStore::new(dir), "default").await.unwrap();
        let sink = RecordingSink::new();
        let engine = Arc::new(AnimationEngine::new(sink.clone()));
        (ApiState::new(manager, engine, Settings::default()), sink)
    }

    fn night() -> RgbConfig {
        RgbConfig {
            name: String::from("night"),
            zones: Frame::new()
                .with_zone("1", Color::new(0x111111))
                .with_zone("2", Color::new(0x222222)),
        }
    }

    fn status(error: ApiError) -> StatusCode {
        error.into_response().status()
    }

    #[tokio::test]
    async fn test_set_and_get_config() {
        let temp = tempfile::tempdir().unwrap();
        let (state, _) = state(&temp).await;

        let request = SetConfigRequest { config: night() };
        set_config(State(state.clone()), Json(request)).await.unwrap();

        let Json(config) = get_config(State(state.clone()), Path(String::from("night")))
            .await
            .unwrap();
        assert_eq!(config, night());

        let Json(names) = list_configs(State(state)).await.unwrap();
        assert_eq!(names, ["default", "night"]);
    }

    #[tokio::test]
    async fn test_set_config_rejects_bad_names() {
        let temp = tempfile::tempdir().unwrap();
        let (state, _) = state(&temp).await;

        for name in ["", "../escape"] {
            let mut config = night();
            config.name = name.to_string();
            let result = set_config(State(state.clone()), Json(SetConfigRequest { config })).await;
            assert_eq!(status(result.unwrap_err()), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_set_config_rejects_out_of_range_color() {
        let temp = tempfile::tempdir().unwrap();
        let (state, _) = state(&temp).await;

        let mut config = night();
        config.zones = config.zones.with_zone("3", Color::new(0x1000000));
        let result = set_config(State(state), Json(SetConfigRequest { config })).await;
        assert_eq!(status(result.unwrap_err()), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_config_and_zone() {
        let temp = tempfile::tempdir().unwrap();
        let (state, _) = state(&temp).await;

        let result = get_config(State(state.clone()), Path(String::from("missing"))).await;
        assert_eq!(status(result.unwrap_err()), StatusCode::NOT_FOUND);

        let path = Path((String::from("default"), String::from("9")));
        let result = get_zone(State(state.clone()), path).await;
        assert_eq!(status(result.unwrap_err()), StatusCode::NOT_FOUND);

        let path = Path((String::from("default"), String::from("2")));
        let Json(zone) = get_zone(State(state), path).await.unwrap();
        assert_eq!(zone.color, Color::WHITE);
    }

    #[tokio::test]
    async fn test_update_zones_merges() {
        let temp = tempfile::tempdir().unwrap();
        let (state, _) = state(&temp).await;

        let request = UpdateZonesRequest {
            config: Frame::new().with_zone("3", Color::new(0xff8000)),
        };
        update_zones(State(state.clone()), Path(String::from("default")), Json(request))
            .await
            .unwrap();

        let Json(config) = get_config(State(state), Path(String::from("default")))
            .await
            .unwrap();
        assert_eq!(config.zones.len(), 4);
        assert_eq!(config.zones.get("3").unwrap().color, Color::new(0xff8000));
        assert_eq!(config.zones.get("1").unwrap().color, Color::WHITE);
    }

    #[tokio::test]
    async fn test_select_config() {
        let temp = tempfile::tempdir().unwrap();
        let (state, _) = state(&temp).await;
        set_config(State(state.clone()), Json(SetConfigRequest { config: night() }))
            .await
            .unwrap();

        let query = SelectConfigQuery { config: None };
        let result = select_config_query(State(state.clone()), Query(query)).await;
        assert_eq!(status(result.unwrap_err()), StatusCode::BAD_REQUEST);

        let request = SelectConfigRequest {
            config: String::from("missing"),
        };
        let result = select_config(State(state.clone()), Json(request)).await;
        assert_eq!(status(result.unwrap_err()), StatusCode::NOT_FOUND);

        let query = SelectConfigQuery {
            config: Some(String::from("night")),
        };
        select_config_query(State(state.clone()), Query(query)).await.unwrap();
        assert_eq!(current_config(State(state)).await, "night");
    }

    #[tokio::test]
    async fn test_update_applies_current_config() {
        let temp = tempfile::tempdir().unwrap();
        let (state, sink) = state(&temp).await;

        update(State(state)).await.unwrap();
        assert_eq!(sink.colors(), [0xffffff; 4]);
    }

    #[tokio::test]
    async fn test_update_reports_sink_failure() {
        let temp = tempfile::tempdir().unwrap();
        let (state, sink) = state(&temp).await;
        sink.fail_on_call(2);

        let result = update(State(state)).await;
        assert_eq!(status(result.unwrap_err()), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(sink.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_save_writes_configs() {
        let temp = tempfile::tempdir().unwrap();
        let (state, _) = state(&temp).await;
        set_config(State(state.clone()), Json(SetConfigRequest { config: night() }))
            .await
            .unwrap();

        save(State(state)).await.unwrap();
        assert!(temp.path().join("configs").join("night.json").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_animation_lifecycle() {
        let temp = tempfile::tempdir().unwrap();
        let (state, sink) = state(&temp).await;

        let Json(idle) = animation_status(State(state.clone())).await;
        assert!(!idle.running);

        let request = StartAnimationRequest {
            program: Program::Rainbow,
            delay_ms: Some(Delay::from_millis(10)),
            configs: Vec::new(),
        };
        start_animation(State(state.clone()), Json(request)).await.unwrap();

        let Json(started) = animation_status(State(state.clone())).await;
        assert!(started.running);

        tokio::time::sleep(Duration::from_millis(35)).await;
        stop_animation(State(state.clone())).await;

        let Json(stopped) = animation_status(State(state)).await;
        assert!(!stopped.running);
        assert!(!sink.calls().is_empty());
        assert_eq!(sink.calls().len() % 4, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_replaces_running_animation() {
        let temp = tempfile::tempdir().unwrap();
        let (state, _) = state(&temp).await;

        for program in [Program::Wave, Program::Cycle] {
            let request = StartAnimationRequest {
                program,
                delay_ms: Some(Delay::from_millis(10)),
                configs: Vec::new(),
            };
            start_animation(State(state.clone()), Json(request)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        assert!(state.engine.is_running());
        assert!(state.animation.lock().await.is_some());

        update(State(state.clone())).await.unwrap();
        assert!(!state.engine.is_running());
    }

    #[tokio::test]
    async fn test_start_cycle_with_unknown_config() {
        let temp = tempfile::tempdir().unwrap();
        let (state, _) = state(&temp).await;

        let request = StartAnimationRequest {
            program: Program::Cycle,
            delay_ms: None,
            configs: vec![String::from("missing")],
        };
        let result = start_animation(State(state.clone()), Json(request)).await;
        assert_eq!(status(result.unwrap_err()), StatusCode::NOT_FOUND);
        assert!(!state.engine.is_running());
    }

    #[tokio::test]
    async fn test_index_lists_routes() {
        let index = index().await;
        assert_eq!(index.lines().count(), ROUTES.len());
        assert!(index.contains("POST /animation/stop"));
    }
}
