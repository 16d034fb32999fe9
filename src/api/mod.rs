//! HTTP API for configs, zones and animations.

pub mod handlers;
pub mod request;

use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use self::handlers::ApiState;
use crate::sink::HardwareSink;

pub fn router<S>(state: ApiState<S>) -> Router
where
    S: HardwareSink + 'static,
{
    Router::new()
        .route("/", get(handlers::index))
        .route("/config", post(handlers::set_config::<S>))
        .route("/configs", get(handlers::list_configs::<S>))
        .route(
            "/configs/{config}",
            get(handlers::get_config::<S>).post(handlers::update_zones::<S>),
        )
        .route("/configs/{config}/{zone}", get(handlers::get_zone::<S>))
        .route(
            "/setcurrentconfig",
            get(handlers::select_config_query::<S>).post(handlers::select_config::<S>),
        )
        .route("/currentconfig", get(handlers::current_config::<S>))
        .route("/settings", get(handlers::settings::<S>))
        .route("/update", get(handlers::update::<S>))
        .route("/save", post(handlers::save::<S>))
        .route(
            "/animation",
            get(handlers::animation_status::<S>).post(handlers::start_animation::<S>),
        )
        .route("/animation/stop", post(handlers::stop_animation::<S>))
        .with_state(state)
}

/// Serve the API on `listener` until `cancellation_token` is cancelled.
///
/// A running animation is stopped before returning.
pub async fn serve<S>(
    listener: TcpListener,
    state: ApiState<S>,
    cancellation_token: CancellationToken,
) -> std::io::Result<()>
where
    S: HardwareSink + 'static,
{
    match listener.local_addr() {
        Ok(addr) => tracing::info!(%addr, "Serving HTTP API"),
        Err(error) => tracing::warn!(?error, "Serving HTTP API on unknown address"),
    }

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(cancellation_token.cancelled_owned())
        .await?;

    tracing::info!("Cancelled, shutting down HTTP API");
    state.stop_animation().await;
    Ok(())
}
