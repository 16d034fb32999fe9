use std::sync::Arc;

use camino::Utf8Path;
use tokio_util::sync::CancellationToken;

use crate::animation::AnimationEngine;
use crate::api::handlers::ApiState;
use crate::error::Error;
use crate::manager::Manager;
use crate::programs::Program;
use crate::settings::Settings;
use crate::sink::CommandSink;
use crate::source::Delay;
use crate::store::ConfigStore;

mod animation;
mod api;
mod cli;
mod color;
mod error;
mod frame;
mod logging;
mod manager;
mod programs;
mod settings;
mod sink;
mod source;
mod store;
mod systemd;

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::eyre::Result<()> {
    setup_panic();
    color_eyre::install().map_err(Error::InstallingColorEyre)?;
    let cli = <crate::cli::Cli as clap::Parser>::parse();
    crate::logging::setup(cli.verbosity).map_err(Error::from)?;

    let settings_path = cli
        .settings
        .unwrap_or_else(crate::settings::default_settings_path);
    tracing::debug!(%settings_path, "Loading settings");
    let settings = Settings::load_or_create(&settings_path).await?;

    match cli.command {
        cli::Command::Service => {
            run_service(settings, &settings_path).await?;
        }
        cli::Command::Update => {
            run_update(settings, &settings_path).await?;
        }
        cli::Command::Animate {
            program,
            delay_ms,
            configs,
        } => {
            let delay = delay_ms
                .map(Delay::from_millis)
                .unwrap_or_else(|| Delay::from(settings.animation.default_delay));
            run_animation(settings, &settings_path, program, delay, &configs).await?;
        }
        cli::Command::VerifySettings => {
            let executable = settings.resolve_executable()?;
            let manager = open_manager(&settings, &settings_path).await?;
            tracing::info!(
                %executable,
                current = manager.current_config_name(),
                "Settings verified"
            );
        }
        cli::Command::Systemd { action } => {
            crate::systemd::run(action, &settings_path).await?;
        }
    }

    Ok(())
}

fn setup_panic() {
    human_panic::setup_panic!(human_panic::Metadata::new(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));
}

async fn open_manager(settings: &Settings, settings_path: &Utf8Path) -> Result<Manager, Error> {
    let store = ConfigStore::new(settings.configs_dir(settings_path));
    Ok(Manager::open(store, &settings.default_config).await?)
}

fn command_engine(settings: &Settings) -> Result<AnimationEngine<CommandSink>, Error> {
    let executable = settings.resolve_executable()?;
    tracing::debug!(%executable, "Using lighting executable");
    Ok(AnimationEngine::new(CommandSink::new(executable)))
}

async fn run_update(settings: Settings, settings_path: &Utf8Path) -> Result<(), Error> {
    let mut manager = open_manager(&settings, settings_path).await?;
    let engine = command_engine(&settings)?;

    let frame = manager.current_frame().await?;
    engine.apply(&frame).await?;
    tracing::info!(config = manager.current_config_name(), "Config applied");
    Ok(())
}

async fn run_animation(
    settings: Settings,
    settings_path: &Utf8Path,
    program: Program,
    delay: Delay,
    configs: &[String],
) -> Result<(), Error> {
    let mut manager = open_manager(&settings, settings_path).await?;
    let engine = command_engine(&settings)?;
    let sequence = program.sequence(&mut manager, configs, delay).await?;

    tokio::task::spawn({
        let stop = engine.stop_handle();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl-C received, stopping animation");
                stop.stop();
            }
        }
    });

    let report = engine.exec_sequence(sequence).await?;
    tracing::info!(?report, "Animation finished");
    Ok(())
}

async fn run_service(settings: Settings, settings_path: &Utf8Path) -> Result<(), Error> {
    let process_state = crate::systemd::ProcessState {
        span: tracing::info_span!("service"),
    };
    process_state.set_starting();

    let result = serve(settings, settings_path, &process_state).await;
    match &result {
        Ok(()) => process_state.set_finished(),
        Err(error) => {
            tracing::error!(?error, "Service failed");
            process_state.set_failed();
        }
    }
    result
}

async fn serve(
    settings: Settings,
    settings_path: &Utf8Path,
    process_state: &crate::systemd::ProcessState,
) -> Result<(), Error> {
    let mut manager = open_manager(&settings, settings_path).await?;
    let engine = Arc::new(command_engine(&settings)?);

    let frame = manager.current_frame().await?;
    if let Err(error) = engine.apply(&frame).await {
        tracing::warn!(?error, "Applying the default config failed");
    }

    let addr = settings.api.bind;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .map_err(Error::Signal)?;

    let cancellation_token = CancellationToken::new();
    let state = ApiState::new(manager, engine, settings);
    let mut server = std::pin::pin!(crate::api::serve(
        listener,
        state,
        cancellation_token.clone()
    ));
    process_state.set_running();

    tokio::select! {
        result = &mut server => return result.map_err(Error::Serve),

        _ctrl_c = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl-C received, shutting down");
        }

        _sigterm = sigterm.recv() => {
            tracing::info!("SIGTERM received, shutting down");
        }
    }

    cancellation_token.cancel();
    server.await.map_err(Error::Serve)
}
