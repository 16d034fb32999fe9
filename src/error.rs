#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Setting up error reporting failed")]
    InstallingColorEyre(#[source] color_eyre::Report),

    #[error(transparent)]
    Logging(#[from] crate::logging::LoggingError),

    #[error(transparent)]
    Settings(#[from] crate::settings::SettingsError),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    #[error(transparent)]
    Manager(#[from] crate::manager::ManagerError),

    #[error(transparent)]
    Cycle(#[from] crate::programs::cycle::CycleError),

    #[error("Applying config failed")]
    Apply(#[from] crate::sink::ZoneError),

    #[error(transparent)]
    Animation(#[from] crate::animation::AnimationError),

    #[error(transparent)]
    Systemd(#[from] crate::systemd::SystemdError),

    #[error("Failed to bind HTTP API to {addr}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to listen for termination signals")]
    Signal(#[source] std::io::Error),

    #[error("HTTP API failed")]
    Serve(#[source] std::io::Error),
}
