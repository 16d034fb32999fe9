use camino::Utf8Path;
use camino::Utf8PathBuf;

pub const UNIT_NAME: &str = "kbd-color.service";
pub const UNIT_DIR: &str = "/etc/systemd/system";

#[derive(Debug, thiserror::Error)]
pub enum SystemdError {
    #[error("Failed to find the path of the running executable")]
    CurrentExe(#[source] std::io::Error),

    #[error("Failed to find the current directory")]
    CurrentDir(#[source] std::io::Error),

    #[error("Path is not UTF-8: {}", .0.display())]
    NonUtf8Path(std::path::PathBuf),

    #[error("Failed to write unit file '{}'", .path)]
    WritingUnit {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove unit file '{}'", .path)]
    RemovingUnit {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run 'systemctl {action}'")]
    Spawn {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'systemctl {action}' exited with {status}")]
    Systemctl {
        action: String,
        status: std::process::ExitStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum UnitAction {
    /// Write the unit file, then enable and start it
    Install,

    /// Stop and disable the unit, then delete the unit file
    Remove,

    Enable,
    Disable,
    Start,
    Stop,
    Restart,
}

/// Service unit running `executable` with the given settings file
pub fn unit_file(executable: &Utf8Path, settings_path: &Utf8Path) -> String {
    format!(
        "\
[Unit]
Description=Keyboard backlight zone colors
After=multi-user.target

[Service]
Type=notify
ExecStart={executable} --settings {settings_path} service
Restart=always
RestartSec=10

[Install]
WantedBy=multi-user.target
"
    )
}

pub fn unit_path() -> Utf8PathBuf {
    Utf8Path::new(UNIT_DIR).join(UNIT_NAME)
}

pub fn current_exe() -> Result<Utf8PathBuf, SystemdError> {
    let exe = std::env::current_exe().map_err(SystemdError::CurrentExe)?;
    Utf8PathBuf::from_path_buf(exe).map_err(SystemdError::NonUtf8Path)
}

/// `path`, made absolute against the current directory
fn absolute(path: &Utf8Path) -> Result<Utf8PathBuf, SystemdError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir().map_err(SystemdError::CurrentDir)?;
    let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(SystemdError::NonUtf8Path)?;
    Ok(cwd.join(path))
}

pub async fn run(action: UnitAction, settings_path: &Utf8Path) -> Result<(), SystemdError> {
    match action {
        UnitAction::Install => {
            let unit = unit_file(&current_exe()?, &absolute(settings_path)?);
            install_unit(&unit_path(), &unit).await?;
            systemctl(&["daemon-reload"]).await?;
            systemctl(&["enable", UNIT_NAME]).await?;
            systemctl(&["start", UNIT_NAME]).await
        }

        UnitAction::Remove => {
            systemctl(&["stop", UNIT_NAME]).await?;
            systemctl(&["disable", UNIT_NAME]).await?;
            remove_unit(&unit_path()).await?;
            systemctl(&["daemon-reload"]).await
        }

        UnitAction::Enable => systemctl(&["enable", UNIT_NAME]).await,
        UnitAction::Disable => systemctl(&["disable", UNIT_NAME]).await,
        UnitAction::Start => systemctl(&["start", UNIT_NAME]).await,
        UnitAction::Stop => systemctl(&["stop", UNIT_NAME]).await,
        UnitAction::Restart => systemctl(&["restart", UNIT_NAME]).await,
    }
}

pub async fn install_unit(path: &Utf8Path, contents: &str) -> Result<(), SystemdError> {
    tracing::info!(%path, "Writing unit file");
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| SystemdError::WritingUnit {
            path: path.to_path_buf(),
            source,
        })
}

pub async fn remove_unit(path: &Utf8Path) -> Result<(), SystemdError> {
    tracing::info!(%path, "Removing unit file");
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(%path, "Unit file did not exist");
            Ok(())
        }
        Err(source) => Err(SystemdError::RemovingUnit {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn systemctl(args: &[&str]) -> Result<(), SystemdError> {
    let action = args.join(" ");
    tracing::debug!(%action, "Running systemctl");

    let status = tokio::process::Command::new("systemctl")
        .args(args)
        .status()
        .await
        .map_err(|source| SystemdError::Spawn {
            action: action.clone(),
            source,
        })?;

    if !status.success() {
        return Err(SystemdError::Systemctl { action, status });
    }

    tracing::info!(%action, "systemctl succeeded");
    Ok(())
}

#[derive(Debug)]
pub struct ProcessState {
    pub span: tracing::Span,
}

impl ProcessState {
    pub fn set_starting(&self) {
        self.notify("starting", &[NotifyState::Status("starting")]);
    }

    pub fn set_running(&self) {
        self.notify("ready", &[NotifyState::Ready, NotifyState::Status("running")]);
    }

    pub fn set_failed(&self) {
        self.notify(
            "failed,stopping",
            &[NotifyState::Status("failed"), NotifyState::Stopping],
        );
    }

    pub fn set_finished(&self) {
        self.notify("stopping", &[NotifyState::Stopping]);
    }

    fn notify(&self, status: &str, states: &[NotifyState<'_>]) {
        tracing::debug!(parent: &self.span, status, "Setting service status");
        if let Err(error) = notify(states) {
            tracing::error!(parent: &self.span, ?error, "Failed to notify systemd of state change");
        } else {
            tracing::info!(
                parent: &self.span,
                status,
                "Successfully notified systemd of service status"
            );
        }
    }
}

/// Daemon notification for the service manager.
#[derive(Clone, Debug)]
enum NotifyState<'a> {
    /// Service startup is finished.
    Ready,

    /// Service is stopping.
    Stopping,

    /// Free-form status message for the service manager.
    Status(&'a str),
}

impl std::fmt::Display for NotifyState<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyState::Ready => write!(f, "READY=1"),
            NotifyState::Stopping => write!(f, "STOPPING=1"),
            NotifyState::Status(msg) => write!(f, "STATUS={msg}"),
        }
    }
}

fn notify_message(states: &[NotifyState<'_>]) -> String {
    use std::fmt::Write;

    let mut msg = String::new();
    for s in states {
        let _ = writeln!(msg, "{s}");
    }
    msg
}

fn connect_notify_socket() -> std::io::Result<Option<std::os::unix::net::UnixDatagram>> {
    let Some(socket_path) = std::env::var_os("NOTIFY_SOCKET") else {
        return Ok(None);
    };

    let sock = std::os::unix::net::UnixDatagram::unbound()?;
    sock.connect(socket_path)?;
    Ok(Some(sock))
}

/// No-op when not started by systemd
fn notify(states: &[NotifyState<'_>]) -> std::io::Result<()> {
    let Some(sock) = connect_notify_socket()? else {
        return Ok(());
    };

    let msg = notify_message(states);
    let len = sock.send(msg.as_bytes())?;

    if len != msg.len() {
        Err(std::io::Error::new(
            std::io::ErrorKind::WriteZero,
            "incomplete write",
        ))
    } else {
        Ok(())
    }
}
