use std::future::Future;

use camino::Utf8PathBuf;

use crate::color::Color;
use crate::frame::Frame;
use crate::frame::Mode;
use crate::frame::ZoneId;

/// Something that can put one zone of the keyboard into a color.
///
/// A call may take as long as the hardware needs, e.g. a child process. Zones of a
/// frame are set one after another, never concurrently.
pub trait HardwareSink: Send {
    fn set_color(
        &mut self,
        zone: &ZoneId,
        color: Color,
        mode: &Mode,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Apply every zone of `frame`, in order, stopping at the first failure
    fn apply_frame(&mut self, frame: &Frame) -> impl Future<Output = Result<(), ZoneError>> + Send {
        async move {
            for (zone, state) in frame {
                self.set_color(zone, state.color, &state.mode)
                    .await
                    .map_err(|source| ZoneError {
                        zone: zone.clone(),
                        source,
                    })?;
            }
            Ok(())
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Setting color of zone {zone} failed")]
pub struct ZoneError {
    pub zone: ZoneId,

    #[source]
    pub source: SinkError,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to run '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}: {stderr}")]
    ExitStatus {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Sets zone colors by running `<executable> led-mode <mode> -c <rrggbb> -z <zone>`.
#[derive(Debug, Clone)]
pub struct CommandSink {
    executable: Utf8PathBuf,
}

impl CommandSink {
    pub fn new(executable: Utf8PathBuf) -> Self {
        Self { executable }
    }

    pub fn args(zone: &ZoneId, color: Color, mode: &Mode) -> [String; 6] {
        [
            String::from("led-mode"),
            mode.to_string(),
            String::from("-c"),
            color.to_hex(),
            String::from("-z"),
            zone.to_string(),
        ]
    }
}

impl HardwareSink for CommandSink {
    async fn set_color(
        &mut self,
        zone: &ZoneId,
        color: Color,
        mode: &Mode,
    ) -> Result<(), SinkError> {
        let args = Self::args(zone, color, mode);
        let command = format!("{} {}", self.executable, args.join(" "));
        tracing::debug!(%command, "Setting zone color");

        let output = tokio::process::Command::new(&self.executable)
            .args(&args)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|source| SinkError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SinkError::ExitStatus {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_shape() {
        let args = CommandSink::args(&ZoneId::new("2"), Color::new(0xff00), &Mode::default());
        assert_eq!(args, ["led-mode", "static", "-c", "00ff00", "-z", "2"]);
    }

    #[tokio::test]
    async fn test_successful_command() {
        let mut sink = CommandSink::new(Utf8PathBuf::from("/bin/true"));
        let result = sink.set_color(&ZoneId::new("1"), Color::WHITE, &Mode::default()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_failing_command() {
        let mut sink = CommandSink::new(Utf8PathBuf::from("/bin/false"));
        let result = sink.set_color(&ZoneId::new("1"), Color::WHITE, &Mode::default()).await;
        match result {
            Err(SinkError::ExitStatus { command, status, .. }) => {
                assert_eq!(command, "/bin/false led-mode static -c ffffff -z 1");
                assert!(!status.success());
            }
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let mut sink = CommandSink::new(Utf8PathBuf::from("/nonexistent/asusctl"));
        let result = sink.set_color(&ZoneId::new("1"), Color::WHITE, &Mode::default()).await;
        assert!(matches!(result, Err(SinkError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_apply_frame_stops_at_first_failure() {
        let sink = testing::RecordingSink::new();
        sink.fail_on_call(1);
        let frame = Frame::new()
            .with_zone("1", Color::new(1))
            .with_zone("2", Color::new(2))
            .with_zone("3", Color::new(3));

        let error = sink.clone().apply_frame(&frame).await.unwrap_err();
        assert_eq!(error.zone.as_str(), "2");
        assert_eq!(sink.colors(), [1]);
    }
}
