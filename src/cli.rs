use clap::Parser;

use crate::programs::Program;
use crate::systemd::UnitAction;

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(flatten)]
    pub verbosity: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Path of the settings file, created with defaults if missing
    #[clap(long, short, env = "KBD_COLOR_SETTINGS")]
    pub settings: Option<camino::Utf8PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Apply the default config and serve the HTTP API
    Service,

    /// Apply the default config once
    Update,

    /// Run an animation in the foreground until Ctrl-C
    Animate {
        program: Program,

        /// Delay between frames, defaults to the configured delay
        #[clap(long)]
        delay_ms: Option<u64>,

        /// Configs to cycle through, all configs if none are given
        configs: Vec<String>,
    },

    VerifySettings,

    /// Manage the systemd service
    Systemd {
        action: UnitAction,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_parse_animate() {
        let cli = Cli::try_parse_from([
            "kbd-color",
            "--settings",
            "/tmp/settings.toml",
            "animate",
            "cycle",
            "--delay-ms",
            "250",
            "default",
            "night",
        ])
        .unwrap();

        assert_eq!(cli.settings.as_deref(), Some(camino::Utf8Path::new("/tmp/settings.toml")));
        match cli.command {
            Command::Animate {
                program,
                delay_ms,
                configs,
            } => {
                assert_eq!(program, Program::Cycle);
                assert_eq!(delay_ms, Some(250));
                assert_eq!(configs, ["default", "night"]);
            }
            other => panic!("Unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_systemd() {
        let cli = Cli::try_parse_from(["kbd-color", "systemd", "install"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Systemd {
                action: UnitAction::Install
            }
        ));
    }
}
