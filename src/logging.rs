use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

#[derive(Debug, thiserror::Error)]
#[error("Setting up the logger failed")]
pub struct LoggingError(#[source] tracing::subscriber::SetGlobalDefaultError);

pub fn setup<Level>(verbosity: clap_verbosity_flag::Verbosity<Level>) -> Result<(), LoggingError>
where
    Level: clap_verbosity_flag::LogLevel,
{
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();

    if let Some(level_filter) = verbosity
        .is_present()
        .then(|| verbosity.tracing_level_filter())
    {
        let directive = tracing_subscriber::filter::Directive::from(level_filter);
        env_filter = env_filter.add_directive(directive);
    }

    // journald does not render escape codes
    let ansi = std::io::stderr().is_terminal();

    let subscriber = tracing_subscriber::registry::Registry::default().with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(ansi)
            .with_filter(env_filter),
    );

    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError)
}
