use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for the CLI.
///
/// Logs go to stderr so command output on stdout stays machine readable.
/// `RUST_LOG` overrides `log_level` when set.
pub fn init_logging(log_level: Level, json: bool) -> Result<()> {
    let level_str = log_level.as_str().to_lowercase();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("tradeline_admin={level_str},tradeline_core={level_str},tradeline_http={level_str}")
            .into()
    });

    let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()?;

    Ok(())
}
