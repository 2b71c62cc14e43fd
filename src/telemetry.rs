use std::sync::OnceLock;

#[cfg(feature = "telemetry")]
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize tracing subscriber once per process.
pub fn init_tracing() {
    #[cfg(feature = "telemetry")]
    static INIT: OnceLock<()> = OnceLock::new();

    #[cfg(feature = "telemetry")]
    {
        INIT.get_or_init(|| {
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vetbot=info"));
            let _ = fmt().with_env_filter(filter).try_init();
        });
    }
}

#[cfg(not(feature = "telemetry"))]
pub fn init_tracing() {}

/// Instrument an inline block with a span if telemetry is enabled.
#[macro_export]
macro_rules! instrument_block {
    ($name:expr, { $($field:ident = $value:expr),* $(,)? }, $block:block) => {{
        #[cfg(feature = "telemetry")]
        {
            let span = tracing::info_span!($name, $($field = $value),*);
            let _guard = span.enter();
            (|| $block)()
        }
        #[cfg(not(feature = "telemetry"))]
        {
            (|| $block)()
        }
    }};
}

/// Wrap an async collaborator future in a `repo` span (owner, name), nested
/// around whatever per-package spans [`instrument_block!`] opens inside it.
/// A no-op pass-through when telemetry is disabled.
#[cfg(feature = "telemetry")]
pub async fn instrument_repo<F: std::future::Future>(owner: &str, name: &str, fut: F) -> F::Output {
    use tracing::Instrument;
    fut.instrument(tracing::info_span!("repo", owner, name)).await
}

#[cfg(not(feature = "telemetry"))]
pub async fn instrument_repo<F: std::future::Future>(_owner: &str, _name: &str, fut: F) -> F::Output {
    fut.await
}

/// Wrap one `track-bot` polling tick in a span carrying the issue count.
#[cfg(feature = "telemetry")]
pub async fn instrument_tick<F: std::future::Future>(issue_count: usize, fut: F) -> F::Output {
    use tracing::Instrument;
    fut.instrument(tracing::info_span!("trackbot_tick", issue_count)).await
}

#[cfg(not(feature = "telemetry"))]
pub async fn instrument_tick<F: std::future::Future>(_issue_count: usize, fut: F) -> F::Output {
    fut.await
}
