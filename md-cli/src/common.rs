//! Shared setup code for the `md-mdfeed` binary: logging init, CPU affinity,
//! and config loading.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    Ok(())
}

/// Pin the calling thread to `core`, if given.
pub fn pin_if_requested(cpu_core: Option<usize>) -> Result<()> {
    if let Some(core) = cpu_core {
        md_core::perf::cpu::pin_to_core(core)?;
        tracing::info!(core, "pinned to CPU core");
    }
    Ok(())
}

/// Loads `md_core::Config` from `path` and resolves its subscriber section,
/// including reading the channel CSV it names.
pub fn load_config(path: &std::path::Path) -> Result<md_core::config::Config> {
    md_core::config::Config::load(path)
}
