use anyhow::{Context, Result};
use clap::Parser;
use pagewright::assets::provider_for;
use pagewright::cli::Cli;
use pagewright::logging::{init_logging, LogConfig};
use pagewright::render::{DefaultTemplates, PageRenderer, Templates, ViewTemplates};
use pagewright::runtime_config::{RuntimeConfig, StaticConfigSource};
use pagewright::server::{self, AssetMount, FrontendService, ServerHandle};
use std::sync::Arc;
use tracing::{error, info};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_env())?;

    let mut config = RuntimeConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    may::config().set_stack_size(config.stack_size);
    info!(mode = %config.mode, "Starting frontend service");

    // Serving without assets is never correct: stop before accepting connections.
    let provider = match provider_for(&config) {
        Ok(provider) => provider,
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };

    let templates: Arc<dyn Templates> = match &config.views_dir {
        Some(dir) => Arc::new(
            ViewTemplates::from_dir(dir)
                .with_context(|| format!("Failed to load views from {}", dir.display()))?,
        ),
        None => Arc::new(DefaultTemplates),
    };
    let mount = AssetMount::provider(Arc::clone(&provider));
    let renderer = PageRenderer::new(provider, templates);

    let mut builder = FrontendService::builder(renderer)
        .options(cli.server_options())
        .assets(mount);
    for route in cli.page_routes() {
        builder = builder.handler(route);
    }

    let handle = server::start(&StaticConfigSource::new(&config), builder.build())?;
    wait_for_shutdown(handle)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGTERM, SIGINT]).context("Failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "shutting down");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("server coroutine panicked"))
}
