//! `reinhardt-ssr` - serve the demo application with server-side rendering.

use anyhow::{Context, Result};
use clap::Parser;
use reinhardt_ssr_server::{
	HttpServer, ShutdownCoordinator, SsrApplication, SsrSettings, init_logging, shutdown_signal,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "reinhardt-ssr", version, about = "Server-side rendering server")]
struct Cli {
	/// Configuration file (TOML or JSON)
	#[arg(short, long, env = "SSR_CONFIG")]
	config: Option<PathBuf>,

	/// Address to bind, overriding the configuration
	#[arg(short, long)]
	bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let mut settings = SsrSettings::load(cli.config.as_deref()).context("failed to load settings")?;
	if let Some(bind) = cli.bind {
		settings.bind_address = bind;
	}

	init_logging(&settings.log_level);

	let addr = settings.bind_address;
	let coordinator = ShutdownCoordinator::new(settings.shutdown_timeout());
	let application =
		SsrApplication::from_settings(settings).context("failed to initialize the SSR application")?;

	let shutdown_tx = coordinator.clone();
	tokio::spawn(async move {
		shutdown_signal().await;
		shutdown_tx.shutdown();
	});

	HttpServer::new(Arc::new(application.handler()))
		.listen_with_shutdown(addr, coordinator)
		.await
		.map_err(|err| anyhow::anyhow!("server on {} failed: {}", addr, err))?;

	tracing::info!("Server stopped");
	Ok(())
}
