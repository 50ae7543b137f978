use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use manifest_collector::{ClientOptions, CollectorOptions, ManifestCollector};
use output::{BrokenPipeGuard, OutputFormat};
use telemetry::LogFormat;
use tracing::{info, Level};

mod output;
mod telemetry;

#[derive(Parser)]
#[command(name = "collect-manifests")]
#[command(
	about = "Print the last-applied manifests of workloads and policies in a Kubernetes cluster",
	long_about = None
)]
#[command(version)]
struct Cli {
	/// Path to the kubeconfig file. Defaults to ~/.kube/config
	#[arg(long, env = "KUBECONFIG")]
	kubeconfig: Option<String>,

	/// Kubeconfig context to use instead of the current context
	#[arg(long)]
	context: Option<String>,

	/// Read timeout for API requests, in seconds
	#[arg(long)]
	request_timeout: Option<u64>,

	/// Output format
	#[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Json)]
	output: OutputFormat,

	/// Log level (possible values: trace, debug, info, warn, error). Overrides RUST_LOG
	#[arg(long)]
	log_level: Option<Level>,

	/// Log output format
	#[arg(long, value_enum, default_value_t = LogFormat::Auto)]
	log_format: LogFormat,
}

/// Resolve the kubeconfig path the way kubectl does for a single file.
///
/// `$KUBECONFIG` may hold a list of paths; only the first one is used.
fn kubeconfig_path(arg: Option<&str>) -> Option<PathBuf> {
	match arg.filter(|s| !s.is_empty()) {
		Some(value) => std::env::split_paths(value).next(),
		None => home::home_dir().map(|home| home.join(".kube").join("config")),
	}
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	let _telemetry = telemetry::init(cli.log_level, cli.log_format)?;

	let kubeconfig = kubeconfig_path(cli.kubeconfig.as_deref());
	let options = CollectorOptions::builder()
		.maybe_kubeconfig(kubeconfig)
		.client_options(ClientOptions {
			context: cli.context,
			read_timeout: cli.request_timeout.map(Duration::from_secs),
		})
		.build();

	let collector = ManifestCollector::new(options)
		.await
		.context("initializing cluster client")?;
	let manifests = collector
		.collect()
		.await
		.with_context(|| format!("collecting manifests with the {} collector", collector.name()))?;
	info!(count = manifests.len(), "collected manifests");

	let stdout = BrokenPipeGuard::new(std::io::stdout().lock());
	output::write_manifests(stdout, &manifests, cli.output)
}
