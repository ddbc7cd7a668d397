mod server;

use clap::{Arg, Command};
use nodestat_core::{config::CliConfig, export, Config, MetricsCollector};
use std::{path::PathBuf, process, sync::Arc};
use tracing_subscriber::{fmt::MakeWriter, EnvFilter};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let matches = Command::new("nodestat")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Prometheus exporter for Linux host metrics read from procfs")
        .arg(
            Arg::new("port")
                .long("port")
                .value_name("PORT")
                .help("HTTP port (overrides the PORT environment variable)")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("listen")
                .long("listen")
                .value_name("ADDR")
                .help("Address to bind the HTTP server to"),
        )
        .arg(
            Arg::new("metrics-path")
                .long("metrics-path")
                .value_name("PATH")
                .help("Path serving the metrics"),
        )
        .arg(
            Arg::new("proc-root")
                .long("proc-root")
                .value_name("DIR")
                .help("Root of the proc filesystem")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .value_name("FORMAT")
                .help("Collect once, print to stdout and exit")
                .num_args(0..=1)
                .default_missing_value("text")
                .value_parser(["text", "json"]),
        )
        .get_matches();

    let cli_config = CliConfig {
        listen_addr: matches.get_one::<String>("listen").cloned(),
        port: matches.get_one::<u16>("port").copied(),
        metrics_path: matches.get_one::<String>("metrics-path").cloned(),
        proc_root: matches.get_one::<PathBuf>("proc-root").cloned(),
    };

    // PORT is read once, here
    let env_port = std::env::var("PORT").ok();
    let json_config_path = matches.get_one::<PathBuf>("config");
    let config = with_bootstrap_logging(std::io::stderr, || {
        Config::load(Some(&cli_config), json_config_path, env_port.as_deref())
    })?;

    init_tracing(&config);

    let collector = Arc::new(MetricsCollector::from_config(&config));

    if let Some(format) = matches.get_one::<String>("dump") {
        return dump(&collector, format);
    }

    tracing::info!(
        proc_root = %config.proc_root.display(),
        sources = ?collector.source_names(),
        "starting nodestat"
    );
    let registry = export::new_registry(collector)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(server::run_server(&config, registry))
}

/// Run `f` under a temporary subscriber so events raised before the
/// configured one is installed (such as skipped config files) are not lost
fn with_bootstrap_logging<W, T>(writer: W, f: impl FnOnce() -> T) -> T
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// One-shot collection for debugging a host without running the server
fn dump(collector: &Arc<MetricsCollector>, format: &str) -> anyhow::Result<()> {
    match format {
        "json" => {
            let samples = collector.collect();
            println!("{}", serde_json::to_string_pretty(&samples)?);
        }
        _ => {
            let registry = export::new_registry(Arc::clone(collector))?;
            print!("{}", export::encode_text(&registry)?);
        }
    }
    Ok(())
}
