//! tickshim-probe: report which host scheduler backend this process would use.

use clap::Parser;
use tracing::warn;

use tickshim_core::config::ShimConfig;
use tickshim_scheduler::{resolve_mode, EnvCapabilities};

mod report;

use report::ProbeReport;

#[derive(Parser, Debug)]
#[command(name = "tickshim-probe", version, about)]
struct Cli {
    /// Path to tickshim.toml. Defaults to ~/.tickshim/tickshim.toml.
    #[arg(long, env = "TICKSHIM_CONFIG")]
    config: Option<String>,

    /// Override the sentinel capability name.
    #[arg(long)]
    sentinel: Option<String>,

    /// Print a JSON report instead of the bare mode.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tickshim_probe=info,tickshim_scheduler=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ShimConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        ShimConfig::default()
    });
    if let Some(sentinel) = cli.sentinel {
        config.scheduler.sentinel = sentinel;
    }

    let probe = EnvCapabilities::from_config(&config.scheduler);
    let mode = resolve_mode(&config.scheduler, &probe);
    let report = ProbeReport::new(mode, &config.scheduler);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{mode}");
    }
    Ok(())
}
