use anyhow::Result;
use clap::Parser;
use microgrid_whatif::{cli, config::Config, telemetry::init_tracing};
use tracing::info;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = cli::Cli::parse();
    init_tracing(cli.debug);

    let cfg = Config::load(cli.config.as_deref())?;
    info!(
        horizon = cfg.optimization.horizon,
        backend = %cli.solver.unwrap_or(cfg.optimization.default_backend),
        "starting what-if analysis"
    );

    cli::run(cli, cfg)
}
