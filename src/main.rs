mod cli;
mod config;
mod engine;
mod error;
mod logging;
mod model;
mod pipeline;
mod services;
mod util;

use std::process::ExitCode;

use anyhow::Result;

use config::AppConfig;
use engine::Engine;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = cli::parse_args(&args)?;

    if cli.help {
        cli::print_help();
        return Ok(ExitCode::SUCCESS);
    }
    if cli.version {
        println!("trello-sync {}", cli::VERSION);
        return Ok(ExitCode::SUCCESS);
    }

    logging::init(cli.log_level.as_deref().unwrap_or("info"));

    // File, then environment, then flags
    let config = config::load_config(cli.config_path.as_deref())?
        .merge(AppConfig::from_env(|name| std::env::var(name).ok()))
        .merge(cli.overrides);

    let settings = config.pipeline_settings()?;
    let pipeline = pipeline::build(&settings);
    let services = services::create_services(&config);

    let engine = Engine::new(pipeline, services, config.engine_options());
    let report = engine.run().await?;

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        for skipped in report.skipped.iter().filter(|s| !s.not_ready) {
            tracing::error!(stage = %skipped.stage, reason = %skipped.reason, "stage did not run");
        }
        tracing::error!("sync did not complete");
        Ok(ExitCode::FAILURE)
    }
}
