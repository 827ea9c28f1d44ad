use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use runlab_engine::{EngineConfig, ExecutionOrchestrator};

#[derive(Parser, Debug)]
#[clap(
    name = "runlab",
    version = "0.1.0",
    about = "Run code in a Docker sandbox with host-process fallback"
)]
struct Cli {
    /// Source file to execute
    #[clap(value_name = "FILE", required_unless_present = "code")]
    file: Option<PathBuf>,

    #[clap(long, short, help = "Inline source code instead of a file")]
    code: Option<String>,

    #[clap(
        long,
        short,
        help = "Language identifier (python, javascript, cpp, java, go)"
    )]
    language: String,

    #[clap(long, help = "YAML engine configuration file")]
    config: Option<PathBuf>,

    #[clap(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Info);
    env_logger::Builder::new().filter_level(level).init();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let code = match (&cli.code, &cli.file) {
        (Some(code), _) => code.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => unreachable!("clap requires either FILE or --code"),
    };

    let orchestrator = ExecutionOrchestrator::new(config).await;
    let result = orchestrator.run(&code, &cli.language).await?;

    print!("{}", result.stdout);
    eprint!("{}", result.stderr);
    if result.timed_out {
        log::error!("time limit exceeded");
    }
    log::info!(
        "backend={:?} exit_code={} duration={:?}",
        result.backend,
        result.exit_code,
        result.duration.unwrap_or_default()
    );

    Ok(ExitCode::from(result.exit_code.clamp(0, 255) as u8))
}
