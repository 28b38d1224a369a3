use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use prism_ingest::{AppError, Settings, Upload, VerificationPipeline};
use tracing::Level;

#[derive(Parser)]
#[command(author, version, about = "Run one video through the verification pipeline", long_about = None)]
struct Cli {
    /// Video file to verify
    video: PathBuf,
    #[arg(short, long)]
    wallet: String,
    #[arg(short, long)]
    screen_color: String,
    /// Settings file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// Ok(false) means the pipeline ran but produced an error envelope.
async fn run(cli: Cli) -> Result<bool, AppError> {
    let settings = Settings::load(cli.config.as_deref())?;
    let pipeline = VerificationPipeline::builder(settings).build()?;

    let bytes = tokio::fs::read(&cli.video).await?;
    let original_name = cli
        .video
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let outcome = pipeline
        .process_video(Upload::new(bytes, original_name, cli.wallet, cli.screen_color))
        .await;
    let succeeded = !outcome.is_error();
    println!("{}", outcome.into_response());
    Ok(succeeded)
}
