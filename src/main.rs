use anyhow::{Context, Result};
use clap::Parser;
use masterpiece_generator::app::App;
use masterpiece_generator::models::Config;
use masterpiece_generator::report::ReportStatus;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "masterpiece-generator")]
#[command(about = "Generate product-photography prompts with multi-provider failover")]
struct CliArgs {
    /// Product description or instruction text.
    #[arg(short, long, conflicts_with = "prompt_file", required_unless_present = "prompt_file")]
    prompt: Option<String>,

    /// Read the prompt text from a file.
    #[arg(long, value_name = "PATH")]
    prompt_file: Option<PathBuf>,

    /// Product image to attach (repeatable).
    #[arg(short, long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,

    /// Override FAILOVER_BACKENDS, e.g. "openai:gpt-4o,gemini:gemini-1.5-pro".
    #[arg(long, value_name = "ROSTER")]
    backends: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "masterpiece_generator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(roster) = &args.backends {
        config = config
            .with_backends(roster)
            .context("Invalid --backends roster")?;
    }

    let prompt = match (&args.prompt, &args.prompt_file) {
        (Some(prompt), _) => prompt.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt file {}", path.display()))?,
        (None, None) => anyhow::bail!("Either --prompt or --prompt-file is required"),
    };

    let app = App::new(&config).context("Failed to initialize backends")?;
    let request = App::build_request(&prompt, &args.images)?;

    info!("Dispatching across {} backends", config.backends.len());
    let report = app.run(request).await?;
    println!("{}", report.to_json()?);

    if report.status == ReportStatus::Failed {
        error!(
            "Generation failed: {}",
            report.message.as_deref().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }

    Ok(())
}
