use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use caption_archiver::cli::{Cli, Commands};
use caption_archiver::pipeline::{DirectorySink, Pipeline, PipelineOptions, RunOutcome};
use caption_archiver::{utils, Config, PanoptoClient};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "caption_archiver=debug"
    } else {
        "caption_archiver=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Download {
            folder,
            mode,
            output_dir,
            base_url,
            cookie,
            concurrency,
        } => {
            let mut config = Config::load().await?;
            if let Some(base_url) = base_url {
                config.api.base_url = base_url;
            }
            if cookie.is_some() {
                config.api.cookie = cookie;
            }
            if let Some(concurrency) = concurrency {
                config.app.max_concurrent_fetches = concurrency;
            }
            if let Some(dir) = output_dir {
                config.app.output_dir = Some(dir);
            }
            config.validate()?;

            let mode = mode.unwrap_or(config.app.default_mode);
            let folder_id = utils::extract_folder_id(&folder).unwrap_or_default();

            let client = PanoptoClient::new(&config)?;
            let sink = DirectorySink::new(config.output_dir()?);
            let mut options = PipelineOptions::from_config(&config);
            options.show_progress = !cli.quiet;

            let cancel = CancellationToken::new();
            let mut pipeline =
                Pipeline::new(client, sink, options).with_cancellation_token(cancel.clone());

            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling run");
                    cancel.cancel();
                }
            });

            tracing::info!("Starting {} download for folder: {}", mode, folder_id);

            match pipeline.run(&folder_id, mode).await? {
                RunOutcome::Done(result) => {
                    let path = pipeline.sink().path_for(&result.file_name);
                    println!(
                        "{} Downloaded {} {} in {} ({})",
                        style("✓").green(),
                        result.archived,
                        mode,
                        path.display(),
                        utils::format_file_size(result.archive.len() as u64)
                    );
                    if result.skipped > 0 {
                        println!("  {} session(s) had no captions", result.skipped);
                    }
                    for failure in &result.failures {
                        println!(
                            "  {} {} ({}): {}",
                            style("!").yellow(),
                            failure.session_name,
                            failure.session_id,
                            failure.error
                        );
                    }
                }
                RunOutcome::Aborted(reason) => {
                    eprintln!("{} {}", style("Error:").red(), reason);
                    std::process::exit(1);
                }
            }
        }
        Commands::Normalize { file } => {
            let text = fs_err::read_to_string(&file)
                .with_context(|| format!("Failed to read caption file {}", file.display()))?;
            println!("{}", caption_archiver::normalize(&text));
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                println!("Edit the config file to change settings:");
                println!("  {}", Config::config_path()?.display());
            }
        }
    }

    Ok(())
}
