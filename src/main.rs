//! Main entry point for sigtract CLI

use anyhow::Context;
use clap::Parser;
use sigtract::cli::Args;
use sigtract::platform::{Decipherer, FetchOptions, Format};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);
    debug!("Starting sigtract with args: {:?}", args);

    let start_time = Instant::now();
    let decipherer = Decipherer::new(args.pipeline_config())?;
    let options = FetchOptions::default();

    let functions = if args.is_local_player() {
        let text = tokio::fs::read_to_string(&args.player)
            .await
            .with_context(|| format!("Failed to read player file {}", args.player))?;
        decipherer.load_player(&args.player, &text).await?
    } else {
        decipherer
            .get_functions(&args.player, &options)
            .await
            .with_context(|| format!("Failed to load player {}", args.player))?
    };
    info!("Player functions ready in {:?}", start_time.elapsed());

    if !args.has_action() {
        println!("decipher:    {}", availability(functions.decipher.is_some()));
        println!("n transform: {}", availability(functions.n_transform.is_some()));
        return Ok(());
    }

    if args.print_programs {
        print_program("decipher", functions.decipher.as_deref());
        print_program("n transform", functions.n_transform.as_deref());
    }

    if let Some(s) = &args.sig {
        let signature = decipherer.decipher_signature(&args.player, s, &options).await?;
        println!("sig: {}", signature.as_deref().unwrap_or("<unavailable>"));
    }

    if let Some(n) = &args.n {
        let transformed = decipherer.transform_n(&args.player, n, &options).await?;
        println!("n: {}", transformed.as_deref().unwrap_or("<unavailable>"));
    }

    if let Some(path) = &args.formats {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read formats file {}", path.display()))?;
        let formats: Vec<Format> =
            serde_json::from_str(&json).context("Formats file must hold a JSON array")?;

        let total = formats.len();
        let resolved = decipherer
            .decipher_formats(formats, &args.player, &options)
            .await;
        info!("Resolved {} of {} formats", resolved.len(), total);
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    }

    Ok(())
}

fn availability(found: bool) -> &'static str {
    if found {
        "found"
    } else {
        "not found"
    }
}

fn print_program(label: &str, program: Option<&str>) {
    match program {
        Some(program) => println!("// {}\n{}\n", label, program),
        None => println!("// {}: not found\n", label),
    }
}

/// Initialize logging system
fn init_logging(args: &Args) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
