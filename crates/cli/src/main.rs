mod args;
mod render;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidbatch_core::{
    expand_inputs, load_config, load_default_config, metrics, placeholders, validate_config,
    validate_template, BatchSummary, BatchWorker, CancelFlag, Config, ConversionOrchestrator,
    Converter, FfmpegConverter, TemplateLibrary,
};

use args::Args;
use render::Renderer;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every file converted successfully.
async fn run() -> Result<bool> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load(&args)?;
    validate_config(&config).context("Configuration validation failed")?;
    let library = config
        .template_library()
        .context("Invalid custom templates")?;

    if args.list_templates {
        list_templates(&library, args.json)?;
        return Ok(true);
    }
    if args.list_placeholders {
        list_placeholders(args.json)?;
        return Ok(true);
    }

    let recursive = args.recursive(&config.defaults);
    let inputs = expand_inputs(&args.inputs, recursive)
        .await
        .context("Failed to scan inputs")?;
    if inputs.is_empty() {
        bail!("No supported video files found");
    }

    let request = args.batch_request(&config.defaults, inputs);
    let template = library.resolve_reference(&request.filename_template);
    if !validate_template(&template) {
        bail!("Invalid filename template: {}", request.filename_template);
    }

    let converter = Arc::new(FfmpegConverter::new(config.converter.clone()));
    converter
        .validate()
        .await
        .context("FFmpeg is not available")?;

    let orchestrator = Arc::new(
        ConversionOrchestrator::new(converter, config.orchestrator_config()).with_library(library),
    );

    info!(
        files = request.inputs.len(),
        output_dir = %request.output_dir.display(),
        quality = %request.quality,
        format = %request.output_format,
        template = %template,
        "Starting conversion"
    );

    let mut handle = BatchWorker::spawn(orchestrator, request);
    tokio::spawn(cancel_on_signal(handle.cancel_flag()));

    let mut renderer = Renderer::new(args.json);
    while let Some(event) = handle.events.recv().await {
        renderer.render(&event).context("Failed to write output")?;
    }

    let results = handle.wait().await.context("Batch task failed")?;
    let summary = BatchSummary::from_results(&results);
    debug!(metrics = %metrics::encode_metrics(), "Conversion metrics");

    Ok(summary.all_succeeded())
}

fn load(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => load_default_config().context("Failed to load configuration"),
    }
}

fn list_templates(library: &TemplateLibrary, json: bool) -> Result<()> {
    for entry in library.list() {
        if json {
            let line = serde_json::json!({
                "name": entry.name,
                "template": entry.template,
                "builtin": entry.builtin,
            });
            println!("{}", line);
        } else {
            let kind = if entry.builtin { "" } else { " (custom)" };
            println!("{:<16} {}{}", entry.name, entry.template, kind);
        }
    }
    Ok(())
}

fn list_placeholders(json: bool) -> Result<()> {
    for (token, description) in placeholders() {
        if json {
            let line = serde_json::json!({ "placeholder": token, "description": description });
            println!("{}", line);
        } else {
            println!("{:<14} {}", token, description);
        }
    }
    Ok(())
}

/// Cancel the batch on Ctrl+C or SIGTERM
async fn cancel_on_signal(cancel: CancelFlag) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Interrupt received, cancelling remaining conversions");
    cancel.cancel();
}
