mod cli;

use talkforge::{
    config,
    pipeline::{JobResponse, RenderRequest},
    server::{self, AppContext},
};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use talkforge_av::check_tools as detect_tools;
use talkforge_common::JobId;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting Talkforge server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!("Workspaces under {:?}", config.workspace.root);

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "talkforge=trace,talkforge_av=trace,tower_http=debug".to_string()
        } else {
            "talkforge=info,talkforge_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Render {
            image_url,
            audio_url,
            quality,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(render(
                RenderRequest {
                    image_url,
                    audio_url,
                    quality,
                },
                cli.config.as_deref(),
            ))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::CheckWeights => check_weights(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("talkforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn render(request: RenderRequest, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let input = match request.validate() {
        Ok(input) => input,
        Err(e) => {
            let response = JobResponse::error(&JobId::new(), format!("request: {e}"));
            println!("{}", serde_json::to_string_pretty(&response)?);
            anyhow::bail!("Invalid render request");
        }
    };

    let ctx = AppContext::new(config)?;
    let job = ctx.state.create_job(input.tier);

    let cancel = ctx.shutdown.clone();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, cancelling render");
                cancel.cancel();
            }
        })
    };

    let result = ctx.orchestrator.run(job.id, &input, cancel).await;
    ctrl_c.abort();

    let response = JobResponse::from_result(&job.id, &result);
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.is_done() {
        anyhow::bail!("Render failed");
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let ffmpeg = config
        .tools
        .ffmpeg_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("ffmpeg"));

    println!("Checking external tools...\n");

    let tools = detect_tools(&ffmpeg, &config.engine.program);
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    if let Some(ref script) = config.engine.script {
        let mark = if script.exists() { "✓" } else { "✗" };
        all_ok &= script.exists();
        println!("{} engine script - {}", mark, script.display());
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Renders will fail until they are installed.");
    }

    Ok(())
}

fn check_weights(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking model weights...\n");

    let mut missing = 0;
    for (name, path) in config.weights.entries() {
        if path.exists() {
            println!("✓ {} - {}", name, path.display());
        } else {
            missing += 1;
            println!("✗ {} - {} (missing)", name, path.display());
        }
    }

    println!();
    if missing > 0 {
        anyhow::bail!("{} weight path(s) missing; run the weight download first", missing);
    }
    println!("All weights are present.");
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Workspace root: {}", config.workspace.root.display());
            println!("  Engine: {}", config.engine.program.display());
            println!("  Publish backend: {:?}", config.publish.backend);
            println!(
                "  Synthesis slots: {}",
                config.limits.max_concurrent_synthesis
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
