//! devchat - a conversational device-control client.
//!
//! Keeps an in-memory chat transcript, sends it to an LLM completion
//! endpoint over HTTPS, and routes each assistant reply as either plain
//! conversation or a structured device command. A companion mode generates
//! an image for a prompt and downloads it to disk.

mod config;
mod knowledge;
mod llm;
mod router;
mod session;
mod transcript;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use std::process::Command as ProcessCommand;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "devchat")]
#[command(author, version, about = "A conversational device-control client")]
#[command(
    long_about = "Chats with an LLM completion endpoint and routes structured replies \
                  as device-control commands.\n\nRuns an interactive chat session when \
                  no subcommand is given."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive chat session (the default)
    Chat,
    /// Generate an image for a prompt and download it
    Image {
        /// The image prompt
        prompt: String,
    },
    /// Open the configuration file in $EDITOR
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("devchat=info".parse().unwrap())
                .add_directive("reqwest=warn".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Image { prompt }) => handle_image(&prompt).await,
        Some(Commands::Config) => handle_config(),
        Some(Commands::Chat) | None => handle_chat().await,
    }
}

/// Run the interactive chat session.
async fn handle_chat() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let credential = config.api.credential()?;
    let knowledge = knowledge::load(&config.knowledge)?;

    let client = llm::build_client(config.api.timeout_secs);
    let chat = llm::chat::ChatClient::new(client, &config.api, credential);

    info!(model = %config.api.chat_model, "starting chat session");
    let mut session = session::ChatSession::new(chat, knowledge);
    session.run().await
}

/// Generate one image and download it to the configured output file.
async fn handle_image(prompt: &str) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let credential = config.api.credential()?;

    let client = llm::build_client(config.api.timeout_secs);
    let images =
        llm::image::ImageClient::new(client.clone(), &config.api, &config.image, credential);

    match images.generate(prompt).await? {
        Some(url) => {
            info!(%url, "image ready, downloading");
            llm::image::download_file(&client, &url, &config.image.output_file).await?;
            println!("Saved image to {}", config.image.output_file.display());
        }
        None => {
            println!("No image URL in response");
        }
    }

    Ok(())
}

/// Handle the config command.
fn handle_config() -> Result<()> {
    let config_path = Config::config_path()?;

    // Ensure config directory exists
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Create default config if it doesn't exist
    if !config_path.exists() {
        let default_config = Config::default();
        default_config.save()?;
        println!("Created default config at {}", config_path.display());
    }

    // Open in editor
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = ProcessCommand::new(&editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        eprintln!("Editor exited with non-zero status");
    }

    Ok(())
}
