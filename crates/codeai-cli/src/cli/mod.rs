//! CLI entry and dispatch.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::Parser;
use codeai_core::config;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::render::RenderOptions;

mod commands;

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "CODEAI_LOG";

#[derive(Parser)]
#[command(name = "codeai")]
#[command(version)]
#[command(about = "Ask Gemini from the terminal and read the reply as structured text")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override the system prompt from config
    #[arg(long, global = true)]
    system_prompt: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Read prompts from stdin, one per line (default)
    Chat,

    /// Sends a single prompt and prints the reply
    Ask {
        /// The prompt to send
        #[arg(short, long)]
        prompt: String,

        /// Override the model from config
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Set the default model
    SetModel {
        /// Gemini model name, e.g. gemini-2.5-flash
        #[arg(value_name = "MODEL")]
        model: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let render = RenderOptions::detect(cli.no_color);

    // Config subcommands never need the loaded config.
    if let Some(Commands::Config { command }) = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetModel { model } => commands::config::set_model(model),
        };
    }

    let mut config = config::Config::load().context("load config")?;
    debug!(path = %config::paths::config_path().display(), model = %config.model, "config loaded");

    if let Some(sp) = cli.system_prompt.as_deref() {
        let trimmed = sp.trim();
        config.system_prompt = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    match cli.command {
        None | Some(Commands::Chat) => commands::chat::run(&config, render).await,
        Some(Commands::Ask { prompt, model }) => {
            commands::ask::run(&prompt, &config, model.as_deref(), render).await
        }
        // handled above
        Some(Commands::Config { .. }) => Ok(()),
    }
}
