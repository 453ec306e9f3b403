pub mod client;
pub mod commands;
pub mod config;
pub mod deck;
pub mod errors;
pub mod ideas;
pub mod llm;
pub mod server;

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use crate::commands::ClientContext;
use crate::config::AppConfig;
use crate::errors::IdeaSwipeResult;
use crate::ideas::types::Direction;

#[derive(Parser)]
#[command(name = "ideaswipe", version, about = "Generate, swipe and save AI app ideas")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server.
    Serve,
    /// Write a default config.toml to the working directory.
    InitConfig,
    /// Generate a fresh deck of 10 ideas.
    Generate {
        #[arg(long)]
        model: Option<String>,
        /// Extra requirements for the generator.
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Show the card on top of the deck.
    Show,
    /// Love (right) or pass (left) the top card.
    Swipe {
        #[arg(value_enum)]
        direction: SwipeArg,
    },
    /// Replay a drag gesture, e.g. `drag 30,2 80,4 140,6`.
    Drag {
        #[arg(required = true, allow_hyphen_values = true)]
        moves: Vec<String>,
    },
    /// Clear the deck (favorites are kept).
    Reset,
    /// Toggle the favorite flag on the top card.
    Favorite,
    /// List saved ideas.
    Favorites,
    /// Remove a saved idea.
    Unfavorite { id: String },
    /// Prepare a saved idea as the next chat message.
    SendToChat { id: String },
    /// Chat about an idea. Opens with the message or the prepared prompt, then
    /// reads follow-up turns from stdin.
    Chat {
        #[arg(long)]
        model: Option<String>,
        message: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SwipeArg {
    Left,
    Right,
}

impl From<SwipeArg> for Direction {
    fn from(arg: SwipeArg) -> Self {
        match arg {
            SwipeArg::Left => Direction::Left,
            SwipeArg::Right => Direction::Right,
        }
    }
}

pub async fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load config; using defaults");
            AppConfig::default()
        }
    };

    match dispatch(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Command, config: AppConfig) -> IdeaSwipeResult<()> {
    match command {
        Command::Serve => server::start_server(&config).await,
        Command::InitConfig => {
            let path = config::write_default_config(&AppConfig::default())?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Command::Generate { model, prompt } => {
            commands::generate(&ClientContext::new(config), model, prompt).await
        }
        Command::Show => commands::show(&ClientContext::new(config)),
        Command::Swipe { direction } => {
            commands::swipe(&ClientContext::new(config), direction.into())
        }
        Command::Drag { moves } => commands::drag(&ClientContext::new(config), &moves).await,
        Command::Reset => commands::reset(&ClientContext::new(config)),
        Command::Favorite => commands::toggle_current(&ClientContext::new(config)),
        Command::Favorites => commands::list_favorites(&ClientContext::new(config)),
        Command::Unfavorite { id } => commands::remove_favorite(&ClientContext::new(config), &id),
        Command::SendToChat { id } => commands::send_to_chat(&ClientContext::new(config), &id),
        Command::Chat { model, message } => {
            commands::chat(&ClientContext::new(config), model, message).await
        }
    }
}
