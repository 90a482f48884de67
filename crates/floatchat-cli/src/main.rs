// ABOUTME: Entry point for the floatchat binary
// ABOUTME: Handles CLI args, config loading, logging setup, and subcommand dispatch

mod attach;
mod chat;
mod init;
mod input;
mod render;
mod send;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use floatchat_core::{Config, DefaultOption};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "floatchat")]
#[command(about = "Terminal client for the floatchat assistant")]
struct Cli {
    /// Config file path
    #[arg(short, long, env = "FLOATCHAT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Use canned replies instead of the configured endpoint
    #[arg(long, global = true)]
    offline: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,
    /// Send one message and print the reply
    Send {
        /// The message to send
        message: String,
        /// Conversation context for the message
        #[arg(long, value_enum)]
        context: Option<ContextArg>,
        /// File to attach (repeatable)
        #[arg(short, long = "attach")]
        attach: Vec<PathBuf>,
    },
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ContextArg {
    Policy,
    Claim,
    SubmitClaim,
}

impl From<ContextArg> for DefaultOption {
    fn from(arg: ContextArg) -> Self {
        match arg {
            ContextArg::Policy => DefaultOption::PolicyInfo,
            ContextArg::Claim => DefaultOption::ClaimInfo,
            ContextArg::SubmitClaim => DefaultOption::SubmitClaim,
        }
    }
}

fn level(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

const CRATES: [&str; 3] = ["floatchat_core", "floatchat_http", "floatchat"];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            if let Some(path) = floatchat_log::init_file(&Config::config_dir(), "floatchat") {
                tracing::info!(path = %path.display(), "Logging to file");
            }
            let config = Config::load(cli.config).context("Failed to load config")?;
            chat::run(config, cli.offline).await
        }
        Commands::Send {
            message,
            context,
            attach,
        } => {
            floatchat_log::init_for(&CRATES, level(cli.verbose));
            let config = Config::load(cli.config).context("Failed to load config")?;
            send::run(
                config,
                cli.offline,
                send::SendArgs {
                    message,
                    option: context.map(DefaultOption::from),
                    attachments: attach,
                },
            )
            .await
        }
        Commands::Init { force } => {
            floatchat_log::init(level(cli.verbose));
            let path = cli.config.unwrap_or_else(Config::config_path);
            init::run(&path, force)
        }
    }
}
