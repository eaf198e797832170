pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "bookmarks")]
#[command(about = "Smart Bookmarks CLI - manage your bookmarks from the terminal")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "List bookmarks, newest first")]
    List,

    #[command(about = "Add a bookmark")]
    Add {
        #[arg(help = "Bookmark title")]
        title: String,
        #[arg(help = "Absolute http(s) URL")]
        url: String,
    },

    #[command(about = "Delete a bookmark by id")]
    Delete {
        #[arg(help = "Bookmark id")]
        id: Uuid,
    },

    #[command(about = "Print the list, then follow live changes until Ctrl-C")]
    Watch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, output_format).await,
        Commands::List => commands::bookmarks::list(output_format).await,
        Commands::Add { title, url } => commands::bookmarks::add(&title, &url, output_format).await,
        Commands::Delete { id } => commands::bookmarks::delete(id, output_format).await,
        Commands::Watch => commands::bookmarks::watch(output_format).await,
    }
}
