pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "geofence")]
#[command(about = "Administrative commands for the indoor geofence configuration API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create the schema and the assets/gateways tables if missing")]
    InitDb,

    #[command(about = "Open and close one database connection")]
    Ping,

    #[command(about = "Print the resolved configuration with secrets masked")]
    Config,
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

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::InitDb => commands::db::init_db(&config, &output_format).await,
        Commands::Ping => commands::db::ping(&config, &output_format).await,
        Commands::Config => commands::config::show(&config, &output_format),
    }
}
