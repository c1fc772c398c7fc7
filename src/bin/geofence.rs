use clap::Parser;
use geofence_config_api::cli::{utils::output_error, Cli, OutputFormat};
use geofence_config_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    geofence_config_api::init_tracing();

    let cli = Cli::parse();
    let output_format = OutputFormat::from_cli(&cli);
    let config = AppConfig::from_env();

    if let Err(e) = geofence_config_api::cli::run(cli, config).await {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => output_error(&output_format, &format!("{e:?}")),
            _ => output_error(&output_format, &format!("{e:#}")),
        }
        std::process::exit(1);
    }

    Ok(())
}
