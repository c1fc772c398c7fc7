use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub fn show(config: &AppConfig, output_format: &OutputFormat) -> anyhow::Result<()> {
    let redacted = config.redacted();
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&redacted)?);
        }
        OutputFormat::Text => {
            let db = &redacted.database;
            println!("Environment: {:?}", redacted.environment);
            println!("Backend: {:?}", db.backend);
            match &db.url {
                Some(url) => println!("Database URL: {}", url),
                None => println!(
                    "Database: {}@{}:{}/{} (password {})",
                    db.user,
                    db.host,
                    db.port,
                    db.name,
                    if db.password.is_some() { "set" } else { "not set" }
                ),
            }
            println!("Schema: {}", db.schema);
            println!("Listen: {}:{}", redacted.api.host, redacted.api.port);
            println!("Expose error details: {}", redacted.api.expose_error_details);
        }
    }
    Ok(())
}
