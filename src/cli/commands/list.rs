use crate::errors::AppResult;
use clap::Args;
use std::path::PathBuf;

use super::load_config;

#[derive(Args)]
pub struct ListCommand {
    /// Configuration file (defaults to ./config.toml and DATA_CONNECTION_* env vars)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the data sources as JSON
    #[arg(long)]
    json: bool,
}

impl ListCommand {
    pub fn run(&self) -> AppResult<()> {
        print!("{}", self.render()?);
        Ok(())
    }

    /// Format the configured data sources as a table or JSON
    pub fn render(&self) -> AppResult<String> {
        let app_config = load_config(&self.config)?;

        if self.json {
            let mut output = serde_json::to_string_pretty(&app_config.data_sources)?;
            output.push('\n');
            return Ok(output);
        }

        if app_config.data_sources.is_empty() {
            return Ok("No data sources configured\n".to_string());
        }

        let mut output = String::new();
        for ds in &app_config.data_sources {
            output.push_str(&format!(
                "{:<20} {:<10} {}\n",
                ds.name(),
                ds.provider_name(),
                ds.connection_string()
            ));
        }
        Ok(output)
    }
}
