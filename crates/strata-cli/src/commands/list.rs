//! `strata list` - print every resolved setting.

use crate::{
    commands::load_settings,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};
use strata_adapters::JsonFileSinks;

pub fn execute(config: &AppConfig, output: &OutputManager, sinks: JsonFileSinks) -> CliResult<()> {
    let settings = load_settings(config, output, sinks)?;
    let resolved = settings.resolve_all()?;

    let text = if output.is_json() {
        serde_json::to_string_pretty(&resolved).map_err(|e| CliError::Render {
            format: "JSON",
            message: e.to_string(),
        })?
    } else {
        output.header(&format!(
            "# {} [{}]",
            config.project_name,
            settings.environment()
        ))?;
        toml::to_string_pretty(&resolved).map_err(|e| CliError::Render {
            format: "TOML",
            message: e.to_string(),
        })?
    };

    output.data(&text)?;
    Ok(())
}
