//! `strata layers` - show loaded layers in precedence order.

use serde_json::json;

use crate::{
    commands::load_settings,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};
use strata_adapters::JsonFileSinks;

pub fn execute(config: &AppConfig, output: &OutputManager, sinks: JsonFileSinks) -> CliResult<()> {
    let settings = load_settings(config, output, sinks)?;

    if output.is_json() {
        let layers: Vec<_> = settings
            .layers()
            .map(|layer| {
                json!({
                    "name": layer.name(),
                    "kind": layer.origin().to_string(),
                    "path": layer.path().map(|p| p.display().to_string()),
                    "sections": layer.section_names().collect::<Vec<_>>(),
                })
            })
            .collect();
        let text = serde_json::to_string_pretty(&json!({
            "environment": settings.environment(),
            "prefix": settings.env_prefix(),
            "layers": layers,
        }))
        .map_err(|e| CliError::Render {
            format: "JSON",
            message: e.to_string(),
        })?;
        output.data(&text)?;
        return Ok(());
    }

    output.header(&format!(
        "Layers (environment '{}', prefix {}_), lowest precedence first:",
        settings.environment(),
        settings.env_prefix()
    ))?;
    for (i, layer) in settings.layers().enumerate() {
        let location = layer
            .path()
            .map_or_else(String::new, |p| format!("  {}", p.display()));
        output.data(&format!(
            "{:>3}. {:<24} {:<12}{}",
            i + 1,
            layer.name(),
            layer.origin().to_string(),
            output.dim(&location)
        ))?;
    }
    Ok(())
}
