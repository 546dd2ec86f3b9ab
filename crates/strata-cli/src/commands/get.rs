//! `strata get` - print one resolved setting.

use serde_json::json;

use crate::{
    cli::GetArgs,
    config::AppConfig,
    commands::load_settings,
    error::{CliError, CliResult},
    output::OutputManager,
};
use strata_adapters::JsonFileSinks;

pub fn execute(
    args: &GetArgs,
    config: &AppConfig,
    output: &OutputManager,
    sinks: JsonFileSinks,
) -> CliResult<()> {
    let settings = load_settings(config, output, sinks)?;
    let value = settings.get(&args.key)?;
    let origin = args.origin.then(|| settings.origin(&args.key)).flatten();

    if output.is_json() {
        let document = if args.origin {
            json!({
                "key": args.key,
                "value": value,
                "origin": origin.map(|layer| json!({
                    "name": layer.name(),
                    "kind": layer.origin().to_string(),
                    "path": layer.path().map(|p| p.display().to_string()),
                })),
            })
        } else {
            serde_json::to_value(&value).map_err(|e| render_error(&e))?
        };
        let text = serde_json::to_string_pretty(&document).map_err(|e| render_error(&e))?;
        output.data(&text)?;
        return Ok(());
    }

    output.data(&value.to_string())?;
    if args.origin {
        let source = origin.map_or_else(
            || "injected constant".to_owned(),
            |layer| format!("{} ({})", layer.name(), layer.origin()),
        );
        output.data(&output.dim(&format!("from {source}")))?;
    }
    Ok(())
}

fn render_error(e: &serde_json::Error) -> CliError {
    CliError::Render {
        format: "JSON",
        message: e.to_string(),
    }
}
