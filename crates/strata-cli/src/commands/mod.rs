//! Command handlers. One module per subcommand.

pub mod completions;
pub mod get;
pub mod init;
pub mod layers;
pub mod list;

use strata_adapters::{JsonFileSinks, ProcessEnvironment, local_loader};
use strata_core::application::Settings;
use tracing::instrument;

use crate::{config::AppConfig, error::CliResult, output::OutputManager};

/// Load settings for `config`, attaching the structured log sink if one was
/// requested.
#[instrument(skip_all, fields(project = %config.project_name))]
pub(crate) fn load_settings(
    config: &AppConfig,
    output: &OutputManager,
    sinks: JsonFileSinks,
) -> CliResult<Settings> {
    let environment = ProcessEnvironment::capture(Some(config.dotenv.as_path()))?;
    let settings = local_loader(environment, sinks).load(&config.load_request())?;

    if let Some(suffix) = &config.log_sink {
        let attachment = settings.attach_structured_file_sink(suffix.as_deref())?;
        if attachment.newly_attached {
            output.info(&format!(
                "Logging to {}",
                attachment.path.display()
            ))?;
        }
    }

    Ok(settings)
}
