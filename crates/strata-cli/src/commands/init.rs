//! `strata init` - write the default settings skeleton.

use strata_adapters::LocalFilesystem;
use strata_core::application::{InitRequest, InitService, services::PRELOAD_FILE_NAME};

use crate::{
    cli::InitArgs,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(args: &InitArgs, config: &AppConfig, output: &OutputManager) -> CliResult<()> {
    let settings_dir = config
        .preload
        .parent()
        .map_or_else(|| config.settings_dir.clone(), |dir| dir.to_path_buf());
    let preload_name = config
        .preload
        .file_name()
        .map_or_else(|| PRELOAD_FILE_NAME.to_owned(), |n| n.to_string_lossy().into_owned());

    output.info(&format!(
        "Initialising settings in {}",
        settings_dir.display()
    ))?;

    let report = InitService::new(Box::new(LocalFilesystem::new())).init(&InitRequest {
        settings_dir,
        preload_name,
        project_name: config.project_name.clone(),
        env_prefix: config.env_prefix.clone(),
        force: args.force,
    })?;

    for path in &report.written {
        output.success(&format!("Created {}", path.display()))?;
    }
    for path in &report.skipped {
        output.warning(&format!(
            "Kept existing {} (use --force to overwrite)",
            path.display()
        ))?;
    }

    output.print(&format!(
        "Override any key with {}_<KEY>; select an environment with ENV_FOR_{}",
        config.env_prefix, config.env_prefix
    ))?;
    Ok(())
}
