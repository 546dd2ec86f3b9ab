use std::collections::HashSet;
use std::path::PathBuf;

use crate::domain::error::DomainError;

/// Default settings files ready for materialization by `InitService`.
///
/// Contains no business logic, only data: paths are relative to `root`.
#[derive(Debug, Clone)]
pub struct SettingsSkeleton {
    pub(crate) root: PathBuf,
    pub(crate) files: Vec<SkeletonFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonFile {
    pub path: PathBuf,
    pub content: String,
}

/// Placeholders substituted into skeleton files.
#[derive(Debug, Clone)]
pub struct SkeletonContext {
    pub project_name: String,
    pub env_prefix: String,
    pub preload_name: String,
}

impl SkeletonContext {
    /// Replace `{{PROJECT_NAME}}`, `{{ENV_PREFIX}}` and `{{PRELOAD}}`.
    ///
    /// Single braces are left alone, so `@format {base_dir}` survives.
    pub fn render(&self, source: &str) -> String {
        source
            .replace("{{PROJECT_NAME}}", &self.project_name)
            .replace("{{ENV_PREFIX}}", &self.env_prefix)
            .replace("{{PRELOAD}}", &self.preload_name)
    }
}

const SETTINGS_TEMPLATE: &str = r#"# Settings for {{PROJECT_NAME}}.
#
# Sections: [default] applies everywhere, [<env>] applies when
# ENV_FOR_{{ENV_PREFIX}}=<env> (default: development), [global] always wins.
# Override any key from the environment with {{ENV_PREFIX}}_<KEY>,
# nested keys with {{ENV_PREFIX}}_<TABLE>__<KEY>.

[default]
project_name = "{{PROJECT_NAME}}"
tz = "UTC"
log_dir = "@format {base_dir}/logs/{date_partition}"
started_at = "@eval start_time(this.tz)"
now = "@eval now(this.tz)"
run_id = "@format {project_name}-{start_time('UTC'):%Y%m%dT%H%M%S}"

[development]
debug = true

[production]
debug = false
"#;

const DOTENV_TEMPLATE: &str = r"# Copy to .env to seed environment variables before settings are resolved.
# Real environment variables take precedence over this file.
#
# ENV_FOR_{{ENV_PREFIX}}=production
# {{ENV_PREFIX}}_TZ=Asia/Kolkata
# SECRETS_FOR_{{ENV_PREFIX}}=/run/secrets/{{PROJECT_NAME}}
";

impl SettingsSkeleton {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Vec::new(),
        }
    }

    /// The default skeleton: a preload settings file and a `.env` example.
    pub fn standard(root: impl Into<PathBuf>, ctx: &SkeletonContext) -> Self {
        Self::new(root)
            .with_file(&ctx.preload_name, ctx.render(SETTINGS_TEMPLATE))
            .with_file(".env.example", ctx.render(DOTENV_TEMPLATE))
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>, content: String) {
        self.files.push(SkeletonFile {
            path: path.into(),
            content,
        });
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: String) -> Self {
        self.add_file(path, content);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        for file in &self.files {
            let path_str = file.path.display().to_string();
            if !seen.insert(path_str.clone()) {
                return Err(DomainError::DuplicatePath { path: path_str });
            }

            if file.path.is_absolute() {
                return Err(DomainError::AbsolutePathNotAllowed { path: path_str });
            }
        }

        Ok(())
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn files(&self) -> impl Iterator<Item = &SkeletonFile> {
        self.files.iter()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}
