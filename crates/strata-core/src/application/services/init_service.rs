//! Init Service - writes the default settings skeleton.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::{
    application::{ApplicationError, ports::Filesystem},
    domain::{SettingsSkeleton, SkeletonContext},
    error::StrataResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitRequest {
    pub settings_dir: PathBuf,
    pub preload_name: String,
    pub project_name: String,
    pub env_prefix: String,
    /// Overwrite existing files.
    pub force: bool,
}

/// What [`InitService::init`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub written: Vec<PathBuf>,
    /// Existing non-preload files left untouched.
    pub skipped: Vec<PathBuf>,
}

pub struct InitService {
    filesystem: Box<dyn Filesystem>,
}

impl InitService {
    pub fn new(filesystem: Box<dyn Filesystem>) -> Self {
        Self { filesystem }
    }

    /// The skeleton that `init` would write.
    pub fn plan(&self, request: &InitRequest) -> SettingsSkeleton {
        let ctx = SkeletonContext {
            project_name: request.project_name.clone(),
            env_prefix: request.env_prefix.clone(),
            preload_name: request.preload_name.clone(),
        };
        SettingsSkeleton::standard(&request.settings_dir, &ctx)
    }

    /// Write the skeleton into `settings_dir`.
    ///
    /// Refuses to replace an existing preload file unless `force` is set.
    /// Files created before a failure are removed again; files that already
    /// existed are left in place.
    #[instrument(skip_all, fields(dir = %request.settings_dir.display()))]
    pub fn init(&self, request: &InitRequest) -> StrataResult<InitReport> {
        let skeleton = self.plan(request);
        skeleton.validate()?;

        let preload = skeleton.root().join(&request.preload_name);
        if !request.force && self.filesystem.exists(&preload) {
            return Err(ApplicationError::SettingsExist { path: preload }.into());
        }

        let mut report = InitReport::default();
        let mut created = Vec::new();
        match self.write_all(&skeleton, request.force, &mut report, &mut created) {
            Ok(()) => {
                info!(files = report.written.len(), "Settings skeleton written");
                Ok(report)
            }
            Err(e) => {
                warn!("Write failed, attempting rollback");
                self.rollback(&created);
                Err(e)
            }
        }
    }

    fn write_all(
        &self,
        skeleton: &SettingsSkeleton,
        force: bool,
        report: &mut InitReport,
        created: &mut Vec<PathBuf>,
    ) -> StrataResult<()> {
        self.filesystem.create_dir_all(skeleton.root())?;

        for file in skeleton.files() {
            let path = skeleton.root().join(&file.path);
            let existed = self.filesystem.exists(&path);
            if existed && !force {
                report.skipped.push(path);
                continue;
            }
            if let Some(parent) = path.parent() {
                self.filesystem.create_dir_all(parent)?;
            }
            self.filesystem.write_file(&path, &file.content)?;
            if !existed {
                created.push(path.clone());
            }
            report.written.push(path);
        }

        Ok(())
    }

    /// Best-effort rollback on failure.
    fn rollback(&self, created: &[PathBuf]) {
        for path in created.iter().rev() {
            if let Err(e) = self.remove(path) {
                warn!(error = %e, path = %path.display(), "Rollback failed");
            }
        }
    }

    fn remove(&self, path: &Path) -> StrataResult<()> {
        self.filesystem
            .remove_file(path)
            .map_err(|e| ApplicationError::RollbackFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
            .map_err(Into::into)
    }
}
