//! Settings Loader - builds a [`Settings`] store from its sources.
//!
//! Workflow:
//! 1. Resolve the active environment and secrets directory
//! 2. Read the preload file (must exist)
//! 3. Discover layer files, then secret files, in file-name order
//! 4. Collect prefixed environment overrides as the final layer
//! 5. Capture the start time and injected constants

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        ApplicationError, Settings,
        ports::{Clock, EnvironmentSource, Filesystem, LayerParser, LogSinks},
    },
    domain::{
        DEFAULT_ENVIRONMENT, DEFAULT_SECTION, Helpers, Layer, LayerOrigin, SettingsTable,
        helpers::{BASE_DIR, ENV_PREFIX, ENVIRONMENT, HOME_DIR, PROJECT_NAME},
        normalize_key,
    },
    error::StrataResult,
};

/// Default name of the preload file.
pub const PRELOAD_FILE_NAME: &str = "settings.toml";
/// Default settings directory, relative to the project directory.
pub const SETTINGS_DIR_NAME: &str = "settings";
/// Extension of discoverable layer and secret files.
pub const LAYER_EXTENSION: &str = "toml";
/// `ENV_FOR_<PREFIX>` selects the active environment section.
pub const ENVIRONMENT_VAR_PREFIX: &str = "ENV_FOR_";
/// `SECRETS_FOR_<PREFIX>` points at the secrets directory.
pub const SECRETS_VAR_PREFIX: &str = "SECRETS_FOR_";

/// Values injected as template constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injected {
    pub base_dir: PathBuf,
    pub home_dir: Option<PathBuf>,
    pub project_name: String,
}

/// Everything [`SettingsLoader::load`] needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub preload: PathBuf,
    /// Directory scanned for additional layers. `None` means no layers.
    pub layer_dir: Option<PathBuf>,
    /// Falls back to `SECRETS_FOR_<PREFIX>`.
    pub secrets_dir: Option<PathBuf>,
    pub env_prefix: String,
    /// Falls back to `ENV_FOR_<PREFIX>`, then `development`.
    pub environment: Option<String>,
    pub injected: Injected,
}

impl LoadRequest {
    /// Conventional layout: `<base_dir>/settings/settings.toml`, other layers
    /// next to it, prefix derived from the project name.
    pub fn for_project(base_dir: impl Into<PathBuf>, project_name: impl Into<String>) -> Self {
        let base_dir = base_dir.into();
        let project_name = project_name.into();
        let layer_dir = base_dir.join(SETTINGS_DIR_NAME);

        Self {
            preload: layer_dir.join(PRELOAD_FILE_NAME),
            layer_dir: Some(layer_dir),
            secrets_dir: None,
            env_prefix: env_prefix_for(&project_name),
            environment: None,
            injected: Injected {
                base_dir,
                home_dir: None,
                project_name,
            },
        }
    }

    pub fn with_layer_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.layer_dir = Some(dir.into());
        self
    }

    pub fn with_preload(mut self, path: impl Into<PathBuf>) -> Self {
        self.preload = path.into();
        self
    }

    pub fn with_secrets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.secrets_dir = Some(dir.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_home_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.injected.home_dir = Some(dir.into());
        self
    }
}

/// Environment prefix for a project name: upper-cased, with anything that is
/// not ASCII alphanumeric replaced by `_`.
///
/// `"my-app"` becomes `"MY_APP"`.
pub fn env_prefix_for(project_name: &str) -> String {
    project_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Builds settings stores. Holds the adapters; each `load` is independent.
pub struct SettingsLoader {
    filesystem: Box<dyn Filesystem>,
    parser: Box<dyn LayerParser>,
    environment: Box<dyn EnvironmentSource>,
    clock: Arc<dyn Clock>,
    sinks: Arc<dyn LogSinks>,
}

impl SettingsLoader {
    pub fn new(
        filesystem: Box<dyn Filesystem>,
        parser: Box<dyn LayerParser>,
        environment: Box<dyn EnvironmentSource>,
        clock: Arc<dyn Clock>,
        sinks: Arc<dyn LogSinks>,
    ) -> Self {
        Self {
            filesystem,
            parser,
            environment,
            clock,
            sinks,
        }
    }

    /// Build a settings store.
    ///
    /// Fails with `ConfigLoad` if the preload file is missing, or if any
    /// layer fails to read or parse.
    #[instrument(
        skip_all,
        fields(preload = %request.preload.display(), prefix = %request.env_prefix)
    )]
    pub fn load(&self, request: &LoadRequest) -> StrataResult<Settings> {
        let prefix = request.env_prefix.trim().to_uppercase();
        if prefix.is_empty() {
            return Err(ApplicationError::InvalidRequest("environment prefix is empty".into()).into());
        }

        let environment = self.active_environment(request, &prefix);
        let secrets_dir = request.secrets_dir.clone().or_else(|| {
            self.environment
                .var(&format!("{SECRETS_VAR_PREFIX}{prefix}"))
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from)
        });
        debug!(%environment, secrets_dir = ?secrets_dir, "Resolved load parameters");

        if !self.filesystem.exists(&request.preload) {
            return Err(ApplicationError::ConfigLoad {
                path: request.preload.clone(),
                reason: "preload file not found".into(),
            }
            .into());
        }

        let mut layers = vec![self.read_layer(&request.preload, LayerOrigin::Preload)?];

        if let Some(dir) = &request.layer_dir {
            for path in self.discover(dir, request.preload.file_name())? {
                layers.push(self.read_layer(&path, LayerOrigin::File)?);
            }
        }

        if let Some(dir) = &secrets_dir {
            for path in self.discover(dir, None)? {
                layers.push(self.read_layer(&path, LayerOrigin::Secret)?);
            }
        }

        if let Some(layer) = self.environment_layer(&prefix)? {
            layers.push(layer);
        }

        let injected = &request.injected;
        let mut helpers = Helpers::new(Arc::clone(&self.clock))
            .with_constant(BASE_DIR, injected.base_dir.clone())
            .with_constant(PROJECT_NAME, injected.project_name.as_str())
            .with_constant(ENV_PREFIX, prefix.as_str())
            .with_constant(ENVIRONMENT, environment.as_str());
        if let Some(home) = &injected.home_dir {
            helpers = helpers.with_constant(HOME_DIR, home.clone());
        }

        info!(
            layers = layers.len(),
            %environment,
            "Settings loaded"
        );

        Ok(Settings::new(
            environment,
            prefix,
            injected.base_dir.clone(),
            layers,
            helpers,
            Arc::clone(&self.sinks),
        ))
    }

    // -------------------------------------------------------------------------
    // Internal Helpers
    // -------------------------------------------------------------------------

    fn active_environment(&self, request: &LoadRequest, prefix: &str) -> String {
        request
            .environment
            .clone()
            .filter(|env| !env.trim().is_empty())
            .or_else(|| {
                self.environment
                    .var(&format!("{ENVIRONMENT_VAR_PREFIX}{prefix}"))
                    .filter(|env| !env.trim().is_empty())
            })
            .map_or_else(
                || DEFAULT_ENVIRONMENT.to_owned(),
                |env| env.trim().to_lowercase(),
            )
    }

    /// `.toml` files directly inside `dir`, sorted by file name.
    ///
    /// A missing directory yields no files.
    fn discover(&self, dir: &Path, exclude: Option<&OsStr>) -> StrataResult<Vec<PathBuf>> {
        if !self.filesystem.is_dir(dir) {
            debug!(dir = %dir.display(), "Layer directory absent, skipping");
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = self
            .filesystem
            .list_files(dir)?
            .into_iter()
            .filter(|path| path.extension() == Some(OsStr::new(LAYER_EXTENSION)))
            .filter(|path| exclude.is_none() || path.file_name() != exclude)
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        debug!(dir = %dir.display(), count = files.len(), "Discovered layer files");
        Ok(files)
    }

    fn read_layer(&self, path: &Path, origin: LayerOrigin) -> StrataResult<Layer> {
        let config_load = |reason: String| ApplicationError::ConfigLoad {
            path: path.to_path_buf(),
            reason,
        };

        let source = self
            .filesystem
            .read_to_string(path)
            .map_err(|e| config_load(e.to_string()))?;
        let document = self.parser.parse_document(&source).map_err(config_load)?;

        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let layer = Layer::from_document(name, origin, document)
            .map_err(|e| config_load(e.to_string()))?
            .with_path(path);

        debug!(layer = %layer, "Layer read");
        Ok(layer)
    }

    /// `<PREFIX>_*` variables as a single-section layer, or `None` if there
    /// are none.
    fn environment_layer(&self, prefix: &str) -> StrataResult<Option<Layer>> {
        let mut vars = self.environment.prefixed(prefix)?;
        if vars.is_empty() {
            return Ok(None);
        }
        vars.sort();

        let mut table = SettingsTable::new();
        for (key, raw) in vars {
            match normalize_key(&key) {
                Ok(path) => table.set_path(&path, self.parser.parse_value(&raw)),
                Err(e) => warn!(key = %key, error = %e, "Ignoring environment override"),
            }
        }

        debug!(count = table.len(), "Environment overrides collected");
        Ok(Some(
            Layer::new("environment", LayerOrigin::Environment).with_section(DEFAULT_SECTION, table),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        MockClock, MockEnvironmentSource, MockLayerParser, MockLogSinks,
    };
    use crate::domain::{Setting, Value};
    use crate::error::StrataError;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// In-memory files keyed by path. Directories are implied by file paths.
    #[derive(Default)]
    struct FakeFs {
        files: Mutex<BTreeMap<PathBuf, String>>,
    }

    impl FakeFs {
        fn with(self, path: &str, content: &str) -> Self {
            self.files
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), content.to_owned());
            self
        }
    }

    impl Filesystem for FakeFs {
        fn read_to_string(&self, path: &Path) -> StrataResult<String> {
            self.files.lock().unwrap().get(path).cloned().ok_or_else(|| {
                ApplicationError::FilesystemError {
                    path: path.to_path_buf(),
                    reason: "not found".into(),
                }
                .into()
            })
        }

        fn list_files(&self, dir: &Path) -> StrataResult<Vec<PathBuf>> {
            Ok(self
                .files
                .lock()
                .unwrap()
                .keys()
                .filter(|p| p.parent() == Some(dir))
                .rev()
                .cloned()
                .collect())
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.lock().unwrap().contains_key(path) || self.is_dir(path)
        }

        fn is_dir(&self, path: &Path) -> bool {
            self.files
                .lock()
                .unwrap()
                .keys()
                .any(|p| p.starts_with(path) && p != path)
        }

        fn create_dir_all(&self, _path: &Path) -> StrataResult<()> {
            Ok(())
        }

        fn write_file(&self, path: &Path, content: &str) -> StrataResult<()> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), content.to_owned());
            Ok(())
        }

        fn remove_file(&self, path: &Path) -> StrataResult<()> {
            self.files.lock().unwrap().remove(path);
            Ok(())
        }
    }

    /// Parser whose "documents" are looked up by their full text.
    fn parser(documents: Vec<(&str, SettingsTable)>) -> MockLayerParser {
        let documents: HashMap<String, SettingsTable> = documents
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect();
        let mut parser = MockLayerParser::new();
        parser.expect_parse_document().returning(move |source| {
            documents
                .get(source)
                .cloned()
                .ok_or_else(|| format!("unparsable: {source}"))
        });
        parser.expect_parse_value().returning(|raw| match raw.parse::<i64>() {
            Ok(n) => Setting::Literal(Value::Integer(n)),
            Err(_) => Setting::from_string(raw.to_owned()),
        });
        parser
    }

    fn environment(vars: &[(&str, &str)]) -> MockEnvironmentSource {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        let prefixed = vars.clone();
        let mut env = MockEnvironmentSource::new();
        env.expect_var().returning(move |name| vars.get(name).cloned());
        env.expect_prefixed().returning(move |prefix| {
            let head = format!("{prefix}_");
            Ok(prefixed
                .iter()
                .filter_map(|(k, v)| {
                    k.strip_prefix(&head)
                        .map(|rest| (rest.to_lowercase().replace("__", "."), v.clone()))
                })
                .collect())
        });
        env
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 4, 0, 0).unwrap()
    }

    fn fixed_clock() -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(start());
        Arc::new(clock)
    }

    fn section(table: SettingsTable) -> SettingsTable {
        SettingsTable::new().with("default", table)
    }

    fn preload_doc() -> SettingsTable {
        section(
            SettingsTable::new()
                .with("tz", Value::from("Asia/Kolkata"))
                .with("port", Value::from(8080_i64))
                .with(
                    "database",
                    SettingsTable::new().with("host", Value::from("localhost")),
                ),
        )
        .with(
            "production",
            SettingsTable::new().with("port", Value::from(80_i64)),
        )
    }

    fn loader(fs: FakeFs, parser: MockLayerParser, env: MockEnvironmentSource) -> SettingsLoader {
        SettingsLoader::new(
            Box::new(fs),
            Box::new(parser),
            Box::new(env),
            fixed_clock(),
            Arc::new(MockLogSinks::new()),
        )
    }

    fn request() -> LoadRequest {
        LoadRequest::for_project("/srv/demo", "demo")
    }

    fn demo_fs() -> FakeFs {
        FakeFs::default().with("/srv/demo/settings/settings.toml", "preload")
    }

    #[test]
    fn env_prefix_is_derived_from_project_name() {
        assert_eq!(env_prefix_for("demo"), "DEMO");
        assert_eq!(env_prefix_for("my-app.v2"), "MY_APP_V2");
    }

    #[test]
    fn for_project_uses_conventional_layout() {
        let req = request();
        assert_eq!(req.preload, PathBuf::from("/srv/demo/settings/settings.toml"));
        assert_eq!(req.layer_dir, Some(PathBuf::from("/srv/demo/settings")));
        assert_eq!(req.env_prefix, "DEMO");
    }

    #[test]
    fn environment_variable_overrides_preload() {
        let loader = loader(
            demo_fs(),
            parser(vec![("preload", preload_doc())]),
            environment(&[("DEMO_TZ", "UTC"), ("DEMO_DATABASE__HOST", "db.internal")]),
        );
        let settings = loader.load(&request()).unwrap();

        assert_eq!(settings.get("tz").unwrap(), Value::from("UTC"));
        assert_eq!(settings.get("database.host").unwrap(), Value::from("db.internal"));
        assert_eq!(settings.get("port").unwrap(), Value::Integer(8080));
    }

    #[test]
    fn layers_apply_in_file_name_order_after_preload() {
        let fs = demo_fs()
            .with("/srv/demo/settings/20-late.toml", "late")
            .with("/srv/demo/settings/10-early.toml", "early")
            .with("/srv/demo/settings/notes.txt", "ignored");
        let loader = loader(
            fs,
            parser(vec![
                ("preload", preload_doc()),
                ("early", section(SettingsTable::new().with("port", Value::from(1_i64)))),
                ("late", section(SettingsTable::new().with("port", Value::from(2_i64)))),
            ]),
            environment(&[]),
        );
        let settings = loader.load(&request()).unwrap();

        let names: Vec<_> = settings.layers().map(Layer::name).collect();
        assert_eq!(names, ["settings.toml", "10-early.toml", "20-late.toml"]);
        assert_eq!(settings.get("port").unwrap(), Value::Integer(2));
    }

    #[test]
    fn secrets_directory_comes_from_environment() {
        let fs = demo_fs().with("/run/secrets/demo/db.toml", "secret");
        let loader = loader(
            fs,
            parser(vec![
                ("preload", preload_doc()),
                (
                    "secret",
                    section(SettingsTable::new().with("password", Value::from("hunter2"))),
                ),
            ]),
            environment(&[("SECRETS_FOR_DEMO", "/run/secrets/demo")]),
        );
        let settings = loader.load(&request()).unwrap();

        assert_eq!(settings.get("password").unwrap(), Value::from("hunter2"));
        assert_eq!(
            settings.origin("password").unwrap().origin(),
            LayerOrigin::Secret
        );
    }

    #[test]
    fn active_environment_selects_section() {
        let loader = loader(
            demo_fs(),
            parser(vec![("preload", preload_doc())]),
            environment(&[("ENV_FOR_DEMO", "Production")]),
        );
        let settings = loader.load(&request()).unwrap();

        assert_eq!(settings.environment(), "production");
        assert_eq!(settings.get("port").unwrap(), Value::Integer(80));
        assert_eq!(settings.get("env").unwrap(), Value::from("production"));
    }

    #[test]
    fn request_environment_beats_variable() {
        let loader = loader(
            demo_fs(),
            parser(vec![("preload", preload_doc())]),
            environment(&[("ENV_FOR_DEMO", "production")]),
        );
        let settings = loader
            .load(&request().with_environment("staging"))
            .unwrap();
        assert_eq!(settings.environment(), "staging");
        assert_eq!(settings.get("port").unwrap(), Value::Integer(8080));
    }

    #[test]
    fn missing_preload_is_config_load_error() {
        let loader = loader(FakeFs::default(), parser(vec![]), environment(&[]));
        let err = loader.load(&request()).unwrap_err();
        assert!(matches!(
            err,
            StrataError::Application(ApplicationError::ConfigLoad { .. })
        ));
    }

    #[test]
    fn unparsable_layer_names_the_file() {
        let fs = demo_fs().with("/srv/demo/settings/broken.toml", "garbage");
        let loader = loader(fs, parser(vec![("preload", preload_doc())]), environment(&[]));
        match loader.load(&request()) {
            Err(StrataError::Application(ApplicationError::ConfigLoad { path, .. })) => {
                assert!(path.ends_with("broken.toml"));
            }
            other => panic!("expected ConfigLoad, got {other:?}"),
        }
    }

    #[test]
    fn non_section_top_level_key_is_rejected() {
        let doc = SettingsTable::new().with("tz", Value::from("UTC"));
        let loader = loader(demo_fs(), parser(vec![("preload", doc)]), environment(&[]));
        assert!(matches!(
            loader.load(&request()),
            Err(StrataError::Application(ApplicationError::ConfigLoad { .. }))
        ));
    }

    #[test]
    fn missing_layer_dir_contributes_nothing() {
        let fs = FakeFs::default().with("/etc/demo.toml", "preload");
        let loader = loader(fs, parser(vec![("preload", preload_doc())]), environment(&[]));
        let settings = loader
            .load(
                &request()
                    .with_preload("/etc/demo.toml")
                    .with_layer_dir("/nowhere"),
            )
            .unwrap();
        assert_eq!(settings.layers().count(), 1);
    }

    #[test]
    fn empty_prefix_is_invalid() {
        let loader = loader(demo_fs(), parser(vec![]), environment(&[]));
        assert!(matches!(
            loader.load(&request().with_env_prefix("  ")),
            Err(StrataError::Application(ApplicationError::InvalidRequest(_)))
        ));
    }

    #[test]
    fn injected_constants_are_readable() {
        let loader = loader(
            demo_fs(),
            parser(vec![("preload", preload_doc())]),
            environment(&[]),
        );
        let settings = loader.load(&request().with_home_dir("/home/demo")).unwrap();

        assert_eq!(settings.get("base_dir").unwrap(), Value::from("/srv/demo"));
        assert_eq!(settings.get("home_dir").unwrap(), Value::from("/home/demo"));
        assert_eq!(settings.get("date_partition").unwrap(), Value::from("2026-10-16"));
        assert_eq!(settings.get("env_prefix").unwrap(), Value::from("DEMO"));
    }

    #[test]
    fn now_advances_while_start_time_stays_fixed() {
        let ticks = AtomicI64::new(0);
        let mut clock = MockClock::new();
        clock
            .expect_now()
            .returning(move || start() + Duration::seconds(ticks.fetch_add(1, Ordering::SeqCst)));

        let doc = section(
            SettingsTable::new()
                .with("current", Value::from("@eval now(this.tz)"))
                .with("boot", Value::from("@eval start_time(this.tz)"))
                .with("tz", Value::from("Asia/Kolkata")),
        );
        let loader = SettingsLoader::new(
            Box::new(demo_fs()),
            Box::new(parser(vec![("preload", doc)])),
            Box::new(environment(&[("DEMO_TZ", "UTC")])),
            Arc::new(clock),
            Arc::new(MockLogSinks::new()),
        );
        let settings = loader.load(&request()).unwrap();

        let first = settings.get_as::<DateTime<FixedOffset>>("current").unwrap();
        let second = settings.get_as::<DateTime<FixedOffset>>("current").unwrap();
        assert!(second > first);
        assert_eq!(first.offset().local_minus_utc(), 0);

        assert_eq!(settings.get("boot").unwrap(), settings.get("boot").unwrap());
    }
}
