//! The resolved settings store.
//!
//! [`Settings`] is built once by `SettingsLoader::load` and then passed to
//! whatever needs configuration. Layers are merged eagerly at construction;
//! templates are evaluated lazily on every read, against the merged store.
//!
//! # Precedence (highest first)
//!
//! 1. Environment variables with the declared prefix
//! 2. Secret files (later file name wins)
//! 3. Discovered layer files (later file name wins)
//! 4. The preload file
//! 5. Injected constants (`base_dir`, `date_partition`, ...)

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::{
    application::{ApplicationError, ports::LogSinks},
    domain::{
        DomainError, FromValue, Helpers, Layer, Scope, Setting, SettingsTable, Value,
        helpers::PROJECT_NAME, normalize_key,
    },
    error::{StrataError, StrataResult},
};

/// Setting that overrides where structured log files go.
pub const LOG_DIR_KEY: &str = "log_dir";
/// Used when `log_dir` is not set; relative to `base_dir`.
pub const DEFAULT_LOG_DIR: &str = "logs";
/// File extension of structured log files.
pub const SINK_EXTENSION: &str = "jsonl";
/// Joins the project name and a sink suffix.
pub const IDENTITY_SEPARATOR: &str = "__";

/// Outcome of [`Settings::attach_structured_file_sink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkAttachment {
    pub path: PathBuf,
    /// `false` when the destination was already registered.
    pub newly_attached: bool,
}

struct LoadedLayer {
    layer: Layer,
    view: SettingsTable,
}

/// Immutable-after-load settings context.
pub struct Settings {
    environment: String,
    env_prefix: String,
    base_dir: PathBuf,
    layers: Vec<LoadedLayer>,
    merged: SettingsTable,
    helpers: Helpers,
    sinks: Arc<dyn LogSinks>,
}

impl Settings {
    /// Assemble a store from layers given lowest precedence first.
    pub fn new(
        environment: impl Into<String>,
        env_prefix: impl Into<String>,
        base_dir: impl Into<PathBuf>,
        layers: Vec<Layer>,
        helpers: Helpers,
        sinks: Arc<dyn LogSinks>,
    ) -> Self {
        let environment = environment.into().to_lowercase();
        let mut merged = SettingsTable::new();
        let layers = layers
            .into_iter()
            .map(|layer| {
                let view = layer.view(&environment);
                merged.merge_from(&view);
                LoadedLayer { layer, view }
            })
            .collect();

        Self {
            environment,
            env_prefix: env_prefix.into(),
            base_dir: base_dir.into(),
            layers,
            merged,
            helpers,
            sinks,
        }
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    /// Resolve `key` (case-insensitive, dotted for nesting).
    ///
    /// Templates are evaluated now, so time-based values reflect the moment
    /// of this call.
    pub fn get(&self, key: &str) -> StrataResult<Value> {
        Evaluation::new(self).resolve(key)
    }

    /// Resolve `key` and convert it to `T`.
    pub fn get_as<T: FromValue>(&self, key: &str) -> StrataResult<T> {
        let value = self.get(key)?;
        T::from_value(value).map_err(|found| {
            DomainError::TypeMismatch {
                key: key.to_owned(),
                expected: T::EXPECTED,
                found: found.type_name(),
            }
            .into()
        })
    }

    /// `true` if any layer or injected constant defines `key`.
    pub fn contains(&self, key: &str) -> bool {
        normalize_key(key).is_ok_and(|path| self.lookup(&path).is_some() || self.constant(&path).is_some())
    }

    /// The highest-precedence layer that defines `key`, if any.
    ///
    /// `None` for undefined keys and for injected constants.
    pub fn origin(&self, key: &str) -> Option<&Layer> {
        let path = normalize_key(key).ok()?;
        self.layers
            .iter()
            .rev()
            .find(|loaded| loaded.view.lookup(&path).is_some())
            .map(|loaded| &loaded.layer)
    }

    /// Every key, fully evaluated. Injected constants appear unless a layer
    /// overrides them.
    pub fn resolve_all(&self) -> StrataResult<Value> {
        let mut eval = Evaluation::new(self);
        let mut out: BTreeMap<String, Value> = self
            .helpers
            .constants()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, setting) in self.merged.iter() {
            eval.stack.push(key.clone());
            let value = eval.materialize(key, setting);
            eval.stack.pop();
            out.insert(key.clone(), value?);
        }
        Ok(Value::Table(out))
    }

    // ── Introspection ─────────────────────────────────────────────────────

    /// Loaded layers, lowest precedence first.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().map(|loaded| &loaded.layer)
    }

    /// Active environment section name.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub const fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    /// The project's resolved name: the `project_name` setting, else the
    /// injected constant.
    pub fn project_name(&self) -> StrataResult<String> {
        self.get_as::<String>(PROJECT_NAME)
    }

    // ── Structured log sink ───────────────────────────────────────────────

    /// Where a structured sink with `suffix` would write.
    ///
    /// `<log_dir>/<project>.jsonl`, or `<log_dir>/<project>__<suffix>.jsonl`
    /// for a non-empty suffix. A relative `log_dir` is joined to `base_dir`.
    pub fn sink_destination(&self, suffix: Option<&str>) -> StrataResult<PathBuf> {
        let log_dir = if self.contains(LOG_DIR_KEY) {
            self.get_as::<PathBuf>(LOG_DIR_KEY)?
        } else {
            PathBuf::from(DEFAULT_LOG_DIR)
        };
        let log_dir = if log_dir.is_relative() {
            self.base_dir.join(log_dir)
        } else {
            log_dir
        };

        let project = self.project_name()?;
        let identity = match suffix.map(str::trim).filter(|s| !s.is_empty()) {
            Some(suffix) => {
                if suffix.contains(['/', '\\']) || suffix == "." || suffix == ".." {
                    return Err(ApplicationError::SinkAttach {
                        path: log_dir.join(suffix),
                        reason: format!("suffix '{suffix}' must be a plain name"),
                    }
                    .into());
                }
                format!("{project}{IDENTITY_SEPARATOR}{suffix}")
            }
            None => project,
        };

        Ok(log_dir.join(format!("{identity}.{SINK_EXTENSION}")))
    }

    /// Also write log records, as JSON lines, to the destination computed by
    /// [`sink_destination`](Self::sink_destination).
    ///
    /// Idempotent per resolved path.
    #[instrument(skip(self))]
    pub fn attach_structured_file_sink(&self, suffix: Option<&str>) -> StrataResult<SinkAttachment> {
        let path = self.sink_destination(suffix)?;
        let newly_attached = self.sinks.attach(&path)?;
        if newly_attached {
            info!(path = %path.display(), "Structured log sink attached");
        } else {
            debug!(path = %path.display(), "Structured log sink already attached");
        }
        Ok(SinkAttachment {
            path,
            newly_attached,
        })
    }

    /// Destinations currently registered with the sink registry.
    pub fn sink_destinations(&self) -> Vec<PathBuf> {
        self.sinks.destinations()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn lookup(&self, path: &[String]) -> Option<&Setting> {
        self.merged.lookup(path)
    }

    fn constant(&self, path: &[String]) -> Option<&Value> {
        match path {
            [name] => self.helpers.constant(name),
            _ => None,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("environment", &self.environment)
            .field("env_prefix", &self.env_prefix)
            .field("base_dir", &self.base_dir)
            .field("layers", &self.layers().map(Layer::name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

// ── Evaluation ────────────────────────────────────────────────────────────────

/// One read against the store. Tracks the chain of keys being evaluated so
/// that self-referencing templates fail instead of recursing forever.
struct Evaluation<'a> {
    settings: &'a Settings,
    stack: Vec<String>,
}

impl<'a> Evaluation<'a> {
    const fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            stack: Vec::new(),
        }
    }

    fn resolve(&mut self, key: &str) -> StrataResult<Value> {
        let path = normalize_key(key)?;
        let canonical = path.join(".");

        if self.stack.contains(&canonical) {
            let chain = self.stack.join(" -> ");
            return Err(DomainError::TemplateEvaluation {
                key: canonical.clone(),
                reason: format!("cyclic reference {chain} -> {canonical}"),
            }
            .into());
        }

        let settings = self.settings;
        let Some(setting) = settings.lookup(&path) else {
            return settings
                .constant(&path)
                .cloned()
                .ok_or_else(|| DomainError::KeyNotFound { key: canonical }.into());
        };

        self.stack.push(canonical.clone());
        let result = self.materialize(&canonical, setting);
        self.stack.pop();
        result
    }

    fn materialize(&mut self, key: &str, setting: &Setting) -> StrataResult<Value> {
        match setting {
            Setting::Literal(value) => Ok(value.clone()),
            Setting::Deferred(template) => template.evaluate(self).map_err(|reason| {
                DomainError::TemplateEvaluation {
                    key: key.to_owned(),
                    reason,
                }
                .into()
            }),
            Setting::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.materialize(&format!("{key}[{i}]"), item))
                .collect::<StrataResult<Vec<_>>>()
                .map(Value::Array),
            Setting::Table(table) => {
                let mut out = BTreeMap::new();
                for (child, item) in table.iter() {
                    out.insert(child.clone(), self.materialize(&format!("{key}.{child}"), item)?);
                }
                Ok(Value::Table(out))
            }
        }
    }
}

impl Scope for Evaluation<'_> {
    fn setting(&mut self, key: &str) -> Result<Value, String> {
        self.resolve(key).map_err(|err| match err {
            StrataError::Domain(inner) => inner.to_string(),
            other => other.to_string(),
        })
    }

    fn helpers(&self) -> &Helpers {
        &self.settings.helpers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockClock, MockLogSinks};
    use crate::domain::{Clock, LayerOrigin, helpers};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Mutex;

    /// A clock that advances one second per reading.
    struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock().unwrap();
            let now = *next;
            *next += Duration::seconds(1);
            now
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 4, 0, 0).unwrap()
    }

    fn helpers_with(clock: Arc<dyn Clock>) -> Helpers {
        Helpers::new(clock)
            .with_constant(helpers::BASE_DIR, "/srv/demo")
            .with_constant(helpers::PROJECT_NAME, "demo")
    }

    fn fixed_helpers() -> Helpers {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(start());
        helpers_with(Arc::new(clock))
    }

    fn no_sinks() -> Arc<dyn LogSinks> {
        Arc::new(MockLogSinks::new())
    }

    fn layer(name: &str, origin: LayerOrigin, table: SettingsTable) -> Layer {
        Layer::new(name, origin).with_section("default", table)
    }

    fn preload() -> Layer {
        layer(
            "settings.toml",
            LayerOrigin::Preload,
            SettingsTable::new()
                .with("tz", Value::from("Asia/Kolkata"))
                .with("port", Value::from(8080_i64))
                .with("log_dir", Value::from("@format {base_dir}/logs/{date_partition}"))
                .with("started", Value::from("@eval start_time(this.tz)"))
                .with(
                    "database",
                    SettingsTable::new().with("host", Value::from("localhost")),
                ),
        )
    }

    fn settings(layers: Vec<Layer>) -> Settings {
        Settings::new("development", "DEMO", "/srv/demo", layers, fixed_helpers(), no_sinks())
    }

    #[test]
    fn environment_layer_beats_preload() {
        let env = layer(
            "environment",
            LayerOrigin::Environment,
            SettingsTable::new().with("tz", Value::from("UTC")),
        );
        let s = settings(vec![preload(), env]);
        assert_eq!(s.get("tz").unwrap(), Value::from("UTC"));
        assert_eq!(s.origin("TZ").unwrap().origin(), LayerOrigin::Environment);
    }

    #[test]
    fn later_file_beats_earlier_file() {
        let a = layer(
            "10-a.toml",
            LayerOrigin::File,
            SettingsTable::new().with("port", Value::from(1_i64)),
        );
        let b = layer(
            "20-b.toml",
            LayerOrigin::File,
            SettingsTable::new().with("port", Value::from(2_i64)),
        );
        let s = settings(vec![preload(), a, b]);
        assert_eq!(s.get_as::<i64>("port").unwrap(), 2);
        assert_eq!(s.origin("port").unwrap().name(), "20-b.toml");
    }

    #[test]
    fn literal_reads_are_idempotent() {
        let s = settings(vec![preload()]);
        assert_eq!(s.get("port").unwrap(), s.get("port").unwrap());
        assert_eq!(s.get("Database.Host").unwrap(), Value::from("localhost"));
    }

    #[test]
    fn missing_key_is_key_not_found() {
        let s = settings(vec![preload()]);
        let err = s.get("nope").unwrap_err();
        assert!(err.is_key_not_found());
        assert!(!s.contains("nope"));
    }

    #[test]
    fn constants_are_lowest_precedence() {
        let s = settings(vec![preload()]);
        assert_eq!(s.get("project_name").unwrap(), Value::from("demo"));
        assert!(s.origin("project_name").is_none());

        let renamed = layer(
            "settings.toml",
            LayerOrigin::Preload,
            SettingsTable::new().with("project_name", Value::from("renamed")),
        );
        let s = settings(vec![renamed]);
        assert_eq!(s.project_name().unwrap(), "renamed");
    }

    #[test]
    fn templates_see_values_defined_in_later_layers() {
        let later = layer(
            "secrets.toml",
            LayerOrigin::Secret,
            SettingsTable::new().with("tz", Value::from("UTC")),
        );
        let s = settings(vec![preload(), later]);
        let started = s.get("started").unwrap();
        assert_eq!(started.as_datetime().unwrap().offset().local_minus_utc(), 0);
    }

    #[test]
    fn now_template_advances_between_reads() {
        let clock = Arc::new(SteppingClock {
            next: Mutex::new(start()),
        });
        let table = SettingsTable::new()
            .with("current", Value::from("@eval now('UTC')"))
            .with("boot", Value::from("@eval start_time('UTC')"));
        let s = Settings::new(
            "development",
            "DEMO",
            "/srv/demo",
            vec![layer("settings.toml", LayerOrigin::Preload, table)],
            helpers_with(clock),
            no_sinks(),
        );

        let first = s.get_as::<DateTime<chrono::FixedOffset>>("current").unwrap();
        let second = s.get_as::<DateTime<chrono::FixedOffset>>("current").unwrap();
        assert!(second > first);

        assert_eq!(s.get("boot").unwrap(), s.get("boot").unwrap());
    }

    #[test]
    fn undefined_reference_is_evaluation_error_on_access() {
        let table = SettingsTable::new().with("broken", Value::from("@format {this.missing}"));
        let s = settings(vec![layer("settings.toml", LayerOrigin::Preload, table)]);
        match s.get("broken") {
            Err(StrataError::Domain(DomainError::TemplateEvaluation { key, reason })) => {
                assert_eq!(key, "broken");
                assert!(reason.contains("missing"));
            }
            other => panic!("expected evaluation error, got {other:?}"),
        }
    }

    #[test]
    fn cyclic_references_are_detected() {
        let table = SettingsTable::new()
            .with("a", Value::from("@eval this.b"))
            .with("b", Value::from("@eval this.a"));
        let s = settings(vec![layer("settings.toml", LayerOrigin::Preload, table)]);
        let err = s.get("a").unwrap_err();
        assert!(err.to_string().contains("cyclic"));
    }

    #[test]
    fn type_mismatch_names_both_types() {
        let s = settings(vec![preload()]);
        let err = s.get_as::<bool>("tz").unwrap_err();
        assert!(matches!(
            err,
            StrataError::Domain(DomainError::TypeMismatch {
                expected: "a boolean",
                found: "a string",
                ..
            })
        ));
    }

    #[test]
    fn resolve_all_evaluates_nested_templates() {
        let s = settings(vec![preload()]);
        let all = s.resolve_all().unwrap();
        let table = all.as_table().unwrap();
        assert_eq!(
            table.get("log_dir"),
            Some(&Value::from("/srv/demo/logs/2026-10-16"))
        );
        assert_eq!(table.get("project_name"), Some(&Value::from("demo")));
    }

    #[test]
    fn sink_destination_uses_project_and_suffix() {
        let s = settings(vec![preload()]);
        let plain = s.sink_destination(None).unwrap();
        let tagged = s.sink_destination(Some("ingestion")).unwrap();

        assert_eq!(plain, PathBuf::from("/srv/demo/logs/2026-10-16/demo.jsonl"));
        assert!(
            tagged
                .file_name()
                .unwrap()
                .to_string_lossy()
                .contains("demo__ingestion")
        );
        assert_ne!(plain, tagged);
        assert_eq!(s.sink_destination(Some("  ")).unwrap(), plain);
    }

    #[test]
    fn sink_destination_defaults_to_logs_under_base_dir() {
        let s = settings(vec![layer(
            "settings.toml",
            LayerOrigin::Preload,
            SettingsTable::new(),
        )]);
        assert_eq!(
            s.sink_destination(None).unwrap(),
            PathBuf::from("/srv/demo/logs/demo.jsonl")
        );
    }

    #[test]
    fn sink_suffix_with_separator_is_rejected() {
        let s = settings(vec![preload()]);
        assert!(matches!(
            s.sink_destination(Some("../escape")),
            Err(StrataError::Application(ApplicationError::SinkAttach { .. }))
        ));
    }

    #[test]
    fn attach_delegates_to_registry() {
        let mut sinks = MockLogSinks::new();
        sinks
            .expect_attach()
            .withf(|path| path.ends_with("demo__ingestion.jsonl"))
            .times(1)
            .returning(|_| Ok(true));
        let s = Settings::new(
            "development",
            "DEMO",
            "/srv/demo",
            vec![preload()],
            fixed_helpers(),
            Arc::new(sinks),
        );

        let attached = s.attach_structured_file_sink(Some("ingestion")).unwrap();
        assert!(attached.newly_attached);
    }

    #[test]
    fn accessors_report_load_context() {
        let mut sinks = MockLogSinks::new();
        sinks
            .expect_destinations()
            .returning(|| vec![PathBuf::from("/srv/demo/logs/demo.jsonl")]);
        let s = Settings::new(
            "production",
            "DEMO",
            "/srv/demo",
            vec![preload()],
            fixed_helpers(),
            Arc::new(sinks),
        );

        assert_eq!(s.environment(), "production");
        assert_eq!(s.env_prefix(), "DEMO");
        assert_eq!(s.base_dir(), Path::new("/srv/demo"));
        assert_eq!(s.layers().count(), 1);
        assert_eq!(
            s.sink_destinations(),
            [PathBuf::from("/srv/demo/logs/demo.jsonl")]
        );
    }
}
