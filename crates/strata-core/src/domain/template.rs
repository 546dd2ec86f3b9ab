//! Deferred template expressions.
//!
//! A string setting whose text starts with a marker is stored as a
//! [`Template`] instead of a literal and evaluated every time it is read:
//!
//! | Marker    | Result  | Example                                      |
//! |-----------|---------|----------------------------------------------|
//! | `@format` | string  | `"@format {base_dir}/logs/{date_partition}"` |
//! | `@eval`   | typed   | `"@eval now(this.tz)"`                       |
//!
//! Evaluation goes through a [`Scope`], which the settings store implements
//! so that `this.<key>` sees the fully merged settings at read time.

use std::fmt::{self, Write as _};

use chrono::format::{Item, StrftimeItems};

use crate::domain::{
    expression::{Expr, Segment, parse_expr, parse_format},
    helpers::Helpers,
    value::Value,
};

pub const FORMAT_MARKER: &str = "@format";
pub const EVAL_MARKER: &str = "@eval";

/// Name that prefixes settings references inside expressions.
const SELF_REFERENCE: &str = "this";

/// Which kind of deferred evaluation a template performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Interpolate placeholders into a string.
    Format,
    /// Evaluate a single expression to a typed value.
    Eval,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format => f.write_str(FORMAT_MARKER),
            Self::Eval => f.write_str(EVAL_MARKER),
        }
    }
}

/// A deferred expression. Holds source text only; parsing happens on
/// evaluation so that errors surface at first access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    marker: Marker,
    source: String,
}

/// What a template can see while it is being evaluated.
pub trait Scope {
    /// Resolve another setting by (dotted) key.
    fn setting(&mut self, key: &str) -> Result<Value, String>;

    fn helpers(&self) -> &Helpers;
}

impl Template {
    pub fn new(marker: Marker, source: impl Into<String>) -> Self {
        Self {
            marker,
            source: source.into(),
        }
    }

    /// Recognise a marker prefix. The marker must be followed by whitespace
    /// or end the string (`"@formatted"` is a plain literal).
    pub fn detect(raw: &str) -> Option<Self> {
        let trimmed = raw.trim_start();
        [(FORMAT_MARKER, Marker::Format), (EVAL_MARKER, Marker::Eval)]
            .into_iter()
            .find_map(|(prefix, marker)| {
                let rest = trimmed.strip_prefix(prefix)?;
                if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                    return None;
                }
                let body = rest.strip_prefix(|c: char| c.is_whitespace()).unwrap_or(rest);
                Some(Self::new(marker, body))
            })
    }

    pub const fn marker(&self) -> Marker {
        self.marker
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `scope`. Errors are plain reasons; the caller knows
    /// which key was being read and wraps them.
    pub fn evaluate(&self, scope: &mut dyn Scope) -> Result<Value, String> {
        match self.marker {
            Marker::Eval => {
                let expr = parse_expr(&self.source)?;
                eval(&expr, scope)
            }
            Marker::Format => {
                let mut out = String::new();
                for segment in parse_format(&self.source)? {
                    match segment {
                        Segment::Text(text) => out.push_str(&text),
                        Segment::Placeholder { expr, spec } => {
                            let value = eval(&expr, scope)?;
                            render_into(&mut out, &value, spec.as_deref())?;
                        }
                    }
                }
                Ok(Value::String(out))
            }
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.marker, self.source)
    }
}

fn eval(expr: &Expr, scope: &mut dyn Scope) -> Result<Value, String> {
    match expr {
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Int(i) => Ok(Value::Integer(*i)),
        Expr::Path(path) => match path.split_first() {
            Some((head, rest)) if head == SELF_REFERENCE => {
                if rest.is_empty() {
                    return Err(format!("'{SELF_REFERENCE}' must be followed by a key"));
                }
                scope.setting(&rest.join("."))
            }
            Some((name, [])) => scope.helpers().call(name, &[]),
            _ => Err(format!("undefined name '{}'", path.join("."))),
        },
        Expr::Call { name, args } => {
            let args = args
                .iter()
                .map(|arg| eval(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            scope.helpers().call(name, &args)
        }
    }
}

fn render_into(out: &mut String, value: &Value, spec: Option<&str>) -> Result<(), String> {
    match (value, spec) {
        (_, None) => write!(out, "{value}").map_err(|e| e.to_string()),
        (Value::Datetime(dt), Some(spec)) => {
            let items: Vec<Item<'_>> = StrftimeItems::new(spec).collect();
            if items.iter().any(|item| matches!(item, Item::Error)) {
                return Err(format!("invalid timestamp format '{spec}'"));
            }
            write!(out, "{}", dt.format_with_items(items.into_iter()))
                .map_err(|_| format!("cannot format timestamp with '{spec}'"))
        }
        (other, Some(spec)) => Err(format!(
            "format spec '{spec}' only applies to timestamps, not {}",
            other.type_name()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::MockClock;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Arc;

    struct MapScope {
        settings: HashMap<String, Value>,
        helpers: Helpers,
    }

    impl Scope for MapScope {
        fn setting(&mut self, key: &str) -> Result<Value, String> {
            self.settings
                .get(key)
                .cloned()
                .ok_or_else(|| format!("key '{key}' is not defined in any layer"))
        }

        fn helpers(&self) -> &Helpers {
            &self.helpers
        }
    }

    fn scope() -> MapScope {
        let mut clock = MockClock::new();
        clock
            .expect_now()
            .return_const(Utc.with_ymd_and_hms(2026, 10, 16, 4, 0, 0).unwrap());
        let helpers = Helpers::new(Arc::new(clock))
            .with_constant("base_dir", "/srv/demo")
            .with_constant("project_name", "demo");
        let mut settings = HashMap::new();
        settings.insert("tz".to_string(), Value::from("Asia/Kolkata"));
        MapScope { settings, helpers }
    }

    #[test]
    fn detect_requires_marker_boundary() {
        assert_eq!(
            Template::detect("@format {base_dir}"),
            Some(Template::new(Marker::Format, "{base_dir}"))
        );
        assert_eq!(
            Template::detect("@eval now()").map(|t| t.marker()),
            Some(Marker::Eval)
        );
        assert_eq!(Template::detect("@formatted"), None);
        assert_eq!(Template::detect("user@format"), None);
    }

    #[test]
    fn format_interpolates_helpers() {
        let t = Template::detect("@format {base_dir}/logs/{date_partition}").unwrap();
        assert_eq!(
            t.evaluate(&mut scope()),
            Ok(Value::from("/srv/demo/logs/2026-10-16"))
        );
    }

    #[test]
    fn format_applies_strftime_spec() {
        let t = Template::detect("@format run-{start_time(this.tz):%Y%m%dT%H%M}").unwrap();
        assert_eq!(t.evaluate(&mut scope()), Ok(Value::from("run-20261016T0930")));
    }

    #[test]
    fn eval_returns_typed_values() {
        let t = Template::detect("@eval start_time(this.tz)").unwrap();
        let value = t.evaluate(&mut scope()).unwrap();
        assert!(value.as_datetime().is_some());

        let t = Template::detect("@eval upper(project_name)").unwrap();
        assert_eq!(t.evaluate(&mut scope()), Ok(Value::from("DEMO")));
    }

    #[test]
    fn undefined_references_fail_on_evaluation() {
        let missing_key = Template::detect("@eval this.nope").unwrap();
        assert!(missing_key.evaluate(&mut scope()).unwrap_err().contains("nope"));

        let missing_helper = Template::detect("@format {tomorrow()}").unwrap();
        assert!(
            missing_helper
                .evaluate(&mut scope())
                .unwrap_err()
                .contains("tomorrow")
        );

        let dotted_helper = Template::detect("@eval base_dir.parent").unwrap();
        assert!(dotted_helper.evaluate(&mut scope()).is_err());
    }

    #[test]
    fn spec_on_non_timestamp_is_rejected() {
        let t = Template::detect("@format {project_name:%Y}").unwrap();
        assert!(t.evaluate(&mut scope()).unwrap_err().contains("timestamps"));
    }

    #[test]
    fn invalid_strftime_is_rejected() {
        let t = Template::detect("@format {now():%Q}").unwrap();
        assert!(t.evaluate(&mut scope()).is_err());
    }
}
