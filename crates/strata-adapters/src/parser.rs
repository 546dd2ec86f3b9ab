//! TOML layer parser.
//!
//! Layer files are TOML documents whose top-level tables are environment
//! sections. Environment override values are parsed as TOML literals so that
//! `DEMO_PORT=8080` yields an integer and `DEMO_TZ=UTC` stays a string.

use chrono::DateTime;
use toml::value::Datetime;

use strata_core::{
    application::ports::LayerParser,
    domain::{Setting, SettingsTable, Value},
};

/// Key used to wrap a raw override so it can be parsed as a TOML value.
const PROBE_KEY: &str = "value";

/// Production [`LayerParser`] backed by the `toml` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlLayerParser;

impl TomlLayerParser {
    pub fn new() -> Self {
        Self
    }
}

impl LayerParser for TomlLayerParser {
    fn parse_document(&self, source: &str) -> Result<SettingsTable, String> {
        let document: toml::Table = toml::from_str(source).map_err(|e| e.to_string())?;
        Ok(convert_table(document))
    }

    fn parse_value(&self, raw: &str) -> Setting {
        if !is_single_line_literal(raw) {
            return Setting::from_string(raw.to_owned());
        }
        let probe = format!("{PROBE_KEY} = {raw}");
        match toml::from_str::<toml::Table>(&probe) {
            Ok(mut table) if table.len() == 1 => match table.remove(PROBE_KEY) {
                Some(value) => convert(value),
                None => Setting::from_string(raw.to_owned()),
            },
            _ => Setting::from_string(raw.to_owned()),
        }
    }
}

/// `false` when `raw` spans lines or carries a `#` comment outside quotes,
/// either of which TOML would silently drop from the parsed value.
fn is_single_line_literal(raw: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in raw.chars() {
        if c == '\n' || c == '\r' {
            return false;
        }
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' => return false,
            None => {}
        }
    }
    true
}

fn convert_table(table: toml::Table) -> SettingsTable {
    let mut out = SettingsTable::new();
    for (key, value) in table {
        out.insert(&key, convert(value));
    }
    out
}

fn convert(value: toml::Value) -> Setting {
    match value {
        toml::Value::String(s) => Setting::from_string(s),
        toml::Value::Integer(i) => Setting::Literal(Value::Integer(i)),
        toml::Value::Float(f) => Setting::Literal(Value::Float(f)),
        toml::Value::Boolean(b) => Setting::Literal(Value::Boolean(b)),
        toml::Value::Datetime(dt) => Setting::Literal(convert_datetime(&dt)),
        toml::Value::Array(items) => Setting::Array(items.into_iter().map(convert).collect()),
        toml::Value::Table(table) => Setting::Table(convert_table(table)),
    }
}

/// Offset date-times keep their offset; local date-times are taken as UTC.
/// Bare dates and times stay strings.
fn convert_datetime(dt: &Datetime) -> Value {
    let text = dt.to_string();
    let rfc3339 = match (dt.date, dt.time, dt.offset) {
        (Some(_), Some(_), Some(_)) => text.clone(),
        (Some(_), Some(_), None) => format!("{text}Z"),
        _ => return Value::String(text),
    };
    DateTime::parse_from_rfc3339(&rfc3339).map_or(Value::String(text), Value::Datetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(setting: &Setting) -> &Value {
        match setting {
            Setting::Literal(value) => value,
            other => panic!("expected literal, got {other:?}"),
        }
    }

    #[test]
    fn document_keys_are_lower_cased_sections() {
        let doc = TomlLayerParser
            .parse_document(
                r#"
                [default]
                TZ = "Asia/Kolkata"
                port = 8080

                [default.Database]
                host = "localhost"

                [production]
                port = 80
                "#,
            )
            .unwrap();

        let default = doc.get("default").and_then(Setting::as_table).unwrap();
        assert_eq!(literal(default.get("tz").unwrap()), &Value::from("Asia/Kolkata"));
        assert_eq!(literal(default.get("port").unwrap()), &Value::Integer(8080));

        let path = ["database".to_owned(), "host".to_owned()];
        assert_eq!(
            literal(default.lookup(&path).unwrap()),
            &Value::from("localhost")
        );
        assert!(doc.get("production").is_some());
    }

    #[test]
    fn marker_strings_become_templates() {
        let doc = TomlLayerParser
            .parse_document("[default]\nlog_dir = \"@format {base_dir}/logs\"\n")
            .unwrap();
        let default = doc.get("default").and_then(Setting::as_table).unwrap();
        assert!(default.get("log_dir").unwrap().is_deferred());
    }

    #[test]
    fn invalid_document_is_an_error() {
        assert!(TomlLayerParser.parse_document("[default\nx = 1").is_err());
    }

    #[test]
    fn offset_datetimes_are_timestamps() {
        let doc = TomlLayerParser
            .parse_document("[default]\nat = 2026-10-16T09:30:00+05:30\nday = 2026-10-16\n")
            .unwrap();
        let default = doc.get("default").and_then(Setting::as_table).unwrap();

        let at = literal(default.get("at").unwrap());
        assert_eq!(at.as_datetime().unwrap().offset().local_minus_utc(), 19_800);
        assert_eq!(literal(default.get("day").unwrap()), &Value::from("2026-10-16"));
    }

    #[test]
    fn override_values_are_typed_when_possible() {
        let parser = TomlLayerParser;
        assert_eq!(literal(&parser.parse_value("8080")), &Value::Integer(8080));
        assert_eq!(literal(&parser.parse_value("true")), &Value::Boolean(true));
        assert_eq!(literal(&parser.parse_value("UTC")), &Value::from("UTC"));
        assert_eq!(
            literal(&parser.parse_value("\"quoted\"")),
            &Value::from("quoted")
        );
        assert!(matches!(parser.parse_value("[1, 2]"), Setting::Array(items) if items.len() == 2));
        assert!(parser.parse_value("@eval now('UTC')").is_deferred());
    }

    #[test]
    fn trailing_comments_and_extra_lines_keep_the_raw_string() {
        let parser = TomlLayerParser;
        assert_eq!(literal(&parser.parse_value("123 # x")), &Value::from("123 # x"));
        assert_eq!(
            literal(&parser.parse_value("1\nother = 2")),
            &Value::from("1\nother = 2")
        );
        assert_eq!(
            literal(&parser.parse_value("\"a # b\"")),
            &Value::from("a # b")
        );
        assert_eq!(
            literal(&parser.parse_value(r##""say \"#\"""##)),
            &Value::from("say \"#\"")
        );
    }
}
