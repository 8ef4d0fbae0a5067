//! The exporter contract: option merging, output file naming and per-day export.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use moves_client::{Day, FetchOptions, utils::parse_day_key};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExportError, ExportResult};

/// Flat option map. Merging is a plain key override, right-most source wins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginConfig(BTreeMap<String, Value>);

impl PluginConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Copy every key of `other` over this map.
    pub fn merge_from(&mut self, other: &PluginConfig) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn merged(&self, overrides: &PluginConfig) -> PluginConfig {
        let mut out = self.clone();
        out.merge_from(overrides);
        out
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// String view of a value. Numbers and booleans are stringified so that
    /// `dayStart = 20140301` works the same as `dayStart = "20140301"`.
    pub fn str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Parse a `key=value` override. Values that look like booleans or
    /// integers are typed, everything else stays a string.
    pub fn parse_assignment(s: &str) -> Result<(String, Value), String> {
        let (key, raw) = s
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got {s:?}"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("missing option name in {s:?}"));
        }
        let value = match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => match raw.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::String(raw.to_string()),
            },
        };
        Ok((key.to_string(), value))
    }
}

/// Option merge plus output file naming, shared by every exporter.
#[derive(Clone, Debug)]
pub struct BaseConfig {
    defaults: PluginConfig,
    options: PluginConfig,
}

impl BaseConfig {
    pub fn new(defaults: PluginConfig) -> Self {
        Self {
            options: defaults.clone(),
            defaults,
        }
    }

    /// Merge `overrides` over the plugin defaults. Always starts from the
    /// defaults, so calling it twice with the same options changes nothing.
    pub fn configure(&mut self, overrides: &PluginConfig) {
        self.options = self.defaults.merged(overrides);
    }

    pub fn options(&self) -> &PluginConfig {
        &self.options
    }

    /// Render `outputFile` for a day key, resolved against the working directory.
    pub fn filename_for(&self, date: &str) -> ExportResult<PathBuf> {
        let template = self
            .options
            .str("outputFile")
            .unwrap_or_else(|| "%date%.txt".into());
        let format = self
            .options
            .str("dateFormat")
            .unwrap_or_else(|| "YYYYMMDD".into());
        let day = parse_day_key(date)
            .ok_or_else(|| ExportError::PersistFailed(format!("invalid day key {date:?}")))?;

        let formatted = day.format(&moment_to_strftime(&format)).to_string();
        let rendered = template.replace("%date%", &formatted);
        Ok(std::env::current_dir()?.join(rendered))
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            track_points: self.options.bool("trackPoints").unwrap_or(true),
        }
    }
}

/// Translate moment-style date tokens (`YYYY-MM-DD`) to a chrono format string.
///
/// Text in `[brackets]` is copied literally.
pub fn moment_to_strftime(format: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("M", "%-m"),
        ("DDDD", "%j"),
        ("DD", "%d"),
        ("D", "%-d"),
        ("dddd", "%A"),
        ("ddd", "%a"),
    ];

    let mut out = String::with_capacity(format.len() * 2);
    let mut rest = format;
    'outer: while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('[') {
            let (literal, tail) = stripped.split_once(']').unwrap_or((stripped, ""));
            out.push_str(&literal.replace('%', "%%"));
            rest = tail;
            continue;
        }
        for (token, spec) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }
    out
}

/// Name, description and documented options, shown by `ellie exporters`.
#[derive(Clone, Copy, Debug)]
pub struct ExporterHelp {
    pub name: &'static str,
    pub description: &'static str,
    pub options: &'static [(&'static str, &'static str)],
}

pub const FILE_OPTIONS_HELP: &[(&str, &str)] = &[
    (
        "outputFile",
        "File name format for output files, placeholders: %date%",
    ),
    ("dateFormat", "Date format to use"),
];

/// A per-day exporter.
///
/// `export_day` resolves exactly once with either the exported day key or the
/// reason the day could not be exported. Calls for different days may run
/// concurrently and finish in any order.
#[async_trait]
pub trait Exporter: Send + Sync {
    fn help(&self) -> ExporterHelp;

    fn base(&self) -> &BaseConfig;

    fn configure(&mut self, options: &PluginConfig);

    fn filename_for(&self, date: &str) -> ExportResult<PathBuf> {
        self.base().filename_for(date)
    }

    fn fetch_options(&self) -> FetchOptions {
        self.base().fetch_options()
    }

    async fn export_day(&self, day: &Day) -> ExportResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base(pairs: &[(&str, &str)]) -> BaseConfig {
        let mut base = BaseConfig::new(PluginConfig::from_pairs([
            ("outputFile", "%date%.txt"),
            ("dateFormat", "YYYYMMDD"),
        ]));
        base.configure(&PluginConfig::from_pairs(pairs.iter().copied()));
        base
    }

    #[test]
    fn filename_uses_default_template_relative_to_cwd() {
        let path = base(&[]).filename_for("20140305").unwrap();
        assert_eq!(path, std::env::current_dir().unwrap().join("20140305.txt"));
    }

    #[test]
    fn filename_honours_date_format_and_template() {
        let path = base(&[("outputFile", "moves-%date%.json"), ("dateFormat", "YYYY-MM-DD")])
            .filename_for("20140305")
            .unwrap();
        assert!(path.ends_with("moves-2014-03-05.json"));
    }

    #[test]
    fn filename_keeps_absolute_templates() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("%date%.png");
        let path = base(&[("outputFile", template.to_str().unwrap())])
            .filename_for("20140305")
            .unwrap();
        assert_eq!(path, dir.path().join("20140305.png"));
    }

    #[test]
    fn filename_rejects_bad_day_key() {
        assert!(matches!(
            base(&[]).filename_for("2014-03-05"),
            Err(ExportError::PersistFailed(_))
        ));
    }

    #[test]
    fn configure_is_idempotent_and_overrides_defaults() {
        let overrides = PluginConfig::from_pairs([("dateFormat", "DD.MM.YY")]);
        let mut b = BaseConfig::new(PluginConfig::from_pairs([
            ("outputFile", "%date%.txt"),
            ("dateFormat", "YYYYMMDD"),
        ]));
        b.configure(&overrides);
        let first = b.options().clone();
        b.configure(&overrides);
        assert_eq!(&first, b.options());
        assert_eq!(first.str("dateFormat").as_deref(), Some("DD.MM.YY"));
        assert_eq!(first.str("outputFile").as_deref(), Some("%date%.txt"));
    }

    #[test]
    fn merge_is_right_most_wins() {
        let defaults = PluginConfig::from_pairs([("size", json!("800x600")), ("scale", json!(1))]);
        let persisted = PluginConfig::from_pairs([("size", json!("640x480"))]);
        let cli = PluginConfig::from_pairs([("scale", json!(2))]);
        let merged = defaults.merged(&persisted).merged(&cli);
        assert_eq!(merged.str("size").as_deref(), Some("640x480"));
        assert_eq!(merged.u64("scale"), Some(2));
    }

    #[test]
    fn typed_accessors_accept_loose_values() {
        let cfg = PluginConfig::from_pairs([
            ("a", json!("true")),
            ("b", json!(0)),
            ("c", json!("42")),
            ("d", json!(20140301)),
        ]);
        assert_eq!(cfg.bool("a"), Some(true));
        assert_eq!(cfg.bool("b"), Some(false));
        assert_eq!(cfg.u64("c"), Some(42));
        assert_eq!(cfg.str("d").as_deref(), Some("20140301"));
        assert_eq!(cfg.str("missing"), None);
    }

    #[test]
    fn parse_assignment_types_values() {
        assert_eq!(
            PluginConfig::parse_assignment("overwrite=true").unwrap(),
            ("overwrite".to_string(), json!(true))
        );
        assert_eq!(
            PluginConfig::parse_assignment("scale=2").unwrap(),
            ("scale".to_string(), json!(2))
        );
        assert_eq!(
            PluginConfig::parse_assignment("size=640x480").unwrap(),
            ("size".to_string(), json!("640x480"))
        );
        assert!(PluginConfig::parse_assignment("nope").is_err());
        assert!(PluginConfig::parse_assignment("=1").is_err());
    }

    #[test]
    fn moment_tokens_translate() {
        assert_eq!(moment_to_strftime("YYYYMMDD"), "%Y%m%d");
        assert_eq!(moment_to_strftime("DD.MM.YY"), "%d.%m.%y");
        assert_eq!(moment_to_strftime("[day] D MMM"), "day %-d %b");
        assert_eq!(moment_to_strftime("100%"), "100%%");
    }

    #[test]
    fn track_points_default_on() {
        assert!(base(&[]).fetch_options().track_points);
        let mut b = base(&[]);
        b.configure(&PluginConfig::from_pairs([("trackPoints", false)]));
        assert!(!b.fetch_options().track_points);
    }
}
