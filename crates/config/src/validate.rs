//! Configuration validation engine.
//!
//! Checks a config file against the known schema, detects unknown or
//! misspelled fields, and reports settings the relay cannot start with.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use crate::{
    env::apply_env_overrides_with, env_subst::substitute_env_with, schema::RelaygramConfig,
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "relay",
    /// "moderation", "pipeline", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "relay.destination"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Expected shape of the configuration.
enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    /// Scalar or list of scalars; recursion stops here.
    Leaf,
}

/// Mirror of every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    let provider = || {
        Struct(HashMap::from([
            ("name", Leaf),
            ("base_url", Leaf),
            ("api_key", Leaf),
            ("model", Leaf),
        ]))
    };

    Struct(HashMap::from([
        (
            "telegram",
            Struct(HashMap::from([
                ("bot_token", Leaf),
                ("api_url", Leaf),
                ("large_file_api_url", Leaf),
                ("poll_timeout_secs", Leaf),
            ])),
        ),
        (
            "relay",
            Struct(HashMap::from([
                ("sources", Leaf),
                ("destination", Leaf),
                ("operator", Leaf),
            ])),
        ),
        (
            "moderation",
            Struct(HashMap::from([
                ("primary", provider()),
                ("fallback", provider()),
            ])),
        ),
        (
            "pipeline",
            Struct(HashMap::from([
                ("album_quiet_period_ms", Leaf),
                ("large_file_threshold_bytes", Leaf),
                ("staging_dir", Leaf),
            ])),
        ),
    ]))
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

/// Validate the config file at `path`, or the discovered one when `None`.
///
/// Semantic checks run against the effective configuration, i.e. after
/// environment overrides, so a token supplied only via `BOT_TOKEN` is not
/// reported as missing.
pub fn validate(path: Option<&Path>) -> ValidationResult {
    validate_with(path, |name| std::env::var(name).ok())
}

fn validate_with(
    path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String> + Copy,
) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        let mut config = RelaygramConfig::default();
        apply_env_overrides_with(&mut config, lookup);
        config.moderation.fill_defaults();
        let mut diagnostics = vec![Diagnostic::new(
            Severity::Info,
            "file-ref",
            "",
            "no config file found; using defaults and environment",
        )];
        check_semantics(&config, &mut diagnostics);
        return ValidationResult {
            diagnostics,
            config_path: None,
        };
    };

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let format = actual_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("toml");
            let content = substitute_env_with(&content, lookup);
            let mut result = validate_str_inner(&content, format, |cfg| {
                apply_env_overrides_with(cfg, lookup);
            });
            result.config_path = Some(actual_path.clone());
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate raw config text. `format` is the file extension
/// (`toml`, `yaml`, `yml` or `json`).
pub fn validate_str(raw: &str, format: &str) -> ValidationResult {
    validate_str_inner(raw, format, |_| {})
}

fn validate_str_inner(
    raw: &str,
    format: &str,
    overrides: impl FnOnce(&mut RelaygramConfig),
) -> ValidationResult {
    let mut diagnostics = Vec::new();

    // 1. Syntax: parse into a generic tree
    let tree = match parse_tree(raw, format) {
        Ok(v) => v,
        Err(message) => {
            diagnostics.push(Diagnostic::new(Severity::Error, "syntax", "", message));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    // 2. Unknown fields
    check_unknown_fields(&tree, &build_schema_map(), "", &mut diagnostics);

    // 3. Types: full deserialization
    match serde_json::from_value::<RelaygramConfig>(tree) {
        Ok(mut config) => {
            overrides(&mut config);
            config.moderation.fill_defaults();
            check_semantics(&config, &mut diagnostics);
        },
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn parse_tree(raw: &str, format: &str) -> Result<serde_json::Value, String> {
    match format {
        "toml" => {
            let v: toml::Value =
                toml::from_str(raw).map_err(|e| format!("TOML syntax error: {e}"))?;
            serde_json::to_value(v).map_err(|e| e.to_string())
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value =
                serde_yaml::from_str(raw).map_err(|e| format!("YAML syntax error: {e}"))?;
            // an empty YAML document is null
            if v.is_null() {
                return Ok(serde_json::Value::Object(Default::default()));
            }
            serde_json::to_value(v).map_err(|e| e.to_string())
        },
        "json" => serde_json::from_str(raw).map_err(|e| format!("JSON syntax error: {e}")),
        other => Err(format!("unsupported config format: .{other}")),
    }
}

fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (serde_json::Value::Object(table), KnownKeys::Struct(fields)) = (value, schema) else {
        // Leaf or type mismatch; type errors are reported by deserialization
        return;
    };
    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }
        let level = if prefix.is_empty() {
            "at top level "
        } else {
            ""
        };
        let msg = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
            None => format!("unknown field {level}"),
        };
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "unknown-field",
            path,
            msg.trim(),
        ));
    }
}

/// Checks on the effective configuration.
pub fn check_semantics(config: &RelaygramConfig, diagnostics: &mut Vec<Diagnostic>) {
    if !config.telegram.has_token() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "relay",
            "telegram.bot_token",
            "bot token is not set (config or BOT_TOKEN)",
        ));
    }

    for (path, url) in [
        ("telegram.api_url", config.telegram.api_url.as_deref()),
        (
            "telegram.large_file_api_url",
            config.telegram.large_file_api_url.as_deref(),
        ),
        (
            "moderation.primary.base_url",
            Some(config.moderation.primary.base_url.as_str()),
        ),
        (
            "moderation.fallback.base_url",
            Some(config.moderation.fallback.base_url.as_str()),
        ),
    ] {
        if let Some(url) = url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "relay",
                path,
                format!("\"{url}\" is not an http(s) URL"),
            ));
        }
    }

    if config.relay.sources.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "relay",
            "relay.sources",
            "no source channels configured (relay.sources or SOURCE_CHANNELS)",
        ));
    }
    let mut seen = HashSet::new();
    for source in &config.relay.sources {
        let key = source
            .trim()
            .trim_start_matches("https://t.me/")
            .trim_start_matches('@')
            .to_ascii_lowercase();
        if !seen.insert(key) {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "relay",
                "relay.sources",
                format!("source \"{source}\" is listed more than once"),
            ));
        }
    }

    if config.relay.destination.trim().is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "relay",
            "relay.destination",
            "destination channel is not set (relay.destination or DESTINATION_CHANNEL)",
        ));
    }

    match config.relay.operator.as_deref().map(str::trim) {
        None | Some("") => diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "relay",
            "relay.operator",
            "no operator configured; moderation failures will only be logged",
        )),
        Some(op) if op.parse::<i64>().is_err() => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "relay",
            "relay.operator",
            format!("operator \"{op}\" must be a numeric chat id"),
        )),
        Some(_) => {},
    }

    if !config.moderation.primary.is_configured() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "moderation",
            "moderation.primary.api_key",
            "primary moderation key not set; posts will be published with the degraded default",
        ));
    }
    if !config.moderation.fallback.is_configured() {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "moderation",
            "moderation.fallback.api_key",
            "no fallback moderation service configured",
        ));
    }

    if config.pipeline.album_quiet_period_ms == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "pipeline",
            "pipeline.album_quiet_period_ms",
            "a zero quiet period flushes albums before later members arrive",
        ));
    }
    if config.pipeline.large_file_threshold_bytes == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "pipeline",
            "pipeline.large_file_threshold_bytes",
            "a zero threshold sends every payload through the large-file path",
        ));
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
[telegram]
bot_token = "123:ABC"

[relay]
sources = ["@news", "https://t.me/world"]
destination = "@mirror"
operator = "1001"

[moderation.primary]
api_key = "sk-primary"

[moderation.fallback]
api_key = "sk-fallback"
"#;

    fn find<'a>(result: &'a ValidationResult, path: &str) -> Option<&'a Diagnostic> {
        result.diagnostics.iter().find(|d| d.path == path)
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("sources", "source"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn suggest_finds_close_match() {
        assert_eq!(
            suggest("destinaton", &["destination", "sources"], 3),
            Some("destination")
        );
        assert_eq!(suggest("zzzzzzzz", &["relay"], 3), None);
    }

    #[test]
    fn full_valid_config_no_diagnostics() {
        let result = validate_str(VALID, "toml");
        assert!(
            result.diagnostics.is_empty(),
            "unexpected: {:?}",
            result.diagnostics
        );
    }

    #[test]
    fn unknown_top_level_key_with_suggestion() {
        let result = validate_str("[relai]\ndestination = \"@x\"\n", "toml");
        let diag = find(&result, "relai").unwrap();
        assert_eq!(diag.category, "unknown-field");
        assert!(diag.message.contains("did you mean \"relay\""));
    }

    #[test]
    fn unknown_nested_key_with_suggestion() {
        let result = validate_str("[relay]\ndestinaton = \"@x\"\n", "toml");
        let diag = find(&result, "relay.destinaton").unwrap();
        assert_eq!(diag.severity, Severity::Error);
        assert!(diag.message.contains("destination"));
    }

    #[test]
    fn syntax_error_detected() {
        let result = validate_str("[relay\n", "toml");
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn type_error_detected() {
        let result = validate_str("[pipeline]\nalbum_quiet_period_ms = \"soon\"\n", "toml");
        assert!(result.diagnostics.iter().any(|d| d.category == "type-error"));
    }

    #[test]
    fn empty_config_reports_missing_essentials() {
        let result = validate_str("", "toml");
        assert_eq!(
            find(&result, "telegram.bot_token").unwrap().severity,
            Severity::Error
        );
        assert_eq!(
            find(&result, "relay.sources").unwrap().severity,
            Severity::Error
        );
        assert_eq!(
            find(&result, "relay.destination").unwrap().severity,
            Severity::Error
        );
        assert_eq!(
            find(&result, "relay.operator").unwrap().severity,
            Severity::Warning
        );
        assert_eq!(
            find(&result, "moderation.primary.api_key")
                .unwrap()
                .severity,
            Severity::Warning
        );
        assert_eq!(
            find(&result, "moderation.fallback.api_key")
                .unwrap()
                .severity,
            Severity::Info
        );
    }

    #[test]
    fn duplicate_sources_warned() {
        let raw = VALID.replace(
            "sources = [\"@news\", \"https://t.me/world\"]",
            "sources = [\"@news\", \"NEWS\"]",
        );
        let result = validate_str(&raw, "toml");
        let diag = find(&result, "relay.sources").unwrap();
        assert_eq!(diag.severity, Severity::Warning);
        assert!(diag.message.contains("NEWS"));
    }

    #[test]
    fn non_numeric_operator_is_error() {
        let raw = VALID.replace("operator = \"1001\"", "operator = \"@owner\"");
        let result = validate_str(&raw, "toml");
        assert!(result.has_errors());
        assert!(find(&result, "relay.operator").is_some());
    }

    #[test]
    fn non_http_url_is_error() {
        let raw = VALID.replace(
            "bot_token = \"123:ABC\"",
            "bot_token = \"1:a\"\napi_url = \"ftp://x\"",
        );
        let result = validate_str(&raw, "toml");
        assert_eq!(
            find(&result, "telegram.api_url").unwrap().severity,
            Severity::Error
        );
    }

    #[test]
    fn zero_pipeline_values_warned() {
        let raw = format!(
            "{VALID}\n[pipeline]\nalbum_quiet_period_ms = 0\nlarge_file_threshold_bytes = 0\n"
        );
        let result = validate_str(&raw, "toml");
        assert_eq!(result.count(Severity::Warning), 2);
        assert!(!result.has_errors());
    }

    #[test]
    fn yaml_is_validated_too() {
        let result = validate_str("relay:\n  sourcez: [\"@a\"]\n", "yaml");
        assert!(find(&result, "relay.sourcez").is_some());
    }

    #[test]
    fn env_overrides_satisfy_requirements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relaygram.toml");
        std::fs::write(&path, "[relay]\nsources = [\"@news\"]\n").unwrap();
        let lookup = |name: &str| match name {
            "BOT_TOKEN" => Some("9:zz".to_string()),
            "DESTINATION_CHANNEL" => Some("@mirror".to_string()),
            _ => None,
        };
        let result = validate_with(Some(&path), lookup);
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn unreadable_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate_with(Some(&dir.path().join("missing.toml")), |_| None);
        assert!(result.has_errors());
    }
}
