//! `relaygram doctor`: config validation and environment audit.
//!
//! Runs a series of checks and prints a structured report with `[ok]`,
//! `[warn]`, `[fail]`, `[skip]`, or `[info]` status indicators per item.

use std::path::Path;

use {
    anyhow::Result,
    relaygram_config::{RelaygramConfig, Severity, ValidationResult, validate},
    relaygram_providers::tiers_from_config,
    relaygram_relay::resolve_sources,
    relaygram_telegram::{TelegramResolver, TelegramTransport, connect},
};

// ── ANSI helpers ────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Per-check result used to build the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
    Skip,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Info => "info",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Warn => YELLOW,
            Self::Fail => RED,
            Self::Skip => DIM,
            Self::Info => CYAN,
        }
    }
}

impl From<Severity> for Status {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Fail,
            Severity::Warning => Self::Warn,
            Severity::Info => Self::Info,
        }
    }
}

struct CheckItem {
    status: Status,
    message: String,
}

struct Section {
    title: String,
    items: Vec<CheckItem>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push(CheckItem {
            status,
            message: message.into(),
        });
    }
}

// ── Printing ────────────────────────────────────────────────────────────────

fn print_report(sections: &[Section]) -> (usize, usize) {
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for item in &section.items {
            let color = item.status.color();
            let label = item.status.label();
            eprintln!("  [{color}{label}{RESET}]  {}", item.message);
            match item.status {
                Status::Fail => errors += 1,
                Status::Warn => warnings += 1,
                _ => {},
            }
        }
        eprintln!();
    }

    (errors, warnings)
}

// ── Entry point ─────────────────────────────────────────────────────────────

pub async fn handle_doctor(config_path: Option<&Path>, online: bool) -> Result<()> {
    eprintln!("{BOLD}relaygram doctor{RESET}");
    eprintln!("{BOLD}================{RESET}\n");

    let mut sections = Vec::new();

    let validation = validate::validate(config_path);
    sections.push(check_config(&validation));

    // Later checks only make sense with a loadable config.
    let config = match relaygram_config::discover_and_load(config_path) {
        Ok(config) => Some(config),
        Err(e) => {
            let mut section = Section::new("Load");
            section.push(Status::Fail, format!("config could not be loaded: {e}"));
            sections.push(section);
            None
        },
    };

    if let Some(ref config) = config {
        sections.push(check_moderation(config));
        sections.push(check_staging(&config.pipeline.staging_dir));
        if online {
            sections.push(check_telegram(config).await);
        } else {
            let mut section = Section::new("Telegram");
            section.push(Status::Skip, "pass --online to verify token and sources");
            sections.push(section);
        }
    }

    let (errors, warnings) = print_report(&sections);

    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

// ── 1. Config validation ────────────────────────────────────────────────────

fn check_config(result: &ValidationResult) -> Section {
    let label = result
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "environment only".into());
    let mut section = Section::new(format!("Config ({label})"));

    let syntax: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.category == "syntax" && d.severity == Severity::Error)
        .collect();
    if !syntax.is_empty() {
        for d in syntax {
            section.push(Status::Fail, format!("syntax: {}", d.message));
        }
        // Nothing else is meaningful with broken syntax.
        return section;
    }
    if result.config_path.is_some() {
        section.push(Status::Ok, "Syntax valid");
    }

    let unknown: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.category == "unknown-field")
        .collect();
    if unknown.is_empty() {
        section.push(Status::Ok, "All fields recognized");
    } else {
        for d in unknown {
            section.push(Status::from(d.severity), format!("{}: {}", d.path, d.message));
        }
    }

    for d in result
        .diagnostics
        .iter()
        .filter(|d| !matches!(d.category, "syntax" | "unknown-field"))
    {
        let msg = if d.path.is_empty() {
            d.message.clone()
        } else {
            format!("{}: {}", d.path, d.message)
        };
        section.push(Status::from(d.severity), msg);
    }

    if !result.has_errors() {
        section.push(Status::Ok, "No blocking problems");
    }
    section
}

// ── 2. Moderation readiness ─────────────────────────────────────────────────

fn check_moderation(config: &RelaygramConfig) -> Section {
    let mut section = Section::new("Moderation");
    let tiers = tiers_from_config(&config.moderation);

    for (label, provider, ready) in [
        ("Primary", &config.moderation.primary, tiers.primary.is_some()),
        ("Fallback", &config.moderation.fallback, tiers.fallback.is_some()),
    ] {
        if ready {
            section.push(
                Status::Ok,
                format!("{label}: {} ({})", provider.model, provider.base_url),
            );
        } else {
            section.push(Status::Info, format!("{label}: no API key, tier skipped"));
        }
    }
    if tiers.primary.is_none() && tiers.fallback.is_none() {
        section.push(
            Status::Warn,
            "No moderation tier configured: every post is relayed unchanged",
        );
    }
    section
}

// ── 3. Staging directory ────────────────────────────────────────────────────

fn check_staging(dir: &Path) -> Section {
    let mut section = Section::new("Staging");

    if let Err(e) = std::fs::create_dir_all(dir) {
        section.push(
            Status::Fail,
            format!("cannot create {}: {e}", dir.display()),
        );
        return section;
    }

    let probe = dir.join(".relaygram-doctor-probe");
    match std::fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            section.push(Status::Ok, format!("{} is writable", dir.display()));
        },
        Err(e) => {
            section.push(
                Status::Fail,
                format!("{} is not writable: {e}", dir.display()),
            );
        },
    }

    let leftovers = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with("media_"))
                .count()
        })
        .unwrap_or(0);
    if leftovers > 0 {
        section.push(
            Status::Info,
            format!("{leftovers} staged file(s) left from an earlier run"),
        );
    }
    section
}

// ── 4. Telegram (online) ────────────────────────────────────────────────────

async fn check_telegram(config: &RelaygramConfig) -> Section {
    let mut section = Section::new("Telegram");

    let transport = match TelegramTransport::from_config(&config.telegram) {
        Ok(t) => t,
        Err(e) => {
            section.push(Status::Fail, e.to_string());
            return section;
        },
    };

    match connect(&transport.polling).await {
        Ok(username) => section.push(
            Status::Ok,
            format!(
                "Bot login as @{}",
                username.unwrap_or_else(|| "unknown".into())
            ),
        ),
        Err(e) => {
            section.push(Status::Fail, format!("Bot login failed: {e}"));
            return section;
        },
    }

    let resolver = TelegramResolver::new(transport.polling.clone());
    let resolved = resolve_sources(&resolver, &config.relay.sources).await;
    let missing = config.relay.sources.len().saturating_sub(resolved.len());
    for source in resolved.values() {
        section.push(
            Status::Ok,
            format!("Source @{} resolved to {}", source.handle, source.id),
        );
    }
    if missing > 0 {
        section.push(
            Status::Warn,
            format!("{missing} source(s) could not be resolved and will be skipped"),
        );
    }
    section
}

// ── Tests ───────────────────────────────────────────────────────────────────
