//! Primary/fallback moderation with a fail-open default.

use std::sync::Arc;

use {
    relaygram_common::html::{escape_html, truncate_chars},
    serde::Deserialize,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    services::{ModerationService, OperatorNotifier},
    types::ModerationResult,
};

/// Characters of input quoted in operator notices.
const NOTICE_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Primary,
    Fallback,
}

impl Tier {
    fn label(self) -> &'static str {
        match self {
            Self::Primary => "Primary",
            Self::Fallback => "Fallback",
        }
    }
}

/// Wraps the moderation services and never fails.
///
/// Each configured tier is tried in turn. A tier that errors triggers an
/// operator notice; when every tier has failed the post is approved with its
/// original text.
#[derive(Clone)]
pub struct ModerationGate {
    primary: Option<Arc<dyn ModerationService>>,
    fallback: Option<Arc<dyn ModerationService>>,
    notifier: Option<Arc<dyn OperatorNotifier>>,
    operator: Option<i64>,
}

impl ModerationGate {
    #[must_use]
    pub fn new(
        primary: Option<Arc<dyn ModerationService>>,
        fallback: Option<Arc<dyn ModerationService>>,
    ) -> Self {
        Self {
            primary,
            fallback,
            notifier: None,
            operator: None,
        }
    }

    /// Send failure notices to `operator` through `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn OperatorNotifier>, operator: i64) -> Self {
        self.notifier = Some(notifier);
        self.operator = Some(operator);
        self
    }

    /// Decide whether `text` is published and with which wording.
    ///
    /// Approved text gets ` #<source_handle>` appended.
    pub async fn evaluate(&self, text: &str, source_handle: &str) -> ModerationResult {
        let tiers = [
            (Tier::Primary, self.primary.as_ref()),
            (Tier::Fallback, self.fallback.as_ref()),
        ];
        for (tier, service) in tiers {
            let Some(service) = service else {
                debug!(tier = tier.label(), "moderation tier not configured, skipping");
                continue;
            };
            match consult(service.as_ref(), text).await {
                Ok(verdict) => {
                    info!(
                        tier = tier.label(),
                        service = service.name(),
                        should_post = verdict.should_post,
                        "moderation verdict"
                    );
                    return finish(verdict, text, source_handle);
                },
                Err(e) => {
                    warn!(
                        tier = tier.label(),
                        service = service.name(),
                        error = %e,
                        "moderation tier failed"
                    );
                    self.notify_failure(tier, service.name(), &e, text);
                },
            }
        }

        warn!(source = source_handle, "moderation unavailable, publishing original text");
        ModerationResult::approve(tag_source(text, source_handle))
    }

    /// Fire-and-forget operator notice.
    fn notify_failure(&self, tier: Tier, service: &str, error: &Error, input: &str) {
        let (Some(notifier), Some(operator)) = (self.notifier.clone(), self.operator) else {
            return;
        };
        let notice = failure_notice(tier, service, error, input);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(operator, &notice).await {
                warn!(operator, error = %e, "failed to notify operator");
            }
        });
    }
}

async fn consult(service: &dyn ModerationService, text: &str) -> Result<ModerationResult> {
    let raw = service.review(text).await?;
    parse_verdict(&raw)
}

fn finish(verdict: ModerationResult, input: &str, source_handle: &str) -> ModerationResult {
    if !verdict.should_post {
        return ModerationResult::reject();
    }
    let body = verdict
        .text
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(input);
    ModerationResult::approve(tag_source(body, source_handle))
}

fn tag_source(text: &str, source_handle: &str) -> String {
    if source_handle.is_empty() {
        text.to_string()
    } else if text.trim().is_empty() {
        format!("#{source_handle}")
    } else {
        format!("{text} #{source_handle}")
    }
}

fn failure_notice(tier: Tier, service: &str, error: &Error, input: &str) -> String {
    let preview = truncate_chars(input, NOTICE_PREVIEW_CHARS);
    let ellipsis = if preview.len() < input.len() {
        "..."
    } else {
        ""
    };
    format!(
        "❗️ {} moderation ({}) failed: <code>{}</code>\n<b>Input message:</b>\n{}{ellipsis}",
        tier.label(),
        escape_html(service),
        escape_html(&error.to_string()),
        escape_html(preview),
    )
}

#[derive(Debug, Deserialize)]
struct Verdict {
    should_post: bool,
    #[serde(default)]
    text: Option<String>,
}

/// Parse a model reply into a [`ModerationResult`].
///
/// `<think>` blocks and markdown code fences around the JSON are removed
/// first; the JSON itself must be `{"should_post": bool, "text"?: string}`.
pub fn parse_verdict(raw: &str) -> Result<ModerationResult> {
    let cleaned = strip_think_blocks(raw);
    let body = strip_code_fence(cleaned.trim());
    let verdict: Verdict = serde_json::from_str(body)
        .map_err(|e| Error::moderation(format!("unusable verdict: {e}")))?;
    Ok(if verdict.should_post {
        ModerationResult {
            should_post: true,
            text: verdict.text,
        }
    } else {
        ModerationResult::reject()
    })
}

/// Remove `<think>...</think>` reasoning blocks. An unterminated block runs
/// to the end of the input.
fn strip_think_blocks(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Remove a surrounding ```` ```json ... ``` ```` fence if present.
fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    // drop the info string (e.g. `json`) on the opening line
    let inner = inner.split_once('\n').map_or("", |(_, body)| body);
    inner.trim_end().strip_suffix("```").unwrap_or(inner).trim()
}
