use {
    anyhow::{Context, Result},
    relaygram_relay::{StyleAnnotation, formatter},
};

/// Render `text` with optional Bot API `entities` JSON as Telegram HTML.
pub fn render(text: &str, entities: Option<&str>) -> Result<String> {
    let annotations: Vec<StyleAnnotation> = match entities {
        Some(raw) if !raw.trim().is_empty() => {
            serde_json::from_str(raw).context("entities must be a JSON array of Bot API entities")?
        },
        _ => Vec::new(),
    };
    Ok(formatter::format(text, &annotations))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_escaped() {
        assert_eq!(render("a < b & c", None).unwrap(), "a &lt; b &amp; c");
    }

    #[test]
    fn entities_are_applied() {
        let html = render(
            "Read more here",
            Some(r#"[{"type":"bold","offset":0,"length":4},{"type":"text_link","offset":10,"length":4,"url":"https://example.com"}]"#),
        )
        .unwrap();
        assert_eq!(
            html,
            "<b>Read</b> more <a href=\"https://example.com\">here</a>"
        );
    }

    #[test]
    fn malformed_entities_are_reported() {
        let err = render("x", Some("{not json")).unwrap_err();
        assert!(err.to_string().contains("entities must be"));
    }
}
