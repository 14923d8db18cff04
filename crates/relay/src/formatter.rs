//! Rebuild Telegram HTML from plain text plus entity annotations.
//!
//! Annotations may nest or cross. Crossing ranges are split: when an
//! annotation ends while a later-opened one is still open, the later ones
//! are closed and reopened right after, so the output is always well-formed.

use relaygram_common::html::{escape_attr, escape_html, push_escaped};

use crate::types::{StyleAnnotation, StyleKind};

/// Render `text` with `annotations` as Telegram HTML.
#[must_use]
pub fn format(text: &str, annotations: &[StyleAnnotation]) -> String {
    if annotations.is_empty() {
        return escape_html(text);
    }

    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();

    // UTF-16 offset at which each char starts.
    let mut starts = Vec::with_capacity(n);
    let mut pos = 0usize;
    for ch in &chars {
        starts.push(pos);
        pos += ch.len_utf16();
    }
    // First char starting at or after `unit`; offsets inside a surrogate
    // pair snap forward.
    let to_index = |unit: usize| starts.partition_point(|&s| s < unit);

    let mut opens: Vec<Vec<usize>> = vec![Vec::new(); n + 1];
    let mut closes: Vec<Vec<usize>> = vec![Vec::new(); n + 1];
    for (i, ann) in annotations.iter().enumerate() {
        if ann.length == 0 || ann.kind == StyleKind::Other {
            continue;
        }
        let start = to_index(ann.offset);
        let end = to_index(ann.offset.saturating_add(ann.length));
        if start >= end {
            continue;
        }
        opens[start].push(i);
        closes[end].push(i);
    }

    let mut out = String::with_capacity(text.len() + annotations.len() * 16);
    let mut stack: Vec<usize> = Vec::new();

    for boundary in 0..=n {
        if !closes[boundary].is_empty() {
            close_at(&mut out, &mut stack, &closes[boundary], annotations);
        }
        for &i in &opens[boundary] {
            push_open(&mut out, &annotations[i]);
            stack.push(i);
        }
        if let Some(&ch) = chars.get(boundary) {
            push_escaped(&mut out, ch);
        }
    }

    while let Some(i) = stack.pop() {
        push_close(&mut out, annotations[i].kind);
    }
    out
}

/// Close every annotation in `ending`, unwinding the stack top-down and
/// reopening anything that was only closed to keep the markup nested.
fn close_at(
    out: &mut String,
    stack: &mut Vec<usize>,
    ending: &[usize],
    annotations: &[StyleAnnotation],
) {
    let mut remaining = ending.len();
    let mut reopen = Vec::new();
    while remaining > 0 {
        let Some(top) = stack.pop() else {
            break;
        };
        push_close(out, annotations[top].kind);
        if ending.contains(&top) {
            remaining -= 1;
        } else {
            reopen.push(top);
        }
    }
    for &i in reopen.iter().rev() {
        push_open(out, &annotations[i]);
        stack.push(i);
    }
}

fn push_open(out: &mut String, ann: &StyleAnnotation) {
    match ann.kind {
        StyleKind::Bold => out.push_str("<b>"),
        StyleKind::Italic => out.push_str("<i>"),
        StyleKind::Underline => out.push_str("<u>"),
        StyleKind::Strikethrough => out.push_str("<s>"),
        StyleKind::InlineCode => out.push_str("<code>"),
        StyleKind::CodeBlock => out.push_str("<pre>"),
        StyleKind::Spoiler => out.push_str("<span class=\"tg-spoiler\">"),
        StyleKind::Quote => out.push_str("<blockquote>"),
        StyleKind::Link => {
            let href = ann
                .url
                .as_deref()
                .filter(|u| !u.is_empty())
                .map_or_else(|| "#".to_string(), escape_attr);
            out.push_str("<a href=\"");
            out.push_str(&href);
            out.push_str("\">");
        },
        StyleKind::Other => {},
    }
}

fn push_close(out: &mut String, kind: StyleKind) {
    out.push_str(match kind {
        StyleKind::Bold => "</b>",
        StyleKind::Italic => "</i>",
        StyleKind::Underline => "</u>",
        StyleKind::Strikethrough => "</s>",
        StyleKind::InlineCode => "</code>",
        StyleKind::CodeBlock => "</pre>",
        StyleKind::Spoiler => "</span>",
        StyleKind::Quote => "</blockquote>",
        StyleKind::Link => "</a>",
        StyleKind::Other => "",
    });
}
