//! Whitespace and markup tidy-up for Markdown output.

use std::sync::LazyLock;

use regex::Regex;

/// Run every cleanup pass over converted Markdown.
pub(crate) fn tidy(md: &str) -> String {
    let mut result = strip_layout_tags(md);
    result = collapse_blank_lines(&result);
    result = trim_line_ends(&result);
    ensure_trailing_newline(&result)
}

/// Drop layout-only tags the converter passed through, keeping their text.
/// Fenced code is left untouched.
fn strip_layout_tags(md: &str) -> String {
    static LAYOUT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?(?:div|span|section|article|figure|figcaption)(?:\s[^>]*)?>")
            .expect("valid regex")
    });

    let mut in_fence = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                return line.to_string();
            }
            if in_fence {
                line.to_string()
            } else {
                LAYOUT_TAG_RE.replace_all(line, "").into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse runs of blank lines to a single blank line.
fn collapse_blank_lines(md: &str) -> String {
    static BLANK_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n[ \t]*(?:\n[ \t]*){2,}").expect("valid regex"));

    BLANK_RUN_RE.replace_all(md, "\n\n").into_owned()
}

fn trim_line_ends(md: &str) -> String {
    md.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

/// Exactly one trailing newline.
fn ensure_trailing_newline(md: &str) -> String {
    format!("{}\n", md.trim_end_matches('\n'))
}
