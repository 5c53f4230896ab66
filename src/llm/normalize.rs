//! Output normalization: strip wrapping that models put around OCR text.
//!
//! An ordered pipeline of independent steps:
//! 1. unwrap a whole-text code fence
//! 2. flatten HTML to text (fences may contain HTML)
//! 3. drop markdown heading markers (headings may come out of the HTML)
//!
//! The pipeline repeats until the text stops changing, which makes
//! `normalize` idempotent. Every step only ever shortens the text.

use regex::Regex;
use std::sync::OnceLock;

type Step = fn(&str) -> String;

const STEPS: [(&str, Step); 3] = [
    ("unwrap_fence", unwrap_fence),
    ("strip_html", strip_html),
    ("strip_headings", strip_headings),
];

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\A```[^\n]*\n(.*)\n```\z").expect("fence regex"))
}

fn looks_like_html_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<[a-z].*>").expect("html detection regex"))
}

fn line_break_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li)>").expect("break tag regex"))
}

fn any_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag regex"))
}

fn blank_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("blank run regex"))
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\A#{1,6}\s+").expect("heading regex"))
}

/// `&amp;` is decoded after `&lt;`/`&gt;` so `&amp;lt;` stays `&lt;`.
const ENTITIES: [(&str, &str); 5] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
    ("&quot;", "\""),
];

/// Unwrap text that is entirely one fenced code block (optional language tag).
pub fn unwrap_fence(text: &str) -> String {
    match fence_re().captures(text) {
        Some(caps) => caps[1].trim().to_string(),
        None => text.to_string(),
    }
}

/// Flatten HTML-looking text: block closers become newlines, every other
/// tag is removed, entities are decoded and blank runs collapse to one.
pub fn strip_html(text: &str) -> String {
    if !looks_like_html_re().is_match(text) {
        return text.to_string();
    }

    let broken = line_break_tag_re().replace_all(text, "\n");
    let mut flat = any_tag_re().replace_all(&broken, "").into_owned();
    for (entity, decoded) in ENTITIES {
        flat = flat.replace(entity, decoded);
    }
    blank_run_re().replace_all(&flat, "\n\n").trim().to_string()
}

/// Remove a leading `#`–`######` marker (plus its whitespace) from every line.
pub fn strip_headings(text: &str) -> String {
    text.split('\n')
        .map(|line| heading_re().replace(line, ""))
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_once(text: &str) -> String {
    STEPS
        .iter()
        .fold(text.to_string(), |acc, (_, step)| step(&acc))
}

pub fn normalize(text: &str) -> String {
    let mut current = text.to_string();
    let mut passes = 0;
    loop {
        let next = normalize_once(&current);
        passes += 1;
        if next == current {
            if passes > 2 {
                log::debug!("[LLM] Normalization settled after {} passes", passes);
            }
            return next;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_fence_with_language_tag() {
        assert_eq!(normalize("```markdown\nHELLO\n```"), "HELLO");
        assert_eq!(normalize("```\n  spaced  \n```"), "spaced");
    }

    #[test]
    fn partial_fence_is_left_alone() {
        let text = "intro\n```\ncode\n```";
        assert_eq!(unwrap_fence(text), text);
    }

    #[test]
    fn html_is_flattened_with_entities_decoded() {
        let html = "<html><body><p>a &lt;b&gt; &amp;amp; c</p><p>next</p><ul><li>one</li><li>two</li></ul></body></html>";
        assert_eq!(strip_html(html), "a <b> &amp; c\nnext\none\ntwo");
    }

    #[test]
    fn br_variants_become_newlines_and_blank_runs_collapse() {
        let html = "<div>x<br>y<BR/>z<br /></div>\n\n\n\n<p>w</p>";
        assert_eq!(strip_html(html), "x\ny\nz\n\nw");
    }

    #[test]
    fn text_without_tags_is_untouched_by_html_step() {
        let text = "a < b and c > d\n\n\n\ne";
        assert_eq!(strip_html(text), text);
    }

    #[test]
    fn heading_markers_are_stripped_per_line() {
        assert_eq!(
            strip_headings("# Title\n## Sub  title\nplain #not\n####### seven"),
            "Title\nSub  title\nplain #not\n####### seven"
        );
    }

    #[test]
    fn steps_run_in_order_fence_then_html_then_headings() {
        let raw = "```html\n<p>## Report</p><p>total &amp; sum</p>\n```";
        assert_eq!(normalize(raw), "Report\ntotal & sum");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "```markdown\nHELLO\n```",
            "```\n```\nnested\n```\n```",
            "<p>&lt;b&gt;bold&lt;/b&gt;</p>",
            "## # double heading",
            "plain text\n\n\n\nwith gaps",
            "<div>\n\n\n</div>",
            "",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {:?}", input);
        }
    }
}
