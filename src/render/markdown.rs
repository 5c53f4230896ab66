//! Minimal markdown → HTML for recognized text.
//!
//! Fixed rule order, each rule applied once to the whole text:
//! escape → code blocks → inline code → tables → bold → italic → line breaks.
//! Code is stashed behind placeholders as soon as it is found and restored
//! at the very end, so no later rule can reinterpret it.

use regex::{Captures, Regex};
use std::sync::OnceLock;

const MARK_OPEN: char = '\u{E000}';
const MARK_CLOSE: char = '\u{E001}';

fn code_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(\w*)\n?(.*?)```").expect("code block regex"))
}

fn inline_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("inline code regex"))
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\A\|[\s\-|:]+\|\z").expect("table separator regex"))
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold regex"))
}

fn italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*(.+?)\*").expect("italic regex"))
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("\u{E000}(\\d+)\u{E001}").expect("placeholder regex"))
}

/// Escape `& < > " '` for safe insertion into HTML text or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Already-rendered fragments held out of the text while later rules run.
#[derive(Default)]
struct Stash(Vec<String>);

impl Stash {
    fn hold(&mut self, html: String) -> String {
        self.0.push(html);
        format!("{}{}{}", MARK_OPEN, self.0.len() - 1, MARK_CLOSE)
    }

    fn restore(&self, text: &str) -> String {
        placeholder_re()
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.0.get(i))
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

fn extract_code_blocks(html: &str, stash: &mut Stash) -> String {
    code_block_re()
        .replace_all(html, |caps: &Captures| {
            let lang = &caps[1];
            let code = caps[2].trim();
            let block = if lang.is_empty() {
                format!("<pre><code>{}</code></pre>", code)
            } else {
                format!("<pre><code class=\"language-{}\">{}</code></pre>", lang, code)
            };
            stash.hold(block)
        })
        .into_owned()
}

fn extract_inline_code(html: &str, stash: &mut Stash) -> String {
    inline_code_re()
        .replace_all(html, |caps: &Captures| stash.hold(format!("<code>{}</code>", &caps[1])))
        .into_owned()
}

fn is_table_row(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 3 && line.starts_with('|') && line.ends_with('|')
}

fn is_separator_row(line: &str) -> bool {
    separator_re().is_match(line.trim())
}

fn table_cells(line: &str) -> Vec<&str> {
    let line = line.trim();
    let inner = &line[1..line.len() - 1];
    inner.split('|').map(str::trim).collect()
}

fn table_html(rows: &[&str]) -> String {
    let mut html = String::from("<table><thead><tr>");
    for cell in table_cells(rows[0]) {
        html.push_str(&format!("<th>{}</th>", cell));
    }
    html.push_str("</tr></thead><tbody>");
    for row in &rows[2..] {
        html.push_str("<tr>");
        for cell in table_cells(row) {
            html.push_str(&format!("<td>{}</td>", cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

/// Replace header + separator + body runs of pipe rows with a `<table>`.
/// A table swallows the line break after its last row.
fn render_tables(html: &str) -> String {
    let lines: Vec<&str> = html.split('\n').collect();
    let last = lines.len() - 1;
    let mut out = String::with_capacity(html.len());
    let mut i = 0;

    while i < lines.len() {
        let run = lines[i..].iter().take_while(|l| is_table_row(l)).count();
        if run >= 2 && is_separator_row(lines[i + 1]) {
            out.push_str(&table_html(&lines[i..i + run]));
            i += run;
            continue;
        }
        out.push_str(lines[i]);
        if i < last {
            out.push('\n');
        }
        i += 1;
    }
    out
}

fn render_emphasis(html: &str) -> String {
    let bold = bold_re().replace_all(html, "<strong>$1</strong>");
    italic_re().replace_all(&bold, "<em>$1</em>").into_owned()
}

/// Render normalized recognition text to display-safe HTML.
pub fn render_markdown(text: &str) -> String {
    let mut stash = Stash::default();

    // Private-use markers in the input must not look like placeholders.
    let escaped = escape_html(text)
        .replace(MARK_OPEN, "&#xE000;")
        .replace(MARK_CLOSE, "&#xE001;");

    let html = extract_code_blocks(&escaped, &mut stash);
    let html = extract_inline_code(&html, &mut stash);
    let html = render_tables(&html);
    let html = render_emphasis(&html);
    let html = html.replace('\n', "<br>");
    stash.restore(&html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_before_anything_else() {
        assert_eq!(
            render_markdown(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
    }

    #[test]
    fn renders_table_with_header_and_body() {
        let html = render_markdown("| A | B |\n| --- | --- |\n| 1 | 2 |");
        assert_eq!(
            html,
            "<table><thead><tr><th>A</th><th>B</th></tr></thead><tbody><tr><td>1</td><td>2</td></tr></tbody></table>"
        );
    }

    #[test]
    fn table_between_paragraphs_keeps_surrounding_breaks() {
        let html = render_markdown("before\n| A |\n|:-:|\n| 1 |\nafter");
        assert_eq!(
            html,
            "before<br><table><thead><tr><th>A</th></tr></thead><tbody><tr><td>1</td></tr></tbody></table>after"
        );
    }

    #[test]
    fn pipe_text_without_separator_is_untouched() {
        assert_eq!(render_markdown("| a | b |\n| c | d |"), "| a | b |<br>| c | d |");
        assert_eq!(render_markdown("x | y"), "x | y");
    }

    #[test]
    fn table_may_start_inside_a_run_of_pipe_lines() {
        let html = render_markdown("| note |\n| H |\n| - |\n| v |");
        assert_eq!(
            html,
            "| note |<br><table><thead><tr><th>H</th></tr></thead><tbody><tr><td>v</td></tr></tbody></table>"
        );
    }

    #[test]
    fn code_block_is_immune_to_later_rules() {
        let html = render_markdown("```rust\nlet x = a * b * c;\n| A | B |\n| - | - |\n**not bold**\n```");
        assert_eq!(
            html,
            "<pre><code class=\"language-rust\">let x = a * b * c;\n| A | B |\n| - | - |\n**not bold**</code></pre>"
        );
    }

    #[test]
    fn colon_only_separator_still_makes_a_table() {
        assert_eq!(
            render_markdown("| A |\n|:|\n| 1 |"),
            "<table><thead><tr><th>A</th></tr></thead><tbody><tr><td>1</td></tr></tbody></table>"
        );
    }

    #[test]
    fn code_block_contents_stay_escaped() {
        assert_eq!(
            render_markdown("```\n<b>hi</b>\n```"),
            "<pre><code>&lt;b&gt;hi&lt;/b&gt;</code></pre>"
        );
    }

    #[test]
    fn inline_code_then_emphasis() {
        assert_eq!(
            render_markdown("use `a*b*c` for **bold** and *it*"),
            "use <code>a*b*c</code> for <strong>bold</strong> and <em>it</em>"
        );
    }

    #[test]
    fn newlines_become_breaks() {
        assert_eq!(render_markdown("one\ntwo\n\nthree"), "one<br>two<br><br>three");
    }

    #[test]
    fn private_use_markers_in_input_cannot_inject_placeholders() {
        let html = render_markdown("```\ncode\n```\u{E000}0\u{E001}");
        assert_eq!(html, "<pre><code>code</code></pre>&#xE000;0&#xE001;");
    }
}
