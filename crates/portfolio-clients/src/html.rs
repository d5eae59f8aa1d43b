//! Rendered-HTML to plain text.

use std::sync::OnceLock;

use regex::Regex;
use scraper::Html;

fn newline_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n+").expect("static regex"))
}

fn space_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" +").expect("static regex"))
}

/// Strip every tag, decode entities, and collapse runs of newlines and spaces.
pub fn clean_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    let text = newline_runs().replace_all(&text, "\n");
    space_runs().replace_all(&text, " ").into_owned()
}
