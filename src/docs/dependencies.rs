//! Dependency Extractor
//!
//! Pulls `service:Action` references out of the dependent-actions column.
//! The pattern is a heuristic: it can miss references hidden by markup and
//! can match text that only looks like a reference.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// `lowercase-service:CapitalizedAction`
static DEPENDENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9-]+):([A-Z][a-zA-Z0-9]+)").unwrap());

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Extract references from plain text, first-seen order, no duplicates
pub fn extract_dependencies(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for caps in DEPENDENCY_RE.captures_iter(text) {
        push_unique(&mut found, format!("{}:{}", &caps[1], &caps[2]));
    }
    found
}

/// Extract references from text, then add any link text containing `:`
/// that the text pattern did not already produce.
pub fn extract_dependencies_with_links<S>(text: &str, link_texts: &[S]) -> Vec<String>
where
    S: AsRef<str>,
{
    let mut found = extract_dependencies(text);
    for link in link_texts {
        let link = link.as_ref().trim();
        if !link.is_empty() && link.contains(':') {
            push_unique(&mut found, link.to_string());
        }
    }
    found
}

/// Run the link-aware extraction over an HTML fragment
pub fn extract_dependencies_from_markup(fragment: &str) -> Vec<String> {
    let html = Html::parse_fragment(fragment);
    let text: String = html.root_element().text().collect::<Vec<_>>().join(" ");
    let links: Vec<String> = html
        .select(&ANCHOR)
        .map(|a| a.text().collect::<String>())
        .collect();
    extract_dependencies_with_links(&text, &links)
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}
