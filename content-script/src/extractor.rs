use crate::anchor::locate_anchor;
use crate::page::{Page, SelectorChain};
use helper_core::PostData;
use regex::Regex;
use ego_tree::NodeRef;
use scraper::{ElementRef, Node};
use std::cell::RefCell;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

pub const TITLE_SELECTORS: [&str; 5] = [
    r#"h1[slot="title"]"#,
    r#"h1[id^="post-title-"]"#,
    r#"h1[data-test-id="post-title"]"#,
    "h1._eYtD2XCVieq6emjKBH3m",
    "h1",
];

static TITLE_CHAIN: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new(&TITLE_SELECTORS));

static SUBREDDIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)reddit\.com/r/([^/?#]+)").expect("valid regex"));

/// Reads post data out of a page once it has had time to settle.
#[derive(Debug, Clone)]
pub struct Extractor {
    stabilization_delay: Duration,
}

impl Extractor {
    pub fn new(stabilization_delay: Duration) -> Self {
        Self {
            stabilization_delay,
        }
    }

    /// Waits out the stabilization delay, then snapshots the page. The page
    /// must not be borrowed across the delay.
    pub async fn extract(&self, page: &RefCell<Page>) -> PostData {
        debug!(delay = ?self.stabilization_delay, "Extracting post data");
        if !self.stabilization_delay.is_zero() {
            tokio::time::sleep(self.stabilization_delay).await;
        }
        extract_post_data(&page.borrow())
    }
}

pub fn extract_post_data(page: &Page) -> PostData {
    let title = page
        .first_match(&TITLE_CHAIN)
        .map(|element| element_text(&element))
        .unwrap_or_default();
    debug!(title = %title, "Extracted title");

    let body = locate_anchor(page)
        .map(|element| element_text(&element))
        .unwrap_or_default();
    debug!(body_len = body.len(), "Extracted body");

    let source = subreddit_from_url(page.location());
    debug!(subreddit = %source, "Extracted subreddit");

    PostData {
        title,
        body,
        source,
        url: page.location().to_string(),
    }
}

pub fn subreddit_from_url(url: &str) -> String {
    SUBREDDIT_RE
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_string())
        .unwrap_or_default()
}

/// Elements whose text never reaches the reader.
const HIDDEN_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Elements that start a new line of rendered text.
const BLOCK_TAGS: [&str; 30] = [
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt",
    "figcaption", "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Rendered text of an element: hidden elements skipped, one line per block,
/// whitespace collapsed outside `<pre>`, empty lines dropped.
fn element_text(element: &ElementRef<'_>) -> String {
    let mut text = String::new();
    push_rendered_text(**element, false, &mut text);

    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_rendered_text(node: NodeRef<'_, Node>, preformatted: bool, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) if preformatted => out.push_str(text),
            Node::Text(text) => push_collapsed(text, out),
            Node::Element(element) => {
                let name = element.name();
                if HIDDEN_TAGS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }

                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                push_rendered_text(child, preformatted || name == "pre", out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn push_collapsed(text: &str, out: &mut String) {
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !(out.is_empty() || out.ends_with(['\n', ' '])) {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    if pending_space && !(out.is_empty() || out.ends_with(['\n', ' '])) {
        out.push(' ');
    }
}
