use crate::anchor::locate_anchor;
use crate::page::Page;
use crate::render::{escape_html, render_summary, MarkdownRenderer};
use helper_core::{AggregatedResult, ErrorReporter, HelperError, SourceResult};
use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};

pub const HEADER_LABEL: &str = "Reddit Duplicate Question Finder";
pub const ICON_ALT: &str = "Duplicate Finder Icon";
pub const MAX_SOURCES: usize = 5;

pub const BOX_CLASS: &str = "plugin-result-box";
pub const SUMMARY_CLASS: &str = "plugin-result-summary";
pub const SOURCES_CLASS: &str = "plugin-result-sources";

const FALLBACK_BOX_CLASS: &str = "plugin-result-box mt-md mb-md px-md py-sm";
const BOX_STYLE: &str = "border: 1px solid var(--color-action-upvote, #ff4500); \
    border-radius: 6px; margin-top: 12px; padding: 12px; \
    background: var(--color-neutral-background-weak, transparent);";
const ICON_STYLE: &str = "width: 28px; height: 28px; vertical-align: middle;";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionOutcome {
    /// Nothing to show; the page was not touched.
    Skipped,
    AfterAnchor,
    /// No post body found, box appended at the end of the document.
    AppendedToRoot,
}

/// Renders an `AggregatedResult` into a result box and adds it to the page.
///
/// Each call adds a new box; earlier boxes are left in place.
pub struct Injector {
    renderer: Option<Box<dyn MarkdownRenderer>>,
    icon_url: String,
    reporter: ErrorReporter,
}

impl Injector {
    pub fn new(icon_url: impl Into<String>) -> Self {
        Self {
            renderer: None,
            icon_url: icon_url.into(),
            reporter: ErrorReporter::default(),
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn MarkdownRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn inject(&self, page: &mut Page, result: &AggregatedResult) -> InjectionOutcome {
        if result.is_empty() {
            warn!("Nothing to inject");
            return InjectionOutcome::Skipped;
        }

        let anchor = locate_anchor(page).map(|element| (element.id(), parent_class(&element)));

        if let Some((anchor_id, parent_class)) = anchor {
            let fragment = Html::parse_fragment(&self.build_box(parent_class.as_deref(), result));
            if page.insert_after(anchor_id, &fragment) {
                info!(
                    sources = result.per_source_results.len(),
                    "Injected result box after post body"
                );
                return InjectionOutcome::AfterAnchor;
            }
            debug!("Post body has no parent; falling back to document body");
        }

        self.reporter.report_warning(&HelperError::InjectionTargetMissing {
            url: page.location().to_string(),
        });
        warn!("No post body found. Appending result box to document body.");
        let fragment = Html::parse_fragment(&self.build_box(None, result));
        append_fallback(page, &fragment)
    }

    fn build_box(&self, parent_class: Option<&str>, result: &AggregatedResult) -> String {
        let class = match parent_class {
            Some(parent_class) => escape_html(&format!("{} {}", parent_class, BOX_CLASS)),
            None => FALLBACK_BOX_CLASS.to_string(),
        };
        let summary = render_summary(self.renderer.as_deref(), &result.final_summary);

        let mut html = format!(
            r#"<div class="{class}" style="{style}"><div class="mb-xs"><img src="{icon}" alt="{alt}" style="{icon_style}"> <span class="text-neutral-content-strong font-semibold text-24 xs:text-24">{label}</span></div><div class="{summary_class} text-neutral-content text-14 mb-sm">{summary}</div>"#,
            class = class,
            style = BOX_STYLE,
            icon = escape_html(&self.icon_url),
            alt = ICON_ALT,
            icon_style = ICON_STYLE,
            label = HEADER_LABEL,
            summary_class = SUMMARY_CLASS,
            summary = summary,
        );

        if !result.per_source_results.is_empty() {
            html.push_str(&sources_block(&result.per_source_results));
        }

        html.push_str("</div>");
        html
    }
}

fn append_fallback(page: &mut Page, fragment: &Html) -> InjectionOutcome {
    if page.append_to_root(fragment) {
        InjectionOutcome::AppendedToRoot
    } else {
        warn!("Result box markup has no element; page left untouched");
        InjectionOutcome::Skipped
    }
}

fn parent_class(element: &ElementRef<'_>) -> Option<String> {
    element
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|parent| parent.value().attr("class"))
        .map(str::trim)
        .filter(|class| !class.is_empty())
        .map(str::to_string)
}

fn sources_block(sources: &[SourceResult]) -> String {
    let items: String = sources.iter().take(MAX_SOURCES).map(source_item).collect();
    format!(
        r#"<div class="{} text-12 text-neutral-content-weak"><strong>Sources:</strong><ul class="mt-2 ml-4">{}</ul></div>"#,
        SOURCES_CLASS, items
    )
}

fn source_item(source: &SourceResult) -> String {
    let label = escape_html(source.label());
    let suffix = source
        .source_name()
        .map(|name| format!(" ({})", escape_html(name)))
        .unwrap_or_default();

    match source.link() {
        Some(url) => format!(
            r#"<li><a href="{}" target="_blank" rel="noopener noreferrer">{}</a>{}</li>"#,
            escape_html(url),
            label,
            suffix
        ),
        None => format!("<li>{}{}</li>", label, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageSource;
    use crate::render::CommonMarkRenderer;
    use scraper::Selector;

    const POST_PAGE: &str = r#"<html><body>
        <h1 slot="title">Why X?</h1>
        <div class="post-shell text-body">
            <div property="schema:articleBody"><p>Body text</p></div>
            <div id="comments">comments</div>
        </div>
    </body></html>"#;

    fn page(html: &str) -> Page {
        Page::parse(&PageSource::new(html, "https://www.reddit.com/r/test/abc"))
    }

    fn injector() -> Injector {
        Injector::new("chrome-extension://abc/icon48.png")
            .with_renderer(Box::new(CommonMarkRenderer::new()))
    }

    fn count(page: &Page, selector: &str) -> usize {
        let selector = Selector::parse(selector).unwrap();
        page.document().select(&selector).count()
    }

    fn texts(page: &Page, selector: &str) -> Vec<String> {
        let selector = Selector::parse(selector).unwrap();
        page.document()
            .select(&selector)
            .map(|element| element.text().collect::<String>())
            .collect()
    }

    fn source(title: Option<&str>, url: Option<&str>, name: Option<&str>) -> SourceResult {
        SourceResult {
            title: title.map(str::to_string),
            url: url.map(str::to_string),
            source: name.map(str::to_string),
        }
    }

    #[test]
    fn test_empty_result_is_a_noop() {
        let mut page = page(POST_PAGE);
        let before = page.html();

        let outcome = injector().inject(&mut page, &AggregatedResult::default());

        assert_eq!(outcome, InjectionOutcome::Skipped);
        assert_eq!(page.html(), before);
    }

    #[test]
    fn test_box_follows_anchor() {
        let mut page = page(POST_PAGE);
        let result = AggregatedResult::new(
            "**Answer**",
            vec![source(Some("Dup1"), Some("https://x"), None)],
        );

        let outcome = injector().inject(&mut page, &result);
        assert_eq!(outcome, InjectionOutcome::AfterAnchor);

        let selector = Selector::parse(".plugin-result-box").unwrap();
        let container = page.document().select(&selector).next().unwrap();
        let previous = container
            .prev_siblings()
            .find_map(ElementRef::wrap)
            .unwrap();
        assert_eq!(previous.value().attr("property"), Some("schema:articleBody"));
        assert_eq!(
            container.value().attr("class"),
            Some("post-shell text-body plugin-result-box")
        );

        assert_eq!(texts(&page, ".plugin-result-summary strong"), vec!["Answer"]);
        assert_eq!(texts(&page, ".plugin-result-sources li a"), vec!["Dup1"]);
        assert_eq!(count(&page, ".plugin-result-sources li"), 1);

        let link_selector = Selector::parse(".plugin-result-sources a").unwrap();
        let link = page.document().select(&link_selector).next().unwrap();
        assert_eq!(link.value().attr("href"), Some("https://x"));
        assert_eq!(link.value().attr("target"), Some("_blank"));
        assert_eq!(link.value().attr("rel"), Some("noopener noreferrer"));

        let icon_selector = Selector::parse(".plugin-result-box img").unwrap();
        let icon = page.document().select(&icon_selector).next().unwrap();
        assert_eq!(icon.value().attr("src"), Some("chrome-extension://abc/icon48.png"));
        assert_eq!(icon.value().attr("alt"), Some(ICON_ALT));
        assert!(page.html().contains(HEADER_LABEL));
    }

    #[test]
    fn test_missing_anchor_appends_to_body() {
        let mut page = page("<h1>Title only</h1>");
        let result = AggregatedResult::failure("Fetch error: connection refused");

        let outcome = injector().inject(&mut page, &result);

        assert_eq!(outcome, InjectionOutcome::AppendedToRoot);
        let selector = Selector::parse("body > .plugin-result-box").unwrap();
        let container = page.document().select(&selector).next().unwrap();
        assert_eq!(container.value().attr("class"), Some(FALLBACK_BOX_CLASS));
        assert_eq!(count(&page, ".plugin-result-sources"), 0);
    }

    #[test]
    fn test_fallback_without_element_is_skipped() {
        let mut page = page("<h1>Title only</h1>");
        let before = page.html();

        let outcome = append_fallback(&mut page, &Html::parse_fragment("just text"));

        assert_eq!(outcome, InjectionOutcome::Skipped);
        assert_eq!(page.html(), before);
    }

    #[test]
    fn test_sources_capped_at_five() {
        let mut page = page(POST_PAGE);
        let sources = (1..=7)
            .map(|i| source(Some(&format!("Post {}", i)), Some("https://x"), None))
            .collect();

        injector().inject(&mut page, &AggregatedResult::new("", sources));

        assert_eq!(
            texts(&page, ".plugin-result-sources li"),
            vec!["Post 1", "Post 2", "Post 3", "Post 4", "Post 5"]
        );
    }

    #[test]
    fn test_source_labels_and_fallbacks() {
        let mut page = page(POST_PAGE);
        let sources = vec![
            source(None, Some("https://reddit.com/r/a/1"), Some("reddit")),
            source(Some(""), None, Some("stackexchange")),
            source(None, None, None),
        ];

        injector().inject(&mut page, &AggregatedResult::new("summary", sources));

        assert_eq!(
            texts(&page, ".plugin-result-sources li"),
            vec![
                "https://reddit.com/r/a/1 (reddit)",
                "stackexchange (stackexchange)",
                "Unknown",
            ]
        );
        assert_eq!(count(&page, ".plugin-result-sources li a"), 1);
    }

    #[test]
    fn test_labels_are_escaped() {
        let mut page = page(POST_PAGE);
        let sources = vec![source(Some("<img src=x onerror=alert(1)>"), None, None)];

        injector().inject(&mut page, &AggregatedResult::new("s", sources));

        assert_eq!(count(&page, ".plugin-result-sources img"), 0);
        assert_eq!(
            texts(&page, ".plugin-result-sources li"),
            vec!["<img src=x onerror=alert(1)>"]
        );
    }

    #[test]
    fn test_plain_fallback_without_renderer() {
        let mut page = page(POST_PAGE);
        let injector = Injector::new("icon48.png");
        assert!(!injector.has_renderer());

        injector.inject(
            &mut page,
            &AggregatedResult::failure("<b>not bold</b>\n**not bold either**"),
        );

        assert_eq!(count(&page, ".plugin-result-summary b"), 0);
        assert_eq!(count(&page, ".plugin-result-summary strong"), 0);
        assert_eq!(count(&page, ".plugin-result-summary br"), 1);
        assert_eq!(
            texts(&page, ".plugin-result-summary"),
            vec!["<b>not bold</b>**not bold either**"]
        );
    }

    #[test]
    fn test_repeated_injection_stacks_boxes() {
        let mut page = page(POST_PAGE);
        let injector = injector();
        let result = AggregatedResult::failure("again");

        injector.inject(&mut page, &result);
        injector.inject(&mut page, &result);

        assert_eq!(count(&page, ".plugin-result-box"), 2);
    }
}
