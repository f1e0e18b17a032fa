use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream};
use regex::Regex;
use std::sync::LazyLock;

/// Link schemes that never survive rendering.
const BLOCKED_SCHEMES: [&str; 4] = ["javascript:", "vbscript:", "file:", "data:"];

/// `data:` images that are still allowed as image sources.
const SAFE_IMAGE_DATA: [&str; 4] = [
    "data:image/gif;",
    "data:image/png;",
    "data:image/jpeg;",
    "data:image/webp;",
];

const URL_TRAILING_PUNCTUATION: [char; 9] = ['.', ',', ';', ':', '!', '?', ')', '\'', '"'];

static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)[^\s<>]+").expect("valid regex"));

/// Optional capability that turns summary text into markup.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, text: &str) -> String;
}

/// CommonMark renderer. Raw HTML inside the markdown is emitted as escaped
/// text, never as markup. Script-capable link targets are blanked and bare
/// URLs in plain text become links.
#[derive(Debug, Clone)]
pub struct CommonMarkRenderer {
    options: Options,
}

impl CommonMarkRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        Self { options }
    }
}

impl Default for CommonMarkRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, text: &str) -> String {
        // Inside a link, an image or a code block, text is never linkified.
        let mut verbatim_depth = 0usize;

        let events = TextMergeStream::new(Parser::new_ext(text, self.options)).flat_map(|event| {
            match event {
                Event::Html(raw) | Event::InlineHtml(raw) => vec![Event::Text(raw)],
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    verbatim_depth += 1;
                    vec![Event::Start(Tag::Link {
                        link_type,
                        dest_url: safe_destination(dest_url, false),
                        title,
                        id,
                    })]
                }
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    verbatim_depth += 1;
                    vec![Event::Start(Tag::Image {
                        link_type,
                        dest_url: safe_destination(dest_url, true),
                        title,
                        id,
                    })]
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    verbatim_depth += 1;
                    vec![Event::Start(Tag::CodeBlock(kind))]
                }
                Event::End(end @ (TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock)) => {
                    verbatim_depth = verbatim_depth.saturating_sub(1);
                    vec![Event::End(end)]
                }
                Event::Text(text) if verbatim_depth == 0 => linkify(text),
                other => vec![other],
            }
        });

        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, events);
        out
    }
}

fn is_blocked_destination(url: &str, image: bool) -> bool {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    if image && SAFE_IMAGE_DATA.iter().any(|prefix| normalized.starts_with(prefix)) {
        return false;
    }
    BLOCKED_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
}

fn safe_destination(dest_url: CowStr<'_>, image: bool) -> CowStr<'_> {
    if is_blocked_destination(&dest_url, image) {
        CowStr::Borrowed("")
    } else {
        dest_url
    }
}

/// Splits plain text around bare `http(s)://` and `www.` URLs, turning each
/// into a link.
fn linkify(text: CowStr<'_>) -> Vec<Event<'_>> {
    let mut events = Vec::new();
    let mut last = 0;

    for found in BARE_URL.find_iter(&text) {
        let url = found.as_str().trim_end_matches(URL_TRAILING_PUNCTUATION);
        if url.ends_with("://") || url.len() <= "www.".len() {
            continue;
        }

        if found.start() > last {
            events.push(Event::Text(text[last..found.start()].to_string().into()));
        }
        let href = if url.to_ascii_lowercase().starts_with("www.") {
            format!("http://{}", url)
        } else {
            url.to_string()
        };
        events.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: href.into(),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        events.push(Event::Text(url.to_string().into()));
        events.push(Event::End(TagEnd::Link));
        last = found.start() + url.len();
    }

    if events.is_empty() {
        return vec![Event::Text(text)];
    }
    if last < text.len() {
        events.push(Event::Text(text[last..].to_string().into()));
    }
    events
}

/// Escapes `& < > "`; nothing else.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Fallback when no markdown capability is available.
pub fn render_plain(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

pub fn render_summary(renderer: Option<&dyn MarkdownRenderer>, summary: &str) -> String {
    let summary = summary.trim();
    match renderer {
        Some(renderer) => renderer.render(summary),
        None => render_plain(summary),
    }
}
