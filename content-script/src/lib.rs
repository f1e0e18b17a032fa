pub mod anchor;
pub mod context;
pub mod extractor;
pub mod injector;
pub mod navigation;
pub mod page;
pub mod render;


pub use anchor::{locate_anchor, BODY_SELECTORS};
pub use context::{ContentOptions, ContentScript, TabHandle};
pub use extractor::{extract_post_data, subreddit_from_url, Extractor, TITLE_SELECTORS};
pub use injector::{InjectionOutcome, Injector};
pub use navigation::{LocationChanged, NavigationObserver};
pub use page::{Page, PageSource, SelectorChain};
pub use render::{escape_html, render_plain, CommonMarkRenderer, MarkdownRenderer};
