//! The single definition of "the post body element".
//!
//! The Extractor reads the body text from it and the Injector inserts the
//! result box right after it, so both must agree on the same priority list.

use crate::page::{Page, SelectorChain};
use scraper::ElementRef;
use std::sync::LazyLock;

/// Post body selectors, highest priority first. Order matters across page
/// template variants; do not reorder.
pub const BODY_SELECTORS: [&str; 5] = [
    r#"div[property="schema:articleBody"]"#,
    r#"div[id$="-post-rtjson-content"]"#,
    r#"[data-test-id="post-content"]"#,
    r#"div[data-click-id="text"]"#,
    r#"div[slot="text-body"]"#,
];

static BODY_CHAIN: LazyLock<SelectorChain> = LazyLock::new(|| SelectorChain::new(&BODY_SELECTORS));

pub fn locate_anchor(page: &Page) -> Option<ElementRef<'_>> {
    page.first_match(&BODY_CHAIN)
}
