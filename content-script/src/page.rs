use ego_tree::{NodeId, NodeMut, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use tracing::warn;

/// Raw page as delivered to a tab: markup plus the location it was loaded from.
#[derive(Debug, Clone)]
pub struct PageSource {
    pub html: String,
    pub url: String,
}

impl PageSource {
    pub fn new(html: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            url: url.into(),
        }
    }
}

/// Ordered list of CSS selectors; the first one that matches wins.
#[derive(Debug)]
pub struct SelectorChain {
    selectors: Vec<Selector>,
}

impl SelectorChain {
    /// Selectors that fail to parse are skipped, never fatal.
    pub fn new(sources: &[&str]) -> Self {
        let selectors = sources
            .iter()
            .filter_map(|source| match Selector::parse(source) {
                Ok(selector) => Some(selector),
                Err(e) => {
                    warn!(selector = %source, error = ?e, "Skipping unparseable selector");
                    None
                }
            })
            .collect();
        Self { selectors }
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn first_match<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        self.selectors
            .iter()
            .find_map(|selector| document.select(selector).next())
    }
}

static BODY_ELEMENT: LazyLock<SelectorChain> = LazyLock::new(|| SelectorChain::new(&["body"]));

/// Live document of one tab.
pub struct Page {
    document: Html,
    location: String,
}

impl Page {
    pub fn parse(source: &PageSource) -> Self {
        Self {
            document: Html::parse_document(&source.html),
            location: source.url.clone(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub(crate) fn set_location(&mut self, location: String) {
        self.location = location;
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    pub fn first_match(&self, chain: &SelectorChain) -> Option<ElementRef<'_>> {
        chain.first_match(&self.document)
    }

    pub fn html(&self) -> String {
        self.document.html()
    }

    /// Inserts the first element of `fragment` as the next sibling of `anchor`.
    pub(crate) fn insert_after(&mut self, anchor: NodeId, fragment: &Html) -> bool {
        let Some(container) = fragment_root(fragment) else {
            return false;
        };
        let Some(mut anchor) = self.document.tree.get_mut(anchor) else {
            return false;
        };
        if anchor.parent().is_none() {
            return false;
        }

        let inserted = anchor.insert_after(container.value().clone());
        graft(inserted, container);
        true
    }

    /// Appends the first element of `fragment` to `<body>`, or to the root
    /// element when the document has no body.
    pub(crate) fn append_to_root(&mut self, fragment: &Html) -> bool {
        let Some(container) = fragment_root(fragment) else {
            return false;
        };
        let target = self
            .first_match(&BODY_ELEMENT)
            .unwrap_or_else(|| self.document.root_element())
            .id();
        let Some(mut target) = self.document.tree.get_mut(target) else {
            return false;
        };

        let appended = target.append(container.value().clone());
        graft(appended, container);
        true
    }
}

fn fragment_root(fragment: &Html) -> Option<NodeRef<'_, Node>> {
    fragment
        .root_element()
        .children()
        .find(|node| node.value().is_element())
}

// Copies the children of `source` under `dest`, depth first.
fn graft(mut dest: NodeMut<'_, Node>, source: NodeRef<'_, Node>) {
    for child in source.children() {
        let appended = dest.append(child.value().clone());
        graft(appended, child);
    }
}
