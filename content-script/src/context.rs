//! Per-tab content context.
//!
//! Every tab gets its own OS thread running a current-thread runtime and a
//! `LocalSet`. The parsed page lives on that thread only; the outside world
//! talks to it through the tab's runtime inbox (`TabPort`) and a page event
//! channel owned by the `TabHandle`.

use crate::extractor::Extractor;
use crate::injector::Injector;
use crate::navigation::{LocationChanged, NavigationObserver, NAVIGATION_EVENT_CAPACITY};
use crate::page::{Page, PageSource};
use crate::render::MarkdownRenderer;
use helper_core::{tab_channel, ContentConfig, Envelope, HelperError, Message, TabId, TabPort};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::LocalSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub struct ContentOptions {
    pub stabilization_delay: Duration,
    pub icon_url: String,
    pub renderer: Option<Box<dyn MarkdownRenderer>>,
}

impl ContentOptions {
    pub fn new(stabilization_delay: Duration, icon_url: impl Into<String>) -> Self {
        Self {
            stabilization_delay,
            icon_url: icon_url.into(),
            renderer: None,
        }
    }

    pub fn from_config(config: &ContentConfig) -> Self {
        Self::new(config.stabilization_delay(), config.icon_url.clone())
    }

    pub fn with_renderer(mut self, renderer: Box<dyn MarkdownRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }
}

/// Events raised by the page itself rather than by extension messaging.
#[derive(Debug)]
enum PageEvent {
    HistoryPush(String),
    Reload(PageSource),
    Snapshot(oneshot::Sender<String>),
    Unload(oneshot::Sender<String>),
}

/// Owner-side handle of a running content context.
pub struct TabHandle {
    tab_id: TabId,
    port: TabPort,
    page_events: mpsc::UnboundedSender<PageEvent>,
    navigation: broadcast::Sender<LocationChanged>,
}

pub struct ContentScript;

impl ContentScript {
    pub fn spawn(
        tab_id: TabId,
        source: PageSource,
        options: ContentOptions,
    ) -> Result<TabHandle, HelperError> {
        let (port, runtime_inbox) = tab_channel(tab_id);
        let (page_events, page_inbox) = mpsc::unbounded_channel();
        let (navigation, _) = broadcast::channel(NAVIGATION_EVENT_CAPACITY);
        let events = navigation.clone();

        std::thread::Builder::new()
            .name(format!("tab-{}", tab_id))
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!(%tab_id, "Failed to start content context: {}", e);
                        return;
                    }
                };

                let context = ContentContext::new(tab_id, source, options, events);
                let local = LocalSet::new();
                local.block_on(
                    &runtime,
                    context
                        .run(runtime_inbox, page_inbox)
                        .instrument(info_span!("content", %tab_id)),
                );
            })?;

        info!(%tab_id, "Content script injected");
        Ok(TabHandle {
            tab_id,
            port,
            page_events,
            navigation,
        })
    }
}

impl TabHandle {
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Runtime inbox of this tab, for registration with the background context.
    pub fn port(&self) -> TabPort {
        self.port.clone()
    }

    pub fn subscribe_navigation(&self) -> broadcast::Receiver<LocationChanged> {
        self.navigation.subscribe()
    }

    /// Client-side navigation: the location changes without a reload.
    pub fn push_history(&self, url: impl Into<String>) -> Result<(), HelperError> {
        self.send(PageEvent::HistoryPush(url.into()))
    }

    /// Full page load: replaces the document and starts a fresh observer.
    pub fn reload(&self, source: PageSource) -> Result<(), HelperError> {
        self.send(PageEvent::Reload(source))
    }

    /// Serialized DOM after every runtime message delivered so far.
    pub async fn page_html(&self) -> Result<String, HelperError> {
        let (reply, html) = oneshot::channel();
        self.send(PageEvent::Snapshot(reply))?;
        html.await.map_err(|_| self.closed())
    }

    /// Stops the content context and returns the final DOM.
    pub async fn unload(self) -> Result<String, HelperError> {
        let (reply, html) = oneshot::channel();
        self.send(PageEvent::Unload(reply))?;
        html.await.map_err(|_| self.closed())
    }

    fn send(&self, event: PageEvent) -> Result<(), HelperError> {
        self.page_events.send(event).map_err(|_| self.closed())
    }

    fn closed(&self) -> HelperError {
        HelperError::TabClosed {
            tab_id: self.tab_id,
        }
    }
}

struct ContentContext {
    tab_id: TabId,
    page: Rc<RefCell<Page>>,
    extractor: Rc<Extractor>,
    injector: Injector,
    navigation: NavigationObserver,
    events: broadcast::Sender<LocationChanged>,
}

impl ContentContext {
    fn new(
        tab_id: TabId,
        source: PageSource,
        options: ContentOptions,
        events: broadcast::Sender<LocationChanged>,
    ) -> Self {
        let page = Page::parse(&source);
        let navigation = NavigationObserver::new(page.location(), events.clone());
        let mut injector = Injector::new(options.icon_url);
        if let Some(renderer) = options.renderer {
            injector = injector.with_renderer(renderer);
        }

        Self {
            tab_id,
            page: Rc::new(RefCell::new(page)),
            extractor: Rc::new(Extractor::new(options.stabilization_delay)),
            injector,
            navigation,
            events,
        }
    }

    async fn run(
        mut self,
        mut runtime_inbox: mpsc::UnboundedReceiver<Envelope>,
        mut page_inbox: mpsc::UnboundedReceiver<PageEvent>,
    ) {
        debug!(location = %self.page.borrow().location(), "Content context running");

        loop {
            tokio::select! {
                // Runtime messages first, so a snapshot taken after a
                // notification was sent always sees its effect.
                biased;

                Some(envelope) = runtime_inbox.recv() => self.on_message(envelope),

                event = page_inbox.recv() => match event {
                    Some(PageEvent::HistoryPush(url)) => {
                        self.navigation.observe(&url);
                        self.page.borrow_mut().set_location(url);
                    }
                    Some(PageEvent::Reload(source)) => {
                        info!(url = %source.url, "Page reloaded");
                        let page = Page::parse(&source);
                        self.navigation = NavigationObserver::new(page.location(), self.events.clone());
                        *self.page.borrow_mut() = page;
                    }
                    Some(PageEvent::Snapshot(reply)) => {
                        let _ = reply.send(self.page.borrow().html());
                    }
                    Some(PageEvent::Unload(reply)) => {
                        let _ = reply.send(self.page.borrow().html());
                        break;
                    }
                    None => break,
                },
            }
        }

        info!(tab_id = %self.tab_id, "Content context unloaded");
    }

    fn on_message(&self, envelope: Envelope) {
        match envelope {
            Envelope::Request {
                message: Message::GetPostData,
                reply,
            } => {
                let page = Rc::clone(&self.page);
                let extractor = Rc::clone(&self.extractor);
                tokio::task::spawn_local(async move {
                    let post = extractor.extract(&page).await;
                    if reply.send(post).is_err() {
                        debug!("Requester went away before post data was ready");
                    }
                });
            }
            Envelope::Notification(Message::InjectResult { aggregated }) => {
                debug!(
                    summary_len = aggregated.final_summary.len(),
                    sources = aggregated.per_source_results.len(),
                    "Received INJECT_RESULT"
                );
                self.injector
                    .inject(&mut self.page.borrow_mut(), &aggregated);
            }
            Envelope::Request { message, .. } => {
                warn!(action = message.action(), "No reply available for request");
            }
            Envelope::Notification(message) => {
                debug!(action = message.action(), "Ignoring message");
            }
        }
    }
}
