use background_service::{BackgroundService, Orchestrator, PopupController, RunOutcome, TabRegistry};
use content_script::{CommonMarkRenderer, ContentOptions, ContentScript, PageSource, TabHandle};
use helper_core::{BackendConfig, HelperError, TabId, NETWORK_ERROR_MARKER};
use scraper::{Html, Selector};
use serde_json::json;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use summary_client::HttpSummaryClient;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POST_URL: &str = "https://reddit.com/r/test/abc";
const POST_PAGE: &str = r#"<html><body>
    <shreddit-post>
        <h1 slot="title">Why X?</h1>
        <div class="post-container">
            <div property="schema:articleBody"><p>...</p></div>
        </div>
    </shreddit-post>
</body></html>"#;

struct Harness {
    tab: TabHandle,
    orchestrator: Orchestrator,
}

fn harness(page: &str, base_url: String) -> Harness {
    let options = ContentOptions::new(Duration::ZERO, "icon48.png")
        .with_renderer(Box::new(CommonMarkRenderer::new()));
    let tab = ContentScript::spawn(TabId(1), PageSource::new(page, POST_URL), options).unwrap();

    let registry = Arc::new(TabRegistry::new());
    registry.register(tab.port());

    let backend = HttpSummaryClient::from_config(&BackendConfig {
        base_url,
        request_timeout_secs: 0,
    })
    .unwrap();

    Harness {
        tab,
        orchestrator: Orchestrator::new(registry, Arc::new(backend)),
    }
}

/// Base URL of a local port that nothing listens on.
fn closed_port_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

fn select_texts(html: &str, selector: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(selector).unwrap();
    document
        .select(&selector)
        .map(|element| element.text().collect::<String>())
        .collect()
}

#[tokio::test]
async fn test_end_to_end_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate_summary"))
        .and(body_partial_json(json!({
            "title": "Why X?",
            "body": "...",
            "source": "test",
            "url": POST_URL
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "final_summary": "**Answer**",
            "per_source_results": [{"title": "Dup1", "url": "https://x"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness(POST_PAGE, server.uri());
    let report = harness.orchestrator.run_analysis(TabId(1)).await;
    assert!(report.outcome.is_injected());

    let html = harness.tab.page_html().await.unwrap();
    assert_eq!(select_texts(&html, ".plugin-result-summary strong"), vec!["Answer"]);
    assert_eq!(select_texts(&html, ".plugin-result-sources li a"), vec!["Dup1"]);
    assert_eq!(select_texts(&html, ".plugin-result-sources li").len(), 1);
    assert_eq!(
        select_texts(&html, ".post-container > .plugin-result-box").len(),
        1
    );
}

#[tokio::test]
async fn test_end_to_end_network_failure() {
    let harness = harness(POST_PAGE, closed_port_base_url());
    let report = harness.orchestrator.run_analysis(TabId(1)).await;
    assert!(report.outcome.is_injected());

    let html = harness.tab.page_html().await.unwrap();
    let summary = select_texts(&html, ".plugin-result-summary");
    assert_eq!(summary.len(), 1);
    assert!(summary[0].trim().starts_with(NETWORK_ERROR_MARKER));
    assert!(select_texts(&html, ".plugin-result-sources").is_empty());
}

#[tokio::test]
async fn test_end_to_end_empty_page_skips_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let harness = harness("<html><body><p>nothing here</p></body></html>", server.uri());
    let before = harness.tab.page_html().await.unwrap();

    let report = harness.orchestrator.run_analysis(TabId(1)).await;

    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted(HelperError::EmptyContent { .. })
    ));
    assert_eq!(harness.tab.page_html().await.unwrap(), before);
}

#[tokio::test]
async fn test_end_to_end_unloaded_tab() {
    let server = MockServer::start().await;
    let harness = harness(POST_PAGE, server.uri());
    let Harness { tab, orchestrator } = harness;
    tab.unload().await.unwrap();

    let report = orchestrator.run_analysis(TabId(1)).await;

    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted(HelperError::ExtractionUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_end_to_end_through_popup() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "detail": "model is loading"
        })))
        .mount(&server)
        .await;

    let Harness { tab, orchestrator } = harness(POST_PAGE, server.uri());
    let (service, mut reports) = BackgroundService::start(Arc::new(orchestrator));
    let popup = PopupController::new(service.handle());

    assert!(popup.run_clicked(Some(tab.tab_id())).unwrap());
    let report = reports.recv().await.unwrap();
    assert!(report.outcome.is_injected());

    let html = tab.page_html().await.unwrap();
    let summary = select_texts(&html, ".plugin-result-summary");
    assert!(summary[0].contains("Backend error (503): model is loading"));
    assert!(select_texts(&html, ".plugin-result-sources").is_empty());

    service.stop().await.unwrap();
}
