use grantdesk_generation::{Analysis, GeminiClient, GeminiConfig, GenerationError, Generator};
use grantdesk_model::ApplicationStatus;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/test-model:generateContent";

fn client(server: &MockServer) -> GeminiClient {
    let config = GeminiConfig::new("test-key")
        .with_base_url(format!("{}/v1beta", server.uri()))
        .with_model("test-model")
        .with_timeout_secs(1);
    GeminiClient::new(config).unwrap()
}

fn text_response(text: &str, grounding: Value) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP",
            "groundingMetadata": grounding
        }]
    })
}

#[tokio::test]
async fn analyze_parses_structured_output() {
    let server = MockServer::start().await;
    let output = json!({
        "priorities": ["Health equity", "Park access"],
        "scale": "Multi-Site",
        "budgetEstimate": 320000,
        "fundingSecured": 40000,
        "equityGoals": "Serve east-side neighborhoods"
    })
    .to_string();

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "generationConfig": { "responseMimeType": "application/json" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(&output, json!({}))))
        .expect(1)
        .mount(&server)
        .await;

    let analysis = client(&server).analyze("Austin", "Council memo").await.unwrap();
    assert_eq!(analysis.priorities, vec!["Health equity".to_string(), "Park access".to_string()]);
    assert_eq!(analysis.budget_estimate, Some(320_000.0));
    assert_eq!(analysis.funding_secured, Some(40_000.0));
    assert_eq!(analysis.scale.as_deref(), Some("Multi-Site"));
    assert_eq!(analysis.phase_breakdown, None);
}

#[tokio::test]
async fn analyze_without_text_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = client(&server).analyze("Austin", "").await.unwrap_err();
    assert_eq!(err, GenerationError::EmptyResponse);
}

#[tokio::test]
async fn analyze_with_prose_output_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(text_response("I could not find a budget.", json!({}))),
        )
        .mount(&server)
        .await;

    let err = client(&server).analyze("Austin", "").await.unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)), "{err}");
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": { "code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
        })))
        .mount(&server)
        .await;

    let err = client(&server).analyze("Austin", "").await.unwrap_err();
    assert_eq!(
        err,
        GenerationError::Api {
            status: 503,
            message: "The model is overloaded.".into()
        }
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_response("{}", json!({})))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = client(&server).analyze("Austin", "").await.unwrap_err();
    assert!(matches!(err, GenerationError::Timeout(_)), "{err}");
}

#[tokio::test]
async fn discovery_uses_search_grounding_for_links() {
    let server = MockServer::start().await;
    let output = json!([
        { "name": "Community Foundation Fund", "level": "Local", "maxVal": 50000, "applicationPeriod": "Spring", "sourceLink": "#" },
        { "name": "LWCF", "level": "Federal", "maxVal": "500000", "applicationPeriod": "Rolling", "sourceLink": "https://lwcf.example.gov" },
        { "name": "Wellness Trust", "level": "Private/Healthcare", "maxVal": 75000, "applicationPeriod": "Fall" }
    ])
    .to_string();
    let grounding = json!({
        "groundingChunks": [
            { "web": { "uri": "https://search.example/1" } },
            { "web": { "uri": "https://search.example/2" } }
        ]
    });

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_partial_json(json!({ "tools": [{ "googleSearch": {} }] })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(text_response(&format!("```json\n{output}\n```"), grounding)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let analysis = Analysis {
        priorities: vec!["Park access".into()],
        ..Analysis::default()
    };
    let discovery = client(&server).discover_grants("Austin", &analysis).await.unwrap();
    assert_eq!(discovery.grounding_urls.len(), 2);

    let grants = discovery.into_grants(1_700_000_000_000);
    assert_eq!(grants.len(), 3);
    assert_eq!(grants[0].source_link, "https://search.example/1");
    assert_eq!(grants[1].source_link, "https://lwcf.example.gov");
    assert_eq!(grants[1].max_val, 500_000.0);
    assert_eq!(grants[2].source_link, "https://search.example/1");
    assert!(grants.iter().all(|g| g.status == ApplicationStatus::NotStarted));
}

#[tokio::test]
async fn discovery_with_no_content_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [{}] })))
        .mount(&server)
        .await;

    let discovery = client(&server)
        .discover_grants("Austin", &Analysis::default())
        .await
        .unwrap();
    assert!(discovery.candidates.is_empty());
}
