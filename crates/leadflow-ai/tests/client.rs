//! Integration tests for the model-call wrappers using wiremock HTTP mocks.

use leadflow_ai::{
    decide_campaign, derive_persona, extract_contact_email, generate_focused_query,
    generate_sequence, AiError, CampaignSummary, ChatClient, CompanyContext, LeadSummary,
    RoutingDecision, BOOKING_LINK_PLACEHOLDER,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> ChatClient {
    ChatClient::with_base_url("test-key", 30, base_url)
        .expect("client construction should not fail")
        .with_retry(0, 0)
}

fn test_company() -> CompanyContext {
    CompanyContext {
        name: "Acme Audio".to_string(),
        website: "https://acmeaudio.example".to_string(),
        description: "Portable recording gear".to_string(),
        target_audience: "podcasters and field recordists".to_string(),
    }
}

/// Wraps a message content string in a chat-completions response body.
fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

#[tokio::test]
async fn focused_query_round_trips() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4.1-mini",
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"query": "podcast hosts reviewing field recorders", "criteria": ["has contact email"], "rationale": "directly matches the instruction"}"#,
        )))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let generated = generate_focused_query(
        &client,
        &test_company(),
        "find podcasters who review recording gear",
    )
    .await
    .expect("should generate");

    assert_eq!(generated.query, "podcast hosts reviewing field recorders");
    assert_eq!(generated.criteria, vec!["has contact email"]);
}

#[tokio::test]
async fn persona_derivation_repairs_partial_output() {
    let server = MockServer::start().await;

    // Markdown-fenced, with several fields missing or mistyped.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "```json\n{\"category\": \"podcast\", \"full_name\": \"Jordan Lee\", \"fit_score\": \"very high\", \"total_audience\": 20000}\n```",
        )))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let persona = derive_persona(
        &client,
        &serde_json::json!({"url": "https://example.com/a"}),
        &test_company(),
    )
    .await
    .expect("repair should succeed");

    assert_eq!(persona.category, "podcast");
    assert_eq!(persona.full_name, "Jordan Lee");
    assert_eq!(persona.fit_score, 5, "mistyped score falls back to default");
    assert_eq!(persona.total_audience, 20000);
    assert!(persona.email.is_none());
}

#[tokio::test]
async fn persona_derivation_fails_without_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("I cannot enrich this lead.")),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = derive_persona(&client, &serde_json::json!({}), &test_company())
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::InvalidJson { .. }));
}

#[tokio::test]
async fn email_extraction_short_circuits_without_at_sign() {
    // No mock server needed: the payload has no '@', so no request is made.
    let client = test_client("http://127.0.0.1:9");
    let result = extract_contact_email(&client, &serde_json::json!({"notes": "no contact"}))
        .await
        .expect("short circuit");
    assert_eq!(result, None);
}

#[tokio::test]
async fn email_extraction_uses_the_cheap_model() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({"model": "gpt-4.1-nano"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"email": "creator@example.com"}"#,
        )))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = extract_contact_email(
        &client,
        &serde_json::json!({"bio": "reach me at creator@example.com"}),
    )
    .await
    .expect("should extract");
    assert_eq!(result.as_deref(), Some("creator@example.com"));
}

fn test_lead() -> LeadSummary {
    LeadSummary {
        email: "jordan@example.com".to_string(),
        full_name: Some("Jordan Lee".to_string()),
        category: Some("podcast".to_string()),
        platform: Some("youtube".to_string()),
        bio: Some("Weekly audio-gear show.".to_string()),
        expertise: vec!["audio".to_string()],
        total_audience: Some(20_000),
        content_types: vec!["podcast".to_string()],
        fit_score: Some(8),
        fit_reason: Some("Reviews this product class.".to_string()),
    }
}

fn test_campaigns() -> Vec<CampaignSummary> {
    vec![CampaignSummary {
        id: 7,
        name: "Podcast Hosts".to_string(),
        persona: Some("podcast host".to_string()),
        leads_count: 12,
        max_leads: 500,
        emails_sent: 120,
        open_rate: "45.0%".to_string(),
        reply_rate: "4.2%".to_string(),
    }]
}

#[tokio::test]
async fn routing_decision_round_trips() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"action": "add_to_existing", "campaign_id": 7, "reason": "podcast persona match"}"#,
        )))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let decision = decide_campaign(
        &client,
        &test_lead(),
        &test_campaigns(),
        &test_company(),
        false,
    )
    .await
    .expect("should decide");

    assert_eq!(
        decision,
        RoutingDecision::AddToExisting {
            campaign_id: 7,
            reason: "podcast persona match".to_string()
        }
    );
}

#[tokio::test]
async fn skip_answer_outside_auto_mode_is_a_contract_violation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"action": "skip", "reason": "low fit"}"#,
        )))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = decide_campaign(
        &client,
        &test_lead(),
        &test_campaigns(),
        &test_company(),
        false,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AiError::InvalidDecision(_)));
}

#[tokio::test]
async fn sequence_generation_validates_structure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({"model": "gpt-4.1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"initial": {"subject": "Your show", "body": "Hey {{first_name}}, caught your latest episode."},
                "follow_ups": [
                  {"subject": "", "body": "Following up briefly.", "delay_days": 3},
                  {"subject": "", "body": "Last note from me: {{booking_link}}", "delay_days": 4}
                ]}"#,
        )))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let steps = generate_sequence(&client, &test_company(), "podcast host", 3, None)
        .await
        .expect("should generate");

    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0].delay_days, 0);
    assert_eq!(steps[1].delay_days, 3);
    assert!(steps[2].body.contains(BOOKING_LINK_PLACEHOLDER));
}

#[tokio::test]
async fn misplaced_booking_link_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"initial": {"subject": "s", "body": "Book now: {{booking_link}}"},
                "follow_ups": [{"subject": "", "body": "bye", "delay_days": 3}]}"#,
        )))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = generate_sequence(&client, &test_company(), "podcast host", 2, None)
        .await
        .unwrap_err();

    assert!(matches!(err, AiError::InvalidSequence(_)));
}

#[tokio::test]
async fn provider_error_message_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "Incorrect API key provided"}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = generate_focused_query(&client, &test_company(), "anything")
        .await
        .unwrap_err();

    assert!(
        matches!(err, AiError::ApiError(msg) if msg == "Incorrect API key provided"),
        "provider message should be preserved"
    );
}
