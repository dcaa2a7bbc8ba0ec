//! Integration tests for `OutboundClient` and `NotifyClient` using wiremock.

use leadflow_outbound::{
    ContactSpec, CreateCampaignSpec, NotifyClient, OutboundClient, OutboundError, SequenceStepSpec,
};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> OutboundClient {
    OutboundClient::with_base_url("test-key", 30, base_url)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn create_campaign_converts_delays_and_returns_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/campaigns"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "name": "Podcast Hosts",
            "email_list": ["sam@acmeaudio.example"],
            "sequences": [{"steps": [
                {"type": "email", "delay": 0},
                {"type": "email", "delay": 4320}
            ]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "ext_123",
            "name": "Podcast Hosts",
            "status": 0
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let id = client
        .create_campaign(&CreateCampaignSpec {
            name: "Podcast Hosts".to_string(),
            email_list: vec!["sam@acmeaudio.example".to_string()],
            steps: vec![
                SequenceStepSpec {
                    subject: "Your show".to_string(),
                    body: "Hey {{first_name}},".to_string(),
                    delay_days: 0,
                },
                SequenceStepSpec {
                    subject: String::new(),
                    body: "Following up.".to_string(),
                    delay_days: 3,
                },
            ],
            daily_limit: 50,
        })
        .await
        .expect("create should succeed");

    assert_eq!(id, "ext_123");
}

#[tokio::test]
async fn add_lead_posts_contact_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/leads"))
        .and(body_partial_json(serde_json::json!({
            "campaign_id": "ext_123",
            "leads": [{"email": "jordan@example.com", "first_name": "Jordan"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client
        .add_lead(
            "ext_123",
            &ContactSpec {
                email: "jordan@example.com".to_string(),
                first_name: "Jordan".to_string(),
                lead_url: "https://example.com/a".to_string(),
            },
        )
        .await
        .expect("add lead should succeed");
}

#[tokio::test]
async fn activate_hits_the_campaign_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/campaigns/ext_123/activate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.activate("ext_123").await.expect("activate");
}

#[tokio::test]
async fn analytics_tolerates_missing_counters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/campaigns/analytics"))
        .and(query_param("campaign_id", "ext_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sent": 120,
            "opened": 60
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let analytics = client.get_analytics("ext_123").await.expect("analytics");

    assert_eq!(analytics.sent, 120);
    assert_eq!(analytics.opened, 60);
    assert_eq!(analytics.replied, 0, "missing counters default to zero");
    assert_eq!(analytics.bounced, 0);
}

#[tokio::test]
async fn platform_rejection_carries_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid email"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .add_lead(
            "ext_123",
            &ContactSpec {
                email: "not-an-email".to_string(),
                first_name: String::new(),
                lead_url: String::new(),
            },
        )
        .await
        .unwrap_err();

    assert!(
        matches!(err, OutboundError::ApiError { status: 422, message } if message == "invalid email")
    );
}

#[tokio::test]
async fn list_accounts_parses_items() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [
                {"email": "sam@acmeaudio.example", "status": 1, "daily_limit": 50},
                {"email": "pat@acmeaudio.example", "status": 1}
            ]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let accounts = client.list_accounts().await.expect("accounts");

    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].email, "sam@acmeaudio.example");
    assert_eq!(accounts[0].daily_limit, Some(50));
    assert_eq!(accounts[1].daily_limit, None);
}

#[tokio::test]
async fn notify_sends_digest_email() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer notify-key"))
        .and(body_partial_json(serde_json::json!({
            "from": "leadflow <noreply@leadflow.local>",
            "to": ["ops@example.com"],
            "subject": "Daily Digest"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "email_1"})))
        .mount(&server)
        .await;

    let client = NotifyClient::with_base_url("notify-key", 30, &server.uri())
        .expect("client construction should not fail");
    client
        .send(
            "leadflow <noreply@leadflow.local>",
            &["ops@example.com".to_string()],
            "Daily Digest",
            "<h1>Digest</h1>",
        )
        .await
        .expect("send should succeed");
}
