//! Offline unit tests for leadflow-db pool configuration and row types.
//! These tests do not require a live database connection.

use leadflow_core::{AppConfig, Environment};
use leadflow_db::{CampaignRow, DiscoveryRunRow, LeadRow, PoolConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

fn test_app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        http_request_timeout_secs: 30,
        ai_api_key: None,
        ai_base_url: "https://api.openai.com/v1".to_string(),
        ai_max_retries: 2,
        discovery_api_key: None,
        discovery_base_url: "https://api.exa.ai/websets/v0".to_string(),
        discovery_result_count: 25,
        poll_interval_ms: 5000,
        poll_max_attempts: 60,
        outbound_api_key: None,
        outbound_base_url: "https://api.instantly.ai/api/v2".to_string(),
        notify_api_key: None,
        notify_base_url: "https://api.resend.com".to_string(),
        retry_backoff_base_ms: 1000,
        max_retries: 3,
        enrich_concurrency: 3,
        attach_concurrency: 5,
        digest_recipients: vec![],
        digest_from: "leadflow <noreply@leadflow.local>".to_string(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&test_app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`DiscoveryRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn discovery_run_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = DiscoveryRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        query_id: 2_i64,
        webset_id: "ws_abc".to_string(),
        status: "running".to_string(),
        items_found: 0_i32,
        started_at: Utc::now(),
        completed_at: None,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.status, "running");
    assert_eq!(row.items_found, 0);
    assert!(row.completed_at.is_none());
    assert!(row.error_message.is_none());
}

/// Compile-time smoke test for [`LeadRow`]: freshly discovered leads start
/// with both status axes `pending` and all persona fields null.
#[test]
fn lead_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = LeadRow {
        id: 10_i64,
        public_id: Uuid::new_v4(),
        query_id: 2_i64,
        discovery_run_id: Some(1),
        url: "https://www.youtube.com/@creator".to_string(),
        email: None,
        name: Some("Creator".to_string()),
        platform: Some("youtube".to_string()),
        follower_count: Some(15_000),
        raw_enrichment: None,
        category: None,
        full_name: None,
        title: None,
        bio: None,
        expertise: None,
        social_links: None,
        total_audience: None,
        content_types: None,
        fit_score: None,
        fit_reason: None,
        enrichment_status: "pending".to_string(),
        enriched_at: None,
        campaign_status: "pending".to_string(),
        suggested_campaign_id: None,
        suggested_campaign_reason: None,
        campaign_id: None,
        routed_at: None,
        skip_reason: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.enrichment_status, "pending");
    assert_eq!(row.campaign_status, "pending");
    assert!(row.fit_score.is_none());
    assert!(row.campaign_id.is_none());
}

#[test]
fn campaign_rates_divide_by_sends() {
    use chrono::Utc;
    use uuid::Uuid;

    let mut row = CampaignRow {
        id: 3_i64,
        public_id: Uuid::new_v4(),
        company_id: 1_i64,
        external_id: "ext_1".to_string(),
        name: "Fitness Coaches".to_string(),
        status: "active".to_string(),
        persona: Some("fitness coach".to_string()),
        leads_count: 10,
        emails_sent: 200,
        opens: 100,
        replies: 4,
        is_accepting_leads: true,
        max_leads: 500,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert!((row.open_rate() - 0.5).abs() < f64::EPSILON);
    assert!((row.reply_rate() - 0.02).abs() < f64::EPSILON);

    row.emails_sent = 0;
    assert!((row.open_rate() - 0.0).abs() < f64::EPSILON);
    assert!((row.reply_rate() - 0.0).abs() < f64::EPSILON);
}
