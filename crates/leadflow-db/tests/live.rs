//! Live integration tests for leadflow-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/leadflow-db/`), so `"../../migrations"` resolves to the
//! workspace migration directory.

use leadflow_db::{
    apply_lead_enrichment, complete_discovery_run, complete_query, create_campaign,
    create_company, create_discovery_run, create_instruction, create_query, fail_discovery_run,
    get_campaign, get_lead, increment_campaign_leads, insert_lead, known_lead_emails,
    known_lead_urls, latest_pending_query, list_unprocessed_instructions,
    mark_instruction_processed, mark_lead_routed, mark_lead_skipped, start_query, unskip_lead,
    DbError, NewCampaign, NewCompany, NewLead, NewQuery, PersonaFields,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_test_company(pool: &sqlx::PgPool) -> i64 {
    create_company(
        pool,
        &NewCompany {
            name: "Acme Audio".to_string(),
            website: "https://acmeaudio.example".to_string(),
            description: "Portable recording gear".to_string(),
            target_audience: "podcasters and field recordists".to_string(),
            agent_notes: None,
            sending_emails: vec!["sam@acmeaudio.example".to_string()],
            default_sequence_length: 2,
            email_prompt: None,
            autopilot: false,
            autopilot_min_fit_score: 7,
        },
    )
    .await
    .expect("insert company")
    .id
}

async fn insert_test_query(pool: &sqlx::PgPool, company_id: i64) -> i64 {
    create_query(
        pool,
        &NewQuery {
            company_id,
            query: "podcasters reviewing field recorders".to_string(),
            criteria: vec!["has contact email".to_string()],
            instruction_id: None,
            rationale: "exploration".to_string(),
        },
    )
    .await
    .expect("insert query")
    .id
}

fn new_lead(query_id: i64, url: &str, email: Option<&str>) -> NewLead {
    NewLead {
        query_id,
        discovery_run_id: None,
        url: url.to_string(),
        email: email.map(ToOwned::to_owned),
        name: None,
        platform: None,
        follower_count: None,
        raw_enrichment: None,
    }
}

fn test_persona() -> PersonaFields {
    PersonaFields {
        category: "podcast".to_string(),
        full_name: "Jordan Lee".to_string(),
        title: "Podcast Host".to_string(),
        bio: "Weekly show about audio gear.".to_string(),
        expertise: vec!["audio".to_string()],
        social_links: serde_json::json!({"youtube": "https://youtube.com/@jordan"}),
        total_audience: 20_000,
        content_types: vec!["podcast".to_string()],
        fit_score: 8,
        fit_reason: "Reviews exactly this product class.".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Dedup invariant
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_url_is_suppressed(pool: sqlx::PgPool) {
    let company_id = insert_test_company(&pool).await;
    let query_id = insert_test_query(&pool, company_id).await;

    let first = insert_lead(&pool, &new_lead(query_id, "https://example.com/a", None))
        .await
        .expect("first insert");
    assert!(first.is_some(), "first insert should create a row");

    let second = insert_lead(&pool, &new_lead(query_id, "https://example.com/a", None))
        .await
        .expect("second insert");
    assert!(second.is_none(), "same url must be suppressed");
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_email_is_suppressed_across_urls(pool: sqlx::PgPool) {
    let company_id = insert_test_company(&pool).await;
    let query_id = insert_test_query(&pool, company_id).await;

    let first = insert_lead(
        &pool,
        &new_lead(query_id, "https://example.com/a", Some("a@example.com")),
    )
    .await
    .expect("first insert");
    assert!(first.is_some());

    let second = insert_lead(
        &pool,
        &new_lead(query_id, "https://example.com/b", Some("a@example.com")),
    )
    .await
    .expect("second insert");
    assert!(second.is_none(), "same email must be suppressed");
}

#[sqlx::test(migrations = "../../migrations")]
async fn known_urls_and_emails_report_existing_leads(pool: sqlx::PgPool) {
    let company_id = insert_test_company(&pool).await;
    let query_id = insert_test_query(&pool, company_id).await;

    insert_lead(
        &pool,
        &new_lead(query_id, "https://example.com/a", Some("a@example.com")),
    )
    .await
    .expect("insert");

    let urls = known_lead_urls(
        &pool,
        &[
            "https://example.com/a".to_string(),
            "https://example.com/z".to_string(),
        ],
    )
    .await
    .expect("known urls");
    assert_eq!(urls, vec!["https://example.com/a".to_string()]);

    let emails = known_lead_emails(
        &pool,
        &["a@example.com".to_string(), "z@example.com".to_string()],
    )
    .await
    .expect("known emails");
    assert_eq!(emails, vec!["a@example.com".to_string()]);
}

// ---------------------------------------------------------------------------
// State-machine legality
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn unenriched_lead_cannot_be_routed(pool: sqlx::PgPool) {
    let company_id = insert_test_company(&pool).await;
    let query_id = insert_test_query(&pool, company_id).await;
    let campaign = insert_test_campaign(&pool, company_id).await;

    let lead = insert_lead(
        &pool,
        &new_lead(query_id, "https://example.com/a", Some("a@example.com")),
    )
    .await
    .expect("insert")
    .expect("row");

    let routed = mark_lead_routed(&pool, lead.id, campaign)
        .await
        .expect("routed call");
    assert!(!routed, "pending-enrichment lead must not be routable");

    let lead = get_lead(&pool, lead.id).await.expect("get lead");
    assert_eq!(lead.campaign_status, "pending");
    assert!(lead.campaign_id.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn enriched_lead_without_email_cannot_be_routed(pool: sqlx::PgPool) {
    let company_id = insert_test_company(&pool).await;
    let query_id = insert_test_query(&pool, company_id).await;
    let campaign = insert_test_campaign(&pool, company_id).await;

    let lead = insert_lead(&pool, &new_lead(query_id, "https://example.com/a", None))
        .await
        .expect("insert")
        .expect("row");
    apply_lead_enrichment(&pool, lead.id, &test_persona(), None)
        .await
        .expect("enrich");

    let routed = mark_lead_routed(&pool, lead.id, campaign)
        .await
        .expect("routed call");
    assert!(!routed, "email-less lead must not be routable");
}

#[sqlx::test(migrations = "../../migrations")]
async fn routing_is_idempotent(pool: sqlx::PgPool) {
    let company_id = insert_test_company(&pool).await;
    let query_id = insert_test_query(&pool, company_id).await;
    let campaign = insert_test_campaign(&pool, company_id).await;

    let lead = insert_lead(
        &pool,
        &new_lead(query_id, "https://example.com/a", Some("a@example.com")),
    )
    .await
    .expect("insert")
    .expect("row");
    apply_lead_enrichment(&pool, lead.id, &test_persona(), None)
        .await
        .expect("enrich");

    let first = mark_lead_routed(&pool, lead.id, campaign)
        .await
        .expect("first confirm");
    assert!(first);
    increment_campaign_leads(&pool, campaign)
        .await
        .expect("increment");

    // Second confirm matches zero rows; the caller therefore never
    // increments the counter again.
    let second = mark_lead_routed(&pool, lead.id, campaign)
        .await
        .expect("second confirm");
    assert!(!second);

    let campaign_row = get_campaign(&pool, campaign).await.expect("get campaign");
    assert_eq!(campaign_row.leads_count, 1);

    let lead = get_lead(&pool, lead.id).await.expect("get lead");
    assert_eq!(lead.campaign_status, "routed");
    assert_eq!(lead.campaign_id, Some(campaign));
    assert!(lead.routed_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn enrichment_keeps_discovery_time_email(pool: sqlx::PgPool) {
    let company_id = insert_test_company(&pool).await;
    let query_id = insert_test_query(&pool, company_id).await;

    let lead = insert_lead(
        &pool,
        &new_lead(query_id, "https://example.com/a", Some("orig@example.com")),
    )
    .await
    .expect("insert")
    .expect("row");

    apply_lead_enrichment(&pool, lead.id, &test_persona(), Some("derived@example.com"))
        .await
        .expect("enrich");

    let lead = get_lead(&pool, lead.id).await.expect("get lead");
    assert_eq!(
        lead.email.as_deref(),
        Some("orig@example.com"),
        "discovery-time email is authoritative"
    );
    assert_eq!(lead.enrichment_status, "enriched");
    assert!(lead.enriched_at.is_some());
    assert_eq!(lead.fit_score, Some(8));
}

#[sqlx::test(migrations = "../../migrations")]
async fn skip_and_unskip_round_trip(pool: sqlx::PgPool) {
    let company_id = insert_test_company(&pool).await;
    let query_id = insert_test_query(&pool, company_id).await;

    let lead = insert_lead(&pool, &new_lead(query_id, "https://example.com/a", None))
        .await
        .expect("insert")
        .expect("row");

    mark_lead_skipped(&pool, lead.id, "No email address found")
        .await
        .expect("skip");
    let row = get_lead(&pool, lead.id).await.expect("get");
    assert_eq!(row.campaign_status, "skipped");
    assert_eq!(row.skip_reason.as_deref(), Some("No email address found"));

    // Double skip is rejected.
    let err = mark_lead_skipped(&pool, lead.id, "again").await.unwrap_err();
    assert!(matches!(err, DbError::InvalidTransition { .. }));

    unskip_lead(&pool, lead.id).await.expect("unskip");
    let row = get_lead(&pool, lead.id).await.expect("get");
    assert_eq!(row.campaign_status, "pending");
    assert!(row.skip_reason.is_none());
}

// ---------------------------------------------------------------------------
// Instruction consumption and query lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn instruction_is_consumed_exactly_once(pool: sqlx::PgPool) {
    let company_id = insert_test_company(&pool).await;
    let instruction = create_instruction(&pool, company_id, "target yoga instructors on YouTube")
        .await
        .expect("insert instruction");

    let pending = list_unprocessed_instructions(&pool, company_id)
        .await
        .expect("list");
    assert_eq!(pending.len(), 1);

    mark_instruction_processed(&pool, instruction.id)
        .await
        .expect("first consume");

    let err = mark_instruction_processed(&pool, instruction.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidTransition { .. }));

    let pending = list_unprocessed_instructions(&pool, company_id)
        .await
        .expect("list");
    assert!(pending.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn query_lifecycle_transitions_are_guarded(pool: sqlx::PgPool) {
    let company_id = insert_test_company(&pool).await;
    let query_id = insert_test_query(&pool, company_id).await;

    // Cannot complete a query that never started.
    let err = complete_query(&pool, query_id).await.unwrap_err();
    assert!(matches!(err, DbError::InvalidTransition { .. }));

    start_query(&pool, query_id).await.expect("start");

    // Starting twice is rejected.
    let err = start_query(&pool, query_id).await.unwrap_err();
    assert!(matches!(err, DbError::InvalidTransition { .. }));

    complete_query(&pool, query_id).await.expect("complete");

    // A completed query is no longer the pending pick.
    let pending = latest_pending_query(&pool, company_id).await.expect("latest");
    assert!(pending.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn discovery_run_lifecycle(pool: sqlx::PgPool) {
    let company_id = insert_test_company(&pool).await;
    let query_id = insert_test_query(&pool, company_id).await;

    let run = create_discovery_run(&pool, query_id).await.expect("create");
    assert_eq!(run.status, "running");

    complete_discovery_run(&pool, run.id, 22).await.expect("complete");

    // Completed run cannot transition again.
    let err = fail_discovery_run(&pool, run.id, "late failure").await.unwrap_err();
    assert!(matches!(err, DbError::InvalidTransition { .. }));
}

async fn insert_test_campaign(pool: &sqlx::PgPool, company_id: i64) -> i64 {
    create_campaign(
        pool,
        &NewCampaign {
            company_id,
            external_id: "ext_test".to_string(),
            name: "Podcast Hosts".to_string(),
            status: "active".to_string(),
            persona: Some("podcast host".to_string()),
            is_accepting_leads: true,
            max_leads: 500,
        },
    )
    .await
    .expect("insert campaign")
    .id
}
