//! Integration tests for audit logging and the audit trail cache.

mod helpers;

use std::time::Duration;

use serde_json::json;
use sitehub_entity::Role;
use sitehub_service::ActionOptions;

#[tokio::test]
async fn test_single_field_change_writes_one_entry() {
    let app = helpers::TestApp::new().await;
    let ctx = app.sign_in("Priya", Role::ProjectManager);
    let mut form = helpers::form("A");
    form.cost_impact = 100.0;
    form.cost_breakdown.clear();
    let v = app
        .state
        .variations
        .create(&ctx, app.project, form, ActionOptions::new())
        .await
        .unwrap()
        .unwrap();

    app.state
        .variations
        .update(&ctx, v.id, json!({"title": "B", "cost_impact": 100.0}), ActionOptions::new())
        .await
        .unwrap()
        .unwrap();

    let changes = app.audit_rows("field_updated");
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["field_name"], "title");
    assert_eq!(changes[0]["old_value"], "A");
    assert_eq!(changes[0]["new_value"], "B");
    assert_eq!(changes[0]["user_name"], "Priya");
}

#[tokio::test(start_paused = true)]
async fn test_trail_is_cached_within_ttl() {
    let app = helpers::TestApp::new().await;
    let ctx = app.sign_in("Priya", Role::ProjectManager);
    let v = app
        .state
        .variations
        .create(&ctx, app.project, helpers::form("Rock"), ActionOptions::new())
        .await
        .unwrap()
        .unwrap();
    app.state.variations.workspace().trail().invalidate(v.id.into_uuid());

    let first = app.state.variations.audit_trail(&ctx, v.id, false).await.unwrap();
    let second = app.state.variations.audit_trail(&ctx, v.id, false).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(app.backend.call_count("rpc:get_variation_audit_trail"), 1);

    tokio::time::sleep(Duration::from_secs(301)).await;
    app.state.variations.audit_trail(&ctx, v.id, false).await.unwrap();
    assert_eq!(app.backend.call_count("rpc:get_variation_audit_trail"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_refreshes_fetches_once() {
    let app = helpers::TestApp::new().await;
    let ctx = app.sign_in("Priya", Role::ProjectManager);
    let v = app
        .state
        .variations
        .create(&ctx, app.project, helpers::form("Rock"), ActionOptions::new().silent())
        .await
        .unwrap()
        .unwrap();
    let trail = app.state.variations.workspace().trail();

    for _ in 0..5 {
        trail.debounced_refresh(v.id.into_uuid(), Duration::from_millis(300));
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(app.backend.call_count("rpc:get_variation_audit_trail"), 0);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(app.backend.call_count("rpc:get_variation_audit_trail"), 1);
    assert_eq!(trail.cached(v.id.into_uuid()).unwrap().len(), 1);
}

#[tokio::test]
async fn test_audit_outage_does_not_roll_back_and_is_retried() {
    let app = helpers::TestApp::new().await;
    let ctx = app.sign_in("Priya", Role::ProjectManager);
    app.backend.fail_always("rpc:log_variation_change", "audit store offline");

    let v = app
        .state
        .variations
        .create(&ctx, app.project, helpers::form("Rock"), ActionOptions::new())
        .await
        .unwrap()
        .unwrap();
    let updated = app
        .state
        .variations
        .update(&ctx, v.id, json!({"title": "Rock in F4"}), ActionOptions::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(app.state.variations.get(v.id).unwrap(), updated);
    assert_eq!(app.state.outbox.pending(), 2);
    assert!(app.backend.rows("audit_log").is_empty());

    app.backend.clear_failures();
    app.state.shutdown().await.unwrap();
    assert_eq!(app.state.outbox.pending(), 0);
    assert_eq!(app.backend.rows("audit_log").len(), 2);
}
