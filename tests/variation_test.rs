//! Integration tests for the optimistic variation workflow.

mod helpers;

use std::time::Duration;

use bytes::Bytes;
use serde_json::json;
use sitehub_core::config::AppConfig;
use sitehub_core::error::{ErrorCode, ErrorKind};
use sitehub_core::traits::notifier::NotificationLevel;
use sitehub_entity::{ActionStatus, Role, VariationStatus};
use sitehub_service::{ActionOptions, submit_with_timeout};

#[tokio::test(start_paused = true)]
async fn test_create_shows_draft_until_server_confirms() {
    let app = helpers::TestApp::new().await;
    let ctx = app.sign_in("Priya", Role::ProjectManager);
    app.backend.set_latency(Duration::from_millis(100));

    let state = app.state.clone();
    let project = app.project;
    let creator = ctx.clone();
    let handle = tokio::spawn(async move {
        state
            .variations
            .create(&creator, project, helpers::form("Rock in footing"), ActionOptions::new())
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let optimistic = app.state.variations.items();
    assert_eq!(optimistic.len(), 1);
    assert!(optimistic[0].variation_number.is_empty());
    let temp_id = optimistic[0].id;

    let created = handle.await.unwrap().unwrap().unwrap();
    let items = app.state.variations.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, created.id);
    assert_ne!(created.id, temp_id);
    assert_eq!(created.variation_number, "VAR-001");
    assert_eq!(created.created_by, Some(ctx.user_id));
}

#[tokio::test(start_paused = true)]
async fn test_failed_approval_reverts_and_notifies_once() {
    let app = helpers::TestApp::new().await;
    let ctx = app.sign_in("Priya", Role::ProjectManager);
    let mut notifications = app.state.notifier.subscribe();
    let variations = &app.state.variations;

    let v1 = variations
        .create(&ctx, app.project, helpers::form("Extra pier"), ActionOptions::new().silent())
        .await
        .unwrap()
        .unwrap();
    let submitted = variations
        .change_status(&ctx, v1.id, VariationStatus::Pending, None, ActionOptions::new().silent())
        .await
        .unwrap()
        .unwrap();

    app.backend.fail_next("update:variations", "network down");
    let result = variations
        .change_status(&ctx, v1.id, VariationStatus::Approved, None, ActionOptions::new())
        .await
        .unwrap();
    assert!(result.is_none());
    assert_eq!(variations.get(v1.id).unwrap(), submitted);

    let failed: Vec<_> = variations
        .workspace()
        .engine()
        .pending_actions()
        .into_iter()
        .filter(|a| a.status == ActionStatus::Error)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].error.as_deref(), Some("network down"));

    let mut errors = Vec::new();
    while let Ok(n) = notifications.try_recv() {
        if n.level == NotificationLevel::Error {
            errors.push(n.message);
        }
    }
    assert_eq!(errors, vec!["network down".to_string()]);

    tokio::time::sleep(Duration::from_millis(5100)).await;
    assert!(variations.workspace().engine().pending_actions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_delete_reinserts_variation() {
    let app = helpers::TestApp::new().await;
    let ctx = app.sign_in("Priya", Role::Admin);
    let variations = &app.state.variations;
    for title in ["A", "B", "C"] {
        variations
            .create(&ctx, app.project, helpers::form(title), ActionOptions::new().silent())
            .await
            .unwrap();
    }
    let before = variations.items();

    app.backend.fail_next("delete:variations", "row locked");
    let result = variations
        .delete(&ctx, before[1].id, ActionOptions::new())
        .await
        .unwrap();
    assert!(result.is_none());
    assert_eq!(variations.items(), before);
}

#[tokio::test]
async fn test_send_email_marks_variation_and_audits() {
    let app = helpers::TestApp::new().await;
    let ctx = app.sign_in("Priya", Role::ProjectManager);
    let variations = &app.state.variations;
    let v = variations
        .create(&ctx, app.project, helpers::form("Rock"), ActionOptions::new())
        .await
        .unwrap()
        .unwrap();

    let sent = variations
        .send_email(&ctx, v.id, ActionOptions::new())
        .await
        .unwrap()
        .unwrap();
    assert!(sent.email_sent);
    assert!(variations.get(v.id).unwrap().email_sent);
    assert_eq!(app.backend.invocations().len(), 1);

    let audit = app.audit_rows("email_sent");
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0]["comments"], "Sent to pm@harbour.test");
}

#[tokio::test]
async fn test_email_without_client_address_fails_before_dispatch() {
    let app = helpers::TestApp::new().await;
    let ctx = app.sign_in("Priya", Role::ProjectManager);
    let variations = &app.state.variations;
    let mut form = helpers::form("Rock");
    form.client_email = None;
    let v = variations
        .create(&ctx, app.project, form, ActionOptions::new().silent())
        .await
        .unwrap()
        .unwrap();
    let selects = app.backend.call_count("select:variations");
    let pending = variations.workspace().engine().pending_actions().len();

    let err = variations
        .send_email(&ctx, v.id, ActionOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(err.has_code(ErrorCode::MissingClientEmail));
    assert!(!variations.get(v.id).unwrap().email_sent);
    assert!(app.backend.invocations().is_empty());
    assert_eq!(app.backend.call_count("select:variations"), selects);
    assert_eq!(variations.workspace().engine().pending_actions().len(), pending);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_create_leaves_no_draft_behind() {
    let app = helpers::TestApp::new().await;
    let ctx = app.sign_in("Priya", Role::ProjectManager);
    app.backend.set_latency(Duration::from_secs(60));

    let err = submit_with_timeout(
        app.state
            .variations
            .create(&ctx, app.project, helpers::form("Rock"), ActionOptions::new()),
        Duration::from_secs(5),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);
    assert!(app.state.variations.items().is_empty());

    let actions = app.state.variations.workspace().engine().pending_actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].status, ActionStatus::Error);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(app.state.variations.items().is_empty());
    assert!(app.state.variations.workspace().engine().pending_actions().is_empty());
    assert!(app.backend.rows("variations").is_empty());
}

#[tokio::test]
async fn test_subcontractor_edits_own_variation_without_loading() {
    let app = helpers::TestApp::new().await;
    let dale = app.sign_in("Dale", Role::Subcontractor);
    let v = app
        .state
        .variations
        .service()
        .create(app.project, &helpers::form("Conduit"), dale.user_id)
        .await
        .unwrap();
    assert!(app.state.variations.items().is_empty());

    let updated = app
        .state
        .variations
        .update(&dale, v.id, json!({"title": "Conduit and pits"}), ActionOptions::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Conduit and pits");
}

#[tokio::test]
async fn test_attachments_are_added_and_removed() {
    let app = helpers::TestApp::new().await;
    let ctx = app.sign_in("Priya", Role::ProjectManager);
    let variations = &app.state.variations;
    let v = variations
        .create(&ctx, app.project, helpers::form("Rock"), ActionOptions::new())
        .await
        .unwrap()
        .unwrap();

    let with_photo = variations
        .add_attachment(&ctx, v.id, "footing.png", Bytes::from_static(b"png"), ActionOptions::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(with_photo.attachments.len(), 1);
    let path = with_photo.attachments[0].clone();
    assert!(path.starts_with(&v.id.to_string()));
    assert_eq!(variations.get(v.id).unwrap().attachments, vec![path.clone()]);

    let without = variations
        .remove_attachment(&ctx, v.id, &path, ActionOptions::new())
        .await
        .unwrap()
        .unwrap();
    assert!(without.attachments.is_empty());
    assert_eq!(app.audit_rows("attachment_added").len(), 1);
    assert_eq!(app.audit_rows("attachment_removed").len(), 1);
}

#[tokio::test]
async fn test_reason_suggestions_follow_feature_flag() {
    let app = helpers::TestApp::new().await;
    let ctx = app.sign_in("Priya", Role::ProjectManager);
    let err = app
        .state
        .variations
        .suggest_reason(&ctx, "Council requested extra fire stopping")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let mut config = AppConfig::default();
    config.features.reason_suggestions = true;
    let app = helpers::TestApp::with_config(config).await;
    let ctx = app.sign_in("Priya", Role::ProjectManager);
    let suggestion = app
        .state
        .variations
        .suggest_reason(&ctx, "Council requested extra fire stopping")
        .await
        .unwrap();
    assert_eq!(suggestion.reason, "client_request");
}

#[tokio::test]
async fn test_load_replaces_collection_from_backend() {
    let app = helpers::TestApp::new().await;
    let ctx = app.sign_in("Priya", Role::ProjectManager);
    let service = app.state.variations.service();
    service.create(app.project, &helpers::form("A"), ctx.user_id).await.unwrap();
    service.create(app.project, &helpers::form("B"), ctx.user_id).await.unwrap();

    let loaded = app.state.variations.load(&ctx, app.project, false).await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(app.state.variations.items(), loaded);

    let updated = app
        .state
        .variations
        .update(&ctx, loaded[0].id, json!({"cost_impact": 5200.0}), ActionOptions::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.cost_impact, 5200.0);
}
