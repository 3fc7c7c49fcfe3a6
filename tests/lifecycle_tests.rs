//! End-to-end lifecycle scenarios: registration, validation surfaces,
//! partial task updates and the due-date rule, driven through the service
//! layer over in-memory stores.

use anyhow::Result;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;

use taskhub::server::{auth, seed, tasks, AppState};

fn state() -> AppState {
    AppState::in_memory("test-secret", Duration::from_secs(3600))
}

fn bearer(token: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    h
}

fn register_and_login(state: &AppState, name: &str) -> Result<HeaderMap> {
    let body = auth::RegisterBody {
        username: Some(name.into()),
        email: Some(format!("{name}@example.com")),
        password: Some("Passw0rd!".into()),
    };
    let (status, _) = auth::register(state, &body)?;
    assert_eq!(status, StatusCode::CREATED);
    let login = auth::LoginBody {
        identifier: Some(format!("{name}@example.com")),
        password: Some("Passw0rd!".into()),
    };
    let (_, v) = auth::login(state, "127.0.0.1", &login)?;
    Ok(bearer(v["data"]["token"].as_str().unwrap()))
}

#[tokio::test]
async fn register_login_and_self_profile() -> Result<()> {
    let state = state();
    let headers = register_and_login(&state, "newcomer")?;
    let (_, v) = auth::profile(&state, &headers)?;
    assert_eq!(v["data"]["user"]["username"], "newcomer");
    // Public registration always yields a USER, email unconfirmed.
    assert_eq!(v["data"]["user"]["role"], "user");
    assert_eq!(v["data"]["user"]["isEmailConfirmed"], false);
    // The hash never appears in any outward view.
    assert!(!v.to_string().contains("argon2"));
    Ok(())
}

#[tokio::test]
async fn registration_validation_reports_every_bad_field() -> Result<()> {
    let state = state();
    let body = auth::RegisterBody {
        username: Some("x!".into()),
        email: Some("not-an-email".into()),
        password: Some("short".into()),
    };
    let err = auth::register(&state, &body).unwrap_err();
    assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.message(), "Validation failed");
    match err {
        taskhub::error::AppError::Validation { errors, .. } => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["username", "email", "password"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn email_comparison_is_case_insensitive() -> Result<()> {
    let state = state();
    register_and_login(&state, "casey")?;
    // Same address in different case collides.
    let body = auth::RegisterBody {
        username: Some("casey2".into()),
        email: Some("CASEY@EXAMPLE.COM".into()),
        password: Some("Passw0rd!".into()),
    };
    let err = auth::register(&state, &body).unwrap_err();
    assert_eq!(err.message(), "Email already exists");
    // And login accepts either casing.
    let login = auth::LoginBody {
        identifier: Some("CASEY@Example.Com".into()),
        password: Some("Passw0rd!".into()),
    };
    assert!(auth::login(&state, "127.0.0.1", &login).is_ok());
    Ok(())
}

#[tokio::test]
async fn task_creation_applies_defaults() -> Result<()> {
    let state = state();
    let headers = register_and_login(&state, "maker")?;
    let body = tasks::TaskBody { title: Some("bare minimum".into()), ..Default::default() };
    let (_, v) = tasks::create_task(&state, &headers, &body)?;
    let task = &v["data"]["task"];
    assert_eq!(task["priority"], "medium");
    assert_eq!(task["status"], "pending");
    assert!(task["assignedTo"].is_null());
    assert!(task["dueDate"].is_null());
    Ok(())
}

#[tokio::test]
async fn task_update_is_partial_and_empty_means_no_change() -> Result<()> {
    let state = state();
    let headers = register_and_login(&state, "editor")?;
    let due = (Utc::now() + ChronoDuration::days(3)).to_rfc3339();
    let body = tasks::TaskBody {
        title: Some("draft".into()),
        description: Some("first cut".into()),
        due_date: Some(due),
        priority: Some("high".into()),
        ..Default::default()
    };
    let (_, v) = tasks::create_task(&state, &headers, &body)?;
    let id = v["data"]["task"]["id"].as_str().unwrap().to_string();

    // Empty strings leave every field alone; only status changes here.
    let update = tasks::TaskBody {
        title: Some("".into()),
        description: Some("".into()),
        due_date: Some("".into()),
        priority: Some("".into()),
        status: Some("completed".into()),
    };
    let (_, v) = tasks::update_task(&state, &headers, &id, &update)?;
    let task = &v["data"]["task"];
    assert_eq!(task["title"], "draft");
    assert_eq!(task["description"], "first cut");
    assert_eq!(task["priority"], "high");
    assert_eq!(task["status"], "completed");
    assert!(!task["dueDate"].is_null());
    Ok(())
}

#[tokio::test]
async fn due_date_must_be_in_the_future_at_write_time() -> Result<()> {
    let state = state();
    let headers = register_and_login(&state, "planner")?;
    let past = (Utc::now() - ChronoDuration::hours(1)).to_rfc3339();
    let body = tasks::TaskBody {
        title: Some("late already".into()),
        due_date: Some(past.clone()),
        ..Default::default()
    };
    let err = tasks::create_task(&state, &headers, &body).unwrap_err();
    assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);

    // Same rule on update.
    let ok = tasks::TaskBody { title: Some("fine".into()), ..Default::default() };
    let (_, v) = tasks::create_task(&state, &headers, &ok)?;
    let id = v["data"]["task"]["id"].as_str().unwrap().to_string();
    let update = tasks::TaskBody { due_date: Some(past), ..Default::default() };
    let err = tasks::update_task(&state, &headers, &id, &update).unwrap_err();
    assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn title_bounds_and_requiredness() -> Result<()> {
    let state = state();
    let headers = register_and_login(&state, "titler")?;
    let err = tasks::create_task(&state, &headers, &tasks::TaskBody::default()).unwrap_err();
    assert_eq!(err.message(), "Validation failed");

    let body = tasks::TaskBody { title: Some("x".repeat(101)), ..Default::default() };
    let err = tasks::create_task(&state, &headers, &body).unwrap_err();
    assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);

    let body = tasks::TaskBody { title: Some("x".repeat(100)), ..Default::default() };
    assert!(tasks::create_task(&state, &headers, &body).is_ok());

    // The bound counts characters; a 100-character multibyte title is fine.
    let body = tasks::TaskBody { title: Some("\u{65e5}".repeat(100)), ..Default::default() };
    assert!(tasks::create_task(&state, &headers, &body).is_ok());
    Ok(())
}

#[tokio::test]
async fn revocation_sweep_runs_through_state() -> Result<()> {
    // Zero-TTL vault: every issued token is instantly expired, so a revoked
    // entry is immediately sweepable.
    let state = AppState::in_memory("test-secret", Duration::from_secs(0));
    seed::seed_admin(&state)?;
    let login = auth::LoginBody {
        identifier: Some(seed::ADMIN_EMAIL.into()),
        password: Some(seed::ADMIN_PASSWORD.into()),
    };
    let (_, v) = auth::login(&state, "127.0.0.1", &login)?;
    let token = v["data"]["token"].as_str().unwrap();
    state.vault.revoke(token);
    assert_eq!(state.vault.revoked_len(), 1);
    assert_eq!(state.vault.sweep(), 1);
    assert_eq!(state.vault.revoked_len(), 0);
    Ok(())
}
