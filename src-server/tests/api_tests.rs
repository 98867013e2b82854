use std::io::Write;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;
use wealthgoals_core::goals::{GoalsAllocation, NewGoal, TimePeriod};
use wealthgoals_server::api::goals::AllocationPercentageValidationRequest;
use wealthgoals_server::client::{ClientError, GoalsApiClient};
use wealthgoals_server::config::Config;
use wealthgoals_server::main_lib::{app_router, build_state, AppState};
use wealthgoals_server::seed;

fn test_app() -> (Arc<AppState>, Router) {
    let config = Config::default();
    let state = build_state(&config);
    let app = app_router(state.clone(), &config);
    (state, app)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn goal_body(title: &str) -> Value {
    json!({
        "title": title,
        "targetAmount": 10000.0,
        "targetReturnRate": 0.0,
        "monthlyInvestment": 100.0,
        "startDate": "2025-01-01",
        "dueDate": "2025-12-31"
    })
}

async fn create_goal(app: &Router, title: &str) -> String {
    let (status, goal) = call(app, "POST", "/api/v1/goals", Some(goal_body(title))).await;
    assert_eq!(status, StatusCode::OK);
    goal["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (_, app) = test_app();
    let (status, body) = call(&app, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn goal_lifecycle() {
    let (_, app) = test_app();
    let id = create_goal(&app, "House").await;

    let (status, goals) = call(&app, "GET", "/api/v1/goals", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(goals.as_array().unwrap().len(), 1);
    assert_eq!(goals[0]["title"], "House");

    let mut updated = goals[0].clone();
    updated["title"] = json!("Beach house");
    let (status, goal) = call(&app, "PUT", "/api/v1/goals", Some(updated)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(goal["title"], "Beach house");

    let (status, _) = call(&app, "DELETE", &format!("/api/v1/goals/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, "DELETE", &format!("/api/v1/goals/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn invalid_goal_is_a_bad_request() {
    let (_, app) = test_app();
    let mut body = goal_body("");
    body["title"] = json!("  ");

    let (status, error) = call(&app, "POST", "/api/v1/goals", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "validation_error");
}

#[tokio::test]
async fn allocations_drive_progress_and_history() {
    let (_, app) = test_app();
    let goal_id = create_goal(&app, "House").await;

    let (status, count) = call(
        &app,
        "POST",
        "/api/v1/valuations",
        Some(json!([
            { "accountId": "acc-a", "valuationDate": "2025-01-01", "totalValue": 10000.0 },
            { "accountId": "acc-a", "valuationDate": "2025-03-01", "totalValue": 12000.0 }
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count, json!(2));

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/goals/allocations",
        Some(json!([{
            "id": "a1",
            "goalId": goal_id,
            "accountId": "acc-a",
            "allocationPercentage": 50.0,
            "initAmount": 1000.0
        }])),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, snapshot) = call(
        &app,
        "GET",
        &format!("/api/v1/goals/{}/progress?date=2025-03-01", goal_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["currentValue"], json!(2000.0));
    assert_eq!(snapshot["projectedValue"], json!(1200.0));
    assert_eq!(snapshot["onTrack"], json!(true));

    let (status, active) = call(
        &app,
        "GET",
        &format!("/api/v1/goals/{}/allocations-on-date?date=2025-06-01", goal_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active.as_array().unwrap().len(), 1);

    let (status, history) = call(
        &app,
        "GET",
        &format!(
            "/api/v1/goals/{}/valuation-history?period=all&today=2025-03-01",
            goal_id
        ),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["period"], "all");
    assert_eq!(history["points"].as_array().unwrap().len(), 13);

    let (status, versions) = call(&app, "GET", "/api/v1/goals/allocations/a1/versions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(versions.as_array().unwrap().len(), 1);

    let (status, history) = call(
        &app,
        "GET",
        "/api/v1/valuations/history?accountId=acc-a&startDate=2025-02-01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn progress_for_unknown_goal_is_not_found() {
    let (_, app) = test_app();
    let (status, body) = call(&app, "GET", "/api/v1/goals/missing/progress", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn malformed_query_date_is_a_bad_request() {
    let (_, app) = test_app();
    let goal_id = create_goal(&app, "House").await;
    let (status, body) = call(
        &app,
        "GET",
        &format!("/api/v1/goals/{}/progress?date=03/01/2025", goal_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn validation_endpoints_report_instead_of_failing() {
    let (_, app) = test_app();
    let goal_id = create_goal(&app, "House").await;
    call(
        &app,
        "POST",
        "/api/v1/goals/allocations",
        Some(json!([{
            "id": "a1",
            "goalId": goal_id,
            "accountId": "acc-a",
            "allocationPercentage": 60.0,
            "allocationAmount": 400.0
        }])),
    )
    .await;

    let (status, result) = call(
        &app,
        "POST",
        "/api/v1/goals/validate-allocation-percentages",
        Some(json!({ "accountId": "acc-a", "newPercentage": 50.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["valid"], json!(false));
    assert!(!result["message"].as_str().unwrap().is_empty());

    let (_, result) = call(
        &app,
        "POST",
        "/api/v1/goals/validate-allocation-percentages",
        Some(json!({ "accountId": "acc-a", "newPercentage": 50.0, "excludeAllocationId": "a1" })),
    )
    .await;
    assert_eq!(result["valid"], json!(true));

    let (_, result) = call(
        &app,
        "POST",
        "/api/v1/goals/validate-allocation-conflict",
        Some(json!({
            "accountId": "acc-a",
            "startDate": "2025-06-01",
            "endDate": "2025-08-01",
            "percentAllocation": 40.0
        })),
    )
    .await;
    assert_eq!(result["valid"], json!(true));

    let (_, result) = call(
        &app,
        "POST",
        "/api/v1/goals/validate-unallocated-balance",
        Some(json!({ "accountId": "acc-a", "allocationAmount": 700.0, "currentAccountValue": 1000.0 })),
    )
    .await;
    assert_eq!(result["valid"], json!(false));

    let (status, balance) = call(
        &app,
        "GET",
        "/api/v1/accounts/acc-a/unallocated-balance?currentAccountValue=1000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance, json!({ "unallocatedBalance": 600.0 }));
}

#[tokio::test]
async fn mutations_are_broadcast() {
    let (state, app) = test_app();
    let mut events = state.events.subscribe();

    let goal_id = create_goal(&app, "House").await;
    let event = events.recv().await.unwrap();
    assert_eq!(event.resource_type, "goal");
    assert_eq!(event.action, "created");
    assert_eq!(event.payload["goal_id"], json!(goal_id));

    call(&app, "DELETE", "/api/v1/goals/missing", None).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn seed_file_populates_stores() {
    let (state, app) = test_app();
    let seed_json = json!({
        "goals": [{
            "id": "g1",
            "title": "Retirement",
            "targetAmount": 500000.0,
            "isAchieved": false,
            "targetReturnRate": 5.0,
            "dueDate": "2045-01-01",
            "monthlyInvestment": 500.0,
            "startDate": "2025-01-01"
        }],
        "allocations": [{
            "id": "a1",
            "goalId": "g1",
            "accountId": "acc-a",
            "allocationPercentage": 100.0,
            "initAmount": 2000.0
        }],
        "valuations": [
            { "accountId": "acc-a", "valuationDate": "2025-01-01", "totalValue": 2000.0 }
        ]
    });

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(seed_json.to_string().as_bytes()).unwrap();

    let summary = seed::load_seed_file(file.path(), &state).await.unwrap();
    assert_eq!(summary.goals, 1);
    assert_eq!(summary.allocations, 1);
    assert_eq!(summary.valuations, 1);

    let (_, goals) = call(&app, "GET", "/api/v1/goals", None).await;
    assert_eq!(goals[0]["id"], "g1");
    let (_, allocations) = call(&app, "GET", "/api/v1/goals/allocations", None).await;
    assert_eq!(allocations[0]["endDate"], "2045-01-01");
}

#[tokio::test]
async fn seed_with_unknown_goal_fails() {
    let (state, _) = test_app();
    let data: seed::SeedData = serde_json::from_value(json!({
        "allocations": [{ "id": "a1", "goalId": "nope", "accountId": "acc-a", "allocationPercentage": 10.0 }]
    }))
    .unwrap();
    assert!(seed::apply_seed(data, &state).await.is_err());
}

#[tokio::test]
async fn client_round_trip() {
    let (_, app) = test_app();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = GoalsApiClient::new(format!("http://{}", addr)).unwrap();
    client.healthz().await.unwrap();

    let goal = client
        .create_goal(&NewGoal {
            id: None,
            title: "Car".to_string(),
            description: None,
            target_amount: 20_000.0,
            is_achieved: false,
            target_return_rate: Some(0.0),
            due_date: Some("2026-01-01".to_string()),
            monthly_investment: Some(200.0),
            start_date: Some("2025-01-01".to_string()),
            initial_actual_value: Some(1_000.0),
        })
        .await
        .unwrap();

    client
        .upsert_goal_allocations(&[GoalsAllocation {
            goal_id: goal.id.clone(),
            account_id: "acc-b".to_string(),
            allocation_percentage: 25.0,
            ..Default::default()
        }])
        .await
        .unwrap();
    let allocations = client.load_goals_allocations().await.unwrap();
    assert_eq!(allocations.len(), 1);
    assert!(!allocations[0].id.is_empty());

    let history = client
        .get_goal_valuation_history(&goal.id, TimePeriod::Months, Some("2025-06-15"))
        .await
        .unwrap();
    assert_eq!(history.period, TimePeriod::Months);
    assert_eq!(history.start_date, "2025-01-01");

    let check = client
        .validate_allocation_percentages(&AllocationPercentageValidationRequest {
            account_id: "acc-b".to_string(),
            new_percentage: 80.0,
            exclude_allocation_id: None,
        })
        .await
        .unwrap();
    assert!(!check.valid);

    let err = client.delete_goal("missing").await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 404, .. }));

    client.delete_goal(&goal.id).await.unwrap();
    assert!(client.get_goals().await.unwrap().is_empty());
}

#[tokio::test]
async fn client_escapes_ids_in_paths() {
    let (_, app) = test_app();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = GoalsApiClient::new(format!("http://{}/", addr)).unwrap();
    let goal = client
        .create_goal(&NewGoal {
            id: None,
            title: "Trip".to_string(),
            description: None,
            target_amount: 5_000.0,
            is_achieved: false,
            target_return_rate: None,
            due_date: Some("2026-01-01".to_string()),
            monthly_investment: None,
            start_date: Some("2025-01-01".to_string()),
            initial_actual_value: None,
        })
        .await
        .unwrap();

    let odd_id = "a 1/x?y";
    client
        .upsert_goal_allocations(&[GoalsAllocation {
            id: odd_id.to_string(),
            goal_id: goal.id.clone(),
            account_id: "acc/c".to_string(),
            allocation_percentage: 10.0,
            allocation_amount: 100.0,
            ..Default::default()
        }])
        .await
        .unwrap();

    let versions = client.get_allocation_versions(odd_id).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].allocation_id, odd_id);

    let balance = client.get_unallocated_balance("acc/c", 1_000.0).await.unwrap();
    assert_eq!(balance, 900.0);

    client.delete_goal_allocation(odd_id).await.unwrap();
    assert!(client.load_goals_allocations().await.unwrap().is_empty());
}

#[test]
fn client_rejects_unusable_base_url() {
    assert!(matches!(
        GoalsApiClient::new("not a url"),
        Err(ClientError::InvalidUrl(_))
    ));
}
