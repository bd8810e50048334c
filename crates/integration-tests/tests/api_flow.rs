//! Full HTTP journey through the router: sign up, submit, moderate, rate, read.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use cl_api::{router, AppState};
use common::{admin, memory_services};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

#[tokio::test]
async fn community_recipe_journey() {
    let services = memory_services();
    let root = admin(&services, "root").await;
    let app = router(AppState::new(services.clone()));

    let (status, user) = call(
        &app,
        "POST",
        "/users",
        Some(json!({ "username": "pat", "email": "pat@example.com", "password": "knead-it", "displayName": "Pat" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["displayName"], "Pat");
    let user_id = user["id"].as_str().unwrap().to_string();

    let recipe = json!({
        "title": "  Seeded Rye  ",
        "author": "Pat",
        "difficulty": "Advanced",
        "time": { "prep": 40, "rise": 600, "bake": 60, "total": 1 },
        "yield": "1 loaf",
        "ingredients": [
            { "name": "Rye flour", "amount": "500g" },
            { "name": "  ", "amount": "" }
        ],
        "instructions": ["Build levain", "", "Bake"],
        "tips": []
    });
    let (status, sub) = call(
        &app,
        "POST",
        "/submissions",
        Some(json!({ "breadId": "rye", "recipe": recipe, "submitterId": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sub["recipe"]["title"], "Seeded Rye");
    assert_eq!(sub["recipe"]["time"]["total"], 700);
    assert_eq!(sub["recipe"]["ingredients"].as_array().unwrap().len(), 1);
    assert_eq!(sub["recipe"]["instructions"].as_array().unwrap().len(), 2);
    let sub_id = sub["id"].as_str().unwrap().to_string();

    let (status, fetched) = call(&app, "GET", &format!("/submissions/{sub_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "pending");

    // not yet visible on the bread page
    let (_, before) = call(&app, "GET", "/breads/rye", None).await;
    let count_before = before["totalRecipes"].as_u64().unwrap();

    let (status, approved) = call(
        &app,
        "POST",
        &format!("/submissions/{sub_id}/approve"),
        Some(json!({ "reviewerId": root.id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["reviewedBy"], root.id.to_string());

    let (status, rated) = call(
        &app,
        "POST",
        "/breads/rye/ratings",
        Some(json!({ "userId": user_id, "value": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rated["count"], 1);

    let (_, after) = call(&app, "GET", "/breads/rye", None).await;
    assert_eq!(after["totalRecipes"].as_u64().unwrap(), count_before + 1);
    assert_eq!(after["rating"]["average"], 5.0);
    let last = after["recipes"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["id"], sub_id.as_str());
    assert!(last.get("status").is_none());

    let (_, profile) = call(&app, "GET", &format!("/users/{user_id}"), None).await;
    assert_eq!(profile["submittedRecipes"], json!([sub_id]));
    assert_eq!(profile["ratings"]["rye"], 5);

    let (_, approved_list) = call(&app, "GET", "/submissions?status=approved", None).await;
    assert_eq!(approved_list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_user_page_is_404_and_bad_uuid_is_400() {
    let services = memory_services();
    let app = router(AppState::new(services));

    let (status, body) = call(&app, "GET", &format!("/users/{}", uuid::Uuid::now_v7()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = call(&app, "GET", "/users/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let app = router(AppState::new(memory_services()));
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/submissions")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "3600");
}
