mod common;

use axum::http::StatusCode;
use common::{json_body, location, TestApp};
use portal_service::models::UserRecord;
use serde_json::json;

fn submission() -> serde_json::Value {
    json!({
        "first_name": "Grace",
        "last_name": "Hopper",
        "email": "grace@example.com",
        "phone": "555-0199",
        "address": { "city": "Arlington", "country": "US" }
    })
}

#[tokio::test]
async fn onboarding_unlocks_the_dashboard() {
    let app = TestApp::new();
    let mut user = UserRecord::new("user_1", "grace@example.com");
    user.image_url = Some("https://img.example.com/grace.png".to_string());
    app.sign_in("tok", user, None);

    let response = app.get("/dashboard", Some("tok")).await;
    assert_eq!(location(&response), "/onboarding");

    let response = app.post_json("/onboarding", Some("tok"), submission()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["onboarding_completed"], true);
    assert_eq!(body["profile"]["address"]["city"], "Arlington");
    assert_eq!(body["profile"]["address"]["street"], "");
    assert_eq!(
        body["profile"]["image_url"],
        "https://img.example.com/grace.png"
    );

    let response = app.get("/dashboard", Some("tok")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["profile"]["first_name"], "Grace");

    let response = app.get("/onboarding", Some("tok")).await;
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn blank_required_fields_are_rejected() {
    let app = TestApp::new();
    app.sign_in("tok", UserRecord::new("user_1", "g@example.com"), None);

    let mut body = submission();
    body["phone"] = json!("   ");
    let response = app.post_json("/onboarding", Some("tok"), body).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.get("/dashboard", Some("tok")).await;
    assert_eq!(location(&response), "/onboarding");
}

#[tokio::test]
async fn anonymous_submission_is_redirected() {
    let app = TestApp::new();

    let response = app.post_json("/onboarding", None, submission()).await;
    assert!(location(&response).starts_with("/sign-in?redirect_url="));
}

#[tokio::test]
async fn completed_user_cannot_resubmit() {
    let app = TestApp::new();
    app.learner("tok", "user_1");

    let response = app.post_json("/onboarding", Some("tok"), submission()).await;
    assert_eq!(location(&response), "/dashboard");
}
