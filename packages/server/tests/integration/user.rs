use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn public_profile_hides_email() {
    let app = TestApp::spawn().await;
    let ada = app.create_user("Ada").await;

    let res = app.get(&routes::user(ada.id), None).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.data()["name"], "Ada");
    assert_eq!(res.data()["role"], "USER");
    assert_eq!(res.data()["level"], 1);
    assert!(res.data().get("email").is_none());
    assert!(res.data().get("is_active").is_none());
}

#[tokio::test]
async fn unknown_profile_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app.get(&routes::user(4242), None).await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["error"], "User not found");
}

#[tokio::test]
async fn update_profile_normalizes_skills() {
    let app = TestApp::spawn().await;
    let ada = app.create_user("Ada").await;

    let res = app
        .patch(
            routes::MY_PROFILE,
            &json!({"name": "Ada L.", "bio": "Analytical engines", "skills": "Rust, rust, SQL"}),
            Some(&ada.token),
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.data()["name"], "Ada L.");
    assert_eq!(res.data()["skills"], json!(["Rust", "SQL"]));

    let res = app
        .patch(routes::MY_PROFILE, &json!({"bio": null}), Some(&ada.token))
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert!(res.data()["bio"].is_null());
    assert_eq!(res.data()["name"], "Ada L.");
}

#[tokio::test]
async fn update_profile_rejects_blank_name() {
    let app = TestApp::spawn().await;
    let ada = app.create_user("Ada").await;

    let res = app
        .patch(routes::MY_PROFILE, &json!({"name": "  "}), Some(&ada.token))
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn my_registrations_lists_joined_listings() {
    let app = TestApp::spawn().await;
    let host = app
        .create_user_with_role("Grace", ::common::UserRole::Host)
        .await;
    let ada = app.create_user("Ada").await;
    let joined = app.create_hackathon(&host.token, None).await;
    app.create_hackathon(&host.token, None).await;
    app.register_for_hackathon(joined, &ada.token).await;

    let res = app.get(routes::MY_REGISTRATIONS, Some(&ada.token)).await;

    assert_eq!(res.status, 200, "{}", res.text);
    let items = res.data().as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["listing"]["id"], joined);
    assert_eq!(items[0]["listing"]["participant_count"], 1);
}
