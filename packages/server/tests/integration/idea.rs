use ::common::UserRole;
use serde_json::json;

use crate::common::{TestApp, routes};

async fn create_idea(app: &TestApp, token: &str, title: &str, category: Option<&str>) -> i32 {
    let res = app
        .post(
            routes::IDEAS,
            &json!({
                "title": title,
                "description": "A bot that reviews your unsafe blocks.",
                "tech_stack": "Rust, LLVM",
                "category": category,
            }),
            Some(token),
        )
        .await;
    assert_eq!(res.status, 201, "create_idea failed: {}", res.text);
    res.id()
}

mod ideas {
    use super::*;

    #[tokio::test]
    async fn posting_an_idea_awards_points() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;

        let id = create_idea(&app, &ada.token, "Unsafe reviewer", Some(" Tooling ")).await;

        let res = app.get(&routes::idea(id), None).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["category"], "tooling");
        assert_eq!(res.data()["votes"], 0);
        assert_eq!(res.data()["has_voted"], false);
        assert_eq!(app.points_of(ada.id).await, 5);
    }

    #[tokio::test]
    async fn missing_description_is_rejected() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;

        let res = app
            .post(
                routes::IDEAS,
                &json!({"title": "Empty", "description": "   "}),
                Some(&ada.token),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn list_filters_and_sorts() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let bob = app.create_user("Bob").await;
        let quiet = create_idea(&app, &ada.token, "Quiet idea", Some("web")).await;
        let popular = create_idea(&app, &ada.token, "Popular idea", Some("ai")).await;
        app.post(&routes::idea_vote(popular), &json!({}), Some(&bob.token))
            .await;

        let url = format!("{}?sort_by=votes", routes::IDEAS);
        let res = app.get(&url, Some(&bob.token)).await;
        assert_eq!(res.data()["items"][0]["id"], popular);
        assert_eq!(res.data()["items"][0]["has_voted"], true);
        assert_eq!(res.data()["items"][1]["has_voted"], false);

        let url = format!("{}?category=WEB", routes::IDEAS);
        let res = app.get(&url, None).await;
        assert_eq!(res.data()["pagination"]["total"], 1);
        assert_eq!(res.data()["items"][0]["id"], quiet);

        let url = format!("{}?search=POPULAR", routes::IDEAS);
        let res = app.get(&url, None).await;
        assert_eq!(res.data()["pagination"]["total"], 1);

        let url = format!("{}?sort_by=title", routes::IDEAS);
        let res = app.get(&url, None).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "sort_by must be one of: created_at, votes");
    }

    #[tokio::test]
    async fn only_author_or_admin_can_edit() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let bob = app.create_user("Bob").await;
        let admin = app.create_user_with_role("Root", UserRole::Admin).await;
        let id = create_idea(&app, &ada.token, "Draft", Some("web")).await;

        let res = app
            .patch(&routes::idea(id), &json!({"title": "Mine now"}), Some(&bob.token))
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .patch(&routes::idea(id), &json!({"category": null}), Some(&ada.token))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.data()["category"].is_null());

        let res = app.delete(&routes::idea(id), Some(&admin.token)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["message"], "Idea deleted");

        let res = app.get(&routes::idea(id), None).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["error"], "Idea not found");
    }
}

mod votes {
    use super::*;

    #[tokio::test]
    async fn vote_and_unvote() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let bob = app.create_user("Bob").await;
        let id = create_idea(&app, &ada.token, "Votable", None).await;

        let res = app
            .post(&routes::idea_vote(id), &json!({}), Some(&bob.token))
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.data()["votes"], 1);
        assert_eq!(res.data()["has_voted"], true);

        let res = app.get(&routes::idea(id), Some(&bob.token)).await;
        assert_eq!(res.data()["has_voted"], true);

        let res = app.delete(&routes::idea_vote(id), Some(&bob.token)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data()["votes"], 0);
        assert_eq!(res.data()["has_voted"], false);
    }

    #[tokio::test]
    async fn voting_twice_is_rejected() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let bob = app.create_user("Bob").await;
        let id = create_idea(&app, &ada.token, "Votable", None).await;
        app.post(&routes::idea_vote(id), &json!({}), Some(&bob.token))
            .await;

        let res = app
            .post(&routes::idea_vote(id), &json!({}), Some(&bob.token))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "ALREADY_REGISTERED");
        let res = app.get(&routes::idea(id), None).await;
        assert_eq!(res.data()["votes"], 1);
    }

    #[tokio::test]
    async fn authors_cannot_vote_for_themselves() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let id = create_idea(&app, &ada.token, "Self promotion", None).await;

        let res = app
            .post(&routes::idea_vote(id), &json!({}), Some(&ada.token))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "You cannot vote on your own idea");
    }

    #[tokio::test]
    async fn unvote_without_vote_is_not_found() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let bob = app.create_user("Bob").await;
        let id = create_idea(&app, &ada.token, "Votable", None).await;

        let res = app.delete(&routes::idea_vote(id), Some(&bob.token)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["error"], "You have not voted on this idea");
    }

    #[tokio::test]
    async fn voting_requires_login() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let id = create_idea(&app, &ada.token, "Votable", None).await;

        let res = app.post(&routes::idea_vote(id), &json!({}), None).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.error_code(), "TOKEN_MISSING");
    }
}
