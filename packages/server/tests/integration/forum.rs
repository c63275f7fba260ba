use ::common::UserRole;
use serde_json::json;

use crate::common::{TestApp, routes};

async fn create_thread(app: &TestApp, token: &str, title: &str, category: Option<&str>) -> i32 {
    let res = app
        .post(
            routes::FORUMS,
            &json!({
                "title": title,
                "content": "What does everyone use for **async** testing?",
                "category": category,
                "tags": ["rust", "testing"],
            }),
            Some(token),
        )
        .await;
    assert_eq!(res.status, 201, "create_thread failed: {}", res.text);
    res.id()
}

mod threads {
    use super::*;

    #[tokio::test]
    async fn posting_a_thread_awards_points() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;

        let id = create_thread(&app, &ada.token, "Async tests", None).await;

        let res = app.get(&routes::forum(id), None).await;
        assert_eq!(res.data()["category"], "general");
        assert_eq!(res.data()["author_name"], "Ada");
        assert_eq!(app.points_of(ada.id).await, 5);
    }

    #[tokio::test]
    async fn reading_a_thread_counts_views() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let id = create_thread(&app, &ada.token, "Async tests", None).await;

        let first = app.get(&routes::forum(id), None).await;
        let second = app.get(&routes::forum(id), None).await;

        assert_eq!(first.data()["views"], 1);
        assert_eq!(second.data()["views"], 2);
    }

    #[tokio::test]
    async fn missing_thread_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::forum(12345), None).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["error"], "Thread not found");
    }

    #[tokio::test]
    async fn pinned_threads_come_first() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let admin = app.create_user_with_role("Root", UserRole::Admin).await;
        let old = create_thread(&app, &ada.token, "Old news", None).await;
        create_thread(&app, &ada.token, "Fresh", None).await;

        let res = app
            .patch(&routes::forum(old), &json!({"is_pinned": true}), Some(&admin.token))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.get(routes::FORUMS, None).await;
        assert_eq!(res.data()["items"][0]["id"], old);
        assert_eq!(res.data()["items"][0]["is_pinned"], true);
    }

    #[tokio::test]
    async fn authors_cannot_pin_their_own_threads() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let id = create_thread(&app, &ada.token, "Pin me", None).await;

        let res = app
            .patch(&routes::forum(id), &json!({"is_pinned": true}), Some(&ada.token))
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["error"], "Only admins can pin threads");
    }

    #[tokio::test]
    async fn list_filters_by_category_and_tag() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        create_thread(&app, &ada.token, "Hiring", Some("Jobs")).await;
        create_thread(&app, &ada.token, "Question", None).await;

        let res = app.get(&format!("{}?category=jobs", routes::FORUMS), None).await;
        assert_eq!(res.data()["pagination"]["total"], 1);
        assert_eq!(res.data()["items"][0]["title"], "Hiring");

        let res = app.get(&format!("{}?tag=Rust", routes::FORUMS), None).await;
        assert_eq!(res.data()["pagination"]["total"], 2);

        let res = app.get(&format!("{}?search=hir", routes::FORUMS), None).await;
        assert_eq!(res.data()["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn other_users_cannot_edit_or_delete() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let alan = app.create_user("Alan").await;
        let id = create_thread(&app, &ada.token, "Mine", None).await;

        let res = app
            .patch(&routes::forum(id), &json!({"title": "Hijacked"}), Some(&alan.token))
            .await;
        assert_eq!(res.status, 403);

        let res = app.delete(&routes::forum(id), Some(&alan.token)).await;
        assert_eq!(res.status, 403);

        let res = app.delete(&routes::forum(id), Some(&ada.token)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["message"], "Thread deleted");
    }
}

mod replies {
    use super::*;

    #[tokio::test]
    async fn replies_are_listed_with_the_thread_and_award_points() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let alan = app.create_user("Alan").await;
        let id = create_thread(&app, &ada.token, "Async tests", None).await;

        let res = app
            .post(
                &routes::forum_replies(id),
                &json!({"content": "tokio::test all the way"}),
                Some(&alan.token),
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        let res = app.get(&routes::forum(id), None).await;
        assert_eq!(res.data()["reply_count"], 1);
        assert_eq!(res.data()["replies"][0]["author_name"], "Alan");
        assert_eq!(app.points_of(alan.id).await, 2);
    }

    #[tokio::test]
    async fn empty_reply_is_rejected() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let id = create_thread(&app, &ada.token, "Async tests", None).await;

        let res = app
            .post(&routes::forum_replies(id), &json!({"content": "   "}), Some(&ada.token))
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn reply_author_or_admin_can_delete_a_reply() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        let alan = app.create_user("Alan").await;
        let id = create_thread(&app, &ada.token, "Async tests", None).await;
        let res = app
            .post(&routes::forum_replies(id), &json!({"content": "Hello"}), Some(&alan.token))
            .await;
        let reply = res.id();

        let res = app.delete(&routes::forum_reply(id, reply), Some(&ada.token)).await;
        assert_eq!(res.status, 403);

        let res = app.delete(&routes::forum_reply(id, reply), Some(&alan.token)).await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.delete(&routes::forum_reply(id, reply), Some(&alan.token)).await;
        assert_eq!(res.status, 404);
    }
}
