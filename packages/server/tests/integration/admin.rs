use ::common::UserRole;
use serde_json::json;

use crate::common::{PASSWORD, TestApp, listing_body, routes};

mod hosts {
    use super::*;

    #[tokio::test]
    async fn application_then_approval_unlocks_listing_creation() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("Root", UserRole::Admin).await;
        let ada = app.create_user("Ada").await;

        let res = app
            .post(routes::HOST_APPLICATION, &json!({}), Some(&ada.token))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["message"], "Host application submitted");

        let res = app
            .post(routes::HACKATHONS, &listing_body("Too early", None), Some(&ada.token))
            .await;
        assert_eq!(res.status, 403);

        let res = app.get(routes::ADMIN_HOST_APPLICATIONS, Some(&admin.token)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()[0]["id"], ada.id);

        let res = app
            .post(&routes::approve_host(ada.id), &json!({}), Some(&admin.token))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["message"], "Host approved");

        let res = app
            .post(routes::HACKATHONS, &listing_body("Now allowed", None), Some(&ada.token))
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    #[tokio::test]
    async fn applying_twice_is_rejected() {
        let app = TestApp::spawn().await;
        let ada = app.create_user("Ada").await;
        app.post(routes::HOST_APPLICATION, &json!({}), Some(&ada.token))
            .await;

        let res = app
            .post(routes::HOST_APPLICATION, &json!({}), Some(&ada.token))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "Host application already pending");
    }

    #[tokio::test]
    async fn approve_requires_pending_application() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("Root", UserRole::Admin).await;
        let ada = app.create_user("Ada").await;

        let res = app
            .post(&routes::approve_host(ada.id), &json!({}), Some(&admin.token))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "User has no pending host application");
    }

    #[tokio::test]
    async fn revoke_turns_host_back_into_user() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("Root", UserRole::Admin).await;
        let grace = app.create_user_with_role("Grace", UserRole::Host).await;

        let res = app
            .post(&routes::revoke_host(grace.id), &json!({}), Some(&admin.token))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["message"], "Host status revoked");
        assert_eq!(res.data()["role"], "USER");

        let res = app
            .post(routes::HACKATHONS, &listing_body("Revoked", None), Some(&grace.token))
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .post(&routes::revoke_host(grace.id), &json!({}), Some(&admin.token))
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "User is not a host");
    }

    #[tokio::test]
    async fn non_admins_are_forbidden() {
        let app = TestApp::spawn().await;
        let grace = app.create_user_with_role("Grace", UserRole::Host).await;
        let ada = app.create_user("Ada").await;

        let res = app
            .post(&routes::approve_host(ada.id), &json!({}), Some(&grace.token))
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["error"], "Admin access required");

        let res = app.get(routes::ADMIN_STATS, Some(&ada.token)).await;
        assert_eq!(res.status, 403);
    }
}

mod users {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_role_and_search() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("Root", UserRole::Admin).await;
        app.create_user_with_role("Grace", UserRole::Host).await;
        app.create_user("Ada").await;

        let url = format!("{}?role=HOST", routes::ADMIN_USERS);
        let res = app.get(&url, Some(&admin.token)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data()["pagination"]["total"], 1);
        assert_eq!(res.data()["items"][0]["email"], "grace@example.com");

        let url = format!("{}?search=ADA", routes::ADMIN_USERS);
        let res = app.get(&url, Some(&admin.token)).await;
        assert_eq!(res.data()["pagination"]["total"], 1);

        let url = format!("{}?role=OWNER", routes::ADMIN_USERS);
        let res = app.get(&url, Some(&admin.token)).await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn deactivated_users_are_locked_out() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("Root", UserRole::Admin).await;
        let ada = app.create_user("Ada").await;

        let res = app
            .patch(&routes::user_status(ada.id), &json!({"is_active": false}), Some(&admin.token))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data()["is_active"], false);

        let res = app.get(routes::ME, Some(&ada.token)).await;
        assert_eq!(res.status, 403);

        let res = app
            .post(
                routes::LOGIN,
                &json!({"email": "ada@example.com", "password": PASSWORD}),
                None,
            )
            .await;
        assert_eq!(res.status, 403);

        let res = app.get(&routes::user(ada.id), None).await;
        assert_eq!(res.status, 404);

        let res = app
            .patch(&routes::user_status(ada.id), &json!({"is_active": true}), Some(&admin.token))
            .await;
        assert_eq!(res.status, 200);
        let res = app.get(routes::ME, Some(&ada.token)).await;
        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn admins_cannot_deactivate_themselves() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("Root", UserRole::Admin).await;

        let res = app
            .patch(&routes::user_status(admin.id), &json!({"is_active": false}), Some(&admin.token))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "You cannot deactivate your own account");
    }

    #[tokio::test]
    async fn award_points_adjusts_level_and_floors_at_zero() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("Root", UserRole::Admin).await;
        let ada = app.create_user("Ada").await;

        let res = app
            .post(
                &routes::user_points(ada.id),
                &json!({"points": 250, "reason": "Won the spring hackathon"}),
                Some(&admin.token),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data()["points"], 250);
        assert_eq!(res.data()["level"], 3);

        let res = app
            .post(
                &routes::user_points(ada.id),
                &json!({"points": -1000, "reason": "Cheating"}),
                Some(&admin.token),
            )
            .await;
        assert_eq!(res.data()["points"], 0);
        assert_eq!(res.data()["level"], 1);

        let res = app
            .post(
                &routes::user_points(ada.id),
                &json!({"points": 0, "reason": "Nothing"}),
                Some(&admin.token),
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn stats_count_rows() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("Root", UserRole::Admin).await;
        let grace = app.create_user_with_role("Grace", UserRole::Host).await;
        let ada = app.create_user("Ada").await;
        let listing = app.create_hackathon(&grace.token, None).await;
        app.register_for_hackathon(listing, &ada.token).await;

        let res = app.get(routes::ADMIN_STATS, Some(&admin.token)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data()["users"], 3);
        assert_eq!(res.data()["hosts"], 1);
        assert_eq!(res.data()["pending_host_applications"], 0);
        assert_eq!(res.data()["listings"], 1);
        assert_eq!(res.data()["registrations"], 1);
        assert_eq!(res.data()["teams"], 0);
    }
}
