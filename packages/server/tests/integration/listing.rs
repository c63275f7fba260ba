use ::common::UserRole;
use chrono::{Duration, Utc};
use hub_server::entity::listing;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;

use crate::common::{TestApp, listing_body, routes};

mod listing_creation {
    use super::*;

    #[tokio::test]
    async fn regular_user_cannot_create_a_hackathon() {
        let app = TestApp::spawn().await;
        let user = app.create_user("Ada").await;

        let res = app
            .post(routes::HACKATHONS, &listing_body("Hack", None), Some(&user.token))
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.error_code(), "FORBIDDEN");
        assert_eq!(res.body["error"], "Only hosts can create hackathons");
    }

    #[tokio::test]
    async fn unauthenticated_request_is_rejected_before_role_check() {
        let app = TestApp::spawn().await;

        let res = app
            .post(routes::HACKATHONS, &listing_body("Hack", None), None)
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.error_code(), "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn unapproved_host_cannot_create_a_hackathon() {
        let app = TestApp::spawn().await;
        let user = app.create_user("Ada").await;
        let res = app
            .post(routes::HOST_APPLICATION, &json!({}), Some(&user.token))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app
            .post(routes::HACKATHONS, &listing_body("Hack", None), Some(&user.token))
            .await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn approved_host_creates_a_hackathon() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;

        let res = app
            .post(routes::HACKATHONS, &listing_body("Spring Hack", Some(50)), Some(&host.token))
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["message"], "Hackathon created");
        assert_eq!(res.data()["title"], "Spring Hack");
        assert_eq!(res.data()["kind"], "HACKATHON");
        assert_eq!(res.data()["host_id"], host.id);
        assert_eq!(res.data()["tags"], json!(["rust", "web"]));
        assert_eq!(res.data()["status"], "upcoming");
    }

    #[tokio::test]
    async fn end_date_must_follow_start_date() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;
        let start = Utc::now() + Duration::days(7);

        let res = app
            .post(
                routes::HACKATHONS,
                &json!({
                    "title": "Backwards",
                    "description": "Ends before it starts.",
                    "start_date": start,
                    "end_date": start - Duration::hours(1),
                }),
                Some(&host.token),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn kinds_are_kept_apart() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;
        let hackathon = app.create_hackathon(&host.token, None).await;

        let res = app.get(&routes::event(hackathon), None).await;
        assert_eq!(res.status, 404);

        let res = app.get(routes::EVENTS, None).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["pagination"]["total"], 0);
    }
}

mod listing_queries {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_search_and_tag() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;
        app.post(routes::HACKATHONS, &listing_body("Rust Weekend", None), Some(&host.token))
            .await;
        let mut other = listing_body("Python Night", None);
        other["tags"] = json!(["python"]);
        app.post(routes::HACKATHONS, &other, Some(&host.token)).await;

        let res = app.get(&format!("{}?search=rust", routes::HACKATHONS), None).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["pagination"]["total"], 1);
        assert_eq!(res.data()["items"][0]["title"], "Rust Weekend");

        let res = app.get(&format!("{}?tag=PYTHON", routes::HACKATHONS), None).await;
        assert_eq!(res.data()["pagination"]["total"], 1);
        assert_eq!(res.data()["items"][0]["title"], "Python Night");
    }

    #[tokio::test]
    async fn tag_filter_matches_legacy_string_tags() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;
        let comma = app.create_hackathon(&host.token, None).await;
        let encoded = app.create_hackathon(&host.token, None).await;
        let other = app.create_hackathon(&host.token, None).await;

        let rows = [
            (comma, json!("Rust, Web")),
            (encoded, json!("[\"WASM\",\"rust\"]")),
            (other, json!("python")),
        ];
        for (id, tags) in rows {
            let row = listing::Entity::find_by_id(id)
                .one(&app.db)
                .await
                .unwrap()
                .unwrap();
            let mut active: listing::ActiveModel = row.into();
            active.tags = Set(tags);
            active.update(&app.db).await.unwrap();
        }

        let res = app.get(&format!("{}?tag=RUST", routes::HACKATHONS), None).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data()["pagination"]["total"], 2);

        let res = app.get(&format!("{}?tag=web", routes::HACKATHONS), None).await;
        assert_eq!(res.data()["pagination"]["total"], 1);
        assert_eq!(res.data()["items"][0]["id"], comma);
    }

    #[tokio::test]
    async fn per_page_is_clamped() {
        let app = TestApp::spawn().await;

        let res = app
            .get(&format!("{}?page=0&per_page=1000", routes::HACKATHONS), None)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.data()["pagination"]["page"], 1);
        assert_eq!(res.data()["pagination"]["per_page"], 100);
    }

    #[tokio::test]
    async fn huge_page_number_returns_an_empty_page() {
        let app = TestApp::spawn().await;

        let res = app
            .get(&format!("{}?page=18446744073709551615", routes::HACKATHONS), None)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data()["items"], json!([]));
    }

    async fn create_dated(app: &TestApp, token: &str, title: &str, start_offset: Duration) -> i32 {
        let start = Utc::now() + start_offset;
        let res = app
            .post(
                routes::HACKATHONS,
                &json!({
                    "title": title,
                    "description": "Dated listing.",
                    "start_date": start,
                    "end_date": start + Duration::days(2),
                }),
                Some(token),
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        res.id()
    }

    #[tokio::test]
    async fn status_filter_follows_the_timeline() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;
        let past = create_dated(&app, &host.token, "Last year", -Duration::days(30)).await;
        let ongoing = create_dated(&app, &host.token, "Right now", -Duration::days(1)).await;
        let upcoming = create_dated(&app, &host.token, "Next month", Duration::days(30)).await;

        for (status, id) in [("past", past), ("ongoing", ongoing), ("upcoming", upcoming)] {
            let url = format!("{}?status={status}", routes::HACKATHONS);
            let res = app.get(&url, None).await;
            assert_eq!(res.status, 200, "{}", res.text);
            assert_eq!(res.data()["pagination"]["total"], 1, "status={status}");
            assert_eq!(res.data()["items"][0]["id"], id, "status={status}");
            assert_eq!(res.data()["items"][0]["status"], status);
        }

        let url = format!("{}?status=bogus", routes::HACKATHONS);
        let res = app.get(&url, None).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "status must be one of: upcoming, ongoing, past");
    }

    #[tokio::test]
    async fn sorts_by_title_and_start_date() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;
        let alpha = create_dated(&app, &host.token, "Alpha", Duration::days(20)).await;
        let beta = create_dated(&app, &host.token, "Beta", Duration::days(10)).await;
        let gamma = create_dated(&app, &host.token, "Gamma", Duration::days(30)).await;

        let ids = |res: &crate::common::TestResponse| -> Vec<i64> {
            res.data()["items"]
                .as_array()
                .unwrap()
                .iter()
                .map(|l| l["id"].as_i64().unwrap())
                .collect()
        };

        let url = format!("{}?sort_by=title&sort_order=desc", routes::HACKATHONS);
        let res = app.get(&url, None).await;
        assert_eq!(ids(&res), vec![gamma as i64, beta as i64, alpha as i64]);

        let res = app.get(routes::HACKATHONS, None).await;
        assert_eq!(ids(&res), vec![beta as i64, alpha as i64, gamma as i64]);

        let url = format!("{}?sort_by=popularity", routes::HACKATHONS);
        let res = app.get(&url, None).await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn unknown_listing_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::hackathon(9999), None).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.error_code(), "NOT_FOUND");
    }
}

mod listing_ownership {
    use super::*;

    #[tokio::test]
    async fn non_owner_host_cannot_update_or_delete() {
        let app = TestApp::spawn().await;
        let owner = app.create_user_with_role("Grace", UserRole::Host).await;
        let other = app.create_user_with_role("Linus", UserRole::Host).await;
        let id = app.create_hackathon(&owner.token, None).await;

        let res = app
            .patch(&routes::hackathon(id), &json!({"title": "Mine now"}), Some(&other.token))
            .await;
        assert_eq!(res.status, 403);

        let res = app.delete(&routes::hackathon(id), Some(&other.token)).await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn admin_can_update_any_listing() {
        let app = TestApp::spawn().await;
        let owner = app.create_user_with_role("Grace", UserRole::Host).await;
        let admin = app.create_user_with_role("Root", UserRole::Admin).await;
        let id = app.create_hackathon(&owner.token, None).await;

        let res = app
            .patch(&routes::hackathon(id), &json!({"title": "Renamed"}), Some(&admin.token))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data()["title"], "Renamed");
    }

    #[tokio::test]
    async fn capacity_cannot_drop_below_registrations() {
        let app = TestApp::spawn().await;
        let owner = app.create_user_with_role("Grace", UserRole::Host).await;
        let id = app.create_hackathon(&owner.token, Some(5)).await;
        for name in ["Ada", "Alan"] {
            let user = app.create_user(name).await;
            app.register_for_hackathon(id, &user.token).await;
        }

        let res = app
            .patch(&routes::hackathon(id), &json!({"max_participants": 1}), Some(&owner.token))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn delete_cascades_registrations_and_teams() {
        let app = TestApp::spawn().await;
        let owner = app.create_user_with_role("Grace", UserRole::Host).await;
        let user = app.create_user("Ada").await;
        let id = app.create_hackathon(&owner.token, None).await;
        app.register_for_hackathon(id, &user.token).await;
        let team = app.create_team(id, &user.token, "Crabs").await;

        let res = app.delete(&routes::hackathon(id), Some(&owner.token)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["message"], "Hackathon deleted");

        assert_eq!(app.get(&routes::hackathon(id), None).await.status, 404);
        assert_eq!(app.get(&routes::team(team), None).await.status, 404);
        let res = app.get(routes::MY_REGISTRATIONS, Some(&user.token)).await;
        assert_eq!(res.data().as_array().map(Vec::len), Some(0));
    }
}

mod registration {
    use super::*;

    #[tokio::test]
    async fn registering_twice_is_rejected() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;
        let user = app.create_user("Ada").await;
        let res = app
            .post(routes::EVENTS, &listing_body("Meetup", None), Some(&host.token))
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        let register = format!("{}/{}/register", routes::EVENTS, res.id());

        let first = app.post(&register, &json!({}), Some(&user.token)).await;
        assert_eq!(first.status, 201, "{}", first.text);
        assert_eq!(first.body["message"], "Registered successfully");

        let second = app.post(&register, &json!({}), Some(&user.token)).await;
        assert_eq!(second.status, 400);
        assert_eq!(second.error_code(), "ALREADY_REGISTERED");
        assert_eq!(second.body["error"], "Already registered");
    }

    #[tokio::test]
    async fn registration_stops_at_capacity() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;
        let id = app.create_hackathon(&host.token, Some(2)).await;

        for name in ["Ada", "Alan"] {
            let user = app.create_user(name).await;
            app.register_for_hackathon(id, &user.token).await;
        }
        let late = app.create_user("Barbara").await;

        let res = app
            .post(&routes::hackathon_register(id), &json!({}), Some(&late.token))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "CAPACITY_REACHED");
        assert_eq!(res.body["error"], "Hackathon is full");

        let detail = app.get(&routes::hackathon(id), None).await;
        assert_eq!(detail.data()["participant_count"], 2);
    }

    #[tokio::test]
    async fn concurrent_registrations_never_exceed_capacity() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;
        let id = app.create_hackathon(&host.token, Some(3)).await;

        let mut tokens = Vec::new();
        for i in 0..8 {
            tokens.push(app.create_user(&format!("User{i}")).await.token);
        }

        let url = routes::hackathon_register(id);
        let results = register_concurrently(&app, &url, &tokens).await;
        let created = results.iter().filter(|s| **s == 201).count();
        let full = results.iter().filter(|s| **s == 400).count();

        assert_eq!(created, 3);
        assert_eq!(full, 5);
    }

    async fn register_concurrently(app: &TestApp, url: &str, tokens: &[String]) -> Vec<u16> {
        let mut set = tokio::task::JoinSet::new();
        for token in tokens {
            let req = app
                .client
                .post(format!("http://{}{}", app.addr, url))
                .header("Authorization", format!("Bearer {token}"))
                .json(&json!({}));
            set.spawn(async move { req.send().await.unwrap().status().as_u16() });
        }
        set.join_all().await
    }

    #[tokio::test]
    async fn registration_closes_after_the_deadline() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;
        let user = app.create_user("Ada").await;
        let start = Utc::now() + Duration::days(7);
        let res = app
            .post(
                routes::HACKATHONS,
                &json!({
                    "title": "Closed",
                    "description": "Deadline already passed.",
                    "start_date": start,
                    "end_date": start + Duration::days(1),
                    "registration_deadline": Utc::now() - Duration::hours(1),
                }),
                Some(&host.token),
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        let id = res.id();

        let res = app
            .post(&routes::hackathon_register(id), &json!({}), Some(&user.token))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "Registration is closed");
    }

    #[tokio::test]
    async fn registering_awards_points() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;
        let user = app.create_user("Ada").await;
        let id = app.create_hackathon(&host.token, None).await;

        app.register_for_hackathon(id, &user.token).await;

        assert_eq!(app.points_of(user.id).await, 10);
    }

    #[tokio::test]
    async fn unregistering_keeps_points_and_frees_the_seat() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;
        let user = app.create_user("Ada").await;
        let id = app.create_hackathon(&host.token, Some(1)).await;
        app.register_for_hackathon(id, &user.token).await;

        let res = app.delete(&routes::hackathon_register(id), Some(&user.token)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(app.points_of(user.id).await, 10);

        let res = app.delete(&routes::hackathon_register(id), Some(&user.token)).await;
        assert_eq!(res.status, 404);

        let other = app.create_user("Alan").await;
        app.register_for_hackathon(id, &other.token).await;
    }

    #[tokio::test]
    async fn only_owner_or_admin_sees_participants() {
        let app = TestApp::spawn().await;
        let host = app.create_user_with_role("Grace", UserRole::Host).await;
        let user = app.create_user("Ada").await;
        let id = app.create_hackathon(&host.token, None).await;
        app.register_for_hackathon(id, &user.token).await;

        let res = app
            .get(&routes::hackathon_participants(id), Some(&user.token))
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .get(&routes::hackathon_participants(id), Some(&host.token))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data()[0]["user_id"], user.id);
    }
}
