use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::common::{build_request, TestApp, TEST_PASSWORD};

#[cfg(test)]
mod user_lifecycle_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_health_check() {
        let app = TestApp::new();

        let (status, body) = app.get("/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "gym-manager");
    }

    #[tokio::test]
    async fn test_login_and_invalid_credentials() {
        let app = TestApp::new();

        let (status, body) = app
            .post("/api/user/login", None, json!({"username": "member", "password": TEST_PASSWORD}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["user"]["username"], "member");
        assert!(body["user"]["password_hash"].is_null());

        let (status, _) = app
            .post("/api/user/login", None, json!({"username": "member", "password": "nope"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .post("/api/user/login", None, json!({"username": "member_inactive", "password": TEST_PASSWORD}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_protected_routes_require_authentication() {
        let app = TestApp::new();
        let member_id = app.fixtures.member.id;

        let (status, body) = app.get(&format!("/api/user/{member_id}/activate"), None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["login_url"], "/api/user/login");
    }

    #[tokio::test]
    async fn test_unauthorized_deactivate_returns_403_and_keeps_state() {
        let app = TestApp::new();
        let member = &app.fixtures.member;

        for actor in [&app.fixtures.other_manager, &app.fixtures.other_trainer, &app.fixtures.other_member] {
            let token = app.token_for(actor).await;
            let (status, _) = app.get(&format!("/api/user/{}/deactivate", member.id), Some(&token)).await;

            assert_eq!(status, StatusCode::FORBIDDEN, "{} must not deactivate", actor.username);
            assert!(app.store.user(member.id).unwrap().is_active);
        }
    }

    #[tokio::test]
    async fn test_activate_twice_is_idempotent() {
        let app = TestApp::new();
        let token = app.token_for(&app.fixtures.manager).await;
        let inactive = &app.fixtures.inactive_member;
        let uri = format!("/api/user/{}/activate", inactive.id);

        let (first_status, first) = app.get(&uri, Some(&token)).await;
        let (second_status, second) = app.get(&uri, Some(&token)).await;

        assert_eq!(first_status, StatusCode::OK);
        assert_eq!(second_status, StatusCode::OK);
        assert_eq!(first, second);
        assert_eq!(first["level"], "success");
        assert_eq!(first["redirect_to"], format!("/api/user/{}/overview", inactive.id));
        assert!(app.store.user(inactive.id).unwrap().is_active);
    }

    #[tokio::test]
    async fn test_general_manager_acts_across_gyms() {
        let app = TestApp::new();
        let token = app.token_for(&app.fixtures.general_manager).await;
        let other = &app.fixtures.other_member;

        let (status, _) = app.get(&format!("/api/user/{}/deactivate", other.id), Some(&token)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(!app.store.user(other.id).unwrap().is_active);
    }

    #[tokio::test]
    async fn test_deactivated_user_loses_session() {
        let app = TestApp::new();
        let member_token = app.token_for(&app.fixtures.member).await;
        let manager_token = app.token_for(&app.fixtures.manager).await;

        let (status, _) = app
            .get(&format!("/api/user/{}/deactivate", app.fixtures.member.id), Some(&manager_token))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.get("/api/user/preferences", Some(&member_token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Account is inactive");
    }

    #[tokio::test]
    async fn test_overview_and_edit() {
        let app = TestApp::new();
        let member_id = app.fixtures.member.id;
        let manager_token = app.token_for(&app.fixtures.manager).await;
        let trainer_token = app.token_for(&app.fixtures.trainer).await;

        let (status, body) = app.get(&format!("/api/user/{member_id}/overview"), Some(&trainer_token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "member");
        assert!(body["weight_entries"].as_array().unwrap().is_empty());

        let (status, _) = app
            .put(&format!("/api/user/{member_id}/edit"), Some(&trainer_token), json!({"first_name": "X"}))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app
            .put(&format!("/api/user/{member_id}/edit"), Some(&manager_token), json!({"email": "not-an-email"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["email"].is_array());

        let (status, _) = app
            .put(
                &format!("/api/user/{member_id}/edit"),
                Some(&manager_token),
                json!({"email": "fresh@example.com", "first_name": "Jane"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.get(&format!("/api/user/{member_id}/edit"), Some(&manager_token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "fresh@example.com");
        assert_eq!(body["first_name"], "Jane");
    }

    #[tokio::test]
    async fn test_user_list_is_general_manager_only() {
        let app = TestApp::new();

        let manager_token = app.token_for(&app.fixtures.manager).await;
        let (status, _) = app.get("/api/user/list", Some(&manager_token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin_token = app.token_for(&app.fixtures.admin).await;
        let (status, body) = app.get("/api/user/list", Some(&admin_token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["inactive_members"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deleting_own_account_ends_session() {
        let app = TestApp::new();
        let token = app.token_for(&app.fixtures.member).await;

        let (status, body) = app
            .post("/api/user/delete", Some(&token), json!({"password": TEST_PASSWORD}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_ended"], true);
        assert_eq!(body["redirect_to"], "/");
        assert!(app.store.user(app.fixtures.member.id).is_none());

        let (status, body) = app.get("/api/user/preferences", Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["login_url"], "/api/user/login");
    }

    #[tokio::test]
    async fn test_delete_with_wrong_password_keeps_account() {
        let app = TestApp::new();
        let token = app.token_for(&app.fixtures.member).await;

        let (status, body) = app
            .post("/api/user/delete", Some(&token), json!({"password": "wrong"}))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["password"].is_array());
        assert!(app.store.user(app.fixtures.member.id).is_some());
    }

    #[tokio::test]
    async fn test_manager_deletes_member_of_own_gym() {
        let app = TestApp::new();
        let token = app.token_for(&app.fixtures.manager).await;

        let (status, _) = app
            .post(
                &format!("/api/user/{}/delete", app.fixtures.other_member.id),
                Some(&token),
                json!({"password": TEST_PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app
            .post(
                &format!("/api/user/{}/delete", app.fixtures.member.id),
                Some(&token),
                json!({"password": TEST_PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_ended"], false);
        assert!(app.store.user(app.fixtures.member.id).is_none());
    }

    #[tokio::test]
    async fn test_preferences_round_trip() {
        let app = TestApp::new();
        let token = app.token_for(&app.fixtures.member).await;

        let (status, body) = app
            .put(
                "/api/user/preferences",
                Some(&token),
                json!({"last_name": "Doe", "timer_pause": 120, "show_comments": false}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Settings successfully updated");

        let (status, body) = app.get("/api/user/preferences", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["personal_information"]["last_name"], "Doe");
        assert_eq!(body["profile"]["timer_pause"], 120);
        assert_eq!(body["profile"]["show_comments"], false);

        let (status, body) = app
            .put("/api/user/preferences", Some(&token), json!({"weight_unit": "stone"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["weight_unit"].is_array());
    }

    #[tokio::test]
    async fn test_api_key_authenticates_requests() {
        let app = TestApp::new();
        let token = app.token_for(&app.fixtures.member).await;

        let (status, body) = app.get("/api/user/api-key", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_null());

        let (status, body) = app.post("/api/user/api-key", Some(&token), json!({})).await;
        assert_eq!(status, StatusCode::CREATED);
        let key = body["token"]["key"].as_str().unwrap().to_string();

        let (status, body) = app
            .send(build_request(Method::GET, "/api/user/preferences", Some(format!("Token {key}")), None))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["personal_information"]["username"], "member");
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let app = TestApp::new();
        let token = app.token_for(&app.fixtures.member).await;

        let (status, body) = app.post("/api/user/logout", Some(&token), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["redirect_to"], "/api/user/login");

        let (status, _) = app.get("/api/user/preferences", Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(app.store.user(app.fixtures.member.id).is_some());
    }

    #[tokio::test]
    async fn test_trainer_login_and_switch_back() {
        let app = TestApp::new();
        let trainer_token = app.token_for(&app.fixtures.trainer).await;
        let member_id = app.fixtures.member.id;

        let (status, body) = app
            .post(&format!("/api/user/{member_id}/trainer-login"), Some(&trainer_token), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], member_id);
        let member_token = body["access_token"].as_str().unwrap().to_string();

        // The trainer's own session was replaced
        let (status, _) = app.get("/api/user/preferences", Some(&trainer_token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .post(
                &format!("/api/user/{}/trainer-login", app.fixtures.trainer.id),
                Some(&member_token),
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], app.fixtures.trainer.id);
        assert_eq!(body["redirect_to"], "/gym/1/user-list");
    }

    #[tokio::test]
    async fn test_member_cannot_impersonate() {
        let app = TestApp::new();
        let token = app.token_for(&app.fixtures.member).await;

        let (status, _) = app
            .post(&format!("/api/user/{}/trainer-login", app.fixtures.trainer.id), Some(&token), json!({}))
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
