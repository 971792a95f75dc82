use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gym_manager::auth::verify_password;
use gym_manager::errors::ApiError;
use gym_manager::models::RegistrationRequest;
use gym_manager::services::registration_service::RegistrationContext;

use crate::common::{test_config, TestApp};

fn request(username: &str) -> RegistrationRequest {
    RegistrationRequest {
        username: username.to_string(),
        email: Some(format!("{username}@example.org")),
        password1: "a-long-password".to_string(),
        password2: Some("a-long-password".to_string()),
        captcha: None,
    }
}

#[cfg(test)]
mod registration_service_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_register_creates_user_with_defaults() {
        let app = TestApp::new();
        let context = RegistrationContext {
            accept_language: Some("de-AT,de;q=0.9,en;q=0.5"),
            ..Default::default()
        };

        let outcome = app
            .state
            .registration_service
            .register(context, request("newbie"))
            .await
            .unwrap();

        assert_eq!(outcome.message.message, "You were successfully registered");
        assert_eq!(outcome.message.redirect_to.as_deref(), Some("/dashboard"));
        assert!(!outcome.auth.access_token.is_empty());

        let user = app.store.user_by_name("newbie").unwrap();
        assert!(verify_password("a-long-password", &user.password_hash).unwrap());
        assert!(user.last_login.is_some());

        let profile = app.store.profile(user.id).unwrap();
        assert_eq!(profile.notification_language_id, Some(2));
        assert_eq!(profile.gym_id, Some(1));
        assert!(app.store.gym_user_configs().iter().any(|c| c.user_id == user.id && c.gym_id == 1));
    }

    #[tokio::test]
    async fn test_unknown_locale_falls_back_to_default_language() {
        let app = TestApp::new();
        app.store.set_default_gym(None);
        let context = RegistrationContext {
            accept_language: Some("pt-BR"),
            ..Default::default()
        };

        app.state
            .registration_service
            .register(context, request("newbie"))
            .await
            .unwrap();

        let user = app.store.user_by_name("newbie").unwrap();
        let profile = app.store.profile(user.id).unwrap();
        assert_eq!(profile.notification_language_id, Some(1));
        assert_eq!(profile.gym_id, None);
        assert!(app.store.gym_user_configs().is_empty());
    }

    #[tokio::test]
    async fn test_register_collects_all_field_errors() {
        let app = TestApp::new();
        let invalid = RegistrationRequest {
            username: "member".to_string(),
            email: Some("trainer@example.com".to_string()),
            password1: "12345678".to_string(),
            password2: Some("87654321".to_string()),
            captcha: None,
        };

        let result = app
            .state
            .registration_service
            .register(RegistrationContext::default(), invalid)
            .await;

        let fields = match result {
            Err(ApiError::Validation(fields)) => fields,
            other => panic!("expected validation errors, got {other:?}"),
        };
        let mut names: Vec<_> = fields.keys().cloned().collect();
        names.sort();
        assert_eq!(names, vec!["email", "password1", "password2", "username"]);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_username_characters() {
        let app = TestApp::new();

        let result = app
            .state
            .registration_service
            .register(RegistrationContext::default(), request("bad name!"))
            .await;

        assert_matches!(result, Err(ApiError::Validation(fields)) if fields.contains_key("username"));
    }

    #[tokio::test]
    async fn test_registration_disabled() {
        let app = TestApp::with_config(gym_manager::config::AppConfig {
            allow_registration: false,
            ..test_config()
        });

        let result = app
            .state
            .registration_service
            .register(RegistrationContext::default(), request("newbie"))
            .await;

        assert_matches!(result, Err(ApiError::RegistrationDisabled));
        assert!(app.store.user_by_name("newbie").is_none());
    }

    #[tokio::test]
    async fn test_registered_caller_is_sent_to_dashboard() {
        let app = TestApp::new();
        let member = app.current_user(&app.fixtures.member).await;
        let context = RegistrationContext {
            caller: Some(&member),
            ..Default::default()
        };

        let result = app.state.registration_service.register(context, request("newbie")).await;

        assert_matches!(
            result,
            Err(ApiError::Conflict { redirect_to: Some(target), .. }) if target == "/dashboard"
        );
    }

    #[tokio::test]
    async fn test_captcha_is_verified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/siteverify"))
            .and(body_string_contains("response=good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/siteverify"))
            .and(body_string_contains("response=bad-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error-codes": ["invalid-input-response"]
            })))
            .mount(&server)
            .await;

        let app = TestApp::with_config(gym_manager::config::AppConfig {
            use_recaptcha: true,
            recaptcha_secret_key: Some("captcha-secret".to_string()),
            recaptcha_verify_url: format!("{}/siteverify", server.uri()),
            ..test_config()
        });
        let service = &app.state.registration_service;

        let missing = service.register(RegistrationContext::default(), request("first")).await;
        assert_matches!(missing, Err(ApiError::Validation(fields)) if fields.contains_key("captcha"));

        let rejected = service
            .register(
                RegistrationContext::default(),
                RegistrationRequest {
                    captcha: Some("bad-token".to_string()),
                    ..request("second")
                },
            )
            .await;
        assert_matches!(rejected, Err(ApiError::Validation(fields)) if fields.contains_key("captcha"));

        service
            .register(
                RegistrationContext::default(),
                RegistrationRequest {
                    captcha: Some("good-token".to_string()),
                    ..request("third")
                },
            )
            .await
            .unwrap();
        assert!(app.store.user_by_name("third").is_some());
    }

    #[tokio::test]
    async fn test_android_app_skips_captcha() {
        let app = TestApp::with_config(gym_manager::config::AppConfig {
            use_recaptcha: true,
            ..test_config()
        });
        let context = RegistrationContext {
            user_agent: Some("Mozilla/5.0 (Linux; Android 13) WgerAndroidWebApp"),
            ..Default::default()
        };

        assert!(!app.state.registration_service.requires_captcha(context.user_agent));
        app.state
            .registration_service
            .register(context, request("from-app"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_guest_users() {
        let app = TestApp::new();

        let auth = app
            .state
            .registration_service
            .create_guest(RegistrationContext::default())
            .await
            .unwrap();

        assert!(auth.user.is_temporary);
        assert_eq!(auth.user.username.len(), 20);
        let user = app.store.user(auth.user.id).unwrap();
        assert!(!verify_password("", &user.password_hash).unwrap());
        assert!(app.store.profile(user.id).unwrap().is_temporary);

        let disabled = TestApp::with_config(gym_manager::config::AppConfig {
            allow_guest_users: false,
            ..test_config()
        });
        assert_matches!(
            disabled.state.registration_service.create_guest(RegistrationContext::default()).await,
            Err(ApiError::Forbidden(_))
        );
    }

    #[tokio::test]
    async fn test_api_registration_requires_flag() {
        let app = TestApp::new();
        let consumer = app.current_user(&app.fixtures.member).await;

        let denied = app
            .state
            .registration_service
            .register_via_api(&consumer, None, request("api-user"))
            .await;
        assert_matches!(denied, Err(ApiError::BadRequest(_)));

        app.store
            .update_profile_with(consumer.id(), |profile| profile.can_use_api_create = true);
        let consumer = app.current_user(&app.fixtures.member).await;

        let created = app
            .state
            .registration_service
            .register_via_api(
                &consumer,
                None,
                RegistrationRequest {
                    password2: None,
                    ..request("api-user")
                },
            )
            .await
            .unwrap();

        let profile = app.store.profile(created.id).unwrap();
        assert_eq!(profile.created_by.as_deref(), Some("member"));
    }
}
