use std::sync::Arc;

use anyhow::Result;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::services::{
    FitbitApiClient, FitbitSyncService, RecaptchaVerifier, ReferenceService,
    RegistrationService, UserService,
};
use crate::store::GymStore;

/// Shared handles for every request handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn GymStore>,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub registration_service: RegistrationService,
    pub fitbit_sync: FitbitSyncService,
    pub reference_service: ReferenceService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn GymStore>) -> Result<Self> {
        let config = Arc::new(config);
        let auth_service = AuthService::new(
            store.clone(),
            &config.jwt_secret,
            config.token_lifetime_hours,
        );

        let recaptcha = RecaptchaVerifier::new(
            config.recaptcha_secret_key.clone(),
            &config.recaptcha_verify_url,
        )?;
        let fitbit_client = FitbitApiClient::new(config.fitbit.clone())?;

        Ok(Self {
            user_service: UserService::new(store.clone(), auth_service.clone()),
            registration_service: RegistrationService::new(
                store.clone(),
                auth_service.clone(),
                config.clone(),
                recaptcha,
            ),
            fitbit_sync: FitbitSyncService::new(fitbit_client, store.clone(), &config.site_url),
            reference_service: ReferenceService::new(store.clone()),
            auth_service,
            store,
            config,
        })
    }
}
