// Business logic services

pub mod fitbit_api_client;
pub mod fitbit_sync_service;
pub mod reference_service;
pub mod registration_service;
pub mod user_service;

pub use fitbit_api_client::FitbitApiClient;
pub use fitbit_sync_service::{FitbitSyncService, SyncError, SyncKind};
pub use reference_service::{ReferenceCollection, ReferenceService};
pub use registration_service::{RecaptchaVerifier, RegistrationService};
pub use user_service::UserService;
