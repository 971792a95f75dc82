// Service-level tests against the in-memory store

pub mod fitbit_sync_service_test;
pub mod registration_service_test;
