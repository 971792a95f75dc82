// API routes and handlers

pub mod fitbit;
pub mod health;
pub mod rest;
pub mod routes;
pub mod state;
pub mod user;

pub use routes::create_routes;
pub use state::AppState;
