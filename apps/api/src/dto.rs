mod auth;
mod health;

pub use auth::{LoginRequest, LoginResponse};
pub use health::{HealthDependencyStatus, HealthResponse};
