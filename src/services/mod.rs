pub mod account_service;
pub mod health_service;
pub mod session_service;
