pub mod access_token;
pub mod auth_token;
pub mod credentials;
pub mod password;
pub mod reset_delivery;
pub mod secret;
pub mod session;
pub mod token_store;
