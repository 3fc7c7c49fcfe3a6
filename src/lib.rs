pub mod config;
pub mod email;
pub mod error;
pub mod identity;
pub mod model;
pub mod security;
pub mod server;
pub mod store;
pub mod validate;
