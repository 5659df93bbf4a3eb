pub mod cache_admin;
pub mod health;
pub mod passthrough;
pub mod proxy;
