pub mod auth;
pub mod finance;
