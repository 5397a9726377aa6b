pub mod auth;
pub mod finance_service;
pub mod recurrence;
