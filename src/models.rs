pub mod auth;
pub mod finance;
pub mod recurrence;
