pub mod auth;
pub mod core;
pub mod sessions;
pub mod students;
pub mod views;
