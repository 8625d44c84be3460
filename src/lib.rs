//! User-account HTTP API: registration, login, profiles, search, roles and
//! activation over a Postgres `users` table.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod state;
pub mod users;
